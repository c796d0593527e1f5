//! Constraint catalog (C5): each named constraint contributes hard linear
//! constraints to the model and, post-solution, a `score()` for diagnostics
//! (spec §4.5). Disabling one constraint (`enabled=false` in the catalog)
//! is purely local — no other constraint depends on it being present.

use chrono::NaiveDate;
use good_lp::{Constraint as LpConstraint, Expression, Variable};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::calendar::week_start;
use crate::domain::{
    ConstraintCatalog, Employee, EmployeeId, Requirement, RequirementId, Scheme, Slot, SlotId,
};
use crate::icpmp::is_eligible;
use crate::resolver::resolve;

/// Everything a constraint needs to build its piece of the model or score
/// a finished solution. Constraints read but never mutate these fields
/// (spec §9 "typed context, not a dict blob").
pub struct ModelContext<'a> {
    pub slots: &'a [Slot],
    pub employees: &'a [Employee],
    pub requirements: &'a BTreeMap<RequirementId, Requirement>,
    pub catalog: &'a ConstraintCatalog,
    /// Fallback anchor for requirements with no explicit `patternAnchorDate`
    /// (spec §9): the planning horizon's start date, matching ICPMP and the
    /// roster builder.
    pub horizon_start: NaiveDate,
    pub offsets_fixed: bool,
}

impl<'a> ModelContext<'a> {
    pub fn requirement_for(&self, slot: &Slot) -> &Requirement {
        &self.requirements[&slot.requirement_id]
    }

    /// `true` if `employee`'s fixed pattern calls for work on `slot`'s date
    /// with `slot`'s shift code. When offsets are not fixed, always `true`
    /// (eligibility is then conditional on the solver's own offset choice,
    /// out of scope for this linear relaxation — see DESIGN.md).
    pub fn pattern_matches(&self, slot: &Slot, employee: &Employee) -> bool {
        if !self.offsets_fixed {
            return true;
        }
        let Some(offset) = employee.rotation_offset else {
            return false;
        };
        let requirement = self.requirement_for(slot);
        let anchor = requirement.anchor(self.horizon_start);
        let day_index = crate::calendar::pattern_day(slot.date, offset as i64, anchor, requirement.work_pattern.len());
        requirement.work_pattern.token_at(day_index) == slot.shift_code
    }
}

/// The variable pools shared by every constraint: `x[s,e]` assignment
/// indicators and `u[s]` per-slot unassigned indicators (spec §4.6).
pub struct ModelVars {
    pub x: HashMap<(SlotId, EmployeeId), Variable>,
    pub u: HashMap<SlotId, Variable>,
}

impl ModelVars {
    pub fn x_var(&self, slot: &SlotId, employee: EmployeeId) -> Option<Variable> {
        self.x.get(&(slot.clone(), employee)).copied()
    }

    /// Sum of `x[s,e]` over every slot assignable to `employee` (used
    /// throughout as "is employee e working on this day/week/month").
    pub fn employee_slot_sum<'b>(&self, employee: EmployeeId, slot_ids: impl Iterator<Item = &'b SlotId>) -> Expression {
        let mut expr = Expression::from(0.0);
        for slot_id in slot_ids {
            if let Some(v) = self.x.get(&(slot_id.clone(), employee)) {
                expr += *v;
            }
        }
        expr
    }
}

/// Returns every (slot, employee) pair the model may legally assign:
/// employee is eligible for the slot's requirement, available on the
/// slot's date, and (if offsets are fixed) the employee's pattern predicts
/// that exact shift on that date (spec §4.4.4, §4.6).
pub fn eligible_pairs(ctx: &ModelContext) -> Vec<(SlotId, EmployeeId)> {
    let mut pairs = Vec::new();
    for slot in ctx.slots {
        let requirement = ctx.requirement_for(slot);
        for employee in ctx.employees {
            if !is_eligible(employee, requirement) {
                continue;
            }
            if !employee.is_available(slot.date) {
                continue;
            }
            if !ctx.pattern_matches(slot, employee) {
                continue;
            }
            pairs.push((slot.id.clone(), employee.id));
        }
    }
    pairs
}

/// A named constraint contract (spec §4.5): `build` contributes hard
/// linear constraints, `score` reports violations post-solve.
pub trait NamedConstraint {
    fn id(&self) -> &'static str;
    fn build(&self, ctx: &ModelContext, vars: &ModelVars) -> Vec<LpConstraint>;
    fn score(&self, ctx: &ModelContext, vars: &ModelVars, values: &HashMap<Variable, f64>) -> f64;
}

fn slots_by_employee_date<'a>(ctx: &'a ModelContext) -> HashMap<(EmployeeId, NaiveDate), Vec<&'a Slot>> {
    let mut map: HashMap<(EmployeeId, NaiveDate), Vec<&Slot>> = HashMap::new();
    for slot in ctx.slots {
        for employee in ctx.employees {
            if ctx.pattern_matches(slot, employee) || !ctx.offsets_fixed {
                map.entry((employee.id, slot.date)).or_default().push(slot);
            }
        }
    }
    map
}

fn assigned_value(vars: &ModelVars, values: &HashMap<Variable, f64>, slot: &SlotId, employee: EmployeeId) -> f64 {
    vars.x_var(slot, employee).and_then(|v| values.get(&v).copied()).unwrap_or(0.0)
}

/// C6 `atMostOneShiftPerDay`: sum_s x[s,e] <= 1 for each (employee, date).
pub struct AtMostOneShiftPerDay;
impl NamedConstraint for AtMostOneShiftPerDay {
    fn id(&self) -> &'static str {
        "C6"
    }
    fn build(&self, ctx: &ModelContext, vars: &ModelVars) -> Vec<LpConstraint> {
        let by_day = slots_by_employee_date(ctx);
        by_day
            .into_iter()
            .filter_map(|((employee, _date), slots)| {
                let has_var = slots.iter().any(|s| vars.x_var(&s.id, employee).is_some());
                if !has_var {
                    return None;
                }
                let ids: Vec<SlotId> = slots.iter().map(|s| s.id.clone()).collect();
                Some(vars.employee_slot_sum(employee, ids.iter()).leq(1.0))
            })
            .collect()
    }
    fn score(&self, ctx: &ModelContext, vars: &ModelVars, values: &HashMap<Variable, f64>) -> f64 {
        let by_day = slots_by_employee_date(ctx);
        by_day
            .values()
            .map(|slots| {
                let total: f64 = slots
                    .iter()
                    .filter_map(|s| ctx.employees.iter().find_map(|e| vars.x_var(&s.id, e.id)).and_then(|v| values.get(&v)))
                    .sum();
                (total - 1.0).max(0.0)
            })
            .sum()
    }
}

/// C9 `headcount`: for each slot, sum_e x[s,e] + u[s] == 1.
pub struct Headcount;
impl NamedConstraint for Headcount {
    fn id(&self) -> &'static str {
        "C9"
    }
    fn build(&self, ctx: &ModelContext, vars: &ModelVars) -> Vec<LpConstraint> {
        ctx.slots
            .iter()
            .map(|slot| {
                let mut expr = Expression::from(0.0);
                for employee in ctx.employees {
                    if let Some(v) = vars.x_var(&slot.id, employee.id) {
                        expr += v;
                    }
                }
                if let Some(u) = vars.u.get(&slot.id) {
                    expr += *u;
                }
                expr.eq(1.0)
            })
            .collect()
    }
    fn score(&self, ctx: &ModelContext, vars: &ModelVars, values: &HashMap<Variable, f64>) -> f64 {
        ctx.slots
            .iter()
            .map(|slot| {
                let assigned: f64 = ctx
                    .employees
                    .iter()
                    .map(|e| assigned_value(vars, values, &slot.id, e.id))
                    .sum();
                let u = vars.u.get(&slot.id).and_then(|v| values.get(v)).copied().unwrap_or(0.0);
                (assigned + u - 1.0).abs()
            })
            .sum()
    }
}

/// C1 `momDailyHoursCap`: sum of paid minutes of assigned slots on a date
/// <= `maxDailyHours(scheme, productType) * 60` (A=14h, B=13h, P=9h defaults).
pub struct MomDailyHoursCap;
impl NamedConstraint for MomDailyHoursCap {
    fn id(&self) -> &'static str {
        "C1"
    }
    fn build(&self, ctx: &ModelContext, vars: &ModelVars) -> Vec<LpConstraint> {
        let by_day = slots_by_employee_date(ctx);
        let mut out = Vec::new();
        for ((employee_id, _date), slots) in by_day {
            let Some(employee) = ctx.employees.iter().find(|e| e.id == employee_id) else {
                continue;
            };
            let default_hours = default_daily_hours(employee);
            let cap_minutes = resolve(ctx.catalog, "momDailyHoursCap", employee, Some("maxDailyHours"), default_hours) * 60.0;
            let mut expr = Expression::from(0.0);
            for slot in &slots {
                if let Some(v) = vars.x_var(&slot.id, employee_id) {
                    expr += v * paid_minutes_for(ctx, slot) as f64;
                }
            }
            out.push(expr.leq(cap_minutes));
        }
        out
    }
    fn score(&self, ctx: &ModelContext, vars: &ModelVars, values: &HashMap<Variable, f64>) -> f64 {
        let by_day = slots_by_employee_date(ctx);
        by_day
            .into_iter()
            .map(|((employee_id, _date), slots)| {
                let employee = ctx.employees.iter().find(|e| e.id == employee_id).unwrap();
                let cap = resolve(ctx.catalog, "momDailyHoursCap", employee, Some("maxDailyHours"), default_daily_hours(employee)) * 60.0;
                let worked: f64 = slots
                    .iter()
                    .map(|s| assigned_value(vars, values, &s.id, employee_id) * paid_minutes_for(ctx, s) as f64)
                    .sum();
                (worked - cap).max(0.0)
            })
            .sum()
    }
}

fn default_daily_hours(employee: &Employee) -> f64 {
    if employee.schemes.contains(&Scheme::A) {
        14.0
    } else if employee.schemes.contains(&Scheme::B) {
        13.0
    } else {
        9.0
    }
}

fn paid_minutes_for(ctx: &ModelContext, slot: &Slot) -> i64 {
    ctx.requirement_for(slot)
        .shifts_allowed
        .iter()
        .find(|s| s.code == slot.shift_code)
        .map(|s| s.paid_minutes)
        .unwrap_or(0)
}

/// C2 `momWeeklyHoursCap`: per Mon-anchored week, <= 44h (48h for APGD-D10:
/// scheme A + product type `APO`).
pub struct MomWeeklyHoursCap;
impl NamedConstraint for MomWeeklyHoursCap {
    fn id(&self) -> &'static str {
        "C2"
    }
    fn build(&self, ctx: &ModelContext, vars: &ModelVars) -> Vec<LpConstraint> {
        let mut by_week: HashMap<(EmployeeId, NaiveDate), Vec<&Slot>> = HashMap::new();
        for slot in ctx.slots {
            for employee in ctx.employees {
                if vars.x_var(&slot.id, employee.id).is_some() {
                    by_week.entry((employee.id, week_start(slot.date))).or_default().push(slot);
                }
            }
        }
        by_week
            .into_iter()
            .map(|((employee_id, _week), slots)| {
                let employee = ctx.employees.iter().find(|e| e.id == employee_id).unwrap();
                let cap_hours = weekly_cap_hours(ctx, employee);
                let mut expr = Expression::from(0.0);
                for slot in &slots {
                    if let Some(v) = vars.x_var(&slot.id, employee_id) {
                        expr += v * paid_minutes_for(ctx, slot) as f64;
                    }
                }
                expr.leq(cap_hours * 60.0)
            })
            .collect()
    }
    fn score(&self, ctx: &ModelContext, vars: &ModelVars, values: &HashMap<Variable, f64>) -> f64 {
        let mut by_week: HashMap<(EmployeeId, NaiveDate), Vec<&Slot>> = HashMap::new();
        for slot in ctx.slots {
            for employee in ctx.employees {
                if vars.x_var(&slot.id, employee.id).is_some() {
                    by_week.entry((employee.id, week_start(slot.date))).or_default().push(slot);
                }
            }
        }
        by_week
            .into_iter()
            .map(|((employee_id, _week), slots)| {
                let employee = ctx.employees.iter().find(|e| e.id == employee_id).unwrap();
                let cap = weekly_cap_hours(ctx, employee) * 60.0;
                let worked: f64 = slots
                    .iter()
                    .map(|s| assigned_value(vars, values, &s.id, employee_id) * paid_minutes_for(ctx, s) as f64)
                    .sum();
                (worked - cap).max(0.0)
            })
            .sum()
    }
}

fn is_apgd_d10(employee: &Employee) -> bool {
    employee.schemes.contains(&Scheme::A) && employee.product_type == "APO"
}

fn weekly_cap_hours(ctx: &ModelContext, employee: &Employee) -> f64 {
    let default = if is_apgd_d10(employee) { 48.0 } else { 44.0 };
    resolve(ctx.catalog, "momWeeklyHoursCap", employee, Some("maxWeeklyHours"), default)
}

/// C3 `maxConsecutiveWorkingDays`: no window of `k+1` days has work on
/// every day (k=8 for APGD-D10, 12 otherwise).
pub struct MaxConsecutiveWorkingDays;
impl NamedConstraint for MaxConsecutiveWorkingDays {
    fn id(&self) -> &'static str {
        "C3"
    }
    fn build(&self, ctx: &ModelContext, vars: &ModelVars) -> Vec<LpConstraint> {
        let dates: Vec<NaiveDate> = {
            let mut d: Vec<NaiveDate> = ctx.slots.iter().map(|s| s.date).collect();
            d.sort();
            d.dedup();
            d
        };
        let by_day = slots_by_employee_date(ctx);
        let mut out = Vec::new();
        for employee in ctx.employees {
            let k = consecutive_day_limit(ctx, employee);
            let window = k + 1;
            if dates.len() <= window {
                continue;
            }
            for start in 0..=dates.len() - window {
                let mut expr = Expression::from(0.0);
                for date in &dates[start..start + window] {
                    if let Some(slots) = by_day.get(&(employee.id, *date)) {
                        for slot in slots {
                            if let Some(v) = vars.x_var(&slot.id, employee.id) {
                                expr += v;
                            }
                        }
                    }
                }
                out.push(expr.leq(k as f64));
            }
        }
        out
    }
    fn score(&self, ctx: &ModelContext, vars: &ModelVars, values: &HashMap<Variable, f64>) -> f64 {
        let dates: Vec<NaiveDate> = {
            let mut d: Vec<NaiveDate> = ctx.slots.iter().map(|s| s.date).collect();
            d.sort();
            d.dedup();
            d
        };
        let by_day = slots_by_employee_date(ctx);
        let mut total = 0.0;
        for employee in ctx.employees {
            let k = consecutive_day_limit(ctx, employee);
            let window = k + 1;
            if dates.len() <= window {
                continue;
            }
            for start in 0..=dates.len() - window {
                let worked: f64 = dates[start..start + window]
                    .iter()
                    .flat_map(|date| by_day.get(&(employee.id, *date)).into_iter().flatten())
                    .map(|slot| assigned_value(vars, values, &slot.id, employee.id))
                    .sum();
                total += (worked - k as f64).max(0.0);
            }
        }
        total
    }
}

fn consecutive_day_limit(ctx: &ModelContext, employee: &Employee) -> usize {
    let default = if is_apgd_d10(employee) { 8.0 } else { 12.0 };
    resolve(ctx.catalog, "maxConsecutiveWorkingDays", employee, Some("maxConsecutiveDays"), default) as usize
}

/// C4 `apgdMinRestBetweenShifts`: for any two assignments of the same
/// employee, `start2 - end1 >= minRestHours(scheme)` (A=8h, B=8h, P=1h).
pub struct MinRestBetweenShifts;
impl NamedConstraint for MinRestBetweenShifts {
    fn id(&self) -> &'static str {
        "C4"
    }
    fn build(&self, ctx: &ModelContext, vars: &ModelVars) -> Vec<LpConstraint> {
        let mut out = Vec::new();
        for employee in ctx.employees {
            let min_rest_minutes = (min_rest_hours(ctx, employee) * 60.0) as i64;
            let mut eligible_slots: Vec<&Slot> = ctx
                .slots
                .iter()
                .filter(|s| vars.x_var(&s.id, employee.id).is_some())
                .collect();
            eligible_slots.sort_by_key(|s| s.date);
            for i in 0..eligible_slots.len() {
                for j in (i + 1)..eligible_slots.len() {
                    let a = eligible_slots[i];
                    let b = eligible_slots[j];
                    if a.id == b.id {
                        continue;
                    }
                    if gap_minutes(ctx, a, b) < min_rest_minutes {
                        if let (Some(va), Some(vb)) = (vars.x_var(&a.id, employee.id), vars.x_var(&b.id, employee.id)) {
                            out.push((Expression::from(va) + vb).leq(1.0));
                        }
                    }
                }
            }
        }
        out
    }
    fn score(&self, ctx: &ModelContext, vars: &ModelVars, values: &HashMap<Variable, f64>) -> f64 {
        let mut violations = 0.0;
        for employee in ctx.employees {
            let min_rest_minutes = (min_rest_hours(ctx, employee) * 60.0) as i64;
            let assigned: Vec<&Slot> = ctx
                .slots
                .iter()
                .filter(|s| assigned_value(vars, values, &s.id, employee.id) > 0.5)
                .collect();
            for i in 0..assigned.len() {
                for j in (i + 1)..assigned.len() {
                    if gap_minutes(ctx, assigned[i], assigned[j]) < min_rest_minutes {
                        violations += 1.0;
                    }
                }
            }
        }
        violations
    }
}

fn min_rest_hours(ctx: &ModelContext, employee: &Employee) -> f64 {
    let default = if employee.schemes.contains(&Scheme::P) {
        1.0
    } else {
        8.0
    };
    resolve(ctx.catalog, "apgdMinRestBetweenShifts", employee, Some("minRestHours"), default)
}

/// Minutes between the end of the earlier slot and the start of the later
/// one on a different date; slots on the same date are never "gapped"
/// (mutually exclusive via C6) so this returns `i64::MAX` for same-day pairs.
fn gap_minutes(ctx: &ModelContext, a: &Slot, b: &Slot) -> i64 {
    if a.date == b.date {
        return i64::MAX;
    }
    let (earlier, later) = if a.date < b.date { (a, b) } else { (b, a) };
    let earlier_shift = ctx
        .requirement_for(earlier)
        .shifts_allowed
        .iter()
        .find(|s| s.code == earlier.shift_code);
    let later_shift = ctx
        .requirement_for(later)
        .shifts_allowed
        .iter()
        .find(|s| s.code == later.shift_code);
    match (earlier_shift, later_shift) {
        (Some(es), Some(ls)) => {
            let earlier_end = earlier.date.and_time(es.end);
            let later_start = later.date.and_time(ls.start);
            (later_start - earlier_end).num_minutes()
        }
        _ => i64::MAX,
    }
}

/// C5 `minOffDaysPerWeek`: each calendar week has >= 1 day with no
/// assignment, i.e. an employee works at most `days_in_week - 1` days.
pub struct MinOffDaysPerWeek;
impl NamedConstraint for MinOffDaysPerWeek {
    fn id(&self) -> &'static str {
        "C5"
    }
    fn build(&self, ctx: &ModelContext, vars: &ModelVars) -> Vec<LpConstraint> {
        let mut by_week: HashMap<(EmployeeId, NaiveDate), HashSet<NaiveDate>> = HashMap::new();
        for slot in ctx.slots {
            for employee in ctx.employees {
                if vars.x_var(&slot.id, employee.id).is_some() {
                    by_week.entry((employee.id, week_start(slot.date))).or_default().insert(slot.date);
                }
            }
        }
        let by_day = slots_by_employee_date(ctx);
        by_week
            .into_iter()
            .map(|((employee_id, _week), dates)| {
                let mut expr = Expression::from(0.0);
                for date in &dates {
                    if let Some(slots) = by_day.get(&(employee_id, *date)) {
                        for slot in slots {
                            if let Some(v) = vars.x_var(&slot.id, employee_id) {
                                expr += v;
                            }
                        }
                    }
                }
                expr.leq((dates.len() as f64 - 1.0).max(0.0))
            })
            .collect()
    }
    fn score(&self, ctx: &ModelContext, vars: &ModelVars, values: &HashMap<Variable, f64>) -> f64 {
        let mut by_week: HashMap<(EmployeeId, NaiveDate), HashSet<NaiveDate>> = HashMap::new();
        for slot in ctx.slots {
            for employee in ctx.employees {
                if vars.x_var(&slot.id, employee.id).is_some() {
                    by_week.entry((employee.id, week_start(slot.date))).or_default().insert(slot.date);
                }
            }
        }
        let by_day = slots_by_employee_date(ctx);
        by_week
            .into_iter()
            .map(|((employee_id, _week), dates)| {
                let worked_days = dates
                    .iter()
                    .filter(|date| {
                        by_day
                            .get(&(employee_id, **date))
                            .map(|slots| slots.iter().any(|s| assigned_value(vars, values, &s.id, employee_id) > 0.5))
                            .unwrap_or(false)
                    })
                    .count();
                (worked_days as f64 - (dates.len() as f64 - 1.0)).max(0.0)
            })
            .sum()
    }
}

/// C17 `apgdMonthlyOvertimeCap`: for APGD-D10 employees, per calendar
/// month, sum of overtime minutes <= cap. Overtime per assignment is the
/// paid minutes beyond the scheme's default daily hours.
pub struct ApgdMonthlyOvertimeCap;
impl NamedConstraint for ApgdMonthlyOvertimeCap {
    fn id(&self) -> &'static str {
        "C17"
    }
    fn build(&self, ctx: &ModelContext, vars: &ModelVars) -> Vec<LpConstraint> {
        let mut by_month: HashMap<(EmployeeId, u32, i32), Vec<&Slot>> = HashMap::new();
        for slot in ctx.slots {
            for employee in ctx.employees {
                if is_apgd_d10(employee) && vars.x_var(&slot.id, employee.id).is_some() {
                    use chrono::Datelike;
                    by_month
                        .entry((employee.id, slot.date.month(), slot.date.year()))
                        .or_default()
                        .push(slot);
                }
            }
        }
        by_month
            .into_iter()
            .map(|((employee_id, _m, _y), slots)| {
                let employee = ctx.employees.iter().find(|e| e.id == employee_id).unwrap();
                let cap_minutes = resolve(ctx.catalog, "apgdMonthlyOvertimeCap", employee, Some("maxOvertimeHours"), 124.0) * 60.0;
                let standard_daily_minutes = (default_daily_hours(employee) * 60.0) as i64;
                let mut expr = Expression::from(0.0);
                for slot in &slots {
                    let overtime = (paid_minutes_for(ctx, slot) - standard_daily_minutes).max(0) as f64;
                    if overtime > 0.0 {
                        if let Some(v) = vars.x_var(&slot.id, employee_id) {
                            expr += v * overtime;
                        }
                    }
                }
                expr.leq(cap_minutes)
            })
            .collect()
    }
    fn score(&self, ctx: &ModelContext, vars: &ModelVars, values: &HashMap<Variable, f64>) -> f64 {
        use chrono::Datelike;
        let mut by_month: HashMap<(EmployeeId, u32, i32), Vec<&Slot>> = HashMap::new();
        for slot in ctx.slots {
            for employee in ctx.employees {
                if is_apgd_d10(employee) && vars.x_var(&slot.id, employee.id).is_some() {
                    by_month
                        .entry((employee.id, slot.date.month(), slot.date.year()))
                        .or_default()
                        .push(slot);
                }
            }
        }
        by_month
            .into_iter()
            .map(|((employee_id, _m, _y), slots)| {
                let employee = ctx.employees.iter().find(|e| e.id == employee_id).unwrap();
                let cap = resolve(ctx.catalog, "apgdMonthlyOvertimeCap", employee, Some("maxOvertimeHours"), 124.0) * 60.0;
                let standard_daily_minutes = (default_daily_hours(employee) * 60.0) as i64;
                let worked: f64 = slots
                    .iter()
                    .map(|s| {
                        let overtime = (paid_minutes_for(ctx, s) - standard_daily_minutes).max(0) as f64;
                        assigned_value(vars, values, &s.id, employee_id) * overtime
                    })
                    .sum();
                (worked - cap).max(0.0)
            })
            .sum()
    }
}

/// Returns the full hard-constraint catalog, respecting each spec's
/// `enabled` flag.
pub fn hard_catalog() -> Vec<Box<dyn NamedConstraint>> {
    vec![
        Box::new(AtMostOneShiftPerDay),
        Box::new(Headcount),
        Box::new(MomDailyHoursCap),
        Box::new(MomWeeklyHoursCap),
        Box::new(MaxConsecutiveWorkingDays),
        Box::new(MinRestBetweenShifts),
        Box::new(MinOffDaysPerWeek),
        Box::new(ApgdMonthlyOvertimeCap),
    ]
}

pub fn active_constraints(catalog: &ConstraintCatalog, all: Vec<Box<dyn NamedConstraint>>) -> Vec<Box<dyn NamedConstraint>> {
    all.into_iter()
        .filter(|c| catalog.get(c.id()).map(|spec| spec.enabled).unwrap_or(true))
        .collect()
}
