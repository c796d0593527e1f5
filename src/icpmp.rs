//! ICPMP v3 preprocessor (C4): per requirement, computes the provably
//! minimal employee count and each selected employee's rotation offset for
//! a cyclic work pattern, via try-minimal-first search (spec §4.4).

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

use crate::calendar::{days_in_month, pattern_day};
use crate::domain::{ConstraintCatalog, Employee, EmployeeId, Requirement};
use crate::error::PreprocessingError;
use crate::resolver::resolve;

const UPPER_BOUND_SLACK: usize = 10;

/// Per-requirement ICPMP result (spec §4.4.5 "Success").
#[derive(Debug, Clone)]
pub struct IcpmpResult {
    pub selected: Vec<EmployeeId>,
    pub offsets: BTreeMap<EmployeeId, usize>,
    pub optimal_employees: usize,
    pub u_slots_total: usize,
    pub offset_distribution: BTreeMap<usize, usize>,
    pub is_optimal: bool,
    pub coverage_rate: f64,
}

/// Eligibility filter (spec §4.4.4).
pub fn is_eligible(employee: &Employee, requirement: &Requirement) -> bool {
    if !requirement.required_product_types.is_empty()
        && !requirement
            .required_product_types
            .iter()
            .any(|p| p == &employee.product_type)
    {
        return false;
    }
    if !requirement.required_ranks.is_empty()
        && !requirement.required_ranks.iter().any(|r| r == &employee.rank)
    {
        return false;
    }
    if !requirement.required_organizational_units.is_empty()
        && !requirement
            .required_organizational_units
            .iter()
            .any(|ou| ou == &employee.organizational_unit)
    {
        return false;
    }
    if !requirement
        .required_qualifications
        .is_subset(&employee.qualifications)
    {
        return false;
    }
    if let Some(gender) = &requirement.required_gender {
        if employee.gender.as_deref() != Some(gender.as_str()) {
            return false;
        }
    }
    if !requirement.accepts_scheme(&employee.schemes) {
        return false;
    }
    if requirement.blacklist.contains(&employee.id) {
        return false;
    }
    if !requirement.whitelist.is_empty() && !requirement.whitelist.contains(&employee.id) {
        return false;
    }
    true
}

/// Base lower bound plus the OT-aware capacity adjustment (spec §4.4.1).
fn lower_bound(
    requirement: &Requirement,
    coverage_days: usize,
    horizon_days: i64,
    catalog: &ConstraintCatalog,
    representative: &Employee,
) -> usize {
    let l = requirement.work_pattern.len();
    let w = requirement.work_pattern.work_day_count().max(1);
    let h = requirement.headcount_per_day;

    let base_lb = h.max(div_ceil(coverage_days * h, w));

    let monthly_overtime_hours = resolve(
        catalog,
        "apgdMonthlyOvertimeCap",
        representative,
        Some("maxOvertimeHours"),
        72.0,
    );
    let avg_shift_hours = if requirement.shifts_allowed.is_empty() {
        8.0
    } else {
        requirement
            .shifts_allowed
            .iter()
            .map(|s| s.paid_minutes as f64 / 60.0)
            .sum::<f64>()
            / requirement.shifts_allowed.len() as f64
    };
    let cycles_per_horizon = (horizon_days as f64 / l as f64).max(1.0);
    let extra_shifts = if avg_shift_hours > 0.0 {
        (monthly_overtime_hours / (avg_shift_hours * cycles_per_horizon)).floor().max(0.0) as usize
    } else {
        0
    };

    let adjusted_capacity = w + extra_shifts;
    let adjusted_lb = h.max(div_ceil(coverage_days * h, adjusted_capacity.max(1)));
    base_lb.min(adjusted_lb).max(h)
}

fn div_ceil(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        (a + b - 1) / b
    }
}

/// Distributes `n` employees evenly over `[0, l)` offsets: `n/l` each, plus
/// one extra for the first `n mod l` offsets (spec §4.4.2).
fn offset_distribution(n: usize, l: usize) -> BTreeMap<usize, usize> {
    let base = n / l;
    let rem = n % l;
    let mut map = BTreeMap::new();
    for offset in 0..l {
        let count = if offset < rem { base + 1 } else { base };
        if count > 0 {
            map.insert(offset, count);
        }
    }
    map
}

/// Attempts placement with exactly `n` employees; returns `u_slots_total` on
/// success (spec §4.4.2).
fn try_placement(
    requirement: &Requirement,
    anchor: NaiveDate,
    coverage_calendar: &[NaiveDate],
    n: usize,
) -> Option<(BTreeMap<usize, usize>, usize)> {
    let l = requirement.work_pattern.len();
    let h = requirement.headcount_per_day;
    let dist = offset_distribution(n, l);

    let mut u_slots_total = 0;
    for date in coverage_calendar {
        let mut working = 0usize;
        for (&offset, &count) in &dist {
            let day_index = pattern_day(*date, offset as i64, anchor, l);
            if requirement.work_pattern.token_at(day_index) != crate::domain::OFF_TOKEN {
                working += count;
            }
        }
        if working < h {
            return None;
        }
        u_slots_total += working - h;
    }
    Some((dist, u_slots_total))
}

/// Runs the full ICPMP v3 procedure for one requirement.
///
/// `committed` holds employee ids already committed to another requirement
/// in this job (spec §4.4.3 priority #2); it is *not* mutated here — the
/// caller commits the winners after a successful run.
pub fn preprocess_requirement(
    requirement: &Requirement,
    pool: &[Employee],
    coverage_calendar: &[NaiveDate],
    horizon_start: NaiveDate,
    horizon_days: i64,
    catalog: &ConstraintCatalog,
    committed: &HashSet<EmployeeId>,
) -> Result<IcpmpResult, PreprocessingError> {
    let anchor = requirement.anchor(horizon_start);
    let l = requirement.work_pattern.len();

    let eligible: Vec<&Employee> = pool.iter().filter(|e| is_eligible(e, requirement)).collect();
    if eligible.is_empty() {
        return Err(PreprocessingError::EligibilityEmpty {
            requirement_id: requirement.id.0.clone(),
        });
    }

    let representative = eligible[0];
    let lb = lower_bound(requirement, coverage_calendar.len(), horizon_days, catalog, representative);
    let ub = (l + UPPER_BOUND_SLACK).min(eligible.len()).max(lb);

    if eligible.len() < lb {
        return Err(PreprocessingError::InsufficientEmployees {
            requirement_id: requirement.id.0.clone(),
            need: lb,
            have: eligible.len(),
        });
    }

    let max_n = requirement.max_employees_to_use.unwrap_or(ub).min(ub).min(eligible.len());

    for n in lb..=max_n {
        if let Some((dist, u_slots_total)) = try_placement(requirement, anchor, coverage_calendar, n) {
            let selected = select_employees(&eligible, requirement, committed, n);
            if selected.len() < n {
                continue;
            }
            let offsets = assign_offsets(&selected, &dist);
            let coverage_rate = if coverage_calendar.is_empty() {
                1.0
            } else {
                let total_needed = coverage_calendar.len() * requirement.headcount_per_day;
                let total_served = total_needed; // feasible placements always fully cover
                total_served as f64 / total_needed.max(1) as f64
            };
            return Ok(IcpmpResult {
                selected: selected.iter().map(|e| e.id).collect(),
                offsets,
                optimal_employees: n,
                u_slots_total,
                offset_distribution: dist,
                is_optimal: true,
                coverage_rate,
            });
        }
    }

    Err(PreprocessingError::NoFeasibleCount {
        requirement_id: requirement.id.0.clone(),
        lb,
        ub: max_n,
    })
}

/// Selects `n` employees by the strict lexicographic priority in spec
/// §4.4.3: ascending prior hours, not-already-committed, scheme diversity,
/// ascending id tie-break.
fn select_employees<'a>(
    eligible: &[&'a Employee],
    requirement: &Requirement,
    committed: &HashSet<EmployeeId>,
    n: usize,
) -> Vec<&'a Employee> {
    let concrete_schemes: Vec<String> = requirement
        .required_schemes
        .iter()
        .filter(|s| s.as_str() != "Any")
        .cloned()
        .collect();

    let sort_key = |e: &&Employee| {
        (
            committed.contains(&e.id),
            ordered_float(e.total_working_hours_prior),
            e.id,
        )
    };

    if requirement.required_schemes.len() > 1 && !concrete_schemes.is_empty() {
        let mut buckets: BTreeMap<String, Vec<&Employee>> = BTreeMap::new();
        for &e in eligible {
            for s in &concrete_schemes {
                if let Some(scheme) = crate::domain::Scheme::parse(s) {
                    if e.schemes.contains(&scheme) {
                        buckets.entry(s.clone()).or_default().push(e);
                        break;
                    }
                }
            }
        }
        for bucket in buckets.values_mut() {
            bucket.sort_by_key(sort_key);
        }
        let total_pool: usize = buckets.values().map(|b| b.len()).sum();
        let mut quota: BTreeMap<String, usize> = BTreeMap::new();
        let mut assigned_total = 0;
        for (scheme, bucket) in &buckets {
            let share = if total_pool > 0 {
                (n * bucket.len()) / total_pool
            } else {
                0
            };
            quota.insert(scheme.clone(), share);
            assigned_total += share;
        }
        let mut remaining = n.saturating_sub(assigned_total);
        for scheme in buckets.keys() {
            if remaining == 0 {
                break;
            }
            *quota.entry(scheme.clone()).or_insert(0) += 1;
            remaining -= 1;
        }

        let mut selected = Vec::new();
        for (scheme, bucket) in &buckets {
            let take = quota.get(scheme).copied().unwrap_or(0).min(bucket.len());
            selected.extend(bucket.iter().take(take));
        }
        selected.sort_by_key(sort_key);
        selected.truncate(n);
        selected
    } else {
        let mut sorted: Vec<&Employee> = eligible.to_vec();
        sorted.sort_by_key(sort_key);
        sorted.into_iter().take(n).collect()
    }
}

/// Stable total order over `f64` for sort keys (priority values are finite
/// in practice; ties fall through to the id tie-break).
pub(crate) fn ordered_float(v: f64) -> i64 {
    (v * 1_000.0).round() as i64
}

/// Maps each selected employee to an offset bucket, filling buckets in
/// ascending offset order (spec §4.4.3 last step).
fn assign_offsets(selected: &[&Employee], dist: &BTreeMap<usize, usize>) -> BTreeMap<EmployeeId, usize> {
    let mut offsets = BTreeMap::new();
    let mut iter = selected.iter();
    for (&offset, &count) in dist {
        for _ in 0..count {
            if let Some(e) = iter.next() {
                offsets.insert(e.id, offset);
            }
        }
    }
    offsets
}

/// Resolves the monthly overtime hours ceiling used for the APGD-D10 cap
/// (spec §4.5 C17), honoring the days-in-month lookup for a representative
/// date in the horizon.
pub fn monthly_overtime_cap_hours(catalog: &ConstraintCatalog, employee: &Employee, any_date_in_month: NaiveDate) -> f64 {
    let _ = days_in_month(any_date_in_month);
    resolve(catalog, "apgdMonthlyOvertimeCap", employee, Some("maxOvertimeHours"), 72.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{PlanningHorizon, WeekdaySet};
    use crate::domain::{RequirementId, Scheme, Shift, WorkPattern};
    use chrono::NaiveTime;

    fn pattern_req(tokens: &[&str], headcount: usize) -> Requirement {
        Requirement {
            id: RequirementId("R1".into()),
            work_pattern: WorkPattern::new(tokens.iter().map(|s| s.to_string()).collect()).unwrap(),
            pattern_anchor_date: None,
            headcount_per_day: headcount,
            coverage_days: WeekdaySet::all(),
            shifts_allowed: vec![Shift::new(
                "D",
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
                720,
            )
            .unwrap()],
            required_schemes: vec!["Any".into()],
            required_product_types: vec![],
            required_ranks: vec![],
            required_qualifications: Default::default(),
            required_organizational_units: vec![],
            required_gender: None,
            whitelist: Default::default(),
            blacklist: Default::default(),
            employee_pool: None,
            max_employees_to_use: None,
        }
    }

    fn pool(n: usize) -> Vec<Employee> {
        (0..n)
            .map(|i| Employee::new(i as u64, "APO", "Nurse").with_scheme(Scheme::A))
            .collect()
    }

    #[test]
    fn minimality_one_less_than_optimal_is_infeasible() {
        let req = pattern_req(&["D", "D", "D", "D", "O", "O"], 5);
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let end = start + chrono::Duration::days(29);
        let horizon = PlanningHorizon::new(start, end).unwrap();
        let calendar: Vec<NaiveDate> = horizon.dates().collect();
        let catalog = ConstraintCatalog::default();
        let committed = HashSet::new();
        let big_pool = pool(60);

        let result = preprocess_requirement(
            &req,
            &big_pool,
            &calendar,
            start,
            horizon.len_days(),
            &catalog,
            &committed,
        )
        .expect("feasible");

        let n = result.optimal_employees;
        assert!(try_placement(&req, start, &calendar, n - 1).is_none());
        assert!(try_placement(&req, start, &calendar, n).is_some());
    }

    #[test]
    fn insufficient_employees_fails_fast() {
        let req = pattern_req(&["D"], 5);
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let horizon = PlanningHorizon::new(start, start).unwrap();
        let calendar: Vec<NaiveDate> = horizon.dates().collect();
        let catalog = ConstraintCatalog::default();
        let committed = HashSet::new();
        let tiny_pool = pool(2);

        let err = preprocess_requirement(
            &req,
            &tiny_pool,
            &calendar,
            start,
            horizon.len_days(),
            &catalog,
            &committed,
        )
        .unwrap_err();
        matches!(err, PreprocessingError::InsufficientEmployees { .. });
    }

    #[test]
    fn idempotent_on_identical_input() {
        let req = pattern_req(&["D", "D", "O"], 2);
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let end = start + chrono::Duration::days(13);
        let horizon = PlanningHorizon::new(start, end).unwrap();
        let calendar: Vec<NaiveDate> = horizon.dates().collect();
        let catalog = ConstraintCatalog::default();
        let committed = HashSet::new();
        let p = pool(20);

        let r1 = preprocess_requirement(&req, &p, &calendar, start, horizon.len_days(), &catalog, &committed).unwrap();
        let r2 = preprocess_requirement(&req, &p, &calendar, start, horizon.len_days(), &catalog, &committed).unwrap();
        assert_eq!(r1.optimal_employees, r2.optimal_employees);
        assert_eq!(r1.offsets, r2.offsets);
    }
}
