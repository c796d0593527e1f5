//! CP-SAT-style model builder (C6): decision variables, the constraint
//! catalog, the lexicographic objective, and result extraction (spec §4.6).
//!
//! The underlying solver is a mixed-integer linear program rather than a
//! native CP-SAT backend — `good_lp` over the bundled `microlp` solver plays
//! the same role: binary `x[s,e]`/`u[s]` variables, linear hard constraints,
//! a weighted objective. The wall-clock budget in `SolverConfig` is enforced
//! by the caller (`worker`), which bounds the blocking solve with a timeout
//! rather than inside the model itself.

use chrono::NaiveDate;
use good_lp::{variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
use std::collections::HashMap;

use crate::constraints::{active_constraints, eligible_pairs, hard_catalog, ModelContext, ModelVars};
use crate::domain::{Assignment, AssignmentStatus, ConstraintCatalog, Employee, Requirement, RequirementId, Slot, SlotId};
use crate::error::{RosterError, SolveStatus};

/// Large-to-small weights realizing the lexicographic objective of spec
/// §4.6: coverage gaps dominate gap-minimization, which dominates other
/// soft terms. Hard constraints are modeled as strict constraints, not
/// penalties, so `W_hard` has no runtime role here.
const W_COVERAGE: f64 = 1_000.0;
const W_GAP: f64 = 1.0;

pub struct SolveOutcome {
    pub status: SolveStatus,
    pub assignments: Vec<Assignment>,
    pub hard_score: f64,
    pub soft_score: f64,
}

/// Estimated decision-variable count, used by the capacity check in spec §5.
pub fn estimate_variable_count(slots: &[Slot], employees: &[Employee]) -> usize {
    slots.len().saturating_mul(employees.len())
}

/// Builds and solves the model for one job's slots/employees (spec §4.6).
/// `horizon_start` anchors any requirement with no explicit
/// `patternAnchorDate` (spec §9), matching ICPMP and the roster builder.
/// `offsets_fixed` should be `true` whenever ICPMP (C4) ran successfully.
pub fn solve(
    slots: &[Slot],
    employees: &[Employee],
    requirements: &std::collections::BTreeMap<RequirementId, Requirement>,
    catalog: &ConstraintCatalog,
    horizon_start: NaiveDate,
    offsets_fixed: bool,
) -> Result<SolveOutcome, RosterError> {
    let ctx = ModelContext {
        slots,
        employees,
        requirements,
        catalog,
        horizon_start,
        offsets_fixed,
    };

    let pairs = eligible_pairs(&ctx);

    let mut pb = ProblemVariables::new();
    let mut x = HashMap::new();
    for (slot_id, employee_id) in &pairs {
        let v = pb.add(variable().binary());
        x.insert((slot_id.clone(), *employee_id), v);
    }
    let mut u = HashMap::new();
    for slot in slots {
        let v = pb.add(variable().binary());
        u.insert(slot.id.clone(), v);
    }
    let gap_vars = build_gap_vars(&ctx, &mut pb);

    let vars = ModelVars { x, u };

    let mut objective = Expression::from(0.0);
    for v in vars.u.values() {
        objective += *v * W_COVERAGE;
    }
    for v in gap_vars.values() {
        objective += *v * W_GAP;
    }

    let catalog_constraints = active_constraints(catalog, hard_catalog());
    let mut hard_constraints = Vec::new();
    for constraint in &catalog_constraints {
        hard_constraints.extend(constraint.build(&ctx, &vars));
    }
    hard_constraints.extend(build_gap_constraints(&ctx, &vars, &gap_vars));

    let mut problem = pb.minimise(objective).using(good_lp::microlp);
    for constraint in hard_constraints {
        problem = problem.with(constraint);
    }

    let solution = match problem.solve() {
        Ok(solution) => solution,
        Err(good_lp::ResolutionError::Infeasible) => {
            return Ok(SolveOutcome {
                status: SolveStatus::Infeasible,
                assignments: Vec::new(),
                hard_score: 0.0,
                soft_score: 0.0,
            });
        }
        Err(good_lp::ResolutionError::Unbounded) => {
            return Err(RosterError::Solver("model unbounded".into()));
        }
        Err(other) => return Err(RosterError::Solver(other.to_string())),
    };

    let values: HashMap<Variable, f64> = vars
        .x
        .values()
        .chain(vars.u.values())
        .chain(gap_vars.values())
        .map(|v| (*v, solution.value(*v)))
        .collect();

    let hard_score: f64 = catalog_constraints.iter().map(|c| c.score(&ctx, &vars, &values)).sum();
    let coverage_penalty: f64 = vars.u.values().map(|v| values.get(v).copied().unwrap_or(0.0)).sum();
    let gap_penalty: f64 = gap_vars.values().map(|v| values.get(v).copied().unwrap_or(0.0)).sum();

    let assignments = extract_assignments(&ctx, &vars, &values);
    let status = if hard_score > 1e-6 {
        SolveStatus::Feasible
    } else {
        SolveStatus::Optimal
    };

    Ok(SolveOutcome {
        status,
        assignments,
        hard_score,
        soft_score: coverage_penalty * W_COVERAGE + gap_penalty * W_GAP,
    })
}

/// S18 `minimizeGaps` support: one binary `g[e,date]` per (employee,
/// fixed-pattern work day), `1` if no slot was assigned that day.
fn build_gap_vars(ctx: &ModelContext, pb: &mut ProblemVariables) -> HashMap<(crate::domain::EmployeeId, chrono::NaiveDate), Variable> {
    let mut gaps = HashMap::new();
    if !ctx.offsets_fixed {
        return gaps;
    }
    let mut work_days: std::collections::HashSet<(crate::domain::EmployeeId, chrono::NaiveDate)> = Default::default();
    for slot in ctx.slots {
        for employee in ctx.employees {
            if ctx.pattern_matches(slot, employee) {
                work_days.insert((employee.id, slot.date));
            }
        }
    }
    for key in work_days {
        gaps.insert(key, pb.add(variable().binary()));
    }
    gaps
}

fn build_gap_constraints(
    ctx: &ModelContext,
    vars: &ModelVars,
    gap_vars: &HashMap<(crate::domain::EmployeeId, chrono::NaiveDate), Variable>,
) -> Vec<good_lp::Constraint> {
    let mut out = Vec::new();
    for (&(employee_id, date), &g) in gap_vars {
        let slot_ids: Vec<SlotId> = ctx
            .slots
            .iter()
            .filter(|s| s.date == date && vars.x_var(&s.id, employee_id).is_some())
            .map(|s| s.id.clone())
            .collect();
        let worked = vars.employee_slot_sum(employee_id, slot_ids.iter());
        // g >= 1 - worked  <=>  worked + g >= 1
        out.push((worked + g).geq(1.0));
    }
    out
}

fn extract_assignments(ctx: &ModelContext, vars: &ModelVars, values: &HashMap<Variable, f64>) -> Vec<Assignment> {
    let mut assignments = Vec::with_capacity(ctx.slots.len());
    for slot in ctx.slots {
        let winner = ctx.employees.iter().find(|e| {
            vars.x_var(&slot.id, e.id)
                .and_then(|v| values.get(&v))
                .map(|v| *v > 0.5)
                .unwrap_or(false)
        });
        match winner {
            Some(employee) => assignments.push(Assignment {
                slot_id: slot.id.clone(),
                employee_id: Some(employee.id),
                status: AssignmentStatus::Assigned,
                pattern_day: employee.rotation_offset.map(|offset| {
                    let requirement = ctx.requirement_for(slot);
                    let anchor = requirement.anchor(ctx.horizon_start);
                    crate::calendar::pattern_day(slot.date, offset as i64, anchor, requirement.work_pattern.len())
                }),
                reason: None,
            }),
            None => assignments.push(Assignment {
                slot_id: slot.id.clone(),
                employee_id: None,
                status: AssignmentStatus::Unassigned,
                pattern_day: None,
                reason: None,
            }),
        }
    }
    assignments
}
