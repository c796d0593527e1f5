//! Worker pool (C8): a fixed number of workers looping
//! blocking-pop -> claim -> execute solve -> write result, plus the
//! synchronous end-to-end pipeline (C3 -> C4 -> C6 -> C7) each worker runs
//! in isolation (spec §4.8.4).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::{CachedRatio, RatioCache, RatioCacheKey};
use crate::calendar::PlanningHorizon;
use crate::config::SolverConfig;
use crate::domain::{ConstraintCatalog, DemandItem, Employee, EmployeeId, Requirement, RequirementId};
use crate::error::{Result, RosterError};
use crate::icpmp::{preprocess_requirement, IcpmpResult};
use crate::queue::Store;
use crate::roster::{build_icpmp_summary, build_roster, RosterOutput};
use crate::slots::build_slot_model;
use crate::solver::{estimate_variable_count, solve};

/// The full solver input document (spec §6.1): planning horizon, employee
/// pool, demand items, constraint catalog, and an optional per-job config
/// override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveInput {
    pub horizon: PlanningHorizon,
    pub employees: Vec<Employee>,
    pub demand_items: Vec<DemandItem>,
    pub catalog: ConstraintCatalog,
    #[serde(default)]
    pub solver_config: Option<SolverConfig>,
}

/// Runs the synchronous pipeline for one job: build slots (C3), preprocess
/// every requirement with ICPMP (C4), solve (C6), assemble the roster (C7).
/// This is the function a worker calls between claim and write-result; it
/// never touches the store itself.
pub fn execute(input: &SolveInput, base_config: &SolverConfig, cache: &RatioCache) -> Result<RosterOutput> {
    let config = input.solver_config.unwrap_or(*base_config);
    let slot_model = build_slot_model(&input.demand_items, &input.horizon);

    let estimated_vars = estimate_variable_count(&slot_model.slots, &input.employees);
    if estimated_vars > config.variable_ceiling {
        return Err(RosterError::CapacityExceeded {
            estimated: estimated_vars,
            ceiling: config.variable_ceiling,
        });
    }

    let mut employees = input.employees.clone();
    let mut committed: HashSet<EmployeeId> = HashSet::new();
    let mut icpmp_results: BTreeMap<RequirementId, IcpmpResult> = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut anchors: HashMap<RequirementId, NaiveDate> = HashMap::new();
    let mut pattern_lengths: HashMap<RequirementId, usize> = HashMap::new();
    let mut pattern_tokens: HashMap<RequirementId, Vec<String>> = HashMap::new();
    let mut offsets_fixed = false;

    let mut requirements = BTreeMap::new();
    for item in &input.demand_items {
        for requirement in &item.requirements {
            requirements.insert(requirement.id.clone(), requirement.clone());
        }
    }

    for (requirement_id, calendar) in &slot_model.coverage_calendars {
        let requirement = &requirements[requirement_id];
        anchors.insert(requirement_id.clone(), requirement.anchor(input.horizon.start_date));
        pattern_lengths.insert(requirement_id.clone(), requirement.work_pattern.len());
        pattern_tokens.insert(requirement_id.clone(), requirement.work_pattern.tokens().to_vec());

        let cache_key = ratio_cache_key(requirement, calendar.len(), input.horizon.len_days());
        if let Some(hit) = cache.get(&cache_key) {
            let offsets = commit_cached(&mut employees, &mut committed, requirement, &hit);
            icpmp_results.insert(
                requirement_id.clone(),
                IcpmpResult {
                    selected: offsets.keys().copied().collect(),
                    offsets,
                    optimal_employees: hit.optimal_employees,
                    u_slots_total: hit.u_slots_total,
                    offset_distribution: hit.offset_distribution.clone(),
                    is_optimal: hit.is_optimal,
                    coverage_rate: hit.coverage_rate,
                },
            );
            offsets_fixed = true;
            continue;
        }

        match preprocess_requirement(
            requirement,
            &employees,
            calendar,
            input.horizon.start_date,
            input.horizon.len_days(),
            &input.catalog,
            &committed,
        ) {
            Ok(result) => {
                for (&employee_id, &offset) in &result.offsets {
                    if let Some(e) = employees.iter_mut().find(|e| e.id == employee_id) {
                        e.rotation_offset = Some(offset);
                    }
                    committed.insert(employee_id);
                }
                cache.insert(&cache_key, CachedRatio::from(&result));
                icpmp_results.insert(requirement_id.clone(), result);
                offsets_fixed = true;
            }
            Err(err @ crate::error::PreprocessingError::InsufficientEmployees { .. }) => {
                return Err(RosterError::Preprocessing(err));
            }
            Err(other) => {
                warnings.push(other.to_string());
            }
        }
    }

    let outcome = solve(&slot_model.slots, &employees, &requirements, &input.catalog, input.horizon.start_date, offsets_fixed)?;

    let mut assignment_requirement = HashMap::new();
    let mut assignment_date = HashMap::new();
    let mut assignment_shift = HashMap::new();
    for slot in &slot_model.slots {
        assignment_requirement.insert(slot.id.clone(), slot.requirement_id.clone());
        assignment_date.insert(slot.id.clone(), slot.date);
        assignment_shift.insert(slot.id.clone(), slot.shift_code.clone());
    }

    let (employee_roster, roster_summary) = build_roster(
        &input.horizon,
        &employees,
        &committed,
        &outcome.assignments,
        &anchors,
        &pattern_lengths,
        &pattern_tokens,
        &assignment_requirement,
        &assignment_date,
        &assignment_shift,
    );

    Ok(RosterOutput {
        solve_status: outcome.status,
        employee_roster,
        roster_summary,
        icpmp_preprocessing: build_icpmp_summary(&icpmp_results, warnings),
    })
}

fn ratio_cache_key(requirement: &crate::domain::Requirement, coverage_day_count: usize, horizon_length_days: i64) -> RatioCacheKey {
    let scheme_mix: Vec<String> = requirement.required_schemes.clone();
    RatioCacheKey {
        pattern_tokens: requirement.work_pattern.tokens().to_vec(),
        headcount_per_day: requirement.headcount_per_day,
        coverage_day_count,
        horizon_length_days,
        scheme_mix,
    }
}

/// Applies a cached ratio's offset distribution to the job-local employee
/// copy without re-running ICPMP's selection search. The cache key excludes
/// eligibility-affecting fields (`requiredProductTypes`/`requiredRanks`/
/// `requiredQualifications`/...), so candidates still need filtering against
/// the live requirement; selection order follows the same fairness priority
/// (spec §4.4.3) as the non-cached path so a cache hit can't diverge from
/// what ICPMP itself would have picked.
fn commit_cached(
    employees: &mut [Employee],
    committed: &mut HashSet<EmployeeId>,
    requirement: &Requirement,
    cached: &CachedRatio,
) -> BTreeMap<EmployeeId, usize> {
    let mut offsets: Vec<usize> = Vec::new();
    for (&offset, &count) in &cached.offset_distribution {
        for _ in 0..count {
            offsets.push(offset);
        }
    }

    let mut candidates: Vec<&mut Employee> = employees
        .iter_mut()
        .filter(|e| !committed.contains(&e.id) && crate::icpmp::is_eligible(e, requirement))
        .collect();
    candidates.sort_by_key(|e| (crate::icpmp::ordered_float(e.total_working_hours_prior), e.id));

    let mut assigned = BTreeMap::new();
    let mut offset_iter = offsets.into_iter();
    for employee in candidates {
        let Some(offset) = offset_iter.next() else {
            break;
        };
        employee.rotation_offset = Some(offset);
        committed.insert(employee.id);
        assigned.insert(employee.id, offset);
    }
    assigned
}

/// Runs `N` workers, each an infinite claim-execute-write loop (spec
/// §4.8.4). Workers never share mutable solving state: each call to
/// [`execute`] gets its own employee copy and constraint model; only the
/// store and the ratio cache are shared.
pub struct WorkerPool {
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn<S: Store + 'static>(store: Arc<S>, cache: Arc<RatioCache>, config: SolverConfig) -> Self {
        let mut handles = Vec::with_capacity(config.worker_count);
        for worker_index in 0..config.worker_count {
            let store = store.clone();
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(worker_index, store, cache, config).await;
            }));
        }
        Self { handles }
    }

    pub async fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

async fn worker_loop<S: Store>(worker_index: usize, store: Arc<S>, cache: Arc<RatioCache>, config: SolverConfig) {
    loop {
        let Some(job_id) = store.claim(Duration::from_secs(5)).await else {
            continue;
        };
        let Some(record) = store.status(job_id.clone()).await else {
            continue;
        };
        let input: SolveInput = match serde_json::from_value(record.input.clone()) {
            Ok(input) => input,
            Err(e) => {
                store.fail(job_id, format!("schema error: {e}")).await;
                continue;
            }
        };

        info!(worker = worker_index as u64, job_id = %record.id.0, "executing job");
        let outcome = tokio::task::spawn_blocking({
            let cache = cache.clone();
            move || execute(&input, &config, &cache)
        });

        match tokio::time::timeout(Duration::from_secs(config.time_limit_seconds), outcome).await {
            Ok(Ok(Ok(output))) => {
                let value = serde_json::to_value(&output).unwrap_or(serde_json::Value::Null);
                store.complete(job_id, value).await;
            }
            Ok(Ok(Err(e))) => {
                warn!(worker = worker_index as u64, error = %e, "job failed");
                store.fail(job_id, e.sanitized()).await;
            }
            Ok(Err(join_error)) => {
                store.fail(job_id, format!("internal error: {join_error}")).await;
            }
            Err(_timeout) => {
                // Solver timeout with no feasible solution: UNKNOWN, not a job failure
                // (spec §4.6 "Edge cases"). The blocking task keeps running to
                // completion in the background; its result is discarded.
                let unknown = RosterOutput {
                    solve_status: crate::error::SolveStatus::Unknown,
                    employee_roster: Vec::new(),
                    roster_summary: Default::default(),
                    icpmp_preprocessing: Default::default(),
                };
                let value = serde_json::to_value(&unknown).unwrap_or(serde_json::Value::Null);
                store.complete(job_id, value).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::WeekdaySet;
    use crate::domain::{DemandItemId, Scheme, Shift, WorkPattern};
    use chrono::NaiveTime;

    fn trivial_input() -> SolveInput {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let horizon = PlanningHorizon::new(date, date).unwrap();
        let shift = Shift::new(
            "D",
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            720,
        )
        .unwrap();
        let requirement = Requirement {
            id: RequirementId("R1".into()),
            work_pattern: WorkPattern::new(vec!["D".into()]).unwrap(),
            pattern_anchor_date: Some(date),
            headcount_per_day: 1,
            coverage_days: WeekdaySet::all(),
            shifts_allowed: vec![shift],
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
        };
        let demand_item = DemandItem {
            id: DemandItemId("D1".into()),
            requirements: vec![requirement],
        };
        let employee = Employee::new(1, "APO", "Nurse").with_scheme(Scheme::A);
        SolveInput {
            horizon,
            employees: vec![employee],
            demand_items: vec![demand_item],
            catalog: ConstraintCatalog::default(),
            solver_config: None,
        }
    }

    #[test]
    fn end_to_end_trivial_job_assigns_one_slot() {
        let input = trivial_input();
        let config = SolverConfig::default();
        let cache = RatioCache::new(16);
        let output = execute(&input, &config, &cache).unwrap();
        assert_eq!(output.employee_roster.len(), 1);
        assert_eq!(output.employee_roster[0].assigned_days, 1);
    }

    #[test]
    fn capacity_ceiling_rejects_oversized_job() {
        let input = trivial_input();
        let mut config = SolverConfig::default();
        config.variable_ceiling = 0;
        let cache = RatioCache::new(16);
        let err = execute(&input, &config, &cache).unwrap_err();
        matches!(err, RosterError::CapacityExceeded { .. });
    }
}
