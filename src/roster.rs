//! Output/roster builder (C7): per-employee daily status, pattern-day
//! annotation, and aggregate metrics (spec §4.7).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::calendar::PlanningHorizon;
use crate::domain::{Assignment, AssignmentStatus, Employee, EmployeeId, RequirementId, OFF_TOKEN};
use crate::error::SolveStatus;
use crate::icpmp::IcpmpResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DailyStatus {
    Assigned,
    OffDay,
    Unassigned,
    NotUsed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatusEntry {
    pub date: NaiveDate,
    pub status: DailyStatus,
    #[serde(default)]
    pub shift_code: Option<String>,
    #[serde(default)]
    pub pattern_day: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRosterEntry {
    pub employee_id: EmployeeId,
    pub rotation_offset: Option<usize>,
    pub total_days: usize,
    pub assigned_days: usize,
    pub off_days: usize,
    pub unassigned_days: usize,
    pub daily_status: Vec<DailyStatusEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSummary {
    pub total_daily_statuses: usize,
    pub by_status: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementIcpmpSummary {
    pub optimal_employees: usize,
    pub u_slots_total: usize,
    pub is_optimal: bool,
    pub coverage_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IcpmpPreprocessing {
    pub enabled: bool,
    pub requirements: BTreeMap<String, RequirementIcpmpSummary>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterOutput {
    pub solve_status: SolveStatus,
    pub employee_roster: Vec<EmployeeRosterEntry>,
    pub roster_summary: RosterSummary,
    pub icpmp_preprocessing: IcpmpPreprocessing,
}

/// Computes each committed employee's daily status across the horizon,
/// honoring the invariants in spec §4.7:
/// `ASSIGNED` iff an assigned assignment exists that day; `OFF_DAY` iff the
/// pattern says `O`; `UNASSIGNED` iff the pattern predicts work but no
/// assignment exists; `NOT_USED` for employees ICPMP dropped (spec §9:
/// canonical, never collapses to `OFF_DAY`).
pub fn build_roster(
    horizon: &PlanningHorizon,
    all_employees: &[Employee],
    committed: &HashSet<EmployeeId>,
    assignments: &[Assignment],
    anchors: &HashMap<RequirementId, NaiveDate>,
    pattern_lengths: &HashMap<RequirementId, usize>,
    pattern_tokens: &HashMap<RequirementId, Vec<String>>,
    assignment_requirement: &HashMap<crate::domain::SlotId, RequirementId>,
    assignment_date: &HashMap<crate::domain::SlotId, NaiveDate>,
    assignment_shift: &HashMap<crate::domain::SlotId, String>,
) -> (Vec<EmployeeRosterEntry>, RosterSummary) {
    let mut by_employee_date: HashMap<(EmployeeId, NaiveDate), &Assignment> = HashMap::new();
    for a in assignments {
        if a.status == AssignmentStatus::Assigned {
            if let (Some(emp), Some(date)) = (a.employee_id, assignment_date.get(&a.slot_id)) {
                by_employee_date.insert((emp, *date), a);
            }
        }
    }

    let mut entries = Vec::new();
    let mut summary = RosterSummary::default();

    for employee in all_employees {
        if !committed.contains(&employee.id) {
            let daily_status: Vec<DailyStatusEntry> = horizon
                .dates()
                .map(|date| DailyStatusEntry {
                    date,
                    status: DailyStatus::NotUsed,
                    shift_code: None,
                    pattern_day: None,
                })
                .collect();
            summary.total_daily_statuses += daily_status.len();
            *summary.by_status.entry("NOT_USED".to_string()).or_default() += daily_status.len();
            entries.push(EmployeeRosterEntry {
                employee_id: employee.id,
                rotation_offset: None,
                total_days: daily_status.len(),
                assigned_days: 0,
                off_days: 0,
                unassigned_days: 0,
                daily_status,
            });
            continue;
        }

        let offset = employee.rotation_offset.unwrap_or(0);
        let mut assigned_days = 0;
        let mut off_days = 0;
        let mut unassigned_days = 0;
        let mut daily_status = Vec::new();

        // An employee may be committed to a requirement whose anchor/
        // pattern we need for off-day classification; pick any requirement
        // this employee has an assignment under, falling back to the first
        // known requirement if never assigned (fully-gapped employee).
        let requirement_id = assignments
            .iter()
            .find(|a| a.employee_id == Some(employee.id))
            .and_then(|a| assignment_requirement.get(&a.slot_id))
            .cloned()
            .or_else(|| anchors.keys().next().cloned());

        for date in horizon.dates() {
            let assignment_here = by_employee_date.get(&(employee.id, date));
            let status;
            let mut shift_code = None;
            let mut pattern_day = None;

            if let Some(a) = assignment_here {
                status = DailyStatus::Assigned;
                shift_code = assignment_shift.get(&a.slot_id).cloned();
                pattern_day = a.pattern_day;
                assigned_days += 1;
            } else if let (Some(req_id), Some(&len)) =
                (requirement_id.as_ref(), requirement_id.as_ref().and_then(|r| pattern_lengths.get(r)))
            {
                let anchor = *anchors.get(req_id).unwrap_or(&date);
                let tokens = &pattern_tokens[req_id];
                let idx = crate::calendar::pattern_day(date, offset as i64, anchor, len);
                pattern_day = Some(idx);
                if tokens[idx] == OFF_TOKEN {
                    status = DailyStatus::OffDay;
                    off_days += 1;
                } else {
                    status = DailyStatus::Unassigned;
                    unassigned_days += 1;
                }
            } else {
                status = DailyStatus::Unassigned;
                unassigned_days += 1;
            }

            daily_status.push(DailyStatusEntry {
                date,
                status,
                shift_code,
                pattern_day,
            });
        }

        summary.total_daily_statuses += daily_status.len();
        for entry in &daily_status {
            let key = match entry.status {
                DailyStatus::Assigned => "ASSIGNED",
                DailyStatus::OffDay => "OFF_DAY",
                DailyStatus::Unassigned => "UNASSIGNED",
                DailyStatus::NotUsed => "NOT_USED",
            };
            *summary.by_status.entry(key.to_string()).or_default() += 1;
        }

        entries.push(EmployeeRosterEntry {
            employee_id: employee.id,
            rotation_offset: employee.rotation_offset,
            total_days: daily_status.len(),
            assigned_days,
            off_days,
            unassigned_days,
            daily_status,
        });
    }

    (entries, summary)
}

/// Assembles the `icpmp_preprocessing` metadata block (spec §4.7, §6.6).
pub fn build_icpmp_summary(results: &BTreeMap<RequirementId, IcpmpResult>, warnings: Vec<String>) -> IcpmpPreprocessing {
    IcpmpPreprocessing {
        enabled: true,
        requirements: results
            .iter()
            .map(|(id, r)| {
                (
                    id.0.clone(),
                    RequirementIcpmpSummary {
                        optimal_employees: r.optimal_employees,
                        u_slots_total: r.u_slots_total,
                        is_optimal: r.is_optimal,
                        coverage_rate: r.coverage_rate,
                    },
                )
            })
            .collect(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Scheme;

    #[test]
    fn not_used_for_uncommitted_employee() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let horizon = PlanningHorizon::new(d, d).unwrap();
        let employee = Employee::new(1, "APO", "Nurse").with_scheme(Scheme::A);
        let (entries, summary) = build_roster(
            &horizon,
            &[employee],
            &HashSet::new(),
            &[],
            &HashMap::new(),
            &HashMap::new(),
            &HashMap::new(),
            &HashMap::new(),
            &HashMap::new(),
            &HashMap::new(),
        );
        assert_eq!(entries[0].daily_status[0].status, DailyStatus::NotUsed);
        assert_eq!(summary.by_status["NOT_USED"], 1);
    }
}
