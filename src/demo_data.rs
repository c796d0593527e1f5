//! Demo data generators: deterministic fixtures sized `SMALL`/`LARGE` for
//! exercising the full pipeline in tests without a real input document.

use chrono::{Duration, NaiveDate, NaiveTime, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

use crate::calendar::WeekdaySet;
use crate::config::SolverConfig;
use crate::domain::{ConstraintCatalog, DemandItem, DemandItemId, Employee, Requirement, RequirementId, Scheme, Shift, WorkPattern};
use crate::worker::SolveInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoData {
    Small,
    Large,
}

impl std::str::FromStr for DemoData {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SMALL" => Ok(DemoData::Small),
            "LARGE" => Ok(DemoData::Large),
            _ => Err(()),
        }
    }
}

impl DemoData {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoData::Small => "SMALL",
            DemoData::Large => "LARGE",
        }
    }

    fn parameters(&self) -> DemoDataParameters {
        match self {
            DemoData::Small => DemoDataParameters {
                organizational_units: vec!["Ambulatory care".to_string(), "Critical care".to_string(), "Pediatric care".to_string()],
                days_in_schedule: 14,
                employee_count: 15,
                headcount_distribution: vec![(1, 3.0), (2, 1.0)],
            },
            DemoData::Large => DemoDataParameters {
                organizational_units: vec![
                    "Ambulatory care".to_string(),
                    "Neurology".to_string(),
                    "Critical care".to_string(),
                    "Pediatric care".to_string(),
                    "Surgery".to_string(),
                    "Radiology".to_string(),
                    "Outpatient".to_string(),
                ],
                days_in_schedule: 28,
                employee_count: 50,
                headcount_distribution: vec![(2, 0.5), (3, 0.3), (4, 0.2)],
            },
        }
    }
}

struct DemoDataParameters {
    organizational_units: Vec<String>,
    days_in_schedule: i64,
    employee_count: usize,
    headcount_distribution: Vec<(usize, f64)>,
}

/// List of available demo data sets.
pub fn list_demo_data() -> Vec<&'static str> {
    vec!["SMALL", "LARGE"]
}

const WORK_PATTERNS: &[&[&str]] = &[
    &["D", "D", "D", "D", "O", "O"],
    &["D", "N", "O"],
    &["D", "D", "O", "N", "N", "O", "O"],
];

/// Generates a full solver input document for the given size (spec §6.1
/// request shape), deterministic across calls (seeded RNG, no wall-clock).
pub fn generate(demo: DemoData) -> SolveInput {
    let params = demo.parameters();
    let mut rng = StdRng::seed_from_u64(42);

    let start_date = find_next_monday(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    let end_date = start_date + Duration::days(params.days_in_schedule - 1);
    let horizon = crate::calendar::PlanningHorizon::new(start_date, end_date).expect("generated horizon is valid");

    let day_shift = Shift::new("D", time(7, 0), time(19, 0), 690).expect("D is not reserved");
    let night_shift = Shift::new("N", time(19, 0), time(7, 0), 690).expect("N is not reserved");

    let schemes = [Scheme::A, Scheme::B, Scheme::P];
    let ranks = ["Nurse", "Senior Nurse", "Physician"];
    let qualifications = ["G1", "G2", "ICU"];

    let mut employees = Vec::with_capacity(params.employee_count);
    for i in 0..params.employee_count {
        let unit = &params.organizational_units[i % params.organizational_units.len()];
        let scheme = schemes[i % schemes.len()];
        let rank = ranks[i % ranks.len()];
        let mut employee = Employee::new(i as u64, "APO", rank)
            .with_scheme(scheme)
            .with_qualification(qualifications[i % qualifications.len()]);
        employee.organizational_unit = unit.clone();
        employee.total_working_hours_prior = (i % 5) as f64 * 8.0;
        employees.push(employee);
    }

    let mut demand_items = Vec::with_capacity(params.organizational_units.len());
    for (idx, unit) in params.organizational_units.iter().enumerate() {
        let headcount = pick_count(&mut rng, &params.headcount_distribution);
        let pattern_tokens: Vec<String> = WORK_PATTERNS[idx % WORK_PATTERNS.len()].iter().map(|s| s.to_string()).collect();
        let requirement = Requirement {
            id: RequirementId(format!("R{idx}")),
            work_pattern: WorkPattern::new(pattern_tokens).expect("fixed demo patterns are valid"),
            pattern_anchor_date: Some(start_date),
            headcount_per_day: headcount,
            coverage_days: WeekdaySet::all(),
            shifts_allowed: vec![day_shift.clone(), night_shift.clone()],
            required_schemes: vec!["Any".to_string()],
            required_product_types: vec![],
            required_ranks: vec![],
            required_qualifications: HashSet::new(),
            required_organizational_units: vec![unit.clone()],
            required_gender: None,
            whitelist: HashSet::new(),
            blacklist: HashSet::new(),
            employee_pool: None,
            max_employees_to_use: None,
        };
        demand_items.push(DemandItem {
            id: DemandItemId(format!("D{idx}")),
            requirements: vec![requirement],
        });
    }

    SolveInput {
        horizon,
        employees,
        demand_items,
        catalog: ConstraintCatalog::default(),
        solver_config: Some(SolverConfig::default()),
    }
}

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn find_next_monday(date: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    let days_until_monday = match date.weekday() {
        Weekday::Mon => 0,
        Weekday::Tue => 6,
        Weekday::Wed => 5,
        Weekday::Thu => 4,
        Weekday::Fri => 3,
        Weekday::Sat => 2,
        Weekday::Sun => 1,
    };
    date + Duration::days(days_until_monday)
}

/// Pick a count based on weighted distribution.
fn pick_count(rng: &mut StdRng, distribution: &[(usize, f64)]) -> usize {
    let total_weight: f64 = distribution.iter().map(|(_, w)| w).sum();
    let mut choice = rng.gen::<f64>() * total_weight;

    for (count, weight) in distribution {
        if choice < *weight {
            return *count;
        }
        choice -= weight;
    }
    distribution.last().map(|(c, _)| *c).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_demo_matches_its_parameters() {
        let input = generate(DemoData::Small);
        assert_eq!(input.employees.len(), 15);
        assert_eq!(input.demand_items.len(), 3);
        assert_eq!(input.horizon.len_days(), 14);
    }

    #[test]
    fn large_demo_matches_its_parameters() {
        let input = generate(DemoData::Large);
        assert_eq!(input.employees.len(), 50);
        assert_eq!(input.demand_items.len(), 7);
        assert_eq!(input.horizon.len_days(), 28);
    }

    #[test]
    fn generation_is_deterministic() {
        let a = generate(DemoData::Small);
        let b = generate(DemoData::Small);
        assert_eq!(a.employees.len(), b.employees.len());
        assert_eq!(a.horizon.start_date, b.horizon.start_date);
    }

    #[test]
    fn demo_data_from_str_is_case_insensitive() {
        assert_eq!("SMALL".parse::<DemoData>(), Ok(DemoData::Small));
        assert_eq!("small".parse::<DemoData>(), Ok(DemoData::Small));
        assert_eq!("LARGE".parse::<DemoData>(), Ok(DemoData::Large));
        assert!("invalid".parse::<DemoData>().is_err());
    }

    #[test]
    fn every_employee_has_a_qualification_and_scheme() {
        let input = generate(DemoData::Small);
        for employee in &input.employees {
            assert!(!employee.qualifications.is_empty());
            assert!(!employee.schemes.is_empty());
        }
    }
}
