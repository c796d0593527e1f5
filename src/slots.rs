//! Slot model builder (C3): demand items x planning horizon -> slots, plus
//! each requirement's coverage calendar (spec §4.3).

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::calendar::PlanningHorizon;
use crate::domain::{DemandItem, Requirement, RequirementId, Slot};

/// The coverage calendar for one requirement: the horizon dates whose
/// weekday is in `coverageDays`.
pub fn coverage_calendar(requirement: &Requirement, horizon: &PlanningHorizon) -> Vec<NaiveDate> {
    horizon
        .dates()
        .filter(|d| requirement.coverage_days.contains(*d))
        .collect()
}

/// Slots for one requirement: `headcountPerDay` per shift per coverage day.
pub fn build_requirement_slots(requirement: &Requirement, horizon: &PlanningHorizon) -> Vec<Slot> {
    let dates = coverage_calendar(requirement, horizon);
    let mut slots = Vec::new();
    for date in dates {
        for shift in &requirement.shifts_allowed {
            for seq in 0..requirement.headcount_per_day {
                slots.push(Slot {
                    id: crate::domain::SlotId::build(&requirement.id, date, &shift.code, seq),
                    date,
                    shift_code: shift.code.clone(),
                    demand_item_id: crate::domain::DemandItemId(String::new()), // filled by caller
                    requirement_id: requirement.id.clone(),
                });
            }
        }
    }
    slots
}

/// Builds every slot across all demand items and their requirements, plus
/// each requirement's coverage calendar, indexed by requirement id.
pub struct SlotModel {
    pub slots: Vec<Slot>,
    pub coverage_calendars: BTreeMap<RequirementId, Vec<NaiveDate>>,
}

pub fn build_slot_model(demand_items: &[DemandItem], horizon: &PlanningHorizon) -> SlotModel {
    let mut slots = Vec::new();
    let mut coverage_calendars = BTreeMap::new();

    for item in demand_items {
        for requirement in &item.requirements {
            let calendar = coverage_calendar(requirement, horizon);
            for date in &calendar {
                for shift in &requirement.shifts_allowed {
                    for seq in 0..requirement.headcount_per_day {
                        slots.push(Slot {
                            id: crate::domain::SlotId::build(&requirement.id, *date, &shift.code, seq),
                            date: *date,
                            shift_code: shift.code.clone(),
                            demand_item_id: item.id.clone(),
                            requirement_id: requirement.id.clone(),
                        });
                    }
                }
            }
            coverage_calendars.insert(requirement.id.clone(), calendar);
        }
    }

    SlotModel {
        slots,
        coverage_calendars,
    }
}
