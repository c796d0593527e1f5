//! Canonical data model (spec §3): slots, assignments, patterns, schemes,
//! and the constraint catalog with scheme-specific parameters.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::calendar::{normalize_scheme_tag, WeekdaySet};
use crate::error::{RosterError, Result};

pub const OFF_TOKEN: &str = "O";
pub const UNASSIGNED_TOKEN: &str = "U";

/// Labor-rule class governing hour caps and rest rules (GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scheme {
    A,
    B,
    P,
}

impl Scheme {
    /// Parses a raw scheme string, normalizing synonyms ("Scheme A" -> A).
    /// Returns `None` for the wildcard `"Any"` or unrecognized input.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_scheme_tag(raw)?.as_str() {
            "A" => Some(Scheme::A),
            "B" => Some(Scheme::B),
            "P" => Some(Scheme::P),
            _ => None,
        }
    }
}

/// A shift template: a paid interval with an opaque short code.
/// `O` and `U` are reserved and never refer to a real shift (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub code: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub paid_minutes: i64,
    pub meal_break_minutes: i64,
}

impl Shift {
    pub fn new(code: impl Into<String>, start: NaiveTime, end: NaiveTime, paid_minutes: i64) -> Result<Self> {
        let code = code.into();
        if code == OFF_TOKEN || code == UNASSIGNED_TOKEN {
            return Err(RosterError::Schema(format!(
                "shift code '{code}' is reserved"
            )));
        }
        Ok(Self {
            code,
            start,
            end,
            paid_minutes,
            meal_break_minutes: 0,
        })
    }

    pub fn with_meal_break(mut self, minutes: i64) -> Self {
        self.meal_break_minutes = minutes;
        self
    }
}

/// An ordered, cyclic sequence of tokens from `{Shift.code, "O"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkPattern(Vec<String>);

impl WorkPattern {
    /// Builds a pattern, rejecting only structurally-impossible sequences:
    /// empty, or more than 12 consecutive work tokens with no `O` at all
    /// (spec §9 "Flexible patterns").
    pub fn new(tokens: Vec<String>) -> Result<Self> {
        if tokens.is_empty() {
            return Err(RosterError::Schema("work pattern is empty".into()));
        }
        let has_off = tokens.iter().any(|t| t == OFF_TOKEN);
        if !has_off && tokens.len() > 12 {
            return Err(RosterError::Schema(
                "flexible pattern exceeds 12 consecutive work tokens with no off day".into(),
            ));
        }
        if tokens.iter().all(|t| t == OFF_TOKEN) {
            return Err(RosterError::Schema(
                "work pattern contains no working day".into(),
            ));
        }
        Ok(Self(tokens))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn token_at(&self, index: usize) -> &str {
        &self.0[index % self.0.len()]
    }

    /// `true` if the pattern contains at least one explicit `O` token.
    /// Flexible (all-work) patterns return `false`.
    pub fn has_off_day(&self) -> bool {
        self.0.iter().any(|t| t == OFF_TOKEN)
    }

    /// Number of non-`O` tokens, i.e. work days per cycle.
    pub fn work_day_count(&self) -> usize {
        self.0.iter().filter(|t| t.as_str() != OFF_TOKEN).count()
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(pub u64);

/// An employee in the job-local pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub product_type: String,
    pub rank: String,
    pub organizational_unit: String,
    pub schemes: HashSet<Scheme>,
    /// Tie-breaks C2 resolution when an employee holds multiple schemes and
    /// no explicit override matches (spec §9 Open Question, resolved here).
    #[serde(default)]
    pub primary_scheme: Option<Scheme>,
    #[serde(default)]
    pub qualifications: HashSet<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub total_working_hours_prior: f64,
    /// Set by ICPMP (C4) on the job-local copy; `None` until committed.
    #[serde(default)]
    pub rotation_offset: Option<usize>,
    /// Half-open `[start, end]` availability windows; empty means always available.
    #[serde(default)]
    pub availability_intervals: Vec<(NaiveDate, NaiveDate)>,
}

impl Employee {
    pub fn new(id: u64, product_type: impl Into<String>, rank: impl Into<String>) -> Self {
        Self {
            id: EmployeeId(id),
            product_type: product_type.into(),
            rank: rank.into(),
            organizational_unit: String::new(),
            schemes: HashSet::new(),
            primary_scheme: None,
            qualifications: HashSet::new(),
            gender: None,
            total_working_hours_prior: 0.0,
            rotation_offset: None,
            availability_intervals: Vec::new(),
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.schemes.insert(scheme);
        self
    }

    pub fn with_qualification(mut self, qual: impl Into<String>) -> Self {
        self.qualifications.insert(qual.into());
        self
    }

    pub fn is_available(&self, date: NaiveDate) -> bool {
        if self.availability_intervals.is_empty() {
            return true;
        }
        self.availability_intervals
            .iter()
            .any(|(start, end)| date >= *start && date <= *end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DemandItemId(pub String);

/// One line item describing who must be scheduled where and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: RequirementId,
    pub work_pattern: WorkPattern,
    #[serde(default)]
    pub pattern_anchor_date: Option<NaiveDate>,
    pub headcount_per_day: usize,
    pub coverage_days: WeekdaySet,
    pub shifts_allowed: Vec<Shift>,
    /// Accepts `["Any"]` or an empty list to mean "no scheme restriction".
    pub required_schemes: Vec<String>,
    #[serde(default)]
    pub required_product_types: Vec<String>,
    #[serde(default)]
    pub required_ranks: Vec<String>,
    #[serde(default)]
    pub required_qualifications: HashSet<String>,
    #[serde(default)]
    pub required_organizational_units: Vec<String>,
    #[serde(default)]
    pub required_gender: Option<String>,
    #[serde(default)]
    pub whitelist: HashSet<EmployeeId>,
    #[serde(default)]
    pub blacklist: HashSet<EmployeeId>,
    #[serde(default)]
    pub employee_pool: Option<Vec<EmployeeId>>,
    #[serde(default)]
    pub max_employees_to_use: Option<usize>,
}

impl Requirement {
    /// Anchor date resolution: falls back to the horizon start (spec §9).
    pub fn anchor(&self, horizon_start: NaiveDate) -> NaiveDate {
        self.pattern_anchor_date.unwrap_or(horizon_start)
    }

    pub fn accepts_scheme(&self, schemes: &HashSet<Scheme>) -> bool {
        if self.required_schemes.is_empty()
            || self.required_schemes.iter().any(|s| s == "Any")
        {
            return true;
        }
        self.required_schemes
            .iter()
            .filter_map(|s| Scheme::parse(s))
            .any(|s| schemes.contains(&s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandItem {
    pub id: DemandItemId,
    pub requirements: Vec<Requirement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub String);

impl SlotId {
    /// Deterministic `"{requirementId}-{date}-{shiftCode}-{seq}"` (spec §4.3).
    pub fn build(requirement_id: &RequirementId, date: NaiveDate, shift_code: &str, seq: usize) -> Self {
        Self(format!("{}-{}-{}-{}", requirement_id.0, date, shift_code, seq))
    }
}

/// One unit of headcount demand: an assignable cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: SlotId,
    pub date: NaiveDate,
    pub shift_code: String,
    pub demand_item_id: DemandItemId,
    pub requirement_id: RequirementId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Assigned,
    Unassigned,
    OffDay,
    NotUsed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub slot_id: SlotId,
    pub employee_id: Option<EmployeeId>,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub pattern_day: Option<usize>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Assignment {
    /// Enforces the invariant from spec §3: UNASSIGNED never carries an id.
    pub fn check_invariant(&self) -> bool {
        match self.status {
            AssignmentStatus::Unassigned => self.employee_id.is_none(),
            AssignmentStatus::Assigned => self.employee_id.is_some(),
            _ => true,
        }
    }
}

/// A scalar value or a product/rank-filtered override for a constraint
/// parameter (spec §3 `ConstraintSpec.schemeOverrides`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OverrideValue {
    Scalar(f64),
    Filtered(FilteredValue),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredValue {
    #[serde(default)]
    pub product_types: Option<Vec<String>>,
    #[serde(default)]
    pub ranks: Option<Vec<String>>,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    Hard,
    Soft,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintSpec {
    pub id: String,
    pub enforcement: Enforcement,
    pub default_value: f64,
    #[serde(default)]
    pub scheme_overrides: BTreeMap<String, OverrideValue>,
    #[serde(default)]
    pub soft_weight: Option<f64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Legacy flat parameter map (spec §9 backward-compat), e.g.
    /// `{"maxDailyHoursA": 14}`. Consulted only when no new-form override matches.
    #[serde(default)]
    pub legacy_params: BTreeMap<String, f64>,
}

fn default_true() -> bool {
    true
}

/// The full catalog, keyed by constraint id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintCatalog(pub BTreeMap<String, ConstraintSpec>);

impl ConstraintCatalog {
    pub fn get(&self, id: &str) -> Option<&ConstraintSpec> {
        self.0.get(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub uuid::Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_rejects_reserved_codes() {
        let start = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        assert!(Shift::new("O", start, end, 600).is_err());
        assert!(Shift::new("U", start, end, 600).is_err());
        assert!(Shift::new("D", start, end, 600).is_ok());
    }

    #[test]
    fn pattern_rejects_empty_and_all_off() {
        assert!(WorkPattern::new(vec![]).is_err());
        assert!(WorkPattern::new(vec![OFF_TOKEN.to_string()]).is_err());
        assert!(WorkPattern::new(vec!["D".to_string()]).is_ok());
    }

    #[test]
    fn flexible_pattern_accepted_up_to_twelve() {
        let twelve = vec!["D".to_string(); 12];
        assert!(WorkPattern::new(twelve).is_ok());
        let thirteen = vec!["D".to_string(); 13];
        assert!(WorkPattern::new(thirteen).is_err());
    }

    #[test]
    fn assignment_invariant_holds() {
        let a = Assignment {
            slot_id: SlotId("s1".into()),
            employee_id: None,
            status: AssignmentStatus::Unassigned,
            pattern_day: None,
            reason: None,
        };
        assert!(a.check_invariant());
    }
}
