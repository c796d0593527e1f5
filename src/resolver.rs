//! Constraint parameter resolver (C2): resolves the effective value of a
//! named constraint parameter for a given employee, following the lookup
//! order in spec §4.2.

use crate::domain::{ConstraintCatalog, Employee, OverrideValue, Scheme};

/// `resolve(catalog, constraint_id, employee, param_name, default) -> value`.
///
/// Lookup order:
/// 1. Catalog entry for `constraint_id`; absent or disabled -> `default`.
/// 2. The employee's scheme(s). If `schemeOverrides` has a matching entry:
///    scalar -> return it; filtered -> return it if product/rank match,
///    else fall through.
/// 3. `defaultValue` on the spec, else the caller-supplied `default`.
///
/// When an employee holds multiple schemes and none is marked
/// `primary_scheme`, the *strictest* (smallest) matching override wins —
/// see SPEC_FULL.md §9 for why this departs from an undocumented source
/// tie-break.
pub fn resolve(
    catalog: &ConstraintCatalog,
    constraint_id: &str,
    employee: &Employee,
    legacy_param_name: Option<&str>,
    default: f64,
) -> f64 {
    let spec = match catalog.get(constraint_id) {
        Some(s) if s.enabled => s,
        _ => return default,
    };

    let schemes_to_try: Vec<Scheme> = match employee.primary_scheme {
        Some(s) => vec![s],
        None => {
            let mut v: Vec<Scheme> = employee.schemes.iter().copied().collect();
            v.sort();
            v
        }
    };

    let mut candidates = Vec::new();
    for scheme in &schemes_to_try {
        let key = match scheme {
            Scheme::A => "A",
            Scheme::B => "B",
            Scheme::P => "P",
        };
        if let Some(value) = spec.scheme_overrides.get(key) {
            match value {
                OverrideValue::Scalar(v) => candidates.push(*v),
                OverrideValue::Filtered(f) => {
                    let product_ok = f
                        .product_types
                        .as_ref()
                        .map(|types| types.iter().any(|t| t == &employee.product_type))
                        .unwrap_or(true);
                    let rank_ok = f
                        .ranks
                        .as_ref()
                        .map(|ranks| ranks.iter().any(|r| r == &employee.rank))
                        .unwrap_or(true);
                    if product_ok && rank_ok {
                        candidates.push(f.value);
                    }
                }
            }
        }
    }

    if !candidates.is_empty() {
        // Strictest across held schemes when no primary_scheme narrows it to one.
        return candidates.into_iter().fold(f64::INFINITY, f64::min);
    }

    if let Some(name) = legacy_param_name {
        for scheme in &schemes_to_try {
            let suffix = match scheme {
                Scheme::A => "A",
                Scheme::B => "B",
                Scheme::P => "P",
            };
            let legacy_key = format!("{name}{suffix}");
            if let Some(v) = spec.legacy_params.get(&legacy_key) {
                return *v;
            }
        }
    }

    spec.default_value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConstraintSpec, Employee, Enforcement};
    use std::collections::BTreeMap;

    fn catalog_with(default_value: f64, overrides: BTreeMap<String, OverrideValue>) -> ConstraintCatalog {
        let spec = ConstraintSpec {
            id: "momDailyHoursCap".into(),
            enforcement: Enforcement::Hard,
            default_value,
            scheme_overrides: overrides,
            soft_weight: None,
            enabled: true,
            legacy_params: BTreeMap::new(),
        };
        let mut map = BTreeMap::new();
        map.insert(spec.id.clone(), spec);
        ConstraintCatalog(map)
    }

    #[test]
    fn falls_back_to_default_when_disabled() {
        let mut catalog = catalog_with(14.0, BTreeMap::new());
        catalog.0.get_mut("momDailyHoursCap").unwrap().enabled = false;
        let emp = Employee::new(1, "APO", "Nurse").with_scheme(Scheme::A);
        assert_eq!(resolve(&catalog, "momDailyHoursCap", &emp, None, 9.0), 9.0);
    }

    #[test]
    fn scheme_scalar_override_applies() {
        let mut overrides = BTreeMap::new();
        overrides.insert("A".to_string(), OverrideValue::Scalar(14.0));
        overrides.insert("P".to_string(), OverrideValue::Scalar(9.0));
        let catalog = catalog_with(9.0, overrides);
        let emp = Employee::new(1, "APO", "Nurse").with_scheme(Scheme::A);
        assert_eq!(resolve(&catalog, "momDailyHoursCap", &emp, None, 9.0), 14.0);
    }

    #[test]
    fn multi_scheme_takes_strictest() {
        let mut overrides = BTreeMap::new();
        overrides.insert("A".to_string(), OverrideValue::Scalar(14.0));
        overrides.insert("P".to_string(), OverrideValue::Scalar(9.0));
        let catalog = catalog_with(9.0, overrides);
        let emp = Employee::new(1, "APO", "Nurse")
            .with_scheme(Scheme::A)
            .with_scheme(Scheme::P);
        assert_eq!(resolve(&catalog, "momDailyHoursCap", &emp, None, 9.0), 9.0);
    }

    #[test]
    fn legacy_params_used_when_no_new_form_override() {
        let spec = ConstraintSpec {
            id: "momDailyHoursCap".into(),
            enforcement: Enforcement::Hard,
            default_value: 0.0,
            scheme_overrides: BTreeMap::new(),
            soft_weight: None,
            enabled: true,
            legacy_params: [("maxDailyHoursA".to_string(), 14.0)].into_iter().collect(),
        };
        let mut map = BTreeMap::new();
        map.insert(spec.id.clone(), spec);
        let catalog = ConstraintCatalog(map);
        let emp = Employee::new(1, "APO", "Nurse").with_scheme(Scheme::A);
        assert_eq!(
            resolve(&catalog, "momDailyHoursCap", &emp, Some("maxDailyHours"), 9.0),
            14.0
        );
    }
}
