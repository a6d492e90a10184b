//! Filter predicate model: audience targeting criteria and contact
//! preferences share one shape. Filters keep every field optional,
//! preferences require all of them. Both are parsed out of raw JSON at
//! the boundary and validated against the closed vocabularies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationErrors;
use crate::vocab::{joined, ContactType, PropertyLocation, PropertyType, Timeline};

pub const FILTER_FIELDS: [&str; 6] = [
    "contact_type",
    "property_locations",
    "property_types",
    "timeline",
    "min_budget",
    "max_budget",
];

/// A contact's stored preferences. Every field is mandatory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    pub contact_type: ContactType,
    pub property_locations: Vec<PropertyLocation>,
    pub property_types: Vec<PropertyType>,
    pub timeline: Timeline,
    pub min_budget: u64,
    pub max_budget: u64,
}

/// An audience's targeting criteria. Same shape as [`Preferences`] with
/// every field optional; absent fields impose no constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterSet {
    pub contact_type: Option<ContactType>,
    pub property_locations: Option<Vec<PropertyLocation>>,
    pub property_types: Option<Vec<PropertyType>>,
    pub timeline: Option<Timeline>,
    pub min_budget: Option<u64>,
    pub max_budget: Option<u64>,
}

impl FilterSet {
    /// Parses a raw filter map. An entirely empty map is allowed and
    /// resolves every contact in the tenant; a non-empty map must carry
    /// at least one valid criterion. All violations are reported
    /// together.
    pub fn parse(raw: &Value) -> Result<FilterSet, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let map = match raw {
            Value::Null => return Ok(FilterSet::default()),
            Value::Object(map) => map,
            _ => {
                errors.add("filters", "must be an object");
                return Err(errors);
            }
        };
        if map.is_empty() {
            return Ok(FilterSet::default());
        }

        let contact_type = parse_enum::<ContactType>(
            map.get("contact_type"),
            "filters",
            "contact_type",
            &ContactType::ALL,
            &mut errors,
        );
        let property_locations = parse_enum_array::<PropertyLocation>(
            map.get("property_locations"),
            "filters",
            "property_locations",
            &PropertyLocation::ALL,
            &mut errors,
        );
        let property_types = parse_enum_array::<PropertyType>(
            map.get("property_types"),
            "filters",
            "property_types",
            &PropertyType::ALL,
            &mut errors,
        );
        let timeline = parse_enum::<Timeline>(
            map.get("timeline"),
            "filters",
            "timeline",
            &Timeline::ALL,
            &mut errors,
        );
        let min_budget = parse_budget(map.get("min_budget"), "filters", "min_budget", &mut errors);
        let max_budget = parse_budget(map.get("max_budget"), "filters", "max_budget", &mut errors);

        if let (Some(min), Some(max)) = (min_budget, max_budget) {
            if max < min {
                errors.add(
                    "filters",
                    "max_budget must be greater than or equal to min_budget",
                );
            }
        }

        let criteria = contact_type.is_some() as usize
            + property_locations.is_some() as usize
            + property_types.is_some() as usize
            + timeline.is_some() as usize
            + min_budget.is_some() as usize
            + max_budget.is_some() as usize;
        if criteria == 0 {
            errors.add(
                "filters",
                format!(
                    "must contain at least one valid filter: {}",
                    FILTER_FIELDS.join(", ")
                ),
            );
        }

        errors.into_result()?;
        Ok(FilterSet {
            contact_type,
            property_locations,
            property_types,
            timeline,
            min_budget,
            max_budget,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.contact_type.is_none()
            && self.property_locations.is_none()
            && self.property_types.is_none()
            && self.timeline.is_none()
            && self.min_budget.is_none()
            && self.max_budget.is_none()
    }

    /// Conjunctive match against a contact's preferences.
    ///
    /// Scalar criteria match by equality, set criteria by intersection,
    /// budget criteria by `contact.min >= filter.min` and
    /// `contact.max <= filter.max`. Absent criteria always pass, so an
    /// empty filter set matches everything.
    pub fn matches(&self, prefs: &Preferences) -> bool {
        if let Some(contact_type) = self.contact_type {
            if prefs.contact_type != contact_type {
                return false;
            }
        }
        if let Some(locations) = &self.property_locations {
            if !locations
                .iter()
                .any(|l| prefs.property_locations.contains(l))
            {
                return false;
            }
        }
        if let Some(types) = &self.property_types {
            if !types.iter().any(|t| prefs.property_types.contains(t)) {
                return false;
            }
        }
        if let Some(timeline) = self.timeline {
            if prefs.timeline != timeline {
                return false;
            }
        }
        if let Some(min) = self.min_budget {
            if prefs.min_budget < min {
                return false;
            }
        }
        if let Some(max) = self.max_budget {
            if prefs.max_budget > max {
                return false;
            }
        }
        true
    }
}

impl Preferences {
    /// Parses a contact's preference map. Unlike filters, every field is
    /// required. All violations are reported together.
    pub fn parse(raw: &Value) -> Result<Preferences, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let map = match raw {
            Value::Object(map) => map,
            _ => {
                errors.add("preferences", "must be an object");
                return Err(errors);
            }
        };

        let contact_type = require(
            parse_enum::<ContactType>(
                map.get("contact_type"),
                "preferences",
                "contact_type",
                &ContactType::ALL,
                &mut errors,
            ),
            map.get("contact_type"),
            "preferences",
            "contact_type",
            &mut errors,
        );
        let property_locations = require(
            parse_enum_array::<PropertyLocation>(
                map.get("property_locations"),
                "preferences",
                "property_locations",
                &PropertyLocation::ALL,
                &mut errors,
            ),
            map.get("property_locations"),
            "preferences",
            "property_locations",
            &mut errors,
        );
        let property_types = require(
            parse_enum_array::<PropertyType>(
                map.get("property_types"),
                "preferences",
                "property_types",
                &PropertyType::ALL,
                &mut errors,
            ),
            map.get("property_types"),
            "preferences",
            "property_types",
            &mut errors,
        );
        let timeline = require(
            parse_enum::<Timeline>(
                map.get("timeline"),
                "preferences",
                "timeline",
                &Timeline::ALL,
                &mut errors,
            ),
            map.get("timeline"),
            "preferences",
            "timeline",
            &mut errors,
        );
        let min_budget = require(
            parse_budget(map.get("min_budget"), "preferences", "min_budget", &mut errors),
            map.get("min_budget"),
            "preferences",
            "min_budget",
            &mut errors,
        );
        let max_budget = require(
            parse_budget(map.get("max_budget"), "preferences", "max_budget", &mut errors),
            map.get("max_budget"),
            "preferences",
            "max_budget",
            &mut errors,
        );

        if let (Some(min), Some(max)) = (min_budget, max_budget) {
            if max < min {
                errors.add(
                    "preferences",
                    "max_budget must be greater than or equal to min_budget",
                );
            }
        }

        match (
            contact_type,
            property_locations,
            property_types,
            timeline,
            min_budget,
            max_budget,
        ) {
            (
                Some(contact_type),
                Some(property_locations),
                Some(property_types),
                Some(timeline),
                Some(min_budget),
                Some(max_budget),
            ) if errors.is_empty() => Ok(Preferences {
                contact_type,
                property_locations,
                property_types,
                timeline,
                min_budget,
                max_budget,
            }),
            _ => Err(errors),
        }
    }
}

// Rails-style presence: null, "", and [] are blank and treated as absent.
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        _ => false,
    }
}

fn parse_enum<T>(
    value: Option<&Value>,
    prefix: &str,
    field: &str,
    all: &[T],
    errors: &mut ValidationErrors,
) -> Option<T>
where
    T: serde::de::DeserializeOwned + std::fmt::Display + Copy,
{
    if is_blank(value) {
        return None;
    }
    let value = value?;
    match serde_json::from_value::<T>(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.add(prefix, format!("{} must be one of: {}", field, joined(all)));
            None
        }
    }
}

fn parse_enum_array<T>(
    value: Option<&Value>,
    prefix: &str,
    field: &str,
    all: &[T],
    errors: &mut ValidationErrors,
) -> Option<Vec<T>>
where
    T: serde::de::DeserializeOwned + std::fmt::Display + Copy,
{
    if is_blank(value) {
        return None;
    }
    let items = match value? {
        Value::Array(items) => items,
        _ => {
            errors.add(prefix, format!("{} must be an array", field));
            return None;
        }
    };
    let mut parsed = Vec::with_capacity(items.len());
    let mut invalid = Vec::new();
    for item in items {
        match serde_json::from_value::<T>(item.clone()) {
            Ok(v) => parsed.push(v),
            Err(_) => invalid.push(item.to_string()),
        }
    }
    if !invalid.is_empty() {
        errors.add(
            prefix,
            format!(
                "{} contains invalid values: {}. Valid values: {}",
                field,
                invalid.join(", "),
                joined(all)
            ),
        );
        return None;
    }
    Some(parsed)
}

fn parse_budget(
    value: Option<&Value>,
    prefix: &str,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<u64> {
    if is_blank(value) {
        return None;
    }
    match value?.as_i64() {
        Some(n) if n > 0 => Some(n as u64),
        Some(_) => {
            errors.add(prefix, format!("{} must be greater than 0", field));
            None
        }
        None => {
            errors.add(prefix, format!("{} must be a positive integer", field));
            None
        }
    }
}

/// Records a missing-field error when a mandatory field was blank.
/// Invalid-but-present fields already got their own error.
fn require<T>(
    parsed: Option<T>,
    raw: Option<&Value>,
    prefix: &str,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<T> {
    if parsed.is_none() && is_blank(raw) {
        errors.add(prefix, format!("{} must be present", field));
    }
    parsed
}
