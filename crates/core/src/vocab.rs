//! Closed vocabularies for contact preferences and audience filters.
//! Raw strings are parsed into these enums at the boundary; nothing
//! downstream ever sees an out-of-vocabulary value.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    Buyer,
    Seller,
}

impl ContactType {
    pub const ALL: [ContactType; 2] = [ContactType::Buyer, ContactType::Seller];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactType::Buyer => "buyer",
            ContactType::Seller => "seller",
        }
    }
}

impl fmt::Display for ContactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PropertyLocation {
    Baner,
    Wakad,
    Kharadi,
    Hinjewadi,
    Aundh,
    Kothrud,
    Hadapsar,
    VimanNagar,
}

impl PropertyLocation {
    pub const ALL: [PropertyLocation; 8] = [
        PropertyLocation::Baner,
        PropertyLocation::Wakad,
        PropertyLocation::Kharadi,
        PropertyLocation::Hinjewadi,
        PropertyLocation::Aundh,
        PropertyLocation::Kothrud,
        PropertyLocation::Hadapsar,
        PropertyLocation::VimanNagar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyLocation::Baner => "baner",
            PropertyLocation::Wakad => "wakad",
            PropertyLocation::Kharadi => "kharadi",
            PropertyLocation::Hinjewadi => "hinjewadi",
            PropertyLocation::Aundh => "aundh",
            PropertyLocation::Kothrud => "kothrud",
            PropertyLocation::Hadapsar => "hadapsar",
            PropertyLocation::VimanNagar => "viman_nagar",
        }
    }
}

impl fmt::Display for PropertyLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Flat,
    Villa,
    Plot,
    RowHouse,
    Commercial,
}

impl PropertyType {
    pub const ALL: [PropertyType; 5] = [
        PropertyType::Flat,
        PropertyType::Villa,
        PropertyType::Plot,
        PropertyType::RowHouse,
        PropertyType::Commercial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Flat => "flat",
            PropertyType::Villa => "villa",
            PropertyType::Plot => "plot",
            PropertyType::RowHouse => "row_house",
            PropertyType::Commercial => "commercial",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Timeline {
    Immediate,
    WithinThreeMonths,
    WithinSixMonths,
    WithinOneYear,
    Exploring,
}

impl Timeline {
    pub const ALL: [Timeline; 5] = [
        Timeline::Immediate,
        Timeline::WithinThreeMonths,
        Timeline::WithinSixMonths,
        Timeline::WithinOneYear,
        Timeline::Exploring,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeline::Immediate => "immediate",
            Timeline::WithinThreeMonths => "within_three_months",
            Timeline::WithinSixMonths => "within_six_months",
            Timeline::WithinOneYear => "within_one_year",
            Timeline::Exploring => "exploring",
        }
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comma-joined vocabulary listing for validation messages.
pub fn joined<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case_round_trip() {
        let v = serde_json::to_value(PropertyLocation::VimanNagar).unwrap();
        assert_eq!(v, serde_json::json!("viman_nagar"));
        let back: PropertyLocation = serde_json::from_value(v).unwrap();
        assert_eq!(back, PropertyLocation::VimanNagar);
    }

    #[test]
    fn test_out_of_vocabulary_rejected() {
        let err = serde_json::from_value::<ContactType>(serde_json::json!("tenant"));
        assert!(err.is_err());
    }

    #[test]
    fn test_joined_listing() {
        assert_eq!(joined(&ContactType::ALL), "buyer, seller");
    }
}
