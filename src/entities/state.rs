// 🗺️ State Entity - one row of the national state code table

use crate::entities::{field, County};
use crate::error::RegistryError;
use crate::loader::Row;
use serde::Serialize;
use std::sync::Arc;

/// A US state (or state-equivalent: DC, territories) keyed by postal code.
///
/// `code`, `fips`, `ns_code` and `name` are each unique across the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct State {
    /// Postal abbreviation, e.g. "NY"
    pub code: String,

    /// Two-digit FIPS code, zero padded, e.g. "36"
    pub fips: String,

    /// National standard (GNIS) code, opaque
    pub ns_code: String,

    /// Full name, e.g. "New York"
    pub name: String,

    /// Linked counties in table order. Empty until linking runs.
    pub counties: Vec<Arc<County>>,
}

impl State {
    pub fn new(code: &str, fips: &str, ns_code: &str, name: &str) -> Self {
        State {
            code: code.to_string(),
            fips: fips.to_string(),
            ns_code: ns_code.to_string(),
            name: name.to_string(),
            counties: Vec::new(),
        }
    }

    /// Build from a canonical state row (`state`, `fips`, `ns_code`, `name`).
    pub fn from_row(row: &Row, index: usize) -> Result<Self, RegistryError> {
        Ok(State::new(
            field(row, "state", "state", index)?,
            field(row, "state", "fips", index)?,
            field(row, "state", "ns_code", index)?,
            field(row, "state", "name", index)?,
        ))
    }

    /// Census universal geographic id, e.g. "0400000US36".
    pub fn ucgid(&self) -> String {
        format!("0400000US{}", self.fips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_row() {
        let row: Row = [
            ("state", "NY"),
            ("fips", "36"),
            ("ns_code", "01779796"),
            ("name", "New York"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let state = State::from_row(&row, 0).unwrap();

        assert_eq!(state.code, "NY");
        assert_eq!(state.fips, "36");
        assert_eq!(state.name, "New York");
        assert!(state.counties.is_empty());
    }

    #[test]
    fn test_state_from_row_missing_field() {
        let row: Row = [("state".to_string(), "NY".to_string())].into_iter().collect();

        let err = State::from_row(&row, 3).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::MissingField {
                entity: "state",
                row: 3,
                field: "fips"
            }
        ));
    }

    #[test]
    fn test_state_ucgid() {
        let state = State::new("AL", "01", "01779775", "Alabama");
        assert_eq!(state.ucgid(), "0400000US01");
    }
}
