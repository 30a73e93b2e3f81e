// 🏘️ County Entity - one row of the national county code table

use crate::entities::field;
use crate::error::RegistryError;
use crate::loader::Row;
use serde::Serialize;

/// A county or county-equivalent (parish, borough, census area, ...).
///
/// `name` is not globally unique ("Washington County" exists in many states);
/// `(state_fips, fips)` and `ns_code` are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct County {
    /// Owning state's postal code (foreign key into `State::code`)
    pub state: String,

    /// Owning state's FIPS code (must equal that state's `fips`)
    pub state_fips: String,

    /// Three-digit FIPS code within the state, zero padded, e.g. "005"
    pub fips: String,

    /// National standard (GNIS) code, opaque
    pub ns_code: String,

    /// County name, e.g. "Bronx County"
    pub name: String,

    pub fips_class_code: String,
    pub fips_functional_status: String,

    /// "{name}, {state name}". `None` when the parent state was not resolved.
    pub full_name: Option<String>,
}

impl County {
    /// Build from a canonical county row. `full_name` is left unset.
    pub fn from_row(row: &Row, index: usize) -> Result<Self, RegistryError> {
        Ok(County {
            state: field(row, "county", "state", index)?.to_string(),
            state_fips: field(row, "county", "state_fips", index)?.to_string(),
            fips: field(row, "county", "fips", index)?.to_string(),
            ns_code: field(row, "county", "ns_code", index)?.to_string(),
            name: field(row, "county", "name", index)?.to_string(),
            fips_class_code: field(row, "county", "fips_class_code", index)?.to_string(),
            fips_functional_status: field(row, "county", "fips_functional_status", index)?
                .to_string(),
            full_name: None,
        })
    }

    /// Census universal geographic id, e.g. "0500000US36005".
    pub fn ucgid(&self) -> String {
        format!("0500000US{}{}", self.state_fips, self.fips)
    }

    /// True once the county has been linked to its parent state.
    pub fn is_linked(&self) -> bool {
        self.full_name.is_some()
    }
}
