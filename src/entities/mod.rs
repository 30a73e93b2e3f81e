// Entity Models - States and Counties from the Census reference tables
//
// Each entity is built once from a raw row, linked once, then frozen
// behind an Arc for the lifetime of the registry.

pub mod builder;
pub mod county;
pub mod state;

pub use builder::{build_entities, Entities};
pub use county::County;
pub use state::State;

use crate::error::RegistryError;
use crate::loader::Row;

/// Required canonical field of a raw row.
pub(crate) fn field<'a>(
    row: &'a Row,
    entity: &'static str,
    name: &'static str,
    index: usize,
) -> Result<&'a str, RegistryError> {
    row.get(name)
        .map(String::as_str)
        .ok_or(RegistryError::MissingField {
            entity,
            row: index,
            field: name,
        })
}
