// ⚠️ Error Types - Build-time failures vs. per-call lookup misses
//
// Build-time errors abort registry construction (no partial registry).
// Lookup misses are ordinary values the caller can recover from.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// DATA SOURCE ERRORS (Reference Loader + fetch-or-cache)
// ============================================================================

/// A raw code table could not be fetched or parsed.
#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to initialise HTTP client: {0}")]
    ClientInit(String),

    #[error("fetch of {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table {} at line {line}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("table {} is empty (no header line)", .path.display())]
    Empty { path: PathBuf },

    #[error("table {} is missing required column {column}", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("table {} line {line}: expected {expected} columns, found {found}", .path.display())]
    ColumnCount {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },
}

// ============================================================================
// REGISTRY BUILD ERRORS
// ============================================================================

/// Registry construction failed. Nothing is exposed when this is returned.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// A row handed to the entity builder lacks a canonical field.
    #[error("{entity} row {row} is missing field {field:?}")]
    MissingField {
        entity: &'static str,
        row: usize,
        field: &'static str,
    },

    /// County references a postal code that no loaded state carries.
    #[error("county {county:?} references unknown state {state:?}")]
    UnresolvedParent { county: String, state: String },

    /// County's parent was found by postal code but its FIPS disagrees.
    #[error(
        "county {county:?} in state {state:?} has state_fips {county_state_fips:?}, \
         but the state's fips is {state_fips:?}"
    )]
    ParentMismatch {
        county: String,
        state: String,
        county_state_fips: String,
        state_fips: String,
    },

    /// Two entities collided on a one-to-one index under `DuplicatePolicy::Reject`.
    #[error("duplicate key {key:?} in index {index}")]
    DuplicateKey { index: &'static str, key: String },
}

// ============================================================================
// LOOKUP MISS
// ============================================================================

/// A lookup found no entry for the key. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no entry for {key:?} in {index}")]
pub struct LookupMiss {
    pub index: &'static str,
    pub key: String,
}

impl LookupMiss {
    pub fn new(index: &'static str, key: impl Into<String>) -> Self {
        LookupMiss {
            index,
            key: key.into(),
        }
    }
}

// ============================================================================
// QUERY ERRORS (Vacancy Query Client)
// ============================================================================

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("could not resolve county: {0}")]
    Resolution(#[from] LookupMiss),

    #[error("{field} code {value:?} is not numeric")]
    InvalidCode { field: &'static str, value: String },

    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("request to {url} returned HTTP {status}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected API response: {0}")]
    Response(String),
}
