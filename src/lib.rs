// Census Codes - Core Library
// Geographic reference registry (states + counties by FIPS / name) and the
// vacancy query client built on top of it.

pub mod config;
pub mod entities;
pub mod error;
pub mod fetch;
pub mod index;
pub mod loader;
pub mod registry;
pub mod vacancy;

// Re-export commonly used types
pub use config::{ApiConfig, DuplicatePolicy, OrphanPolicy, RegistryConfig, TableSource};
pub use entities::{build_entities, County, Entities, State};
pub use error::{DataSourceError, LookupMiss, QueryError, RegistryError};
pub use fetch::{ensure_local, Fetcher};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use index::{CountyIndex, StateIndex};
pub use loader::{load_table, parse_table, read_table, RawTable, Row, TableKind, TableProvenance};
pub use registry::{BuildOptions, Registry, RegistryCell};
pub use vacancy::{parse_response, Dataset, QueryKeys, VacancyClient, VacancyRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
