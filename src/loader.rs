// 📂 Reference Loader - pipe-delimited Census code tables → rows of strings
//
// Every value stays a string so FIPS codes keep their leading zeros.
// Headers are trimmed, then renamed to canonical field names.

use crate::config::TableSource;
use crate::error::DataSourceError;
use crate::fetch::{ensure_local, Fetcher};
use chrono::{DateTime, Utc};
use csv::{ErrorKind, ReaderBuilder, Trim};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// One table row: canonical column name → raw string value.
pub type Row = BTreeMap<String, String>;

// ============================================================================
// TABLE KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableKind {
    State,
    County,
}

impl TableKind {
    /// Source header → canonical name. Every listed column is required.
    pub fn columns(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            // Columns: STATE STATEFP STATENS STATE_NAME
            TableKind::State => &[
                ("STATE", "state"),
                ("STATEFP", "fips"),
                ("STATENS", "ns_code"),
                ("STATE_NAME", "name"),
            ],
            // Columns: STATE STATEFP COUNTYFP COUNTYNS COUNTYNAME CLASSFP FUNCSTAT
            TableKind::County => &[
                ("STATE", "state"),
                ("STATEFP", "state_fips"),
                ("COUNTYFP", "fips"),
                ("COUNTYNS", "ns_code"),
                ("COUNTYNAME", "name"),
                ("CLASSFP", "fips_class_code"),
                ("FUNCSTAT", "fips_functional_status"),
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::State => "state",
            TableKind::County => "county",
        }
    }

    fn canonical_name(&self, header: &str) -> String {
        self.columns()
            .iter()
            .find(|(source, _)| *source == header)
            .map(|(_, canonical)| canonical.to_string())
            .unwrap_or_else(|| header.to_string())
    }
}

// ============================================================================
// LOADED TABLE
// ============================================================================

/// Where a table came from and what it contained when it was read.
#[derive(Debug, Clone, Serialize)]
pub struct TableProvenance {
    pub kind: TableKind,
    pub path: PathBuf,
    /// Hex SHA-256 of the raw file bytes.
    pub sha256: String,
    pub rows: usize,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RawTable {
    pub kind: TableKind,
    pub rows: Vec<Row>,
    pub provenance: TableProvenance,
}

/// Fetch-or-cache the table, then read it.
pub fn load_table(
    kind: TableKind,
    source: &TableSource,
    fetcher: &dyn Fetcher,
) -> Result<RawTable, DataSourceError> {
    let path = ensure_local(&source.path, &source.url, fetcher)?;
    read_table(kind, &path)
}

/// Read and parse a table that is already on disk.
pub fn read_table(kind: TableKind, path: &Path) -> Result<RawTable, DataSourceError> {
    let bytes = fs::read(path).map_err(|source| DataSourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let rows = parse_table(kind, bytes.as_slice(), path)?;

    let provenance = TableProvenance {
        kind,
        path: path.to_path_buf(),
        sha256: format!("{:x}", Sha256::digest(&bytes)),
        rows: rows.len(),
        loaded_at: Utc::now(),
    };

    tracing::info!(
        table = kind.as_str(),
        path = %path.display(),
        rows = provenance.rows,
        sha256 = %provenance.sha256,
        "loaded reference table"
    );

    Ok(RawTable {
        kind,
        rows,
        provenance,
    })
}

/// Parse pipe-delimited text into canonical rows.
///
/// `path` is only used to label errors. A header with no data rows yields
/// an empty vector; input without a header line is an error.
pub fn parse_table<R: Read>(
    kind: TableKind,
    reader: R,
    path: &Path,
) -> Result<Vec<Row>, DataSourceError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .clone();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(DataSourceError::Empty {
            path: path.to_path_buf(),
        });
    }

    for (source, _) in kind.columns() {
        if !headers.iter().any(|h| h == *source) {
            return Err(DataSourceError::MissingColumn {
                path: path.to_path_buf(),
                column: source.to_string(),
            });
        }
    }

    let names: Vec<String> = headers.iter().map(|h| kind.canonical_name(h)).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| csv_error(path, e))?;
        let row: Row = names
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

fn csv_error(path: &Path, err: csv::Error) -> DataSourceError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    match err.kind() {
        ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => DataSourceError::ColumnCount {
            path: path.to_path_buf(),
            line,
            expected: *expected_len as usize,
            found: *len as usize,
        },
        ErrorKind::Io(e) => DataSourceError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(e.kind(), e.to_string()),
        },
        _ => DataSourceError::Parse {
            path: path.to_path_buf(),
            line,
            source: err,
        },
    }
}
