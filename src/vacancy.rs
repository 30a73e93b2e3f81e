// 🏚️ Vacancy Query Client - County → Census API request → vacancy rate
//
// 2020 uses the decennial P.L. dataset (no standard ACS 1-year release
// that year); every other year uses the ACS 1-year profile tables.

use crate::config::ApiConfig;
use crate::entities::County;
use crate::error::QueryError;
use crate::registry::Registry;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub const REDACTED_KEY: &str = "API_KEY_REDACTED";

// ============================================================================
// QUERY KEYS
// ============================================================================

/// The two geography codes an API call needs, fixed width and zero padded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryKeys {
    /// Two digits, e.g. "06"
    pub state: String,
    /// Three digits, e.g. "005"
    pub county: String,
}

impl QueryKeys {
    pub fn for_county(county: &County) -> Result<Self, QueryError> {
        Ok(QueryKeys {
            state: pad_code("state_fips", &county.state_fips, 2)?,
            county: pad_code("county_fips", &county.fips, 3)?,
        })
    }
}

/// Re-render a numeric code at `width` digits regardless of source padding.
fn pad_code(field: &'static str, value: &str, width: usize) -> Result<String, QueryError> {
    let trimmed = value.trim();
    let invalid = || QueryError::InvalidCode {
        field,
        value: value.to_string(),
    };

    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let number: u32 = trimmed.parse().map_err(|_| invalid())?;
    let padded = format!("{:0width$}", number, width = width);
    if padded.len() > width {
        return Err(invalid());
    }
    Ok(padded)
}

// ============================================================================
// DATASETS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dataset {
    /// Decennial census, redistricting (P.L. 94-171) file
    DecennialPl,
    /// American Community Survey 1-year data profile
    Acs1Profile,
}

impl Dataset {
    pub fn for_year(year: u16) -> Self {
        if year == 2020 {
            Dataset::DecennialPl
        } else {
            Dataset::Acs1Profile
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Dataset::DecennialPl => "dec/pl",
            Dataset::Acs1Profile => "acs/acs1/profile",
        }
    }

    /// Variable holding total housing units.
    pub fn total_units_var(&self) -> &'static str {
        match self {
            Dataset::DecennialPl => "H1_001N", // OCCUPANCY STATUS!!Total:
            Dataset::Acs1Profile => "DP04_0001E", // HOUSING OCCUPANCY!!Total housing units
        }
    }

    /// Variable holding vacant housing units.
    pub fn vacant_units_var(&self) -> &'static str {
        match self {
            Dataset::DecennialPl => "H1_003N", // OCCUPANCY STATUS!!Total:!!Vacant
            Dataset::Acs1Profile => "DP04_0003E", // ...!!Total housing units!!Vacant units
        }
    }
}

// ============================================================================
// RESULT ROW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VacancyRecord {
    pub year: u16,
    pub state_fips: String,
    pub county_fips: String,
    pub total_units: u64,
    pub vacant_units: u64,
    /// Percent vacant; `None` when the county reports zero units.
    pub vacancy_rate: Option<f64>,
}

/// Parse the API's JSON (header row followed by data rows).
pub fn parse_response(year: u16, body: &str) -> Result<Vec<VacancyRecord>, QueryError> {
    let dataset = Dataset::for_year(year);
    let table: Vec<Vec<Value>> = serde_json::from_str(body)
        .map_err(|e| QueryError::Response(format!("invalid JSON table: {e}")))?;

    let mut rows = table.into_iter();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| QueryError::Response("empty response".to_string()))?
        .iter()
        .map(cell_text)
        .collect();

    let column = |name: &str| {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| QueryError::Response(format!("missing column {name}")))
    };
    let total_col = column(dataset.total_units_var())?;
    let vacant_col = column(dataset.vacant_units_var())?;
    let state_col = column("state")?;
    let county_col = column("county")?;

    rows.map(|row| {
        let get = |idx: usize| {
            row.get(idx)
                .map(cell_text)
                .ok_or_else(|| QueryError::Response(format!("short row: {row:?}")))
        };
        let count = |idx: usize| -> Result<u64, QueryError> {
            let text = get(idx)?;
            text.parse()
                .map_err(|_| QueryError::Response(format!("non-numeric count {text:?}")))
        };

        let total_units = count(total_col)?;
        let vacant_units = count(vacant_col)?;
        Ok(VacancyRecord {
            year,
            state_fips: get(state_col)?,
            county_fips: get(county_col)?,
            total_units,
            vacant_units,
            vacancy_rate: (total_units > 0)
                .then(|| vacant_units as f64 * 100.0 / total_units as f64),
        })
    })
    .collect()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct VacancyClient {
    registry: Arc<Registry>,
    base_url: String,
    key: Option<String>,
    #[cfg(feature = "http")]
    http: once_cell::sync::OnceCell<reqwest::blocking::Client>,
}

impl VacancyClient {
    pub fn new(registry: Arc<Registry>, api: &ApiConfig) -> Self {
        VacancyClient {
            registry,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            key: api.key.clone(),
            #[cfg(feature = "http")]
            http: once_cell::sync::OnceCell::new(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Look up a county by "{county name}, {state name}".
    pub fn resolve_by_full_name(&self, full_name: &str) -> Result<Arc<County>, QueryError> {
        Ok(Arc::clone(self.registry.resolve_full_name(full_name)?))
    }

    /// Full GET URL for one county and year, API key included.
    pub fn request_url(&self, year: u16, county: &County) -> Result<String, QueryError> {
        let dataset = Dataset::for_year(year);
        let keys = QueryKeys::for_county(county)?;

        let vars = format!("{},{}", dataset.total_units_var(), dataset.vacant_units_var());
        let mut params = vec![
            ("get", vars),
            ("for", format!("county:{}", keys.county)),
            ("in", format!("state:{}", keys.state)),
        ];
        if let Some(key) = &self.key {
            params.push(("key", key.clone()));
        }

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        Ok(format!("{}/{}/{}?{}", self.base_url, year, dataset.path(), query))
    }

    /// Request URL with the API key replaced, safe to log.
    pub fn redacted_url(&self, year: u16, county: &County) -> Result<String, QueryError> {
        let url = self.request_url(year, county)?;
        Ok(self.redact(&url))
    }

    fn redact(&self, text: &str) -> String {
        match self.key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => text
                .replace(urlencoding::encode(key).as_ref(), REDACTED_KEY)
                .replace(key, REDACTED_KEY),
            None => text.to_string(),
        }
    }

    /// Non-200 response, with the key scrubbed from the echoed body.
    #[cfg(any(feature = "http", test))]
    fn status_error(&self, url: String, status: u16, body: &str) -> QueryError {
        QueryError::HttpStatus {
            url,
            status,
            body: self.redact(body),
        }
    }

    #[cfg(feature = "http")]
    pub fn fetch(&self, year: u16, county: &County) -> Result<Vec<VacancyRecord>, QueryError> {
        let url = self.request_url(year, county)?;
        let redacted = self.redact(&url);
        tracing::info!(
            year,
            county = county.full_name.as_deref().unwrap_or(&county.name),
            url = %redacted,
            "requesting vacancy data"
        );

        let http = self
            .http
            .get_or_try_init(|| reqwest::blocking::Client::builder().build())
            .map_err(|e| QueryError::Http {
                url: redacted.clone(),
                reason: format!("HTTP client init failed: {e}"),
            })?;

        let response = http.get(&url).send().map_err(|e| QueryError::Http {
            url: redacted.clone(),
            reason: self.redact(&e.to_string()),
        })?;

        let status = response.status();
        let body = response.text().map_err(|e| QueryError::Http {
            url: redacted.clone(),
            reason: self.redact(&e.to_string()),
        })?;

        if status != reqwest::StatusCode::OK {
            return Err(self.status_error(redacted, status.as_u16(), &body));
        }

        parse_response(year, &body)
    }

    #[cfg(feature = "http")]
    pub fn fetch_by_full_name(
        &self,
        year: u16,
        full_name: &str,
    ) -> Result<Vec<VacancyRecord>, QueryError> {
        let county = self.resolve_by_full_name(full_name)?;
        self.fetch(year, &county)
    }
}
