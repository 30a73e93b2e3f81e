// 🏛️ Registry Facade - the immutable, shareable set of linked entities
//
// Built once (Loader → Entity Builder → Index Builder), then only read.
// Share it as Arc<Registry>; RegistryCell guards one-time lazy construction.

use crate::config::{DuplicatePolicy, OrphanPolicy, RegistryConfig};
use crate::entities::{build_entities, County, State};
use crate::error::{LookupMiss, RegistryError};
use crate::fetch::Fetcher;
use crate::index::{
    CountyIndex, StateIndex, COUNTY_BY_FIPS, COUNTY_BY_FULL_NAME, COUNTY_BY_NAME,
    COUNTY_BY_STATE, COUNTY_BY_STATE_AND_NAME, STATE_BY_CODE, STATE_BY_FIPS, STATE_BY_NAME,
};
use crate::loader::{load_table, RawTable, Row, TableKind, TableProvenance};
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Build-time policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub orphan_policy: OrphanPolicy,
    pub duplicate_policy: DuplicatePolicy,
}

impl From<&RegistryConfig> for BuildOptions {
    fn from(config: &RegistryConfig) -> Self {
        BuildOptions {
            orphan_policy: config.orphan_policy,
            duplicate_policy: config.duplicate_policy,
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone)]
pub struct Registry {
    states: Vec<Arc<State>>,
    counties: Vec<Arc<County>>,
    state_lookup: StateIndex,
    county_lookup: CountyIndex,
    provenance: Vec<TableProvenance>,
    built_at: DateTime<Utc>,
}

impl Registry {
    /// Build from canonical rows already in memory.
    pub fn build(
        state_rows: &[Row],
        county_rows: &[Row],
        options: &BuildOptions,
    ) -> Result<Self, RegistryError> {
        let entities = build_entities(state_rows, county_rows, options.orphan_policy)?;
        let state_lookup = StateIndex::build(&entities.states, options.duplicate_policy)?;
        let county_lookup =
            CountyIndex::build(&entities.states, &entities.counties, options.duplicate_policy)?;

        tracing::info!(
            states = entities.states.len(),
            counties = entities.counties.len(),
            full_names = county_lookup.len(),
            "built geographic reference registry"
        );

        Ok(Registry {
            states: entities.states,
            counties: entities.counties,
            state_lookup,
            county_lookup,
            provenance: Vec::new(),
            built_at: Utc::now(),
        })
    }

    /// Build from two loaded tables, keeping their provenance.
    pub fn from_tables(
        states: RawTable,
        counties: RawTable,
        options: &BuildOptions,
    ) -> Result<Self, RegistryError> {
        let mut registry = Registry::build(&states.rows, &counties.rows, options)?;
        registry.provenance = vec![states.provenance, counties.provenance];
        Ok(registry)
    }

    /// Fetch-or-cache both tables (state first, then county) and build.
    pub fn load(config: &RegistryConfig, fetcher: &dyn Fetcher) -> Result<Self, RegistryError> {
        let states = load_table(TableKind::State, &config.state_table, fetcher)?;
        let counties = load_table(TableKind::County, &config.county_table, fetcher)?;
        Registry::from_tables(states, counties, &BuildOptions::from(config))
    }

    // ------------------------------------------------------------------------
    // Entity lists and indices
    // ------------------------------------------------------------------------

    /// Every state, in table order.
    pub fn states(&self) -> &[Arc<State>] {
        &self.states
    }

    /// Every county in table order, including unlinked ones.
    pub fn counties(&self) -> &[Arc<County>] {
        &self.counties
    }

    pub fn state_lookup(&self) -> &StateIndex {
        &self.state_lookup
    }

    pub fn county_lookup(&self) -> &CountyIndex {
        &self.county_lookup
    }

    /// Empty when built from in-memory rows.
    pub fn provenance(&self) -> &[TableProvenance] {
        &self.provenance
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Counties the linking pass could not attach to a state.
    pub fn unlinked_counties(&self) -> impl Iterator<Item = &Arc<County>> {
        self.counties.iter().filter(|c| !c.is_linked())
    }

    // ------------------------------------------------------------------------
    // Resolution (typed "not found")
    // ------------------------------------------------------------------------

    pub fn resolve_state(&self, code: &str) -> Result<&Arc<State>, LookupMiss> {
        self.state_lookup
            .by_code(code)
            .ok_or_else(|| LookupMiss::new(STATE_BY_CODE, code))
    }

    pub fn resolve_state_fips(&self, fips: &str) -> Result<&Arc<State>, LookupMiss> {
        self.state_lookup
            .by_fips(fips)
            .ok_or_else(|| LookupMiss::new(STATE_BY_FIPS, fips))
    }

    pub fn resolve_state_name(&self, name: &str) -> Result<&Arc<State>, LookupMiss> {
        self.state_lookup
            .by_name(name)
            .ok_or_else(|| LookupMiss::new(STATE_BY_NAME, name))
    }

    pub fn resolve_counties_in(&self, state_code: &str) -> Result<&[Arc<County>], LookupMiss> {
        self.county_lookup
            .by_state(state_code)
            .ok_or_else(|| LookupMiss::new(COUNTY_BY_STATE, state_code))
    }

    pub fn resolve_county_fips(
        &self,
        state_code: &str,
        fips: &str,
    ) -> Result<&Arc<County>, LookupMiss> {
        self.county_lookup
            .by_fips(state_code, fips)
            .ok_or_else(|| LookupMiss::new(COUNTY_BY_FIPS, format!("{state_code}/{fips}")))
    }

    pub fn resolve_counties_named(&self, name: &str) -> Result<&[Arc<County>], LookupMiss> {
        self.county_lookup
            .by_name(name)
            .ok_or_else(|| LookupMiss::new(COUNTY_BY_NAME, name))
    }

    /// e.g. "Bronx County, New York".
    pub fn resolve_full_name(&self, full_name: &str) -> Result<&Arc<County>, LookupMiss> {
        self.county_lookup
            .by_full_name(full_name)
            .ok_or_else(|| LookupMiss::new(COUNTY_BY_FULL_NAME, full_name))
    }

    pub fn resolve_county(&self, state_code: &str, name: &str) -> Result<&Arc<County>, LookupMiss> {
        self.county_lookup
            .by_state_and_name(state_code, name)
            .ok_or_else(|| LookupMiss::new(COUNTY_BY_STATE_AND_NAME, format!("{state_code}/{name}")))
    }
}

// ============================================================================
// ONE-TIME INITIALIZATION
// ============================================================================

/// Holds at most one registry. Concurrent first calls run a single build;
/// every later call returns the same `Arc` without loading anything.
/// A failed build leaves the cell empty so a later call may retry.
#[derive(Debug, Default)]
pub struct RegistryCell {
    cell: OnceCell<Arc<Registry>>,
}

impl RegistryCell {
    pub const fn new() -> Self {
        RegistryCell {
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Option<Arc<Registry>> {
        self.cell.get().cloned()
    }

    pub fn get_or_try_init<F>(&self, build: F) -> Result<Arc<Registry>, RegistryError>
    where
        F: FnOnce() -> Result<Registry, RegistryError>,
    {
        self.cell
            .get_or_try_init(|| build().map(Arc::new))
            .map(Arc::clone)
    }

    pub fn get_or_load(
        &self,
        config: &RegistryConfig,
        fetcher: &dyn Fetcher,
    ) -> Result<Arc<Registry>, RegistryError> {
        self.get_or_try_init(|| Registry::load(config, fetcher))
    }
}
