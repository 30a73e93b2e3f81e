// 📇 Index Builder - read-only lookup views over linked entities
//
// Indices are built once, after linking, and never mutated afterwards.
// One-to-one indices follow the configured DuplicatePolicy.

use crate::config::DuplicatePolicy;
use crate::entities::{County, State};
use crate::error::RegistryError;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

// Index names, used in DuplicateKey / LookupMiss errors.
pub const STATE_BY_CODE: &str = "state.by_code";
pub const STATE_BY_FIPS: &str = "state.by_fips";
pub const STATE_BY_NAME: &str = "state.by_name";
pub const COUNTY_BY_STATE: &str = "county.by_state";
pub const COUNTY_BY_FIPS: &str = "county.by_fips";
pub const COUNTY_BY_NAME: &str = "county.by_name";
pub const COUNTY_BY_FULL_NAME: &str = "county.by_full_name";
pub const COUNTY_BY_STATE_AND_NAME: &str = "county.by_state_and_name";

// ============================================================================
// STATE INDEX
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateIndex {
    by_code: HashMap<String, Arc<State>>,
    by_fips: HashMap<String, Arc<State>>,
    by_name: HashMap<String, Arc<State>>,
}

impl StateIndex {
    pub fn build(states: &[Arc<State>], policy: DuplicatePolicy) -> Result<Self, RegistryError> {
        let mut index = StateIndex::default();

        for state in states {
            insert_one(&mut index.by_code, STATE_BY_CODE, &state.code, Arc::clone(state), policy)?;
            insert_one(&mut index.by_fips, STATE_BY_FIPS, &state.fips, Arc::clone(state), policy)?;
            insert_one(&mut index.by_name, STATE_BY_NAME, &state.name, Arc::clone(state), policy)?;
        }

        Ok(index)
    }

    /// By postal code, e.g. "NY".
    pub fn by_code(&self, code: &str) -> Option<&Arc<State>> {
        self.by_code.get(code)
    }

    /// By two-digit FIPS code, e.g. "36".
    pub fn by_fips(&self, fips: &str) -> Option<&Arc<State>> {
        self.by_fips.get(fips)
    }

    /// By full state name, e.g. "New York".
    pub fn by_name(&self, name: &str) -> Option<&Arc<State>> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

// ============================================================================
// COUNTY INDEX
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountyIndex {
    by_state: HashMap<String, Vec<Arc<County>>>,
    by_fips: HashMap<String, HashMap<String, Arc<County>>>,
    by_name: BTreeMap<String, Vec<Arc<County>>>,
    by_full_name: HashMap<String, Arc<County>>,
    by_state_and_name: HashMap<String, HashMap<String, Arc<County>>>,
}

impl CountyIndex {
    /// `states` must already carry their linked counties.
    pub fn build(
        states: &[Arc<State>],
        counties: &[Arc<County>],
        policy: DuplicatePolicy,
    ) -> Result<Self, RegistryError> {
        let mut index = CountyIndex::default();

        for state in states {
            insert_one(
                &mut index.by_state,
                COUNTY_BY_STATE,
                &state.code,
                state.counties.clone(),
                policy,
            )?;

            let mut by_fips = HashMap::with_capacity(state.counties.len());
            let mut by_name = HashMap::with_capacity(state.counties.len());
            for county in &state.counties {
                insert_one(&mut by_fips, COUNTY_BY_FIPS, &county.fips, Arc::clone(county), policy)?;
                insert_one(
                    &mut by_name,
                    COUNTY_BY_STATE_AND_NAME,
                    &county.name,
                    Arc::clone(county),
                    policy,
                )?;
            }
            insert_one(&mut index.by_fips, COUNTY_BY_FIPS, &state.code, by_fips, policy)?;
            insert_one(
                &mut index.by_state_and_name,
                COUNTY_BY_STATE_AND_NAME,
                &state.code,
                by_name,
                policy,
            )?;
        }

        for county in counties {
            index
                .by_name
                .entry(county.name.clone())
                .or_default()
                .push(Arc::clone(county));

            if let Some(full_name) = &county.full_name {
                insert_one(
                    &mut index.by_full_name,
                    COUNTY_BY_FULL_NAME,
                    full_name,
                    Arc::clone(county),
                    policy,
                )?;
            }
        }

        Ok(index)
    }

    /// Every county of a state, in table order. `None` for an unknown code.
    pub fn by_state(&self, code: &str) -> Option<&[Arc<County>]> {
        self.by_state.get(code).map(Vec::as_slice)
    }

    /// Exact lookup by postal code and three-digit county FIPS.
    pub fn by_fips(&self, state_code: &str, fips: &str) -> Option<&Arc<County>> {
        self.by_fips.get(state_code)?.get(fips)
    }

    /// Every county sharing a name, across all states, in table order.
    pub fn by_name(&self, name: &str) -> Option<&[Arc<County>]> {
        self.by_name.get(name).map(Vec::as_slice)
    }

    /// Distinct county names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// By "{county name}, {state name}".
    pub fn by_full_name(&self, full_name: &str) -> Option<&Arc<County>> {
        self.by_full_name.get(full_name)
    }

    /// By postal code and county name, without building the full name.
    pub fn by_state_and_name(&self, state_code: &str, name: &str) -> Option<&Arc<County>> {
        self.by_state_and_name.get(state_code)?.get(name)
    }

    /// Number of counties reachable by full name.
    pub fn len(&self) -> usize {
        self.by_full_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_full_name.is_empty()
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn insert_one<V>(
    map: &mut HashMap<String, V>,
    index: &'static str,
    key: &str,
    value: V,
    policy: DuplicatePolicy,
) -> Result<(), RegistryError> {
    match map.entry(key.to_string()) {
        Entry::Vacant(slot) => {
            slot.insert(value);
            Ok(())
        }
        Entry::Occupied(mut slot) => match policy {
            DuplicatePolicy::Reject => Err(RegistryError::DuplicateKey {
                index,
                key: key.to_string(),
            }),
            DuplicatePolicy::LastWriteWins => {
                tracing::warn!(index, key, "duplicate key, later entry replaces earlier");
                slot.insert(value);
                Ok(())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(code: &str, fips: &str, name: &str, counties: Vec<Arc<County>>) -> Arc<State> {
        let mut state = State::new(code, fips, "0", name);
        state.counties = counties;
        Arc::new(state)
    }

    fn county(state: &str, state_fips: &str, fips: &str, name: &str, state_name: &str) -> Arc<County> {
        Arc::new(County {
            state: state.to_string(),
            state_fips: state_fips.to_string(),
            fips: fips.to_string(),
            ns_code: "0".to_string(),
            name: name.to_string(),
            fips_class_code: "H1".to_string(),
            fips_functional_status: "A".to_string(),
            full_name: Some(format!("{}, {}", name, state_name)),
        })
    }

    #[test]
    fn test_state_index_lookups() {
        let states = vec![
            state("NY", "36", "New York", vec![]),
            state("NJ", "34", "New Jersey", vec![]),
        ];

        let index = StateIndex::build(&states, DuplicatePolicy::Reject).unwrap();

        assert_eq!(index.len(), 2);
        assert!(Arc::ptr_eq(index.by_code("NY").unwrap(), &states[0]));
        assert!(Arc::ptr_eq(index.by_fips("34").unwrap(), &states[1]));
        assert!(Arc::ptr_eq(index.by_name("New York").unwrap(), &states[0]));
        assert!(index.by_code("ZZ").is_none());
    }

    #[test]
    fn test_state_duplicate_code_policies() {
        let states = vec![
            state("NY", "36", "New York", vec![]),
            state("NY", "99", "Not New York", vec![]),
        ];

        let index = StateIndex::build(&states, DuplicatePolicy::LastWriteWins).unwrap();
        assert_eq!(index.by_code("NY").unwrap().name, "Not New York");
        // Distinct fips/name keys are both kept.
        assert_eq!(index.by_fips("36").unwrap().name, "New York");

        let err = StateIndex::build(&states, DuplicatePolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::DuplicateKey { index: STATE_BY_CODE, .. }
        ));
    }

    #[test]
    fn test_county_index_lookups() {
        let bronx = county("NY", "36", "005", "Bronx County", "New York");
        let wash_ny = county("NY", "36", "115", "Washington County", "New York");
        let wash_pa = county("PA", "42", "125", "Washington County", "Pennsylvania");
        let states = vec![
            state("NY", "36", "New York", vec![bronx.clone(), wash_ny.clone()]),
            state("PA", "42", "Pennsylvania", vec![wash_pa.clone()]),
        ];
        let counties = vec![bronx.clone(), wash_ny.clone(), wash_pa.clone()];

        let index = CountyIndex::build(&states, &counties, DuplicatePolicy::Reject).unwrap();

        assert_eq!(index.by_state("NY").unwrap().len(), 2);
        assert!(Arc::ptr_eq(index.by_fips("NY", "005").unwrap(), &bronx));
        assert!(index.by_fips("PA", "005").is_none());
        assert!(Arc::ptr_eq(
            index.by_full_name("Washington County, Pennsylvania").unwrap(),
            &wash_pa
        ));
        assert!(Arc::ptr_eq(
            index.by_state_and_name("NY", "Washington County").unwrap(),
            &wash_ny
        ));

        let washingtons = index.by_name("Washington County").unwrap();
        assert_eq!(washingtons.len(), 2);
        assert!(Arc::ptr_eq(&washingtons[0], &wash_ny));
        assert!(Arc::ptr_eq(&washingtons[1], &wash_pa));

        let names: Vec<&str> = index.names().collect();
        assert_eq!(names, vec!["Bronx County", "Washington County"]);
    }

    #[test]
    fn test_state_without_counties_has_empty_entries() {
        let states = vec![state("DC", "11", "District of Columbia", vec![])];

        let index = CountyIndex::build(&states, &[], DuplicatePolicy::Reject).unwrap();

        assert_eq!(index.by_state("DC").unwrap().len(), 0);
        assert!(index.by_fips("DC", "001").is_none());
        assert!(index.by_state("ZZ").is_none());
    }

    #[test]
    fn test_duplicate_full_name_last_write_wins() {
        let first = county("NY", "36", "005", "Bronx County", "New York");
        let second = county("NY", "36", "905", "Bronx County", "New York");
        let states = vec![state("NY", "36", "New York", vec![first.clone(), second.clone()])];
        let counties = vec![first.clone(), second.clone()];

        let index =
            CountyIndex::build(&states, &counties, DuplicatePolicy::LastWriteWins).unwrap();

        assert!(Arc::ptr_eq(index.by_full_name("Bronx County, New York").unwrap(), &second));
        assert!(Arc::ptr_eq(index.by_state_and_name("NY", "Bronx County").unwrap(), &second));
        // Both remain reachable by FIPS and by name.
        assert!(Arc::ptr_eq(index.by_fips("NY", "005").unwrap(), &first));
        assert_eq!(index.by_name("Bronx County").unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_name_within_state_rejected() {
        let first = county("NY", "36", "005", "Bronx County", "New York");
        let second = county("NY", "36", "905", "Bronx County", "New York");
        let states = vec![state("NY", "36", "New York", vec![first.clone(), second.clone()])];

        let err = CountyIndex::build(&states, &[first, second], DuplicatePolicy::Reject)
            .unwrap_err();

        match err {
            RegistryError::DuplicateKey { index, key } => {
                assert_eq!(index, COUNTY_BY_STATE_AND_NAME);
                assert_eq!(key, "Bronx County");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_full_name_across_states_rejected() {
        // Two postal codes sharing a state name yield the same full name
        // while every per-state key stays distinct.
        let first = county("NY", "36", "005", "Bronx County", "New York");
        let second = county("XY", "98", "005", "Bronx County", "New York");
        let states = vec![
            state("NY", "36", "New York", vec![first.clone()]),
            state("XY", "98", "New York", vec![second.clone()]),
        ];
        let counties = vec![first.clone(), second.clone()];

        let err = CountyIndex::build(&states, &counties, DuplicatePolicy::Reject).unwrap_err();
        match err {
            RegistryError::DuplicateKey { index, key } => {
                assert_eq!(index, COUNTY_BY_FULL_NAME);
                assert_eq!(key, "Bronx County, New York");
            }
            other => panic!("unexpected error: {other}"),
        }

        let index =
            CountyIndex::build(&states, &counties, DuplicatePolicy::LastWriteWins).unwrap();
        assert!(Arc::ptr_eq(index.by_full_name("Bronx County, New York").unwrap(), &second));
        assert!(Arc::ptr_eq(index.by_fips("NY", "005").unwrap(), &first));
    }

    #[test]
    fn test_unlinked_county_only_in_name_index() {
        let mut orphan = (*county("ZZ", "99", "001", "Nowhere County", "")).clone();
        orphan.full_name = None;
        let orphan = Arc::new(orphan);

        let index = CountyIndex::build(&[], &[orphan.clone()], DuplicatePolicy::Reject).unwrap();

        assert!(index.by_state("ZZ").is_none());
        assert!(index.by_fips("ZZ", "001").is_none());
        assert!(index.is_empty());
        assert!(Arc::ptr_eq(&index.by_name("Nowhere County").unwrap()[0], &orphan));
    }
}
