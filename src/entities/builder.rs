// 🔗 Entity Builder - rows → States + Counties, counties linked to parents
//
// Linking indexes states by postal code first, so it is O(counties).

use crate::config::OrphanPolicy;
use crate::entities::{County, State};
use crate::error::RegistryError;
use crate::loader::Row;
use std::collections::HashMap;
use std::sync::Arc;

/// The built and linked entity lists, in input row order.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    pub states: Vec<Arc<State>>,
    pub counties: Vec<Arc<County>>,
}

/// Build every state and county and link each county to its parent state.
///
/// A county whose postal code matches no state, or whose `state_fips`
/// disagrees with the matched state's `fips`, is an orphan:
/// - `OrphanPolicy::Strict` fails the whole build.
/// - `OrphanPolicy::Lenient` keeps it in `counties` with `full_name` unset
///   and leaves it out of every state's `counties`.
pub fn build_entities(
    state_rows: &[Row],
    county_rows: &[Row],
    orphan_policy: OrphanPolicy,
) -> Result<Entities, RegistryError> {
    let mut states = state_rows
        .iter()
        .enumerate()
        .map(|(i, row)| State::from_row(row, i))
        .collect::<Result<Vec<_>, _>>()?;

    // Postal code → position in `states`. A repeated code links to the later state.
    let by_code: HashMap<String, usize> = states
        .iter()
        .enumerate()
        .map(|(i, s)| (s.code.clone(), i))
        .collect();

    let mut counties = Vec::with_capacity(county_rows.len());
    let mut children: Vec<Vec<Arc<County>>> = vec![Vec::new(); states.len()];
    let mut orphans = 0usize;

    for (i, row) in county_rows.iter().enumerate() {
        let mut county = County::from_row(row, i)?;

        let parent = match by_code.get(&county.state) {
            Some(&idx) if states[idx].fips == county.state_fips => Some(idx),
            Some(&idx) => {
                let state = &states[idx];
                match orphan_policy {
                    OrphanPolicy::Strict => {
                        return Err(RegistryError::ParentMismatch {
                            county: county.name,
                            state: county.state,
                            county_state_fips: county.state_fips,
                            state_fips: state.fips.clone(),
                        });
                    }
                    OrphanPolicy::Lenient => {
                        tracing::warn!(
                            county = %county.name,
                            state = %county.state,
                            county_state_fips = %county.state_fips,
                            state_fips = %state.fips,
                            "county state_fips disagrees with parent state, leaving unlinked"
                        );
                        None
                    }
                }
            }
            None => match orphan_policy {
                OrphanPolicy::Strict => {
                    return Err(RegistryError::UnresolvedParent {
                        county: county.name,
                        state: county.state,
                    });
                }
                OrphanPolicy::Lenient => {
                    tracing::warn!(
                        county = %county.name,
                        state = %county.state,
                        "county references unknown state, leaving unlinked"
                    );
                    None
                }
            },
        };

        match parent {
            Some(idx) => {
                county.full_name = Some(format!("{}, {}", county.name, states[idx].name));
                let county = Arc::new(county);
                children[idx].push(Arc::clone(&county));
                counties.push(county);
            }
            None => {
                orphans += 1;
                counties.push(Arc::new(county));
            }
        }
    }

    for (state, linked) in states.iter_mut().zip(children) {
        state.counties = linked;
    }

    tracing::debug!(
        states = states.len(),
        counties = counties.len(),
        orphans,
        "linked reference entities"
    );

    Ok(Entities {
        states: states.into_iter().map(Arc::new).collect(),
        counties,
    })
}
