use log::info;

use crate::error::OverrideError;
use crate::logic::reconcile::ReconciliationEngine;
use crate::logic::state::OverrideState;
use crate::model::{OverrideFilter, OverrideQuery};
use crate::store::traits::OverrideStore;

/// Fetching and navigating the override list
pub struct OverrideListing;

impl OverrideListing {
    /// Fetches the page named by the current query
    pub async fn load<S: OverrideStore + ?Sized>(
        state: &mut OverrideState,
        store: &S,
    ) -> Result<(), OverrideError> {
        state.run(Self::ensure_unlocked)?;
        let result = ReconciliationEngine::full_reload(state, store).await;
        result.map_err(|e| state.report(e))
    }

    /// Applies a new filter and goes back to the first page
    pub async fn change_filter<S: OverrideStore + ?Sized>(
        state: &mut OverrideState,
        store: &S,
        filter: OverrideFilter,
    ) -> Result<(), OverrideError> {
        info!("override filter changed to {:?}", filter);
        Self::navigate(state, store, |query| {
            query.filter = filter;
            query.page = 0;
        })
        .await
    }

    pub async fn go_to_page<S: OverrideStore + ?Sized>(
        state: &mut OverrideState,
        store: &S,
        page: usize,
    ) -> Result<(), OverrideError> {
        Self::navigate(state, store, |query| query.page = page).await
    }

    /// Changes the query and reloads. A failed fetch restores the previous
    /// query along with the last good list.
    async fn navigate<S: OverrideStore + ?Sized>(
        state: &mut OverrideState,
        store: &S,
        change: impl FnOnce(&mut OverrideQuery),
    ) -> Result<(), OverrideError> {
        state.run(Self::ensure_unlocked)?;

        let previous = state.context.query.clone();
        change(&mut state.context.query);

        let result = ReconciliationEngine::full_reload(state, store).await;
        if result.is_err() {
            state.context.query = previous;
        }
        result.map_err(|e| state.report(e))
    }

    fn ensure_unlocked(state: &mut OverrideState) -> Result<(), OverrideError> {
        match state.session.holder() {
            Some(section) => Err(OverrideError::UnsavedChanges(section)),
            None => Ok(()),
        }
    }
}
