use log::{debug, info};

use crate::error::OverrideError;
use crate::logic::state::OverrideState;
use crate::model::{OverridePage, OverrideRecord};
use crate::store::traits::OverrideStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update { section: usize },
    Delete,
}

/// How the list catches up with the server after a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStrategy {
    /// Refetch the current page; slot positions are decided by the server
    FullReload,
    /// Rebuild one slot from the response body, no refetch
    RebuildSlot(usize),
}

pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn strategy_for(mutation: MutationKind) -> ReconcileStrategy {
        match mutation {
            MutationKind::Create | MutationKind::Delete => ReconcileStrategy::FullReload,
            MutationKind::Update { section } => ReconcileStrategy::RebuildSlot(section),
        }
    }

    /// Applies the strategy chosen for `mutation` and returns it
    pub async fn reconcile<S: OverrideStore + ?Sized>(
        state: &mut OverrideState,
        store: &S,
        mutation: MutationKind,
        response: Option<OverrideRecord>,
    ) -> Result<ReconcileStrategy, OverrideError> {
        let strategy = Self::strategy_for(mutation);
        debug!("reconciling {:?} with {:?}", mutation, strategy);

        match strategy {
            ReconcileStrategy::FullReload => Self::full_reload(state, store).await?,
            ReconcileStrategy::RebuildSlot(index) => {
                let record = response.ok_or_else(|| {
                    OverrideError::ReconciliationFailure(
                        "update response carried no override".to_string(),
                    )
                })?;
                state.list.rebuild_slot(index, record)?;
                state.session.release();
            }
        }
        Ok(strategy)
    }

    /// Refetches the current page. The lock, every transient handle and the
    /// placeholder are cleared whatever the outcome; a failed fetch keeps the
    /// last good list.
    pub async fn full_reload<S: OverrideStore + ?Sized>(
        state: &mut OverrideState,
        store: &S,
    ) -> Result<(), OverrideError> {
        let result = Self::fetch(state, store).await;

        state.session.release();
        state.list.remove_placeholder();

        let page = result?;
        state.list.load(&page)?;
        info!(
            "override list reloaded: page {} of {}, {} sections",
            page.info.page + 1,
            page.info.total_pages.max(1),
            state.list.len()
        );
        Ok(())
    }

    /// Fetches the page in the query, stepping back once to the last page
    /// when the current one no longer exists (e.g. after deleting its only row)
    async fn fetch<S: OverrideStore + ?Sized>(
        state: &mut OverrideState,
        store: &S,
    ) -> Result<OverridePage, OverrideError> {
        let page = store
            .list_overrides(&state.context.project, &state.context.query)
            .await
            .map_err(OverrideError::from_store)?;

        let last_page = page.info.total_pages.saturating_sub(1);
        if page.content.is_empty() && page.info.total_pages > 0 && state.context.query.page > last_page {
            state.context.query.page = last_page;
            return store
                .list_overrides(&state.context.project, &state.context.query)
                .await
                .map_err(OverrideError::from_store);
        }
        Ok(page)
    }
}
