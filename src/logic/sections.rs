use log::{debug, info};

use crate::error::OverrideError;
use crate::logic::payload::{create_request, spec_from_rows, update_record};
use crate::logic::persistence::{PendingRemoteSave, PersistenceGateway, SaveRequest};
use crate::logic::reconcile::{MutationKind, ReconcileStrategy, ReconciliationEngine};
use crate::logic::state::{NoticeLevel, OverrideState};
use crate::logic::validate::validate_scope;
use crate::model::{
    GitCoordinates, GitSaveChoices, Id, OverrideRecord, OverrideScope, OverrideSpec, SectionRef,
    SectionViewModel, StoreMetadata,
};
use crate::store::traits::OverrideStore;

/// Where a new section is persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    Inline,
    Remote(GitCoordinates),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The server accepted the save and the list caught up
    Saved {
        record: OverrideRecord,
        strategy: ReconcileStrategy,
    },
    /// A git save dialog must collect branch and commit message first
    AwaitingGitDetails(PendingRemoteSave),
}

/// Open delete-confirmation dialog for one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub section: usize,
    pub identifier: Id,
    pub scope: OverrideScope,
}

fn section_at(state: &OverrideState, section: SectionRef) -> Result<&SectionViewModel, OverrideError> {
    state
        .list
        .section(section)
        .ok_or(OverrideError::SectionNotFound(section))
}

fn record_at(state: &OverrideState, index: usize) -> Result<OverrideRecord, OverrideError> {
    let section = SectionRef::Existing(index);
    section_at(state, section)?
        .record
        .clone()
        .ok_or(OverrideError::SectionNotFound(section))
}

/// Section-level state machine: create, update, delete and discard, all
/// under the single edit lock
pub struct SectionEditor;

impl SectionEditor {
    /// Opens the placeholder section with one blank row and takes the lock
    /// for it
    pub fn start_new_section(state: &mut OverrideState) -> Result<(), OverrideError> {
        state.run(|state| {
            state.ensure_can_edit()?;
            state.session.acquire(SectionRef::New)?;

            if state.list.placeholder().is_none() {
                let scope = state.session.selector().cloned().unwrap_or_default();
                state
                    .list
                    .open_placeholder(SectionViewModel::placeholder(scope.clone()));
                state.session.set_selector(scope);
                info!("started new override section");
            }
            Ok(())
        })
    }

    /// Scope-selector input of the placeholder section
    pub fn select_scope(state: &mut OverrideState, scope: OverrideScope) -> Result<(), OverrideError> {
        state.run(|state| {
            section_at(state, SectionRef::New)?;
            state.session.acquire(SectionRef::New)?;

            if let Some(placeholder) = state.list.section_mut(SectionRef::New) {
                placeholder.group_key = scope.group_key();
                placeholder.scope = scope.clone();
            }
            debug!("new section scope set to {}", scope.group_key());
            state.session.set_selector(scope);
            Ok(())
        })
    }

    /// Creates an override for `scope`. Inline targets are saved and the list
    /// reloaded; remote targets come back as a pending git save.
    pub async fn create_section<S: OverrideStore + ?Sized>(
        state: &mut OverrideState,
        store: &S,
        scope: OverrideScope,
        initial_spec: OverrideSpec,
        target: StoreTarget,
    ) -> Result<SaveOutcome, OverrideError> {
        let request = state.run(|state| {
            state.ensure_can_edit()?;
            state.session.acquire(SectionRef::New)?;
            validate_scope(state.context.override_type(), &scope)?;
            Ok(create_request(&state.context, &scope, initial_spec))
        })?;

        match target {
            StoreTarget::Inline => {
                let result =
                    PersistenceGateway::create(store, &state.context.project, &request).await;
                let record = result.map_err(|e| state.report(e))?;
                Self::finish_save(state, store, MutationKind::Create, record).await
            }
            StoreTarget::Remote(coordinates) => state.run(|_| {
                PersistenceGateway::prepare_remote_save(
                    SaveRequest::Create(request),
                    coordinates,
                    StoreMetadata::default(),
                )
                .map(SaveOutcome::AwaitingGitDetails)
            }),
        }
    }

    /// Saves the placeholder section with the scope picked in the selector
    pub async fn create_new_section<S: OverrideStore + ?Sized>(
        state: &mut OverrideState,
        store: &S,
        target: StoreTarget,
    ) -> Result<SaveOutcome, OverrideError> {
        let (scope, spec) = state.run(|state| {
            let placeholder = section_at(state, SectionRef::New)?;
            let scope = state
                .session
                .selector()
                .cloned()
                .unwrap_or_else(|| placeholder.scope.clone());
            Ok((scope, spec_from_rows(&placeholder.rows)?))
        })?;

        Self::create_section(state, store, scope, spec, target).await
    }

    /// Sends the section's full row list as its new spec. Inline records are
    /// rebuilt in place from the response; remote records come back as a
    /// pending git save.
    pub async fn update_section<S: OverrideStore + ?Sized>(
        state: &mut OverrideState,
        store: &S,
        index: usize,
    ) -> Result<SaveOutcome, OverrideError> {
        let section = SectionRef::Existing(index);
        let (prior, updated) = state.run(|state| {
            state.ensure_can_edit()?;
            let prior = record_at(state, index)?;
            state.session.acquire(section)?;
            let spec = spec_from_rows(&section_at(state, section)?.rows)?;
            let updated = update_record(&prior, spec);
            Ok((prior, updated))
        })?;

        if prior.is_remote() {
            return state.run(|_| {
                PersistenceGateway::prepare_remote_save(
                    SaveRequest::Update {
                        section: index,
                        record: updated,
                    },
                    prior.git_coordinates(),
                    prior.store_metadata(),
                )
                .map(SaveOutcome::AwaitingGitDetails)
            });
        }

        let result = PersistenceGateway::update(store, &state.context.project, &updated).await;
        let record = result.map_err(|e| state.report(e))?;
        Self::finish_save(state, store, MutationKind::Update { section: index }, record).await
    }

    /// Completes a pending git save with the dialog's choices
    pub async fn confirm_remote_save<S: OverrideStore + ?Sized>(
        state: &mut OverrideState,
        store: &S,
        pending: &PendingRemoteSave,
        choices: &GitSaveChoices,
    ) -> Result<SaveOutcome, OverrideError> {
        state.run(|state| {
            state.ensure_can_edit()?;
            state.session.acquire(pending.operation.target())
        })?;

        let result = PersistenceGateway::confirm_remote_save(
            store,
            &state.context.project,
            pending,
            choices,
        )
        .await;
        let record = result.map_err(|e| state.report(e))?;
        Self::finish_save(state, store, pending.operation.mutation(), record).await
    }

    /// Opens the delete confirmation; the lock is taken here, before the
    /// destructive action is offered
    pub fn request_delete(
        state: &mut OverrideState,
        index: usize,
    ) -> Result<DeleteConfirmation, OverrideError> {
        state.run(|state| {
            state.ensure_can_edit()?;
            let record = record_at(state, index)?;
            state.session.acquire(SectionRef::Existing(index))?;
            debug!("delete of {} awaiting confirmation", record.identifier);
            Ok(DeleteConfirmation {
                section: index,
                identifier: record.identifier,
                scope: record.scope,
            })
        })
    }

    pub async fn confirm_delete<S: OverrideStore + ?Sized>(
        state: &mut OverrideState,
        store: &S,
        confirmation: &DeleteConfirmation,
    ) -> Result<(), OverrideError> {
        state.run(|state| {
            state.ensure_can_edit()?;
            state
                .session
                .acquire(SectionRef::Existing(confirmation.section))
        })?;

        let result = PersistenceGateway::delete(
            store,
            &state.context.project,
            &confirmation.identifier,
            &confirmation.scope,
        )
        .await;
        result.map_err(|e| state.report(e))?;

        let result =
            ReconciliationEngine::reconcile(state, store, MutationKind::Delete, None).await;
        result.map_err(|e| state.report(e))?;

        info!("deleted override {}", confirmation.identifier);
        state.notify(
            NoticeLevel::Success,
            format!("Override '{}' deleted", confirmation.identifier),
        );
        Ok(())
    }

    /// Closes the dialog. The lock stays with the section when it still has
    /// pending row edits.
    pub fn cancel_delete(state: &mut OverrideState, confirmation: &DeleteConfirmation) {
        let section = SectionRef::Existing(confirmation.section);
        if !state.session.lock().is_held_by(section) {
            return;
        }
        let pending = state
            .list
            .section(section)
            .map_or(false, |s| s.is_edit || s.has_dirty_rows());
        if !pending && state.session.rows_deleted(section) == 0 {
            state.session.release();
        }
    }

    /// Drops every uncommitted change of `section`: the placeholder is
    /// removed, an existing section is rebuilt from its last server record
    pub fn discard_section(state: &mut OverrideState, section: SectionRef) -> Result<(), OverrideError> {
        state.run(|state| Self::revert_section(state, section))
    }

    pub(crate) fn revert_section(
        state: &mut OverrideState,
        section: SectionRef,
    ) -> Result<(), OverrideError> {
        if let Some(held) = state.session.holder() {
            if held != section {
                return Err(OverrideError::ExclusivityViolation {
                    held,
                    requested: section,
                });
            }
        }

        match section {
            SectionRef::New => {
                state.list.remove_placeholder();
            }
            SectionRef::Existing(index) => {
                let record = record_at(state, index)?;
                state.list.rebuild_slot(index, record)?;
            }
        }
        state.session.release();
        debug!("discarded {}", section);
        Ok(())
    }

    async fn finish_save<S: OverrideStore + ?Sized>(
        state: &mut OverrideState,
        store: &S,
        mutation: MutationKind,
        record: OverrideRecord,
    ) -> Result<SaveOutcome, OverrideError> {
        let result =
            ReconciliationEngine::reconcile(state, store, mutation, Some(record.clone())).await;
        let strategy = result.map_err(|e| state.report(e))?;

        let verb = match mutation {
            MutationKind::Create => "created",
            _ => "saved",
        };
        state.notify(
            NoticeLevel::Success,
            format!("Override '{}' {}", record.identifier, verb),
        );
        Ok(SaveOutcome::Saved { record, strategy })
    }
}
