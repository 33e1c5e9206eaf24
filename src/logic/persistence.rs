use log::{debug, info};

use crate::error::OverrideError;
use crate::logic::reconcile::MutationKind;
use crate::logic::validate::{validate_git_choices, validate_git_coordinates};
use crate::model::{
    CreateOverrideRequest, GitCoordinates, GitSaveChoices, GitSaveRequest, Id, OverrideRecord,
    OverrideScope, OverrideType, ProjectScope, SectionRef, StoreMetadata,
};
use crate::store::traits::OverrideStore;

/// A save waiting to be sent: a create payload or a full updated record
#[derive(Debug, Clone, PartialEq)]
pub enum SaveRequest {
    Create(CreateOverrideRequest),
    Update {
        section: usize,
        record: OverrideRecord,
    },
}

impl SaveRequest {
    /// Section whose lock the save runs under
    pub fn target(&self) -> SectionRef {
        match self {
            SaveRequest::Create(_) => SectionRef::New,
            SaveRequest::Update { section, .. } => SectionRef::Existing(*section),
        }
    }

    pub fn mutation(&self) -> MutationKind {
        match self {
            SaveRequest::Create(_) => MutationKind::Create,
            SaveRequest::Update { section, .. } => MutationKind::Update { section: *section },
        }
    }
}

/// Identity of the resource a git save dialog is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentity {
    pub identifier: Option<Id>,
    pub override_type: OverrideType,
    pub scope: OverrideScope,
}

/// First phase of a git-backed save: everything the save dialog needs to
/// show. Hand it back with the user's choices to complete the save.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRemoteSave {
    pub operation: SaveRequest,
    pub resource_identity: ResourceIdentity,
    pub git_details: GitCoordinates,
    pub store_metadata: StoreMetadata,
}

/// Create/update/delete calls, inline or through a git commit. Every store
/// failure leaves here already formatted for the user.
pub struct PersistenceGateway;

impl PersistenceGateway {
    pub async fn create<S: OverrideStore + ?Sized>(
        store: &S,
        project: &ProjectScope,
        request: &CreateOverrideRequest,
    ) -> Result<OverrideRecord, OverrideError> {
        debug!("creating override for {}", request.scope.group_key());
        store
            .create_override(project, request)
            .await
            .map_err(OverrideError::from_store)
    }

    pub async fn update<S: OverrideStore + ?Sized>(
        store: &S,
        project: &ProjectScope,
        record: &OverrideRecord,
    ) -> Result<OverrideRecord, OverrideError> {
        debug!("updating override {}", record.identifier);
        store
            .update_override(project, record)
            .await
            .map_err(OverrideError::from_store)
    }

    pub async fn delete<S: OverrideStore + ?Sized>(
        store: &S,
        project: &ProjectScope,
        identifier: &str,
        scope: &OverrideScope,
    ) -> Result<(), OverrideError> {
        debug!("deleting override {}", identifier);
        store
            .delete_override(project, identifier, scope)
            .await
            .map_err(OverrideError::from_store)
    }

    /// Checks the git coordinates and builds the dialog descriptor. Nothing
    /// is sent.
    pub fn prepare_remote_save(
        operation: SaveRequest,
        git_details: GitCoordinates,
        store_metadata: StoreMetadata,
    ) -> Result<PendingRemoteSave, OverrideError> {
        validate_git_coordinates(&git_details)?;

        let resource_identity = match &operation {
            SaveRequest::Create(request) => ResourceIdentity {
                identifier: None,
                override_type: request.override_type,
                scope: request.scope.clone(),
            },
            SaveRequest::Update { record, .. } => ResourceIdentity {
                identifier: Some(record.identifier.clone()),
                override_type: record.override_type,
                scope: record.scope.clone(),
            },
        };

        Ok(PendingRemoteSave {
            operation,
            resource_identity,
            git_details,
            store_metadata,
        })
    }

    /// Second phase: validates the dialog choices, then commits
    pub async fn confirm_remote_save<S: OverrideStore + ?Sized>(
        store: &S,
        project: &ProjectScope,
        pending: &PendingRemoteSave,
        choices: &GitSaveChoices,
    ) -> Result<OverrideRecord, OverrideError> {
        validate_git_choices(choices)?;

        let result = match &pending.operation {
            SaveRequest::Create(request) => {
                let git = GitSaveRequest::new(
                    &pending.git_details,
                    choices,
                    &StoreMetadata::default(),
                );
                store.create_remote_override(project, request, &git).await
            }
            SaveRequest::Update { record, .. } => {
                let git = GitSaveRequest::new(
                    &pending.git_details,
                    choices,
                    &pending.store_metadata,
                );
                store.update_remote_override(project, record, &git).await
            }
        };

        let record = result.map_err(OverrideError::from_store)?;
        info!(
            "committed override {} to {} ({})",
            record.identifier, pending.git_details.repo_name, choices.branch
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OverrideSpec;
    use crate::store::{InMemoryOverrideStore, StoreCall};

    fn request() -> CreateOverrideRequest {
        CreateOverrideRequest {
            override_type: OverrideType::EnvGlobal,
            scope: OverrideScope::environment("prod"),
            org_identifier: Some("org".to_string()),
            project_identifier: Some("proj".to_string()),
            spec: OverrideSpec::default(),
        }
    }

    #[test]
    fn test_prepare_rejects_incomplete_coordinates() {
        let err = PersistenceGateway::prepare_remote_save(
            SaveRequest::Create(request()),
            GitCoordinates::new("github", "", "main", "prod.yaml"),
            StoreMetadata::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            OverrideError::GitDetailsIncomplete {
                missing: vec!["repoName"]
            }
        );
    }

    #[tokio::test]
    async fn test_confirm_with_empty_commit_message_sends_nothing() {
        let store = InMemoryOverrideStore::new();
        let project = ProjectScope::project("acc", "org", "proj");
        let pending = PersistenceGateway::prepare_remote_save(
            SaveRequest::Create(request()),
            GitCoordinates::new("github", "cfg", "main", "prod.yaml"),
            StoreMetadata::default(),
        )
        .unwrap();
        assert_eq!(pending.resource_identity.identifier, None);
        assert_eq!(pending.operation.target(), SectionRef::New);

        let err = PersistenceGateway::confirm_remote_save(
            &store,
            &project,
            &pending,
            &GitSaveChoices::commit("main", ""),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OverrideError::GitDetailsIncomplete { .. }));
        assert!(store.calls().is_empty());

        let record = PersistenceGateway::confirm_remote_save(
            &store,
            &project,
            &pending,
            &GitSaveChoices::commit("main", "add prod overrides"),
        )
        .await
        .unwrap();
        assert!(record.is_remote());
        assert_eq!(store.calls(), vec![StoreCall::CreateRemote]);
    }
}
