use crate::error::StoreError;
use crate::model::{
    CreateOverrideRequest, GitSaveRequest, OverridePage, OverrideQuery, OverrideRecord,
    OverrideScope, ProjectScope,
};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Server side of the override editor: list plus the five mutating calls
#[async_trait::async_trait]
pub trait OverrideStore: Send + Sync {
    /// One page of records of `query.override_type` matching `query.filter`
    async fn list_overrides(
        &self,
        project: &ProjectScope,
        query: &OverrideQuery,
    ) -> StoreResult<OverridePage>;

    async fn create_override(
        &self,
        project: &ProjectScope,
        request: &CreateOverrideRequest,
    ) -> StoreResult<OverrideRecord>;

    /// Create whose content is committed to a git-backed file
    async fn create_remote_override(
        &self,
        project: &ProjectScope,
        request: &CreateOverrideRequest,
        git: &GitSaveRequest,
    ) -> StoreResult<OverrideRecord>;

    /// Replaces the stored record with `record` (spec included)
    async fn update_override(
        &self,
        project: &ProjectScope,
        record: &OverrideRecord,
    ) -> StoreResult<OverrideRecord>;

    /// Update of a remote record; `git.last_object_id` is checked against
    /// the current file to detect concurrent changes
    async fn update_remote_override(
        &self,
        project: &ProjectScope,
        record: &OverrideRecord,
        git: &GitSaveRequest,
    ) -> StoreResult<OverrideRecord>;

    async fn delete_override(
        &self,
        project: &ProjectScope,
        identifier: &str,
        scope: &OverrideScope,
    ) -> StoreResult<()>;
}
