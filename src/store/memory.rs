use itertools::Itertools;
use log::{debug, info};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};

use crate::error::StoreError;
use crate::model::{
    generate_id, now_rfc3339, CreateOverrideRequest, EntityGitDetails, GitSaveRequest, Id, OverridePage,
    OverrideQuery, OverrideRecord, OverrideScope, ProjectScope, StoreType,
};
use crate::store::traits::{OverrideStore, StoreResult};

/// One call received by the in-memory store, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Create,
    CreateRemote,
    Update(Id),
    UpdateRemote(Id),
    Delete(Id),
}

impl StoreCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, StoreCall::List)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FileKey {
    repo_name: String,
    branch: String,
    file_path: String,
}

impl FileKey {
    fn new(repo_name: &str, branch: &str, file_path: &str) -> Self {
        Self {
            repo_name: repo_name.to_string(),
            branch: branch.to_string(),
            file_path: file_path.to_string(),
        }
    }
}

/// Latest committed content of a git-backed override file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitFile {
    pub content: String,
    /// SHA-256 of the content
    pub object_id: String,
    pub commit_id: String,
    pub parent_commit_id: Option<String>,
    pub message: String,
}

impl GitFile {
    fn commit(content: String, parent_commit_id: Option<String>, branch: &str, message: &str) -> Self {
        use sha2::{Digest, Sha256};

        let object_id = hex::encode(Sha256::digest(content.as_bytes()));

        let mut hasher = Sha256::new();
        if let Some(parent) = &parent_commit_id {
            hasher.update(format!("parent:{}\n", parent));
        }
        hasher.update(format!("branch:{}\n", branch));
        hasher.update(format!("message:{}\n", message));
        hasher.update(format!("object:{}\n", object_id));
        let commit_id = hex::encode(hasher.finalize());

        Self {
            content,
            object_id,
            commit_id,
            parent_commit_id,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<OverrideRecord>,
    files: HashMap<FileKey, GitFile>,
    calls: Vec<StoreCall>,
    failures: VecDeque<StoreError>,
}

impl MemoryState {
    /// Logs the call and pops an injected failure, if any
    fn begin(&mut self, call: StoreCall) -> StoreResult<()> {
        debug!("override store call {:?}", call);
        self.calls.push(call);
        match self.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn position(&self, project: &ProjectScope, identifier: &str) -> StoreResult<usize> {
        self.records
            .iter()
            .position(|r| r.identifier == identifier && in_project(project, r))
            .ok_or_else(|| StoreError::NotFound(identifier.to_string()))
    }

    fn insert_new(
        &mut self,
        project: &ProjectScope,
        request: &CreateOverrideRequest,
    ) -> StoreResult<OverrideRecord> {
        let missing = request.scope.missing_fields(request.override_type);
        if !missing.is_empty() {
            return Err(StoreError::InvalidRequest(format!(
                "missing required fields: {}",
                missing.iter().map(|f| f.field_name()).join(", ")
            )));
        }

        let exists = self.records.iter().any(|r| {
            in_project(project, r)
                && r.override_type == request.override_type
                && r.scope == request.scope
        });
        if exists {
            return Err(StoreError::InvalidRequest(format!(
                "An override already exists for {}",
                request.scope.group_key()
            )));
        }

        let identifier = self.unused_identifier(&derive_identifier(&request.scope));
        let now = now_rfc3339();
        Ok(OverrideRecord {
            identifier,
            account_id: project.account_id.clone(),
            org_identifier: project.org_identifier.clone(),
            project_identifier: project.project_identifier.clone(),
            scope: request.scope.clone(),
            override_type: request.override_type,
            spec: request.spec.clone(),
            store_type: StoreType::Inline,
            connector_ref: None,
            entity_git_details: None,
            created_at: Some(now.clone()),
            last_modified_at: Some(now),
        })
    }

    /// `base`, or `base_2`, `base_3`... when scopes of different types or
    /// spellings map to the same identifier
    fn unused_identifier(&self, base: &str) -> Id {
        let taken = |candidate: &str| self.records.iter().any(|r| r.identifier == candidate);
        if !taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !taken(candidate.as_str()))
            .unwrap_or_else(generate_id)
    }

    /// Commits `record` to the file named by `git`, checking the caller's
    /// view of the file first
    fn commit_file(
        &mut self,
        record: &mut OverrideRecord,
        git: &GitSaveRequest,
        expect_existing: bool,
    ) -> StoreResult<()> {
        let source_branch = if git.is_new_branch {
            git.base_branch.clone().unwrap_or_default()
        } else {
            git.branch.clone()
        };
        let source = FileKey::new(&git.repo_name, &source_branch, &git.file_path);
        let current = self.files.get(&source).cloned();

        if let Some(file) = &current {
            let known = if expect_existing {
                git.last_object_id.as_deref() == Some(file.object_id.as_str())
            } else {
                false
            };
            let resolved = git.resolved_conflict_commit_id.as_deref() == Some(file.commit_id.as_str());
            if !known && !resolved {
                return Err(StoreError::Conflict {
                    message: if expect_existing {
                        format!("File '{}' was modified since it was loaded", git.file_path)
                    } else {
                        format!("File '{}' already exists", git.file_path)
                    },
                    current_commit_id: Some(file.commit_id.clone()),
                });
            }
        }

        record.store_type = StoreType::Remote;
        record.connector_ref = Some(git.connector_ref.clone());
        record.entity_git_details = None;
        let content = serde_json::to_string_pretty(&*record).map_err(|e| StoreError::Server {
            status: 500,
            message: e.to_string(),
        })?;

        let file = GitFile::commit(
            content,
            current.map(|f| f.commit_id),
            &git.branch,
            &git.commit_msg,
        );
        record.entity_git_details = Some(EntityGitDetails {
            object_id: Some(file.object_id.clone()),
            branch: Some(git.branch.clone()),
            repo_name: Some(git.repo_name.clone()),
            file_path: Some(git.file_path.clone()),
            commit_id: Some(file.commit_id.clone()),
        });
        info!(
            "committed {} to {}@{} ({})",
            git.file_path, git.repo_name, git.branch, file.commit_id
        );
        self.files
            .insert(FileKey::new(&git.repo_name, &git.branch, &git.file_path), file);
        Ok(())
    }
}

fn in_project(project: &ProjectScope, record: &OverrideRecord) -> bool {
    project.contains(
        &record.account_id,
        record.org_identifier.as_deref(),
        record.project_identifier.as_deref(),
    )
}

/// `env_infra_service` with anything but ASCII alphanumerics mapped to `_`
fn derive_identifier(scope: &OverrideScope) -> Id {
    [
        &scope.environment_ref,
        &scope.infra_identifier,
        &scope.service_ref,
    ]
    .iter()
    .filter_map(|part| part.as_deref())
    .map(|part| {
        part.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect::<String>()
    })
    .join("_")
}

fn validate_git(git: &GitSaveRequest) -> StoreResult<()> {
    let missing: Vec<&str> = [
        ("connectorRef", &git.connector_ref),
        ("repoName", &git.repo_name),
        ("branch", &git.branch),
        ("filePath", &git.file_path),
        ("commitMsg", &git.commit_msg),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::InvalidRequest(format!(
            "missing git fields: {}",
            missing.join(", ")
        )))
    }
}

/// Reference override backend kept entirely in memory, with a git-like file
/// table for remote records. Used by the demo server and the tests.
#[derive(Debug, Default)]
pub struct InMemoryOverrideStore {
    state: RwLock<MemoryState>,
}

impl InMemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<OverrideRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Seeds a record as-is, bypassing validation and call recording
    pub fn insert(&self, record: OverrideRecord) {
        self.state.write().records.push(record);
    }

    pub fn records(&self) -> Vec<OverrideRecord> {
        self.state.read().records.clone()
    }

    pub fn record(&self, identifier: &str) -> Option<OverrideRecord> {
        self.state
            .read()
            .records
            .iter()
            .find(|r| r.identifier == identifier)
            .cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.read().calls.clone()
    }

    pub fn mutation_calls(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.state.write().calls.clear();
    }

    /// Makes the next call fail with `err`
    pub fn fail_next(&self, err: StoreError) {
        self.state.write().failures.push_back(err);
    }

    pub fn git_file(&self, repo_name: &str, branch: &str, file_path: &str) -> Option<GitFile> {
        self.state
            .read()
            .files
            .get(&FileKey::new(repo_name, branch, file_path))
            .cloned()
    }

    /// Commits a change to a file outside of this store's API, as another
    /// git client would. Returns the new commit id.
    pub fn push_external_commit(
        &self,
        repo_name: &str,
        branch: &str,
        file_path: &str,
        message: &str,
    ) -> Option<String> {
        let mut state = self.state.write();
        let key = FileKey::new(repo_name, branch, file_path);
        let current = state.files.get(&key)?.clone();
        let content = format!("{}\n# {}\n", current.content, message);
        let file = GitFile::commit(content, Some(current.commit_id), branch, message);
        let commit_id = file.commit_id.clone();
        state.files.insert(key, file);
        Some(commit_id)
    }
}

#[async_trait::async_trait]
impl OverrideStore for InMemoryOverrideStore {
    async fn list_overrides(
        &self,
        project: &ProjectScope,
        query: &OverrideQuery,
    ) -> StoreResult<OverridePage> {
        let mut state = self.state.write();
        state.begin(StoreCall::List)?;

        if query.size == 0 {
            return Err(StoreError::InvalidRequest(
                "page size must be positive".to_string(),
            ));
        }

        let matching: Vec<OverrideRecord> = state
            .records
            .iter()
            .filter(|r| in_project(project, r))
            .filter(|r| r.override_type == query.override_type)
            .filter(|r| query.filter.matches(r))
            .cloned()
            .collect();

        Ok(OverridePage::slice(matching, query.page, query.size))
    }

    async fn create_override(
        &self,
        project: &ProjectScope,
        request: &CreateOverrideRequest,
    ) -> StoreResult<OverrideRecord> {
        let mut state = self.state.write();
        state.begin(StoreCall::Create)?;

        let record = state.insert_new(project, request)?;
        info!("created override {}", record.identifier);
        state.records.push(record.clone());
        Ok(record)
    }

    async fn create_remote_override(
        &self,
        project: &ProjectScope,
        request: &CreateOverrideRequest,
        git: &GitSaveRequest,
    ) -> StoreResult<OverrideRecord> {
        let mut state = self.state.write();
        state.begin(StoreCall::CreateRemote)?;
        validate_git(git)?;

        let mut record = state.insert_new(project, request)?;
        state.commit_file(&mut record, git, false)?;
        info!("created remote override {}", record.identifier);
        state.records.push(record.clone());
        Ok(record)
    }

    async fn update_override(
        &self,
        project: &ProjectScope,
        record: &OverrideRecord,
    ) -> StoreResult<OverrideRecord> {
        let mut state = self.state.write();
        state.begin(StoreCall::Update(record.identifier.clone()))?;

        let index = state.position(project, &record.identifier)?;
        let stored = &state.records[index];
        if stored.is_remote() {
            return Err(StoreError::InvalidRequest(format!(
                "Override '{}' is stored in git; update it with a commit",
                record.identifier
            )));
        }
        if stored.override_type != record.override_type || stored.scope != record.scope {
            return Err(StoreError::InvalidRequest(
                "override type and scope cannot change".to_string(),
            ));
        }

        let updated = OverrideRecord {
            spec: record.spec.clone(),
            last_modified_at: Some(now_rfc3339()),
            ..stored.clone()
        };
        state.records[index] = updated.clone();
        info!("updated override {}", updated.identifier);
        Ok(updated)
    }

    async fn update_remote_override(
        &self,
        project: &ProjectScope,
        record: &OverrideRecord,
        git: &GitSaveRequest,
    ) -> StoreResult<OverrideRecord> {
        let mut state = self.state.write();
        state.begin(StoreCall::UpdateRemote(record.identifier.clone()))?;
        validate_git(git)?;

        let index = state.position(project, &record.identifier)?;
        let mut updated = OverrideRecord {
            spec: record.spec.clone(),
            last_modified_at: Some(now_rfc3339()),
            ..state.records[index].clone()
        };
        state.commit_file(&mut updated, git, true)?;
        state.records[index] = updated.clone();
        info!("updated remote override {}", updated.identifier);
        Ok(updated)
    }

    async fn delete_override(
        &self,
        project: &ProjectScope,
        identifier: &str,
        scope: &OverrideScope,
    ) -> StoreResult<()> {
        let mut state = self.state.write();
        state.begin(StoreCall::Delete(identifier.to_string()))?;

        let index = state.position(project, identifier)?;
        if &state.records[index].scope != scope {
            return Err(StoreError::InvalidRequest(format!(
                "Override '{}' does not belong to {}",
                identifier,
                scope.group_key()
            )));
        }
        state.records.remove(index);
        info!("deleted override {}", identifier);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OverrideFilter, OverrideSpec, OverrideType, Variable};

    fn project() -> ProjectScope {
        ProjectScope::project("acc", "org", "proj")
    }

    fn request(env: &str, service: &str) -> CreateOverrideRequest {
        CreateOverrideRequest {
            override_type: OverrideType::EnvService,
            scope: OverrideScope::environment(env).with_service(service),
            org_identifier: Some("org".to_string()),
            project_identifier: Some("proj".to_string()),
            spec: OverrideSpec {
                variables: vec![Variable::string("replicas", "2")],
                ..Default::default()
            },
        }
    }

    fn git(branch: &str) -> GitSaveRequest {
        GitSaveRequest {
            connector_ref: "github".to_string(),
            repo_name: "cfg".to_string(),
            branch: branch.to_string(),
            file_path: ".harness/overrides/prod.yaml".to_string(),
            commit_msg: "save overrides".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_list_with_filter() {
        let store = InMemoryOverrideStore::new();
        store.create_override(&project(), &request("prod", "api")).await.unwrap();
        store.create_override(&project(), &request("qa", "api")).await.unwrap();
        store.create_override(&project(), &request("qa", "web")).await.unwrap();

        let mut query = OverrideQuery::new(OverrideType::EnvService, 2);
        let page = store.list_overrides(&project(), &query).await.unwrap();
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.info.total_pages, 2);
        assert_eq!(page.info.total_elements, 3);
        assert_eq!(page.content[0].identifier, "prod_api");

        query.filter = OverrideFilter {
            environment_refs: vec!["qa".to_string()],
            ..Default::default()
        };
        let page = store.list_overrides(&project(), &query).await.unwrap();
        assert_eq!(page.info.total_elements, 2);

        let other = ProjectScope::project("acc", "org", "other");
        let page = store.list_overrides(&other, &query).await.unwrap();
        assert!(page.content.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_scope_is_rejected() {
        let store = InMemoryOverrideStore::new();
        store.create_override(&project(), &request("prod", "api")).await.unwrap();
        let err = store
            .create_override(&project(), &request("prod", "api"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_remote_update_detects_stale_object_id() {
        let store = InMemoryOverrideStore::new();
        let created = store
            .create_remote_override(&project(), &request("prod", "api"), &git("main"))
            .await
            .unwrap();
        let details = created.entity_git_details.clone().unwrap();
        let file = store
            .git_file("cfg", "main", ".harness/overrides/prod.yaml")
            .unwrap();
        assert_eq!(details.object_id.as_deref(), Some(file.object_id.as_str()));

        let external = store
            .push_external_commit("cfg", "main", ".harness/overrides/prod.yaml", "hotfix")
            .unwrap();

        let mut stale = git("main");
        stale.last_object_id = details.object_id.clone();
        stale.last_commit_id = details.commit_id.clone();
        let err = store
            .update_remote_override(&project(), &created, &stale)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                message: "File '.harness/overrides/prod.yaml' was modified since it was loaded"
                    .to_string(),
                current_commit_id: Some(external.clone()),
            }
        );

        stale.resolved_conflict_commit_id = Some(external.clone());
        let updated = store
            .update_remote_override(&project(), &created, &stale)
            .await
            .unwrap();
        let file = store
            .git_file("cfg", "main", ".harness/overrides/prod.yaml")
            .unwrap();
        assert_eq!(file.parent_commit_id.as_deref(), Some(external.as_str()));
        assert_eq!(
            updated.entity_git_details.unwrap().commit_id,
            Some(file.commit_id)
        );
    }

    #[tokio::test]
    async fn test_new_branch_copies_from_base() {
        let store = InMemoryOverrideStore::new();
        let created = store
            .create_remote_override(&project(), &request("prod", "api"), &git("main"))
            .await
            .unwrap();

        let mut feature = git("feature");
        feature.is_new_branch = true;
        feature.base_branch = Some("main".to_string());
        feature.last_object_id = created.store_metadata().last_object_id;
        let updated = store
            .update_remote_override(&project(), &created, &feature)
            .await
            .unwrap();

        assert_eq!(
            updated.entity_git_details.unwrap().branch.as_deref(),
            Some("feature")
        );
        assert!(store.git_file("cfg", "feature", ".harness/overrides/prod.yaml").is_some());
        assert!(store.git_file("cfg", "main", ".harness/overrides/prod.yaml").is_some());
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let store = InMemoryOverrideStore::new();
        store.fail_next(StoreError::Transport("down".to_string()));
        let query = OverrideQuery::new(OverrideType::EnvService, 10);
        assert!(store.list_overrides(&project(), &query).await.is_err());
        assert!(store.list_overrides(&project(), &query).await.is_ok());
        assert_eq!(store.calls(), vec![StoreCall::List, StoreCall::List]);
    }

    #[tokio::test]
    async fn test_colliding_scopes_get_distinct_identifiers() {
        let store = InMemoryOverrideStore::new();
        let mut env_request = request("qa-1", "api");
        env_request.override_type = OverrideType::EnvGlobal;
        env_request.scope = OverrideScope::environment("qa-1");
        let dashed = store.create_override(&project(), &env_request).await.unwrap();
        env_request.scope = OverrideScope::environment("qa_1");
        let underscored = store.create_override(&project(), &env_request).await.unwrap();
        assert_eq!(dashed.identifier, "qa_1");
        assert_eq!(underscored.identifier, "qa_1_2");

        let service = store.create_override(&project(), &request("prod", "api")).await.unwrap();
        let infra_request = CreateOverrideRequest {
            override_type: OverrideType::InfraGlobal,
            scope: OverrideScope::environment("prod").with_infra("api"),
            ..request("prod", "api")
        };
        let infra = store.create_override(&project(), &infra_request).await.unwrap();
        assert_eq!(service.identifier, "prod_api");
        assert_eq!(infra.identifier, "prod_api_2");

        let ids: Vec<Id> = store.records().into_iter().map(|r| r.identifier).collect();
        assert_eq!(ids.iter().unique().count(), 4);

        let mut edited = infra.clone();
        edited.spec.variables.push(Variable::string("zone", "b"));
        let updated = store.update_override(&project(), &edited).await.unwrap();
        assert_eq!(updated.scope, infra.scope);
        assert_eq!(store.record("prod_api").unwrap().spec.variables.len(), 1);

        store
            .delete_override(&project(), &infra.identifier, &infra.scope)
            .await
            .unwrap();
        store
            .delete_override(&project(), &underscored.identifier, &underscored.scope)
            .await
            .unwrap();
        let remaining: Vec<Id> = store.records().into_iter().map(|r| r.identifier).collect();
        assert_eq!(remaining, vec!["qa_1", "prod_api"]);
    }

    #[tokio::test]
    async fn test_delete_checks_scope() {
        let store = InMemoryOverrideStore::new();
        let created = store.create_override(&project(), &request("prod", "api")).await.unwrap();

        let wrong = OverrideScope::environment("qa").with_service("api");
        assert!(store
            .delete_override(&project(), &created.identifier, &wrong)
            .await
            .is_err());
        store
            .delete_override(&project(), &created.identifier, &created.scope)
            .await
            .unwrap();
        assert!(store.records().is_empty());
        assert_eq!(
            store
                .delete_override(&project(), &created.identifier, &created.scope)
                .await
                .unwrap_err(),
            StoreError::NotFound("prod_api".to_string())
        );
    }
}
