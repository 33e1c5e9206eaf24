use serde::{Deserialize, Serialize};

use crate::model::common::is_blank;

/// Where a remote record lives: connector, repository, branch and file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCoordinates {
    pub connector_ref: String,
    pub repo_name: String,
    pub branch: String,
    pub file_path: String,
}

impl GitCoordinates {
    pub fn new(connector_ref: &str, repo_name: &str, branch: &str, file_path: &str) -> Self {
        Self {
            connector_ref: connector_ref.to_string(),
            repo_name: repo_name.to_string(),
            branch: branch.to_string(),
            file_path: file_path.to_string(),
        }
    }

    /// Names of the coordinates left empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("connectorRef", &self.connector_ref),
            ("repoName", &self.repo_name),
            ("branch", &self.branch),
            ("filePath", &self.file_path),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Last-known object/commit ids of a remote file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit_id: Option<String>,
}

/// What the save dialog collects before a remote call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSaveChoices {
    pub branch: String,
    pub commit_msg: String,
    #[serde(default)]
    pub is_new_branch: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_conflict_commit_id: Option<String>,
}

impl GitSaveChoices {
    pub fn commit(branch: &str, commit_msg: &str) -> Self {
        Self {
            branch: branch.to_string(),
            commit_msg: commit_msg.to_string(),
            ..Default::default()
        }
    }

    pub fn on_new_branch(mut self, base_branch: &str) -> Self {
        self.is_new_branch = true;
        self.base_branch = Some(base_branch.to_string());
        self
    }

    pub fn resolving_conflict(mut self, commit_id: &str) -> Self {
        self.resolved_conflict_commit_id = Some(commit_id.to_string());
        self
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.branch.trim().is_empty() {
            missing.push("branch");
        }
        if self.commit_msg.trim().is_empty() {
            missing.push("commitMsg");
        }
        if self.is_new_branch && is_blank(self.base_branch.as_deref()) {
            missing.push("baseBranch");
        }
        missing
    }
}

/// Git parameters attached to a remote create/update call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSaveRequest {
    pub connector_ref: String,
    pub repo_name: String,
    pub branch: String,
    pub file_path: String,
    pub commit_msg: String,
    #[serde(default)]
    pub is_new_branch: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_conflict_commit_id: Option<String>,
}

impl GitSaveRequest {
    /// Combines stored coordinates with the dialog's choices; the chosen branch wins
    pub fn new(
        coordinates: &GitCoordinates,
        choices: &GitSaveChoices,
        metadata: &StoreMetadata,
    ) -> Self {
        Self {
            connector_ref: coordinates.connector_ref.clone(),
            repo_name: coordinates.repo_name.clone(),
            branch: choices.branch.clone(),
            file_path: coordinates.file_path.clone(),
            commit_msg: choices.commit_msg.clone(),
            is_new_branch: choices.is_new_branch,
            base_branch: choices.base_branch.clone(),
            last_object_id: metadata.last_object_id.clone(),
            last_commit_id: metadata.last_commit_id.clone(),
            resolved_conflict_commit_id: choices.resolved_conflict_commit_id.clone(),
        }
    }
}
