use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::common::is_blank;
use crate::model::{GitCoordinates, Id, OverrideSpec, StoreMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverrideType {
    #[serde(rename = "ENV_GLOBAL_OVERRIDE")]
    EnvGlobal,
    #[serde(rename = "ENV_SERVICE_OVERRIDE")]
    EnvService,
    #[serde(rename = "INFRA_GLOBAL_OVERRIDE")]
    InfraGlobal,
    #[serde(rename = "INFRA_SERVICE_OVERRIDE")]
    InfraService,
}

impl OverrideType {
    /// Scope fields a record of this type must name
    pub fn required_fields(&self) -> &'static [ScopeField] {
        match self {
            OverrideType::EnvGlobal => &[ScopeField::Environment],
            OverrideType::EnvService => &[ScopeField::Environment, ScopeField::Service],
            OverrideType::InfraGlobal => &[ScopeField::Environment, ScopeField::Infrastructure],
            OverrideType::InfraService => &[
                ScopeField::Environment,
                ScopeField::Infrastructure,
                ScopeField::Service,
            ],
        }
    }

    /// Resource whose edit permission gates this override tab
    pub fn resource_type(&self) -> ResourceType {
        match self {
            OverrideType::EnvService => ResourceType::Service,
            _ => ResourceType::Environment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideType::EnvGlobal => "ENV_GLOBAL_OVERRIDE",
            OverrideType::EnvService => "ENV_SERVICE_OVERRIDE",
            OverrideType::InfraGlobal => "INFRA_GLOBAL_OVERRIDE",
            OverrideType::InfraService => "INFRA_SERVICE_OVERRIDE",
        }
    }
}

impl fmt::Display for OverrideType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Environment,
    Service,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Environment => f.write_str("environment"),
            ResourceType::Service => f.write_str("service"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeField {
    Environment,
    Service,
    Infrastructure,
}

impl ScopeField {
    pub fn field_name(&self) -> &'static str {
        match self {
            ScopeField::Environment => "environmentRef",
            ScopeField::Service => "serviceRef",
            ScopeField::Infrastructure => "infraIdentifier",
        }
    }
}

/// The environment/infra/service tuple a section groups by
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infra_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_ref: Option<String>,
}

impl OverrideScope {
    pub fn environment(environment_ref: &str) -> Self {
        Self {
            environment_ref: Some(environment_ref.to_string()),
            ..Default::default()
        }
    }

    pub fn with_service(mut self, service_ref: &str) -> Self {
        self.service_ref = Some(service_ref.to_string());
        self
    }

    pub fn with_infra(mut self, infra_identifier: &str) -> Self {
        self.infra_identifier = Some(infra_identifier.to_string());
        self
    }

    pub fn get(&self, field: ScopeField) -> Option<&str> {
        match field {
            ScopeField::Environment => self.environment_ref.as_deref(),
            ScopeField::Service => self.service_ref.as_deref(),
            ScopeField::Infrastructure => self.infra_identifier.as_deref(),
        }
    }

    /// Required fields of `override_type` left empty
    pub fn missing_fields(&self, override_type: OverrideType) -> Vec<ScopeField> {
        override_type
            .required_fields()
            .iter()
            .copied()
            .filter(|field| is_blank(self.get(*field)))
            .collect()
    }

    /// Composite string identifying the section this scope belongs to
    pub fn group_key(&self) -> String {
        [
            &self.environment_ref,
            &self.infra_identifier,
            &self.service_ref,
        ]
        .iter()
        .map(|part| part.as_deref().unwrap_or("-"))
        .join("/")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreType {
    #[default]
    Inline,
    Remote,
}

/// Git coordinates the server reports for a remote record
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityGitDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
}

/// Server-owned override record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRecord {
    pub identifier: Id,
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_identifier: Option<String>,
    #[serde(flatten)]
    pub scope: OverrideScope,
    #[serde(rename = "type")]
    pub override_type: OverrideType,
    #[serde(default)]
    pub spec: OverrideSpec,
    #[serde(default)]
    pub store_type: StoreType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_git_details: Option<EntityGitDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<String>,
}

impl OverrideRecord {
    pub fn is_remote(&self) -> bool {
        self.store_type == StoreType::Remote
    }

    /// Connector/repo/branch/file of a remote record, blanks where the server sent none
    pub fn git_coordinates(&self) -> GitCoordinates {
        let details = self.entity_git_details.clone().unwrap_or_default();
        GitCoordinates {
            connector_ref: self.connector_ref.clone().unwrap_or_default(),
            repo_name: details.repo_name.unwrap_or_default(),
            branch: details.branch.unwrap_or_default(),
            file_path: details.file_path.unwrap_or_default(),
        }
    }

    /// Last-known object/commit ids, sent back for conflict detection
    pub fn store_metadata(&self) -> StoreMetadata {
        let details = self.entity_git_details.as_ref();
        StoreMetadata {
            last_object_id: details.and_then(|d| d.object_id.clone()),
            last_commit_id: details.and_then(|d| d.commit_id.clone()),
        }
    }
}

/// Payload of a create call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOverrideRequest {
    #[serde(rename = "type")]
    pub override_type: OverrideType,
    #[serde(flatten)]
    pub scope: OverrideScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_identifier: Option<String>,
    pub spec: OverrideSpec,
}
