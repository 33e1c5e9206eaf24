use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = String;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Account/org/project triple every override call is scoped by
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectScope {
    #[serde(rename = "accountIdentifier")]
    pub account_id: String,
    #[serde(
        rename = "orgIdentifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub org_identifier: Option<String>,
    #[serde(
        rename = "projectIdentifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub project_identifier: Option<String>,
}

impl ProjectScope {
    pub fn new(
        account_id: impl Into<String>,
        org_identifier: Option<String>,
        project_identifier: Option<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            org_identifier,
            project_identifier,
        }
    }

    pub fn project(account_id: &str, org_identifier: &str, project_identifier: &str) -> Self {
        Self::new(
            account_id,
            Some(org_identifier.to_string()),
            Some(project_identifier.to_string()),
        )
    }

    /// True when `org`/`project` of a record belong to this scope
    pub fn contains(&self, account_id: &str, org: Option<&str>, project: Option<&str>) -> bool {
        self.account_id == account_id
            && self.org_identifier.as_deref() == org
            && self.project_identifier.as_deref() == project
    }
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Treats `None` and whitespace-only strings alike
pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
