use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::StoreError;
use crate::model::{
    CreateOverrideRequest, GitSaveRequest, OverrideFilter, OverridePage, OverrideQuery,
    OverrideRecord, OverrideScope, OverrideType, ProjectScope,
};
use crate::store::traits::OverrideStore;

pub type AppState<S> = Arc<S>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_commit_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
            current_commit_id: None,
        }
    }
}

fn default_page_size() -> usize {
    20
}

/// Query string of the list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub account_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_identifier: Option<String>,
    #[serde(rename = "type")]
    pub override_type: OverrideType,
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

impl ListQuery {
    pub fn new(project: &ProjectScope, query: &OverrideQuery) -> Self {
        Self {
            account_identifier: project.account_id.clone(),
            org_identifier: project.org_identifier.clone(),
            project_identifier: project.project_identifier.clone(),
            override_type: query.override_type,
            page: query.page,
            size: query.size,
        }
    }

    fn project(&self) -> ProjectScope {
        ProjectScope::new(
            self.account_identifier.clone(),
            self.org_identifier.clone(),
            self.project_identifier.clone(),
        )
    }
}

/// Query string of the delete endpoint: project plus the record's scope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    pub account_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infra_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_ref: Option<String>,
}

impl DeleteQuery {
    pub fn new(project: &ProjectScope, scope: &OverrideScope) -> Self {
        Self {
            account_identifier: project.account_id.clone(),
            org_identifier: project.org_identifier.clone(),
            project_identifier: project.project_identifier.clone(),
            environment_ref: scope.environment_ref.clone(),
            infra_identifier: scope.infra_identifier.clone(),
            service_ref: scope.service_ref.clone(),
        }
    }

    fn split(self) -> (ProjectScope, OverrideScope) {
        (
            ProjectScope::new(
                self.account_identifier,
                self.org_identifier,
                self.project_identifier,
            ),
            OverrideScope {
                environment_ref: self.environment_ref,
                infra_identifier: self.infra_identifier,
                service_ref: self.service_ref,
            },
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCreateBody {
    #[serde(rename = "override")]
    pub request: CreateOverrideRequest,
    pub git: GitSaveRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteUpdateBody {
    #[serde(rename = "override")]
    pub record: OverrideRecord,
    pub git: GitSaveRequest,
}

fn store_error(err: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        StoreError::Conflict { .. } => StatusCode::CONFLICT,
        StoreError::Server { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        StoreError::Transport(_) => StatusCode::BAD_GATEWAY,
        StoreError::Malformed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = match err {
        StoreError::NotFound(identifier) => ErrorResponse::new(&identifier),
        StoreError::InvalidRequest(message) | StoreError::Server { message, .. } => {
            ErrorResponse::new(&message)
        }
        StoreError::Conflict {
            message,
            current_commit_id,
        } => ErrorResponse {
            error: message,
            current_commit_id,
        },
        other => ErrorResponse::new(&other.to_string()),
    };

    (status, Json(body))
}

/// POST /service-overrides/list
pub async fn list_overrides<S: OverrideStore>(
    Query(params): Query<ListQuery>,
    State(store): State<AppState<S>>,
    RequestJson(filter): RequestJson<OverrideFilter>,
) -> ApiResult<OverridePage> {
    let query = OverrideQuery {
        override_type: params.override_type,
        filter,
        page: params.page,
        size: params.size,
    };
    store
        .list_overrides(&params.project(), &query)
        .await
        .map(Json)
        .map_err(store_error)
}

/// POST /service-overrides
pub async fn create_override<S: OverrideStore>(
    Query(project): Query<ProjectScope>,
    State(store): State<AppState<S>>,
    RequestJson(request): RequestJson<CreateOverrideRequest>,
) -> ApiResult<OverrideRecord> {
    store
        .create_override(&project, &request)
        .await
        .map(Json)
        .map_err(store_error)
}

/// POST /service-overrides/remote
pub async fn create_remote_override<S: OverrideStore>(
    Query(project): Query<ProjectScope>,
    State(store): State<AppState<S>>,
    RequestJson(body): RequestJson<RemoteCreateBody>,
) -> ApiResult<OverrideRecord> {
    store
        .create_remote_override(&project, &body.request, &body.git)
        .await
        .map(Json)
        .map_err(store_error)
}

/// PUT /service-overrides
pub async fn update_override<S: OverrideStore>(
    Query(project): Query<ProjectScope>,
    State(store): State<AppState<S>>,
    RequestJson(record): RequestJson<OverrideRecord>,
) -> ApiResult<OverrideRecord> {
    store
        .update_override(&project, &record)
        .await
        .map(Json)
        .map_err(store_error)
}

/// PUT /service-overrides/remote
pub async fn update_remote_override<S: OverrideStore>(
    Query(project): Query<ProjectScope>,
    State(store): State<AppState<S>>,
    RequestJson(body): RequestJson<RemoteUpdateBody>,
) -> ApiResult<OverrideRecord> {
    store
        .update_remote_override(&project, &body.record, &body.git)
        .await
        .map(Json)
        .map_err(store_error)
}

/// DELETE /service-overrides/{identifier}
pub async fn delete_override<S: OverrideStore>(
    Path(identifier): Path<String>,
    Query(params): Query<DeleteQuery>,
    State(store): State<AppState<S>>,
) -> ApiResult<serde_json::Value> {
    let (project, scope) = params.split();
    store
        .delete_override(&project, &identifier, &scope)
        .await
        .map(|_| {
            Json(serde_json::json!({
                "deleted": true,
                "identifier": identifier,
            }))
        })
        .map_err(store_error)
}
