use log::debug;
use serde::de::DeserializeOwned;

use crate::api::handlers::{
    DeleteQuery, ErrorResponse, ListQuery, RemoteCreateBody, RemoteUpdateBody,
};
use crate::error::StoreError;
use crate::model::{
    CreateOverrideRequest, GitSaveRequest, OverridePage, OverrideQuery, OverrideRecord,
    OverrideScope, ProjectScope,
};
use crate::store::traits::{OverrideStore, StoreResult};

/// `OverrideStore` talking to the override HTTP API
#[derive(Debug, Clone)]
pub struct HttpOverrideStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOverrideStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of one override, with the identifier percent-encoded as a
    /// single path segment
    fn override_url(&self, identifier: &str) -> StoreResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.url("/service-overrides"))
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Transport(format!("cannot route from {}", self.base_url)))?
            .push(identifier);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> StoreResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        debug!("override api responded {}", status);

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| StoreError::Malformed(e.to_string()));
        }

        let body = response.json::<ErrorResponse>().await.ok();
        Err(status_error(status.as_u16(), body))
    }
}

fn status_error(status: u16, body: Option<ErrorResponse>) -> StoreError {
    let (message, current_commit_id) = match body {
        Some(body) => (body.error, body.current_commit_id),
        None => (String::new(), None),
    };

    match status {
        404 => StoreError::NotFound(message),
        409 => StoreError::Conflict {
            message,
            current_commit_id,
        },
        400 | 422 => StoreError::InvalidRequest(message),
        _ => StoreError::Server { status, message },
    }
}

#[async_trait::async_trait]
impl OverrideStore for HttpOverrideStore {
    async fn list_overrides(
        &self,
        project: &ProjectScope,
        query: &OverrideQuery,
    ) -> StoreResult<OverridePage> {
        let params = ListQuery::new(project, query);
        Self::send(
            self.client
                .post(self.url("/service-overrides/list"))
                .query(&params)
                .json(&query.filter),
        )
        .await
    }

    async fn create_override(
        &self,
        project: &ProjectScope,
        request: &CreateOverrideRequest,
    ) -> StoreResult<OverrideRecord> {
        Self::send(
            self.client
                .post(self.url("/service-overrides"))
                .query(project)
                .json(request),
        )
        .await
    }

    async fn create_remote_override(
        &self,
        project: &ProjectScope,
        request: &CreateOverrideRequest,
        git: &GitSaveRequest,
    ) -> StoreResult<OverrideRecord> {
        let body = RemoteCreateBody {
            request: request.clone(),
            git: git.clone(),
        };
        Self::send(
            self.client
                .post(self.url("/service-overrides/remote"))
                .query(project)
                .json(&body),
        )
        .await
    }

    async fn update_override(
        &self,
        project: &ProjectScope,
        record: &OverrideRecord,
    ) -> StoreResult<OverrideRecord> {
        Self::send(
            self.client
                .put(self.url("/service-overrides"))
                .query(project)
                .json(record),
        )
        .await
    }

    async fn update_remote_override(
        &self,
        project: &ProjectScope,
        record: &OverrideRecord,
        git: &GitSaveRequest,
    ) -> StoreResult<OverrideRecord> {
        let body = RemoteUpdateBody {
            record: record.clone(),
            git: git.clone(),
        };
        Self::send(
            self.client
                .put(self.url("/service-overrides/remote"))
                .query(project)
                .json(&body),
        )
        .await
    }

    async fn delete_override(
        &self,
        project: &ProjectScope,
        identifier: &str,
        scope: &OverrideScope,
    ) -> StoreResult<()> {
        let params = DeleteQuery::new(project, scope);
        let url = self.override_url(identifier)?;
        let _: serde_json::Value = Self::send(self.client.delete(url).query(&params)).await?;
        Ok(())
    }
}
