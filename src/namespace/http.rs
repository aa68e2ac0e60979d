//! Blocking REST adapter for a remote namespace service.
//!
//! Endpoints, relative to the configured base URL:
//! - `GET  views?name=<name>` -> view JSON, 404 when absent
//! - `GET  views/<id>`        -> view JSON, 404 when absent
//! - `POST views`             -> `{"id": <n>}`; the view may appear later
use super::{NamespaceService, ViewHandle, ViewId};
use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct CreateViewRequest<'a> {
    name: &'a str,
    parent_id: ViewId,
}

#[derive(Debug, Deserialize)]
struct CreateViewResponse {
    id: ViewId,
}

/// Per-request bound used by the CLI.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpNamespace {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpNamespace {
    /// Client for `base_url`, bounding each request by `request_timeout`.
    pub fn new(base_url: &str, request_timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(request_timeout))
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: config.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn views_url(&self) -> String {
        format!("{}/views", self.base_url)
    }

    fn view_url(&self, id: ViewId) -> String {
        format!("{}/views/{}", self.base_url, id.0)
    }

    /// GET a view, mapping 404 to `None`.
    fn fetch(
        &self,
        request: ureq::RequestBuilder<ureq::typestate::WithoutBody>,
    ) -> Result<Option<ViewHandle>, BackendError> {
        match request.call() {
            Ok(mut response) => {
                let view = response
                    .body_mut()
                    .read_json::<ViewHandle>()
                    .map_err(|err| BackendError::Malformed(format!("view response: {err}")))?;
                Ok(Some(view))
            }
            Err(ureq::Error::StatusCode(404)) => Ok(None),
            Err(err) => Err(map_error(err)),
        }
    }

    fn fetch_by_name(&self, name: &str) -> Result<Option<ViewHandle>, BackendError> {
        self.fetch(self.agent.get(self.views_url()).query("name", name))
    }

    fn fetch_by_id(&self, id: ViewId) -> Result<Option<ViewHandle>, BackendError> {
        self.fetch(self.agent.get(self.view_url(id)))
    }
}

fn map_error(err: ureq::Error) -> BackendError {
    match err {
        ureq::Error::StatusCode(code) if (400..500).contains(&code) => {
            BackendError::Rejected(format!("HTTP {code}"))
        }
        other => BackendError::Transport(other.to_string()),
    }
}

impl NamespaceService for HttpNamespace {
    fn view_exists_by_name(&self, name: &str) -> Result<bool, BackendError> {
        Ok(self.fetch_by_name(name)?.is_some())
    }

    fn view_exists_by_id(&self, id: ViewId) -> Result<bool, BackendError> {
        Ok(self.fetch_by_id(id)?.is_some())
    }

    fn view_by_name(&self, name: &str) -> Result<ViewHandle, BackendError> {
        self.fetch_by_name(name)?
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    fn view_by_id(&self, id: ViewId) -> Result<ViewHandle, BackendError> {
        self.fetch_by_id(id)?
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    fn create_view(&self, name: &str, parent: &ViewHandle) -> Result<ViewId, BackendError> {
        let body = CreateViewRequest {
            name,
            parent_id: parent.id,
        };
        let mut response = self
            .agent
            .post(self.views_url())
            .send_json(&body)
            .map_err(map_error)?;
        let created = response
            .body_mut()
            .read_json::<CreateViewResponse>()
            .map_err(|err| BackendError::Malformed(format!("create response: {err}")))?;
        tracing::debug!(name, id = %created.id, "create accepted");
        Ok(created.id)
    }
}
