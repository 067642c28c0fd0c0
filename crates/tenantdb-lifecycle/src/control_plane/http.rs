//! REST control plane client.
//!
//! Speaks the Atlas-style group API:
//!
//! | Call | Request | Outcome |
//! |---|---|---|
//! | cluster exists | `GET groups/{group}/clusters/{name}` | 200 yes, 404 no |
//! | list clusters | `GET groups/{group}/clusters?pageNum=N` | `results[]`, `totalCount` |
//! | create user | `POST groups/{group}/databaseUsers` | 201, 409 exists |
//! | update user | `PATCH groups/{group}/databaseUsers/admin/{username}` | 200, 404 missing |
//! | delete user | `DELETE groups/{group}/databaseUsers/admin/{username}` | 2xx, 404 missing |
//!
//! Names are pushed as single percent-encoded path segments.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use tenantdb_core::config::ControlPlaneConfig;

use super::{ControlPlane, ControlPlaneError};
use crate::model::{AUTH_DATABASE, DatabaseUser};

/// Clusters requested per page when listing.
const PAGE_SIZE: usize = 100;

/// A cluster as reported by the control plane.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClusterSummary {
    pub name: String,
    #[serde(rename = "mongoURIWithOptions", default)]
    pub connection_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClusterPage {
    #[serde(default)]
    results: Vec<ClusterSummary>,
    #[serde(rename = "totalCount", default)]
    total_count: Option<usize>,
}

impl ClusterPage {
    /// Whether another page can follow, once `fetched` results are in hand.
    fn has_more(&self, fetched: usize) -> bool {
        if self.results.is_empty() {
            return false;
        }
        match self.total_count {
            Some(total) => fetched < total,
            None => self.results.len() >= PAGE_SIZE,
        }
    }
}

/// `name` as one path segment; empty and dot segments would change the
/// addressed resource.
fn segment(name: &str) -> Result<&str, ControlPlaneError> {
    match name {
        "" | "." | ".." => Err(ControlPlaneError::InvalidName(name.to_string())),
        _ => Ok(name),
    }
}

pub struct HttpControlPlane {
    client: Client,
    base_url: Url,
    group: String,
    user: String,
    api_key: String,
    timeout: Duration,
}

impl HttpControlPlane {
    pub fn new(config: &ControlPlaneConfig) -> Result<Self, ControlPlaneError> {
        let required = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| ControlPlaneError::Config(format!("control_plane.{name} is required")))
        };

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| ControlPlaneError::Config(format!("control_plane.base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ControlPlaneError::Config(format!(
                "control_plane.base_url {base_url} cannot carry a path"
            )));
        }

        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("tenantdb-broker/0.1")
            .build()
            .map_err(|e| ControlPlaneError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            group: required(&config.group, "group")?,
            user: required(&config.user, "user")?,
            api_key: required(&config.api_key, "api_key")?,
            timeout,
        })
    }

    /// `{base}/groups/{group}/{segments...}`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so the path is always editable.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .push("groups")
                .push(&self.group)
                .extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ControlPlaneError> {
        request
            .basic_auth(&self.user, Some(&self.api_key))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ControlPlaneError::Timeout(self.timeout)
                } else {
                    ControlPlaneError::Connection(e.to_string())
                }
            })
    }

    /// Every cluster in the group, for template discovery at startup.
    pub async fn list_clusters(&self) -> Result<Vec<ClusterSummary>, ControlPlaneError> {
        let mut clusters = Vec::new();
        let mut page_num = 1usize;
        loop {
            let mut url = self.url(&["clusters"]);
            url.query_pairs_mut()
                .append_pair("pageNum", &page_num.to_string())
                .append_pair("itemsPerPage", &PAGE_SIZE.to_string());

            let response = self.send(self.client.get(url)).await?;
            let response = ensure_success(response).await?;
            let page: ClusterPage = response
                .json()
                .await
                .map_err(|e| ControlPlaneError::Connection(e.to_string()))?;

            let more = page.has_more(clusters.len() + page.results.len());
            debug!(page = page_num, count = page.results.len(), "cluster page");
            clusters.extend(page.results);
            if !more {
                return Ok(clusters);
            }
            page_num += 1;
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, ControlPlaneError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    Err(ControlPlaneError::Api { status, message })
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn cluster_exists(&self, name: &str) -> Result<bool, ControlPlaneError> {
        let Ok(name) = segment(name) else {
            return Ok(false);
        };
        let response = self
            .send(self.client.get(self.url(&["clusters", name])))
            .await?;
        debug!(cluster = %name, status = %response.status(), "cluster lookup");
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(response).await?;
        Ok(true)
    }

    async fn create_database_user(&self, user: &DatabaseUser) -> Result<(), ControlPlaneError> {
        segment(&user.username)?;
        let response = self
            .send(self.client.post(self.url(&["databaseUsers"])).json(user))
            .await?;
        debug!(username = %user.username, status = %response.status(), "create database user");
        if response.status() == StatusCode::CONFLICT {
            return Err(ControlPlaneError::AlreadyExists(user.username.clone()));
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn update_database_user(&self, user: &DatabaseUser) -> Result<(), ControlPlaneError> {
        let username = segment(&user.username)?;
        let url = self.url(&["databaseUsers", AUTH_DATABASE, username]);
        let response = self.send(self.client.patch(url).json(user)).await?;
        debug!(%username, status = %response.status(), "update database user");
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ControlPlaneError::NotFound(username.to_string()));
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete_database_user(&self, username: &str) -> Result<(), ControlPlaneError> {
        let username = segment(username)?;
        let url = self.url(&["databaseUsers", AUTH_DATABASE, username]);
        let response = self.send(self.client.delete(url)).await?;
        debug!(%username, status = %response.status(), "delete database user");
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ControlPlaneError::NotFound(username.to_string()));
        }
        ensure_success(response).await?;
        Ok(())
    }
}
