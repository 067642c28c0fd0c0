//! Cluster control-plane seam.
//!
//! The managers need four calls: check that a cluster exists, and create,
//! update or delete a database user. `AlreadyExists` on create and
//! `NotFound` on delete are reported as distinct errors so callers can
//! absorb them on retries.

mod http;
mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::DatabaseUser;

pub use http::{ClusterSummary, HttpControlPlane};
pub use memory::{ControlPlaneCall, InMemoryControlPlane};

#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("database user {0} already exists")]
    AlreadyExists(String),

    #[error("database user {0} not found")]
    NotFound(String),

    #[error("control plane did not answer within {0:?}")]
    Timeout(Duration),

    #[error("control plane unreachable: {0}")]
    Connection(String),

    #[error("control plane returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("control plane misconfigured: {0}")]
    Config(String),

    #[error("{0:?} cannot be used as a cluster or user name")]
    InvalidName(String),
}

impl ControlPlaneError {
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            ControlPlaneError::Timeout(_) | ControlPlaneError::Connection(_)
        )
    }
}

/// Remote API managing clusters and database users.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn cluster_exists(&self, name: &str) -> Result<bool, ControlPlaneError>;

    /// Fails with `AlreadyExists` if the username is taken.
    async fn create_database_user(&self, user: &DatabaseUser) -> Result<(), ControlPlaneError>;

    /// Replace password and roles of an existing user. Fails with
    /// `NotFound` if there is no such user.
    async fn update_database_user(&self, user: &DatabaseUser) -> Result<(), ControlPlaneError>;

    /// Fails with `NotFound` if there is no such user.
    async fn delete_database_user(&self, username: &str) -> Result<(), ControlPlaneError>;
}

/// Bound a control-plane call; expiry becomes `ControlPlaneError::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ControlPlaneError>
where
    F: Future<Output = Result<T, ControlPlaneError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ControlPlaneError::Timeout(limit)),
    }
}
