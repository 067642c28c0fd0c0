//! Error types for lifecycle operations.

use thiserror::Error;

use tenantdb_state::StateError;

use crate::control_plane::ControlPlaneError;

/// Result type alias for lifecycle operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors surfaced by the managers and the dispatcher.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("cluster {0} is not available on the control plane")]
    ClusterNotFound(String),

    #[error("no connection-string template configured for cluster {0}")]
    ClusterConfig(String),

    #[error("plan {0} is not supported")]
    PlanUnsupported(String),

    #[error("{0} is not supported")]
    Unsupported(&'static str),

    #[error("missing required parameter {0}")]
    MissingParameter(String),

    #[error("parameter {0} must be a string")]
    InvalidParameter(String),

    #[error("instance {0} already exists with different parameters")]
    InstanceAlreadyExists(String),

    #[error("binding {0} already exists with different parameters")]
    BindingAlreadyExists(String),

    #[error("instance {0} does not exist")]
    InstanceNotFound(String),

    #[error("binding {0} does not exist")]
    BindingNotFound(String),

    #[error("state store: {0}")]
    Store(#[from] StateError),

    #[error("control plane: {0}")]
    ControlPlane(#[from] ControlPlaneError),
}

impl BrokerError {
    /// Stable machine-readable identifier.
    pub fn kind(&self) -> &'static str {
        match self {
            BrokerError::ClusterNotFound(_) => "ClusterNotFound",
            BrokerError::ClusterConfig(_) => "ClusterConfig",
            BrokerError::PlanUnsupported(_) => "PlanUnsupported",
            BrokerError::Unsupported(_) => "Unsupported",
            BrokerError::MissingParameter(_) => "MissingParameter",
            BrokerError::InvalidParameter(_) => "InvalidParameter",
            BrokerError::InstanceAlreadyExists(_) => "InstanceAlreadyExists",
            BrokerError::BindingAlreadyExists(_) => "BindingAlreadyExists",
            BrokerError::InstanceNotFound(_) => "InstanceNotFound",
            BrokerError::BindingNotFound(_) => "BindingNotFound",
            BrokerError::Store(e) if e.is_connection() => "ConnectionError",
            BrokerError::Store(_) => "StoreError",
            BrokerError::ControlPlane(e) if e.is_connection() => "ConnectionError",
            BrokerError::ControlPlane(_) => "ControlPlaneError",
        }
    }

    /// Whether a backend was unreachable or timed out.
    pub fn is_connection(&self) -> bool {
        match self {
            BrokerError::Store(e) => e.is_connection(),
            BrokerError::ControlPlane(e) => e.is_connection(),
            _ => false,
        }
    }
}
