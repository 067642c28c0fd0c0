//! tenantdb-lifecycle — instance and binding lifecycle for the tenantdb broker.
//!
//! Turns provision / deprovision / bind / unbind requests into idempotent
//! operations across three independently failing domains: the bookkeeping
//! store, the cluster control plane, and credential issuance.
//!
//! # Architecture
//!
//! ```text
//! Broker (dispatcher)
//!   ├── InstanceManager ── find / create / delete
//!   │     ├── StateStore (populate, store, remove)
//!   │     └── ControlPlane::cluster_exists
//!   └── BindingManager ─── find / bind / unbind
//!         ├── CredentialPolicy (username, password, roles)
//!         ├── ControlPlane::{create,delete}_database_user
//!         └── StateStore
//! ```
//!
//! Every identity is either unprovisioned or provisioned. A create/bind on
//! a provisioned identity with identical parameters is a no-op success;
//! with different parameters it is a conflict. Concurrent requests for one
//! identity are not serialized in-process: the store's key uniqueness
//! decides the winner and the loser resolves against the stored record.

pub mod binding;
pub mod broker;
pub mod control_plane;
pub mod credentials;
pub mod error;
pub mod instance;
pub mod model;

pub use binding::{BindOutcome, BindingManager};
pub use broker::{BindRequest, Broker, InstanceView, ProvisionRequest};
pub use control_plane::{
    ControlPlane, ControlPlaneCall, ControlPlaneError, HttpControlPlane, InMemoryControlPlane,
};
pub use credentials::{CredentialPolicy, DefaultCredentialPolicy};
pub use error::{BrokerError, BrokerResult};
pub use instance::{ClusterMode, Deprovisioned, InstanceManager, ProvisionOutcome};
pub use model::{Binding, Credentials, DatabaseUser, Instance, RoleGrant};
