//! Credential and naming policy.
//!
//! The policy is a strategy injected into the managers, separate from the
//! immutable [`BrokerConfig`] it reads. Every method except the password
//! part of [`CredentialPolicy::binding_credentials`] is a pure function of
//! its inputs, which the idempotence checks in the managers depend on.

use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::{Digest, Sha256};

use tenantdb_core::BrokerConfig;
use tenantdb_state::Parameters;

use crate::error::{BrokerError, BrokerResult};
use crate::model::{Binding, Credentials, RoleGrant, string_param};

/// Length of generated binding passwords.
pub const PASSWORD_LENGTH: usize = 32;

/// Roles every binding receives on its instance database.
pub const DEFAULT_ROLES: [&str; 2] = ["dbAdmin", "readWrite"];

/// Naming and credential derivation for instances and bindings.
pub trait CredentialPolicy: Send + Sync {
    /// Database name for an instance that was not given one explicitly.
    ///
    /// Must return the same value for the same identity and parameters.
    fn database_name(&self, instance_id: &str, parameters: &Parameters) -> String;

    /// Database username of a binding.
    fn binding_username(&self, binding: &Binding) -> String;

    /// Fresh credentials for a new binding.
    fn binding_credentials(&self, binding: &Binding) -> BrokerResult<Credentials>;

    /// Extend `roles` with the grants the binding needs.
    fn binding_permissions(&self, binding: &Binding, roles: Vec<RoleGrant>) -> Vec<RoleGrant>;
}

/// Default policy: namespace-derived database names, binding id as
/// username, random alphanumeric passwords.
#[derive(Debug, Clone)]
pub struct DefaultCredentialPolicy {
    config: Arc<BrokerConfig>,
}

impl DefaultCredentialPolicy {
    pub fn new(config: Arc<BrokerConfig>) -> Self {
        Self { config }
    }

    /// Database of the binding's owning instance.
    fn binding_database(&self, binding: &Binding) -> String {
        let instance = binding.instance();
        match instance.database(&self.config.parameters) {
            Some(db) => db.to_string(),
            None => self.database_name(instance.id(), instance.parameters()),
        }
    }
}

impl CredentialPolicy for DefaultCredentialPolicy {
    fn database_name(&self, instance_id: &str, parameters: &Parameters) -> String {
        if let Some(ns) = string_param(parameters, &self.config.parameters.namespace) {
            return ns.to_string();
        }
        let digest = Sha256::digest(instance_id.as_bytes());
        format!("db_{}", &hex::encode(digest)[..16])
    }

    fn binding_username(&self, binding: &Binding) -> String {
        binding.id().to_string()
    }

    fn binding_credentials(&self, binding: &Binding) -> BrokerResult<Credentials> {
        let cluster_name = binding
            .instance()
            .cluster(&self.config.parameters)
            .unwrap_or_default();
        let cluster = self
            .config
            .cluster(cluster_name)
            .ok_or_else(|| BrokerError::ClusterConfig(cluster_name.to_string()))?;

        let username = self.binding_username(binding);
        let password = generate_password(PASSWORD_LENGTH);
        let database = self.binding_database(binding);
        let uri = cluster.render(&username, &password, &database);

        Ok(Credentials {
            username,
            password,
            database,
            uri,
        })
    }

    fn binding_permissions(&self, binding: &Binding, mut roles: Vec<RoleGrant>) -> Vec<RoleGrant> {
        let database = self.binding_database(binding);
        roles.extend(DEFAULT_ROLES.iter().map(|role| RoleGrant::new(&database, *role)));
        roles
    }
}

/// Random password over `[A-Za-z0-9]`.
pub fn generate_password(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
