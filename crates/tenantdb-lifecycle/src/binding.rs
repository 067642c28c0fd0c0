//! Binding lifecycle: find / bind / unbind.
//!
//! A bind on an unprovisioned binding is the only call that issues
//! secrets. Retries with identical parameters succeed without creating a
//! new password, since that would invalidate the one already handed out.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use tenantdb_core::BrokerConfig;
use tenantdb_state::{BindingRecord, Parameters, Record, StateError, StateStore, epoch_secs};

use crate::control_plane::{ControlPlane, ControlPlaneError, with_timeout};
use crate::credentials::CredentialPolicy;
use crate::error::{BrokerError, BrokerResult};
use crate::model::{Binding, Credentials, DatabaseUser, Instance};

/// Result of a successful bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// New binding; carries the only copy of its credentials.
    Bound { credentials: Credentials },
    /// Same identity, same parameters: no secrets re-issued.
    IdenticalAlreadyExists,
}

/// Lifecycle state machine for bindings.
pub struct BindingManager {
    store: StateStore,
    policy: Arc<dyn CredentialPolicy>,
    control_plane: Arc<dyn ControlPlane>,
    call_timeout: Duration,
}

impl BindingManager {
    pub fn new(
        store: StateStore,
        config: Arc<BrokerConfig>,
        policy: Arc<dyn CredentialPolicy>,
        control_plane: Arc<dyn ControlPlane>,
    ) -> Self {
        Self {
            store,
            policy,
            control_plane,
            call_timeout: config.control_plane_timeout(),
        }
    }

    /// Build a `Binding` owned by `instance` and populate it from the store.
    pub fn find(&self, binding_id: &str, instance: &Instance) -> BrokerResult<Binding> {
        let mut binding = Binding::new(binding_id, instance.clone());
        if let Some(parameters) = self.store.populate(&binding.key())? {
            binding.provisioned_with(parameters);
        }
        debug!(
            %binding_id,
            instance_id = %instance.id(),
            provisioned = binding.is_provisioned(),
            "binding found"
        );
        Ok(binding)
    }

    /// Record `binding` and create its database user.
    ///
    /// The record is inserted first, so of two racing binds only the insert
    /// winner reaches the control plane and issues a password.
    pub async fn bind(
        &self,
        binding: &mut Binding,
        parameters: Parameters,
    ) -> BrokerResult<BindOutcome> {
        if binding.is_provisioned() {
            return self.compare(binding, &parameters);
        }

        binding.set_parameters(parameters.clone());

        let credentials = self.policy.binding_credentials(binding)?;
        let roles = self.policy.binding_permissions(binding, Vec::new());
        let user = DatabaseUser::new(&credentials, roles);

        let record = Record::Binding(BindingRecord {
            instance_id: binding.instance().id().to_string(),
            binding_id: binding.id().to_string(),
            parameters: parameters.clone(),
            created_at: epoch_secs(),
        });

        match self.store.store(&record) {
            Ok(_) => {}
            Err(StateError::Duplicate(_)) => {
                debug!(binding_id = %binding.id(), "concurrent bind won the insert");
                return match self.store.populate(&binding.key())? {
                    Some(stored) => {
                        binding.provisioned_with(stored);
                        self.compare(binding, &parameters)
                    }
                    None => Err(BrokerError::BindingAlreadyExists(binding.id().to_string())),
                };
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.create_user(binding, &user).await {
            if let Err(release) = self.store.remove(&binding.key()) {
                warn!(binding_id = %binding.id(), error = %release, "could not release binding record");
            }
            return Err(e);
        }

        binding.provisioned_with(parameters);
        info!(
            binding_id = %binding.id(),
            instance_id = %binding.instance().id(),
            username = %credentials.username,
            "binding created"
        );
        Ok(BindOutcome::Bound { credentials })
    }

    /// Create `user`, or take over a user left by an earlier attempt by
    /// resetting its password and roles.
    async fn create_user(&self, binding: &Binding, user: &DatabaseUser) -> BrokerResult<()> {
        match with_timeout(self.call_timeout, self.control_plane.create_database_user(user)).await {
            Ok(()) => Ok(()),
            Err(ControlPlaneError::AlreadyExists(username)) => {
                warn!(%username, binding_id = %binding.id(), "database user already exists, resetting it");
                with_timeout(self.call_timeout, self.control_plane.update_database_user(user)).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the database user of `binding` and its record.
    pub async fn unbind(&self, binding: &mut Binding) -> BrokerResult<()> {
        let username = self.policy.binding_username(binding);

        match with_timeout(self.call_timeout, self.control_plane.delete_database_user(&username)).await {
            Ok(()) => {}
            Err(ControlPlaneError::NotFound(_)) => {
                // Removed by an earlier attempt, or by hand.
                warn!(%username, binding_id = %binding.id(), "database user already gone");
            }
            Err(e) => return Err(e.into()),
        }

        self.store.remove(&binding.key())?;
        binding.unprovisioned();
        info!(binding_id = %binding.id(), instance_id = %binding.instance().id(), "binding removed");
        Ok(())
    }

    fn compare(&self, binding: &Binding, parameters: &Parameters) -> BrokerResult<BindOutcome> {
        if binding.parameters() == parameters {
            debug!(binding_id = %binding.id(), "identical binding already exists");
            Ok(BindOutcome::IdenticalAlreadyExists)
        } else {
            Err(BrokerError::BindingAlreadyExists(binding.id().to_string()))
        }
    }
}
