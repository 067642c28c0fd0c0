//! Instance lifecycle: find / create / delete.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use tenantdb_core::BrokerConfig;
use tenantdb_state::{
    InstanceRecord, Parameters, Record, RecordHandle, StateError, StateStore, epoch_secs,
};

use crate::control_plane::{ControlPlane, with_timeout};
use crate::credentials::CredentialPolicy;
use crate::error::{BrokerError, BrokerResult};
use crate::model::{Instance, optional_string_param};

/// Where an instance's database lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterMode {
    /// Attach to a cluster that already exists on the control plane.
    Existing,
    /// Create a dedicated cluster. Not supported.
    New,
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created { operation: RecordHandle },
    /// Same identity, same parameters: nothing was done.
    IdenticalAlreadyExists,
}

/// Result of a successful delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deprovisioned;

/// Lifecycle state machine for instances.
pub struct InstanceManager {
    store: StateStore,
    config: Arc<BrokerConfig>,
    policy: Arc<dyn CredentialPolicy>,
    control_plane: Arc<dyn ControlPlane>,
    call_timeout: Duration,
}

impl InstanceManager {
    pub fn new(
        store: StateStore,
        config: Arc<BrokerConfig>,
        policy: Arc<dyn CredentialPolicy>,
        control_plane: Arc<dyn ControlPlane>,
    ) -> Self {
        let call_timeout = config.control_plane_timeout();
        Self {
            store,
            config,
            policy,
            control_plane,
            call_timeout,
        }
    }

    /// Build an `Instance` and populate it from the store.
    ///
    /// An unknown identity yields an unprovisioned instance, not an error.
    pub fn find(&self, instance_id: &str) -> BrokerResult<Instance> {
        let mut instance = Instance::new(instance_id);
        if let Some(parameters) = self.store.populate(&instance.key())? {
            instance.provisioned_with(parameters);
        }
        debug!(%instance_id, provisioned = instance.is_provisioned(), "instance found");
        Ok(instance)
    }

    /// Provision `instance` with `parameters`.
    ///
    /// Identical parameters on a provisioned instance are a no-op success;
    /// different ones are `InstanceAlreadyExists`.
    pub async fn create(
        &self,
        instance: &mut Instance,
        mut parameters: Parameters,
        mode: ClusterMode,
    ) -> BrokerResult<ProvisionOutcome> {
        let keys = &self.config.parameters;

        // Inject the derived database name before comparing or persisting.
        let database = match optional_string_param(&parameters, &keys.database)? {
            Some(database) => database.to_string(),
            None => {
                let name = self.policy.database_name(instance.id(), &parameters);
                parameters.insert(keys.database.clone(), Value::String(name.clone()));
                name
            }
        };

        if instance.is_provisioned() {
            return self.compare(instance, &parameters);
        }

        if mode == ClusterMode::New {
            return Err(BrokerError::Unsupported("creating a new cluster"));
        }

        let cluster = optional_string_param(&parameters, &keys.cluster)?
            .ok_or_else(|| BrokerError::MissingParameter(keys.cluster.clone()))?
            .to_string();

        let exists = with_timeout(self.call_timeout, self.control_plane.cluster_exists(&cluster)).await?;
        if !exists {
            return Err(BrokerError::ClusterNotFound(cluster));
        }

        let record = Record::Instance(InstanceRecord {
            instance_id: instance.id().to_string(),
            database: database.clone(),
            cluster: cluster.clone(),
            parameters: parameters.clone(),
            created_at: epoch_secs(),
        });

        match self.store.store(&record) {
            Ok(operation) => {
                instance.provisioned_with(parameters);
                info!(instance_id = %instance.id(), %cluster, %database, "instance created");
                Ok(ProvisionOutcome::Created { operation })
            }
            Err(StateError::Duplicate(_)) => {
                // Lost a race with a concurrent create; resolve against the winner.
                debug!(instance_id = %instance.id(), "concurrent create won the insert");
                match self.store.populate(&instance.key())? {
                    Some(stored) => {
                        instance.provisioned_with(stored);
                        self.compare(instance, &parameters)
                    }
                    None => Err(BrokerError::InstanceAlreadyExists(instance.id().to_string())),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the bookkeeping record of `instance`.
    ///
    /// The tenant database itself is left in place.
    // TODO: add a per-instance retain|drop policy and drop the database when
    // the policy says so and no other instance points at it.
    pub fn delete(&self, instance: &mut Instance) -> BrokerResult<Deprovisioned> {
        self.store.remove(&instance.key())?;
        instance.unprovisioned();
        info!(instance_id = %instance.id(), "instance deleted");
        Ok(Deprovisioned)
    }

    fn compare(&self, instance: &Instance, parameters: &Parameters) -> BrokerResult<ProvisionOutcome> {
        if instance.parameters() == parameters {
            debug!(instance_id = %instance.id(), "identical instance already exists");
            Ok(ProvisionOutcome::IdenticalAlreadyExists)
        } else {
            Err(BrokerError::InstanceAlreadyExists(instance.id().to_string()))
        }
    }
}
