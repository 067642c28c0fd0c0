//! In-memory lifecycle entities.
//!
//! An [`Instance`] or [`Binding`] is built fresh on every lookup and only
//! lives for one operation; durable state belongs to the `StateStore`.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use tenantdb_core::ParameterKeys;
use tenantdb_state::{BindingId, InstanceId, Parameters, RecordKey};

use crate::error::{BrokerError, BrokerResult};

/// Authentication database the control plane creates users against.
pub const AUTH_DATABASE: &str = "admin";

/// Read an optional string parameter. Missing, null and empty values are
/// absent; any other non-string value is rejected.
pub(crate) fn optional_string_param<'a>(
    parameters: &'a Parameters,
    key: &str,
) -> BrokerResult<Option<&'a str>> {
    match parameters.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(BrokerError::InvalidParameter(key.to_string())),
    }
}

/// Read a non-empty string parameter.
pub(crate) fn string_param<'a>(parameters: &'a Parameters, key: &str) -> Option<&'a str> {
    parameters
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

// ── Instance ──────────────────────────────────────────────────────

/// A tenant database on a shared cluster.
#[derive(Debug, Clone)]
pub struct Instance {
    id: InstanceId,
    parameters: Parameters,
    provisioned: bool,
}

impl Instance {
    /// A new, unprovisioned instance with no parameters.
    pub fn new(id: impl Into<InstanceId>) -> Self {
        Self {
            id: id.into(),
            parameters: Parameters::new(),
            provisioned: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// True iff the identity is present in the state store.
    pub fn is_provisioned(&self) -> bool {
        self.provisioned
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::instance(self.id.clone())
    }

    pub fn cluster<'a>(&'a self, keys: &ParameterKeys) -> Option<&'a str> {
        string_param(&self.parameters, &keys.cluster)
    }

    pub fn database<'a>(&'a self, keys: &ParameterKeys) -> Option<&'a str> {
        string_param(&self.parameters, &keys.database)
    }

    pub(crate) fn provisioned_with(&mut self, parameters: Parameters) {
        self.parameters = parameters;
        self.provisioned = true;
    }

    pub(crate) fn unprovisioned(&mut self) {
        self.provisioned = false;
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.parameters == other.parameters
    }
}

// ── Binding ───────────────────────────────────────────────────────

/// Credentials granting an application access to an instance's database.
#[derive(Debug, Clone)]
pub struct Binding {
    id: BindingId,
    instance: Instance,
    parameters: Parameters,
    provisioned: bool,
}

impl Binding {
    /// A new, unprovisioned binding owned by `instance`.
    pub fn new(id: impl Into<BindingId>, instance: Instance) -> Self {
        Self {
            id: id.into(),
            instance,
            parameters: Parameters::new(),
            provisioned: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn is_provisioned(&self) -> bool {
        self.provisioned
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::binding(self.instance.id.clone(), self.id.clone())
    }

    pub(crate) fn set_parameters(&mut self, parameters: Parameters) {
        self.parameters = parameters;
    }

    pub(crate) fn provisioned_with(&mut self, parameters: Parameters) {
        self.parameters = parameters;
        self.provisioned = true;
    }

    pub(crate) fn unprovisioned(&mut self) {
        self.provisioned = false;
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.instance.id == other.instance.id
    }
}

impl Eq for Binding {}

// ── Credentials ───────────────────────────────────────────────────

/// Secrets handed out once, on the bind that creates the binding.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub database: String,
    pub uri: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

/// A role granted on one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleGrant {
    pub database_name: String,
    pub role_name: String,
}

impl RoleGrant {
    pub fn new(database_name: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            role_name: role_name.into(),
        }
    }
}

/// Database user as sent to the control plane.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUser {
    pub username: String,
    pub password: String,
    pub database_name: String,
    pub roles: Vec<RoleGrant>,
}

impl DatabaseUser {
    pub fn new(credentials: &Credentials, roles: Vec<RoleGrant>) -> Self {
        Self {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            database_name: AUTH_DATABASE.to_string(),
            roles,
        }
    }
}

impl fmt::Debug for DatabaseUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database_name", &self.database_name)
            .field("roles", &self.roles)
            .finish()
    }
}
