//! Record types for the tenantdb state store.
//!
//! Instances and bindings are persisted as JSON. The identity descriptor
//! [`RecordKey`] is the only way to address a stored record.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Externally assigned identity of a service instance.
pub type InstanceId = String;

/// Identity of a binding, unique within its owning instance.
pub type BindingId = String;

/// Free-form request parameters.
///
/// `serde_json::Map` is ordered by key, so two maps compare equal whenever
/// they carry the same entries regardless of the order they arrived in.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

// ── Identity descriptor ───────────────────────────────────────────

/// Identity descriptor for a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// Matches the instance record only, never its bindings.
    Instance { instance_id: InstanceId },
    /// Exact match on both identities.
    Binding {
        instance_id: InstanceId,
        binding_id: BindingId,
    },
}

impl RecordKey {
    pub fn instance(instance_id: impl Into<InstanceId>) -> Self {
        RecordKey::Instance {
            instance_id: instance_id.into(),
        }
    }

    pub fn binding(instance_id: impl Into<InstanceId>, binding_id: impl Into<BindingId>) -> Self {
        RecordKey::Binding {
            instance_id: instance_id.into(),
            binding_id: binding_id.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Instance { instance_id } => write!(f, "instance/{instance_id}"),
            RecordKey::Binding {
                instance_id,
                binding_id,
            } => write!(f, "instance/{instance_id}/binding/{binding_id}"),
        }
    }
}

// ── Records ───────────────────────────────────────────────────────

/// Persisted state of a provisioned instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceRecord {
    pub instance_id: InstanceId,
    /// Resolved database name, duplicated out of `parameters` for inspection.
    pub database: String,
    /// Target cluster name.
    pub cluster: String,
    pub parameters: Parameters,
    /// Unix timestamp (seconds) of the first successful create.
    pub created_at: u64,
}

/// Persisted state of a provisioned binding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BindingRecord {
    pub instance_id: InstanceId,
    pub binding_id: BindingId,
    pub parameters: Parameters,
    /// Unix timestamp (seconds) of the successful bind.
    pub created_at: u64,
}

/// A record to insert.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Instance(InstanceRecord),
    Binding(BindingRecord),
}

impl Record {
    /// The identity descriptor this record will be stored under.
    pub fn key(&self) -> RecordKey {
        match self {
            Record::Instance(r) => RecordKey::instance(r.instance_id.clone()),
            Record::Binding(r) => RecordKey::binding(r.instance_id.clone(), r.binding_id.clone()),
        }
    }

    pub fn parameters(&self) -> &Parameters {
        match self {
            Record::Instance(r) => &r.parameters,
            Record::Binding(r) => &r.parameters,
        }
    }
}

/// Opaque handle returned by a successful insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordHandle(String);

impl RecordHandle {
    pub(crate) fn new(key: &RecordKey, created_at: u64) -> Self {
        Self(format!("{key}@{created_at}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current unix time in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
