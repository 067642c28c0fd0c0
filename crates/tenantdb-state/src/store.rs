//! StateStore — redb-backed bookkeeping for tenantdb.
//!
//! Exposes the three primitives the lifecycle managers rely on:
//! `populate` (exact lookup, absence is `None`), `store` (insert guarded by
//! the key uniqueness constraint) and `remove` (exact single-record delete).
//! The store supports both on-disk and in-memory backends (the latter for
//! testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create both tables if they don't exist yet.
    ///
    /// The table keys are the uniqueness constraints, so this is also where
    /// the "indexes" come into existence.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(INSTANCES).map_err(map_err!(Table))?;
        txn.open_table(BINDINGS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Contract ───────────────────────────────────────────────────

    /// Look up the parameters stored under `key`.
    ///
    /// `None` means the identity is not provisioned. An instance key never
    /// matches a binding record.
    pub fn populate(&self, key: &RecordKey) -> StateResult<Option<Parameters>> {
        let parameters = match key {
            RecordKey::Instance { instance_id } => {
                self.get_instance(instance_id)?.map(|r| r.parameters)
            }
            RecordKey::Binding {
                instance_id,
                binding_id,
            } => self.get_binding(instance_id, binding_id)?.map(|r| r.parameters),
        };
        debug!(%key, found = parameters.is_some(), "populate");
        Ok(parameters)
    }

    /// Insert a new record.
    ///
    /// Fails with [`StateError::Duplicate`] if the key is already present;
    /// the existence check and the insert run in one write transaction.
    pub fn store(&self, record: &Record) -> StateResult<RecordHandle> {
        let key = record.key();
        let (value, created_at) = match record {
            Record::Instance(r) => (
                serde_json::to_vec(r).map_err(map_err!(Serialize))?,
                r.created_at,
            ),
            Record::Binding(r) => (
                serde_json::to_vec(r).map_err(map_err!(Serialize))?,
                r.created_at,
            ),
        };

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let duplicate = match &key {
            RecordKey::Instance { instance_id } => {
                let mut table = txn.open_table(INSTANCES).map_err(map_err!(Table))?;
                if table
                    .get(instance_id.as_str())
                    .map_err(map_err!(Read))?
                    .is_some()
                {
                    true
                } else {
                    table
                        .insert(instance_id.as_str(), value.as_slice())
                        .map_err(map_err!(Write))?;
                    false
                }
            }
            RecordKey::Binding {
                instance_id,
                binding_id,
            } => {
                let mut table = txn.open_table(BINDINGS).map_err(map_err!(Table))?;
                let k = (instance_id.as_str(), binding_id.as_str());
                if table.get(k).map_err(map_err!(Read))?.is_some() {
                    true
                } else {
                    table.insert(k, value.as_slice()).map_err(map_err!(Write))?;
                    false
                }
            }
        };

        if duplicate {
            txn.abort().map_err(map_err!(Transaction))?;
            debug!(%key, "store rejected duplicate key");
            return Err(StateError::Duplicate(key.to_string()));
        }

        txn.commit()
            .map_err(|e| StateError::Store(format!("{key}: {e}")))?;
        debug!(%key, "record stored");
        Ok(RecordHandle::new(&key, created_at))
    }

    /// Delete exactly the record stored under `key`.
    ///
    /// Fails with `RemoveInstance` / `RemoveBinding` when nothing was removed.
    pub fn remove(&self, key: &RecordKey) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let removed = match key {
            RecordKey::Instance { instance_id } => {
                let mut table = txn.open_table(INSTANCES).map_err(map_err!(Table))?;
                table
                    .remove(instance_id.as_str())
                    .map_err(map_err!(Write))?
                    .is_some()
            }
            RecordKey::Binding {
                instance_id,
                binding_id,
            } => {
                let mut table = txn.open_table(BINDINGS).map_err(map_err!(Table))?;
                table
                    .remove((instance_id.as_str(), binding_id.as_str()))
                    .map_err(map_err!(Write))?
                    .is_some()
            }
        };

        if !removed {
            txn.abort().map_err(map_err!(Transaction))?;
            return Err(match key {
                RecordKey::Instance { instance_id } => {
                    StateError::RemoveInstance(instance_id.clone())
                }
                RecordKey::Binding { binding_id, .. } => {
                    StateError::RemoveBinding(binding_id.clone())
                }
            });
        }

        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "record removed");
        Ok(())
    }

    // ── Typed reads ────────────────────────────────────────────────

    /// Get the full instance record.
    pub fn get_instance(&self, instance_id: &str) -> StateResult<Option<InstanceRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(INSTANCES).map_err(map_err!(Table))?;
        match table.get(instance_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: InstanceRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Get the full binding record.
    pub fn get_binding(
        &self,
        instance_id: &str,
        binding_id: &str,
    ) -> StateResult<Option<BindingRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(BINDINGS).map_err(map_err!(Table))?;
        match table.get((instance_id, binding_id)).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: BindingRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// List all instance records.
    pub fn list_instances(&self) -> StateResult<Vec<InstanceRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(INSTANCES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: InstanceRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }

    /// List the bindings owned by one instance.
    pub fn list_bindings_for_instance(&self, instance_id: &str) -> StateResult<Vec<BindingRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(BINDINGS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().0 == instance_id {
                let record: BindingRecord =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(record);
            }
        }
        Ok(results)
    }
}
