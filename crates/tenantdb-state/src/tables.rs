//! redb table definitions for the tenantdb state store.
//!
//! Values are JSON-serialized records. The key of each table is the
//! uniqueness constraint for that record kind.

use redb::TableDefinition;

/// Instance records keyed by instance identity.
pub const INSTANCES: TableDefinition<&str, &[u8]> = TableDefinition::new("instances");

/// Binding records keyed by `(instance identity, binding identity)`.
pub const BINDINGS: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("bindings");
