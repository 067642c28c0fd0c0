//! tenantdb-state — bookkeeping store for the tenantdb broker.
//!
//! Backed by [redb](https://docs.rs/redb), records which service instances
//! and bindings the broker has provisioned and with which parameters. It is
//! the sole source of truth for "does this identity already exist".
//!
//! # Architecture
//!
//! Records are JSON-serialized into redb's `&[u8]` value columns. Instances
//! are keyed by their identity; bindings by the `(instance, binding)` tuple,
//! so a binding lookup is always scoped to its owning instance.
//!
//! Inserts check for an existing key inside the same write transaction.
//! redb serializes write transactions, which turns the key into a uniqueness
//! constraint: of two racing inserts for one identity exactly one commits.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
