//! tenantdb-api — service-broker REST API.
//!
//! Thin axum layer over [`tenantdb_lifecycle::Broker`]. Handlers decode the
//! request, call one dispatcher verb and map the outcome to a status code.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/health` | Liveness |
//! | GET | `/v2/catalog` | Service offering and plans |
//! | PUT | `/v2/service_instances/{instance_id}` | Provision |
//! | GET | `/v2/service_instances/{instance_id}` | Fetch instance |
//! | PATCH | `/v2/service_instances/{instance_id}` | Update (not implemented) |
//! | DELETE | `/v2/service_instances/{instance_id}` | Deprovision |
//! | GET | `/v2/service_instances/{instance_id}/last_operation` | Poll (not implemented) |
//! | PUT | `/v2/service_instances/{instance_id}/service_bindings/{binding_id}` | Bind |
//! | DELETE | `/v2/service_instances/{instance_id}/service_bindings/{binding_id}` | Unbind |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, put};
use tenantdb_lifecycle::Broker;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub broker: Arc<Broker>,
}

/// Build the complete API router.
pub fn build_router(broker: Arc<Broker>) -> Router {
    let state = ApiState { broker };

    let v2 = Router::new()
        .route("/catalog", get(handlers::catalog))
        .route(
            "/service_instances/{instance_id}",
            put(handlers::provision)
                .get(handlers::fetch_instance)
                .patch(handlers::update)
                .delete(handlers::deprovision),
        )
        .route(
            "/service_instances/{instance_id}/last_operation",
            get(handlers::last_operation),
        )
        .route(
            "/service_instances/{instance_id}/service_bindings/{binding_id}",
            put(handlers::bind).delete(handlers::unbind),
        )
        .with_state(state);

    Router::new()
        .nest("/v2", v2)
        .route("/health", get(handlers::health))
}
