use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::store::traits::OverrideStore;

pub fn create_router<S: OverrideStore + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Paginated, filtered listing
        .route("/service-overrides/list", post(handlers::list_overrides::<S>))
        // Inline create/update
        .route(
            "/service-overrides",
            post(handlers::create_override::<S>).put(handlers::update_override::<S>),
        )
        // Git-backed create/update
        .route(
            "/service-overrides/remote",
            post(handlers::create_remote_override::<S>)
                .put(handlers::update_remote_override::<S>),
        )
        .route(
            "/service-overrides/:identifier",
            delete(handlers::delete_override::<S>),
        )
}
