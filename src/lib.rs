pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export errors
pub use error::{format_error_message, FieldError, OverrideError, StoreError};

// Export the editing commands and their state
pub use logic::{
    affordances, Affordances, DeleteConfirmation, DiscardOutcome, DiscardRowMeta, EditLock,
    EditSession, MutationKind, Notice, NoticeLevel, OverrideContext, OverrideListStore,
    OverrideListing, OverrideState, PendingRemoteSave, PermissionGate, PersistenceGateway,
    ReconcileStrategy, ReconciliationEngine, RowEditor, SaveOutcome, SaveRequest, SectionEditor,
    StoreTarget,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{HttpOverrideStore, InMemoryOverrideStore, OverrideStore, StoreCall};

/// Serves the override API over an in-memory store built from the loaded
/// configuration
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = crate::config::AppConfig::load()?;

    let store = Arc::new(InMemoryOverrideStore::new());
    if config.overrides.load_seed_data {
        seed::load_seed_data(&*store, &config.project_scope()).await?;
    }

    let app = crate::api::routes::create_router().with_state(store);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("service override API listening on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
