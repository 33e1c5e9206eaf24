use axum::serve;
use log::info;
use service_overrides::api::routes::create_router;
use service_overrides::config::AppConfig;
use service_overrides::seed;
use service_overrides::store::InMemoryOverrideStore;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load()?;
    info!(
        "configuration loaded: server={}:{}, override type {}",
        config.server.host,
        config.server.port,
        config.overrides.override_type.as_str()
    );

    let store = Arc::new(InMemoryOverrideStore::new());

    // Load seed data for demonstration (optional)
    if config.overrides.load_seed_data {
        info!("loading seed data...");
        seed::load_seed_data(&*store, &config.project_scope()).await?;
        info!("seed data loaded: {} overrides", store.records().len());
    }

    let app = create_router().with_state(store);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    info!("service override API running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
