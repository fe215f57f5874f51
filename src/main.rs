use sensitrack::{
    app,
    config::{AppConfig, StoreBackend},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "sensitrack=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let (app_state, supervisor) = AppState::init(config.clone())?;

    // migrations run from the supervisor once the database answers
    if config.backend == StoreBackend::Memory {
        tracing::warn!("running on the in-memory store; data is lost on exit");
    }

    let result = app::serve(app::build_app(app_state), &config).await;

    if let Some(supervisor) = supervisor {
        supervisor.shutdown().await;
    }
    result
}
