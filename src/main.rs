use anyhow::Context;
use tracing_subscriber::EnvFilter;

use umoja_api::config::AppConfig;
use umoja_api::database::connection::open_store;
use umoja_api::routes::build_router;
use umoja_api::services::auth_service::JwtKeys;
use umoja_api::services::sms_service::sms_sender_from_config;
use umoja_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let store = open_store(&config)
        .await
        .context("failed to open the order store")?;
    let sms = sms_sender_from_config(&config.sms).context("failed to initialise SMS")?;
    tracing::info!("📱 SMS provider: {:?}", config.sms.provider);

    let jwt = JwtKeys::new(config.jwt_secret.clone(), config.jwt_ttl_hours);
    let app_state = AppState::new(store, sms, jwt);

    bootstrap_admin(&app_state, &config).await;

    let app = build_router(app_state);
    start_server(app, &config.bind_address()).await
}

async fn bootstrap_admin(state: &AppState, config: &AppConfig) {
    let (Some(phone), Some(password)) = (&config.admin_phone, &config.admin_password) else {
        tracing::info!("No ADMIN_PHONE/ADMIN_PASSWORD set, skipping admin bootstrap");
        return;
    };

    match state.auth().bootstrap_admin(phone, password).await {
        Ok(true) => tracing::info!("✅ Admin account created for {}", phone),
        Ok(false) => tracing::info!("Admin account {} already exists", phone),
        Err(e) => tracing::error!("❌ Failed to bootstrap admin account: {}", e),
    }
}

async fn start_server(app: axum::Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("🚀 Server starting on {}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
