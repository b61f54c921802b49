mod api;
mod middleware;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::{AuthState, RateLimitState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(perilmail_core::load_config_from_env()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = perilmail_db::PoolConfig::from_config(&config);
    let pool = perilmail_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = perilmail_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "database migrations applied");
    }

    let usgs = Arc::new(perilmail_usgs::UsgsClient::new(
        config.http_request_timeout_secs,
        &config.http_user_agent,
    )?);
    let gemini = match config.gemini_api_key.as_deref() {
        Some(key) => Some(perilmail_gemini::GeminiClient::new(key)?),
        None => {
            tracing::warn!("GEMINI_API_KEY not set; email generation disabled");
            None
        }
    };
    let mailer = match config.sendgrid_api_key.as_deref() {
        Some(key) => Some(perilmail_sendgrid::SendGridClient::new(
            key,
            &config.email_from_address,
            &config.email_from_name,
        )?),
        None => {
            tracing::warn!("SENDGRID_API_KEY not set; email dispatch disabled");
            None
        }
    };

    let auth = AuthState::from_env(matches!(
        config.env,
        perilmail_core::Environment::Development
    ))?;
    let rate_limit = RateLimitState::new(
        config.rate_limit_max_requests,
        Duration::from_secs(config.rate_limit_window_secs),
    );

    let bind_addr = config.bind_addr;
    let app = build_app(
        AppState {
            pool,
            config: Arc::clone(&config),
            usgs,
            gemini,
            mailer,
        },
        auth,
        rate_limit,
    );

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "perilmail server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
