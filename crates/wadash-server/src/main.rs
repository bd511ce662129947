mod api;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use wadash_analytics::DataRoot;
use wadash_notify::{Mailer, Notifier};

use crate::{
    api::{build_app, AppState},
    middleware::{AuthState, RateLimitState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(wadash_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = wadash_db::PoolConfig::from_app_config(&config);
    let pool = wadash_db::connect_pool_lazy(&config.database_url, pool_config)?;
    match wadash_db::run_migrations(&pool).await {
        Ok(applied) => tracing::info!(applied, "migrations up to date"),
        Err(e) => tracing::error!(error = %e, "migrations failed; database routes will be degraded"),
    }

    let mailer = Mailer::from_config(config.smtp.as_ref())?;
    if mailer.is_log_only() {
        tracing::warn!("WADASH_SMTP_HOST not set; notifications will only be logged");
    }
    let notifier = Notifier::new(
        mailer,
        config.email_list_path.clone(),
        config.admin_email.clone(),
    );

    let auth = AuthState::from_env(matches!(config.env, wadash_core::Environment::Development))?;
    let rate_limit = RateLimitState::per_minute(config.rate_limit_per_minute);
    let state = AppState {
        pool,
        data: DataRoot::new(config.data_root.clone()),
        notifier: Arc::new(notifier),
        config: Arc::clone(&config),
    };
    let app = build_app(state, auth, rate_limit);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, data_root = %config.data_root.display(), "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
