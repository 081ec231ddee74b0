//! Tuition ledger API server.
//!
//! Main entry point for the ledger backend service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tuition_api::notifier::EmailNotifier;
use tuition_api::reminder::DueReminder;
use tuition_api::{AppState, create_router};
use tuition_core::cache::ViewCache;
use tuition_core::effects::EffectDispatcher;
use tuition_db::connect_with;
use tuition_db::repositories::{CommunicationLogRepository, PaymentRepository};
use tuition_shared::config::LogFormat;
use tuition_shared::{AppConfig, EmailService};

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tuition=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(config.logging.format);

    let db = connect_with(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .context("failed to connect to database")?;
    info!("Connected to database");

    let email_service = Arc::new(EmailService::new(config.email.clone()));
    info!(
        enabled = config.email.enabled,
        smtp_host = %config.email.smtp_host,
        smtp_port = %config.email.smtp_port,
        "Email service configured"
    );

    let views = ViewCache::with_config(config.cache.max_capacity, config.cache.ttl_secs);
    let dispatcher = EffectDispatcher::new(
        Arc::new(CommunicationLogRepository::new(db.clone())),
        Arc::new(EmailNotifier::new(email_service.clone())),
        Arc::new(views.clone()),
    );
    let tx_timeout = config.ledger.transaction_timeout();

    let reminder = if config.reminder.enabled {
        let (task, handle) = DueReminder::new(
            PaymentRepository::new(db.clone(), tx_timeout),
            email_service.clone(),
            &config.reminder,
        )
        .context("invalid reminder configuration")?;
        tokio::spawn(task.run());
        Some(handle)
    } else {
        info!("Due reminder disabled");
        None
    };

    let state = AppState {
        db: Arc::new(db),
        tx_timeout,
        dispatcher,
        views,
        email_service,
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await?;

    if let Some(handle) = reminder {
        handle.shutdown().await;
    }
    Ok(())
}
