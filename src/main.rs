use pingu_bot::config::AppConfig;
use pingu_bot::error::Result;
use pingu_bot::telemetry;
use pingu_bot::webhook::{WebhookState, app};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    telemetry::init_logging();
    telemetry::install_propagator();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export BASE_URL=https://bot.example.com");
        eprintln!("  export LINE_CHANNEL_SECRET=... LINE_CHANNEL_ACCESS_TOKEN=...");
        std::process::exit(1);
    });

    eprintln!("🐧 Pingu Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Listen: http://{}", config.listen_address());
    eprintln!("   Callback: POST /callback, POST /line");
    eprintln!("   Base URL: {}", config.base_url);
    eprintln!("   Static: {}", config.static_dir.display());

    // ── Webhook core ─────────────────────────────────────────────────────
    let state = WebhookState::from_config(&config)?;
    let router = app(state, &config.static_dir);

    // ── HTTP server ──────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(config.listen_address()).await?;
    tracing::info!(address = %config.listen_address(), "Webhook server started");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Webhook server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
