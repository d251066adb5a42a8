use anyhow::{Context, Result};
use clap::Parser;
use provider_client::{GeminiClient, GroqClient};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use relay::config::Args;
use relay::event_log::EventLog;
use relay::uploads::UploadStore;
use relay::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    if let Err(e) = dotenv::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    let args = Args::parse();
    tracing::info!("args: {:?}", &args);

    let groq = Arc::new(GroqClient::new(args.groq_settings(), args.request_timeout())?);
    let gemini = Arc::new(GeminiClient::new(
        args.gemini_settings(),
        args.request_timeout(),
    )?);
    tracing::info!("Providers ready: {:?}, {:?}", groq, gemini);

    let events = EventLog::open(&args.log_dir)
        .await
        .with_context(|| format!("creating log directory {}", args.log_dir.display()))?;
    let uploads = UploadStore::open(&args.uploads_dir)
        .await
        .with_context(|| format!("creating uploads directory {}", args.uploads_dir.display()))?;

    let state = AppState {
        chat: groq.clone(),
        transcriber: groq,
        vision: gemini,
        events,
        uploads,
        provider_permits: Arc::new(Semaphore::new(args.max_concurrent_requests)),
        static_dir: args.static_dir.clone(),
        max_upload_bytes: args.max_upload_bytes,
    };
    let app = build_router(state);

    tracing::info!("Listening on {}", &args.address);
    let listener = TcpListener::bind(&args.address)
        .await
        .with_context(|| format!("binding {}", args.address))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server shutdown");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Error listening for Ctrl-C: {:?}", e);
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
                tracing::error!("Error listening for SIGTERM: {:?}", e);
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
    tracing::info!("Shutdown signal received, draining connections");
}
