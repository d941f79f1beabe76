//! Main Entrypoint for the CoWriter Interaction Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Building the controller, its collaborators and the command fan-out.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and shutting down with the interaction.

use anyhow::Context;
use clap::Parser;
use cowriter_core::event::Event;
use cowriter_interaction::{config::Config, router::create_router, runtime::Runtime};
use std::net::SocketAddr;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "interaction", version, about = "Handwriting tutoring interaction controller")]
struct Args {
    /// Word to write as soon as the interaction starts.
    word: Option<String>,
}

/// Resolves on `Ctrl+C` or once the interaction has ended.
async fn shutdown_signal(mut ended: watch::Receiver<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };
    tokio::select! {
        _ = ctrl_c => info!("Received shutdown signal. Shutting down gracefully..."),
        _ = ended.wait_for(|ended| *ended) => info!("Interaction ended. Shutting down..."),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Building the interaction runtime...");

    // --- 3. Build Runtime ---
    let bind_address = config.bind_address;
    info!(
        language = ?config.language,
        robot_connected = config.robot_connected,
        robot_writing = config.robot_writing,
        handedness = ?config.handedness,
        "Interaction configured."
    );
    let runtime = Runtime::new(config);
    let app_state = runtime.state();

    if let Some(word) = args.word {
        info!(%word, "Queueing word from the command line.");
        app_state.ingress.submit(Event::WordRequested(word)).await;
    }
    let running = runtime.spawn();

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(%bind_address, "Starting server...");
    let listener = tokio::net::TcpListener::bind(bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(running.ended.clone()))
    .await?;

    running.controller.abort();
    running.fan_out.abort();
    info!("Server has shut down.");
    Ok(())
}
