//! CSPI Backend Service
//!
//! Main entry point for the composite Bitcoin sentiment engine.
//! This service provides:
//! - On-demand collection cycles over six market indicators
//! - WebSocket feed for dashboard clients

use cspi_backend::websocket::WebSocketServer;
use cspi_backend::{build_service, AppConfig, AppError, AppResult};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    // Initialize tracing/logging with config
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("cspi_backend={},tokio_tungstenite=warn", config.log_level).into()
    });
    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           CSPI Backend Service Starting                   ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("Relay routes: {}", config.fetch.relay_routes.len());
    info!(
        "Cache: {}s TTL, {} entries",
        config.cache.ttl_secs, config.cache.capacity
    );

    // =========================================================================
    // ENGINE INITIALIZATION
    // =========================================================================
    let service = build_service(&config)?;
    info!("✓ Collectors and market state initialized");

    if config.refresh_on_start {
        let report = service.collect_all().await?;
        if report.success {
            info!("✓ Initial collection cycle complete");
        } else {
            warn!(
                "Initial collection cycle failed: {}",
                report.error.unwrap_or_default()
            );
        }
    }

    // =========================================================================
    // START SERVERS
    // =========================================================================
    let ws_handle = if let Some(ws_port) = config.ws_port {
        let ws_addr: SocketAddr = format!("0.0.0.0:{}", ws_port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid WebSocket address: {}", e)))?;

        info!("Starting WebSocket server on {}...", ws_addr);

        let listener = TcpListener::bind(ws_addr).await.map_err(|e| {
            AppError::Message(format!("Failed to bind WebSocket server: {}", e))
        })?;

        let ws_server = WebSocketServer::new(service.clone());
        let handle = tokio::spawn(ws_server.serve(listener));

        info!("✓ WebSocket server started on {}", ws_addr);
        Some(handle)
    } else {
        warn!("WS_PORT not configured - WebSocket server not started");
        None
    };

    // =========================================================================
    // READY
    // =========================================================================
    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           CSPI Backend Service Ready!                     ║");
    info!("╠══════════════════════════════════════════════════════════╣");
    if let Some(ws_port) = config.ws_port {
        info!("║  WebSocket:    0.0.0.0:{}                              ║", ws_port);
    }
    info!("║  Environment:  {}                                    ║", config.environment);
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = async {
            if let Some(handle) = ws_handle {
                handle.await.ok();
            } else {
                // Never completes if WebSocket is not running
                futures::future::pending::<()>().await;
            }
        } => {
            error!("WebSocket server exited unexpectedly");
        }
    }

    info!("CSPI backend service shutdown complete");
    Ok(())
}
