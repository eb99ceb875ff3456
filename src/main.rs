// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use car_detection_node::{
    api::{start_server, AppState},
    config::NodeConfig,
    vision::DetectorManager,
};
use std::{env, sync::Arc};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚗 Starting Car Detection Node...\n");
    println!("📦 BUILD VERSION: {}", car_detection_node::version::VERSION);
    println!();

    let config = NodeConfig::from_env();

    println!("🧠 Loading detection model {}...", config.model_id);
    let detector = Arc::new(DetectorManager::load(&config).await);
    if detector.is_ready() {
        println!("✅ Detection model loaded");
    } else {
        println!("⚠️  Detection model unavailable; detection requests will get 'Model not loaded'");
    }

    let api_port = config.api_port;
    let state = AppState::new(detector);

    println!("\nConfiguration:");
    println!("Model:          {}", config.model_id);
    println!("Threshold:      {}", config.confidence_threshold);
    println!("API Port:       {}", api_port);
    println!("\nAPI Endpoints:");
    println!("  Health:       http://localhost:{}/", api_port);
    println!("  Model info:   http://localhost:{}/model-info", api_port);
    println!(
        "  Detect:       POST http://localhost:{}/detect-car",
        api_port
    );
    println!(
        "  Detect (bool): POST http://localhost:{}/detect-car-simple",
        api_port
    );
    println!("\nTest with curl:");
    println!(
        "  curl -X POST http://localhost:{}/detect-car \\",
        api_port
    );
    println!("    -F 'file=@street.jpg;type=image/jpeg'");
    println!("\nPress Ctrl+C to shutdown...\n");

    let server = tokio::spawn(async move {
        if let Err(e) = start_server(state, api_port).await {
            tracing::error!("API server terminated: {:#}", e);
        }
    });

    // Wait for shutdown signal
    signal::ctrl_c().await?;

    println!("\n⏹️  Shutting down...");
    server.abort();
    println!("👋 Goodbye!");
    Ok(())
}
