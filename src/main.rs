use std::sync::Arc;

use tracing::{error, info};

use roomchat::{Config, RoomRegistry, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = roomchat::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        roomchat::logging::init_console_only(&config.logging.level);
    }

    info!("roomchat - multi-room chat server");
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    let registry = Arc::new(RoomRegistry::with_queue_capacity(
        config.server.queue_capacity,
    ));
    let server = match WebServer::new(&config.server, &config.web, registry) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to create server: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}
