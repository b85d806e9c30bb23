// Session Server - main.rs
use actix_web::{web, App, HttpServer};
use common::{setup_tracing, Config};
use session_server::telemetry::{HttpChannel, TelemetryChannel};
use session_server::{api, routing, static_files, AppState};
use std::io;
use std::path::Path;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Setup tracing
    setup_tracing();

    // Load and validate configuration
    let config = Config::from_env();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(io::Error::new(io::ErrorKind::InvalidInput, e.to_string()));
    }

    tracing::info!("Project ID: {}", config.project_id);

    let network = HttpChannel::from_config(&config)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    tracing::info!("Telemetry endpoint: {} (enabled: {})", network.endpoint(), network.is_available());

    // Save address before moving config into the shared state
    let server_addr = config.server_addr.clone();
    let static_config = config.static_files.clone();
    let serve_static = Path::new(&static_config.path).is_dir();
    if !serve_static {
        tracing::warn!("Static files directory {} not found, serving API only", static_config.path);
    }

    let state = web::Data::new(AppState::new(config, Arc::new(network)));

    tracing::info!("Starting Session Server on {}", server_addr);

    HttpServer::new(move || {
        let static_config = static_config.clone();
        App::new()
            .app_data(state.clone())
            .configure(api::configure)
            .configure(routing::routes)
            .configure(move |cfg| {
                if serve_static {
                    static_files::configure(cfg, static_config);
                }
            })
    })
    .bind(&server_addr)?
    .run()
    .await
}
