// session-server/src/static_files.rs
use actix_files::{Files, NamedFile};
use actix_web::{web, HttpRequest, HttpResponse, Result, Error};
use common::StaticFilesConfig;
use std::path::PathBuf;

// Serves the index file for client-side routes
async fn spa_index(req: HttpRequest, config: web::Data<StaticFilesConfig>) -> Result<HttpResponse, Error> {
    // Don't serve index.html for API or WebSocket routes
    let path = req.path();
    if path.starts_with("/api/") || path.starts_with("/ws/") {
        return Ok(HttpResponse::NotFound().finish());
    }

    let index_path = PathBuf::from(&config.path).join(&config.index);
    let file = NamedFile::open(index_path)?;
    Ok(file.into_response(&req))
}

/// Serve the browser client with SPA fallback
pub fn configure(cfg: &mut web::ServiceConfig, config: StaticFilesConfig) {
    cfg.app_data(web::Data::new(config.clone()))
        .service(
            Files::new("/", &config.path)
                .index_file(config.index.clone())
                .prefer_utf8(true)
                .use_etag(true)
                .use_last_modified(true)
                .default_handler(web::route().to(spa_index)),
        );
}
