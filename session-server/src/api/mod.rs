// session-server/src/api/mod.rs
pub mod sessions;

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api")
            .service(sessions::api_index)
            .service(sessions::list_sessions)
            .service(sessions::session_status)
            .service(sessions::session_diagnostics)
    );
}
