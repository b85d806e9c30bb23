// session-server/src/api/sessions.rs
use actix::Addr;
use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;

use crate::actors::flow_actor::{GetDiagnostics, GetSnapshot, SignatureFlowActor};
use crate::state::AppState;

#[get("/")]
pub async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "Wallet Session Bridge API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// Number of live browser sessions
#[get("/sessions")]
pub async fn list_sessions(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "sessions": state.directory.len()
    }))
}

// Current snapshot of one session
#[get("/sessions/{client_id}/status")]
pub async fn session_status(
    path: web::Path<(String,)>,
    state: web::Data<AppState>,
) -> impl Responder {
    let flow = match lookup(&path.0, &state) {
        Ok(flow) => flow,
        Err(response) => return response,
    };

    match flow.send(GetSnapshot).await {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot),
        Err(e) => {
            tracing::error!("Error retrieving session status: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

// Snapshot plus identifiers and configuration checks for troubleshooting
#[get("/sessions/{client_id}/diagnostics")]
pub async fn session_diagnostics(
    path: web::Path<(String,)>,
    state: web::Data<AppState>,
) -> impl Responder {
    let flow = match lookup(&path.0, &state) {
        Ok(flow) => flow,
        Err(response) => return response,
    };

    match flow.send(GetDiagnostics).await {
        Ok(diagnostics) => HttpResponse::Ok().json(diagnostics),
        Err(e) => {
            tracing::error!("Error retrieving session diagnostics: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

fn lookup(client_id: &str, state: &AppState) -> Result<Addr<SignatureFlowActor>, HttpResponse> {
    let client_id = Uuid::parse_str(client_id).map_err(|_| {
        HttpResponse::BadRequest().json(json!({
            "error": "Invalid client ID format"
        }))
    })?;

    state.directory.get(&client_id).ok_or_else(|| {
        HttpResponse::NotFound().json(json!({
            "error": "Session not found"
        }))
    })
}
