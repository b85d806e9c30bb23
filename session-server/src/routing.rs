// session-server/src/routing.rs
use actix_web::{web, HttpRequest, HttpResponse, Error};
use actix_web_actors::ws;

use crate::actors::bridge_actor::WalletBridgeActor;
use crate::state::AppState;

/// Configure the wallet socket route
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/ws/wallet")
            .route(web::get().to(wallet_ws_route))
    );
}

/// WebSocket route for browser wallet bridges
async fn wallet_ws_route(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let bridge = WalletBridgeActor::new(
        state.config.clone(),
        state.directory.clone(),
        state.network.clone(),
    );

    ws::start(bridge, &req, stream)
}
