//! WebSocket-Endpunkt `GET /ws` fuer Browser-Clients
//!
//! Der Router muss mit `into_make_service_with_connect_info::<SocketAddr>()`
//! ausgeliefert werden, damit die Peer-Adresse verfuegbar ist.

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

use crate::connection::ClientConnection;
use crate::server_state::SignalingState;
use crate::transport::WsTransport;

#[derive(Clone)]
struct WsState {
    signaling: Arc<SignalingState>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Axum-Router fuer den `/ws`-Endpunkt
pub fn ws_router(signaling: Arc<SignalingState>, shutdown_rx: watch::Receiver<bool>) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(WsState {
        signaling,
        shutdown_rx,
    })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<WsState>,
) -> Response {
    if !state.signaling.hat_kapazitaet() {
        tracing::warn!(
            peer = %peer,
            max = state.signaling.config.max_verbindungen,
            "Server voll – WebSocket abgelehnt"
        );
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let max_frame = state.signaling.config.max_frame_groesse;
    ws.max_message_size(max_frame)
        .on_upgrade(move |socket| async move {
            let verbindung = ClientConnection::neu(state.signaling, peer.to_string());
            verbindung
                .verarbeiten(WsTransport::neu(socket), state.shutdown_rx)
                .await;
        })
}
