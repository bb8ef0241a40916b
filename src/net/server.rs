//! HTTP surface: WebSocket upgrade and team statistics
//!
//! One axum router serves `/ws` (origin-checked, capacity-capped upgrade
//! into the connection layer) and `/api/team-stats` (a read-lock peek at
//! the rosters).

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::game::constants::net as netc;
use crate::game::World;
use crate::net::client;
use crate::net::hub::Hub;
use crate::net::protocol::TeamCounts;

/// Shared handles threaded through every route
#[derive(Clone)]
pub struct AppState {
    pub world: Arc<World>,
    pub hub: Arc<Hub>,
}

pub fn router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/team-stats", get(team_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Browsers must come from our own host or a localhost dev client;
/// non-browser clients send no Origin and pass.
fn origin_allowed(headers: &HeaderMap) -> bool {
    let Some(origin) = headers.get("origin").and_then(|v| v.to_str().ok()) else {
        return true;
    };
    let origin_host = origin
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .split(':')
        .next()
        .unwrap_or_default();
    if origin_host == "localhost" || origin_host == "127.0.0.1" {
        return true;
    }
    let Some(host) = headers.get("host").and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let host_name = host.split(':').next().unwrap_or_default();
    origin_host == host_name
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(app): State<AppState>,
) -> Response {
    if !origin_allowed(&headers) {
        debug!("rejected upgrade: bad origin");
        return StatusCode::FORBIDDEN.into_response();
    }
    if app.hub.connection_count() >= netc::MAX_CONNECTIONS {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    ws.max_message_size(netc::MAX_FRAME_BYTES)
        .on_upgrade(move |socket| client::handle_socket(socket, app.world, app.hub))
}

async fn team_stats(State(app): State<AppState>) -> Json<TeamCounts> {
    let state = app.world.state.read();
    Json(TeamCounts::from_state(&state))
}
