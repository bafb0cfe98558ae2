//! REST surface served alongside the gateway socket.
//!
//! GET /health               — liveness probe
//! GET /avatars              — the selectable avatar catalog
//! GET /rooms/{id}           — room description with live occupancy
//! GET /rooms/{id}/members   — current roster

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use atrium_common::error::AtriumResult;
use atrium_common::models::{AvatarKind, RoomInfo, RoomMember, AVATAR_KINDS};

use crate::GatewayState;

pub fn router() -> Router<GatewayState> {
    Router::new()
        .route("/health", get(health))
        .route("/avatars", get(avatar_catalog))
        .route("/rooms/{room_id}", get(room_info))
        .route("/rooms/{room_id}/members", get(room_members))
}

async fn health(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "active_sessions": state.sessions.active_count().await,
    }))
}

#[derive(Serialize)]
struct AvatarEntry {
    kind: AvatarKind,
    label: &'static str,
    color: &'static str,
    asset: String,
}

async fn avatar_catalog() -> Json<Vec<AvatarEntry>> {
    Json(
        AVATAR_KINDS
            .iter()
            .map(|kind| {
                let cfg = kind.config();
                AvatarEntry {
                    kind: *kind,
                    label: cfg.label,
                    color: cfg.color,
                    asset: kind.asset_path(),
                }
            })
            .collect(),
    )
}

async fn room_info(
    State(state): State<GatewayState>,
    Path(room_id): Path<String>,
) -> AtriumResult<Json<RoomInfo>> {
    Ok(Json(state.observer().room_info(&room_id).await?))
}

async fn room_members(
    State(state): State<GatewayState>,
    Path(room_id): Path<String>,
) -> AtriumResult<Json<Vec<RoomMember>>> {
    // 404 on unknown rooms, and opens the read connection as a side effect.
    state.observer().occupancy(&room_id).await?;
    Ok(Json(state.observer().current_members(&room_id).await))
}
