//! # atrium-gateway
//!
//! Real-time WebSocket gateway for Atrium. Handles:
//! - Client connections with an identify handshake
//! - Room join/leave through the presence coordinator
//! - Presence delta dispatch for joined rooms
//! - Heartbeat/keepalive
//!
//! The gateway is the UI boundary: clients never touch the transport
//! directly. Each socket gets its own coordinator (one user agent each); a
//! shared read-only coordinator backs the REST surface.

pub mod protocol;
pub mod routes;
pub mod session;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use atrium_common::config::PresenceConfig;
use atrium_common::error::AtriumError;
use atrium_common::models::AppUser;
use atrium_common::validation::{validate_display_name, validate_request};
use atrium_presence::{
    ChannelClient, DeltaSubscription, EventLog, PresenceCoordinator, PresenceTransport,
    RoomRegistry,
};
use protocol::GatewayMessage;
use session::SessionManager;

const HEARTBEAT_INTERVAL_MS: u64 = 45_000;
const DIRECT_BUFFER: usize = 256;

/// Gateway state.
#[derive(Clone)]
pub struct GatewayState {
    pub registry: Arc<RoomRegistry>,
    pub transport: Arc<dyn PresenceTransport>,
    pub sessions: Arc<SessionManager>,
    pub presence: PresenceConfig,
    /// Read-only coordinator backing the REST surface. Never publishes.
    observer: PresenceCoordinator,
}

impl GatewayState {
    pub fn new(
        registry: Arc<RoomRegistry>,
        transport: Arc<dyn PresenceTransport>,
        presence: PresenceConfig,
    ) -> Self {
        let observer = PresenceCoordinator::new(
            registry.clone(),
            ChannelClient::new(transport.clone(), presence.connect_timeout()),
        );
        Self {
            registry,
            transport,
            sessions: Arc::new(SessionManager::new()),
            presence,
            observer,
        }
    }

    pub fn observer(&self) -> &PresenceCoordinator {
        &self.observer
    }

    /// A fresh coordinator for one connected user agent.
    fn agent(&self) -> PresenceCoordinator {
        PresenceCoordinator::new(
            self.registry.clone(),
            ChannelClient::new(self.transport.clone(), self.presence.connect_timeout()),
        )
    }
}

/// Build the gateway router: the WebSocket endpoint plus the REST surface.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/gateway", get(ws_handler))
        .merge(routes::router())
        .with_state(state)
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

fn error_frame(e: &AtriumError) -> GatewayMessage {
    GatewayMessage::Error {
        code: e.error_code().to_string(),
        message: e.to_string(),
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(socket: WebSocket, state: GatewayState) {
    let (mut sender, mut receiver) = socket.split();

    let session_id = uuid::Uuid::new_v4().to_string();

    // Send Hello immediately to prompt the client to Identify
    let hello = GatewayMessage::Hello {
        heartbeat_interval: HEARTBEAT_INTERVAL_MS,
    };
    if sender
        .send(Message::Text(serde_json::to_string(&hello).unwrap().into()))
        .await
        .is_err()
    {
        return;
    }

    // Direct-send channel: receive loop and delta tasks → sender task
    let (direct_tx, mut direct_rx) = mpsc::channel::<GatewayMessage>(DIRECT_BUFFER);

    let send_task = tokio::spawn(async move {
        while let Some(frame) = direct_rx.recv().await {
            let Ok(text) = serde_json::to_string(&frame) else {
                continue;
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // ── Per-connection state ─────────────────────────────────────────────────
    let coordinator = state.agent();
    let activity = Arc::new(Mutex::new(EventLog::new(state.presence.event_log_capacity)));
    let mut identified: Option<AppUser> = None;
    // room_id → live delta subscription; the keys are the rooms this
    // session has joined. Dropping a guard removes the listener.
    let mut subscriptions: HashMap<String, DeltaSubscription> = HashMap::new();

    // ── Receive loop ─────────────────────────────────────────────────────────
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                let Ok(frame) = serde_json::from_str::<GatewayMessage>(&text) else {
                    continue;
                };
                match frame {
                    GatewayMessage::Identify { profile } => {
                        let valid = validate_request(&profile)
                            .and_then(|()| validate_display_name(&profile.name));
                        if let Err(e) = valid {
                            let _ = direct_tx.send(error_frame(&e)).await;
                            continue;
                        }

                        let user = profile.resolve();
                        // Re-identify replaces any previous registration.
                        state.sessions.remove(&session_id).await;
                        state
                            .sessions
                            .register(session_id.clone(), user.id().to_string())
                            .await;

                        let _ = direct_tx
                            .send(GatewayMessage::Ready {
                                session_id: session_id.clone(),
                                user: user.clone(),
                            })
                            .await;
                        tracing::info!(
                            session = %session_id,
                            user = %user.id(),
                            "Gateway READY sent"
                        );
                        identified = Some(user);
                    }

                    GatewayMessage::Heartbeat { timestamp } => {
                        let _ = timestamp;
                        state.sessions.heartbeat(&session_id).await;
                        let _ = direct_tx
                            .send(GatewayMessage::HeartbeatAck {
                                timestamp: chrono::Utc::now().timestamp_millis(),
                            })
                            .await;
                    }

                    GatewayMessage::Join { room_id } => {
                        let Some(user) = &identified else {
                            let _ = direct_tx
                                .send(GatewayMessage::Error {
                                    code: "NOT_IDENTIFIED".into(),
                                    message: "Identify before joining a room".into(),
                                })
                                .await;
                            continue;
                        };

                        match coordinator.join(&room_id, user).await {
                            // A duplicate join is success-equivalent: the
                            // client is in the room either way.
                            Ok(_) | Err(AtriumError::AlreadyInRoom) => {
                                if !subscriptions.contains_key(&room_id) {
                                    match subscribe_dispatch(
                                        &coordinator,
                                        &room_id,
                                        &direct_tx,
                                        &activity,
                                    )
                                    .await
                                    {
                                        Ok(sub) => {
                                            subscriptions.insert(room_id.clone(), sub);
                                        }
                                        Err(e) => {
                                            tracing::warn!(
                                                room = %room_id,
                                                error = %e,
                                                "delta subscription failed"
                                            );
                                        }
                                    }
                                }
                                let _ =
                                    direct_tx.send(joined_reply(&state, &coordinator, &room_id).await).await;
                            }
                            Err(e) => {
                                let _ = direct_tx.send(error_frame(&e)).await;
                            }
                        }
                    }

                    GatewayMessage::Leave { room_id } => {
                        subscriptions.remove(&room_id);
                        coordinator.leave(&room_id).await;
                        let _ = direct_tx.send(GatewayMessage::Left { room_id }).await;
                    }

                    GatewayMessage::Members { room_id } => {
                        let members = coordinator.current_members(&room_id).await;
                        let _ = direct_tx
                            .send(GatewayMessage::MemberList { room_id, members })
                            .await;
                    }

                    GatewayMessage::Activity { room_id } => {
                        let events = activity
                            .lock()
                            .map(|log| {
                                log.recent()
                                    .filter(|e| e.room_id == room_id)
                                    .cloned()
                                    .collect()
                            })
                            .unwrap_or_default();
                        let _ = direct_tx
                            .send(GatewayMessage::ActivityFeed { room_id, events })
                            .await;
                    }

                    // Server → client opcodes arriving from a client are noise
                    _ => {}
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // ── Cleanup ──────────────────────────────────────────────────────────────
    // Exit every joined room; leaving is best-effort and must not block.
    for (room_id, sub) in subscriptions.drain() {
        drop(sub);
        coordinator.leave(&room_id).await;
    }
    state.sessions.remove(&session_id).await;
    if let Some(user) = &identified {
        if !state.sessions.is_online(user.id()).await {
            tracing::debug!(user = %user.id(), "last gateway session for user closed");
        }
    }

    send_task.abort();
    tracing::info!(session = %session_id, "Client disconnected from gateway");
}

/// Wire a room's presence deltas into this session's socket and activity feed.
async fn subscribe_dispatch(
    coordinator: &PresenceCoordinator,
    room_id: &str,
    direct_tx: &mpsc::Sender<GatewayMessage>,
    activity: &Arc<Mutex<EventLog>>,
) -> Result<DeltaSubscription, AtriumError> {
    let tx = direct_tx.clone();
    let log = activity.clone();
    coordinator
        .subscribe_to_deltas(room_id, move |event| {
            if let Ok(mut log) = log.lock() {
                log.record(event.clone());
            }
            let frame = GatewayMessage::Dispatch {
                event: protocol::dispatch_event_name(event.kind).to_string(),
                data: serde_json::to_value(&event).unwrap_or_default(),
            };
            if tx.try_send(frame).is_err() {
                tracing::warn!(room = %event.room_id, "dispatch dropped: slow consumer");
            }
        })
        .await
}

/// The reply to a (possibly duplicate) join: roster plus live occupancy.
async fn joined_reply(
    state: &GatewayState,
    coordinator: &PresenceCoordinator,
    room_id: &str,
) -> GatewayMessage {
    let members = coordinator.current_members(room_id).await;
    match state.registry.require(room_id) {
        Ok(room) => GatewayMessage::Joined {
            room_id: room_id.to_string(),
            occupancy: room.occupancy(members.len()),
            members,
        },
        Err(e) => error_frame(&e),
    }
}
