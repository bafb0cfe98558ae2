//! Presence coordinator — the join/leave state machine for one user agent.
//!
//! The coordinator is the only component allowed to write to the transport
//! (announce and withdraw presence). It owns admission: capacity and
//! duplicate checks run against a fresh snapshot strictly before any
//! transport write, so a full room never even sees the announce.
//!
//! Per-room states: `NotJoined → Joining → Joined → Leaving → NotJoined`.
//! A `join` while `Joining` or `Joined` short-circuits instead of re-entering.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use atrium_common::error::{AtriumError, AtriumResult};
use atrium_common::models::{AppUser, PresenceEvent, Room, RoomInfo, RoomMember, RoomOccupancy};

use crate::channel::{ChannelClient, DeltaSubscription};
use crate::registry::RoomRegistry;
use crate::roster;

/// Where one user agent stands with respect to one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinState {
    #[default]
    NotJoined,
    Joining,
    Joined,
    Leaving,
}

/// Orchestrates joins and leaves for a single user agent.
///
/// Cheap to clone; clones share state. Dependencies are injected so tests can
/// substitute a fake transport behind the [`ChannelClient`].
#[derive(Clone)]
pub struct PresenceCoordinator {
    registry: Arc<RoomRegistry>,
    client: Arc<ChannelClient>,
    states: Arc<RwLock<HashMap<String, JoinState>>>,
}

impl PresenceCoordinator {
    pub fn new(registry: Arc<RoomRegistry>, client: ChannelClient) -> Self {
        Self {
            registry,
            client: Arc::new(client),
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Current state for a room.
    pub async fn state(&self, room_id: &str) -> JoinState {
        self.states
            .read()
            .await
            .get(room_id)
            .copied()
            .unwrap_or_default()
    }

    /// Enter a room.
    ///
    /// Admission order: room lookup, connect (bounded timeout), capacity
    /// check, duplicate check, then the presence announce. The snapshot the
    /// checks read can be stale by the time the announce lands — two
    /// participants racing for the last slot may both succeed. That window is
    /// accepted; it self-corrects through leaves.
    pub async fn join(&self, room_id: &str, user: &AppUser) -> AtriumResult<RoomMember> {
        let room = self.registry.require(room_id)?.clone();

        {
            let mut states = self.states.write().await;
            match states.get(room_id) {
                Some(JoinState::Joining) | Some(JoinState::Joined) => {
                    return Err(AtriumError::AlreadyInRoom);
                }
                _ => {
                    states.insert(room_id.to_string(), JoinState::Joining);
                }
            }
        }

        // The multi-step join must settle even if the caller gives up
        // mid-flight, or the room would be left half-tracked in `Joining`.
        // Running it as its own task lets the transport call finish and the
        // state roll back (or commit) regardless of caller cancellation.
        let coordinator = self.clone();
        let task_room = room_id.to_string();
        let task_user = user.clone();
        let outcome = tokio::spawn(async move {
            let result = coordinator.admit(&room, &task_room, &task_user).await;
            let settled = if result.is_ok() {
                JoinState::Joined
            } else {
                JoinState::NotJoined
            };
            let mut states = coordinator.states.write().await;
            // Settle only if nothing else (a concurrent leave) moved the
            // state while the transport calls were in flight.
            if states.get(&task_room) == Some(&JoinState::Joining) {
                states.insert(task_room.clone(), settled);
            }
            result
        })
        .await;

        match outcome {
            Ok(Ok(member)) => {
                tracing::info!(room = %room_id, user = %user.id(), "User joined room");
                Ok(member)
            }
            Ok(Err(e)) => Err(e),
            Err(e) => Err(AtriumError::Internal(anyhow::anyhow!(
                "join task failed: {e}"
            ))),
        }
    }

    async fn admit(&self, room: &Room, room_id: &str, user: &AppUser) -> AtriumResult<RoomMember> {
        self.client.connect(room_id).await?;

        let members = self.client.snapshot(room_id).await;
        if !room.can_accommodate(members.len()) {
            return Err(AtriumError::RoomFull {
                current: members.len(),
                max: room.max_occupants,
            });
        }
        if roster::is_member(&members, user.id()) {
            return Err(AtriumError::AlreadyInRoom);
        }

        let member = RoomMember::announce(user);
        self.client.publish(room_id, &member).await?;
        Ok(member)
    }

    /// Leave a room. Best-effort: transport failures are swallowed and the
    /// caller always ends up `NotJoined`.
    pub async fn leave(&self, room_id: &str) {
        self.states
            .write()
            .await
            .insert(room_id.to_string(), JoinState::Leaving);

        self.client.disconnect(room_id).await;

        let mut states = self.states.write().await;
        if states.get(room_id) == Some(&JoinState::Leaving) {
            states.insert(room_id.to_string(), JoinState::NotJoined);
        }
        drop(states);
        tracing::info!(room = %room_id, "Left room");
    }

    /// The room's current membership; empty when not connected.
    pub async fn current_members(&self, room_id: &str) -> Vec<RoomMember> {
        self.client.snapshot(room_id).await
    }

    /// Watch a room's joins and leaves as normalized domain events.
    ///
    /// Each raw transport record becomes one [`PresenceEvent`], stamped with
    /// wall-clock time at observation (not transport time). Dropping the
    /// returned subscription removes the underlying listener.
    pub async fn subscribe_to_deltas(
        &self,
        room_id: &str,
        callback: impl Fn(PresenceEvent) + Send + Sync + 'static,
    ) -> AtriumResult<DeltaSubscription> {
        let room = room_id.to_string();
        self.client
            .on_delta(room_id, move |delta| {
                let observed_at = Utc::now();
                for record in &delta.records {
                    let member = RoomMember::from_presence_data(record);
                    callback(PresenceEvent {
                        kind: delta.kind,
                        room_id: room.clone(),
                        user_id: member.user_id.clone(),
                        user: member.user,
                        timestamp: observed_at,
                    });
                }
            })
            .await
    }

    /// Live occupancy for a room. Connects if needed so the count reflects
    /// the transport's real state, not this agent's connection history.
    pub async fn occupancy(&self, room_id: &str) -> AtriumResult<RoomOccupancy> {
        let room = self.registry.require(room_id)?.clone();
        self.client.connect(room_id).await?;
        let count = self.client.snapshot(room_id).await.len();
        Ok(room.occupancy(count))
    }

    /// Room description plus live occupant count.
    pub async fn room_info(&self, room_id: &str) -> AtriumResult<RoomInfo> {
        let room = self.registry.require(room_id)?.clone();
        self.client.connect(room_id).await?;
        let count = self.client.snapshot(room_id).await.len();
        Ok(room.info(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use atrium_common::models::AvatarKind;
    use std::time::Duration;

    fn coordinator_on(transport: Arc<MemoryTransport>) -> PresenceCoordinator {
        let registry = Arc::new(RoomRegistry::new([Room::new(
            "main-room",
            "Main Room",
            5,
            None,
        )]));
        PresenceCoordinator::new(
            registry,
            ChannelClient::new(transport, Duration::from_secs(5)),
        )
    }

    fn guest(id: &str) -> AppUser {
        AppUser::Guest {
            id: id.into(),
            name: format!("user {id}"),
            avatar: AvatarKind::Blue,
        }
    }

    #[tokio::test]
    async fn test_state_machine_walk() {
        let transport = Arc::new(MemoryTransport::new());
        let c = coordinator_on(transport);

        assert_eq!(c.state("main-room").await, JoinState::NotJoined);
        c.join("main-room", &guest("u1")).await.unwrap();
        assert_eq!(c.state("main-room").await, JoinState::Joined);
        c.leave("main-room").await;
        assert_eq!(c.state("main-room").await, JoinState::NotJoined);
    }

    #[tokio::test]
    async fn test_unknown_room_is_rejected_before_any_transport_work() {
        let transport = Arc::new(MemoryTransport::new());
        let c = coordinator_on(transport);

        let result = c.join("attic", &guest("u1")).await;
        assert!(matches!(result, Err(AtriumError::RoomNotFound { .. })));
        assert_eq!(c.state("attic").await, JoinState::NotJoined);
    }

    #[tokio::test]
    async fn test_rejoin_after_leave_works() {
        let transport = Arc::new(MemoryTransport::new());
        let c = coordinator_on(transport);

        c.join("main-room", &guest("u1")).await.unwrap();
        c.leave("main-room").await;
        c.join("main-room", &guest("u1")).await.unwrap();
        assert_eq!(c.current_members("main-room").await.len(), 1);
    }

    #[tokio::test]
    async fn test_occupancy_reflects_other_agents() {
        let transport = Arc::new(MemoryTransport::new());
        let a = coordinator_on(transport.clone());
        let b = coordinator_on(transport);

        a.join("main-room", &guest("u1")).await.unwrap();

        // Agent B never joined; its occupancy query still sees U1.
        let occupancy = b.occupancy("main-room").await.unwrap();
        assert_eq!(occupancy.current, 1);
        assert!(!occupancy.is_full);

        let info = b.room_info("main-room").await.unwrap();
        assert_eq!(info.current_occupants, 1);
        assert_eq!(info.max_occupants, 5);
    }
}
