//! Per-room channel client.
//!
//! Owns one transport connection per room, keyed by the `room:<id>` channel
//! name. Translates domain members into raw presence records on the way out
//! and reconstructs them on the way in. Only the coordinator writes through
//! this client; everything else reads snapshots or subscribes to deltas.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use atrium_common::error::{AtriumError, AtriumResult};
use atrium_common::models::RoomMember;

use crate::transport::{PresenceChannel, PresenceDelta, PresenceTransport};

/// Client for per-room presence channels.
pub struct ChannelClient {
    transport: Arc<dyn PresenceTransport>,
    connect_timeout: Duration,
    /// room_id → open channel handle. One connection per room.
    channels: RwLock<HashMap<String, Arc<dyn PresenceChannel>>>,
}

/// Live delta subscription. Dropping it unsubscribes.
pub struct DeltaSubscription {
    task: JoinHandle<()>,
}

impl Drop for DeltaSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl ChannelClient {
    pub fn new(transport: Arc<dyn PresenceTransport>, connect_timeout: Duration) -> Self {
        Self {
            transport,
            connect_timeout,
            channels: RwLock::new(HashMap::new()),
        }
    }

    fn channel_name(room_id: &str) -> String {
        format!("room:{room_id}")
    }

    /// Open the room's channel, or reuse the existing connection.
    ///
    /// The subscribe attempt runs under a hard deadline; there is no retry at
    /// this layer — retry policy belongs to the caller.
    pub async fn connect(&self, room_id: &str) -> AtriumResult<()> {
        if self.channels.read().await.contains_key(room_id) {
            return Ok(());
        }

        let mut channels = self.channels.write().await;
        if channels.contains_key(room_id) {
            return Ok(());
        }

        let name = Self::channel_name(room_id);
        let channel = tokio::time::timeout(self.connect_timeout, self.transport.channel(&name))
            .await
            .map_err(|_| AtriumError::Connection {
                message: format!(
                    "subscribe to '{name}' timed out after {}s",
                    self.connect_timeout.as_secs()
                ),
            })??;

        channels.insert(room_id.to_string(), channel);
        tracing::debug!(room = %room_id, "presence channel subscribed");
        Ok(())
    }

    pub async fn is_connected(&self, room_id: &str) -> bool {
        self.channels.read().await.contains_key(room_id)
    }

    /// Announce or refresh the local member's presence.
    ///
    /// Callers must have connected first; publishing without an open channel
    /// is a programming error, not a transient condition.
    pub async fn publish(&self, room_id: &str, member: &RoomMember) -> AtriumResult<()> {
        let channel = self
            .channels
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or(AtriumError::NotConnected)?;

        channel
            .track(&member.presence_key(), member.to_presence_data())
            .await
    }

    /// Reconstruct the room's current membership from the live presence table.
    ///
    /// When one key carries several raw records (multiple tabs), the most
    /// recently announced one wins. Returns an empty roster when no
    /// connection is open.
    pub async fn snapshot(&self, room_id: &str) -> Vec<RoomMember> {
        let Some(channel) = self.channels.read().await.get(room_id).cloned() else {
            return Vec::new();
        };

        let state = channel.presence_state().await;
        let mut members: Vec<RoomMember> = state
            .values()
            .filter_map(|records| records.last())
            .map(RoomMember::from_presence_data)
            .collect();

        members.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        members
    }

    /// Register a raw delta listener on the room's open channel.
    ///
    /// The returned subscription delivers every delta exactly once, in
    /// emission order, until dropped.
    pub async fn on_delta(
        &self,
        room_id: &str,
        listener: impl Fn(PresenceDelta) + Send + Sync + 'static,
    ) -> AtriumResult<DeltaSubscription> {
        let channel = self
            .channels
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or(AtriumError::NotConnected)?;

        let mut rx = channel.deltas();
        let room = room_id.to_string();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(delta) => listener(delta),
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(room = %room, missed, "delta listener lagged; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(DeltaSubscription { task })
    }

    /// Stop publishing and tear the room's connection down.
    ///
    /// Best-effort by contract: failures are logged and swallowed so exit
    /// paths never block. Idempotent.
    pub async fn disconnect(&self, room_id: &str) {
        let channel = self.channels.write().await.remove(room_id);
        let Some(channel) = channel else {
            return;
        };

        if let Err(e) = channel.untrack().await {
            tracing::warn!(room = %room_id, error = %e, "untrack failed during disconnect");
        }
        if let Err(e) = channel.unsubscribe().await {
            tracing::warn!(room = %room_id, error = %e, "unsubscribe failed during disconnect");
        }
        tracing::debug!(room = %room_id, "presence channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use atrium_common::models::{AppUser, AvatarKind};

    fn client(transport: Arc<MemoryTransport>) -> ChannelClient {
        ChannelClient::new(transport, Duration::from_secs(5))
    }

    fn member(id: &str) -> RoomMember {
        RoomMember::announce(&AppUser::Guest {
            id: id.into(),
            name: format!("user {id}"),
            avatar: AvatarKind::Cyan,
        })
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let c = client(Arc::new(MemoryTransport::new()));
        c.connect("main-room").await.unwrap();
        c.connect("main-room").await.unwrap();
        assert!(c.is_connected("main-room").await);
    }

    #[tokio::test]
    async fn test_publish_requires_connection() {
        let c = client(Arc::new(MemoryTransport::new()));
        let result = c.publish("main-room", &member("u1")).await;
        assert!(matches!(result, Err(AtriumError::NotConnected)));
    }

    #[tokio::test]
    async fn test_publish_then_snapshot_round_trips() {
        let c = client(Arc::new(MemoryTransport::new()));
        c.connect("main-room").await.unwrap();

        let m = member("u1");
        c.publish("main-room", &m).await.unwrap();

        let snap = c.snapshot("main-room").await;
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].user_id, m.user_id);
        assert_eq!(snap[0].user.name(), m.user.name());
        assert_eq!(snap[0].user.avatar(), m.user.avatar());
    }

    #[tokio::test]
    async fn test_snapshot_without_connection_is_empty() {
        let c = client(Arc::new(MemoryTransport::new()));
        assert!(c.snapshot("main-room").await.is_empty());
    }

    #[tokio::test]
    async fn test_last_writer_wins_per_key() {
        let transport = Arc::new(MemoryTransport::new());
        let c = client(transport.clone());
        c.connect("main-room").await.unwrap();
        c.publish("main-room", &member("u1")).await.unwrap();

        // A second tab announces the same user with a newer name.
        let other_tab = client(transport);
        other_tab.connect("main-room").await.unwrap();
        let mut newer = member("u1");
        newer.user = AppUser::Guest {
            id: "u1".into(),
            name: "renamed".into(),
            avatar: AvatarKind::Green,
        };
        other_tab.publish("main-room", &newer).await.unwrap();

        let snap = c.snapshot("main-room").await;
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].user.name(), "renamed");
    }

    #[tokio::test]
    async fn test_dropping_subscription_stops_delivery() {
        let c = client(Arc::new(MemoryTransport::new()));
        c.connect("main-room").await.unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sub = c
            .on_delta("main-room", move |delta| {
                let _ = tx.send(delta.key);
            })
            .await
            .unwrap();

        c.publish("main-room", &member("u1")).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("user_u1"));

        drop(sub);
        c.publish("main-room", &member("u2")).await.unwrap();
        // Sender side was dropped with the subscription task.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_is_best_effort_and_idempotent() {
        let c = client(Arc::new(MemoryTransport::new()));
        c.connect("main-room").await.unwrap();
        c.publish("main-room", &member("u1")).await.unwrap();

        c.disconnect("main-room").await;
        c.disconnect("main-room").await;
        assert!(!c.is_connected("main-room").await);
        assert!(c.snapshot("main-room").await.is_empty());
    }
}
