//! In-process presence transport.
//!
//! A process-local broker: named channels, a presence table per channel, and
//! a broadcast fan-out for deltas. This is the hosted single-node mode; a
//! multi-node deployment would swap in a broker-backed transport behind the
//! same traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use atrium_common::error::{AtriumError, AtriumResult};
use atrium_common::models::{PresenceData, PresenceKind};

use crate::transport::{PresenceChannel, PresenceDelta, PresenceTransport};

const DELTA_BUFFER: usize = 256;

/// Process-local presence broker.
pub struct MemoryTransport {
    /// Channel name → shared channel state.
    channels: RwLock<HashMap<String, Arc<ChannelHub>>>,
    next_client: AtomicU64,
}

/// State shared by every handle onto one channel name.
struct ChannelHub {
    name: String,
    /// Presence key → records announced under it, oldest first.
    records: RwLock<HashMap<String, Vec<TrackedRecord>>>,
    deltas: broadcast::Sender<PresenceDelta>,
}

/// One raw presence record plus the handle that owns it.
struct TrackedRecord {
    client_id: u64,
    data: PresenceData,
}

/// One client's handle onto a hub.
struct MemoryChannel {
    client_id: u64,
    hub: Arc<ChannelHub>,
    open: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            next_client: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceTransport for MemoryTransport {
    async fn channel(&self, name: &str) -> AtriumResult<Arc<dyn PresenceChannel>> {
        let hub = {
            let mut channels = self.channels.write().await;
            channels
                .entry(name.to_string())
                .or_insert_with(|| {
                    let (deltas, _) = broadcast::channel(DELTA_BUFFER);
                    Arc::new(ChannelHub {
                        name: name.to_string(),
                        records: RwLock::new(HashMap::new()),
                        deltas,
                    })
                })
                .clone()
        };

        let client_id = self.next_client.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(channel = %name, client = client_id, "channel handle opened");

        Ok(Arc::new(MemoryChannel {
            client_id,
            hub,
            open: AtomicBool::new(true),
        }))
    }
}

impl ChannelHub {
    fn emit(&self, kind: PresenceKind, key: &str, records: Vec<PresenceData>) {
        // No receivers is fine; deltas are purely observational.
        let _ = self.deltas.send(PresenceDelta {
            kind,
            key: key.to_string(),
            records,
        });
    }
}

impl MemoryChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Remove every record this handle announced, emitting Leave deltas.
    async fn remove_own_records(&self) {
        let mut records = self.hub.records.write().await;
        let mut removed: Vec<(String, Vec<PresenceData>)> = Vec::new();

        records.retain(|key, entries| {
            let mut gone = Vec::new();
            entries.retain(|r| {
                if r.client_id == self.client_id {
                    gone.push(r.data.clone());
                    false
                } else {
                    true
                }
            });
            if !gone.is_empty() {
                removed.push((key.clone(), gone));
            }
            !entries.is_empty()
        });
        drop(records);

        for (key, gone) in removed {
            self.hub.emit(PresenceKind::Leave, &key, gone);
        }
    }
}

#[async_trait]
impl PresenceChannel for MemoryChannel {
    async fn track(&self, key: &str, data: PresenceData) -> AtriumResult<()> {
        if !self.is_open() {
            return Err(AtriumError::NotConnected);
        }

        {
            let mut records = self.hub.records.write().await;
            let entries = records.entry(key.to_string()).or_default();
            match entries.iter_mut().find(|r| r.client_id == self.client_id) {
                Some(existing) => existing.data = data.clone(),
                None => entries.push(TrackedRecord {
                    client_id: self.client_id,
                    data: data.clone(),
                }),
            }
        }

        tracing::debug!(channel = %self.hub.name, key = %key, "presence tracked");
        self.hub.emit(PresenceKind::Join, key, vec![data]);
        Ok(())
    }

    async fn untrack(&self) -> AtriumResult<()> {
        self.remove_own_records().await;
        Ok(())
    }

    async fn unsubscribe(&self) -> AtriumResult<()> {
        if self.open.swap(false, Ordering::AcqRel) {
            self.remove_own_records().await;
            tracing::debug!(channel = %self.hub.name, client = self.client_id, "channel handle closed");
        }
        Ok(())
    }

    async fn presence_state(&self) -> HashMap<String, Vec<PresenceData>> {
        if !self.is_open() {
            return HashMap::new();
        }
        self.hub
            .records
            .read()
            .await
            .iter()
            .map(|(key, entries)| {
                (
                    key.clone(),
                    entries.iter().map(|r| r.data.clone()).collect(),
                )
            })
            .collect()
    }

    fn deltas(&self) -> broadcast::Receiver<PresenceDelta> {
        self.hub.deltas.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(user_id: &str) -> PresenceData {
        PresenceData {
            user_id: user_id.into(),
            user_name: user_id.to_uppercase(),
            user_avatar: "blue".into(),
            user_email: None,
            joined_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_handles_share_channel_state() {
        let transport = MemoryTransport::new();
        let a = transport.channel("room:test").await.unwrap();
        let b = transport.channel("room:test").await.unwrap();

        a.track("user_1", record("1")).await.unwrap();

        let state = b.presence_state().await;
        assert_eq!(state.len(), 1);
        assert_eq!(state["user_1"][0].user_id, "1");
    }

    #[tokio::test]
    async fn test_same_key_from_two_handles_stacks_records() {
        let transport = MemoryTransport::new();
        let tab1 = transport.channel("room:test").await.unwrap();
        let tab2 = transport.channel("room:test").await.unwrap();

        tab1.track("user_1", record("1")).await.unwrap();
        tab2.track("user_1", record("1")).await.unwrap();

        let state = tab1.presence_state().await;
        assert_eq!(state["user_1"].len(), 2);
    }

    #[tokio::test]
    async fn test_retrack_replaces_own_record() {
        let transport = MemoryTransport::new();
        let chan = transport.channel("room:test").await.unwrap();

        chan.track("user_1", record("1")).await.unwrap();
        let mut updated = record("1");
        updated.user_name = "renamed".into();
        chan.track("user_1", updated).await.unwrap();

        let state = chan.presence_state().await;
        assert_eq!(state["user_1"].len(), 1);
        assert_eq!(state["user_1"][0].user_name, "renamed");
    }

    #[tokio::test]
    async fn test_untrack_removes_only_own_records() {
        let transport = MemoryTransport::new();
        let a = transport.channel("room:test").await.unwrap();
        let b = transport.channel("room:test").await.unwrap();

        a.track("user_1", record("1")).await.unwrap();
        b.track("user_2", record("2")).await.unwrap();

        a.untrack().await.unwrap();

        let state = b.presence_state().await;
        assert!(!state.contains_key("user_1"));
        assert!(state.contains_key("user_2"));
    }

    #[tokio::test]
    async fn test_deltas_reach_every_listener_in_order() {
        let transport = MemoryTransport::new();
        let chan = transport.channel("room:test").await.unwrap();
        let mut rx1 = chan.deltas();
        let mut rx2 = chan.deltas();

        chan.track("user_1", record("1")).await.unwrap();
        chan.untrack().await.unwrap();

        for rx in [&mut rx1, &mut rx2] {
            let first = rx.recv().await.unwrap();
            assert_eq!(first.kind, PresenceKind::Join);
            let second = rx.recv().await.unwrap();
            assert_eq!(second.kind, PresenceKind::Leave);
            assert_eq!(second.records[0].user_id, "1");
        }
    }

    #[tokio::test]
    async fn test_closed_handle_rejects_track_and_reads_empty() {
        let transport = MemoryTransport::new();
        let chan = transport.channel("room:test").await.unwrap();
        chan.track("user_1", record("1")).await.unwrap();

        chan.unsubscribe().await.unwrap();
        chan.unsubscribe().await.unwrap(); // idempotent

        assert!(matches!(
            chan.track("user_1", record("1")).await,
            Err(AtriumError::NotConnected)
        ));
        assert!(chan.presence_state().await.is_empty());
    }
}
