//! Transport boundary — what Atrium requires from a realtime presence medium.
//!
//! Any pub/sub system offering named channels with group membership and
//! change notification satisfies this contract. The in-process implementation
//! lives in [`crate::memory`]; a clustered deployment would put a broker-backed
//! implementation behind the same traits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use atrium_common::error::AtriumResult;
use atrium_common::models::{PresenceData, PresenceKind};

/// An incremental join/leave notification from the transport.
///
/// `records` carries the raw presence records that appeared (join) or
/// disappeared (leave) under `key`. Self-originated deltas are echoed back to
/// the emitting client like any other.
#[derive(Debug, Clone)]
pub struct PresenceDelta {
    pub kind: PresenceKind,
    pub key: String,
    pub records: Vec<PresenceData>,
}

/// One client's handle onto a named presence channel.
///
/// Handles onto the same channel name share membership state, but each handle
/// owns what it announced: `untrack` removes only this handle's records.
#[async_trait]
pub trait PresenceChannel: Send + Sync {
    /// Announce or update presence under `key`. Re-tracking the same key from
    /// the same handle replaces the record; a second handle tracking the same
    /// key stacks an additional raw record under it.
    async fn track(&self, key: &str, data: PresenceData) -> AtriumResult<()>;

    /// Withdraw everything this handle announced.
    async fn untrack(&self) -> AtriumResult<()>;

    /// Tear down this handle. Implies untrack; idempotent.
    async fn unsubscribe(&self) -> AtriumResult<()>;

    /// The raw presence table: key → every record currently announced under
    /// it, oldest first. Empty once the handle is closed.
    async fn presence_state(&self) -> HashMap<String, Vec<PresenceData>>;

    /// Subscribe to membership deltas. Every active receiver sees every delta
    /// exactly once, in emission order.
    fn deltas(&self) -> broadcast::Receiver<PresenceDelta>;
}

/// Factory for channel handles.
#[async_trait]
pub trait PresenceTransport: Send + Sync {
    /// Subscribe to the named channel and return a fresh client handle.
    async fn channel(&self, name: &str) -> AtriumResult<Arc<dyn PresenceChannel>>;
}
