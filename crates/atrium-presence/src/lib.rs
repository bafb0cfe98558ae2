//! # atrium-presence
//!
//! Room presence coordination for Atrium. Handles:
//! - The transport boundary to a realtime presence channel
//! - Per-room channel connections with bounded subscribe timeouts
//! - The join/leave state machine with capacity and duplicate admission control
//! - Roster projection and the bounded activity feed
//!
//! Admission is best-effort: the snapshot read before a join can be
//! stale by the time the presence write lands, so two participants racing for
//! the last slot may both get in. A 5-person room self-corrects through leaves;
//! strict serialization would need an arbiter this architecture doesn't have.

pub mod channel;
pub mod coordinator;
pub mod memory;
pub mod registry;
pub mod roster;
pub mod transport;

pub use channel::{ChannelClient, DeltaSubscription};
pub use coordinator::{JoinState, PresenceCoordinator};
pub use memory::MemoryTransport;
pub use registry::RoomRegistry;
pub use roster::EventLog;
pub use transport::{PresenceChannel, PresenceDelta, PresenceTransport};
