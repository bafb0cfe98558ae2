//! Read-model helpers over roster snapshots, plus the bounded activity feed.
//!
//! Everything here is observational. The activity feed in particular never
//! influences admission decisions.

use std::collections::VecDeque;

use atrium_common::models::{PresenceEvent, RoomMember};

/// Default number of events the activity feed retains.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 10;

/// Whether `user_id` appears in the roster.
pub fn is_member(members: &[RoomMember], user_id: &str) -> bool {
    members.iter().any(|m| m.user_id == user_id)
}

/// Find one occupant by id.
pub fn find_member<'a>(members: &'a [RoomMember], user_id: &str) -> Option<&'a RoomMember> {
    members.iter().find(|m| m.user_id == user_id)
}

/// Bounded ring buffer of recent presence events, newest first.
#[derive(Debug)]
pub struct EventLog {
    events: VecDeque<PresenceEvent>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "event log capacity must be positive");
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event, evicting the oldest once full.
    pub fn record(&mut self, event: PresenceEvent) {
        self.events.push_front(event);
        self.events.truncate(self.capacity);
    }

    /// Recent events, newest first.
    pub fn recent(&self) -> impl Iterator<Item = &PresenceEvent> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}
