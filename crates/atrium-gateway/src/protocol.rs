//! Gateway wire protocol — what the client and server send to each other.
//!
//! Frames are JSON, tagged `op` with payload under `d`. Opcodes are named,
//! not numbered.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use atrium_common::models::{
    AppUser, AvatarKind, PresenceEvent, PresenceKind, RoomMember, RoomOccupancy,
};

/// Gateway opcodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum GatewayMessage {
    /// Client → Server: Introduce the occupant behind this socket
    Identify { profile: JoinProfile },

    /// Server → Client: Connection accepted, here's your identity
    Ready { session_id: String, user: AppUser },

    /// Bidirectional: Keepalive ping/pong
    Heartbeat { timestamp: i64 },

    /// Server → Client: Heartbeat acknowledged
    HeartbeatAck { timestamp: i64 },

    /// Client → Server: Enter a room
    Join { room_id: String },

    /// Server → Client: In the room (also the answer to a duplicate join)
    Joined {
        room_id: String,
        members: Vec<RoomMember>,
        occupancy: RoomOccupancy,
    },

    /// Client → Server: Exit a room
    Leave { room_id: String },

    /// Server → Client: Out of the room
    Left { room_id: String },

    /// Client → Server: Request the current roster
    Members { room_id: String },

    /// Server → Client: Current roster
    MemberList {
        room_id: String,
        members: Vec<RoomMember>,
    },

    /// Client → Server: Request the recent activity feed
    Activity { room_id: String },

    /// Server → Client: Recent joins/leaves observed by this session
    ActivityFeed {
        room_id: String,
        events: Vec<PresenceEvent>,
    },

    /// Server → Client: A presence event occurred in a joined room
    Dispatch {
        event: String,
        data: serde_json::Value,
    },

    /// Server → Client: A request failed
    Error { code: String, message: String },

    /// Server → Client: Connection greeting
    Hello { heartbeat_interval: u64 },
}

/// What a client supplies to identify itself.
///
/// The gateway does not authenticate — identity arrives ready-made from the
/// external provider. A profile with an email resolves to a Google-backed
/// identity; without one, a guest is minted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JoinProfile {
    #[validate(length(min = 1, max = 32, message = "Display name must be 1-32 characters"))]
    pub name: String,

    /// Wire name of an avatar kind; unknown values fall back to the default.
    pub avatar: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// Stable id from the identity provider; omitted for fresh guests.
    pub user_id: Option<String>,
}

impl JoinProfile {
    /// Resolve this profile into a full identity.
    pub fn resolve(&self) -> AppUser {
        let name = self.name.trim().to_string();
        let avatar = self
            .avatar
            .as_deref()
            .map(AvatarKind::from_wire)
            .unwrap_or_default();

        match &self.email {
            Some(email) => AppUser::Google {
                id: self
                    .user_id
                    .clone()
                    .unwrap_or_else(|| format!("google_{}", Uuid::new_v4().simple())),
                name,
                email: email.clone(),
                avatar,
            },
            None => match &self.user_id {
                Some(id) => AppUser::Guest {
                    id: id.clone(),
                    name,
                    avatar,
                },
                None => AppUser::guest(name, avatar),
            },
        }
    }
}

/// Dispatch event name for a presence event kind.
pub fn dispatch_event_name(kind: PresenceKind) -> &'static str {
    match kind {
        PresenceKind::Join => "PRESENCE_JOIN",
        PresenceKind::Leave => "PRESENCE_LEAVE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_op_tagged() {
        let frame = GatewayMessage::Join {
            room_id: "main-room".into(),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["op"], "Join");
        assert_eq!(json["d"]["room_id"], "main-room");
    }

    #[test]
    fn test_profile_resolution() {
        let guest = JoinProfile {
            name: "  Mika  ".into(),
            avatar: Some("green".into()),
            email: None,
            user_id: None,
        }
        .resolve();
        assert!(guest.is_guest());
        assert_eq!(guest.name(), "Mika");
        assert_eq!(guest.avatar(), AvatarKind::Green);

        let google = JoinProfile {
            name: "Noa".into(),
            avatar: None,
            email: Some("noa@example.com".into()),
            user_id: Some("u-42".into()),
        }
        .resolve();
        assert!(!google.is_guest());
        assert_eq!(google.id(), "u-42");
        assert_eq!(google.avatar(), AvatarKind::Blue);
    }

    #[test]
    fn test_returning_guest_keeps_their_id() {
        let profile = JoinProfile {
            name: "Rin".into(),
            avatar: None,
            email: None,
            user_id: Some("guest_abc".into()),
        };
        assert_eq!(profile.resolve().id(), "guest_abc");
    }
}
