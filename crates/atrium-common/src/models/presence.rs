//! Presence records — who occupies a room, and the join/leave events about them.
//!
//! `PresenceData` is the raw wire record tracked on the realtime channel.
//! `RoomMember` is the reconstructed domain view of one occupant. Conversion is
//! total in both directions: a malformed record degrades to defaults rather
//! than rejecting the occupant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::avatar::AvatarKind;
use super::user::AppUser;

/// The raw presence record announced on a room channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceData {
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: String,
    /// Present for Google-backed identities; absent for guests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    pub joined_at: DateTime<Utc>,
}

/// One occupant of a room, reconstructed from transport state.
///
/// Unique per room by `user_id`; a re-announce with the same id replaces the
/// previous record (last-writer-wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMember {
    pub user_id: String,
    pub user: AppUser,
    pub joined_at: DateTime<Utc>,
}

impl RoomMember {
    /// Build the record announced when `user` enters a room, stamped now.
    pub fn announce(user: &AppUser) -> Self {
        Self {
            user_id: user.id().to_string(),
            user: user.clone(),
            joined_at: Utc::now(),
        }
    }

    /// The key this member's presence is tracked under on the channel.
    pub fn presence_key(&self) -> String {
        format!("user_{}", self.user_id)
    }

    pub fn to_presence_data(&self) -> PresenceData {
        PresenceData {
            user_id: self.user_id.clone(),
            user_name: self.user.name().to_string(),
            user_avatar: self.user.avatar().as_str().to_string(),
            user_email: self.user.email().map(str::to_string),
            joined_at: self.joined_at,
        }
    }

    /// Reconstruct a member from a raw presence record.
    ///
    /// Provenance is inferred from the record itself: an email marks a
    /// Google identity, its absence a guest. Unknown avatar values fall
    /// back to the default.
    pub fn from_presence_data(data: &PresenceData) -> Self {
        let avatar = AvatarKind::from_wire(&data.user_avatar);
        let user = match &data.user_email {
            Some(email) => AppUser::Google {
                id: data.user_id.clone(),
                name: data.user_name.clone(),
                email: email.clone(),
                avatar,
            },
            None => AppUser::Guest {
                id: data.user_id.clone(),
                name: data.user_name.clone(),
                avatar,
            },
        };

        Self {
            user_id: data.user_id.clone(),
            user,
            joined_at: data.joined_at,
        }
    }
}

/// Whether a presence event records an arrival or a departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceKind {
    Join,
    Leave,
}

/// An immutable record of one observed join or leave.
///
/// Stamped with wall-clock time at observation, not transport time. Retained
/// only in the bounded activity feed; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub kind: PresenceKind,
    pub room_id: String,
    pub user_id: String,
    pub user: AppUser,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_survives_the_wire() {
        let guest = AppUser::guest("rin", AvatarKind::Purple);
        let member = RoomMember::announce(&guest);

        let back = RoomMember::from_presence_data(&member.to_presence_data());
        assert_eq!(back, member);
    }

    #[test]
    fn test_email_presence_decides_provenance() {
        let google = AppUser::Google {
            id: "u-9".into(),
            name: "Noa".into(),
            email: "noa@example.com".into(),
            avatar: AvatarKind::Indigo,
        };
        let back = RoomMember::from_presence_data(&RoomMember::announce(&google).to_presence_data());
        assert!(!back.user.is_guest());
        assert_eq!(back.user.email(), Some("noa@example.com"));

        let guest = AppUser::guest("rin", AvatarKind::Green);
        let back = RoomMember::from_presence_data(&RoomMember::announce(&guest).to_presence_data());
        assert!(back.user.is_guest());
    }

    #[test]
    fn test_presence_key_format() {
        let member = RoomMember::announce(&AppUser::Guest {
            id: "abc".into(),
            name: "n".into(),
            avatar: AvatarKind::Blue,
        });
        assert_eq!(member.presence_key(), "user_abc");
    }

    #[test]
    fn test_unknown_avatar_degrades_to_default() {
        let data = PresenceData {
            user_id: "u".into(),
            user_name: "n".into(),
            user_avatar: "plaid".into(),
            user_email: None,
            joined_at: Utc::now(),
        };
        let member = RoomMember::from_presence_data(&data);
        assert_eq!(member.user.avatar(), AvatarKind::Blue);
    }
}
