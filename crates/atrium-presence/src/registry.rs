//! Room registry — the static set of rooms this process knows about.

use std::collections::HashMap;

use atrium_common::config::RoomConfig;
use atrium_common::error::{AtriumError, AtriumResult};
use atrium_common::models::Room;

/// Lookup table of statically defined rooms.
///
/// Current deployments host a single fixed room; the registry keys by id so
/// additional rooms are a configuration change, not a code change.
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
}

impl RoomRegistry {
    pub fn new(rooms: impl IntoIterator<Item = Room>) -> Self {
        Self {
            rooms: rooms.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    /// Registry holding the one configured room.
    pub fn from_config(cfg: &RoomConfig) -> Self {
        Self::new([Room::new(
            cfg.id.clone(),
            cfg.name.clone(),
            cfg.max_occupants,
            cfg.description.clone(),
        )])
    }

    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// Like [`get`](Self::get), but unknown ids become the domain error.
    pub fn require(&self, room_id: &str) -> AtriumResult<&Room> {
        self.get(room_id).ok_or_else(|| AtriumError::RoomNotFound {
            room_id: room_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let registry = RoomRegistry::new([Room::new("main-room", "Main Room", 5, None)]);
        assert_eq!(registry.get("main-room").unwrap().max_occupants, 5);
        assert!(registry.get("attic").is_none());
        assert!(matches!(
            registry.require("attic"),
            Err(AtriumError::RoomNotFound { .. })
        ));
    }
}
