//! Room model — a fixed, named, capacity-bounded space.

use serde::{Deserialize, Serialize};

/// A capacity-bounded room participants join and leave.
///
/// Rooms are statically defined at process start; there is no runtime
/// create/destroy path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    /// Invariant: `max_occupants > 0`.
    pub max_occupants: usize,
    pub description: Option<String>,
}

/// Point-in-time occupancy of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomOccupancy {
    pub current: usize,
    pub max: usize,
    pub is_full: bool,
    /// Rounded percentage; may exceed 100 during the documented
    /// transient over-capacity window.
    pub percentage: u32,
}

/// Room description plus live occupant count, as served to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: String,
    pub name: String,
    pub max_occupants: usize,
    pub current_occupants: usize,
    pub description: Option<String>,
}

impl Room {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        max_occupants: usize,
        description: Option<String>,
    ) -> Self {
        assert!(max_occupants > 0, "a room must hold at least one occupant");
        Self {
            id: id.into(),
            name: name.into(),
            max_occupants,
            description,
        }
    }

    /// Whether one more participant fits.
    pub fn can_accommodate(&self, current_occupants: usize) -> bool {
        current_occupants < self.max_occupants
    }

    /// Pure occupancy computation for a given live count.
    pub fn occupancy(&self, current_occupants: usize) -> RoomOccupancy {
        RoomOccupancy {
            current: current_occupants,
            max: self.max_occupants,
            is_full: current_occupants >= self.max_occupants,
            percentage: ((current_occupants as f64 / self.max_occupants as f64) * 100.0).round()
                as u32,
        }
    }

    pub fn info(&self, current_occupants: usize) -> RoomInfo {
        RoomInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            max_occupants: self.max_occupants,
            current_occupants,
            description: self.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five_seat_room() -> Room {
        Room::new("main-room", "Main Room", 5, None)
    }

    #[test]
    fn test_occupancy_math() {
        let room = five_seat_room();

        let empty = room.occupancy(0);
        assert_eq!(empty.percentage, 0);
        assert!(!empty.is_full);

        let two = room.occupancy(2);
        assert_eq!(two.percentage, 40);
        assert!(!two.is_full);

        let full = room.occupancy(5);
        assert_eq!(full.percentage, 100);
        assert!(full.is_full);
    }

    #[test]
    fn test_percentage_rounds() {
        let room = Room::new("r", "R", 3, None);
        // 1/3 => 33.33 rounds down, 2/3 => 66.67 rounds up
        assert_eq!(room.occupancy(1).percentage, 33);
        assert_eq!(room.occupancy(2).percentage, 67);
    }

    #[test]
    fn test_accommodation_boundary() {
        let room = five_seat_room();
        assert!(room.can_accommodate(4));
        assert!(!room.can_accommodate(5));
        assert!(!room.can_accommodate(6));
    }

    #[test]
    fn test_over_capacity_is_reported_not_clamped() {
        // The join race can transiently exceed the cap; occupancy must
        // report it honestly so reconciliation can see it.
        let room = five_seat_room();
        let over = room.occupancy(6);
        assert!(over.is_full);
        assert_eq!(over.percentage, 120);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_rejected() {
        Room::new("r", "R", 0, None);
    }
}
