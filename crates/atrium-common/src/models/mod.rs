//! Core domain models shared across all Atrium services.
//!
//! These are the "truth" types — what the transport carries and the gateway serializes.
//! Presence is transport-ephemeral: none of these models are persisted.

pub mod avatar;
pub mod presence;
pub mod room;
pub mod user;

/// Re-export all model types for convenience.
pub use avatar::*;
pub use presence::*;
pub use room::*;
pub use user::*;
