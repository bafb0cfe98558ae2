//! User identity — what the identity boundary hands us.
//!
//! Atrium does not validate credentials. An `AppUser` arrives ready-made from
//! the external identity provider: either a Google-backed account or an
//! ephemeral guest. The two variants share a tagged-union wire form
//! discriminated by `provider`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::avatar::AvatarKind;

/// An authenticated occupant identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum AppUser {
    /// Account backed by a Google sign-in.
    Google {
        id: String,
        name: String,
        email: String,
        avatar: AvatarKind,
    },
    /// Ephemeral guest — exists only for the lifetime of their presence.
    Guest {
        id: String,
        name: String,
        avatar: AvatarKind,
    },
}

impl AppUser {
    /// Mint a fresh guest identity with a process-unique id.
    pub fn guest(name: impl Into<String>, avatar: AvatarKind) -> Self {
        Self::Guest {
            id: format!("guest_{}", Uuid::new_v4().simple()),
            name: name.into(),
            avatar,
        }
    }

    /// Opaque stable identifier, unique per room occupant.
    pub fn id(&self) -> &str {
        match self {
            Self::Google { id, .. } | Self::Guest { id, .. } => id,
        }
    }

    /// Display name shown to other occupants.
    pub fn name(&self) -> &str {
        match self {
            Self::Google { name, .. } | Self::Guest { name, .. } => name,
        }
    }

    /// Current avatar selection.
    pub fn avatar(&self) -> AvatarKind {
        match self {
            Self::Google { avatar, .. } | Self::Guest { avatar, .. } => *avatar,
        }
    }

    /// Email, if this identity carries one.
    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Google { email, .. } => Some(email),
            Self::Guest { .. } => None,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest { .. })
    }
}
