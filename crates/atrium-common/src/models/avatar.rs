//! Avatar catalog — the fixed set of avatar colors a participant can pick.

use serde::{Deserialize, Serialize};

/// All selectable avatar kinds, in display order.
pub const AVATAR_KINDS: [AvatarKind; 5] = [
    AvatarKind::Blue,
    AvatarKind::Purple,
    AvatarKind::Cyan,
    AvatarKind::Indigo,
    AvatarKind::Green,
];

/// A participant's avatar selection.
///
/// The catalog is closed: avatars are picked from a fixed palette, not uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AvatarKind {
    #[default]
    Blue,
    Purple,
    Cyan,
    Indigo,
    Green,
}

/// Display metadata for one avatar kind.
#[derive(Debug, Clone, Serialize)]
pub struct AvatarConfig {
    pub kind: AvatarKind,
    pub label: &'static str,
    pub color: &'static str,
}

impl AvatarKind {
    /// The wire/storage name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Cyan => "cyan",
            Self::Indigo => "indigo",
            Self::Green => "green",
        }
    }

    /// Parse a wire value, falling back to the default.
    ///
    /// Presence records are reconstructed best-effort: an unknown avatar
    /// string must never reject an otherwise valid participant.
    pub fn from_wire(value: &str) -> Self {
        AVATAR_KINDS
            .iter()
            .copied()
            .find(|k| k.as_str() == value)
            .unwrap_or_default()
    }

    /// Display metadata for this kind.
    pub fn config(&self) -> AvatarConfig {
        let (label, color) = match self {
            Self::Blue => ("Blue", "#2563eb"),
            Self::Purple => ("Purple", "#9333ea"),
            Self::Cyan => ("Cyan", "#0891b2"),
            Self::Indigo => ("Indigo", "#4338ca"),
            Self::Green => ("Green", "#059669"),
        };
        AvatarConfig { kind: *self, label, color }
    }

    /// Path of the bundled SVG asset for this kind.
    pub fn asset_path(&self) -> String {
        format!("/avatars/{}.svg", self.as_str())
    }
}

impl std::fmt::Display for AvatarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
