//! Canned prompts offered as quick-start options.

use serde::Serialize;

/// Prompt the workflow starts with.
pub const DEFAULT_PROMPT: &str = "Pixel art button shaped like a wide orange pumpkin. \
The text 'START' is written across the front of the pumpkin using twisted green vines and leaves. \
The vines form the letters legibly. 16-bit retro game style, cute aesthetic, slight shading, \
white background.";

/// A canned prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Pumpkin-shaped START button.
    Pumpkin,
    /// Potion bottle.
    Potion,
    /// Treasure chest.
    Chest,
}

impl Preset {
    /// All presets, in display order.
    pub const ALL: [Preset; 3] = [Preset::Pumpkin, Preset::Potion, Preset::Chest];

    /// Returns the preset's identifier (e.g. `potion`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pumpkin => "pumpkin",
            Self::Potion => "potion",
            Self::Chest => "chest",
        }
    }

    /// Returns the short label shown next to the preset.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pumpkin => "Default Pumpkin",
            Self::Potion => "Potion",
            Self::Chest => "Chest",
        }
    }

    /// Returns the prompt text this preset sets.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Pumpkin => "A pixel art UI button shaped like a pumpkin with vine 'START' text.",
            Self::Potion => "A purple potion bottle with a cork, pixel art style.",
            Self::Chest => "A golden pixel art chest with jewels spilling out.",
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
