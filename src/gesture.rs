// src/gesture.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbol produced by the dispatcher for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GestureSymbol {
    Usain,
    Victory,
    PowerPose,
    TPose,
    Flying,
    Cancel,
    None,
}

impl GestureSymbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usain => "usain",
            Self::Victory => "victory",
            Self::PowerPose => "power-pose",
            Self::TPose => "t-pose",
            Self::Flying => "flying",
            Self::Cancel => "cancel",
            Self::None => "none",
        }
    }

    /// A confirmed pose that may start playback.
    pub fn is_playable(&self) -> bool {
        !matches!(self, Self::None | Self::Cancel)
    }
}

impl fmt::Display for GestureSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
