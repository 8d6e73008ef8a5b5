//! Playback failure taxonomy.
//!
//! `LoadTimeout`, `Stall` and `Media` are recovered locally by the retry
//! policy. `AutoplayBlocked` parks the session until the user taps.
//! `TiersExhausted` is terminal until a manual retry.

use rf_core::Tier;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Numeric media error codes reported by the media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorCode {
    Aborted,
    Network,
    Decode,
    SrcNotSupported,
    Other(u16),
}

impl MediaErrorCode {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::Aborted,
            2 => Self::Network,
            3 => Self::Decode,
            4 => Self::SrcNotSupported,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::Aborted => 1,
            Self::Network => 2,
            Self::Decode => 3,
            Self::SrcNotSupported => 4,
            Self::Other(c) => *c,
        }
    }
}

impl fmt::Display for MediaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted => write!(f, "aborted"),
            Self::Network => write!(f, "network"),
            Self::Decode => write!(f, "decode"),
            Self::SrcNotSupported => write!(f, "src_not_supported"),
            Self::Other(c) => write!(f, "code {c}"),
        }
    }
}

/// Why a playback attempt did not (yet) reach the playing state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackError {
    /// No readiness signal within the tier's budget.
    #[error("no readiness signal from {tier} source within {}ms", .after.as_millis())]
    LoadTimeout { tier: Tier, after: Duration },

    /// Buffering after start lasted longer than the stall budget.
    #[error("{tier} source stalled for {}ms", .after.as_millis())]
    Stall { tier: Tier, after: Duration },

    /// The media element reported an error.
    #[error("media error ({code}) on {tier} source")]
    Media { tier: Tier, code: MediaErrorCode },

    /// The platform refused to start playback without a user gesture.
    #[error("autoplay blocked; waiting for user interaction")]
    AutoplayBlocked,

    /// Every candidate source failed.
    #[error("all sources failed after {attempts} attempts")]
    TiersExhausted { attempts: u32 },
}

impl PlaybackError {
    /// Whether the retry policy handles this failure without surfacing it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::LoadTimeout { .. } | Self::Stall { .. } | Self::Media { .. }
        )
    }
}
