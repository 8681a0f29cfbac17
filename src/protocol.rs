//! Event payloads exchanged between the audio engine, the playback
//! manager, and outside subscribers.

use std::fmt;

use crate::track::Track;

/// Lifecycle states of the engine's single playback session slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Loading,
    Playing,
    Paused,
}

/// Failure kinds the engine can hit while starting or running a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The track has no usable resource. The engine degrades to the
    /// simulated path instead of reporting this outward.
    MissingResource,
    /// The resource exists but could not be probed or decoded. Fatal to
    /// the current session only; the engine returns to `Stopped`.
    Decode(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::MissingResource => write!(f, "no usable audio resource"),
            EngineError::Decode(reason) => write!(f, "decode failed: {}", reason),
        }
    }
}

/// Events the engine delivers to its owner, in session order.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The active session reached the natural end of its track.
    Finished,
    /// The active session failed; the engine is back in `Stopped`.
    Error(EngineError),
    /// Whether the engine is currently advancing playback.
    StateChanged(bool),
    /// Elapsed position report for the active session.
    Progress {
        elapsed_secs: u32,
        duration_secs: u32,
    },
}

/// Events published to playback manager subscribers.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// A different track became current.
    TrackChanged(Track),
    /// Playback started or stopped advancing.
    StateChanged(bool),
    /// The engine reported a fatal decode failure for the current track.
    PlaybackError(String),
}
