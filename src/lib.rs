//! Playback queue/history engine.
//!
//! Hand-built linked containers (a circular doubly-linked list, a LIFO
//! stack, and a FIFO queue), a playback manager that coordinates the
//! pending queue, play history, and current track, and an audio engine
//! that decodes real resources or falls back to deterministic simulated
//! timed playback when no resource is resolvable.

pub mod audio;
pub mod playback_manager;
pub mod protocol;
pub mod structures;
pub mod track;

pub use audio::{AudioEngine, NullSink, PcmSink};
pub use playback_manager::PlaybackManager;
pub use protocol::{EngineError, EngineEvent, EngineState, PlayerEvent};
pub use structures::{CircularList, Queue, Stack};
pub use track::Track;
