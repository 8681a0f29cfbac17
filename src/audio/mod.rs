//! Audio session engine: real decode-backed playback with a simulated
//! timed fallback.

pub mod decode;
pub mod engine;

pub use decode::{NullSink, PcmSink};
pub use engine::AudioEngine;
