//! Real playback path: symphonia probe/decode loop feeding a PCM sink.
//!
//! The crate never opens an output device itself. Decoded frames go
//! through the `PcmSink` seam and session pacing derives from sink
//! backpressure, so a real output backend and the shipped pacing sink
//! behave identically from the engine's point of view.

use std::path::Path;
use std::time::Duration;

use log::debug;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Consumer of decoded interleaved f32 frames.
///
/// `write` blocks until the sink has accepted the frames; that
/// backpressure is what paces a decode session. A CPAL output stream is
/// the intended production implementation and lives outside this crate.
pub trait PcmSink: Send {
    fn write(&mut self, samples: &[f32], channel_count: u16, sample_rate_hz: u32);
}

/// Sink that discards samples and paces by sleeping for their duration.
#[derive(Debug, Default)]
pub struct NullSink;

impl PcmSink for NullSink {
    fn write(&mut self, samples: &[f32], channel_count: u16, sample_rate_hz: u32) {
        let frames = samples.len() / channel_count.max(1) as usize;
        let micros = frames as u64 * 1_000_000 / sample_rate_hz.max(1) as u64;
        std::thread::sleep(Duration::from_micros(micros));
    }
}

/// A probed resource with a decoder prepared for its default track.
pub struct OpenedResource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    pub sample_rate_hz: u32,
    pub channel_count: u16,
}

/// Probes `path` and prepares a decoder for its default track.
pub fn open_resource(path: &Path) -> Result<OpenedResource, String> {
    let file = std::fs::File::open(path)
        .map_err(|e| format!("failed to open {}: {}", path.display(), e))?;
    let media_source = MediaSourceStream::new(Box::new(file), Default::default());
    let hint = Hint::new();

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            media_source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| format!("failed to probe media source: {}", e))?;
    let format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| "no default track found".to_string())?;
    let track_id = track.id;
    let sample_rate_hz = track.codec_params.sample_rate.unwrap_or(44_100);
    let channel_count = track
        .codec_params
        .channels
        .map(|channels| channels.count() as u16)
        .unwrap_or(2);

    let decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| format!("failed to create decoder: {}", e))?;

    debug!(
        "opened {}: sample_rate={}, channels={}",
        path.display(),
        sample_rate_hz,
        channel_count
    );

    Ok(OpenedResource {
        format,
        decoder,
        track_id,
        sample_rate_hz,
        channel_count,
    })
}

impl OpenedResource {
    /// Decodes the next packet of the default track, returning its
    /// interleaved samples, or None at the natural end of the stream.
    pub fn next_frames(&mut self) -> Result<Option<Vec<f32>>, String> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(e) => return Err(format!("failed to read packet: {}", e)),
            };
            if packet.track_id() != self.track_id {
                continue;
            }
            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    return Ok(Some(buffer.samples().to_vec()));
                }
                Err(e) => return Err(format!("decode error: {}", e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Instant;

    #[test]
    fn null_sink_paces_by_sample_duration() {
        let mut sink = NullSink;
        let samples = vec![0.0f32; 4410 * 2]; // 100ms of stereo at 44.1kHz
        let start = Instant::now();
        sink.write(&samples, 2, 44_100);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(90), "slept {:?}", elapsed);
    }

    #[test]
    fn open_rejects_missing_file() {
        let result = open_resource(Path::new("/nonexistent/audio.mp3"));
        assert!(result.is_err());
    }

    #[test]
    fn open_rejects_unprobeable_content() {
        let mut path = std::env::temp_dir();
        path.push(format!("playdeck-decode-test-{}.mp3", std::process::id()));
        let mut file = std::fs::File::create(&path).expect("failed to create temp file");
        file.write_all(b"this is not audio data at all")
            .expect("failed to write temp file");
        drop(file);

        let result = open_resource(&path);
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }
}
