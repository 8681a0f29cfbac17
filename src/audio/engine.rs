//! Audio session engine.
//!
//! Owns at most one playback session at a time. A session either decodes
//! a real resource through the decode module or simulates timed playback
//! when no resource is resolvable. Starting a new session always tears
//! down the previous one first, and every session event carries its
//! session id, so a superseded session can never complete on behalf of
//! its successor.

use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use super::decode::{self, NullSink, PcmSink};
use crate::protocol::{EngineError, EngineEvent, EngineState};
use crate::track::Track;

const SIMULATED_TICK: Duration = Duration::from_millis(100);
const PROGRESS_INTERVAL_SECS: u32 = 10;

/// Pause/cancel flags shared with the active session thread.
///
/// Paused sessions block on the condvar instead of polling, so resume
/// latency is a wakeup, not a tick.
struct SessionControl {
    flags: Mutex<ControlFlags>,
    wake: Condvar,
}

#[derive(Clone, Copy)]
struct ControlFlags {
    cancelled: bool,
    paused: bool,
}

impl SessionControl {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            flags: Mutex::new(ControlFlags {
                cancelled: false,
                paused: false,
            }),
            wake: Condvar::new(),
        })
    }

    fn cancel(&self) {
        let mut flags = self.flags.lock().unwrap();
        flags.cancelled = true;
        self.wake.notify_all();
    }

    fn set_paused(&self, paused: bool) {
        let mut flags = self.flags.lock().unwrap();
        flags.paused = paused;
        self.wake.notify_all();
    }

    fn is_cancelled(&self) -> bool {
        self.flags.lock().unwrap().cancelled
    }

    fn is_paused(&self) -> bool {
        self.flags.lock().unwrap().paused
    }

    /// Blocks while paused. Returns false once the session is cancelled.
    fn wait_while_paused(&self) -> bool {
        let mut flags = self.flags.lock().unwrap();
        while flags.paused && !flags.cancelled {
            flags = self.wake.wait(flags).unwrap();
        }
        !flags.cancelled
    }

    /// Sleeps one tick, waking early on cancel or pause. Returns false
    /// on cancel.
    fn tick(&self, interval: Duration) -> bool {
        let flags = self.flags.lock().unwrap();
        if flags.cancelled {
            return false;
        }
        let (flags, _) = self.wake.wait_timeout(flags, interval).unwrap();
        !flags.cancelled
    }
}

/// Event sender handed to a session thread; tags everything with the
/// session's id so the pump can discard output from superseded sessions.
#[derive(Clone)]
struct SessionSink {
    session_id: Uuid,
    tx: UnboundedSender<SessionEvent>,
}

impl SessionSink {
    fn started(&self) {
        self.send(SessionEventKind::Started);
    }

    fn progress(&self, elapsed_secs: u32, duration_secs: u32) {
        self.send(SessionEventKind::Progress {
            elapsed_secs,
            duration_secs,
        });
    }

    fn finished(&self) {
        self.send(SessionEventKind::Finished);
    }

    fn error(&self, reason: String) {
        self.send(SessionEventKind::Error(reason));
    }

    fn send(&self, kind: SessionEventKind) {
        let _ = self.tx.send(SessionEvent {
            session_id: self.session_id,
            kind,
        });
    }
}

struct SessionEvent {
    session_id: Uuid,
    kind: SessionEventKind,
}

enum SessionEventKind {
    Started,
    Progress {
        elapsed_secs: u32,
        duration_secs: u32,
    },
    Finished,
    Error(String),
}

struct ActiveSession {
    id: Uuid,
    control: Arc<SessionControl>,
}

struct EngineInner {
    state: EngineState,
    session: Option<ActiveSession>,
    events: UnboundedSender<EngineEvent>,
}

/// Builds one fresh sink per real decode session.
pub type SinkFactory = Arc<dyn Fn() -> Box<dyn PcmSink> + Send + Sync>;

/// Single-session audio engine.
///
/// `play` resolves the track's resource: a resolvable path gets a real
/// decode session, anything else degrades silently to a simulated timed
/// session. Engine events are delivered on the receiver returned by the
/// constructor, from the engine's own pump thread.
pub struct AudioEngine {
    inner: Arc<Mutex<EngineInner>>,
    session_tx: UnboundedSender<SessionEvent>,
    sink_factory: SinkFactory,
}

impl AudioEngine {
    /// Creates an engine whose real sessions pace through a `NullSink`.
    pub fn new() -> (Self, UnboundedReceiver<EngineEvent>) {
        Self::with_sink_factory(Arc::new(|| Box::new(NullSink)))
    }

    /// Creates an engine that builds one sink per real session from
    /// `sink_factory` (a CPAL-backed sink in a full player).
    pub fn with_sink_factory(sink_factory: SinkFactory) -> (Self, UnboundedReceiver<EngineEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Mutex::new(EngineInner {
            state: EngineState::Stopped,
            session: None,
            events: events_tx,
        }));
        let pump_inner = Arc::clone(&inner);
        thread::spawn(move || pump_loop(pump_inner, session_rx));
        (
            Self {
                inner,
                session_tx,
                sink_factory,
            },
            events_rx,
        )
    }

    /// Starts a session for `track`, tearing down any prior session
    /// first. Never blocks; the outcome arrives as engine events.
    pub fn play(&self, track: Track) {
        let mut inner = self.inner.lock().unwrap();
        teardown_locked(&mut inner);

        let id = Uuid::new_v4();
        let control = SessionControl::new();
        let events = SessionSink {
            session_id: id,
            tx: self.session_tx.clone(),
        };
        inner.state = EngineState::Loading;
        inner.session = Some(ActiveSession {
            id,
            control: Arc::clone(&control),
        });

        match resolve_resource(&track) {
            Ok(path) => {
                let sink = (self.sink_factory)();
                thread::spawn(move || run_real(track, path, sink, control, events));
            }
            Err(EngineError::MissingResource) => {
                warn!("{}: {}; simulating playback", track, EngineError::MissingResource);
                thread::spawn(move || run_simulated(track, control, events));
            }
            Err(other) => {
                // resolve_resource only degrades; it never fails hard.
                error!("unexpected resolution failure: {}", other);
            }
        }
    }

    /// Pauses the active session. No-op unless currently `Playing`.
    pub fn pause(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != EngineState::Playing {
            return;
        }
        let control = match &inner.session {
            Some(session) => Arc::clone(&session.control),
            None => return,
        };
        control.set_paused(true);
        inner.state = EngineState::Paused;
        debug!("playback paused");
        let _ = inner.events.send(EngineEvent::StateChanged(false));
    }

    /// Resumes a paused session from its retained position. No-op unless
    /// currently `Paused`.
    pub fn resume(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != EngineState::Paused {
            return;
        }
        let control = match &inner.session {
            Some(session) => Arc::clone(&session.control),
            None => return,
        };
        control.set_paused(false);
        inner.state = EngineState::Playing;
        debug!("playback resumed");
        let _ = inner.events.send(EngineEvent::StateChanged(true));
    }

    /// Cancels any active session and reports the stopped state. Safe in
    /// any state, idempotent.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        teardown_locked(&mut inner);
        let _ = inner.events.send(EngineEvent::StateChanged(false));
    }

    /// True while the engine is advancing playback (not paused).
    pub fn is_playing(&self) -> bool {
        self.inner.lock().unwrap().state == EngineState::Playing
    }

    pub fn state(&self) -> EngineState {
        self.inner.lock().unwrap().state
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            teardown_locked(&mut inner);
        }
    }
}

fn teardown_locked(inner: &mut EngineInner) {
    if let Some(session) = inner.session.take() {
        debug!("cancelling session {}", session.id);
        session.control.cancel();
    }
    inner.state = EngineState::Stopped;
}

/// Maps a track to its playback path. Missing or unset resource paths
/// degrade to simulation; this is never surfaced as a session error.
fn resolve_resource(track: &Track) -> Result<PathBuf, EngineError> {
    match &track.resource_path {
        Some(path) if path.exists() => Ok(path.clone()),
        Some(path) => {
            warn!("resource not found: {}", path.display());
            Err(EngineError::MissingResource)
        }
        None => Err(EngineError::MissingResource),
    }
}

/// Drains session events, discards anything from a superseded session,
/// and applies the rest to engine state before forwarding.
fn pump_loop(inner: Arc<Mutex<EngineInner>>, mut session_rx: UnboundedReceiver<SessionEvent>) {
    while let Some(event) = session_rx.blocking_recv() {
        let mut inner = inner.lock().unwrap();
        let is_current = matches!(&inner.session, Some(session) if session.id == event.session_id);
        if !is_current {
            debug!("discarding event from superseded session {}", event.session_id);
            continue;
        }
        match event.kind {
            SessionEventKind::Started => {
                inner.state = EngineState::Playing;
                let _ = inner.events.send(EngineEvent::StateChanged(true));
            }
            SessionEventKind::Progress {
                elapsed_secs,
                duration_secs,
            } => {
                let _ = inner.events.send(EngineEvent::Progress {
                    elapsed_secs,
                    duration_secs,
                });
            }
            SessionEventKind::Finished => {
                inner.state = EngineState::Stopped;
                inner.session = None;
                let _ = inner.events.send(EngineEvent::StateChanged(false));
                let _ = inner.events.send(EngineEvent::Finished);
            }
            SessionEventKind::Error(reason) => {
                error!("playback session failed: {}", reason);
                inner.state = EngineState::Stopped;
                inner.session = None;
                let _ = inner.events.send(EngineEvent::StateChanged(false));
                let _ = inner
                    .events
                    .send(EngineEvent::Error(EngineError::Decode(reason)));
            }
        }
    }
}

/// Timed stand-in for real playback: ticks up to the track's duration,
/// idling (without advancing) while paused.
fn run_simulated(track: Track, control: Arc<SessionControl>, events: SessionSink) {
    info!(
        "simulating playback: {} ({})",
        track,
        track.formatted_duration()
    );
    events.started();

    let duration_ms = u64::from(track.duration_secs) * 1000;
    let tick_ms = SIMULATED_TICK.as_millis() as u64;
    let mut elapsed_ms = 0u64;

    while elapsed_ms < duration_ms {
        if !control.wait_while_paused() {
            debug!("simulated session cancelled: {}", track);
            return;
        }
        if !control.tick(SIMULATED_TICK) {
            debug!("simulated session cancelled: {}", track);
            return;
        }
        if control.is_paused() {
            // Woken mid-tick by a pause; elapsed time does not advance.
            continue;
        }
        elapsed_ms += tick_ms;
        if elapsed_ms % (u64::from(PROGRESS_INTERVAL_SECS) * 1000) == 0 {
            events.progress((elapsed_ms / 1000) as u32, track.duration_secs);
        }
    }

    info!("finished: {}", track);
    events.finished();
}

/// Decodes a real resource into the session's sink until the natural end
/// of the stream, a decode failure, or cancellation.
fn run_real(
    track: Track,
    path: PathBuf,
    mut sink: Box<dyn PcmSink>,
    control: Arc<SessionControl>,
    events: SessionSink,
) {
    let mut resource = match decode::open_resource(&path) {
        Ok(resource) => resource,
        Err(reason) => {
            events.error(reason);
            return;
        }
    };
    info!("decoding {}", path.display());
    events.started();

    let sample_rate_hz = resource.sample_rate_hz;
    let channel_count = resource.channel_count;
    let mut frames_played: u64 = 0;
    let mut last_progress_secs = 0u32;

    loop {
        if !control.wait_while_paused() || control.is_cancelled() {
            debug!("decode session cancelled: {}", track);
            return;
        }
        match resource.next_frames() {
            Ok(Some(samples)) => {
                sink.write(&samples, channel_count, sample_rate_hz);
                frames_played += (samples.len() / channel_count.max(1) as usize) as u64;
                let elapsed_secs = (frames_played / u64::from(sample_rate_hz.max(1))) as u32;
                if elapsed_secs >= last_progress_secs + PROGRESS_INTERVAL_SECS {
                    last_progress_secs = elapsed_secs;
                    events.progress(elapsed_secs, track.duration_secs);
                }
            }
            Ok(None) => {
                info!("finished: {}", track);
                events.finished();
                return;
            }
            Err(reason) => {
                events.error(reason);
                return;
            }
        }
    }
}
