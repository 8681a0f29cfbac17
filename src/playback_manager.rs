//! Playback orchestration over the pending queue, play history, and
//! current track.
//!
//! The manager owns one FIFO queue of pending tracks and one LIFO stack
//! of played tracks, delegates actual playback to the audio engine, and
//! mirrors the engine's state. Every state transition, whether initiated
//! by a caller or by an engine event, is serialized behind a single
//! mutex. Lifecycle events are re-published to subscribers over a
//! broadcast bus.

use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, error, info};
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::audio::AudioEngine;
use crate::protocol::{EngineEvent, PlayerEvent};
use crate::structures::{CircularList, Queue, Stack};
use crate::track::{format_time, Track};

const EVENT_BUS_CAPACITY: usize = 1024;

struct PlayerCore {
    pending: Queue<Track>,
    history: Stack<Track>,
    current: Option<Track>,
    playing: bool,
    engine: AudioEngine,
}

/// Coordinates the pending queue, play history, and current track.
pub struct PlaybackManager {
    core: Arc<Mutex<PlayerCore>>,
    events: broadcast::Sender<PlayerEvent>,
}

impl PlaybackManager {
    /// Creates a manager with its own audio engine (pacing-sink real
    /// path) and spawns the engine event pump.
    pub fn new() -> Self {
        let (engine, engine_events) = AudioEngine::new();
        Self::with_engine(engine, engine_events)
    }

    /// Creates a manager around a caller-configured engine, e.g. one
    /// built with a custom sink factory.
    pub fn with_engine(engine: AudioEngine, engine_events: UnboundedReceiver<EngineEvent>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        let core = Arc::new(Mutex::new(PlayerCore {
            pending: Queue::new(),
            history: Stack::new(),
            current: None,
            playing: false,
            engine,
        }));
        let pump_core = Arc::clone(&core);
        let pump_events = events.clone();
        thread::spawn(move || engine_event_pump(pump_core, pump_events, engine_events));
        Self { core, events }
    }

    /// Subscribes to track/state events.
    ///
    /// Events are delivered either from the caller's own thread (for
    /// transitions it initiated) or from the manager's engine event pump
    /// thread (for engine-driven transitions such as auto-advance).
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// Appends a track to the pending queue. No playback state change.
    pub fn enqueue(&self, track: Track) {
        let mut core = self.core.lock().unwrap();
        info!("queued: {}", track);
        core.pending.enqueue(track);
    }

    /// Advances to the next pending track, pushing the current one onto
    /// history. Returns the new current track, or None when the queue
    /// was empty (playback stops).
    pub fn play_next(&self) -> Option<Track> {
        self.core.lock().unwrap().play_next(&self.events)
    }

    /// Returns to the most recently played track. No-op returning None
    /// when the history is empty; otherwise the current track (if any)
    /// is put back at the front of the pending queue, ahead of
    /// everything still pending, in original order.
    pub fn play_previous(&self) -> Option<Track> {
        self.core.lock().unwrap().play_previous(&self.events)
    }

    /// Plays an explicitly selected track, pushing the current one onto
    /// history.
    pub fn play_track(&self, track: Track) {
        self.core.lock().unwrap().play_track(track, &self.events);
    }

    /// Pauses a playing engine or resumes a paused one. No-op without a
    /// current track. The resulting state reaches subscribers through
    /// the engine event pump.
    pub fn toggle_pause(&self) {
        let core = self.core.lock().unwrap();
        if core.current.is_none() {
            return;
        }
        if core.engine.is_playing() {
            core.engine.pause();
        } else {
            core.engine.resume();
        }
    }

    /// Stops playback. A stopped track still counts as played and goes
    /// onto the history.
    pub fn stop(&self) {
        self.core.lock().unwrap().stop(&self.events);
    }

    /// Empties the pending queue.
    pub fn clear_queue(&self) {
        let mut core = self.core.lock().unwrap();
        core.pending.clear();
        info!("pending queue cleared");
    }

    /// Empties the play history.
    pub fn clear_history(&self) {
        let mut core = self.core.lock().unwrap();
        core.history.clear();
        info!("history cleared");
    }

    pub fn current_track(&self) -> Option<Track> {
        self.core.lock().unwrap().current.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.core.lock().unwrap().playing
    }

    /// Pending tracks, front to back.
    pub fn pending_snapshot(&self) -> CircularList<Track> {
        self.core.lock().unwrap().pending.snapshot()
    }

    /// Played tracks, most recent first.
    pub fn history_snapshot(&self) -> CircularList<Track> {
        self.core.lock().unwrap().history.snapshot()
    }

    pub fn queue_len(&self) -> usize {
        self.core.lock().unwrap().pending.len()
    }

    pub fn history_len(&self) -> usize {
        self.core.lock().unwrap().history.len()
    }
}

impl Default for PlaybackManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerCore {
    fn play_next(&mut self, events: &broadcast::Sender<PlayerEvent>) -> Option<Track> {
        if let Some(current) = self.current.take() {
            self.history.push(current);
        }
        self.current = self.pending.dequeue();
        match &self.current {
            Some(track) => {
                self.playing = true;
                self.engine.play(track.clone());
                info!("playing: {}", track);
                let _ = events.send(PlayerEvent::TrackChanged(track.clone()));
            }
            None => {
                self.playing = false;
                self.engine.stop();
                info!("queue exhausted; playback stopped");
            }
        }
        self.current.clone()
    }

    fn play_previous(&mut self, events: &broadcast::Sender<PlayerEvent>) -> Option<Track> {
        let previous = self.history.pop()?;
        if let Some(current) = self.current.take() {
            // The queue has no push-front; rebuild it with the current
            // track ahead of everything still pending.
            let mut rebuilt = Queue::new();
            rebuilt.enqueue(current);
            while let Some(track) = self.pending.dequeue() {
                rebuilt.enqueue(track);
            }
            self.pending = rebuilt;
        }
        self.playing = true;
        self.engine.play(previous.clone());
        info!("playing previous: {}", previous);
        let _ = events.send(PlayerEvent::TrackChanged(previous.clone()));
        self.current = Some(previous.clone());
        Some(previous)
    }

    fn play_track(&mut self, track: Track, events: &broadcast::Sender<PlayerEvent>) {
        if let Some(current) = self.current.take() {
            self.history.push(current);
        }
        self.playing = true;
        self.engine.play(track.clone());
        info!("playing: {}", track);
        let _ = events.send(PlayerEvent::TrackChanged(track.clone()));
        self.current = Some(track);
    }

    fn stop(&mut self, events: &broadcast::Sender<PlayerEvent>) {
        if let Some(current) = self.current.take() {
            debug!("pushed to history: {}", current);
            self.history.push(current);
        }
        self.playing = false;
        self.engine.stop();
        info!("playback stopped");
        let _ = events.send(PlayerEvent::StateChanged(false));
    }
}

/// Applies engine events to manager state: auto-advance on natural
/// completion, surface-and-halt on decode errors, mirror on state
/// changes.
fn engine_event_pump(
    core: Arc<Mutex<PlayerCore>>,
    events: broadcast::Sender<PlayerEvent>,
    mut engine_events: UnboundedReceiver<EngineEvent>,
) {
    while let Some(event) = engine_events.blocking_recv() {
        match event {
            EngineEvent::Finished => {
                debug!("track finished; advancing");
                core.lock().unwrap().play_next(&events);
            }
            EngineEvent::Error(engine_error) => {
                error!("audio engine error: {}", engine_error);
                let mut core = core.lock().unwrap();
                // Fatal to the current session only: no auto-advance.
                core.current = None;
                core.playing = false;
                let _ = events.send(PlayerEvent::PlaybackError(engine_error.to_string()));
                let _ = events.send(PlayerEvent::StateChanged(false));
            }
            EngineEvent::StateChanged(playing) => {
                core.lock().unwrap().playing = playing;
                let _ = events.send(PlayerEvent::StateChanged(playing));
            }
            EngineEvent::Progress {
                elapsed_secs,
                duration_secs,
            } => {
                debug!(
                    "progress: {} / {}",
                    format_time(elapsed_secs),
                    format_time(duration_secs)
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tokio::sync::broadcast::error::TryRecvError;

    fn test_track(id: i64, duration_secs: u32) -> Track {
        Track {
            id,
            title: format!("track-{}", id),
            artist: "test".to_string(),
            album: None,
            duration_secs,
            resource_path: None,
        }
    }

    fn titles(list: &CircularList<Track>) -> Vec<String> {
        list.iter().map(|track| track.title.clone()).collect()
    }

    fn wait_for_event(
        rx: &mut broadcast::Receiver<PlayerEvent>,
        timeout: Duration,
        pred: impl Fn(&PlayerEvent) -> bool,
    ) -> Option<PlayerEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            match rx.try_recv() {
                Ok(event) if pred(&event) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Empty) => {
                    if Instant::now() >= deadline {
                        return None;
                    }
                    thread::sleep(Duration::from_millis(10));
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Closed) => return None,
            }
        }
    }

    #[test]
    fn enqueue_then_play_next_is_fifo() {
        let manager = PlaybackManager::new();
        manager.enqueue(test_track(1, 60));
        manager.enqueue(test_track(2, 60));
        manager.enqueue(test_track(3, 60));
        assert_eq!(manager.queue_len(), 3);

        assert_eq!(manager.play_next(), Some(test_track(1, 60)));
        assert_eq!(manager.current_track(), Some(test_track(1, 60)));
        assert!(manager.is_playing());
        assert_eq!(titles(&manager.pending_snapshot()), vec!["track-2", "track-3"]);
    }

    #[test]
    fn play_next_on_empty_queue_goes_idle() {
        let manager = PlaybackManager::new();
        assert_eq!(manager.play_next(), None);
        assert_eq!(manager.current_track(), None);
        assert!(!manager.is_playing());
    }

    #[test]
    fn play_previous_on_empty_history_is_a_no_op() {
        let manager = PlaybackManager::new();
        manager.play_track(test_track(1, 60));
        assert_eq!(manager.play_previous(), None);
        assert_eq!(manager.current_track(), Some(test_track(1, 60)));
    }

    #[test]
    fn previous_then_next_round_trips() {
        let manager = PlaybackManager::new();
        let a = test_track(1, 60);
        let b = test_track(2, 60);
        manager.play_track(a.clone());
        manager.play_track(b.clone());

        assert_eq!(manager.play_previous(), Some(a.clone()));
        assert_eq!(manager.current_track(), Some(a));
        // B went back to the front of the queue.
        assert_eq!(manager.play_next(), Some(b.clone()));
        assert_eq!(manager.current_track(), Some(b));
    }

    #[test]
    fn play_previous_preserves_pending_order() {
        let manager = PlaybackManager::new();
        manager.play_track(test_track(1, 60));
        manager.play_track(test_track(2, 60));
        manager.enqueue(test_track(3, 60));
        manager.enqueue(test_track(4, 60));

        manager.play_previous();
        assert_eq!(
            titles(&manager.pending_snapshot()),
            vec!["track-2", "track-3", "track-4"]
        );
    }

    #[test]
    fn stop_counts_the_current_track_as_played() {
        let manager = PlaybackManager::new();
        manager.play_track(test_track(1, 60));
        manager.stop();
        assert_eq!(manager.current_track(), None);
        assert!(!manager.is_playing());
        assert_eq!(titles(&manager.history_snapshot()), vec!["track-1"]);
    }

    #[test]
    fn history_snapshot_is_most_recent_first() {
        let manager = PlaybackManager::new();
        manager.play_track(test_track(1, 60));
        manager.play_track(test_track(2, 60));
        manager.play_track(test_track(3, 60));
        assert_eq!(
            titles(&manager.history_snapshot()),
            vec!["track-2", "track-1"]
        );
        assert_eq!(manager.history_len(), 2);
    }

    #[test]
    fn clear_queue_and_history_reset_the_containers() {
        let manager = PlaybackManager::new();
        manager.enqueue(test_track(1, 60));
        manager.play_track(test_track(2, 60));
        manager.play_track(test_track(3, 60));
        manager.clear_queue();
        manager.clear_history();
        assert_eq!(manager.queue_len(), 0);
        assert_eq!(manager.history_len(), 0);
    }

    #[test]
    fn toggle_pause_without_a_current_track_is_a_no_op() {
        let manager = PlaybackManager::new();
        let mut events = manager.subscribe();
        manager.toggle_pause();
        thread::sleep(Duration::from_millis(100));
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn play_emits_track_changed() {
        let manager = PlaybackManager::new();
        let mut events = manager.subscribe();
        let track = test_track(1, 60);
        manager.play_track(track.clone());
        let event = wait_for_event(&mut events, Duration::from_secs(1), |event| {
            matches!(event, PlayerEvent::TrackChanged(_))
        });
        match event {
            Some(PlayerEvent::TrackChanged(changed)) => assert_eq!(changed, track),
            other => panic!("expected TrackChanged, got {:?}", other),
        }
    }

    #[test]
    fn finished_track_auto_advances_to_the_next() {
        let manager = PlaybackManager::new();
        manager.enqueue(test_track(1, 1));
        manager.enqueue(test_track(2, 60));
        let mut events = manager.subscribe();
        manager.play_next();

        // Track 1 simulates for one second, then the pump advances.
        let advanced = wait_for_event(&mut events, Duration::from_secs(4), |event| {
            matches!(event, PlayerEvent::TrackChanged(track) if track.id == 2)
        });
        assert!(advanced.is_some());
        assert_eq!(manager.current_track(), Some(test_track(2, 60)));
        assert_eq!(titles(&manager.history_snapshot()), vec!["track-1"]);
    }

    #[test]
    fn decode_error_surfaces_and_halts() {
        use std::io::Write;

        let mut path = std::env::temp_dir();
        path.push(format!("playdeck-manager-test-{}.mp3", std::process::id()));
        let mut file = std::fs::File::create(&path).expect("failed to create temp file");
        file.write_all(b"garbage that symphonia cannot probe")
            .expect("failed to write temp file");
        drop(file);

        let manager = PlaybackManager::new();
        let mut events = manager.subscribe();
        let mut track = test_track(1, 60);
        track.resource_path = Some(path.clone());
        manager.enqueue(test_track(2, 60));
        manager.play_track(track);

        let error = wait_for_event(&mut events, Duration::from_secs(3), |event| {
            matches!(event, PlayerEvent::PlaybackError(_))
        });
        let _ = std::fs::remove_file(&path);
        assert!(error.is_some());
        // No auto-advance on failure: track 2 stays pending.
        assert_eq!(manager.current_track(), None);
        assert!(!manager.is_playing());
        assert_eq!(manager.queue_len(), 1);
    }
}
