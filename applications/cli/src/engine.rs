//! Simulated audio engine
//!
//! Stands in for a platform player: no audio is decoded, but position,
//! end-of-track and looping behave like a real player and status updates are
//! pushed on the requested interval.

use async_trait::async_trait;
use cadence_playback::{
    AudioEngine, EngineError, EngineResult, EngineStatus, LoadOptions, StatusSink,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct Loaded {
    uri: String,
    length: Duration,
    position: Duration,
}

#[derive(Debug, Default)]
struct SimState {
    loaded: Option<Loaded>,
    playing: bool,
    looping: bool,
    sink: Option<StatusSink>,
}

impl SimState {
    fn status(&self, did_just_finish: bool) -> EngineStatus {
        match &self.loaded {
            Some(loaded) => EngineStatus {
                is_loaded: true,
                is_playing: self.playing,
                position_millis: millis(loaded.position),
                duration_millis: Some(millis(loaded.length)),
                did_just_finish,
                is_looping: self.looping,
                error: None,
            },
            None => EngineStatus {
                is_looping: self.looping,
                ..Default::default()
            },
        }
    }

    fn loaded_mut(&mut self) -> EngineResult<&mut Loaded> {
        self.loaded.as_mut().ok_or(EngineError::NotLoaded)
    }

    fn publish(&self, did_just_finish: bool) {
        if let Some(sink) = &self.sink {
            sink.emit(self.status(did_just_finish));
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Move the playhead forward by `elapsed`
///
/// Returns the status to publish, or `None` when nothing is loaded. Reaching
/// the end either wraps (looping) or stops at the end; both report a finish.
fn advance(state: &mut SimState, elapsed: Duration) -> Option<EngineStatus> {
    let looping = state.looping;
    let playing = state.playing;
    let loaded = state.loaded.as_mut()?;

    let mut finished = false;
    if playing {
        loaded.position += elapsed;
        if loaded.position >= loaded.length {
            finished = true;
            if looping && !loaded.length.is_zero() {
                let over = loaded.position.as_nanos() % loaded.length.as_nanos();
                loaded.position = Duration::from_nanos(u64::try_from(over).unwrap_or(0));
            } else {
                loaded.position = loaded.length;
                state.playing = false;
            }
        }
    }

    Some(state.status(finished))
}

/// Check that a source can be opened
fn validate_uri(uri: &str) -> EngineResult<()> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return Ok(());
    }
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    if Path::new(path).is_file() {
        Ok(())
    } else {
        Err(EngineError::Load(format!("cannot open source {uri}")))
    }
}

/// Engine that plays silence for the configured length of each source
pub struct SimulatedEngine {
    state: Arc<Mutex<SimState>>,
    lengths: Arc<HashMap<String, Duration>>,
    default_length: Duration,
    ticker: Option<JoinHandle<()>>,
}

impl SimulatedEngine {
    /// Create an engine; sources missing from `lengths` last `default_length`
    pub fn new(lengths: Arc<HashMap<String, Duration>>, default_length: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::default())),
            lengths,
            default_length,
            ticker: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_ticker(&mut self, period: Duration) {
        self.stop_ticker();
        let state = Arc::clone(&self.state);
        let period = period.max(Duration::from_millis(1));
        self.ticker = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
                let Some(status) = advance(&mut guard, period) else {
                    break;
                };
                trace!(position_ms = status.position_millis, "Simulated tick");
                if let Some(sink) = &guard.sink {
                    sink.emit(status);
                }
            }
        }));
    }

    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

#[async_trait]
impl AudioEngine for SimulatedEngine {
    async fn load(&mut self, uri: &str, options: LoadOptions) -> EngineResult<EngineStatus> {
        validate_uri(uri)?;
        let length = self
            .lengths
            .get(uri)
            .copied()
            .unwrap_or(self.default_length);

        let status = {
            let mut state = self.lock();
            state.loaded = Some(Loaded {
                uri: uri.to_string(),
                length,
                position: Duration::ZERO,
            });
            state.playing = options.autoplay_on_load;
            state.status(false)
        };
        debug!(uri, length_ms = millis(length), "Simulated source loaded");
        self.start_ticker(options.status_update_interval);
        Ok(status)
    }

    async fn play(&mut self) -> EngineResult<()> {
        let mut state = self.lock();
        let loaded = state.loaded_mut()?;
        if loaded.position >= loaded.length {
            loaded.position = Duration::ZERO;
        }
        state.playing = true;
        state.publish(false);
        Ok(())
    }

    async fn pause(&mut self) -> EngineResult<()> {
        let mut state = self.lock();
        state.loaded_mut()?;
        state.playing = false;
        state.publish(false);
        Ok(())
    }

    async fn stop(&mut self) -> EngineResult<()> {
        let mut state = self.lock();
        state.loaded_mut()?.position = Duration::ZERO;
        state.playing = false;
        state.publish(false);
        Ok(())
    }

    async fn unload(&mut self) -> EngineResult<()> {
        let uri = {
            let mut state = self.lock();
            let loaded = state
                .loaded
                .take()
                .ok_or_else(|| EngineError::Playback("sound is not loaded".to_string()))?;
            state.playing = false;
            loaded.uri
        };
        self.stop_ticker();
        debug!(uri = %uri, "Simulated source unloaded");
        Ok(())
    }

    async fn seek_to(&mut self, position: Duration, keep_playing: bool) -> EngineResult<()> {
        let mut state = self.lock();
        let loaded = state.loaded_mut()?;
        loaded.position = position.min(loaded.length);
        if !keep_playing {
            state.playing = false;
        }
        state.publish(false);
        Ok(())
    }

    async fn set_looping(&mut self, looping: bool) -> EngineResult<()> {
        self.lock().looping = looping;
        Ok(())
    }

    async fn replay(&mut self) -> EngineResult<()> {
        let mut state = self.lock();
        state.loaded_mut()?.position = Duration::ZERO;
        state.playing = true;
        state.publish(false);
        Ok(())
    }

    async fn status(&mut self) -> EngineResult<EngineStatus> {
        Ok(self.lock().status(false))
    }

    fn subscribe_status(&mut self, sink: StatusSink) {
        self.lock().sink = Some(sink);
    }

    fn unsubscribe_status(&mut self) {
        self.lock().sink = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_state(length_ms: u64, looping: bool) -> SimState {
        SimState {
            loaded: Some(Loaded {
                uri: "https://cdn.test/a.mp3".to_string(),
                length: Duration::from_millis(length_ms),
                position: Duration::ZERO,
            }),
            playing: true,
            looping,
            sink: None,
        }
    }

    #[test]
    fn advance_moves_playhead_only_while_playing() {
        let mut state = loaded_state(1_000, false);
        let status = advance(&mut state, Duration::from_millis(300)).unwrap();
        assert_eq!(status.position_millis, 300);
        assert!(!status.did_just_finish);

        state.playing = false;
        let status = advance(&mut state, Duration::from_millis(300)).unwrap();
        assert_eq!(status.position_millis, 300);
    }

    #[test]
    fn advance_finishes_at_end() {
        let mut state = loaded_state(1_000, false);
        let status = advance(&mut state, Duration::from_millis(1_200)).unwrap();
        assert!(status.did_just_finish);
        assert!(!status.is_playing);
        assert_eq!(status.position_millis, 1_000);

        let status = advance(&mut state, Duration::from_millis(500)).unwrap();
        assert!(!status.did_just_finish);
    }

    #[test]
    fn advance_wraps_when_looping() {
        let mut state = loaded_state(1_000, true);
        let status = advance(&mut state, Duration::from_millis(1_250)).unwrap();
        assert!(status.did_just_finish);
        assert!(status.is_looping);
        assert!(status.is_playing);
        assert_eq!(status.position_millis, 250);
    }

    #[test]
    fn advance_without_source_reports_nothing() {
        let mut state = SimState::default();
        assert!(advance(&mut state, Duration::from_secs(1)).is_none());
    }

    #[test]
    fn validates_sources() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("song.mp3");
        std::fs::write(&file, b"").unwrap();

        assert!(validate_uri("https://cdn.test/a.mp3").is_ok());
        assert!(validate_uri(&format!("file://{}", file.display())).is_ok());
        assert!(matches!(
            validate_uri("file:///definitely/not/here.mp3"),
            Err(EngineError::Load(_))
        ));
        assert!(validate_uri("ftp://cdn.test/a.mp3").is_err());
    }

    fn options() -> LoadOptions {
        LoadOptions {
            autoplay_on_load: false,
            status_update_interval: Duration::from_millis(100),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transport_controls() {
        let mut lengths = HashMap::new();
        lengths.insert("https://cdn.test/a.mp3".to_string(), Duration::from_secs(2));
        let mut engine = SimulatedEngine::new(Arc::new(lengths), Duration::from_secs(60));

        let status = engine.load("https://cdn.test/a.mp3", options()).await.unwrap();
        assert!(status.is_loaded);
        assert!(!status.is_playing);
        assert_eq!(status.duration_millis, Some(2_000));

        engine.play().await.unwrap();
        engine.seek_to(Duration::from_secs(5), true).await.unwrap();
        let status = engine.status().await.unwrap();
        assert_eq!(status.position_millis, 2_000);
        assert!(status.is_playing);

        engine.stop().await.unwrap();
        let status = engine.status().await.unwrap();
        assert_eq!(status.position_millis, 0);
        assert!(!status.is_playing);

        engine.unload().await.unwrap();
        let err = engine.unload().await.unwrap_err();
        assert!(err.is_not_loaded());
        assert!(matches!(engine.play().await, Err(EngineError::NotLoaded)));
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_advances_position() {
        let mut engine = SimulatedEngine::new(Arc::new(HashMap::new()), Duration::from_secs(60));
        let mut opts = options();
        opts.autoplay_on_load = true;
        engine.load("https://cdn.test/b.mp3", opts).await.unwrap();

        tokio::time::sleep(Duration::from_millis(350)).await;
        let status = engine.status().await.unwrap();
        assert_eq!(status.position_millis, 300);
        assert_eq!(status.duration_millis, Some(60_000));
    }
}
