//! Shared helpers for playback session tests
//!
//! `MockEngine` records every call into a shared log and lets tests push
//! status updates the way a platform player would.

#![allow(dead_code)]

use async_trait::async_trait;
use cadence_core::{CadenceError, LikedStore, Track, TrackId};
use cadence_playback::{
    AudioEngine, EngineError, EngineFactory, EngineResult, EngineStatus, LoadOptions,
    PlaybackConfig, PlaybackSession, StatusSink,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ===== Engine =====

/// One recorded engine call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load { uri: String, autoplay: bool },
    Play,
    Pause,
    Stop,
    Unload,
    Seek { position_ms: u64, keep_playing: bool },
    SetLooping(bool),
    Replay,
    Subscribe,
    Unsubscribe,
}

#[derive(Default)]
pub struct EngineState {
    pub calls: Vec<Call>,
    pub created: usize,
    pub loaded: Option<String>,
    pub playing: bool,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
    pub looping: bool,
    pub sink: Option<StatusSink>,
    pub failing_uris: HashSet<String>,
    pub fail_seek: bool,
    pub fail_unload: bool,
    /// Set when a load arrived while other content was still loaded
    pub overlapping_load: bool,
}

impl EngineState {
    fn status(&self) -> EngineStatus {
        EngineStatus {
            is_loaded: self.loaded.is_some(),
            is_playing: self.playing,
            position_millis: self.position_ms,
            duration_millis: self.duration_ms,
            did_just_finish: false,
            is_looping: self.looping,
            error: None,
        }
    }
}

/// Test-side handle onto the mock engine's shared state
#[derive(Clone, Default)]
pub struct EngineHandle(Arc<Mutex<EngineState>>);

impl EngineHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(&self) -> MockFactory {
        MockFactory {
            state: self.0.clone(),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.0.lock().unwrap().calls.clear();
    }

    pub fn created(&self) -> usize {
        self.0.lock().unwrap().created
    }

    pub fn loaded_uri(&self) -> Option<String> {
        self.0.lock().unwrap().loaded.clone()
    }

    pub fn is_looping(&self) -> bool {
        self.0.lock().unwrap().looping
    }

    pub fn overlapping_load(&self) -> bool {
        self.0.lock().unwrap().overlapping_load
    }

    pub fn has_subscriber(&self) -> bool {
        self.0.lock().unwrap().sink.is_some()
    }

    pub fn fail_load(&self, uri: &str) {
        self.0.lock().unwrap().failing_uris.insert(uri.to_string());
    }

    pub fn fail_seek(&self, fail: bool) {
        self.0.lock().unwrap().fail_seek = fail;
    }

    pub fn fail_unload(&self, fail: bool) {
        self.0.lock().unwrap().fail_unload = fail;
    }

    pub fn set_position(&self, position_ms: u64) {
        self.0.lock().unwrap().position_ms = position_ms;
    }

    pub fn set_duration(&self, duration_ms: Option<u64>) {
        self.0.lock().unwrap().duration_ms = duration_ms;
    }

    /// Push a raw status through the current subscription
    pub fn emit(&self, status: EngineStatus) -> bool {
        let state = self.0.lock().unwrap();
        match &state.sink {
            Some(sink) => sink.emit(status),
            None => false,
        }
    }

    /// Push a progress update at `position_ms`
    pub fn progress(&self, position_ms: u64) -> bool {
        let status = {
            let mut state = self.0.lock().unwrap();
            state.position_ms = position_ms;
            state.status()
        };
        self.emit(status)
    }

    /// Drop the loaded source and report it with an error
    pub fn lose_source(&self, message: &str) -> bool {
        let status = {
            let mut state = self.0.lock().unwrap();
            state.loaded = None;
            state.playing = false;
            let mut status = state.status();
            status.error = Some(message.to_string());
            status
        };
        self.emit(status)
    }

    /// Push an end-of-track update
    pub fn finish(&self) -> bool {
        let status = {
            let mut state = self.0.lock().unwrap();
            state.playing = false;
            let mut status = state.status();
            status.did_just_finish = true;
            status
        };
        self.emit(status)
    }

    /// Push an end-of-track update that ignores the looping flag
    pub fn finish_without_loop(&self) -> bool {
        let status = {
            let mut state = self.0.lock().unwrap();
            state.playing = false;
            let mut status = state.status();
            status.did_just_finish = true;
            status.is_looping = false;
            status
        };
        self.emit(status)
    }
}

pub struct MockFactory {
    state: Arc<Mutex<EngineState>>,
}

impl EngineFactory for MockFactory {
    type Engine = MockEngine;

    fn create(&mut self) -> EngineResult<MockEngine> {
        self.state.lock().unwrap().created += 1;
        Ok(MockEngine {
            state: self.state.clone(),
        })
    }
}

pub struct MockEngine {
    state: Arc<Mutex<EngineState>>,
}

impl MockEngine {
    fn with_state<T>(&self, f: impl FnOnce(&mut EngineState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }
}

#[async_trait]
impl AudioEngine for MockEngine {
    async fn load(&mut self, uri: &str, options: LoadOptions) -> EngineResult<EngineStatus> {
        self.with_state(|s| {
            s.calls.push(Call::Load {
                uri: uri.to_string(),
                autoplay: options.autoplay_on_load,
            });
            if s.failing_uris.contains(uri) {
                return Err(EngineError::Load(format!("cannot open {uri}")));
            }
            if s.loaded.is_some() {
                s.overlapping_load = true;
            }
            s.loaded = Some(uri.to_string());
            s.playing = options.autoplay_on_load;
            s.position_ms = 0;
            Ok(s.status())
        })
    }

    async fn play(&mut self) -> EngineResult<()> {
        self.with_state(|s| {
            s.calls.push(Call::Play);
            if s.loaded.is_none() {
                return Err(EngineError::NotLoaded);
            }
            s.playing = true;
            Ok(())
        })
    }

    async fn pause(&mut self) -> EngineResult<()> {
        self.with_state(|s| {
            s.calls.push(Call::Pause);
            s.playing = false;
            Ok(())
        })
    }

    async fn stop(&mut self) -> EngineResult<()> {
        self.with_state(|s| {
            s.calls.push(Call::Stop);
            s.playing = false;
            s.position_ms = 0;
            Ok(())
        })
    }

    async fn unload(&mut self) -> EngineResult<()> {
        self.with_state(|s| {
            s.calls.push(Call::Unload);
            if s.fail_unload {
                return Err(EngineError::Playback("device busy".to_string()));
            }
            if s.loaded.take().is_none() {
                return Err(EngineError::Playback(
                    "Cannot complete operation because sound is not loaded.".to_string(),
                ));
            }
            s.playing = false;
            Ok(())
        })
    }

    async fn seek_to(&mut self, position: Duration, keep_playing: bool) -> EngineResult<()> {
        self.with_state(|s| {
            let position_ms = u64::try_from(position.as_millis()).unwrap_or(u64::MAX);
            s.calls.push(Call::Seek {
                position_ms,
                keep_playing,
            });
            if s.fail_seek {
                return Err(EngineError::Playback("seek rejected".to_string()));
            }
            s.position_ms = position_ms;
            s.playing = keep_playing;
            Ok(())
        })
    }

    async fn set_looping(&mut self, looping: bool) -> EngineResult<()> {
        self.with_state(|s| {
            s.calls.push(Call::SetLooping(looping));
            s.looping = looping;
            Ok(())
        })
    }

    async fn replay(&mut self) -> EngineResult<()> {
        self.with_state(|s| {
            s.calls.push(Call::Replay);
            s.position_ms = 0;
            s.playing = true;
            Ok(())
        })
    }

    async fn status(&mut self) -> EngineResult<EngineStatus> {
        Ok(self.with_state(|s| s.status()))
    }

    fn subscribe_status(&mut self, sink: StatusSink) {
        self.with_state(|s| {
            s.calls.push(Call::Subscribe);
            s.sink = Some(sink);
        });
    }

    fn unsubscribe_status(&mut self) {
        self.with_state(|s| {
            s.calls.push(Call::Unsubscribe);
            s.sink = None;
        });
    }
}

// ===== Liked store =====

#[derive(Default)]
pub struct TestLikedStore {
    ids: Mutex<Vec<TrackId>>,
    failing: AtomicBool,
}

impl TestLikedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.lock().unwrap().iter().any(|t| t.as_str() == id)
    }

    fn check(&self) -> cadence_core::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CadenceError::storage("store unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LikedStore for TestLikedStore {
    async fn is_liked(&self, track_id: &TrackId) -> cadence_core::Result<bool> {
        self.check()?;
        Ok(self.ids.lock().unwrap().contains(track_id))
    }

    async fn like(&self, track_id: &TrackId) -> cadence_core::Result<()> {
        self.check()?;
        let mut ids = self.ids.lock().unwrap();
        if !ids.contains(track_id) {
            ids.push(track_id.clone());
        }
        Ok(())
    }

    async fn unlike(&self, track_id: &TrackId) -> cadence_core::Result<()> {
        self.check()?;
        self.ids.lock().unwrap().retain(|t| t != track_id);
        Ok(())
    }

    async fn liked_ids(&self) -> cadence_core::Result<Vec<TrackId>> {
        self.check()?;
        Ok(self.ids.lock().unwrap().clone())
    }
}

// ===== Builders =====

pub type TestSession = PlaybackSession<MockFactory, TestLikedStore>;

pub fn track(id: &str) -> Track {
    Track::new(id, format!("Track {id}"))
        .with_url(format!("file:///music/{id}.mp3"))
        .with_artist("Test Artist")
        .with_duration(Duration::from_secs(180))
}

pub fn uri(id: &str) -> String {
    format!("file:///music/{id}.mp3")
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

pub fn config() -> PlaybackConfig {
    PlaybackConfig {
        shuffle_seed: Some(42),
        ..PlaybackConfig::default()
    }
}

pub fn session() -> (TestSession, EngineHandle, Arc<TestLikedStore>) {
    session_with(config())
}

pub fn session_with(config: PlaybackConfig) -> (TestSession, EngineHandle, Arc<TestLikedStore>) {
    let engine = EngineHandle::new();
    let liked = TestLikedStore::new();
    let session = PlaybackSession::new(engine.factory(), liked.clone(), config);
    (session, engine, liked)
}

/// Session already playing `playlist[index]`
pub async fn playing(
    ids: &[&str],
    index: usize,
) -> (TestSession, EngineHandle, Arc<TestLikedStore>) {
    let (mut session, engine, liked) = session();
    let playlist = tracks(ids);
    let start = playlist[index].clone();
    assert!(session.load_audio(start, true, playlist, index).await);
    session.drain_events();
    engine.clear_calls();
    (session, engine, liked)
}

pub fn current_id(session: &TestSession) -> Option<String> {
    session.current_track().map(|t| t.id.to_string())
}
