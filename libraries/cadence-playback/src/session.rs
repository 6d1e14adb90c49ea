//! Playback session - core orchestration
//!
//! One session per running application. It owns the current track, the
//! primary playlist, the queue and the playback flags, and is mutated only
//! through the action methods below. All engine access goes through the
//! [`AudioResource`], and every engine failure is logged and turned into a
//! state reset instead of being returned to the caller.

use crate::{
    adapter::{normalize_status, AudioResource},
    engine::{EngineFactory, EngineStatus},
    error::{PlaybackError, Result},
    events::{progress, SessionEvent, SessionSnapshot},
    guard::TrackRequestGuard,
    like::LikeStatus,
    playlist::PlaylistCursor,
    policy::{self, Advance, AdvanceContext, Retreat, Trigger},
    position::PositionTracker,
    queue::PlayQueue,
    types::{ActiveSource, PlaybackConfig, PlaybackState, RepeatMode},
};
use cadence_core::{LikedStore, Track, TrackId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// The playback session
pub struct PlaybackSession<F: EngineFactory, L: LikedStore + ?Sized> {
    config: PlaybackConfig,
    resource: AudioResource<F>,
    liked_store: Arc<L>,
    like: LikeStatus,
    guard: TrackRequestGuard,
    rng: StdRng,

    current_track: Option<Track>,
    playlist: PlaylistCursor,
    queue: PlayQueue,
    active_source: Option<ActiveSource>,

    state: PlaybackState,
    position: PositionTracker,
    duration_ms: Option<u64>,
    repeat: RepeatMode,
    shuffle: bool,

    /// Cleared once a finish has been handled; re-armed by load, replay and play
    awaiting_finish: bool,

    pending_events: Vec<SessionEvent>,
}

impl<F: EngineFactory, L: LikedStore + ?Sized> PlaybackSession<F, L> {
    /// Create a session
    ///
    /// No engine handle is created until the first track is loaded.
    pub fn new(factory: F, liked_store: Arc<L>, config: PlaybackConfig) -> Self {
        let rng = match config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let resource = AudioResource::new(factory, config.status_update_interval());

        Self {
            repeat: config.repeat,
            shuffle: config.shuffle,
            config,
            resource,
            liked_store,
            like: LikeStatus::new(),
            guard: TrackRequestGuard::new(),
            rng,
            current_track: None,
            playlist: PlaylistCursor::new(),
            queue: PlayQueue::new(),
            active_source: None,
            state: PlaybackState::Idle,
            position: PositionTracker::new(),
            duration_ms: None,
            awaiting_finish: false,
            pending_events: Vec::new(),
        }
    }

    // ===== Loading =====

    /// Replace the primary playlist, clear the queue and load `track`
    ///
    /// Returns whether the track was loaded. A track without a url, or an
    /// engine failure, resets the session to Idle.
    pub async fn load_audio(
        &mut self,
        track: Track,
        play_immediately: bool,
        playlist: Vec<Track>,
        index: usize,
    ) -> bool {
        debug!(track_id = %track.id, play_immediately, index, "Load audio");
        if !self.queue.is_empty() {
            self.queue.clear();
            self.emit_queue_changed();
        }
        self.playlist.replace(playlist, index);
        self.active_source = Some(ActiveSource::Playlist);
        self.load_track(track, play_immediately).await
    }

    /// Open a track requested by a screen, ignoring repeated requests
    ///
    /// Loads only when the track is playable, nothing is loading and the
    /// request is new or no longer matches the current track.
    pub async fn open_track(&mut self, track: Track, playlist: Vec<Track>, index: usize) -> bool {
        if !track.is_playable() {
            warn!(track_id = %track.id, "Ignoring request for unplayable track");
            return false;
        }
        let current = self.current_track.as_ref().map(|t| &t.id);
        if !self
            .guard
            .should_load(&track.id, current, self.state == PlaybackState::Loading)
        {
            debug!(track_id = %track.id, "Track request already handled");
            return false;
        }
        self.guard.mark(track.id.clone());
        self.load_audio(track, true, playlist, index).await
    }

    async fn load_track(&mut self, track: Track, play_when_ready: bool) -> bool {
        if !track.is_playable() {
            warn!(track_id = %track.id, "Track has no playable url");
            if let Err(e) = self.resource.unload(true).await {
                error!(error = %e, "Unload failed while resetting");
            }
            self.reset_to_idle().await;
            return false;
        }

        info!(track_id = %track.id, title = %track.title, "Loading track");
        self.set_state(PlaybackState::Loading);

        let previous = self.current_track.as_ref().map(|t| t.id.to_string());
        let track_id = track.id.clone();
        let advisory = track.duration_millis();
        let loaded = self.resource.load(&track, play_when_ready).await;

        self.current_track = Some(track);
        self.pending_events.push(SessionEvent::TrackChanged {
            track_id: Some(track_id.to_string()),
            previous_track_id: previous,
        });
        self.refresh_like(Some(&track_id)).await;

        match loaded {
            Ok(status) => {
                self.position.reset_to(status.position_millis);
                self.duration_ms = normalize_status(&status, None, advisory).duration_ms;
                self.awaiting_finish = true;
                self.set_state(if play_when_ready {
                    PlaybackState::ReadyPlaying
                } else {
                    PlaybackState::ReadyPaused
                });
                self.emit_position();
                true
            }
            Err(e) => {
                error!(track_id = %track_id, error = %e, "Failed to load track");
                self.pending_events.push(SessionEvent::Error {
                    message: e.to_string(),
                });
                self.reset_to_idle().await;
                false
            }
        }
    }

    async fn reset_to_idle(&mut self) {
        if let Some(previous) = self.current_track.take() {
            self.pending_events.push(SessionEvent::TrackChanged {
                track_id: None,
                previous_track_id: Some(previous.id.to_string()),
            });
        }
        self.position.reset_to(0);
        self.duration_ms = None;
        self.awaiting_finish = false;
        self.refresh_like(None).await;
        self.set_state(PlaybackState::Idle);
    }

    // ===== Transport =====

    /// Play `track`, or resume the current track when `None`
    ///
    /// A request for the loaded track resumes it in place. Any other track
    /// starts a new single-track playlist.
    pub async fn play(&mut self, track: Option<Track>) {
        let Some(target) = track.or_else(|| self.current_track.clone()) else {
            warn!("Play requested with no track");
            return;
        };
        if !target.is_playable() {
            warn!(track_id = %target.id, "Play requested for track without url");
            return;
        }

        if self.resource.loaded_track() == Some(&target.id)
            && self.current_track.as_ref().map(|t| &t.id) == Some(&target.id)
        {
            if self.state != PlaybackState::ReadyPlaying {
                match self.resource.play().await {
                    Ok(()) => {
                        self.awaiting_finish = true;
                        self.set_state(PlaybackState::ReadyPlaying);
                    }
                    Err(e) => self.engine_failure("resume", &e),
                }
            }
            return;
        }

        let playlist = vec![target.clone()];
        self.load_audio(target, true, playlist, 0).await;
    }

    /// Pause when playing; otherwise nothing
    pub async fn pause(&mut self) {
        if self.state != PlaybackState::ReadyPlaying
            || !self.resource.is_loaded()
            || self.current_track.is_none()
        {
            return;
        }
        match self.resource.pause().await {
            Ok(()) => self.set_state(PlaybackState::ReadyPaused),
            Err(e) => self.engine_failure("pause", &e),
        }
    }

    /// Pause when playing, otherwise play the current track
    pub async fn toggle_play_pause(&mut self) {
        if self.state == PlaybackState::ReadyPlaying {
            self.pause().await;
        } else {
            self.play(None).await;
        }
    }

    /// Seek within the loaded track
    ///
    /// The new position is visible immediately and engine reports are held
    /// back until the engine confirms it or the settle window runs out.
    pub async fn seek(&mut self, position_ms: u64) {
        if !self.resource.is_loaded() || self.current_track.is_none() {
            debug!("Seek ignored, nothing loaded");
            return;
        }

        self.position.begin_seek(position_ms);
        self.emit_position();

        let keep_playing = self.state == PlaybackState::ReadyPlaying;
        match self.resource.seek(position_ms, keep_playing).await {
            Ok(()) => {
                self.position
                    .seek_dispatched(Instant::now(), self.config.seek_settle());
            }
            Err(e) => {
                self.position.seek_failed();
                self.emit_position();
                self.engine_failure("seek", &e);
            }
        }
    }

    // ===== Navigation =====

    /// User-initiated "Next"
    pub async fn skip_to_next(&mut self) {
        debug!("Skip to next");
        self.advance(Trigger::Manual).await;
    }

    /// User-initiated "Previous"
    ///
    /// Past the restart threshold this restarts the current track. Otherwise
    /// it steps back within the primary playlist, or restarts at its start.
    pub async fn skip_to_previous(&mut self) {
        let position = match self.resource.status().await {
            Ok(status) if status.is_loaded => status.position_millis,
            _ if self.state.is_ready() => self.position.position_ms(),
            _ => 0,
        };

        if position > self.config.restart_threshold_ms {
            debug!(position, "Restarting current track");
            self.seek(0).await;
            return;
        }

        let ctx = self.advance_context();
        match policy::previous_retreat(&ctx, &mut self.rng) {
            Retreat::Playlist(index) => self.play_playlist_index(index).await,
            Retreat::Restart => self.seek(0).await,
        }
    }

    async fn advance(&mut self, trigger: Trigger) {
        let ctx = self.advance_context();
        match policy::next_advance(&ctx, &mut self.rng) {
            Advance::ReplayCurrent => self.replay_current().await,
            Advance::Playlist(index) => self.play_playlist_index(index).await,
            Advance::Queue => {
                if let Some(track) = self.queue.pop_front() {
                    self.emit_queue_changed();
                    self.active_source = Some(ActiveSource::Queue);
                    self.load_track(track, true).await;
                }
            }
            Advance::Exhausted => self.stop_exhausted(trigger).await,
        }
    }

    async fn play_playlist_index(&mut self, index: usize) {
        let Some(track) = self.playlist.select(index).cloned() else {
            warn!(index, "Playlist index out of bounds");
            return;
        };
        self.active_source = Some(ActiveSource::Playlist);
        self.load_track(track, true).await;
    }

    async fn replay_current(&mut self) {
        let Some(track) = self.current_track.clone() else {
            return;
        };
        if !self.resource.is_loaded() {
            self.load_track(track, true).await;
            return;
        }
        match self.resource.replay().await {
            Ok(()) => {
                debug!(track_id = %track.id, "Replaying current track");
                self.position.reset_to(0);
                self.awaiting_finish = true;
                self.set_state(PlaybackState::ReadyPlaying);
                self.emit_position();
            }
            Err(e) => self.engine_failure("replay", &e),
        }
    }

    async fn stop_exhausted(&mut self, trigger: Trigger) {
        info!(?trigger, "Playlist and queue finished, stopping");
        if self.resource.is_loaded() {
            if let Err(e) = self.resource.stop().await {
                warn!(error = %e, "Failed to stop engine");
            }
        }
        self.position.reset_to(0);
        self.awaiting_finish = false;
        self.set_state(if self.current_track.is_some() {
            PlaybackState::Ended
        } else {
            PlaybackState::Idle
        });
        self.emit_position();
    }

    // ===== Queue =====

    /// Append a track to the queue; tracks without a url are dropped
    pub fn add_to_queue(&mut self, track: Track) -> bool {
        let added = self.queue.push_back(track);
        if added {
            self.emit_queue_changed();
        }
        added
    }

    /// Put a track at the front of the queue; tracks without a url are dropped
    pub fn play_next_in_queue(&mut self, track: Track) -> bool {
        let added = self.queue.push_front(track);
        if added {
            self.emit_queue_changed();
        }
        added
    }

    /// Empty the queue without touching playback
    pub fn clear_queue(&mut self) {
        self.queue.clear();
        debug!("Queue cleared");
        self.emit_queue_changed();
    }

    /// Remove one queued entry
    pub fn remove_from_queue(&mut self, index: usize) -> Result<Track> {
        let track = self
            .queue
            .remove(index)
            .ok_or(PlaybackError::IndexOutOfBounds(index))?;
        self.emit_queue_changed();
        Ok(track)
    }

    // ===== Modes =====

    /// Flip the current track's liked flag and persist it
    ///
    /// Returns the resulting flag, or `None` without a current track. A
    /// failed write reverts the flag.
    pub async fn toggle_like_current_track(&mut self) -> Option<bool> {
        let id = self.current_track.as_ref()?.id.clone();
        if id.is_blank() {
            return None;
        }

        let liked = match self.like.toggle(&*self.liked_store, &id).await {
            Ok(liked) => liked,
            Err(e) => {
                error!(track_id = %id, error = %e, "Failed to persist liked status");
                self.pending_events.push(SessionEvent::Error {
                    message: e.to_string(),
                });
                self.like.is_liked()
            }
        };
        self.pending_events.push(SessionEvent::LikeChanged {
            track_id: id.to_string(),
            liked,
        });
        Some(liked)
    }

    /// Flip shuffle
    pub fn toggle_shuffle(&mut self) {
        self.set_shuffle(!self.shuffle);
    }

    /// Set shuffle
    pub fn set_shuffle(&mut self, enabled: bool) {
        if self.shuffle == enabled {
            return;
        }
        self.shuffle = enabled;
        debug!(enabled, "Shuffle changed");
        self.pending_events
            .push(SessionEvent::ShuffleChanged { enabled });
    }

    /// Cycle repeat Off -> All -> One -> Off
    pub async fn cycle_repeat(&mut self) {
        self.set_repeat(self.repeat.cycle()).await;
    }

    /// Set the repeat mode; One also turns on engine looping
    pub async fn set_repeat(&mut self, mode: RepeatMode) {
        self.repeat = mode;
        if let Err(e) = self.resource.set_looping(mode == RepeatMode::One).await {
            warn!(error = %e, "Failed to update engine looping");
        }
        debug!(?mode, "Repeat mode changed");
        self.pending_events
            .push(SessionEvent::RepeatChanged { mode });
    }

    // ===== Engine status =====

    /// Apply every buffered engine status; returns how many were applied
    pub async fn pump_status(&mut self) -> usize {
        let mut applied = 0;
        while let Some(status) = self.resource.try_next_status() {
            self.apply_status(status).await;
            applied += 1;
        }
        self.position.settle(Instant::now());
        applied
    }

    /// Wait for one engine status and apply it
    ///
    /// Pends until the active subscription delivers an update.
    pub async fn wait_for_status(&mut self) -> bool {
        match self.recv_status().await {
            Some(status) => {
                self.apply_status(status).await;
                true
            }
            None => false,
        }
    }

    /// Wait for the next engine status without applying it
    ///
    /// Cancel safe, for use in `select!` loops that apply the status
    /// afterwards with [`Self::apply_status`].
    pub async fn recv_status(&mut self) -> Option<EngineStatus> {
        self.resource.next_status().await
    }

    /// Apply one engine status
    ///
    /// Updates position, duration and state, and runs end-of-track handling
    /// once per finished track.
    pub async fn apply_status(&mut self, status: EngineStatus) {
        let now = Instant::now();
        self.position.settle(now);

        let advisory = self.current_track.as_ref().and_then(Track::duration_millis);
        let status = normalize_status(&status, self.duration_ms, advisory);

        if let Some(message) = &status.error {
            error!(error = %message, "Engine reported an error");
            self.pending_events.push(SessionEvent::Error {
                message: message.clone(),
            });
            // An error without loaded content means the engine dropped the source
            if !status.is_loaded {
                self.resource.mark_source_lost();
            }
        }

        if status.is_loaded {
            let duration_changed = self.duration_ms != status.duration_ms;
            self.duration_ms = status.duration_ms;
            if self.position.report(status.position_ms, now) || duration_changed {
                self.emit_position();
            }
            if status.is_playing {
                self.awaiting_finish = true;
            }
        }

        match (self.state, status.is_playing) {
            (PlaybackState::ReadyPaused | PlaybackState::Ended, true) => {
                self.set_state(PlaybackState::ReadyPlaying);
            }
            (PlaybackState::ReadyPlaying, false) => {
                self.set_state(PlaybackState::ReadyPaused);
            }
            _ => {}
        }

        if status.finished() && self.awaiting_finish {
            self.awaiting_finish = false;
            self.handle_track_finished().await;
        }
    }

    async fn handle_track_finished(&mut self) {
        info!(
            track_id = ?self.current_track.as_ref().map(|t| t.id.as_str()),
            repeat = ?self.repeat,
            "Track finished"
        );
        self.advance(Trigger::Automatic).await;
    }

    /// Unload the engine and end the session
    pub async fn teardown(mut self) {
        self.resource.teardown().await;
        info!("Playback session torn down");
    }

    // ===== Helpers =====

    fn advance_context(&self) -> AdvanceContext {
        AdvanceContext {
            playlist_len: self.playlist.len(),
            current_index: self.playlist.index(),
            queue_len: self.queue.len(),
            shuffle: self.shuffle,
            repeat: self.repeat,
            has_current: self.current_track.is_some(),
        }
    }

    async fn refresh_like(&mut self, track: Option<&TrackId>) {
        let changed = self.like.refresh(&*self.liked_store, track).await;
        if let (true, Some(id)) = (changed, track) {
            self.pending_events.push(SessionEvent::LikeChanged {
                track_id: id.to_string(),
                liked: self.like.is_liked(),
            });
        }
    }

    fn engine_failure(&mut self, action: &str, e: &crate::engine::EngineError) {
        error!(action, error = %e, "Engine operation failed");
        self.pending_events.push(SessionEvent::Error {
            message: format!("{action} failed: {e}"),
        });
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.pending_events
                .push(SessionEvent::StateChanged { state });
        }
    }

    fn emit_position(&mut self) {
        self.pending_events.push(SessionEvent::PositionUpdate {
            position_ms: self.position.position_ms(),
            duration_ms: self.duration_ms,
        });
    }

    fn emit_queue_changed(&mut self) {
        self.pending_events.push(SessionEvent::QueueChanged {
            length: self.queue.len(),
        });
    }

    // ===== Getters =====

    /// Current playback state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    /// Index into the primary playlist
    pub fn current_index(&self) -> usize {
        self.playlist.index()
    }

    /// Which source the current track came from
    pub fn active_source(&self) -> Option<ActiveSource> {
        self.active_source
    }

    pub fn playlist(&self) -> &[Track] {
        self.playlist.tracks()
    }

    pub fn queue(&self) -> &PlayQueue {
        &self.queue
    }

    /// Position in milliseconds, including a pending seek target
    pub fn position_ms(&self) -> u64 {
        self.position.position_ms()
    }

    /// Duration in milliseconds, once known
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    /// Position over duration in `[0, 1]`
    pub fn progress(&self) -> f64 {
        progress(self.position_ms(), self.duration_ms)
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::ReadyPlaying
    }

    pub fn is_loading(&self) -> bool {
        self.state == PlaybackState::Loading
    }

    /// Whether the engine has content loaded
    pub fn is_sound_loaded(&self) -> bool {
        self.resource.is_loaded()
    }

    /// Whether engine position reports are being held back by a seek
    pub fn is_seeking(&self) -> bool {
        self.position.is_seeking(Instant::now())
    }

    pub fn is_liked(&self) -> bool {
        self.like.is_liked()
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Whether "Next" would move to another track (or replay with Repeat One)
    pub fn has_next(&self) -> bool {
        policy::can_advance(&self.advance_context())
    }

    /// Whether "Previous" would move within the playlist
    pub fn has_previous(&self) -> bool {
        policy::can_retreat(&self.advance_context())
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Every observable field at once
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            current_track: self.current_track.clone(),
            current_index: self.playlist.index(),
            active_source: self.active_source,
            playlist_len: self.playlist.len(),
            queue: self.queue.iter().cloned().collect(),
            position_ms: self.position_ms(),
            duration_ms: self.duration_ms,
            is_seeking: self.is_seeking(),
            is_liked: self.like.is_liked(),
            repeat: self.repeat,
            shuffle: self.shuffle,
        }
    }

    /// Take all events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }
}
