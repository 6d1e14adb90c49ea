//! Audio resource adapter
//!
//! Owns the single engine handle for a session. The handle is created lazily
//! on first load and reused for every later track. Before each load the
//! previous content is stopped (unless the same track is being reloaded) and
//! unloaded, and the status subscription is replaced so updates from an old
//! track can never reach the session.

use crate::engine::{
    AudioEngine, EngineError, EngineFactory, EngineResult, EngineStatus, LoadOptions, StatusSink,
    StatusUpdate, SubscriptionId,
};
use cadence_core::{Track, TrackId};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Engine status mapped onto session fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedStatus {
    /// Content is loaded
    pub is_loaded: bool,

    /// Content is playing (always false when not loaded)
    pub is_playing: bool,

    /// Engine-reported position
    pub position_ms: u64,

    /// Best known duration
    pub duration_ms: Option<u64>,

    /// Playback reached the end
    pub did_just_finish: bool,

    /// Engine is looping the current track
    pub is_looping: bool,

    /// Engine error text
    pub error: Option<String>,
}

impl NormalizedStatus {
    /// Whether this status should run end-of-track handling
    pub fn finished(&self) -> bool {
        self.did_just_finish && !self.is_looping
    }
}

/// Map a raw engine status onto session fields
///
/// Duration falls back to the previously known duration, then to the track's
/// advisory duration. Zero durations count as unknown.
pub fn normalize_status(
    status: &EngineStatus,
    previous_duration_ms: Option<u64>,
    advisory_duration_ms: Option<u64>,
) -> NormalizedStatus {
    let duration_ms = status
        .duration_millis
        .filter(|d| *d > 0)
        .or(previous_duration_ms.filter(|d| *d > 0))
        .or(advisory_duration_ms.filter(|d| *d > 0));

    NormalizedStatus {
        is_loaded: status.is_loaded,
        is_playing: status.is_loaded && status.is_playing,
        position_ms: status.position_millis,
        duration_ms,
        did_just_finish: status.did_just_finish,
        is_looping: status.is_looping,
        error: status.error.clone(),
    }
}

/// Exclusive owner of the session's audio engine handle
pub struct AudioResource<F: EngineFactory> {
    factory: F,
    engine: Option<F::Engine>,
    loaded_track: Option<TrackId>,
    looping: bool,
    subscription: Option<SubscriptionId>,
    next_subscription: u64,
    status_tx: mpsc::UnboundedSender<StatusUpdate>,
    status_rx: mpsc::UnboundedReceiver<StatusUpdate>,
    status_interval: Duration,
}

impl<F: EngineFactory> AudioResource<F> {
    /// Create an adapter; no engine handle exists until the first load
    pub fn new(factory: F, status_interval: Duration) -> Self {
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        Self {
            factory,
            engine: None,
            loaded_track: None,
            looping: false,
            subscription: None,
            next_subscription: 0,
            status_tx,
            status_rx,
            status_interval,
        }
    }

    /// Whether the engine handle has been created
    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Whether content is loaded
    pub fn is_loaded(&self) -> bool {
        self.loaded_track.is_some()
    }

    /// Id of the loaded track
    pub fn loaded_track(&self) -> Option<&TrackId> {
        self.loaded_track.as_ref()
    }

    /// Whether engine looping is requested
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Active status subscription
    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    fn ensure_engine(&mut self) -> EngineResult<&mut F::Engine> {
        if self.engine.is_none() {
            let engine = self.factory.create()?;
            debug!("Created audio engine handle");
            self.engine = Some(engine);
        }
        self.engine
            .as_mut()
            .ok_or_else(|| EngineError::Playback("engine handle unavailable".to_string()))
    }

    fn loaded_engine(&mut self) -> EngineResult<&mut F::Engine> {
        if self.loaded_track.is_none() {
            return Err(EngineError::NotLoaded);
        }
        self.engine.as_mut().ok_or(EngineError::NotLoaded)
    }

    fn detach_subscription(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.unsubscribe_status();
        }
        self.subscription = None;
    }

    fn attach_subscription(&mut self) -> EngineResult<()> {
        self.detach_subscription();
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        let sink = StatusSink::new(id, self.status_tx.clone());
        self.ensure_engine()?.subscribe_status(sink);
        self.subscription = Some(id);
        Ok(())
    }

    /// Release loaded content
    ///
    /// Stops first when `stop` is set. Errors saying nothing was loaded are
    /// ignored. The status subscription is cleared either way. On any other
    /// error the engine handle is dropped and the next load creates a new one.
    pub async fn unload(&mut self, stop: bool) -> EngineResult<()> {
        let result = match (self.engine.as_mut(), self.loaded_track.is_some()) {
            (Some(engine), true) => {
                debug!(stop, "Unloading audio");
                let stopped = if stop { engine.stop().await } else { Ok(()) };
                match stopped {
                    Ok(()) => engine.unload().await,
                    Err(e) => Err(e),
                }
            }
            _ => Ok(()),
        };

        self.detach_subscription();

        match result {
            Ok(()) => {
                self.loaded_track = None;
                Ok(())
            }
            Err(e) if e.is_not_loaded() => {
                debug!(error = %e, "Nothing to unload");
                self.loaded_track = None;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to unload audio, dropping engine handle");
                self.engine = None;
                self.loaded_track = None;
                Err(e)
            }
        }
    }

    /// Load `track`, replacing whatever is loaded
    ///
    /// The previous content is stopped unless it is the same track, then
    /// unloaded. A fresh status subscription is attached before the engine
    /// starts loading.
    pub async fn load(&mut self, track: &Track, autoplay: bool) -> EngineResult<EngineStatus> {
        let uri = track
            .playable_url()
            .ok_or_else(|| EngineError::Load(format!("track {} has no url", track.id)))?
            .to_string();

        let same_track = self.loaded_track.as_ref() == Some(&track.id);
        self.unload(!same_track).await?;

        self.attach_subscription()?;
        let options = LoadOptions {
            autoplay_on_load: autoplay,
            status_update_interval: self.status_interval,
        };
        let looping = self.looping;
        let engine = self.ensure_engine()?;

        debug!(track_id = %track.id, uri = %uri, autoplay, "Loading source");
        match engine.load(&uri, options).await {
            Ok(status) => {
                if looping {
                    if let Err(e) = engine.set_looping(true).await {
                        warn!(error = %e, "Failed to enable looping after load");
                    }
                }
                self.loaded_track = Some(track.id.clone());
                Ok(status)
            }
            Err(e) => {
                self.detach_subscription();
                Err(e)
            }
        }
    }

    /// Start or resume playback
    pub async fn play(&mut self) -> EngineResult<()> {
        self.loaded_engine()?.play().await
    }

    /// Pause playback
    pub async fn pause(&mut self) -> EngineResult<()> {
        self.loaded_engine()?.pause().await
    }

    /// Stop and rewind
    pub async fn stop(&mut self) -> EngineResult<()> {
        self.loaded_engine()?.stop().await
    }

    /// Seek, keeping the current play/pause state when `keep_playing` says so
    pub async fn seek(&mut self, position_ms: u64, keep_playing: bool) -> EngineResult<()> {
        self.loaded_engine()?
            .seek_to(Duration::from_millis(position_ms), keep_playing)
            .await
    }

    /// Restart the loaded track from 0 without reloading it
    pub async fn replay(&mut self) -> EngineResult<()> {
        self.loaded_engine()?.replay().await
    }

    /// Request single-track looping
    ///
    /// Applied now when content is loaded, and after every later load.
    pub async fn set_looping(&mut self, looping: bool) -> EngineResult<()> {
        self.looping = looping;
        match self.loaded_engine() {
            Ok(engine) => engine.set_looping(looping).await,
            Err(_) => Ok(()),
        }
    }

    /// Forget the loaded track after the engine dropped it on its own
    pub fn mark_source_lost(&mut self) {
        if let Some(id) = self.loaded_track.take() {
            warn!(track_id = %id, "Engine lost the loaded source");
        }
    }

    /// Query the engine's current status
    pub async fn status(&mut self) -> EngineResult<EngineStatus> {
        match self.engine.as_mut() {
            Some(engine) => engine.status().await,
            None => Err(EngineError::NotLoaded),
        }
    }

    fn is_current(&self, update: &StatusUpdate) -> bool {
        self.subscription == Some(update.subscription)
    }

    /// Next buffered status from the active subscription, without waiting
    ///
    /// Updates from replaced subscriptions are discarded.
    pub fn try_next_status(&mut self) -> Option<EngineStatus> {
        while let Ok(update) = self.status_rx.try_recv() {
            if self.is_current(&update) {
                return Some(update.status);
            }
            debug!(subscription = ?update.subscription, "Dropping stale status update");
        }
        None
    }

    /// Wait for the next status from the active subscription
    pub async fn next_status(&mut self) -> Option<EngineStatus> {
        loop {
            let update = self.status_rx.recv().await?;
            if self.is_current(&update) {
                return Some(update.status);
            }
            debug!(subscription = ?update.subscription, "Dropping stale status update");
        }
    }

    /// Unload and drop the engine handle
    pub async fn teardown(&mut self) {
        if let Err(e) = self.unload(true).await {
            warn!(error = %e, "Unload failed during teardown");
        }
        self.engine = None;
        self.loaded_track = None;
        debug!("Audio resource torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_loaded_forces_not_playing() {
        let status = EngineStatus {
            is_loaded: false,
            is_playing: true,
            ..Default::default()
        };
        assert!(!normalize_status(&status, None, None).is_playing);
    }

    #[test]
    fn duration_fallback_chain() {
        let mut status = EngineStatus {
            is_loaded: true,
            duration_millis: Some(200_000),
            ..Default::default()
        };
        assert_eq!(
            normalize_status(&status, Some(1), Some(2)).duration_ms,
            Some(200_000)
        );

        status.duration_millis = None;
        assert_eq!(
            normalize_status(&status, Some(150_000), Some(180_000)).duration_ms,
            Some(150_000)
        );
        assert_eq!(
            normalize_status(&status, None, Some(180_000)).duration_ms,
            Some(180_000)
        );

        status.duration_millis = Some(0);
        assert_eq!(normalize_status(&status, Some(0), None).duration_ms, None);
    }

    #[test]
    fn looping_finish_is_not_a_finish() {
        let status = EngineStatus {
            is_loaded: true,
            did_just_finish: true,
            is_looping: true,
            ..Default::default()
        };
        assert!(!normalize_status(&status, None, None).finished());
    }
}
