//! Cadence - Playback Session
//!
//! Platform-agnostic playback-state engine for Cadence.
//!
//! This crate provides:
//! - A single playback session owning current track, primary playlist and queue
//! - Exclusive ownership of one audio engine handle (create once, load many)
//! - Track advancement policy (shuffle, Repeat Off/All/One, queue fallback)
//! - Two-phase seek position (optimistic target, engine confirmation)
//! - Liked-status cache for the current track
//!
//! # Architecture
//!
//! `cadence-playback` never talks to a real audio device. The platform player
//! is supplied through the [`AudioEngine`] and [`EngineFactory`] traits, and
//! the liked set through [`cadence_core::LikedStore`]. Engine status updates
//! arrive on a channel and are applied with
//! [`PlaybackSession::pump_status`] or [`PlaybackSession::wait_for_status`].
//!
//! # Example: Policy
//!
//! ```rust
//! use cadence_playback::policy::{next_advance, Advance, AdvanceContext};
//! use cadence_playback::RepeatMode;
//! use rand::SeedableRng;
//!
//! let ctx = AdvanceContext {
//!     playlist_len: 2,
//!     current_index: 1,
//!     queue_len: 0,
//!     shuffle: false,
//!     repeat: RepeatMode::All,
//!     has_current: true,
//! };
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! assert_eq!(next_advance(&ctx, &mut rng), Advance::Playlist(0));
//! ```

#![forbid(unsafe_code)]

pub mod adapter;
pub mod engine;
pub mod error;
pub mod events;
pub mod guard;
pub mod like;
pub mod playlist;
pub mod policy;
pub mod position;
pub mod queue;
pub mod session;
pub mod types;

pub use adapter::{normalize_status, AudioResource, NormalizedStatus};
pub use engine::{
    AudioEngine, EngineError, EngineFactory, EngineResult, EngineStatus, LoadOptions, StatusSink,
    StatusUpdate, SubscriptionId,
};
pub use error::{PlaybackError, Result};
pub use events::{SessionEvent, SessionSnapshot};
pub use guard::TrackRequestGuard;
pub use like::LikeStatus;
pub use playlist::PlaylistCursor;
pub use position::PositionTracker;
pub use queue::PlayQueue;
pub use session::PlaybackSession;
pub use types::{ActiveSource, PlaybackConfig, PlaybackState, RepeatMode};
