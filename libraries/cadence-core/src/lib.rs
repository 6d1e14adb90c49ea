//! Cadence Core
//!
//! Platform-agnostic types, collaborator traits, and error handling shared by
//! the playback engine, the storage layer and the applications.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `Playlist` and their identifiers
//! - **Collaborator Traits**: `LikedStore`, `PlaylistStore`, `TrackCatalog`
//! - **Error Handling**: Unified `CadenceError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use cadence_core::types::{Track, TrackId};
//!
//! let track = Track::new("t1", "Intro")
//!     .with_url("file:///music/intro.mp3")
//!     .with_artist("The Band");
//!
//! assert!(track.is_playable());
//! assert_eq!(track.id, TrackId::new("t1"));
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CadenceError, Result};
pub use traits::{hydrate_tracks, LikedStore, PlaylistStore, TrackCatalog};
pub use types::{Playlist, PlaylistId, Track, TrackId};
