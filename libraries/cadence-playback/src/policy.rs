//! Track advancement policy
//!
//! Pure decision logic for "what plays next / previous". The same decision
//! order serves natural end-of-track and the user's Next button:
//!
//! 1. Repeat One replays the current track
//! 2. Advance within the primary playlist (shuffle or sequential, wrap on Repeat All)
//! 3. Pop the queue
//! 4. Otherwise nothing advances and the caller stops playback
//!
//! "Previous" only looks at the primary playlist.

use crate::types::RepeatMode;
use rand::Rng;

/// What triggered an advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The engine reported end of track
    Automatic,

    /// The user pressed Next
    Manual,
}

/// Inputs the policy needs, detached from the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceContext {
    /// Length of the primary playlist
    pub playlist_len: usize,

    /// Cursor into the primary playlist
    pub current_index: usize,

    /// Number of queued tracks
    pub queue_len: usize,

    /// Shuffle is on
    pub shuffle: bool,

    /// Current repeat mode
    pub repeat: RepeatMode,

    /// A current track exists
    pub has_current: bool,
}

/// Forward decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Replay the current track in place
    ReplayCurrent,

    /// Play the playlist track at this index
    Playlist(usize),

    /// Play the front of the queue
    Queue,

    /// Nothing left to play
    Exhausted,
}

/// Backward decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retreat {
    /// Play the playlist track at this index
    Playlist(usize),

    /// Restart the current track from 0
    Restart,
}

/// Decide what plays after the current track
pub fn next_advance<R: Rng + ?Sized>(ctx: &AdvanceContext, rng: &mut R) -> Advance {
    if ctx.repeat == RepeatMode::One && ctx.has_current {
        return Advance::ReplayCurrent;
    }

    if let Some(index) = playlist_forward(ctx, rng) {
        return Advance::Playlist(index);
    }

    if ctx.queue_len > 0 {
        return Advance::Queue;
    }

    Advance::Exhausted
}

/// Next index within the primary playlist, if the playlist can advance
pub fn playlist_forward<R: Rng + ?Sized>(ctx: &AdvanceContext, rng: &mut R) -> Option<usize> {
    if ctx.playlist_len == 0 {
        return None;
    }

    let next = if ctx.shuffle {
        if ctx.playlist_len <= 1 {
            return None;
        }
        random_other_index(ctx.playlist_len, ctx.current_index, rng)
    } else {
        ctx.current_index.saturating_add(1)
    };

    if next >= ctx.playlist_len {
        return (ctx.repeat == RepeatMode::All).then_some(0);
    }

    Some(next)
}

/// Decide what "previous" does when not restarting by position
pub fn previous_retreat<R: Rng + ?Sized>(ctx: &AdvanceContext, rng: &mut R) -> Retreat {
    if !can_retreat(ctx) {
        return Retreat::Restart;
    }

    let index = if ctx.shuffle {
        if ctx.playlist_len <= 1 {
            0
        } else {
            random_other_index(ctx.playlist_len, ctx.current_index, rng)
        }
    } else if ctx.current_index == 0 || ctx.current_index > ctx.playlist_len {
        ctx.playlist_len - 1
    } else {
        ctx.current_index - 1
    };

    Retreat::Playlist(index)
}

/// Whether [`next_advance`] would move (or replay) rather than exhaust
pub fn can_advance(ctx: &AdvanceContext) -> bool {
    if ctx.repeat == RepeatMode::One && ctx.has_current {
        return true;
    }
    let playlist_can_move = if ctx.shuffle {
        ctx.playlist_len > 1
    } else {
        ctx.current_index.saturating_add(1) < ctx.playlist_len
            || (ctx.playlist_len > 0 && ctx.repeat == RepeatMode::All)
    };
    playlist_can_move || ctx.queue_len > 0
}

/// Whether [`previous_retreat`] would navigate rather than restart
pub fn can_retreat(ctx: &AdvanceContext) -> bool {
    ctx.playlist_len > 0 && (ctx.current_index > 0 || ctx.repeat == RepeatMode::All)
}

/// Uniformly random index in `0..len` other than `current`
///
/// `len` must be at least 2 when `current` is in range.
fn random_other_index<R: Rng + ?Sized>(len: usize, current: usize, rng: &mut R) -> usize {
    if current >= len {
        return rng.gen_range(0..len);
    }
    let pick = rng.gen_range(0..len - 1);
    if pick >= current {
        pick + 1
    } else {
        pick
    }
}
