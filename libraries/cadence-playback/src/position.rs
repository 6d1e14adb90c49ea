//! Two-phase playback position
//!
//! A user seek sets an optimistic position right away. Engine reports are
//! ignored until the engine confirms the seek (reports a position near the
//! target) or the settle window after dispatch runs out, whichever comes first.

use std::time::Duration;
use tokio::time::Instant;

/// Engine positions within this distance of the seek target confirm the seek
const CONFIRM_TOLERANCE_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeekPhase {
    /// Waiting for the engine to accept the seek command
    Requested,

    /// Engine accepted the command; confirmation or deadline clears it
    Dispatched { settle_deadline: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingSeek {
    target_ms: u64,
    phase: SeekPhase,
}

/// Confirmed engine position plus an optional optimistic override
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionTracker {
    confirmed_ms: u64,
    pending: Option<PendingSeek>,
}

impl PositionTracker {
    /// Create a tracker at position 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Position to display: the seek target while seeking, else the engine's
    pub fn position_ms(&self) -> u64 {
        self.pending
            .map(|p| p.target_ms)
            .unwrap_or(self.confirmed_ms)
    }

    /// Last position reported by the engine (or set by a reset)
    pub fn confirmed_ms(&self) -> u64 {
        self.confirmed_ms
    }

    /// Whether engine reports are currently suppressed
    pub fn is_seeking(&self, now: Instant) -> bool {
        match self.pending {
            None => false,
            Some(PendingSeek {
                phase: SeekPhase::Requested,
                ..
            }) => true,
            Some(PendingSeek {
                phase: SeekPhase::Dispatched { settle_deadline },
                ..
            }) => now < settle_deadline,
        }
    }

    /// Start a seek: the target becomes the visible position immediately
    pub fn begin_seek(&mut self, target_ms: u64) {
        self.pending = Some(PendingSeek {
            target_ms,
            phase: SeekPhase::Requested,
        });
    }

    /// The engine accepted the seek; open the settle window
    pub fn seek_dispatched(&mut self, now: Instant, settle: Duration) {
        if let Some(pending) = self.pending.as_mut() {
            pending.phase = SeekPhase::Dispatched {
                settle_deadline: now + settle,
            };
        }
    }

    /// The engine rejected the seek; fall back to the confirmed position
    pub fn seek_failed(&mut self) {
        self.pending = None;
    }

    /// Apply a position reported by the engine
    ///
    /// Returns true when the visible position may have changed.
    pub fn report(&mut self, engine_ms: u64, now: Instant) -> bool {
        match self.pending {
            None => {
                self.confirmed_ms = engine_ms;
                true
            }
            Some(PendingSeek {
                phase: SeekPhase::Requested,
                ..
            }) => false,
            Some(PendingSeek {
                target_ms,
                phase: SeekPhase::Dispatched { settle_deadline },
            }) => {
                let confirmed = engine_ms.abs_diff(target_ms) <= CONFIRM_TOLERANCE_MS;
                if confirmed || now >= settle_deadline {
                    self.pending = None;
                    self.confirmed_ms = engine_ms;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Drop any pending seek whose settle window has run out
    ///
    /// The target becomes the confirmed position, since the engine accepted it.
    pub fn settle(&mut self, now: Instant) {
        if let Some(PendingSeek {
            target_ms,
            phase: SeekPhase::Dispatched { settle_deadline },
        }) = self.pending
        {
            if now >= settle_deadline {
                self.pending = None;
                self.confirmed_ms = target_ms;
            }
        }
    }

    /// Jump to `position_ms` and forget any pending seek
    pub fn reset_to(&mut self, position_ms: u64) {
        self.pending = None;
        self.confirmed_ms = position_ms;
    }
}
