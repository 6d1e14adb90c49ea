//! Property-based tests for the advancement policy and the queue
//!
//! Uses proptest to check invariants across many random inputs.

use cadence_core::Track;
use cadence_playback::policy::{
    can_advance, can_retreat, next_advance, previous_retreat, Advance, AdvanceContext, Retreat,
};
use cadence_playback::{PlayQueue, RepeatMode};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

// ===== Helpers =====

fn repeat_mode() -> impl Strategy<Value = RepeatMode> {
    prop_oneof![
        Just(RepeatMode::Off),
        Just(RepeatMode::All),
        Just(RepeatMode::One)
    ]
}

fn context() -> impl Strategy<Value = AdvanceContext> {
    (0usize..20, 0usize..20, 0usize..5, any::<bool>(), repeat_mode(), any::<bool>()).prop_map(
        |(playlist_len, index, queue_len, shuffle, repeat, has_current)| AdvanceContext {
            playlist_len,
            current_index: if playlist_len == 0 { 0 } else { index % playlist_len },
            queue_len,
            shuffle,
            repeat,
            has_current,
        },
    )
}

fn track(id: &str, playable: bool) -> Track {
    let track = Track::new(id, id);
    if playable {
        track.with_url(format!("file:///{id}.mp3"))
    } else {
        track
    }
}

// ===== Property Tests =====

proptest! {
    /// Without shuffle the decision never depends on the random source
    #[test]
    fn sequential_decision_is_deterministic(ctx in context(), seed_a in any::<u64>(), seed_b in any::<u64>()) {
        let ctx = AdvanceContext { shuffle: false, ..ctx };
        let a = next_advance(&ctx, &mut StdRng::seed_from_u64(seed_a));
        let b = next_advance(&ctx, &mut StdRng::seed_from_u64(seed_b));
        prop_assert_eq!(a, b);

        let a = previous_retreat(&ctx, &mut StdRng::seed_from_u64(seed_a));
        let b = previous_retreat(&ctx, &mut StdRng::seed_from_u64(seed_b));
        prop_assert_eq!(a, b);
    }

    /// Every playlist index the policy picks is in bounds
    #[test]
    fn chosen_indices_are_in_bounds(ctx in context(), seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        if let Advance::Playlist(i) = next_advance(&ctx, &mut rng) {
            prop_assert!(i < ctx.playlist_len);
        }
        if let Retreat::Playlist(i) = previous_retreat(&ctx, &mut rng) {
            prop_assert!(i < ctx.playlist_len);
        }
    }

    /// Shuffle never picks the track that is already current
    #[test]
    fn shuffle_avoids_current(ctx in context(), seed in any::<u64>()) {
        let ctx = AdvanceContext { shuffle: true, repeat: RepeatMode::Off, ..ctx };
        let mut rng = StdRng::seed_from_u64(seed);
        if let Advance::Playlist(i) = next_advance(&ctx, &mut rng) {
            prop_assert_ne!(i, ctx.current_index);
        }
    }

    /// The cheap predicates agree with the full decisions
    #[test]
    fn predicates_match_decisions(ctx in context(), seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let advance = next_advance(&ctx, &mut rng);
        prop_assert_eq!(can_advance(&ctx), advance != Advance::Exhausted);

        let retreat = previous_retreat(&ctx, &mut rng);
        prop_assert_eq!(can_retreat(&ctx), retreat != Retreat::Restart);
    }

    /// Repeat One with a current track always replays, whatever else is queued
    #[test]
    fn repeat_one_is_idempotent(ctx in context(), seed in any::<u64>()) {
        let ctx = AdvanceContext { repeat: RepeatMode::One, has_current: true, ..ctx };
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..5 {
            prop_assert_eq!(next_advance(&ctx, &mut rng), Advance::ReplayCurrent);
        }
    }

    /// The queue hands tracks back in insertion order and never holds unplayable ones
    #[test]
    fn queue_is_fifo_and_playable(entries in prop::collection::vec(("[a-z]{1,8}", any::<bool>()), 0..40)) {
        let mut queue = PlayQueue::new();
        let mut expected = Vec::new();
        for (id, playable) in &entries {
            if queue.push_back(track(id, *playable)) {
                expected.push(id.clone());
            }
        }

        prop_assert!(queue.iter().all(Track::is_playable));

        let mut drained = Vec::new();
        while let Some(t) = queue.pop_front() {
            drained.push(t.id.to_string());
        }
        prop_assert_eq!(drained, expected);
    }
}
