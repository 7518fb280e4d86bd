use super::*;
use crate::config::SeedMode;
use proptest::prelude::*;

fn plan(capacity: u64, batches: usize, trials: usize, seed: u64, mode: SeedMode) -> PackPlan {
    PackPlan {
        capacity,
        batches,
        trials,
        seed,
        mode,
    }
}

fn assert_covers_exactly(trial: &Trial, n: usize) {
    let mut seen = vec![0usize; n];
    for batch in trial.batches() {
        for position in batch.positions() {
            seen[position] += 1;
        }
    }
    assert!(
        seen.iter().all(|&count| count == 1),
        "every subject must appear exactly once: {:?}",
        seen
    );
}

#[test]
fn test_first_fit_scans_in_order() {
    // Visiting order 0..4 with capacity 5: 3 -> b0, 3 -> b1, 2 -> b0, 2 -> b1
    let weights = vec![3, 3, 2, 2];
    let trial = pack_trial(&weights, &[0, 1, 2, 3], 5, 2);

    let b0: Vec<usize> = trial.capacity_batches()[0].positions().collect();
    let b1: Vec<usize> = trial.capacity_batches()[1].positions().collect();
    assert_eq!(b0, vec![0, 2]);
    assert_eq!(b1, vec![1, 3]);
    assert!(trial.leftover().is_none());
}

#[test]
fn test_unplaceable_goes_to_leftover_in_visit_order() {
    let weights = vec![4, 4, 4, 1];
    let trial = pack_trial(&weights, &[2, 0, 3, 1], 4, 2);

    let leftover: Vec<usize> = trial.leftover().unwrap().positions().collect();
    assert_eq!(leftover, vec![3, 1]);
    assert_eq!(trial.capacity_batches()[0].total_weight(), 4);
    assert_eq!(trial.capacity_batches()[1].total_weight(), 4);
}

#[test]
fn test_zero_weight_always_fits() {
    let weights = vec![3, 0];
    let trial = pack_trial(&weights, &[0, 1], 3, 1);
    assert_eq!(trial.capacity_batches()[0].len(), 2);
    assert!(trial.leftover().is_none());
}

#[test]
fn test_empty_subjects() {
    let set = generate(&[], &plan(5, 3, 2, 1, SeedMode::PerTrial));
    assert_eq!(set.len(), 2);
    for trial in set.trials() {
        assert_eq!(trial.capacity_batches().len(), 3);
        assert!(trial.capacity_batches().iter().all(Batch::is_empty));
        assert!(trial.leftover().is_none());
    }
}

#[test]
fn test_ten_unit_subjects_leave_one_over() {
    let weights = vec![1; 10];
    for mode in [SeedMode::PerTrial, SeedMode::SharedStream] {
        let set = generate(&weights, &plan(3, 3, 5, 42, mode));
        assert_eq!(set.len(), 5);
        for trial in set.trials() {
            for batch in trial.capacity_batches() {
                assert_eq!(batch.total_weight(), 3);
                assert_eq!(batch.len(), 3);
            }
            assert_eq!(trial.leftover().map(Batch::len), Some(1));
            assert_covers_exactly(trial, 10);
        }
    }
}

#[test]
fn test_capacity_below_every_weight() {
    let weights = vec![5, 6, 7];
    let set = generate(&weights, &plan(4, 2, 3, 9, SeedMode::PerTrial));
    for trial in set.trials() {
        assert!(trial.capacity_batches().iter().all(Batch::is_empty));
        assert_eq!(trial.leftover().map(Batch::len), Some(3));
    }
}

#[test]
fn test_trial_lookup_is_one_based() {
    let set = generate(&[1, 2, 3], &plan(3, 2, 2, 5, SeedMode::PerTrial));
    assert!(set.trial(0).is_none());
    assert_eq!(set.trial(1), Some(&set.trials()[0]));
    assert_eq!(set.trial(2), Some(&set.trials()[1]));
    assert!(set.trial(3).is_none());
}

#[test]
fn test_per_trial_streams_are_independent_of_trial_count() {
    let weights: Vec<u32> = (1..=12).collect();
    let short = generate(&weights, &plan(20, 3, 3, 77, SeedMode::PerTrial));
    let long = generate(&weights, &plan(20, 3, 8, 77, SeedMode::PerTrial));
    assert_eq!(short.trials(), &long.trials()[..3]);
}

#[test]
fn test_shared_stream_advances_between_trials() {
    let weights: Vec<u32> = (1..=12).collect();
    let set = generate(&weights, &plan(20, 3, 2, 77, SeedMode::SharedStream));
    assert_ne!(set.trials()[0], set.trials()[1]);
    assert_eq!(set.mode(), SeedMode::SharedStream);
    assert_eq!(set.seed(), 77);
}

proptest! {
    #[test]
    fn proptest_coverage_and_capacity(
        weights in prop::collection::vec(0u32..8, 0..40),
        capacity in 1u64..20,
        batches in 1usize..6,
        seed in 0u64..1000,
    ) {
        let set = generate(&weights, &plan(capacity, batches, 4, seed, SeedMode::PerTrial));
        for trial in set.trials() {
            prop_assert_eq!(trial.capacity_batches().len(), batches);
            prop_assert_eq!(trial.subject_count(), weights.len());
            for batch in trial.capacity_batches() {
                prop_assert!(batch.total_weight() <= capacity);
                let sum: u64 = batch.members().iter().map(|m| m.weight as u64).sum();
                prop_assert_eq!(sum, batch.total_weight());
            }
            if let Some(leftover) = trial.leftover() {
                prop_assert!(!leftover.is_empty());
            }
            assert_covers_exactly(trial, weights.len());
        }
    }

    #[test]
    fn proptest_deterministic_for_fixed_seed(
        weights in prop::collection::vec(1u32..6, 1..30),
        seed in 0u64..1000,
        shared in any::<bool>(),
    ) {
        let mode = if shared { SeedMode::SharedStream } else { SeedMode::PerTrial };
        let a = generate(&weights, &plan(10, 3, 5, seed, mode));
        let b = generate(&weights, &plan(10, 3, 5, seed, mode));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn proptest_leftover_only_holds_unplaceable(
        weights in prop::collection::vec(1u32..10, 1..30),
        seed in 0u64..500,
    ) {
        let capacity = 12;
        let set = generate(&weights, &plan(capacity, 2, 3, seed, SeedMode::PerTrial));
        for trial in set.trials() {
            if let Some(leftover) = trial.leftover() {
                // A leftover subject did not fit any batch when it was visited,
                // and batch totals only grow, so it cannot fit any final batch.
                for member in leftover.members() {
                    prop_assert!(trial
                        .capacity_batches()
                        .iter()
                        .all(|b| !b.fits(member.weight, capacity)));
                }
            }
        }
    }
}

#[test]
#[should_panic]
fn test_pack_trial_order_must_index_weights() {
    pack_trial(&[1, 2], &[0, 2], 5, 1);
}
