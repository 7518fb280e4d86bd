mod first_fit;
mod seed;
mod types;

#[cfg(test)]
mod tests;

pub use first_fit::pack_trial;
pub use seed::{trial_rng, trial_seed};
pub use types::{Batch, Member, Trial, TrialSet};

use crate::config::{RunConfig, SeedMode};
use crate::subject::Weight;
use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Packing parameters for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackPlan {
    pub capacity: u64,
    pub batches: usize,
    pub trials: usize,
    pub seed: u64,
    pub mode: SeedMode,
}

impl From<&RunConfig> for PackPlan {
    fn from(config: &RunConfig) -> Self {
        Self {
            capacity: config.capacity,
            batches: config.batches,
            trials: config.trials,
            seed: config.seed,
            mode: config.seed_mode,
        }
    }
}

/// Generate `plan.trials` randomized first-fit packings of `weights`.
///
/// Member positions in every batch index into `weights`. Infeasible subjects
/// land in the trial's leftover batch; this never fails.
pub fn generate(weights: &[Weight], plan: &PackPlan) -> TrialSet {
    let trials: Vec<Trial> = match plan.mode {
        SeedMode::PerTrial => (1..=plan.trials)
            .into_par_iter()
            .map(|k| {
                let mut rng = trial_rng(plan.seed, k);
                shuffle_and_pack(weights, plan, &mut rng)
            })
            .collect(),
        SeedMode::SharedStream => {
            let mut rng = ChaCha8Rng::seed_from_u64(plan.seed);
            (0..plan.trials)
                .map(|_| shuffle_and_pack(weights, plan, &mut rng))
                .collect()
        }
    };

    tracing::debug!(
        trials = trials.len(),
        with_leftover = trials.iter().filter(|t| t.leftover().is_some()).count(),
        mode = %plan.mode,
        "generated trial set"
    );

    TrialSet::new(trials, plan.seed, plan.mode)
}

fn shuffle_and_pack(weights: &[Weight], plan: &PackPlan, rng: &mut ChaCha8Rng) -> Trial {
    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.shuffle(rng);
    pack_trial(weights, &order, plan.capacity, plan.batches)
}
