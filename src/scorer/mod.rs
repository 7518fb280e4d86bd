mod classifier;
mod design;
mod logistic;
mod separability;
mod types;


pub use classifier::{ClassifierError, PropensityModel};
pub use design::DesignMatrix;
pub use logistic::LogisticRegression;
pub use separability::batch_score;
pub use types::{BatchScore, ScoreRecord, ScoreTable};

use crate::packer::{Trial, TrialSet};
use rayon::prelude::*;
use std::time::Instant;

/// Averages closer than this are treated as tied; the lower trial index wins.
pub const SCORE_TIE_TOLERANCE: f64 = 1e-12;

/// Score every trial in `trials` against the covariates in `design`
pub fn score(design: &DesignMatrix, trials: &TrialSet, model: &dyn PropensityModel) -> ScoreTable {
    score_until(design, trials, model, None)
}

/// Score trials in parallel, skipping any trial not started before `deadline`.
///
/// Skipped trials are absent from the returned table, which then reports
/// itself as incomplete.
pub fn score_until(
    design: &DesignMatrix,
    trials: &TrialSet,
    model: &dyn PropensityModel,
    deadline: Option<Instant>,
) -> ScoreTable {
    let records: Vec<ScoreRecord> = trials
        .trials()
        .par_iter()
        .enumerate()
        .filter_map(|(i, trial)| {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return None;
            }
            Some(score_trial(design, trial, i + 1, model))
        })
        .collect();

    ScoreTable::new(records, trials.len())
}

/// Score one trial (`index` is 1-based)
pub fn score_trial(
    design: &DesignMatrix,
    trial: &Trial,
    index: usize,
    model: &dyn PropensityModel,
) -> ScoreRecord {
    let n = design.rows();
    let batch_scores: Vec<BatchScore> = trial
        .batches()
        .enumerate()
        .map(|(b, batch)| {
            let mut mask = vec![false; n];
            for position in batch.positions() {
                if let Some(slot) = mask.get_mut(position) {
                    *slot = true;
                }
            }

            let result = batch_score(design, &mask, model);
            match &result {
                BatchScore::Degenerate { members, total } => tracing::warn!(
                    trial = index,
                    batch = b + 1,
                    members,
                    total,
                    "degenerate batch excluded from trial score"
                ),
                BatchScore::FitFailed(reason) => tracing::warn!(
                    trial = index,
                    batch = b + 1,
                    %reason,
                    "propensity fit failed, batch excluded from trial score"
                ),
                BatchScore::Scored(_) => {}
            }
            result
        })
        .collect();

    ScoreRecord::from_batches(index, batch_scores)
}

/// Pick the record with the lowest defined average.
///
/// Records are visited in the given order, so with index-ordered input a
/// near tie resolves to the earliest trial. Records with no defined average
/// never win.
pub fn select_best(records: &[ScoreRecord]) -> Option<&ScoreRecord> {
    let mut best: Option<(&ScoreRecord, f64)> = None;

    for record in records {
        let Some(avg) = record.avg_balance else {
            continue;
        };
        match best {
            Some((_, best_avg)) if avg >= best_avg - SCORE_TIE_TOLERANCE => {}
            _ => best = Some((record, avg)),
        }
    }

    best.map(|(record, _)| record)
}
