use super::{Run, RunOutcome, assign};
use crate::config::{ConfigError, RunConfig};
use crate::packer::{PackPlan, TrialSet, generate};
use crate::report::RunReport;
use crate::scorer::{DesignMatrix, LogisticRegression, PropensityModel, ScoreTable, score_until};
use crate::subject::SubjectTable;
use std::time::Instant;

/// Run the full search with the default logistic propensity model
pub fn run(table: &SubjectTable, config: &RunConfig) -> Result<Run, ConfigError> {
    run_with(table, config, &LogisticRegression::default())
}

/// Validate, generate trials, score them, and project the best one.
///
/// Configuration problems fail before any trial is generated. Packing and
/// scoring problems never fail the run; they show up in the outcome.
pub fn run_with(
    table: &SubjectTable,
    config: &RunConfig,
    model: &dyn PropensityModel,
) -> Result<Run, ConfigError> {
    let started = Instant::now();
    config.validate_against(table)?;
    let design = DesignMatrix::from_table(table, &config.covariates)?;
    let deadline = match config.deadline() {
        Some(d) => Some(
            started
                .checked_add(d)
                .ok_or(ConfigError::InvalidDeadline(d.as_secs_f64()))?,
        ),
        None => None,
    };

    tracing::info!(
        subjects = table.len(),
        trials = config.trials,
        batches = config.batches,
        capacity = config.capacity,
        seed = config.seed,
        mode = %config.seed_mode,
        "starting randomization"
    );

    let search = || {
        let gen_started = Instant::now();
        let trials = generate(&table.weights(), &PackPlan::from(config));
        let report = RunReport::new(table, &trials, gen_started.elapsed());
        let scores = score_until(&design, &trials, model, deadline);
        (trials, report, scores)
    };

    let (trials, report, scores) = if config.threads > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
        {
            Ok(pool) => pool.install(search),
            Err(e) => {
                tracing::warn!(error = %e, "could not build worker pool, using the global one");
                search()
            }
        }
    } else {
        search()
    };

    let outcome = select(table, &trials, scores);
    tracing::info!(
        elapsed_secs = started.elapsed().as_secs_f64(),
        "randomization finished"
    );

    Ok(Run { report, outcome })
}

fn select(table: &SubjectTable, trials: &TrialSet, scores: ScoreTable) -> RunOutcome {
    if !scores.is_complete() {
        tracing::warn!(
            completed = scores.completed(),
            requested = scores.requested(),
            "deadline expired before every trial was scored"
        );
        return RunOutcome::Partial {
            completed: scores.completed(),
            requested: scores.requested(),
            scores,
        };
    }

    let best = scores
        .best()
        .and_then(|r| Some((r.trial, r.avg_balance?)));
    let Some((winner, winner_score)) = best else {
        tracing::warn!("no trial produced a defined balance score");
        return RunOutcome::Unscorable { scores };
    };

    if scores.has_flags() {
        tracing::warn!("some batches were excluded from scoring; check batch sizes against N");
    }

    match trials.trial(winner) {
        Some(trial) => match assign(table, trial, winner, winner_score, scores.clone()) {
            Some(result) => {
                tracing::info!(winner, score = winner_score, "selected best trial");
                RunOutcome::Complete(result)
            }
            None => RunOutcome::Unscorable { scores },
        },
        None => RunOutcome::Unscorable { scores },
    }
}
