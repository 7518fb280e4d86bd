use super::*;
use crate::config::{ConfigError, RunConfig, RunConfigBuilder, SeedMode};
use crate::packer::pack_trial;
use crate::scorer::{BatchScore, ClassifierError, DesignMatrix, PropensityModel, ScoreTable};
use crate::subject::{CovariateValue, Subject, SubjectTable};
use std::time::Duration;

fn study_table(n: usize, weight: impl Fn(usize) -> u32) -> SubjectTable {
    let subjects = (0..n)
        .map(|i| Subject {
            id: format!("p{:02}", i),
            weight: weight(i),
            covariates: vec![
                CovariateValue::Categorical(if i % 3 == 0 { "A" } else { "B" }.to_string()),
                CovariateValue::Categorical(if i % 2 == 0 { "F" } else { "M" }.to_string()),
                CovariateValue::Continuous(20.0 + (i * 7 % 11) as f64),
            ],
        })
        .collect();
    SubjectTable::new(
        vec!["location".into(), "sex".into(), "time_to_enrollment".into()],
        subjects,
    )
    .unwrap()
}

fn all_covariates() -> Vec<&'static str> {
    vec!["location", "sex", "time_to_enrollment"]
}

struct SlowModel;

impl PropensityModel for SlowModel {
    fn fit_predict(&self, features: &DesignMatrix, _: &[bool]) -> Result<Vec<f64>, ClassifierError> {
        std::thread::sleep(Duration::from_millis(30));
        Ok(vec![0.5; features.rows()])
    }
}

#[test]
fn test_project_labels_uses_sentinel_for_leftover() {
    let trial = pack_trial(&[1, 1, 1, 1, 1], &[4, 3, 2, 1, 0], 2, 2);
    let labels = project_labels(&trial, 5);
    assert_eq!(labels, vec![Some(3), Some(2), Some(2), Some(1), Some(1)]);
}

#[test]
fn test_project_labels_is_idempotent() {
    let trial = pack_trial(&[2, 1, 3, 1], &[1, 0, 3, 2], 3, 2);
    assert_eq!(project_labels(&trial, 4), project_labels(&trial, 4));
}

#[test]
fn test_project_labels_marks_uncovered() {
    let trial = pack_trial(&[1, 1], &[0], 5, 1);
    assert_eq!(project_labels(&trial, 2), vec![Some(1), None]);
}

#[test]
fn test_assign_rejects_incomplete_trial() {
    let table = study_table(3, |_| 1);
    let trial = pack_trial(&table.weights(), &[0, 1], 5, 1);
    assert!(assign(&table, &trial, 1, 0.0, ScoreTable::new(vec![], 1)).is_none());
}

#[test]
fn test_label_fingerprint_depends_on_labels() {
    let a = label_fingerprint([("x", 1), ("y", 2)]);
    let b = label_fingerprint([("x", 2), ("y", 1)]);
    assert_eq!(a.len(), 64);
    assert_ne!(a, b);
    assert_eq!(a, label_fingerprint([("x", 1), ("y", 2)]));
}

#[test]
fn test_run_complete_selects_minimum() {
    let table = study_table(30, |i| 1 + (i % 3) as u32);
    let config = RunConfigBuilder::new()
        .seed(1989)
        .trials(12)
        .capacity(15)
        .batches(4)
        .covariates(all_covariates())
        .build()
        .unwrap();

    let run = run(&table, &config).unwrap();
    let result = run.outcome.assignment().expect("complete run");

    assert_eq!(result.rows.len(), 30);
    assert_eq!(result.batches, 4);
    assert_eq!(result.leftover_label, 5);
    assert!(result.rows.iter().all(|r| (1..=5).contains(&r.batch)));
    assert_eq!(result.scores.completed(), 12);

    for record in result.scores.records() {
        if let Some(avg) = record.avg_balance {
            assert!(result.winner_score <= avg);
        }
    }

    // Capacity batches respect the bound in the projected table too
    for label in 1..=4 {
        let weight: u64 = result
            .rows
            .iter()
            .filter(|r| r.batch == label)
            .map(|r| r.record.weight as u64)
            .sum();
        assert!(weight <= 15);
    }

    assert_eq!(run.report.trials, 12);
    assert_eq!(run.report.subject_count, 30);
    assert_eq!(run.report.total_weight, table.total_weight());
    assert!(run.report.sample_trial.is_some());
}

#[test]
fn test_run_is_deterministic() {
    let table = study_table(24, |i| 1 + (i % 2) as u32);
    for mode in [SeedMode::PerTrial, SeedMode::SharedStream] {
        let config = RunConfigBuilder::new()
            .seed(7)
            .trials(6)
            .capacity(10)
            .batches(3)
            .covariates(all_covariates())
            .seed_mode(mode)
            .build()
            .unwrap();

        let a = run(&table, &config).unwrap().outcome;
        let b = run(&table, &config).unwrap().outcome;
        assert_eq!(a, b);
        assert_eq!(
            a.assignment().unwrap().fingerprint,
            b.assignment().unwrap().fingerprint
        );
    }
}

#[test]
fn test_run_with_dedicated_pool_matches_default() {
    let table = study_table(20, |_| 1);
    let base = RunConfigBuilder::new()
        .trials(5)
        .capacity(6)
        .batches(3)
        .covariates(all_covariates());
    let default_pool = base.build().unwrap();
    let two_threads = RunConfig {
        threads: 2,
        ..default_pool.clone()
    };

    let a = run(&table, &default_pool).unwrap().outcome;
    let b = run(&table, &two_threads).unwrap().outcome;
    assert_eq!(a, b);
}

#[test]
fn test_run_unscorable_when_nothing_fits() {
    let table = study_table(6, |_| 10);
    let config = RunConfigBuilder::new()
        .trials(3)
        .capacity(5)
        .batches(2)
        .covariates(all_covariates())
        .build()
        .unwrap();

    let outcome = run(&table, &config).unwrap().outcome;
    match &outcome {
        RunOutcome::Unscorable { scores } => {
            assert_eq!(scores.completed(), 3);
            for record in scores.records() {
                assert_eq!(record.avg_balance, None);
                assert_eq!(record.batches.len(), 3);
                assert!(
                    record.batches[..2]
                        .iter()
                        .all(|b| *b == BatchScore::Degenerate { members: 0, total: 6 })
                );
            }
        }
        other => panic!("expected unscorable outcome, got {:?}", other),
    }
    assert!(outcome.assignment().is_none());
}

#[test]
fn test_run_partial_after_deadline() {
    let table = study_table(10, |_| 1);
    let config = RunConfigBuilder::new()
        .trials(400)
        .capacity(3)
        .batches(3)
        .covariates(all_covariates())
        .deadline(Duration::from_millis(50))
        .threads(1)
        .build()
        .unwrap();

    let outcome = run_with(&table, &config, &SlowModel).unwrap().outcome;
    match outcome {
        RunOutcome::Partial {
            completed,
            requested,
            scores,
        } => {
            assert_eq!(requested, 400);
            assert!(completed < requested);
            assert_eq!(scores.completed(), completed);
        }
        other => panic!("expected partial outcome, got {:?}", other),
    }
}

#[test]
fn test_run_rejects_bad_config_before_work() {
    let table = study_table(4, |_| 1);
    let config = RunConfigBuilder::new()
        .covariate("weight_class")
        .build()
        .unwrap();
    assert_eq!(
        run(&table, &config).unwrap_err(),
        ConfigError::UnknownCovariate("weight_class".into())
    );

    let mut zero = RunConfigBuilder::new().covariate("sex").build().unwrap();
    zero.trials = 0;
    assert_eq!(run(&table, &zero).unwrap_err(), ConfigError::ZeroTrials);
}

#[test]
fn test_run_rejects_deadline_past_clock_range() {
    let table = study_table(4, |_| 1);
    for secs in [1e19, 1e20] {
        let mut config = RunConfigBuilder::new()
            .trials(2)
            .capacity(2)
            .batches(2)
            .covariates(all_covariates())
            .build()
            .unwrap();
        config.deadline_secs = Some(secs);
        assert!(matches!(
            run(&table, &config),
            Err(ConfigError::InvalidDeadline(_))
        ));
    }
}
