use crate::assignment::{AssignedRow, AssignmentResult};
use crate::packer::{Batch, Trial, TrialSet};
use crate::subject::SubjectTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Progress snapshot taken once trials have been generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub trials: usize,
    pub generation_secs: f64,
    pub total_weight: u64,
    pub subject_count: usize,
    /// Rendering of trial #1, if any trial was generated
    pub sample_trial: Option<String>,
}

impl RunReport {
    pub fn new(table: &SubjectTable, trials: &TrialSet, generation: Duration) -> Self {
        Self {
            trials: trials.len(),
            generation_secs: generation.as_secs_f64(),
            total_weight: table.total_weight(),
            subject_count: table.len(),
            sample_trial: trials.trial(1).map(|t| render_trial(table, t)),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Ran {} trials in {:.1} seconds",
            self.trials, self.generation_secs
        )?;
        writeln!(f, "Total weight to analyze:   {}", self.total_weight)?;
        writeln!(f, "Total subjects to analyze: {}", self.subject_count)?;
        if let Some(sample) = &self.sample_trial {
            writeln!(f, "Trial #1: {}", sample)?;
        }
        Ok(())
    }
}

/// Render a trial as `[{id: weight, ...}, ...]`, leftover last
pub fn render_trial(table: &SubjectTable, trial: &Trial) -> String {
    let batches: Vec<String> = trial.batches().map(|b| render_batch(table, b)).collect();
    format!("[{}]", batches.join(", "))
}

fn render_batch(table: &SubjectTable, batch: &Batch) -> String {
    let members: Vec<String> = batch
        .members()
        .iter()
        .map(|m| match table.get(m.position) {
            Some(subject) => format!("{}: {}", subject.id, m.weight),
            None => format!("#{}: {}", m.position, m.weight),
        })
        .collect();
    format!("{{{}}}", members.join(", "))
}

/// Size of one labelled group in the selected assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub label: usize,
    pub subjects: usize,
    pub total_weight: u64,
    pub leftover: bool,
}

/// One summary row per label present in `result`, in label order
pub fn summarize(result: &AssignmentResult) -> Vec<BatchSummary> {
    summarize_rows(result, result.rows.iter())
}

/// Same as [`summarize`] with leftover subjects dropped
pub fn summarize_without_leftover(result: &AssignmentResult) -> Vec<BatchSummary> {
    summarize_rows(
        result,
        result.rows.iter().filter(|r| r.batch != result.leftover_label),
    )
}

fn summarize_rows<'a>(
    result: &AssignmentResult,
    rows: impl Iterator<Item = &'a AssignedRow>,
) -> Vec<BatchSummary> {
    let mut groups: BTreeMap<usize, (usize, u64)> = BTreeMap::new();
    for row in rows {
        let entry = groups.entry(row.batch).or_default();
        entry.0 += 1;
        entry.1 += row.record.weight as u64;
    }

    groups
        .into_iter()
        .map(|(label, (subjects, total_weight))| BatchSummary {
            label,
            subjects,
            total_weight,
            leftover: label == result.leftover_label,
        })
        .collect()
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Batch {:>3}{} {:>5} subjects, weight {:>6}",
            self.label,
            if self.leftover { " (leftover)" } else { "           " },
            self.subjects,
            self.total_weight
        )
    }
}
