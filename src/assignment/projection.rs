use super::{AssignedRow, AssignmentResult};
use crate::packer::Trial;
use crate::scorer::ScoreTable;
use crate::subject::SubjectTable;
use sha2::{Digest, Sha256};

/// Batch label per subject position: capacity batch `i` (0-based) gets
/// `i + 1`, the leftover batch gets `capacity_batches + 1`.
///
/// Positions not covered by the trial stay `None`.
pub fn project_labels(trial: &Trial, subject_count: usize) -> Vec<Option<usize>> {
    let mut labels = vec![None; subject_count];
    let leftover_label = trial.capacity_batches().len() + 1;

    for (i, batch) in trial.capacity_batches().iter().enumerate() {
        for position in batch.positions() {
            if let Some(slot) = labels.get_mut(position) {
                *slot = Some(i + 1);
            }
        }
    }
    if let Some(leftover) = trial.leftover() {
        for position in leftover.positions() {
            if let Some(slot) = labels.get_mut(position) {
                *slot = Some(leftover_label);
            }
        }
    }

    labels
}

/// Stable digest of an (id, label) column
pub fn label_fingerprint<'a>(pairs: impl IntoIterator<Item = (&'a str, usize)>) -> String {
    let mut hasher = Sha256::new();
    for (id, label) in pairs {
        hasher.update(id.as_bytes());
        hasher.update(b"\t");
        hasher.update(label.to_string().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Build the augmented table for the winning `trial`.
///
/// Returns `None` if the trial does not cover every subject of `table`.
pub fn assign(
    table: &SubjectTable,
    trial: &Trial,
    winner: usize,
    winner_score: f64,
    scores: ScoreTable,
) -> Option<AssignmentResult> {
    let labels = project_labels(trial, table.len());

    let rows = labels
        .into_iter()
        .enumerate()
        .map(|(position, label)| {
            Some(AssignedRow {
                record: table.record(position)?,
                batch: label?,
            })
        })
        .collect::<Option<Vec<_>>>()?;

    let fingerprint = label_fingerprint(rows.iter().map(|r| (r.record.id.as_str(), r.batch)));
    let batches = trial.capacity_batches().len();

    Some(AssignmentResult {
        winner,
        winner_score,
        batches,
        leftover_label: batches + 1,
        rows,
        scores,
        fingerprint,
    })
}
