use crate::report::RunReport;
use crate::scorer::ScoreTable;
use crate::subject::SubjectRecord;
use serde::{Deserialize, Serialize};

/// One row of the augmented subject table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedRow {
    #[serde(flatten)]
    pub record: SubjectRecord,
    /// 1-based batch label; leftover subjects carry `batches + 1`
    pub batch: usize,
}

/// Selected trial projected onto the subject table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentResult {
    /// 1-based index of the winning trial
    pub winner: usize,
    pub winner_score: f64,
    /// Number of capacity batches
    pub batches: usize,
    pub leftover_label: usize,
    /// Subject rows in table order
    pub rows: Vec<AssignedRow>,
    pub scores: ScoreTable,
    /// Hex SHA-256 over the (id, label) column
    pub fingerprint: String,
}

impl AssignmentResult {
    /// Rows that were not placed in any capacity batch
    pub fn leftover_rows(&self) -> impl Iterator<Item = &AssignedRow> {
        self.rows.iter().filter(move |r| r.batch == self.leftover_label)
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every trial was scored and a winner selected
    Complete(AssignmentResult),
    /// The deadline expired first; no winner is chosen from a partial search
    Partial {
        completed: usize,
        requested: usize,
        scores: ScoreTable,
    },
    /// Every trial was scored but none had a defined balance score
    Unscorable { scores: ScoreTable },
}

impl RunOutcome {
    pub fn assignment(&self) -> Option<&AssignmentResult> {
        match self {
            RunOutcome::Complete(result) => Some(result),
            _ => None,
        }
    }

    pub fn scores(&self) -> &ScoreTable {
        match self {
            RunOutcome::Complete(result) => &result.scores,
            RunOutcome::Partial { scores, .. } | RunOutcome::Unscorable { scores } => scores,
        }
    }
}

/// Result of [`run`](super::run): progress report plus outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub report: RunReport,
    pub outcome: RunOutcome,
}
