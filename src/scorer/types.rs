use serde::{Deserialize, Serialize};

/// Outcome of scoring a single batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum BatchScore {
    /// Absolute difference of mean propensity, in vs out of the batch
    Scored(f64),
    /// Batch holds no subjects or all of them; the classifier has nothing to fit
    Degenerate { members: usize, total: usize },
    /// The classifier could not produce usable probabilities
    FitFailed(String),
}

impl BatchScore {
    pub fn value(&self) -> Option<f64> {
        match self {
            BatchScore::Scored(v) => Some(*v),
            _ => None,
        }
    }
}

/// Balance score of one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// 1-based trial index
    pub trial: usize,
    /// Mean over scored batches; `None` when no batch could be scored
    pub avg_balance: Option<f64>,
    /// Batches contributing to the mean
    pub scored: usize,
    /// Batches excluded as degenerate or failed
    pub flagged: usize,
    /// Per-batch detail, capacity batches first, then leftover
    pub batches: Vec<BatchScore>,
}

impl ScoreRecord {
    pub fn from_batches(trial: usize, batches: Vec<BatchScore>) -> Self {
        let values: Vec<f64> = batches.iter().filter_map(BatchScore::value).collect();
        let avg_balance = if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        };

        Self {
            trial,
            avg_balance,
            scored: values.len(),
            flagged: batches.len() - values.len(),
            batches,
        }
    }
}

/// Score records of a run, ordered by trial index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    records: Vec<ScoreRecord>,
    requested: usize,
}

impl ScoreTable {
    pub fn new(mut records: Vec<ScoreRecord>, requested: usize) -> Self {
        records.sort_by_key(|r| r.trial);
        Self { records, requested }
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    /// Number of trials that were generated
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Number of trials that were scored
    pub fn completed(&self) -> usize {
        self.records.len()
    }

    pub fn is_complete(&self) -> bool {
        self.records.len() == self.requested
    }

    /// Lowest-scoring trial, ties to the lower index
    pub fn best(&self) -> Option<&ScoreRecord> {
        super::select_best(&self.records)
    }

    /// Whether any trial had at least one batch flagged
    pub fn has_flags(&self) -> bool {
        self.records.iter().any(|r| r.flagged > 0)
    }
}
