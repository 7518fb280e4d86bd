// Public API exports
pub mod assignment;
pub mod config;
pub mod export;
pub mod packer;
pub mod report;
pub mod scorer;
pub mod subject;

// Re-export main types for convenience
pub use subject::{
    CovariateValue, Subject, SubjectId, SubjectRecord, SubjectTable, TableError, Weight,
};

pub use config::{ConfigError, RunConfig, RunConfigBuilder, SeedMode};

pub use packer::{Batch, Member, PackPlan, Trial, TrialSet, generate};

pub use scorer::{
    BatchScore, ClassifierError, DesignMatrix, LogisticRegression, PropensityModel, ScoreRecord,
    ScoreTable, score, select_best,
};

pub use assignment::{AssignedRow, AssignmentResult, Run, RunOutcome, run, run_with};

pub use report::{BatchSummary, RunReport, summarize, summarize_without_leftover};

pub use export::{AssignmentDb, write_json};
