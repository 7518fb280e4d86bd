mod pipeline;
mod projection;
mod types;

#[cfg(test)]
mod tests;

pub use pipeline::{run, run_with};
pub use projection::{assign, label_fingerprint, project_labels};
pub use types::{AssignedRow, AssignmentResult, Run, RunOutcome};
