mod error;


pub use error::ConfigError;

use crate::subject::SubjectTable;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SEED: u64 = 1989;
pub const DEFAULT_TRIALS: usize = 100;
pub const DEFAULT_CAPACITY: u64 = 34;
pub const DEFAULT_BATCHES: usize = 4;

/// How each trial's shuffle stream is derived from the run seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeedMode {
    /// Independent stream per trial, seeded from SHA-256(seed, trial index).
    /// Trials can be generated in any order or in parallel.
    #[default]
    PerTrial,
    /// One stream seeded once and advanced across trials in order.
    /// Trial k depends on everything drawn for trials before it.
    SharedStream,
}

impl fmt::Display for SeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedMode::PerTrial => write!(f, "per-trial"),
            SeedMode::SharedStream => write!(f, "shared-stream"),
        }
    }
}

impl FromStr for SeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-trial" => Ok(SeedMode::PerTrial),
            "shared-stream" => Ok(SeedMode::SharedStream),
            other => Err(format!(
                "unknown seed mode '{}' (expected per-trial or shared-stream)",
                other
            )),
        }
    }
}

/// Parameters of one randomization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Number of randomized trials to generate and score
    #[serde(default = "default_trials", alias = "nIter")]
    pub trials: usize,
    /// Maximum total weight of a capacity batch
    #[serde(default = "default_capacity", alias = "batchSize")]
    pub capacity: u64,
    /// Number of capacity batches per trial
    #[serde(default = "default_batches", alias = "nBatches")]
    pub batches: usize,
    /// Covariates used as classifier features, in order
    #[serde(default)]
    pub covariates: Vec<String>,
    #[serde(default)]
    pub seed_mode: SeedMode,
    /// Optional wall-clock limit for the whole run
    #[serde(default)]
    pub deadline_secs: Option<f64>,
    /// Worker threads (0 = rayon default)
    #[serde(default)]
    pub threads: usize,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_trials() -> usize {
    DEFAULT_TRIALS
}

fn default_capacity() -> u64 {
    DEFAULT_CAPACITY
}

fn default_batches() -> usize {
    DEFAULT_BATCHES
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            trials: DEFAULT_TRIALS,
            capacity: DEFAULT_CAPACITY,
            batches: DEFAULT_BATCHES,
            covariates: Vec::new(),
            seed_mode: SeedMode::default(),
            deadline_secs: None,
            threads: 0,
        }
    }
}

impl RunConfig {
    /// Check the parameters that do not depend on the subject table
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.batches == 0 {
            return Err(ConfigError::ZeroBatches);
        }
        if self.trials == 0 {
            return Err(ConfigError::ZeroTrials);
        }
        if self.covariates.is_empty() {
            return Err(ConfigError::NoCovariates);
        }

        let mut seen = HashSet::new();
        for name in &self.covariates {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateCovariate(name.clone()));
            }
        }

        if let Some(secs) = self.deadline_secs {
            if secs <= 0.0 || Duration::try_from_secs_f64(secs).is_err() {
                return Err(ConfigError::InvalidDeadline(secs));
            }
        }

        Ok(())
    }

    /// Full validation including the covariate columns of `table`
    pub fn validate_against(&self, table: &SubjectTable) -> Result<(), ConfigError> {
        self.validate()?;
        for name in &self.covariates {
            if table.column_index(name).is_none() {
                return Err(ConfigError::UnknownCovariate(name.clone()));
            }
        }
        Ok(())
    }

    /// Wall-clock limit; `None` also for values `validate` would reject
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Label given to subjects left over after packing
    pub fn leftover_label(&self) -> usize {
        self.batches + 1
    }
}

/// Fluent builder for [`RunConfig`]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    /// Create a new builder with the study defaults
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn trials(mut self, trials: usize) -> Self {
        self.config.trials = trials;
        self
    }

    pub fn capacity(mut self, capacity: u64) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn batches(mut self, batches: usize) -> Self {
        self.config.batches = batches;
        self
    }

    /// Append one covariate column
    pub fn covariate(mut self, name: impl Into<String>) -> Self {
        self.config.covariates.push(name.into());
        self
    }

    /// Replace the covariate list
    pub fn covariates<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.covariates = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn seed_mode(mut self, mode: SeedMode) -> Self {
        self.config.seed_mode = mode;
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.config.deadline_secs = Some(deadline.as_secs_f64());
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.config.threads = threads;
        self
    }

    /// Validate and return the config
    pub fn build(self) -> Result<RunConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for RunConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
