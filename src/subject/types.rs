use super::TableError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Unique identifier for a subject
pub type SubjectId = String;

/// Per-subject packing weight (e.g. number of visits)
pub type Weight = u32;

/// A single covariate observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CovariateValue {
    /// Numeric covariate used as-is in the design matrix
    Continuous(f64),
    /// Category label, one-hot encoded for scoring
    Categorical(String),
}

impl CovariateValue {
    pub fn is_categorical(&self) -> bool {
        matches!(self, CovariateValue::Categorical(_))
    }
}

/// One study subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub weight: Weight,
    /// Covariates aligned with the owning table's schema
    pub covariates: Vec<CovariateValue>,
}

/// Row format accepted from JSON input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub id: SubjectId,
    pub weight: Weight,
    #[serde(default)]
    pub covariates: BTreeMap<String, CovariateValue>,
}

/// Immutable, validated subject table
///
/// Row positions are stable for the lifetime of the table; batches refer to
/// subjects by position.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectTable {
    schema: Vec<String>,
    subjects: Vec<Subject>,
}

impl SubjectTable {
    /// Build a table from an explicit schema and aligned rows
    pub fn new(schema: Vec<String>, subjects: Vec<Subject>) -> Result<Self, TableError> {
        let mut columns = HashSet::new();
        for name in &schema {
            if !columns.insert(name.as_str()) {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
        }

        let mut ids = HashSet::new();
        for subject in &subjects {
            if !ids.insert(subject.id.as_str()) {
                return Err(TableError::DuplicateId(subject.id.clone()));
            }

            if subject.covariates.len() != schema.len() {
                return Err(TableError::CovariateCount {
                    id: subject.id.clone(),
                    expected: schema.len(),
                    found: subject.covariates.len(),
                });
            }

            for (column, value) in schema.iter().zip(&subject.covariates) {
                if let CovariateValue::Continuous(x) = value {
                    if !x.is_finite() {
                        return Err(TableError::NonFinite {
                            id: subject.id.clone(),
                            column: column.clone(),
                        });
                    }
                }
            }
        }

        Ok(Self { schema, subjects })
    }

    /// Build a table from JSON-style records
    ///
    /// The schema is taken from the first record (sorted column order); every
    /// other record must carry exactly the same columns.
    pub fn from_records(records: Vec<SubjectRecord>) -> Result<Self, TableError> {
        let schema: Vec<String> = records
            .first()
            .map(|r| r.covariates.keys().cloned().collect())
            .unwrap_or_default();

        let mut subjects = Vec::with_capacity(records.len());
        for mut record in records {
            if record.covariates.len() != schema.len()
                || !schema.iter().all(|c| record.covariates.contains_key(c))
            {
                return Err(TableError::SchemaMismatch(record.id));
            }

            let covariates = schema
                .iter()
                .filter_map(|c| record.covariates.remove(c))
                .collect();

            subjects.push(Subject {
                id: record.id,
                weight: record.weight,
                covariates,
            });
        }

        Self::new(schema, subjects)
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn get(&self, position: usize) -> Option<&Subject> {
        self.subjects.get(position)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Position of a covariate column in the schema
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|c| c == name)
    }

    /// All values of one covariate column, in row order
    pub fn column(&self, name: &str) -> Result<Vec<&CovariateValue>, TableError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))?;
        Ok(self.subjects.iter().map(|s| &s.covariates[idx]).collect())
    }

    /// Weights in row order, the packing input
    pub fn weights(&self) -> Vec<Weight> {
        self.subjects.iter().map(|s| s.weight).collect()
    }

    /// Covariates of one row keyed by column name
    pub fn record(&self, position: usize) -> Option<SubjectRecord> {
        let subject = self.subjects.get(position)?;
        Some(SubjectRecord {
            id: subject.id.clone(),
            weight: subject.weight,
            covariates: self
                .schema
                .iter()
                .cloned()
                .zip(subject.covariates.iter().cloned())
                .collect(),
        })
    }

    pub fn total_weight(&self) -> u64 {
        self.subjects.iter().map(|s| s.weight as u64).sum()
    }
}
