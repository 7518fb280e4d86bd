use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Duplicate subject id: {0}")]
    DuplicateId(String),

    #[error("Duplicate covariate column: {0}")]
    DuplicateColumn(String),

    #[error("Subject {id} has {found} covariates (schema has {expected})")]
    CovariateCount {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("Subject {0} does not carry the same covariate columns as the rest of the table")]
    SchemaMismatch(String),

    #[error("Non-finite value for covariate {column} on subject {id}")]
    NonFinite { id: String, column: String },

    #[error("Covariate {0} mixes categorical and continuous values")]
    MixedColumn(String),

    #[error("Unknown covariate column: {0}")]
    UnknownColumn(String),
}
