mod error;
mod types;


pub use error::TableError;
pub use types::{CovariateValue, Subject, SubjectId, SubjectRecord, SubjectTable, Weight};
