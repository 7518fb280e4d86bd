use crate::subject::{CovariateValue, SubjectTable, TableError};
use nalgebra::DMatrix;
use std::collections::BTreeSet;

/// Numeric feature matrix built from the selected covariates
///
/// Continuous covariates map to one column each. Categorical covariates are
/// one-hot encoded over their sorted levels, dropping the first level.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    columns: Vec<String>,
    values: DMatrix<f64>,
}

impl DesignMatrix {
    pub fn from_table(table: &SubjectTable, covariates: &[String]) -> Result<Self, TableError> {
        let n = table.len();
        let mut columns = Vec::new();
        let mut data: Vec<Vec<f64>> = Vec::new();

        for name in covariates {
            let values = table.column(name)?;
            let categorical = values.iter().filter(|v| v.is_categorical()).count();

            if categorical == 0 {
                columns.push(name.clone());
                data.push(
                    values
                        .iter()
                        .map(|v| match v {
                            CovariateValue::Continuous(x) => *x,
                            CovariateValue::Categorical(_) => 0.0,
                        })
                        .collect(),
                );
            } else if categorical == values.len() {
                let levels: BTreeSet<&str> = values
                    .iter()
                    .filter_map(|v| match v {
                        CovariateValue::Categorical(s) => Some(s.as_str()),
                        CovariateValue::Continuous(_) => None,
                    })
                    .collect();

                for level in levels.iter().skip(1) {
                    columns.push(format!("{}={}", name, level));
                    data.push(
                        values
                            .iter()
                            .map(|v| match v {
                                CovariateValue::Categorical(s) if s == level => 1.0,
                                _ => 0.0,
                            })
                            .collect(),
                    );
                }
            } else {
                return Err(TableError::MixedColumn(name.clone()));
            }
        }

        let values = DMatrix::from_fn(n, columns.len(), |i, j| data[j][i]);
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }
}
