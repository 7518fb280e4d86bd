use super::DesignMatrix;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Target has {targets} rows but the design matrix has {rows}")]
    ShapeMismatch { rows: usize, targets: usize },

    #[error("Target has no variation")]
    ConstantTarget,

    #[error("Hessian is not positive definite")]
    Singular,

    #[error("Fit produced non-finite coefficients")]
    NonFinite,
}

/// Binary probabilistic classifier used to estimate propensity scores
pub trait PropensityModel: Send + Sync {
    /// Fit on `features` against `target` and return the predicted
    /// probability of `true` for every row of `features`.
    fn fit_predict(
        &self,
        features: &DesignMatrix,
        target: &[bool],
    ) -> Result<Vec<f64>, ClassifierError>;
}
