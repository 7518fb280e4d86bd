use super::{ClassifierError, DesignMatrix, PropensityModel};
use nalgebra::{DMatrix, DVector};

/// L2-penalised logistic regression with an unpenalised intercept
///
/// Minimises `sum(log_loss) + ||w||^2 / (2C)` by Newton-Raphson with step
/// halving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticRegression {
    /// Inverse regularisation strength
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl LogisticRegression {
    pub fn new(c: f64, max_iter: usize, tol: f64) -> Self {
        Self { c, max_iter, tol }
    }

    /// Fit and return the coefficients, intercept first
    pub fn fit(&self, x: &DMatrix<f64>, y: &[bool]) -> Result<DVector<f64>, ClassifierError> {
        let n = x.nrows();
        if y.len() != n {
            return Err(ClassifierError::ShapeMismatch {
                rows: n,
                targets: y.len(),
            });
        }
        if y.iter().all(|&t| t) || y.iter().all(|&t| !t) {
            return Err(ClassifierError::ConstantTarget);
        }

        let xa = with_intercept(x);
        let p = xa.ncols();
        let y = DVector::from_iterator(n, y.iter().map(|&t| if t { 1.0 } else { 0.0 }));
        let lambda = 1.0 / self.c;

        let mut beta = DVector::zeros(p);
        let mut objective = self.objective(&xa, &y, &beta, lambda);

        for _ in 0..self.max_iter {
            let eta = &xa * &beta;
            let mu = eta.map(sigmoid);

            let mut penalty = beta.clone();
            penalty[0] = 0.0;
            let grad = xa.transpose() * (&mu - &y) + penalty * lambda;

            let weighted = DMatrix::from_fn(n, p, |i, j| xa[(i, j)] * mu[i] * (1.0 - mu[i]));
            let mut hessian = xa.transpose() * weighted;
            for j in 1..p {
                hessian[(j, j)] += lambda;
            }

            let step = hessian
                .cholesky()
                .ok_or(ClassifierError::Singular)?
                .solve(&grad);

            let mut scale = 1.0;
            let mut next = &beta - &step;
            let mut next_objective = self.objective(&xa, &y, &next, lambda);
            while next_objective > objective && scale > 1e-6 {
                scale *= 0.5;
                next = &beta - &step * scale;
                next_objective = self.objective(&xa, &y, &next, lambda);
            }

            let moved = (&step * scale).amax();
            beta = next;
            objective = next_objective;

            if moved < self.tol {
                break;
            }
        }

        if beta.iter().any(|b| !b.is_finite()) {
            return Err(ClassifierError::NonFinite);
        }
        Ok(beta)
    }

    /// Predicted probabilities for `x` under coefficients from [`fit`](Self::fit)
    pub fn predict_proba(&self, x: &DMatrix<f64>, beta: &DVector<f64>) -> Vec<f64> {
        let eta = with_intercept(x) * beta;
        eta.iter().map(|&z| sigmoid(z)).collect()
    }

    fn objective(
        &self,
        xa: &DMatrix<f64>,
        y: &DVector<f64>,
        beta: &DVector<f64>,
        lambda: f64,
    ) -> f64 {
        let eta = xa * beta;
        let loss: f64 = eta
            .iter()
            .zip(y.iter())
            .map(|(&z, &t)| log1p_exp(z) - t * z)
            .sum();
        let ridge: f64 = beta.iter().skip(1).map(|b| b * b).sum();
        loss + 0.5 * lambda * ridge
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1.0, 100, 1e-8)
    }
}

impl PropensityModel for LogisticRegression {
    fn fit_predict(
        &self,
        features: &DesignMatrix,
        target: &[bool],
    ) -> Result<Vec<f64>, ClassifierError> {
        let beta = self.fit(features.values(), target)?;
        Ok(self.predict_proba(features.values(), &beta))
    }
}

fn with_intercept(x: &DMatrix<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(x.nrows(), x.ncols() + 1, |i, j| {
        if j == 0 { 1.0 } else { x[(i, j - 1)] }
    })
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// ln(1 + e^z) without overflow
fn log1p_exp(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}
