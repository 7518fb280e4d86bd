use super::{BatchScore, DesignMatrix, PropensityModel};

/// Separability of one batch: |mean propensity in batch - mean propensity outside|.
///
/// `membership[i]` marks whether row `i` of `design` belongs to the batch.
/// Batches holding no subjects or every subject cannot be fitted and are
/// reported as degenerate rather than scored.
pub fn batch_score(
    design: &DesignMatrix,
    membership: &[bool],
    model: &dyn PropensityModel,
) -> BatchScore {
    let total = membership.len();
    let members = membership.iter().filter(|&&m| m).count();
    if members == 0 || members == total {
        return BatchScore::Degenerate { members, total };
    }

    let propensity = match model.fit_predict(design, membership) {
        Ok(p) => p,
        Err(e) => return BatchScore::FitFailed(e.to_string()),
    };
    if propensity.len() != total {
        return BatchScore::FitFailed(format!(
            "model returned {} probabilities for {} subjects",
            propensity.len(),
            total
        ));
    }

    let (mut sum_in, mut sum_out) = (0.0, 0.0);
    for (p, &member) in propensity.iter().zip(membership) {
        if member {
            sum_in += p;
        } else {
            sum_out += p;
        }
    }

    let diff = (sum_in / members as f64 - sum_out / (total - members) as f64).abs();
    if diff.is_finite() {
        BatchScore::Scored(diff)
    } else {
        BatchScore::FitFailed("non-finite propensity scores".to_string())
    }
}
