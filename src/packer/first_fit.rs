use super::types::{Batch, Member, Trial};
use crate::subject::Weight;

/// Pack subjects into `batches` capacity-bounded batches, visiting them in `order`.
///
/// Each subject goes into the first batch (lowest index) whose total plus the
/// subject's weight stays within `capacity`. Subjects no batch accepts are
/// collected, in visiting order, into the leftover batch.
///
/// # Panics
///
/// Every entry of `order` must be a valid index into `weights`; an
/// out-of-range position panics.
pub fn pack_trial(weights: &[Weight], order: &[usize], capacity: u64, batches: usize) -> Trial {
    let mut packed = vec![Batch::default(); batches];
    let mut leftover = Batch::default();

    for &position in order {
        let member = Member {
            position,
            weight: weights[position],
        };

        match packed.iter_mut().find(|b| b.fits(member.weight, capacity)) {
            Some(batch) => batch.push(member),
            None => leftover.push(member),
        }
    }

    Trial::new(packed, (!leftover.is_empty()).then_some(leftover))
}
