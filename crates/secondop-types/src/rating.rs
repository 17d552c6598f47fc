//! Doctor rating
//!
//! A doctor's rating is always recomputed from every rated, closed case they
//! answered; there is no running accumulator to drift. Both store adapters
//! run the same rule inside the unit of work that records a rating.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::case::{Case, CaseStatus};
use crate::identity::UserId;

/// Mean of `stars`, one decimal place, halves rounded away from zero.
/// `None` when there are no ratings.
pub fn mean_rating(stars: impl IntoIterator<Item = u8>) -> Option<Decimal> {
    let (sum, count) = stars
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), s| (sum + u64::from(s), count + 1));
    if count == 0 {
        return None;
    }
    let mean = Decimal::from(sum) / Decimal::from(count);
    Some(mean.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
}

/// Rating for `doctor_id` over `cases`; zero until the first rating
pub fn doctor_rating<'a>(doctor_id: &UserId, cases: impl IntoIterator<Item = &'a Case>) -> Decimal {
    mean_rating(
        cases
            .into_iter()
            .filter(|c| c.status == CaseStatus::Closed && c.opinion_doctor() == Some(doctor_id))
            .filter_map(|c| c.patient_rating),
    )
    .unwrap_or(Decimal::ZERO)
}
