//! Fixed business constants

use rust_decimal::Decimal;

use crate::money::Money;

/// Charged to the patient when a case is created
pub const CASE_FEE: Money = Money::from_cents(4000);

/// Credited to the doctor for an Agree/Disagree opinion
pub const DOCTOR_PAYOUT: Money = Money::from_cents(2800);

/// Platform margin per paid case (`CASE_FEE - DOCTOR_PAYOUT`)
pub const PLATFORM_MARGIN: Money = Money::from_cents(1200);

/// Bonus points awarded for a five-star rating
pub const FIVE_STAR_BONUS: u32 = 5;

/// Highest rating a patient can give
pub const MAX_STARS: u8 = 5;

/// Platform share of gross case-fee revenue (30%)
pub fn platform_share() -> Decimal {
    Decimal::new(3, 1)
}
