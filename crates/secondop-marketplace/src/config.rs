//! Marketplace configuration

use serde::{Deserialize, Serialize};

use secondop_types::{MarketError, Money, Result, UserId, CASE_FEE, DOCTOR_PAYOUT, FIVE_STAR_BONUS};

/// Per-case pricing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    /// Charged to the patient at case creation
    pub case_fee: Money,
    /// Credited to the doctor for a paid opinion
    pub doctor_payout: Money,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            case_fee: CASE_FEE,
            doctor_payout: DOCTOR_PAYOUT,
        }
    }
}

impl Pricing {
    /// What the platform keeps per paid case
    pub fn margin(&self) -> Money {
        self.case_fee - self.doctor_payout
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// Bonus points awarded for a five-star rating
    #[serde(default = "default_bonus")]
    pub bonus_increment: u32,
    /// Account credited with the margin on each paid case. No commission
    /// entries are written when unset.
    #[serde(default)]
    pub platform_account: Option<UserId>,
    #[serde(default)]
    pub pricing: Pricing,
}

fn default_bonus() -> u32 {
    FIVE_STAR_BONUS
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            bonus_increment: FIVE_STAR_BONUS,
            platform_account: None,
            pricing: Pricing::default(),
        }
    }
}

impl MarketplaceConfig {
    pub fn validate(&self) -> Result<()> {
        let Pricing {
            case_fee,
            doctor_payout,
        } = self.pricing;
        if !case_fee.is_positive() || !doctor_payout.is_positive() {
            return Err(MarketError::InvalidInput(
                "case fee and doctor payout must be positive".to_string(),
            ));
        }
        if doctor_payout > case_fee {
            return Err(MarketError::InvalidInput(format!(
                "doctor payout {} exceeds case fee {}",
                doctor_payout, case_fee
            )));
        }
        Ok(())
    }
}
