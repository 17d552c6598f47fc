//! Accounts, roles, specialties and doctor reputation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::identity::UserId;
use crate::money::Money;

/// Role of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor => "doctor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Self::Patient),
            "doctor" => Ok(Self::Doctor),
            "admin" => Ok(Self::Admin),
            other => Err(MarketError::InvalidInput(format!("unknown role '{}'", other))),
        }
    }
}

/// Medical specialty a case is filed under and a doctor practises
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialty {
    GeneralPractice,
    Cardiology,
    Dermatology,
    Neurology,
    Orthopedics,
    Pediatrics,
    Rheumatology,
    Gastroenterology,
    AllergyImmunology,
    PlasticSurgery,
    SportsMedicine,
    Geriatrics,
    OccupationalMedicine,
    Radiology,
    Pathology,
    PalliativeCare,
    GeneticMedicine,
    SexualHealth,
    SleepMedicine,
    PainManagement,
    DermatoCosmetology,
}

impl Specialty {
    /// Every specialty, in display order.
    pub const ALL: [Specialty; 21] = [
        Self::GeneralPractice,
        Self::Cardiology,
        Self::Dermatology,
        Self::Neurology,
        Self::Orthopedics,
        Self::Pediatrics,
        Self::Rheumatology,
        Self::Gastroenterology,
        Self::AllergyImmunology,
        Self::PlasticSurgery,
        Self::SportsMedicine,
        Self::Geriatrics,
        Self::OccupationalMedicine,
        Self::Radiology,
        Self::Pathology,
        Self::PalliativeCare,
        Self::GeneticMedicine,
        Self::SexualHealth,
        Self::SleepMedicine,
        Self::PainManagement,
        Self::DermatoCosmetology,
    ];

    /// Stable storage key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralPractice => "general_practice",
            Self::Cardiology => "cardiology",
            Self::Dermatology => "dermatology",
            Self::Neurology => "neurology",
            Self::Orthopedics => "orthopedics",
            Self::Pediatrics => "pediatrics",
            Self::Rheumatology => "rheumatology",
            Self::Gastroenterology => "gastroenterology",
            Self::AllergyImmunology => "allergy_immunology",
            Self::PlasticSurgery => "plastic_surgery",
            Self::SportsMedicine => "sports_medicine",
            Self::Geriatrics => "geriatrics",
            Self::OccupationalMedicine => "occupational_medicine",
            Self::Radiology => "radiology",
            Self::Pathology => "pathology",
            Self::PalliativeCare => "palliative_care",
            Self::GeneticMedicine => "genetic_medicine",
            Self::SexualHealth => "sexual_health",
            Self::SleepMedicine => "sleep_medicine",
            Self::PainManagement => "pain_management",
            Self::DermatoCosmetology => "dermato_cosmetology",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GeneralPractice => "General Practice",
            Self::Cardiology => "Cardiology",
            Self::Dermatology => "Dermatology",
            Self::Neurology => "Neurology",
            Self::Orthopedics => "Orthopedics",
            Self::Pediatrics => "Pediatrics",
            Self::Rheumatology => "Rheumatology",
            Self::Gastroenterology => "Gastroenterology",
            Self::AllergyImmunology => "Allergy & Immunology",
            Self::PlasticSurgery => "Plastic & Reconstructive Surgery",
            Self::SportsMedicine => "Sports Medicine",
            Self::Geriatrics => "Geriatrics",
            Self::OccupationalMedicine => "Occupational Medicine",
            Self::Radiology => "Radiology",
            Self::Pathology => "Pathology",
            Self::PalliativeCare => "Palliative Care",
            Self::GeneticMedicine => "Genetic Medicine",
            Self::SexualHealth => "Sexual Health",
            Self::SleepMedicine => "Sleep Medicine",
            Self::PainManagement => "Pain Management",
            Self::DermatoCosmetology => "Dermato-Cosmetology",
        }
    }
}

impl fmt::Display for Specialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Specialty {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|sp| sp.as_str() == s)
            .ok_or_else(|| MarketError::InvalidInput(format!("unknown specialty '{}'", s)))
    }
}

/// Doctor-only profile and reputation fields.
///
/// `rating`, `cases_closed` and `bonus_points` are written only by the rating
/// and payout paths; profile updates never touch them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub specialty: Specialty,
    pub hospital: Option<String>,
    pub country: Option<String>,
    pub linkedin: Option<String>,
    pub bio: Option<String>,
    /// Mean patient rating, 0-5, one decimal place. Zero until first rated.
    pub rating: Decimal,
    pub cases_closed: u32,
    pub bonus_points: u32,
}

impl DoctorProfile {
    pub fn new(specialty: Specialty) -> Self {
        Self {
            specialty,
            hospital: None,
            country: None,
            linkedin: None,
            bio: None,
            rating: Decimal::ZERO,
            cases_closed: 0,
            bonus_points: 0,
        }
    }

    /// Leaderboard score: `cases_closed * 10 + bonus_points`
    pub fn rank_score(&self) -> u64 {
        u64::from(self.cases_closed) * 10 + u64::from(self.bonus_points)
    }
}

/// A registered account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Normalized (trimmed, lower-case) email, unique across the registry
    pub email: String,
    pub role: Role,
    pub wallet_balance: Money,
    /// Balance the account started with before any ledger entry
    pub opening_balance: Money,
    pub is_approved: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub doctor: Option<DoctorProfile>,
}

impl User {
    pub fn is_patient(&self) -> bool {
        self.role == Role::Patient
    }

    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn specialty(&self) -> Option<Specialty> {
        self.doctor.as_ref().map(|d| d.specialty)
    }

    pub fn rank_score(&self) -> u64 {
        self.doctor.as_ref().map(DoctorProfile::rank_score).unwrap_or(0)
    }
}

/// Normalize an email for storage and uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Data supplied at registration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub role: Option<Role>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub specialty: Option<Specialty>,
    #[serde(default)]
    pub hospital: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Editable profile fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub hospital: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply to a user. Doctor-only fields are ignored for other roles.
    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.trim().to_string();
        }
        if let Some(avatar) = &self.avatar_url {
            user.avatar_url = Some(avatar.clone());
        }
        if let Some(doctor) = user.doctor.as_mut() {
            if let Some(v) = &self.hospital {
                doctor.hospital = Some(v.clone());
            }
            if let Some(v) = &self.country {
                doctor.country = Some(v.clone());
            }
            if let Some(v) = &self.linkedin {
                doctor.linkedin = Some(v.clone());
            }
            if let Some(v) = &self.bio {
                doctor.bio = Some(v.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor() -> User {
        User {
            id: UserId::new(),
            name: "Dr. Karim Nader".to_string(),
            email: "karim@hospital.ae".to_string(),
            role: Role::Doctor,
            wallet_balance: Money::ZERO,
            opening_balance: Money::ZERO,
            is_approved: true,
            avatar_url: None,
            created_at: Utc::now(),
            doctor: Some(DoctorProfile::new(Specialty::Dermatology)),
        }
    }

    #[test]
    fn test_specialty_keys_roundtrip() {
        for sp in Specialty::ALL {
            assert_eq!(sp.as_str().parse::<Specialty>().unwrap(), sp);
        }
        assert!("Dermatology".parse::<Specialty>().is_err());
    }

    #[test]
    fn test_rank_score() {
        let mut user = doctor();
        let profile = user.doctor.as_mut().unwrap();
        profile.cases_closed = 42;
        profile.bonus_points = 120;
        assert_eq!(user.rank_score(), 540);
    }

    #[test]
    fn test_profile_update_leaves_reputation() {
        let mut user = doctor();
        user.doctor.as_mut().unwrap().bonus_points = 7;
        ProfileUpdate {
            bio: Some("Board certified".to_string()),
            ..Default::default()
        }
        .apply(&mut user);
        let profile = user.doctor.unwrap();
        assert_eq!(profile.bio.as_deref(), Some("Board certified"));
        assert_eq!(profile.bonus_points, 7);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Sarah@Clinic.COM "), "sarah@clinic.com");
    }
}
