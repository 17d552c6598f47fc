//! Demo data for a fresh local store
//!
//! Opening balances are set so that the seeded ledger reconciles: the closed
//! demo case carries its case fee and payout entries.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use secondop_types::{
    Case, CaseId, CaseStatus, Decision, DoctorProfile, Money, Opinion, Role, Specialty,
    Transaction, TransactionId, TransactionKind, User, UserId, CASE_FEE, DOCTOR_PAYOUT,
};

use crate::local::Snapshot;

fn account(name: &str, email: &str, role: Role, balance: Money, days_ago: i64) -> User {
    User {
        id: UserId::new(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        wallet_balance: balance,
        opening_balance: balance,
        is_approved: true,
        avatar_url: None,
        created_at: Utc::now() - Duration::days(days_ago),
        doctor: None,
    }
}

fn doctor(
    name: &str,
    email: &str,
    balance: Money,
    days_ago: i64,
    profile: DoctorProfile,
) -> User {
    User {
        doctor: Some(profile),
        ..account(name, email, Role::Doctor, balance, days_ago)
    }
}

/// Four accounts (admin, two doctors, one patient) and one closed, rated case.
pub fn demo_snapshot() -> Snapshot {
    let admin = account(
        "Admin User",
        "admin@2ndopinion.com",
        Role::Admin,
        Money::from_cents(500_000),
        400,
    );

    let sarah = doctor(
        "Dr. Sarah Smith",
        "sarah.smith@mayoclinic.org",
        Money::from_cents(56_000),
        365,
        DoctorProfile {
            hospital: Some("Mayo Clinic".to_string()),
            country: Some("USA".to_string()),
            bio: Some("Interventional cardiologist with 15 years of experience.".to_string()),
            rating: Decimal::new(48, 1),
            cases_closed: 42,
            bonus_points: 120,
            ..DoctorProfile::new(Specialty::Cardiology)
        },
    );

    let mut karim = doctor(
        "Dr. Karim Nader",
        "karim.nader@clevelandclinic.ae",
        Money::from_cents(120_000),
        300,
        DoctorProfile {
            hospital: Some("Cleveland Clinic Abu Dhabi".to_string()),
            country: Some("UAE".to_string()),
            bio: Some("Consultant dermatologist, skin cancer screening.".to_string()),
            rating: Decimal::new(49, 1),
            cases_closed: 89,
            bonus_points: 350,
            ..DoctorProfile::new(Specialty::Dermatology)
        },
    );
    karim.opening_balance = karim.wallet_balance - DOCTOR_PAYOUT;

    let mut ahmed = account(
        "Ahmed Al-Sayed",
        "ahmed@example.com",
        Role::Patient,
        Money::from_cents(10_000),
        30,
    );
    ahmed.opening_balance = ahmed.wallet_balance + CASE_FEE;

    let filed = Utc::now() - Duration::days(7);
    let answered = filed + Duration::days(1);
    let case = Case {
        id: CaseId::new(),
        patient_id: ahmed.id.clone(),
        patient_name: ahmed.name.clone(),
        specialty: Specialty::Dermatology,
        status: CaseStatus::Closed,
        symptoms: "Recurring rash on left arm, itchy during night.".to_string(),
        assigned_doctor_id: Some(karim.id.clone()),
        opinion: Some(Opinion {
            doctor_id: karim.id.clone(),
            doctor_name: karim.name.clone(),
            decision: Decision::Agree,
            notes: "Standard eczema. Prescribed hydrocortisone.".to_string(),
            created_at: answered,
        }),
        patient_rating: Some(5),
        patient_feedback: Some(
            "Dr. Karim was thorough and reassuring. Highly recommended for dermatology issues."
                .to_string(),
        ),
        is_rare: false,
        created_at: filed,
        version: 2,
    };

    let transactions = vec![
        Transaction {
            id: TransactionId::new(),
            user_id: ahmed.id.clone(),
            amount: -CASE_FEE,
            kind: TransactionKind::CaseFee,
            description: format!("Case Creation Fee: {}", case.specialty.display_name()),
            case_id: Some(case.id.clone()),
            created_at: filed,
        },
        Transaction {
            id: TransactionId::new(),
            user_id: karim.id.clone(),
            amount: DOCTOR_PAYOUT,
            kind: TransactionKind::Payout,
            description: format!("Payout for Case #{}", case.id),
            case_id: Some(case.id.clone()),
            created_at: answered,
        },
    ];

    Snapshot {
        users: vec![admin, sarah, karim, ahmed],
        cases: vec![case],
        transactions,
        locale: Default::default(),
    }
}
