//! Matching: which open cases a doctor may answer.
//!
//! A doctor sees their direct requests plus the unassigned open cases in their
//! specialty. Nothing is reserved; the first opinion to commit wins.

use secondop_db::CaseQuery;
use secondop_types::{Case, CaseStatus, MarketError, Result, User};

/// Whether `doctor` may submit an opinion on `case` right now
pub fn is_available_to(case: &Case, doctor: &User) -> bool {
    if case.status != CaseStatus::Open {
        return false;
    }
    match (&case.assigned_doctor_id, doctor.specialty()) {
        (Some(assigned), _) => assigned == &doctor.id,
        (None, Some(specialty)) => case.specialty == specialty,
        (None, None) => false,
    }
}

/// Store query for a doctor's available cases
pub fn query_for(doctor: &User) -> Result<CaseQuery> {
    let specialty = doctor.specialty().ok_or_else(|| MarketError::NotADoctor {
        user_id: doctor.id.to_string(),
    })?;
    Ok(CaseQuery::Open {
        specialty,
        doctor: doctor.id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use secondop_types::{CaseId, DoctorProfile, Money, Role, Specialty, UserId};

    fn doctor(specialty: Specialty) -> User {
        User {
            id: UserId::new(),
            name: "Dr. Nader".to_string(),
            email: "nader@x.com".to_string(),
            role: Role::Doctor,
            wallet_balance: Money::ZERO,
            opening_balance: Money::ZERO,
            is_approved: true,
            avatar_url: None,
            created_at: Utc::now(),
            doctor: Some(DoctorProfile::new(specialty)),
        }
    }

    fn case(specialty: Specialty, assigned: Option<UserId>) -> Case {
        Case {
            id: CaseId::new(),
            patient_id: UserId::new(),
            patient_name: "Ahmed".to_string(),
            specialty,
            status: CaseStatus::Open,
            symptoms: "Rash".to_string(),
            assigned_doctor_id: assigned,
            opinion: None,
            patient_rating: None,
            patient_feedback: None,
            is_rare: false,
            created_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn test_pool_and_direct_requests() {
        let me = doctor(Specialty::Dermatology);
        assert!(is_available_to(&case(Specialty::Dermatology, None), &me));
        assert!(!is_available_to(&case(Specialty::Cardiology, None), &me));
        // Direct requests ignore specialty
        assert!(is_available_to(&case(Specialty::Cardiology, Some(me.id.clone())), &me));
        assert!(!is_available_to(&case(Specialty::Dermatology, Some(UserId::new())), &me));
    }

    #[test]
    fn test_query_matches_predicate() {
        let me = doctor(Specialty::Dermatology);
        let query = query_for(&me).unwrap();
        for c in [
            case(Specialty::Dermatology, None),
            case(Specialty::Cardiology, None),
            case(Specialty::Cardiology, Some(me.id.clone())),
            case(Specialty::Dermatology, Some(UserId::new())),
        ] {
            assert_eq!(query.matches(&c), is_available_to(&c, &me));
        }
    }

    #[test]
    fn test_patients_have_no_queue() {
        let mut patient = doctor(Specialty::Dermatology);
        patient.role = Role::Patient;
        patient.doctor = None;
        assert!(matches!(query_for(&patient), Err(MarketError::NotADoctor { .. })));
    }
}
