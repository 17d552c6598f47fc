//! Case store state machine
//!
//! ```text
//! Open --Agree/Disagree--> Closed
//! Open --MoreTests-------> PendingInfo
//! ```
//!
//! Both targets are terminal. Every write to an existing case goes through
//! `Mutation::UpdateCase` with the version it was read at, so a stale write
//! fails instead of overwriting.

use chrono::{DateTime, Utc};

use secondop_db::{Mutation, WriteBatch};
use secondop_types::{
    Case, CaseId, CaseStatus, Decision, MarketError, Opinion, Result, Specialty, User, UserId,
    MAX_STARS,
};

/// Status an opinion moves an open case to
pub(crate) fn next_status(case: &Case, decision: Decision) -> Result<CaseStatus> {
    if case.status != CaseStatus::Open {
        return Err(MarketError::CaseNotOpen {
            case_id: case.id.to_string(),
            status: case.status.to_string(),
        });
    }
    Ok(if decision.is_paid() {
        CaseStatus::Closed
    } else {
        CaseStatus::PendingInfo
    })
}

/// A new open case for `patient`, optionally addressed to one doctor
pub(crate) fn open(
    patient: &User,
    specialty: Specialty,
    symptoms: &str,
    direct_to: Option<UserId>,
    now: DateTime<Utc>,
) -> Result<Case> {
    let symptoms = symptoms.trim();
    if symptoms.is_empty() {
        return Err(MarketError::InvalidInput("symptoms are required".to_string()));
    }
    Ok(Case {
        id: CaseId::new(),
        patient_id: patient.id.clone(),
        patient_name: patient.name.clone(),
        specialty,
        status: CaseStatus::Open,
        symptoms: symptoms.to_string(),
        assigned_doctor_id: direct_to,
        opinion: None,
        patient_rating: None,
        patient_feedback: None,
        is_rare: false,
        created_at: now,
        version: 0,
    })
}

/// The case after `doctor` answers it. The submitting doctor becomes the
/// assignee even if the case was addressed to someone else.
pub(crate) fn with_opinion(
    case: &Case,
    doctor: &User,
    decision: Decision,
    notes: &str,
    is_rare: bool,
    now: DateTime<Utc>,
) -> Result<Case> {
    let status = next_status(case, decision)?;
    Ok(Case {
        status,
        assigned_doctor_id: Some(doctor.id.clone()),
        opinion: Some(Opinion {
            doctor_id: doctor.id.clone(),
            doctor_name: doctor.name.clone(),
            decision,
            notes: notes.trim().to_string(),
            created_at: now,
        }),
        is_rare,
        ..case.clone()
    })
}

/// The case after its patient rates it
pub(crate) fn with_rating(
    case: &Case,
    patient_id: &UserId,
    stars: u8,
    feedback: Option<String>,
) -> Result<Case> {
    if !(1..=MAX_STARS).contains(&stars) {
        return Err(MarketError::InvalidInput(format!(
            "rating must be between 1 and {}, got {}",
            MAX_STARS, stars
        )));
    }
    if &case.patient_id != patient_id {
        return Err(MarketError::NotCaseOwner {
            case_id: case.id.to_string(),
            user_id: patient_id.to_string(),
        });
    }
    if case.status != CaseStatus::Closed || case.opinion.is_none() {
        return Err(MarketError::CaseNotClosed {
            case_id: case.id.to_string(),
            status: case.status.to_string(),
        });
    }
    if case.is_rated() {
        return Err(MarketError::AlreadyRated {
            case_id: case.id.to_string(),
        });
    }
    Ok(Case {
        patient_rating: Some(stars),
        patient_feedback: feedback
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty()),
        ..case.clone()
    })
}

pub(crate) fn insert(batch: &mut WriteBatch, case: Case) {
    batch.push(Mutation::InsertCase(case));
}

/// Stage a compare-and-set write of `updated` against the version `read` had
pub(crate) fn update(batch: &mut WriteBatch, read: &Case, updated: Case) {
    batch.push(Mutation::UpdateCase {
        case: updated,
        expected_version: read.version,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use secondop_types::{DoctorProfile, Money, Role};

    fn user(role: Role) -> User {
        User {
            id: UserId::new(),
            name: format!("{} user", role),
            email: format!("{}@x.com", role),
            role,
            wallet_balance: Money::ZERO,
            opening_balance: Money::ZERO,
            is_approved: true,
            avatar_url: None,
            created_at: Utc::now(),
            doctor: (role == Role::Doctor).then(|| DoctorProfile::new(Specialty::Dermatology)),
        }
    }

    fn open_case(patient: &User) -> Case {
        open(patient, Specialty::Dermatology, " itchy rash ", None, Utc::now()).unwrap()
    }

    #[test]
    fn test_transition_table() {
        let patient = user(Role::Patient);
        let case = open_case(&patient);
        assert_eq!(next_status(&case, Decision::Agree).unwrap(), CaseStatus::Closed);
        assert_eq!(next_status(&case, Decision::Disagree).unwrap(), CaseStatus::Closed);
        assert_eq!(
            next_status(&case, Decision::MoreTests).unwrap(),
            CaseStatus::PendingInfo
        );

        for status in [CaseStatus::Closed, CaseStatus::PendingInfo] {
            let answered = Case { status, ..case.clone() };
            for decision in [Decision::Agree, Decision::Disagree, Decision::MoreTests] {
                assert!(matches!(
                    next_status(&answered, decision),
                    Err(MarketError::CaseNotOpen { .. })
                ));
            }
        }
    }

    #[test]
    fn test_opinion_overrides_direct_assignment() {
        let patient = user(Role::Patient);
        let doctor = user(Role::Doctor);
        let mut case = open_case(&patient);
        case.assigned_doctor_id = Some(UserId::new());

        let answered =
            with_opinion(&case, &doctor, Decision::Agree, "Eczema", true, Utc::now()).unwrap();
        assert_eq!(answered.assigned_doctor_id, Some(doctor.id.clone()));
        assert_eq!(answered.opinion_doctor(), Some(&doctor.id));
        assert!(answered.is_rare);
        assert_eq!(answered.symptoms, "itchy rash");
    }

    #[test]
    fn test_rating_rules() {
        let patient = user(Role::Patient);
        let doctor = user(Role::Doctor);
        let case = open_case(&patient);

        assert!(matches!(
            with_rating(&case, &patient.id, 5, None),
            Err(MarketError::CaseNotClosed { .. })
        ));

        let closed = with_opinion(&case, &doctor, Decision::Agree, "", false, Utc::now()).unwrap();
        assert!(matches!(
            with_rating(&closed, &patient.id, 0, None),
            Err(MarketError::InvalidInput(_))
        ));
        assert!(matches!(
            with_rating(&closed, &doctor.id, 4, None),
            Err(MarketError::NotCaseOwner { .. })
        ));

        let rated = with_rating(&closed, &patient.id, 4, Some("  ".to_string())).unwrap();
        assert_eq!(rated.patient_rating, Some(4));
        assert_eq!(rated.patient_feedback, None);
        assert!(matches!(
            with_rating(&rated, &patient.id, 5, None),
            Err(MarketError::AlreadyRated { .. })
        ));
    }

    #[test]
    fn test_pending_info_cannot_be_rated() {
        let patient = user(Role::Patient);
        let doctor = user(Role::Doctor);
        let pending = with_opinion(
            &open_case(&patient),
            &doctor,
            Decision::MoreTests,
            "Need bloodwork",
            false,
            Utc::now(),
        )
        .unwrap();
        assert!(matches!(
            with_rating(&pending, &patient.id, 5, None),
            Err(MarketError::CaseNotClosed { .. })
        ));
    }
}
