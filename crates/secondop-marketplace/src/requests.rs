//! Request payloads accepted by the facade

use serde::{Deserialize, Serialize};

use secondop_types::{Case, CaseStatus, Decision, Specialty, User, UserId};

/// A patient's new case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCase {
    pub specialty: Specialty,
    pub symptoms: String,
    /// Address the case to one doctor instead of the specialty pool
    #[serde(default)]
    pub doctor_id: Option<UserId>,
}

/// A doctor's answer to a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpinionSubmission {
    pub decision: Decision,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub is_rare: bool,
}

/// Admin case listing filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseFilter {
    #[serde(default)]
    pub status: Option<CaseStatus>,
    /// Case-insensitive match on patient name or case id
    #[serde(default)]
    pub search: Option<String>,
}

impl CaseFilter {
    pub fn matches(&self, case: &Case) -> bool {
        if let Some(status) = self.status {
            if case.status != status {
                return false;
            }
        }
        match normalized(&self.search) {
            Some(needle) => {
                case.patient_name.to_lowercase().contains(&needle)
                    || case.id.to_string().to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

/// Public doctor directory filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoctorSearch {
    /// Case-insensitive match on name, specialty or hospital
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub specialty: Option<Specialty>,
    #[serde(default)]
    pub country: Option<String>,
}

impl DoctorSearch {
    pub fn matches(&self, user: &User) -> bool {
        let Some(profile) = user.doctor.as_ref() else {
            return false;
        };
        if self.specialty.is_some_and(|s| s != profile.specialty) {
            return false;
        }
        if let Some(country) = normalized(&self.country) {
            if profile.country.as_deref().map(str::to_lowercase) != Some(country) {
                return false;
            }
        }
        match normalized(&self.text) {
            Some(needle) => {
                user.name.to_lowercase().contains(&needle)
                    || profile.specialty.display_name().to_lowercase().contains(&needle)
                    || profile
                        .hospital
                        .as_deref()
                        .is_some_and(|h| h.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

/// Match on a user's name or email
pub(crate) fn user_matches(user: &User, search: Option<&str>) -> bool {
    match search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()) {
        Some(needle) => {
            user.name.to_lowercase().contains(&needle) || user.email.contains(&needle)
        }
        None => true,
    }
}

fn normalized(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}
