//! User registry
//!
//! Reads come straight from the store. Writes are staged into the caller's
//! batch; wallet balances are never written here.

use chrono::{DateTime, Utc};

use secondop_db::{Mutation, Store, WriteBatch};
use secondop_types::{
    normalize_email, DoctorProfile, MarketError, Money, ProfileUpdate, Registration, Result, Role,
    User, UserId,
};

pub(crate) struct Registry<'a> {
    store: &'a dyn Store,
}

impl<'a> Registry<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub async fn find(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.store.get_user(id).await?)
    }

    /// Fails with `UserNotFound`
    pub async fn get(&self, id: &UserId) -> Result<User> {
        self.find(id).await?.ok_or_else(|| MarketError::UserNotFound {
            user_id: id.to_string(),
        })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.store.find_user_by_email(&normalize_email(email)).await?)
    }

    /// Registration order
    pub async fn list(&self) -> Result<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    pub async fn admin_exists(&self) -> Result<bool> {
        Ok(self.list().await?.iter().any(User::is_admin))
    }
}

/// Validate registration data and build the account record.
///
/// Patients and admins start approved; doctors wait for an admin.
pub(crate) fn new_account(data: Registration, role: Role, now: DateTime<Utc>) -> Result<User> {
    let name = data.name.trim().to_string();
    if name.is_empty() {
        return Err(MarketError::InvalidInput("name is required".to_string()));
    }
    let email = normalize_email(&data.email);
    if !is_plausible_email(&email) {
        return Err(MarketError::InvalidInput(format!("invalid email '{}'", data.email)));
    }

    let doctor = match role {
        Role::Doctor => {
            let specialty = data.specialty.ok_or_else(|| {
                MarketError::InvalidInput("doctors must declare a specialty".to_string())
            })?;
            Some(DoctorProfile {
                hospital: data.hospital,
                country: data.country,
                linkedin: data.linkedin,
                bio: data.bio,
                ..DoctorProfile::new(specialty)
            })
        }
        Role::Patient | Role::Admin => None,
    };

    Ok(User {
        id: UserId::new(),
        name,
        email,
        role,
        wallet_balance: Money::ZERO,
        opening_balance: Money::ZERO,
        is_approved: role != Role::Doctor,
        avatar_url: data.avatar_url,
        created_at: now,
        doctor,
    })
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

pub(crate) fn insert(batch: &mut WriteBatch, user: User) {
    batch.push(Mutation::InsertUser(user));
}

pub(crate) fn set_approval(batch: &mut WriteBatch, user_id: &UserId, approved: bool) {
    batch.push(Mutation::SetApproval {
        user_id: user_id.clone(),
        approved,
    });
}

pub(crate) fn update_profile(batch: &mut WriteBatch, user_id: &UserId, update: ProfileUpdate) {
    batch.push(Mutation::UpdateProfile {
        user_id: user_id.clone(),
        update,
    });
}

pub(crate) fn delete(batch: &mut WriteBatch, user_id: &UserId) {
    batch.push(Mutation::DeleteUser {
        user_id: user_id.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use secondop_types::Specialty;

    fn registration(email: &str) -> Registration {
        Registration {
            name: " Dr. Sarah Smith ".to_string(),
            email: email.to_string(),
            specialty: Some(Specialty::Cardiology),
            hospital: Some("Mayo Clinic".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_doctor_starts_unapproved() {
        let user = new_account(registration("Sarah@Mayo.org"), Role::Doctor, Utc::now()).unwrap();
        assert!(!user.is_approved);
        assert_eq!(user.email, "sarah@mayo.org");
        assert_eq!(user.name, "Dr. Sarah Smith");
        assert_eq!(user.specialty(), Some(Specialty::Cardiology));
        assert_eq!(user.wallet_balance, Money::ZERO);
    }

    #[test]
    fn test_patient_auto_approved_without_profile() {
        let user = new_account(registration("p@x.com"), Role::Patient, Utc::now()).unwrap();
        assert!(user.is_approved);
        assert!(user.doctor.is_none());
    }

    #[test]
    fn test_doctor_needs_specialty() {
        let mut data = registration("d@x.com");
        data.specialty = None;
        assert!(matches!(
            new_account(data, Role::Doctor, Utc::now()),
            Err(MarketError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_bad_email() {
        for email in ["", "nobody", "@x.com", "a@b", "a@.com"] {
            assert!(new_account(registration(email), Role::Patient, Utc::now()).is_err(), "{}", email);
        }
    }
}
