//! Marketplace facade
//!
//! The only write path into the marketplace. Each operation validates its
//! preconditions against current state, stages every change into one
//! `WriteBatch`, and commits it through the session's store. A rejected
//! operation commits nothing.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use secondop_assist::{CaseBrief, TextAssist};
use secondop_db::{Backend, CaseQuery, Mutation, StoreConfig, WriteBatch};
use secondop_types::{
    Case, CaseId, Locale, MarketError, Money, ProfileUpdate, Registration, Result, Role,
    Transaction, User, UserId,
};

use crate::cases;
use crate::config::MarketplaceConfig;
use crate::identity::IdentityGateway;
use crate::leaderboard::{Leaderboard, LeaderboardEntry, Standing};
use crate::ledger;
use crate::matching;
use crate::rating;
use crate::registry::{self, Registry};
use crate::requests::{self, CaseFilter, DoctorSearch, NewCase, OpinionSubmission};
use crate::session::Session;
use crate::stats::{self, BalanceDiscrepancy, PlatformStats};

pub struct Marketplace {
    session: Session,
    config: MarketplaceConfig,
    assist: Arc<dyn TextAssist>,
}

impl Marketplace {
    /// Start a session on the configured backend
    pub async fn open(
        store: &StoreConfig,
        config: MarketplaceConfig,
        assist: Arc<dyn TextAssist>,
    ) -> Result<Self> {
        let session = Session::init(store).await?;
        Self::new(session, config, assist)
    }

    pub fn new(
        session: Session,
        config: MarketplaceConfig,
        assist: Arc<dyn TextAssist>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            backend = session.backend().as_str(),
            case_fee = %config.pricing.case_fee,
            doctor_payout = %config.pricing.doctor_payout,
            assist = assist.name(),
            "Marketplace ready"
        );
        Ok(Self {
            session,
            config,
            assist,
        })
    }

    pub fn backend(&self) -> Backend {
        self.session.backend()
    }

    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    pub async fn health(&self) -> Result<bool> {
        Ok(self.session.store().health_check().await?)
    }

    /// Tear the session down
    pub async fn shutdown(&self) -> Result<()> {
        self.session.teardown().await
    }

    fn registry(&self) -> Registry<'_> {
        Registry::new(self.session.store())
    }

    async fn commit(&self, operation: &'static str, batch: WriteBatch) -> Result<()> {
        let size = batch.len();
        self.session.store().commit(batch).await.map_err(|e| {
            let err = MarketError::from(e);
            warn!(operation, mutations = size, code = err.code(), error = %err, "Commit rejected");
            err
        })
    }

    // =========================================================================
    // Callers
    // =========================================================================

    /// An existing, approved account
    async fn actor(&self, user_id: &UserId) -> Result<User> {
        let user = self
            .registry()
            .find(user_id)
            .await?
            .ok_or(MarketError::Unauthenticated)?;
        if !user.is_approved {
            warn!(user_id = %user_id, "Rejected unapproved caller");
            return Err(MarketError::NotApproved {
                user_id: user_id.to_string(),
            });
        }
        Ok(user)
    }

    async fn patient(&self, user_id: &UserId) -> Result<User> {
        let user = self.actor(user_id).await?;
        if !user.is_patient() {
            return Err(MarketError::NotAPatient {
                user_id: user_id.to_string(),
            });
        }
        Ok(user)
    }

    async fn doctor(&self, user_id: &UserId) -> Result<User> {
        let user = self.actor(user_id).await?;
        if !user.is_doctor() {
            return Err(MarketError::NotADoctor {
                user_id: user_id.to_string(),
            });
        }
        Ok(user)
    }

    async fn admin(&self, user_id: &UserId) -> Result<User> {
        let user = self.actor(user_id).await?;
        if !user.is_admin() {
            return Err(MarketError::NotAnAdmin {
                user_id: user_id.to_string(),
            });
        }
        Ok(user)
    }

    async fn case(&self, case_id: &CaseId) -> Result<Case> {
        self.session
            .store()
            .get_case(case_id)
            .await?
            .ok_or_else(|| MarketError::CaseNotFound {
                case_id: case_id.to_string(),
            })
    }

    /// Resolve the gateway's identity into an approved account
    pub async fn authenticate(&self, gateway: &dyn IdentityGateway) -> Result<User> {
        let identity = gateway
            .current_identity()
            .await
            .ok_or(MarketError::Unauthenticated)?;
        let user = self.actor(&identity.user_id).await?;
        if user.role != identity.role {
            warn!(user_id = %user.id, claimed = %identity.role, actual = %user.role, "Role mismatch");
            return Err(MarketError::Unauthenticated);
        }
        debug!(user_id = %user.id, role = %user.role, "Authenticated");
        Ok(user)
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Create a patient or doctor account. Doctors wait for approval.
    pub async fn register(&self, data: Registration) -> Result<User> {
        let role = data.role.unwrap_or(Role::Patient);
        if role == Role::Admin {
            return Err(MarketError::InvalidInput(
                "admin accounts cannot be self-registered".to_string(),
            ));
        }
        self.create_account(data, role, "register").await
    }

    /// Create the first admin. Fails once any admin exists.
    pub async fn bootstrap_admin(&self, name: &str, email: &str) -> Result<User> {
        if self.registry().admin_exists().await? {
            return Err(MarketError::AdminExists);
        }
        let data = Registration {
            name: name.to_string(),
            email: email.to_string(),
            ..Default::default()
        };
        self.create_account(data, Role::Admin, "bootstrap_admin").await
    }

    async fn create_account(
        &self,
        data: Registration,
        role: Role,
        operation: &'static str,
    ) -> Result<User> {
        let user = registry::new_account(data, role, Utc::now())?;
        if self.registry().find_by_email(&user.email).await?.is_some() {
            warn!(email = %user.email, "Email already registered");
            return Err(MarketError::EmailTaken { email: user.email });
        }

        let mut batch = WriteBatch::new();
        registry::insert(&mut batch, user.clone());
        self.commit(operation, batch).await?;

        info!(user_id = %user.id, role = %user.role, approved = user.is_approved, "Account registered");
        Ok(user)
    }

    pub async fn approve(&self, admin_id: &UserId, user_id: &UserId, approved: bool) -> Result<User> {
        self.admin(admin_id).await?;
        self.registry().get(user_id).await?;

        let mut batch = WriteBatch::new();
        registry::set_approval(&mut batch, user_id, approved);
        self.commit("approve", batch).await?;

        let user = self.registry().get(user_id).await?;
        info!(admin_id = %admin_id, user_id = %user_id, approved, "Approval updated");
        Ok(user)
    }

    /// Remove an account. Case and opinion name snapshots and all ledger
    /// entries stay; the user's unclaimed direct requests return to the pool.
    pub async fn delete_user(&self, admin_id: &UserId, user_id: &UserId) -> Result<()> {
        self.admin(admin_id).await?;
        if admin_id == user_id {
            return Err(MarketError::InvalidInput(
                "admins cannot delete their own account".to_string(),
            ));
        }
        self.registry().get(user_id).await?;

        let mut batch = WriteBatch::new();
        registry::delete(&mut batch, user_id);
        self.commit("delete_user", batch).await?;

        info!(admin_id = %admin_id, user_id = %user_id, "Account deleted");
        Ok(())
    }

    /// Edit profile fields; allowed for the account itself or an admin
    pub async fn update_profile(
        &self,
        caller_id: &UserId,
        user_id: &UserId,
        update: ProfileUpdate,
    ) -> Result<User> {
        let caller = self.actor(caller_id).await?;
        if caller_id != user_id && !caller.is_admin() {
            return Err(MarketError::NotAnAdmin {
                user_id: caller_id.to_string(),
            });
        }
        if update.is_empty() {
            return Err(MarketError::InvalidInput("nothing to update".to_string()));
        }
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(MarketError::InvalidInput("name cannot be empty".to_string()));
        }
        self.registry().get(user_id).await?;

        let mut batch = WriteBatch::new();
        registry::update_profile(&mut batch, user_id, update);
        self.commit("update_profile", batch).await?;

        let user = self.registry().get(user_id).await?;
        info!(user_id = %user_id, by = %caller_id, "Profile updated");
        Ok(user)
    }

    /// Own account, any doctor, or anyone for an admin
    pub async fn get_user(&self, caller_id: &UserId, user_id: &UserId) -> Result<User> {
        let caller = self.actor(caller_id).await?;
        let user = self.registry().get(user_id).await?;
        if caller_id == user_id || caller.is_admin() || user.is_doctor() {
            Ok(user)
        } else {
            Err(MarketError::NotAnAdmin {
                user_id: caller_id.to_string(),
            })
        }
    }

    /// All accounts (admin), optionally filtered on name or email
    pub async fn list_users(&self, admin_id: &UserId, search: Option<&str>) -> Result<Vec<User>> {
        self.admin(admin_id).await?;
        let users = self.registry().list().await?;
        Ok(users
            .into_iter()
            .filter(|u| requests::user_matches(u, search))
            .collect())
    }

    /// Public directory of approved doctors
    pub async fn find_doctors(&self, search: &DoctorSearch) -> Result<Vec<User>> {
        let users = self.registry().list().await?;
        Ok(users
            .into_iter()
            .filter(|u| u.is_doctor() && u.is_approved && search.matches(u))
            .collect())
    }

    // =========================================================================
    // Wallet
    // =========================================================================

    fn require_positive(amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(MarketError::InvalidAmount(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        Ok(())
    }

    pub async fn deposit(&self, user_id: &UserId, amount: Money) -> Result<User> {
        Self::require_positive(amount)?;
        self.actor(user_id).await?;

        let mut batch = WriteBatch::new();
        ledger::deposit(&mut batch, user_id, amount);
        self.commit("deposit", batch).await?;

        let user = self.registry().get(user_id).await?;
        info!(user_id = %user_id, amount = %amount, balance = %user.wallet_balance, "Funds deposited");
        Ok(user)
    }

    pub async fn withdraw(&self, user_id: &UserId, amount: Money) -> Result<User> {
        Self::require_positive(amount)?;
        let user = self.actor(user_id).await?;
        if amount > user.wallet_balance {
            warn!(user_id = %user_id, amount = %amount, balance = %user.wallet_balance, "Withdrawal exceeds balance");
            return Err(MarketError::InsufficientFunds {
                user_id: user_id.to_string(),
                requested: amount,
                available: user.wallet_balance,
            });
        }

        let mut batch = WriteBatch::new();
        ledger::withdrawal(&mut batch, user_id, amount);
        self.commit("withdraw", batch).await?;

        let user = self.registry().get(user_id).await?;
        info!(user_id = %user_id, amount = %amount, balance = %user.wallet_balance, "Funds withdrawn");
        Ok(user)
    }

    /// Own ledger entries; every entry for an admin
    pub async fn transactions(&self, caller_id: &UserId) -> Result<Vec<Transaction>> {
        let caller = self.actor(caller_id).await?;
        let scope = (!caller.is_admin()).then_some(caller_id);
        Ok(self.session.store().list_transactions(scope).await?)
    }

    // =========================================================================
    // Cases
    // =========================================================================

    /// Charge the case fee and open the case, as one unit
    pub async fn create_case(&self, patient_id: &UserId, request: NewCase) -> Result<Case> {
        let patient = self.patient(patient_id).await?;

        if let Some(doctor_id) = &request.doctor_id {
            let doctor = self.registry().get(doctor_id).await?;
            if !doctor.is_doctor() {
                return Err(MarketError::NotADoctor {
                    user_id: doctor_id.to_string(),
                });
            }
            if !doctor.is_approved {
                return Err(MarketError::NotApproved {
                    user_id: doctor_id.to_string(),
                });
            }
        }

        let fee = self.config.pricing.case_fee;
        if patient.wallet_balance < fee {
            warn!(patient_id = %patient_id, balance = %patient.wallet_balance, fee = %fee, "Insufficient funds for case");
            return Err(MarketError::InsufficientFunds {
                user_id: patient_id.to_string(),
                requested: fee,
                available: patient.wallet_balance,
            });
        }

        let case = cases::open(
            &patient,
            request.specialty,
            &request.symptoms,
            request.doctor_id,
            Utc::now(),
        )?;

        let mut batch = WriteBatch::new();
        cases::insert(&mut batch, case.clone());
        ledger::case_fee(&mut batch, &patient, &case, fee);
        self.commit("create_case", batch).await?;

        info!(
            case_id = %case.id,
            patient_id = %patient_id,
            specialty = case.specialty.as_str(),
            direct = case.assigned_doctor_id.is_some(),
            "Case created"
        );
        Ok(case)
    }

    /// Answer an open case. The first opinion to commit wins; a concurrent
    /// loser fails with `ConcurrentModification`.
    pub async fn submit_opinion(
        &self,
        doctor_id: &UserId,
        case_id: &CaseId,
        submission: OpinionSubmission,
    ) -> Result<Case> {
        let doctor = self.doctor(doctor_id).await?;
        let case = self.case(case_id).await?;

        let answered = cases::with_opinion(
            &case,
            &doctor,
            submission.decision,
            &submission.notes,
            submission.is_rare,
            Utc::now(),
        )
        .map_err(|e| {
            warn!(case_id = %case_id, doctor_id = %doctor_id, error = %e, "Opinion rejected");
            e
        })?;

        let mut batch = WriteBatch::new();
        cases::update(&mut batch, &case, answered.clone());
        if submission.decision.is_paid() {
            let pricing = self.config.pricing;
            ledger::payout(&mut batch, doctor_id, case_id, pricing.doctor_payout);
            batch.push(Mutation::IncrementCasesClosed {
                user_id: doctor_id.clone(),
            });
            if let Some(platform) = &self.config.platform_account {
                let margin = pricing.margin();
                if margin.is_positive() {
                    ledger::commission(&mut batch, platform, case_id, margin);
                }
            }
        }
        self.commit("submit_opinion", batch).await?;

        info!(
            case_id = %case_id,
            doctor_id = %doctor_id,
            decision = submission.decision.as_str(),
            status = %answered.status,
            "Opinion submitted"
        );
        Ok(Case {
            version: case.version + 1,
            ..answered
        })
    }

    /// Rate the doctor who answered a closed case. Once per case. The
    /// store recomputes the doctor's rating from every rated case in the
    /// same unit of work, so concurrent ratings cannot lose each other.
    pub async fn rate_doctor(
        &self,
        patient_id: &UserId,
        case_id: &CaseId,
        stars: u8,
        feedback: Option<String>,
    ) -> Result<Case> {
        self.patient(patient_id).await?;

        let case = self.case(case_id).await?;
        let rated = cases::with_rating(&case, patient_id, stars, feedback).map_err(|e| {
            warn!(case_id = %case_id, patient_id = %patient_id, error = %e, "Rating rejected");
            e
        })?;

        let mut batch = WriteBatch::new();
        cases::update(&mut batch, &case, rated.clone());

        let mut doctor_id = rated.opinion_doctor().cloned();
        if let Some(id) = &doctor_id {
            if self.registry().find(id).await?.is_some() {
                batch.push(Mutation::RecomputeReputation {
                    user_id: id.clone(),
                    bonus_award: rating::bonus_for(stars, self.config.bonus_increment),
                });
            } else {
                debug!(doctor_id = %id, "Rated doctor no longer registered");
                doctor_id = None;
            }
        }
        self.commit("rate_doctor", batch).await?;

        let new_rating = match &doctor_id {
            Some(id) => self
                .registry()
                .find(id)
                .await?
                .and_then(|d| d.doctor.map(|p| p.rating)),
            None => None,
        };
        info!(
            case_id = %case_id,
            stars,
            doctor_id = ?doctor_id.map(|d| d.to_string()),
            rating = ?new_rating,
            "Doctor rated"
        );
        Ok(Case {
            version: case.version + 1,
            ..rated
        })
    }

    /// A single case, visible to its patient, a doctor who may answer or has
    /// answered it, and admins
    pub async fn get_case(&self, caller_id: &UserId, case_id: &CaseId) -> Result<Case> {
        let caller = self.actor(caller_id).await?;
        let case = self.case(case_id).await?;
        let visible = match caller.role {
            Role::Admin => true,
            Role::Patient => &case.patient_id == caller_id,
            Role::Doctor => {
                case.opinion_doctor() == Some(caller_id)
                    || matching::is_available_to(&case, &caller)
            }
        };
        if !visible {
            return Err(MarketError::NotCaseOwner {
                case_id: case_id.to_string(),
                user_id: caller_id.to_string(),
            });
        }
        Ok(case)
    }

    /// Direct requests plus the open specialty pool
    pub async fn available_cases(&self, doctor_id: &UserId) -> Result<Vec<Case>> {
        let doctor = self.doctor(doctor_id).await?;
        let query = matching::query_for(&doctor)?;
        let cases = self.session.store().list_cases(&query).await?;
        debug!(doctor_id = %doctor_id, count = cases.len(), "Available cases");
        Ok(cases
            .into_iter()
            .filter(|c| matching::is_available_to(c, &doctor))
            .collect())
    }

    /// A patient's own cases, newest first
    pub async fn my_cases(&self, patient_id: &UserId) -> Result<Vec<Case>> {
        self.patient(patient_id).await?;
        Ok(self
            .session
            .store()
            .list_cases(&CaseQuery::ByPatient(patient_id.clone()))
            .await?)
    }

    /// Cases a doctor has answered, newest first
    pub async fn my_opinions(&self, doctor_id: &UserId) -> Result<Vec<Case>> {
        self.doctor(doctor_id).await?;
        Ok(self
            .session
            .store()
            .list_cases(&CaseQuery::ByOpinionDoctor(doctor_id.clone()))
            .await?)
    }

    pub async fn all_cases(&self, admin_id: &UserId, filter: &CaseFilter) -> Result<Vec<Case>> {
        self.admin(admin_id).await?;
        let cases = self.session.store().list_cases(&CaseQuery::All).await?;
        Ok(cases.into_iter().filter(|c| filter.matches(c)).collect())
    }

    // =========================================================================
    // Reputation
    // =========================================================================

    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let users = self.registry().list().await?;
        Ok(Leaderboard::rank(&users).top(limit).to_vec())
    }

    /// A doctor's own rank and the gap to the next rank
    pub async fn standing(&self, doctor_id: &UserId) -> Result<Standing> {
        self.doctor(doctor_id).await?;
        let users = self.registry().list().await?;
        Leaderboard::rank(&users)
            .standing(doctor_id)
            .ok_or_else(|| MarketError::UserNotFound {
                user_id: doctor_id.to_string(),
            })
    }

    // =========================================================================
    // Admin reporting
    // =========================================================================

    pub async fn platform_stats(&self, admin_id: &UserId) -> Result<PlatformStats> {
        self.admin(admin_id).await?;
        let store = self.session.store();
        let users = store.list_users().await?;
        let cases = store.list_cases(&CaseQuery::All).await?;
        let entries = store.list_transactions(None).await?;
        Ok(PlatformStats::compute(&users, &cases, &entries))
    }

    /// Users whose wallet does not equal opening balance plus ledger entries.
    /// Expected to be empty; anything listed was changed outside this facade,
    /// for example by editing the database directly.
    pub async fn audit_balances(&self, admin_id: &UserId) -> Result<Vec<BalanceDiscrepancy>> {
        self.admin(admin_id).await?;
        let store = self.session.store();
        let users = store.list_users().await?;
        let entries = store.list_transactions(None).await?;
        let drift = stats::audit_balances(&users, &entries);
        if !drift.is_empty() {
            warn!(count = drift.len(), "Balance audit found discrepancies");
        }
        Ok(drift)
    }

    // =========================================================================
    // Locale
    // =========================================================================

    pub fn locale(&self) -> Locale {
        self.session.locale()
    }

    pub async fn set_locale(&self, locale: Locale) -> Result<Locale> {
        let batch = WriteBatch::new().with(Mutation::SetLocale(locale));
        self.commit("set_locale", batch).await?;
        self.session.remember_locale(locale);
        info!(locale = %locale, "Locale changed");
        Ok(locale)
    }

    pub async fn toggle_locale(&self) -> Result<Locale> {
        self.set_locale(self.locale().toggled()).await
    }

    // =========================================================================
    // Text assist
    // =========================================================================

    /// Best-effort rewrite of symptom text; never fails
    pub async fn refine_symptoms(&self, text: &str) -> String {
        self.assist.refine(text).await
    }

    /// Best-effort pre-analysis of a case the doctor can see
    pub async fn analyze_case(&self, doctor_id: &UserId, case_id: &CaseId) -> Result<String> {
        self.doctor(doctor_id).await?;
        let case = self.get_case(doctor_id, case_id).await?;
        Ok(self.assist.analyze(&CaseBrief::from(&case)).await)
    }
}
