//! Marketplace integration tests
//!
//! Drive the facade end to end over an in-process store.

use std::sync::Arc;

use rust_decimal_macros::dec;
use secondop_assist::DisabledAssist;
use secondop_db::{Backend, LocalConfig, LocalStore, StoreConfig};
use secondop_marketplace::{
    CaseFilter, DoctorSearch, Marketplace, MarketplaceConfig, NewCase, OpinionSubmission, Session,
    StaticIdentity,
};
use secondop_types::{
    CaseStatus, Decision, Locale, MarketError, Money, Registration, Role, Specialty,
    TransactionKind, User, UserId,
};

async fn market_with(config: MarketplaceConfig) -> Marketplace {
    let session = Session::attach(Arc::new(LocalStore::new())).await.unwrap();
    Marketplace::new(session, config, Arc::new(DisabledAssist)).unwrap()
}

async fn market() -> Marketplace {
    market_with(MarketplaceConfig::default()).await
}

async fn admin(market: &Marketplace) -> User {
    market
        .bootstrap_admin("Admin User", "admin@2ndopinion.com")
        .await
        .unwrap()
}

async fn patient(market: &Marketplace, email: &str, balance: &str) -> User {
    let user = market
        .register(Registration {
            name: "Ahmed Al-Sayed".to_string(),
            email: email.to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let amount = Money::parse(balance).unwrap();
    if amount.is_positive() {
        market.deposit(&user.id, amount).await.unwrap()
    } else {
        user
    }
}

async fn doctor(market: &Marketplace, admin: &User, email: &str, specialty: Specialty) -> User {
    let user = market
        .register(Registration {
            name: format!("Dr. {}", email),
            email: email.to_string(),
            role: Some(Role::Doctor),
            specialty: Some(specialty),
            ..Default::default()
        })
        .await
        .unwrap();
    market.approve(&admin.id, &user.id, true).await.unwrap()
}

fn new_case(specialty: Specialty) -> NewCase {
    NewCase {
        specialty,
        symptoms: "Recurring chest pain after exercise".to_string(),
        doctor_id: None,
    }
}

fn opinion(decision: Decision) -> OpinionSubmission {
    OpinionSubmission {
        decision,
        notes: "Reviewed the history".to_string(),
        is_rare: false,
    }
}

async fn balance(market: &Marketplace, user_id: &UserId) -> Money {
    market.get_user(user_id, user_id).await.unwrap().wallet_balance
}

// =============================================================================
// Registry
// =============================================================================

mod registry {
    use super::*;

    #[tokio::test]
    async fn test_doctor_waits_for_approval() {
        let market = market().await;
        let admin = admin(&market).await;
        let pending = market
            .register(Registration {
                name: "Dr. Sarah Smith".to_string(),
                email: "sarah@clinic.com".to_string(),
                role: Some(Role::Doctor),
                specialty: Some(Specialty::Cardiology),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!pending.is_approved);

        let err = market.available_cases(&pending.id).await.unwrap_err();
        assert!(matches!(err, MarketError::NotApproved { .. }));

        market.approve(&admin.id, &pending.id, true).await.unwrap();
        assert!(market.available_cases(&pending.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_email_is_unique_ignoring_case() {
        let market = market().await;
        patient(&market, "ahmed@mail.com", "0").await;
        let err = market
            .register(Registration {
                name: "Someone Else".to_string(),
                email: "  AHMED@mail.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::EmailTaken { .. }));
    }

    #[tokio::test]
    async fn test_admin_cannot_self_register() {
        let market = market().await;
        let err = market
            .register(Registration {
                name: "Mallory".to_string(),
                email: "mallory@mail.com".to_string(),
                role: Some(Role::Admin),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidInput(_)));

        admin(&market).await;
        let err = market
            .bootstrap_admin("Second", "second@2ndopinion.com")
            .await
            .unwrap_err();
        assert_eq!(err, MarketError::AdminExists);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let market = market().await;
        let user = patient(&market, "ahmed@mail.com", "0").await;

        let err = market
            .authenticate(&StaticIdentity::anonymous())
            .await
            .unwrap_err();
        assert_eq!(err, MarketError::Unauthenticated);

        let err = market
            .authenticate(&StaticIdentity::signed_in(user.id.clone(), Role::Doctor))
            .await
            .unwrap_err();
        assert_eq!(err, MarketError::Unauthenticated);

        let found = market
            .authenticate(&StaticIdentity::signed_in(user.id.clone(), Role::Patient))
            .await
            .unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_profile_update_is_self_or_admin() {
        let market = market().await;
        let admin = admin(&market).await;
        let ahmed = patient(&market, "ahmed@mail.com", "0").await;
        let other = patient(&market, "other@mail.com", "0").await;
        let update = secondop_types::ProfileUpdate {
            name: Some("Ahmed S.".to_string()),
            ..Default::default()
        };

        let err = market
            .update_profile(&other.id, &ahmed.id, update.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::NotAnAdmin { .. }));

        let updated = market
            .update_profile(&ahmed.id, &ahmed.id, update.clone())
            .await
            .unwrap();
        assert_eq!(updated.name, "Ahmed S.");
        market.update_profile(&admin.id, &ahmed.id, update).await.unwrap();

        let err = market
            .update_profile(&ahmed.id, &ahmed.id, Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_doctor_directory_lists_approved_only() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        doctor(&market, &admin, "karim@hospital.ae", Specialty::Dermatology).await;
        market
            .register(Registration {
                name: "Dr. Pending".to_string(),
                email: "pending@clinic.com".to_string(),
                role: Some(Role::Doctor),
                specialty: Some(Specialty::Cardiology),
                ..Default::default()
            })
            .await
            .unwrap();

        let search = DoctorSearch {
            specialty: Some(Specialty::Cardiology),
            ..Default::default()
        };
        let found = market.find_doctors(&search).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, sarah.id);
        assert_eq!(market.find_doctors(&DoctorSearch::default()).await.unwrap().len(), 2);
    }
}

// =============================================================================
// Wallet and ledger
// =============================================================================

mod wallet {
    use super::*;

    #[tokio::test]
    async fn test_deposit_and_withdraw() {
        let market = market().await;
        let user = patient(&market, "ahmed@mail.com", "100").await;
        assert_eq!(user.wallet_balance, Money::from_cents(10000));

        let err = market
            .withdraw(&user.id, Money::from_cents(10001))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InsufficientFunds { .. }));

        let after = market.withdraw(&user.id, Money::from_cents(2500)).await.unwrap();
        assert_eq!(after.wallet_balance, Money::from_cents(7500));

        let entries = market.transactions(&user.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        let withdrawal = &entries[0];
        assert_eq!(withdrawal.kind, TransactionKind::Payout);
        assert_eq!(withdrawal.amount, -Money::from_cents(2500));
        assert!(withdrawal.case_id.is_none());
    }

    #[tokio::test]
    async fn test_non_positive_amounts_rejected() {
        let market = market().await;
        let user = patient(&market, "ahmed@mail.com", "0").await;
        for amount in [Money::ZERO, -Money::from_cents(500)] {
            let err = market.deposit(&user.id, amount).await.unwrap_err();
            assert!(matches!(err, MarketError::InvalidAmount(_)));
            let err = market.withdraw(&user.id, amount).await.unwrap_err();
            assert!(matches!(err, MarketError::InvalidAmount(_)));
        }
        assert!(market.transactions(&user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deposit_beyond_ceiling_rejected() {
        let market = market().await;
        let user = patient(&market, "ahmed@mail.com", "999999999999").await;

        let err = market
            .deposit(&user.id, Money::from_cents(1))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidAmount(_)));
        assert!(Money::parse("70000000000000000000000000000").is_err());

        assert_eq!(
            balance(&market, &user.id).await,
            Money::parse("999999999999.00").unwrap()
        );
        assert_eq!(market.transactions(&user.id).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_returned_balance_includes_concurrent_deposits() {
        let market = Arc::new(market().await);
        let user = patient(&market, "ahmed@mail.com", "0").await;

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let market = market.clone();
                let user_id = user.id.clone();
                tokio::spawn(async move { market.deposit(&user_id, Money::from_cents(100)).await })
            })
            .collect();
        let returned: Vec<Money> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap().wallet_balance)
            .collect();

        let stored = balance(&market, &user.id).await;
        assert_eq!(stored, Money::from_cents(1600));
        assert_eq!(returned.iter().max(), Some(&stored));
    }

    #[tokio::test]
    async fn test_patient_sees_only_own_entries() {
        let market = market().await;
        let admin = admin(&market).await;
        let a = patient(&market, "a@mail.com", "50").await;
        patient(&market, "b@mail.com", "70").await;

        let own = market.transactions(&a.id).await.unwrap();
        assert!(own.iter().all(|t| t.user_id == a.id));
        assert_eq!(market.transactions(&admin.id).await.unwrap().len(), 2);
    }
}

// =============================================================================
// Case lifecycle
// =============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_end_to_end() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "100").await;

        let case = market
            .create_case(&ahmed.id, new_case(Specialty::Cardiology))
            .await
            .unwrap();
        assert_eq!(case.status, CaseStatus::Open);
        assert_eq!(balance(&market, &ahmed.id).await, Money::from_cents(6000));
        let fees: Vec<_> = market
            .transactions(&ahmed.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.kind == TransactionKind::CaseFee)
            .collect();
        assert_eq!(fees.len(), 1);
        assert_eq!(fees[0].amount, -Money::from_cents(4000));
        assert_eq!(fees[0].case_id.as_ref(), Some(&case.id));

        let available = market.available_cases(&sarah.id).await.unwrap();
        assert_eq!(available.len(), 1);

        let closed = market
            .submit_opinion(&sarah.id, &case.id, opinion(Decision::Agree))
            .await
            .unwrap();
        assert_eq!(closed.status, CaseStatus::Closed);
        assert_eq!(closed.assigned_doctor_id.as_ref(), Some(&sarah.id));
        assert_eq!(balance(&market, &sarah.id).await, Money::from_cents(2800));
        let payouts = market.transactions(&sarah.id).await.unwrap();
        assert_eq!(payouts.len(), 1);
        assert_eq!(payouts[0].kind, TransactionKind::Payout);
        assert_eq!(payouts[0].amount, Money::from_cents(2800));
        assert_eq!(payouts[0].case_id.as_ref(), Some(&case.id));

        market
            .rate_doctor(&ahmed.id, &case.id, 5, Some("Very thorough".to_string()))
            .await
            .unwrap();

        let profile = market
            .get_user(&ahmed.id, &sarah.id)
            .await
            .unwrap()
            .doctor
            .unwrap();
        assert_eq!(profile.cases_closed, 1);
        assert_eq!(profile.bonus_points, 5);
        assert_eq!(profile.rating, dec!(5.0));

        let board = market.leaderboard(10).await.unwrap();
        assert_eq!(board[0].user_id, sarah.id);
        assert_eq!(board[0].rank_score, 15);

        assert!(market.audit_balances(&admin.id).await.unwrap().is_empty());
        assert!(market.available_cases(&sarah.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disagree_pays_exact_payout() {
        let market = market().await;
        let admin = admin(&market).await;
        let omar = doctor(&market, &admin, "omar@clinic.com", Specialty::Neurology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "100").await;
        let case = market
            .create_case(&ahmed.id, new_case(Specialty::Neurology))
            .await
            .unwrap();

        let before = market.get_user(&omar.id, &omar.id).await.unwrap();
        let closed = market
            .submit_opinion(&omar.id, &case.id, opinion(Decision::Disagree))
            .await
            .unwrap();
        assert_eq!(closed.status, CaseStatus::Closed);

        let after = market.get_user(&omar.id, &omar.id).await.unwrap();
        assert_eq!(
            after.wallet_balance,
            before.wallet_balance + Money::from_cents(2800)
        );
        assert_eq!(
            after.doctor.as_ref().unwrap().cases_closed,
            before.doctor.as_ref().unwrap().cases_closed + 1
        );

        let entries = market.transactions(&omar.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, TransactionKind::Payout);
        assert_eq!(entries[0].amount, Money::from_cents(2800));
        assert_eq!(entries[0].case_id.as_ref(), Some(&case.id));
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_nothing_behind() {
        let market = market().await;
        let admin = admin(&market).await;
        let ahmed = patient(&market, "ahmed@mail.com", "30").await;

        let err = market
            .create_case(&ahmed.id, new_case(Specialty::Cardiology))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MarketError::InsufficientFunds { requested, available, .. }
                if requested == Money::from_cents(4000) && available == Money::from_cents(3000)
        ));

        assert_eq!(balance(&market, &ahmed.id).await, Money::from_cents(3000));
        assert!(market.my_cases(&ahmed.id).await.unwrap().is_empty());
        let entries = market.transactions(&ahmed.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, TransactionKind::Deposit);
        assert!(market
            .all_cases(&admin.id, &CaseFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_fee_and_case_commit_together() {
        let market = market().await;
        let ahmed = patient(&market, "ahmed@mail.com", "40").await;

        let case = market
            .create_case(&ahmed.id, new_case(Specialty::Neurology))
            .await
            .unwrap();
        assert_eq!(balance(&market, &ahmed.id).await, Money::ZERO);

        let fee = market
            .transactions(&ahmed.id)
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.kind == TransactionKind::CaseFee)
            .unwrap();
        assert_eq!(fee.amount, -Money::from_cents(4000));
        assert_eq!(fee.case_id.as_ref(), Some(&case.id));
    }

    #[tokio::test]
    async fn test_more_tests_is_unpaid_and_terminal() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "100").await;
        let case = market
            .create_case(&ahmed.id, new_case(Specialty::Cardiology))
            .await
            .unwrap();

        let pending = market
            .submit_opinion(&sarah.id, &case.id, opinion(Decision::MoreTests))
            .await
            .unwrap();
        assert_eq!(pending.status, CaseStatus::PendingInfo);
        assert_eq!(balance(&market, &sarah.id).await, Money::ZERO);
        assert_eq!(balance(&market, &ahmed.id).await, Money::from_cents(6000));

        let err = market
            .submit_opinion(&sarah.id, &case.id, opinion(Decision::Agree))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::CaseNotOpen { .. }));

        let err = market
            .rate_doctor(&ahmed.id, &case.id, 4, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::CaseNotClosed { .. }));

        let profile = market.get_user(&sarah.id, &sarah.id).await.unwrap().doctor.unwrap();
        assert_eq!(profile.cases_closed, 0);
    }

    #[tokio::test]
    async fn test_only_patients_create_cases() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        market.deposit(&sarah.id, Money::from_cents(10000)).await.unwrap();

        let err = market
            .create_case(&sarah.id, new_case(Specialty::Cardiology))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::NotAPatient { .. }));
    }

    #[tokio::test]
    async fn test_blank_symptoms_rejected() {
        let market = market().await;
        let ahmed = patient(&market, "ahmed@mail.com", "100").await;
        let err = market
            .create_case(
                &ahmed.id,
                NewCase {
                    symptoms: "   ".to_string(),
                    ..new_case(Specialty::Cardiology)
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidInput(_)));
        assert_eq!(balance(&market, &ahmed.id).await, Money::from_cents(10000));
    }

    #[tokio::test]
    async fn test_case_visibility() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let karim = doctor(&market, &admin, "karim@hospital.ae", Specialty::Dermatology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "100").await;
        let other = patient(&market, "other@mail.com", "0").await;
        let case = market
            .create_case(&ahmed.id, new_case(Specialty::Cardiology))
            .await
            .unwrap();

        assert!(market.get_case(&ahmed.id, &case.id).await.is_ok());
        assert!(market.get_case(&sarah.id, &case.id).await.is_ok());
        assert!(market.get_case(&admin.id, &case.id).await.is_ok());
        assert!(market.get_case(&karim.id, &case.id).await.is_err());
        assert!(market.get_case(&other.id, &case.id).await.is_err());
    }

    #[tokio::test]
    async fn test_admin_case_filter() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "200").await;
        let first = market
            .create_case(&ahmed.id, new_case(Specialty::Cardiology))
            .await
            .unwrap();
        market
            .create_case(&ahmed.id, new_case(Specialty::Cardiology))
            .await
            .unwrap();
        market
            .submit_opinion(&sarah.id, &first.id, opinion(Decision::Disagree))
            .await
            .unwrap();

        let closed = market
            .all_cases(
                &admin.id,
                &CaseFilter {
                    status: Some(CaseStatus::Closed),
                    search: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].id, first.id);

        let by_name = market
            .all_cases(
                &admin.id,
                &CaseFilter {
                    status: None,
                    search: Some("al-sayed".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(by_name.len(), 2);
    }
}

// =============================================================================
// Matching and direct requests
// =============================================================================

mod matching {
    use super::*;

    #[tokio::test]
    async fn test_direct_request_only_reaches_its_doctor() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let karim = doctor(&market, &admin, "karim@hospital.ae", Specialty::Dermatology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "100").await;

        let case = market
            .create_case(
                &ahmed.id,
                NewCase {
                    doctor_id: Some(sarah.id.clone()),
                    ..new_case(Specialty::Dermatology)
                },
            )
            .await
            .unwrap();
        assert_eq!(case.assigned_doctor_id.as_ref(), Some(&sarah.id));

        let for_sarah = market.available_cases(&sarah.id).await.unwrap();
        assert_eq!(for_sarah.len(), 1);
        assert!(market.available_cases(&karim.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_direct_request_to_non_doctor_rejected() {
        let market = market().await;
        let ahmed = patient(&market, "ahmed@mail.com", "100").await;
        let other = patient(&market, "other@mail.com", "0").await;

        let err = market
            .create_case(
                &ahmed.id,
                NewCase {
                    doctor_id: Some(other.id.clone()),
                    ..new_case(Specialty::Cardiology)
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::NotADoctor { .. }));
        assert_eq!(balance(&market, &ahmed.id).await, Money::from_cents(10000));
    }

    #[tokio::test]
    async fn test_deleting_doctor_releases_direct_requests() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let karim = doctor(&market, &admin, "karim@hospital.ae", Specialty::Dermatology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "100").await;
        let case = market
            .create_case(
                &ahmed.id,
                NewCase {
                    doctor_id: Some(sarah.id.clone()),
                    ..new_case(Specialty::Dermatology)
                },
            )
            .await
            .unwrap();

        market.delete_user(&admin.id, &sarah.id).await.unwrap();

        let for_karim = market.available_cases(&karim.id).await.unwrap();
        assert_eq!(for_karim.len(), 1);
        assert_eq!(for_karim[0].id, case.id);
        assert!(for_karim[0].assigned_doctor_id.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_opinions_pay_once() {
        let market = Arc::new(market().await);
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let omar = doctor(&market, &admin, "omar@clinic.com", Specialty::Cardiology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "100").await;
        let case = market
            .create_case(&ahmed.id, new_case(Specialty::Cardiology))
            .await
            .unwrap();

        let tasks: Vec<_> = [sarah.id.clone(), omar.id.clone()]
            .into_iter()
            .map(|doctor_id| {
                let market = market.clone();
                let case_id = case.id.clone();
                tokio::spawn(async move {
                    market
                        .submit_opinion(&doctor_id, &case_id, opinion(Decision::Agree))
                        .await
                })
            })
            .collect();
        let results: Vec<_> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(
                err,
                MarketError::ConcurrentModification { .. } | MarketError::CaseNotOpen { .. }
            ));
        }

        let paid = balance(&market, &sarah.id).await + balance(&market, &omar.id).await;
        assert_eq!(paid, Money::from_cents(2800));
        assert!(market.audit_balances(&admin.id).await.unwrap().is_empty());
    }
}

// =============================================================================
// Reputation
// =============================================================================

mod reputation {
    use super::*;

    async fn closed_case(
        market: &Marketplace,
        patient: &User,
        doctor: &User,
    ) -> secondop_types::CaseId {
        let case = market
            .create_case(&patient.id, new_case(Specialty::Cardiology))
            .await
            .unwrap();
        market
            .submit_opinion(&doctor.id, &case.id, opinion(Decision::Agree))
            .await
            .unwrap();
        case.id
    }

    #[tokio::test]
    async fn test_rating_mean_and_bonus() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "200").await;

        for stars in [5, 3, 5] {
            let case_id = closed_case(&market, &ahmed, &sarah).await;
            market.rate_doctor(&ahmed.id, &case_id, stars, None).await.unwrap();
        }

        let profile = market.get_user(&sarah.id, &sarah.id).await.unwrap().doctor.unwrap();
        assert_eq!(profile.rating, dec!(4.3));
        assert_eq!(profile.bonus_points, 10);
        assert_eq!(profile.cases_closed, 3);
    }

    #[tokio::test]
    async fn test_rating_ignores_pending_and_unrated_cases() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "200").await;

        let pending = market
            .create_case(&ahmed.id, new_case(Specialty::Cardiology))
            .await
            .unwrap();
        market
            .submit_opinion(&sarah.id, &pending.id, opinion(Decision::MoreTests))
            .await
            .unwrap();
        closed_case(&market, &ahmed, &sarah).await;
        let rated = closed_case(&market, &ahmed, &sarah).await;

        market.rate_doctor(&ahmed.id, &rated, 4, None).await.unwrap();

        let profile = market.get_user(&sarah.id, &sarah.id).await.unwrap().doctor.unwrap();
        assert_eq!(profile.rating, dec!(4.0));
        assert_eq!(profile.bonus_points, 0);
        assert_eq!(profile.cases_closed, 2);

        let err = market.rate_doctor(&ahmed.id, &pending.id, 5, None).await.unwrap_err();
        assert!(matches!(err, MarketError::CaseNotClosed { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ratings_through_separate_instances_both_count() {
        let store = Arc::new(LocalStore::new());
        let first = Arc::new(
            Marketplace::new(
                Session::attach(store.clone()).await.unwrap(),
                Default::default(),
                Arc::new(DisabledAssist),
            )
            .unwrap(),
        );
        let second = Arc::new(
            Marketplace::new(
                Session::attach(store).await.unwrap(),
                Default::default(),
                Arc::new(DisabledAssist),
            )
            .unwrap(),
        );
        let admin = admin(&first).await;
        let sarah = doctor(&first, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let ahmed = patient(&first, "ahmed@mail.com", "100").await;
        let a = closed_case(&first, &ahmed, &sarah).await;
        let b = closed_case(&first, &ahmed, &sarah).await;

        let tasks = [(first.clone(), a, 5u8), (second.clone(), b, 3u8)]
            .into_iter()
            .map(|(market, case_id, stars)| {
                let patient_id = ahmed.id.clone();
                tokio::spawn(async move {
                    market.rate_doctor(&patient_id, &case_id, stars, None).await
                })
            });
        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let profile = second.get_user(&sarah.id, &sarah.id).await.unwrap().doctor.unwrap();
        assert_eq!(profile.rating, dec!(4.0));
        assert_eq!(profile.bonus_points, 5);
    }

    #[tokio::test]
    async fn test_case_rated_once() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "100").await;
        let case_id = closed_case(&market, &ahmed, &sarah).await;

        market.rate_doctor(&ahmed.id, &case_id, 5, None).await.unwrap();
        let err = market.rate_doctor(&ahmed.id, &case_id, 1, None).await.unwrap_err();
        assert!(matches!(err, MarketError::AlreadyRated { .. }));

        let profile = market.get_user(&sarah.id, &sarah.id).await.unwrap().doctor.unwrap();
        assert_eq!(profile.rating, dec!(5.0));
        assert_eq!(profile.bonus_points, 5);
    }

    #[tokio::test]
    async fn test_rating_checks_owner_and_range() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "100").await;
        let other = patient(&market, "other@mail.com", "0").await;
        let case_id = closed_case(&market, &ahmed, &sarah).await;

        let err = market.rate_doctor(&other.id, &case_id, 5, None).await.unwrap_err();
        assert!(matches!(err, MarketError::NotCaseOwner { .. }));

        for stars in [0, 6] {
            let err = market
                .rate_doctor(&ahmed.id, &case_id, stars, None)
                .await
                .unwrap_err();
            assert!(matches!(err, MarketError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn test_standing_reports_gap() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let omar = doctor(&market, &admin, "omar@clinic.com", Specialty::Cardiology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "200").await;

        let case_id = closed_case(&market, &ahmed, &sarah).await;
        market.rate_doctor(&ahmed.id, &case_id, 5, None).await.unwrap();

        let leader = market.standing(&sarah.id).await.unwrap();
        assert_eq!(leader.entry.rank, 1);
        assert_eq!(leader.points_to_next, None);

        let chaser = market.standing(&omar.id).await.unwrap();
        assert_eq!(chaser.entry.rank, 2);
        assert_eq!(chaser.points_to_next, Some(16));
    }
}

// =============================================================================
// Platform
// =============================================================================

mod platform {
    use super::*;

    #[tokio::test]
    async fn test_commission_booked_to_platform_account() {
        let store = Arc::new(LocalStore::new());
        let bootstrap = Marketplace::new(
            Session::attach(store.clone()).await.unwrap(),
            Default::default(),
            Arc::new(DisabledAssist),
        )
        .unwrap();
        let admin = admin(&bootstrap).await;

        let market = Marketplace::new(
            Session::attach(store).await.unwrap(),
            MarketplaceConfig {
                platform_account: Some(admin.id.clone()),
                ..Default::default()
            },
            Arc::new(DisabledAssist),
        )
        .unwrap();
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "100").await;
        let case = market
            .create_case(&ahmed.id, new_case(Specialty::Cardiology))
            .await
            .unwrap();
        market
            .submit_opinion(&sarah.id, &case.id, opinion(Decision::Agree))
            .await
            .unwrap();

        assert_eq!(balance(&market, &admin.id).await, Money::from_cents(1200));
        let commission = market
            .transactions(&admin.id)
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.kind == TransactionKind::Commission)
            .unwrap();
        assert_eq!(commission.case_id.as_ref(), Some(&case.id));

        let stats = market.platform_stats(&admin.id).await.unwrap();
        assert_eq!(stats.commissions_booked, Money::from_cents(1200));
        assert!(market.audit_balances(&admin.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_platform_stats_and_audit() {
        let market = market().await;
        let admin = admin(&market).await;
        let sarah = doctor(&market, &admin, "sarah@clinic.com", Specialty::Cardiology).await;
        let ahmed = patient(&market, "ahmed@mail.com", "200").await;

        for decision in [Decision::Agree, Decision::MoreTests] {
            let case = market
                .create_case(&ahmed.id, new_case(Specialty::Cardiology))
                .await
                .unwrap();
            market
                .submit_opinion(&sarah.id, &case.id, opinion(decision))
                .await
                .unwrap();
        }

        let stats = market.platform_stats(&admin.id).await.unwrap();
        assert_eq!(stats.gross_revenue, Money::from_cents(8000));
        assert_eq!(stats.platform_margin, Money::from_cents(2400));
        assert_eq!(stats.doctor_payouts, Money::from_cents(2800));
        assert_eq!(stats.total_deposits, Money::from_cents(20000));
        assert_eq!(stats.total_cases, 2);

        assert!(market.audit_balances(&admin.id).await.unwrap().is_empty());

        let err = market.platform_stats(&ahmed.id).await.unwrap_err();
        assert!(matches!(err, MarketError::NotAnAdmin { .. }));
    }

    #[tokio::test]
    async fn test_backend_reported_without_store_access() {
        let market = market().await;
        assert_eq!(market.backend(), Backend::Local);
        assert!(market.health().await.unwrap());
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let market = market().await;
        let admin = admin(&market).await;
        let err = market.delete_user(&admin.id, &admin.id).await.unwrap_err();
        assert!(matches!(err, MarketError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_locale_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::Local(LocalConfig {
            snapshot_path: Some(dir.path().join("secondop.json")),
            seed_demo: false,
        });

        let market = Marketplace::open(&config, Default::default(), Arc::new(DisabledAssist))
            .await
            .unwrap();
        assert_eq!(market.locale(), Locale::En);
        assert_eq!(market.toggle_locale().await.unwrap(), Locale::Ar);
        market.shutdown().await.unwrap();
        drop(market);

        let reopened = Marketplace::open(&config, Default::default(), Arc::new(DisabledAssist))
            .await
            .unwrap();
        assert_eq!(reopened.locale(), Locale::Ar);
    }

    #[tokio::test]
    async fn test_assist_degrades_when_disabled() {
        let market = market().await;
        assert_eq!(market.refine_symptoms("chest pain").await, "chest pain");
    }
}
