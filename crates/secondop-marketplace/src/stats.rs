//! Admin reporting: platform statistics and the balance audit

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use secondop_types::{
    platform_share, Case, CaseStatus, Money, Role, Specialty, Transaction, TransactionKind, User,
    UserId,
};

use crate::ledger;

/// Per-doctor performance line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorPerformance {
    pub user_id: UserId,
    pub name: String,
    pub specialty: Specialty,
    pub is_approved: bool,
    pub cases_closed: u32,
    pub rating: Decimal,
    /// Sum of case payouts received
    pub earnings: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformStats {
    /// Sum of all case fees charged
    pub gross_revenue: Money,
    /// Platform share of gross revenue
    pub platform_margin: Money,
    /// Sum of case payouts to doctors
    pub doctor_payouts: Money,
    /// Sum of commission entries actually booked
    pub commissions_booked: Money,
    /// Sum of wallet top-ups
    pub total_deposits: Money,
    /// Sum of withdrawals (positive)
    pub total_withdrawals: Money,
    pub total_cases: usize,
    pub cases_by_status: BTreeMap<CaseStatus, usize>,
    pub cases_by_specialty: BTreeMap<Specialty, usize>,
    pub users_by_role: BTreeMap<String, usize>,
    pub pending_doctor_approvals: usize,
    /// Most cases closed first
    pub doctors: Vec<DoctorPerformance>,
}

fn sum_where(entries: &[Transaction], pred: impl Fn(&Transaction) -> bool) -> Money {
    entries.iter().filter(|t| pred(t)).map(|t| t.amount).sum()
}

impl PlatformStats {
    pub fn compute(users: &[User], cases: &[Case], entries: &[Transaction]) -> Self {
        let gross_revenue =
            sum_where(entries, |t| t.kind == TransactionKind::CaseFee).abs();
        let doctor_payouts = sum_where(entries, |t| {
            t.kind == TransactionKind::Payout && t.case_id.is_some()
        });
        let commissions_booked = sum_where(entries, |t| t.kind == TransactionKind::Commission);
        let total_deposits = sum_where(entries, |t| t.kind == TransactionKind::Deposit);
        let total_withdrawals = sum_where(entries, |t| {
            t.kind == TransactionKind::Payout && t.case_id.is_none()
        })
        .abs();

        let mut cases_by_status = BTreeMap::new();
        let mut cases_by_specialty = BTreeMap::new();
        for case in cases {
            *cases_by_status.entry(case.status).or_insert(0) += 1;
            *cases_by_specialty.entry(case.specialty).or_insert(0) += 1;
        }

        let mut users_by_role = BTreeMap::new();
        for role in [Role::Patient, Role::Doctor, Role::Admin] {
            users_by_role.insert(
                role.as_str().to_string(),
                users.iter().filter(|u| u.role == role).count(),
            );
        }

        let mut doctors: Vec<DoctorPerformance> = users
            .iter()
            .filter_map(|u| {
                let profile = u.doctor.as_ref()?;
                Some(DoctorPerformance {
                    user_id: u.id.clone(),
                    name: u.name.clone(),
                    specialty: profile.specialty,
                    is_approved: u.is_approved,
                    cases_closed: profile.cases_closed,
                    rating: profile.rating,
                    earnings: sum_where(entries, |t| {
                        t.user_id == u.id
                            && t.kind == TransactionKind::Payout
                            && t.case_id.is_some()
                    }),
                })
            })
            .collect();
        doctors.sort_by(|a, b| b.cases_closed.cmp(&a.cases_closed));

        Self {
            gross_revenue,
            platform_margin: gross_revenue.mul_ratio(platform_share()),
            doctor_payouts,
            commissions_booked,
            total_deposits,
            total_withdrawals,
            total_cases: cases.len(),
            cases_by_status,
            cases_by_specialty,
            users_by_role,
            pending_doctor_approvals: users
                .iter()
                .filter(|u| u.is_doctor() && !u.is_approved)
                .count(),
            doctors,
        }
    }
}

/// A wallet that does not match its opening balance plus its entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceDiscrepancy {
    pub user_id: UserId,
    pub name: String,
    pub wallet_balance: Money,
    pub expected_balance: Money,
}

/// Every user whose wallet does not reconcile with the ledger
pub fn audit_balances(users: &[User], entries: &[Transaction]) -> Vec<BalanceDiscrepancy> {
    users
        .iter()
        .filter_map(|u| {
            let expected = u.opening_balance + ledger::net_for(&u.id, entries);
            (expected != u.wallet_balance).then(|| BalanceDiscrepancy {
                user_id: u.id.clone(),
                name: u.name.clone(),
                wallet_balance: u.wallet_balance,
                expected_balance: expected,
            })
        })
        .collect()
}
