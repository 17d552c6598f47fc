//! Ledger postings
//!
//! Every posting stages exactly two mutations into the batch: the wallet
//! adjustment and the matching ledger entry, with the same signed amount.
//! Only the typed constructors below are exposed, so a deposit can never be
//! posted as a debit and a case fee can never lose its case.

use chrono::Utc;

use secondop_db::{Mutation, WriteBatch};
use secondop_types::{
    Case, CaseId, Money, Transaction, TransactionId, TransactionKind, User, UserId,
};

fn post(
    batch: &mut WriteBatch,
    user_id: &UserId,
    amount: Money,
    kind: TransactionKind,
    description: String,
    case_id: Option<CaseId>,
) -> Transaction {
    debug_assert!(
        kind.permits(amount, case_id.as_ref()),
        "{} entry of {} with case {:?}",
        kind,
        amount,
        case_id
    );

    let tx = Transaction {
        id: TransactionId::new(),
        user_id: user_id.clone(),
        amount,
        kind,
        description,
        case_id,
        created_at: Utc::now(),
    };
    batch.push(Mutation::AdjustWallet {
        user_id: user_id.clone(),
        delta: amount,
    });
    batch.push(Mutation::AppendTransaction(tx.clone()));
    tx
}

/// Credit a wallet top-up. `amount` must be positive.
pub(crate) fn deposit(batch: &mut WriteBatch, user_id: &UserId, amount: Money) -> Transaction {
    post(
        batch,
        user_id,
        amount.abs(),
        TransactionKind::Deposit,
        "Wallet Deposit".to_string(),
        None,
    )
}

/// Debit a withdrawal, recorded as a case-less payout.
pub(crate) fn withdrawal(batch: &mut WriteBatch, user_id: &UserId, amount: Money) -> Transaction {
    post(
        batch,
        user_id,
        -amount.abs(),
        TransactionKind::Payout,
        "Funds Withdrawal".to_string(),
        None,
    )
}

/// Debit the patient for a new case
pub(crate) fn case_fee(batch: &mut WriteBatch, patient: &User, case: &Case, fee: Money) -> Transaction {
    post(
        batch,
        &patient.id,
        -fee.abs(),
        TransactionKind::CaseFee,
        format!("Case Creation Fee: {}", case.specialty.display_name()),
        Some(case.id.clone()),
    )
}

/// Credit the doctor for a paid opinion
pub(crate) fn payout(batch: &mut WriteBatch, doctor_id: &UserId, case_id: &CaseId, amount: Money) -> Transaction {
    post(
        batch,
        doctor_id,
        amount.abs(),
        TransactionKind::Payout,
        format!("Payout for Case #{}", case_id),
        Some(case_id.clone()),
    )
}

/// Credit the platform account with the margin on a paid case
pub(crate) fn commission(
    batch: &mut WriteBatch,
    platform_id: &UserId,
    case_id: &CaseId,
    amount: Money,
) -> Transaction {
    post(
        batch,
        platform_id,
        amount.abs(),
        TransactionKind::Commission,
        format!("Platform Commission for Case #{}", case_id),
        Some(case_id.clone()),
    )
}

/// Sum of a user's entries
pub(crate) fn net_for(user_id: &UserId, entries: &[Transaction]) -> Money {
    entries
        .iter()
        .filter(|t| &t.user_id == user_id)
        .map(|t| t.amount)
        .sum()
}
