//! Second Opinion Types - canonical domain types for the second-opinion marketplace
//!
//! This crate contains the foundational types with zero dependencies on other
//! secondop crates:
//!
//! - Identity types (UserId, CaseId, TransactionId)
//! - `Money` with two-place decimal precision
//! - Users, doctor reputation and registration data
//! - Cases, opinions and the case status set
//! - Ledger transactions
//! - The doctor rating rule
//! - The caller-facing error taxonomy
//!
//! # Money flow
//!
//! ```text
//! Patient --CaseFee(-40.00)--> [escrow] --Payout(+28.00)--> Doctor
//!                                  \----Commission(+12.00)--> Platform
//! ```

pub mod identity;
pub mod money;
pub mod user;
pub mod case;
pub mod transaction;
pub mod locale;
pub mod fees;
pub mod rating;
pub mod error;

pub use identity::*;
pub use money::*;
pub use user::*;
pub use case::*;
pub use transaction::*;
pub use locale::*;
pub use fees::*;
pub use rating::{doctor_rating, mean_rating};
pub use error::*;

/// Version of the marketplace types schema
pub const TYPES_VERSION: &str = "0.1.0";
