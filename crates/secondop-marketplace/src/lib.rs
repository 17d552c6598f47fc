//! Second Opinion Marketplace - the transactional core
//!
//! Patients pay a fixed fee to open a case; doctors in the matching specialty
//! (or the one doctor a case was addressed to) answer it and are paid a fixed
//! payout; patients rate the answer and the rating feeds a public leaderboard.
//!
//! # Architecture
//!
//! ```text
//! caller -> Marketplace (facade)
//!              |-- registry   accounts, approval, profiles
//!              |-- ledger     wallet postings, one entry per balance change
//!              |-- cases      Open -> Closed | PendingInfo
//!              |-- matching   which open cases a doctor may answer
//!              |-- rating     mean rating, five-star bonus
//!              `-- Session -> Store (LocalStore | PgStore)
//! ```
//!
//! Every facade operation stages its changes into one `WriteBatch` and
//! commits it as a unit. Wallet balances always equal opening balance plus
//! the sum of that user's ledger entries.

mod cases;
mod ledger;
mod registry;

pub mod config;
pub mod identity;
pub mod leaderboard;
pub mod marketplace;
pub mod matching;
pub mod rating;
pub mod requests;
pub mod session;
pub mod stats;

pub use config::{MarketplaceConfig, Pricing};
pub use identity::{Identity, IdentityGateway, StaticIdentity};
pub use leaderboard::{Leaderboard, LeaderboardEntry, Standing};
pub use marketplace::Marketplace;
pub use requests::{CaseFilter, DoctorSearch, NewCase, OpinionSubmission};
pub use session::Session;
pub use stats::{BalanceDiscrepancy, DoctorPerformance, PlatformStats};
