//! Repository implementations
//!
//! Reads go through the pool. Writes are associated functions taking a
//! connection so `PgStore::commit` can run a whole batch in one transaction.

mod user;
mod case;
mod transaction;
mod setting;

pub use user::UserRepo;
pub use case::CaseRepo;
pub use transaction::TransactionRepo;
pub use setting::SettingRepo;
