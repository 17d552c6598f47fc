//! API Handlers
//!
//! Each module handles a specific area of the marketplace.

pub mod health;
pub mod users;
pub mod wallet;
pub mod cases;
pub mod platform;

pub use health::*;
