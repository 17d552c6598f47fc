//! Second Opinion Assist - best-effort text assistance
//!
//! Two operations, both non-authoritative:
//!
//! - `refine(text)`: rewrite a patient's symptom description into clearer
//!   clinical language. Any failure returns the input unchanged.
//! - `analyze(case)`: a short pre-analysis for the reviewing doctor. Any
//!   failure returns a generic notice.
//!
//! Nothing here can fail a marketplace operation; errors are logged and
//! swallowed at the trait boundary.

pub mod config;
pub mod providers;
pub mod types;

pub use config::AssistConfig;
pub use providers::*;
pub use types::*;
