//! ChainEase Payments
//!
//! A demo payments session that:
//! - Walks a transfer through input, AI safety review, and settlement
//! - Asks Gemini for an explainable review, falling back to a fixed result on any failure
//! - Keeps balance and ledger in memory, seeded with sample data
//! - Plays a scripted, purely presentational settlement sequence
//!
//! FLOW:
//! DASHBOARD → INPUT → SMART-CHECK → STATUS → DASHBOARD (HISTORY as a side branch)

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod gemini;
pub mod models;
pub mod sequencer;
pub mod session;
pub mod validation;
pub mod views;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use analysis::{Analysis, TransactionAnalyzer};
pub use session::{Effect, Intent, Session};
