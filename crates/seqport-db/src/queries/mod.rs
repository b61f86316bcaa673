//! Database query modules.
//!
//! - status: per-channel status tables (discovery reads, reconciliation upserts)
//! - inventory: export count and representative path per channel

pub mod inventory;
pub mod status;
