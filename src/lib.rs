//! Seqport - camera sequence export orchestration
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod dedupe;
pub mod discovery;
pub mod export;
pub mod inventory;
pub mod reconcile;
pub mod summary;
