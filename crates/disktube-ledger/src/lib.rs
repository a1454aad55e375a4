//! Persisted completion ledger.
//!
//! This crate provides the durable filename → transfer-record mapping
//! that makes repeated runs idempotent:
//! - Tolerant loading (absent or corrupt state is treated as empty)
//! - Load-merge-write updates with atomic file replacement

pub mod error;
pub mod ledger;

pub use error::{LedgerError, LedgerResult};
pub use ledger::Ledger;
