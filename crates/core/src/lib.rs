//! Shared domain types for the gridmart platform.
//!
//! Kept free of I/O so every other crate (store, ledger pipeline, API)
//! can depend on it without pulling in a runtime.

pub mod amount;
pub mod error;
pub mod types;
