//! Ledger subscription and projection pipeline.
//!
//! Holds one WebSocket subscription to a ledger gateway for a single
//! marketplace contract, normalizes the contract's job events, and
//! projects them onto the persisted job store with idempotent
//! merge-updates. The supervisor keeps the subscription alive across
//! connection drops; already-applied state is never reprocessed.

pub mod client;
pub mod config;
pub mod events;
pub mod manager;
pub mod messages;
pub mod normalize;
pub mod persistence;
pub mod processor;
pub mod projector;
pub mod reconnect;
pub mod store;
