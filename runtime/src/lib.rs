//! Warden runtime: executes signed agent actions against account state.
//!
//! Holds program accounts in an address-keyed store, applies each
//! instruction as an all-or-nothing transaction, and persists the store to
//! SQLite between invocations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Address derivation and the in-memory account store.
pub mod accounts;
/// SQLite persistence for the account store.
pub mod db;
/// Program error type with stable codes.
pub mod error;
/// Instruction handlers and the program entry point.
pub mod instructions;
/// Persisted record types.
pub mod state;
/// All-or-nothing instruction execution.
pub mod transaction;

pub use error::ProgramError;
pub use instructions::{Outcome, Program};
