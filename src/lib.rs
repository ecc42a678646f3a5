//! Warden: the security core of an agent-governed reserve program.
//!
//! Three components guard every state transition the program accepts:
//! - [`auth`]: Ed25519 verification of agent actions over a canonical,
//!   versioned message, with a replay window and a per-agent nonce.
//! - [`math`]: integer-only fixed-point arithmetic, including the quadratic
//!   voting power computation every node must agree on bit for bit.
//! - [`guard`]: a scoped reentrancy lock bound to persisted vault state.
//!
//! State never lives in globals: every record enters and leaves through
//! explicit parameters, and the enclosing runtime owns commit/rollback.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod layout;
pub mod logging;

pub mod auth;
pub mod guard;
pub mod math;
