//! Integration tests for `src/guard.rs`.

#[path = "guard/guard_test.rs"]
mod guard_test;
