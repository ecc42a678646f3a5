//! All-or-nothing execution of an instruction.
//!
//! A handler runs against a working copy of the store. The copy replaces
//! the committed store only when the handler returns `Ok`; on `Err` it is
//! dropped, taking every mutation with it, including a nonce advance made by
//! a successful authentication earlier in the same instruction.

use tracing::debug;

use crate::accounts::AccountStore;
use crate::error::ProgramError;

/// Run `body` as one transaction against `store`.
///
/// # Errors
///
/// Returns whatever `body` returns; `store` is unchanged in that case.
pub fn execute<R, F>(store: &mut AccountStore, body: F) -> Result<R, ProgramError>
where
    F: FnOnce(&mut AccountStore) -> Result<R, ProgramError>,
{
    let mut working = store.clone();
    match body(&mut working) {
        Ok(value) => {
            *store = working;
            Ok(value)
        }
        Err(e) => {
            debug!(code = e.code(), "transaction rolled back");
            Err(e)
        }
    }
}
