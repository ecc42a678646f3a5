//! Reentrancy protection for vault state.
//!
//! A vault embeds a [`VaultLock`] in its persisted record. Critical sections
//! run behind a [`ReentrancyGuard`], which sets the flag on construction and
//! clears it in `Drop`, so the flag is released on normal return, early
//! return, `?` propagation and unwinding alike.
//!
//! The guard hands out access to the protected state through `Deref`, so a
//! nested call made from inside the section sees `locked == true` and fails
//! with [`LockError::ReentrancyDetected`].
//!
//! Only same-program reentry is covered. A call into another program that
//! calls back through a different entry point and touches the vault without
//! taking this lock is not detected; that path stays a residual risk for the
//! handlers to avoid.

use std::ops::{Deref, DerefMut};

use serde::Serialize;
use tracing::{debug, warn};

use crate::layout::{LayoutError, RecordReader, RecordWriter};

/// Concurrency-safety failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    /// The vault is already inside a critical section.
    #[error("reentrancy detected")]
    ReentrancyDetected,
}

/// Lock flag embedded in persisted vault state. `false` at rest.
///
/// The flag has no setter. It changes only through [`acquire_lock`] and
/// [`release_lock`], and is otherwise rebuilt from its persisted byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VaultLock {
    locked: bool,
}

impl VaultLock {
    /// An unlocked flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the flag from its persisted byte.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] if the byte is missing or not a boolean.
    pub fn read(reader: &mut RecordReader<'_>) -> Result<Self, LayoutError> {
        Ok(Self {
            locked: reader.read_bool()?,
        })
    }

    /// Append the flag's persisted byte.
    pub fn write(&self, writer: &mut RecordWriter) {
        writer.put_bool(self.locked);
    }

    /// Whether a critical section is in flight.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

/// State that carries a [`VaultLock`].
pub trait Lockable {
    /// Shared access to the lock flag.
    fn vault_lock(&self) -> &VaultLock;

    /// Exclusive access to the lock flag.
    fn vault_lock_mut(&mut self) -> &mut VaultLock;
}

impl Lockable for VaultLock {
    fn vault_lock(&self) -> &VaultLock {
        self
    }

    fn vault_lock_mut(&mut self) -> &mut VaultLock {
        self
    }
}

/// Check-and-set the lock in one step.
///
/// # Errors
///
/// Returns [`LockError::ReentrancyDetected`] if the lock is already held.
pub fn acquire_lock(lock: &mut VaultLock) -> Result<(), LockError> {
    if lock.locked {
        warn!("reentrancy detected: vault lock already held");
        return Err(LockError::ReentrancyDetected);
    }
    lock.locked = true;
    debug!("vault lock acquired");
    Ok(())
}

/// Clear the lock unconditionally.
pub fn release_lock(lock: &mut VaultLock) {
    lock.locked = false;
    debug!("vault lock released");
}

/// Scoped ownership of a vault's lock.
///
/// Dropping the guard releases the lock.
#[derive(Debug)]
pub struct ReentrancyGuard<'a, T: Lockable + ?Sized> {
    state: &'a mut T,
}

impl<'a, T: Lockable + ?Sized> ReentrancyGuard<'a, T> {
    /// Acquire the lock on `state` for the lifetime of the guard.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::ReentrancyDetected`] if `state` is already locked.
    pub fn acquire(state: &'a mut T) -> Result<Self, LockError> {
        acquire_lock(state.vault_lock_mut())?;
        Ok(Self { state })
    }
}

impl<T: Lockable + ?Sized> Deref for ReentrancyGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.state
    }
}

impl<T: Lockable + ?Sized> DerefMut for ReentrancyGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut *self.state
    }
}

impl<T: Lockable + ?Sized> Drop for ReentrancyGuard<'_, T> {
    fn drop(&mut self) {
        release_lock(self.state.vault_lock_mut());
    }
}

/// Run `body` as a critical section on `state`.
///
/// The lock is released whatever `body` returns.
///
/// # Errors
///
/// Returns [`LockError::ReentrancyDetected`] (converted into `E`) if the lock
/// is held, otherwise whatever `body` returns.
pub fn with_lock<T, R, E, F>(state: &mut T, body: F) -> Result<R, E>
where
    T: Lockable + ?Sized,
    E: From<LockError>,
    F: FnOnce(&mut T) -> Result<R, E>,
{
    let mut guard = ReentrancyGuard::acquire(state)?;
    body(&mut *guard)
}
