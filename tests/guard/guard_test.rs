//! Reentrancy guard behaviour on every exit path.

use std::panic::{catch_unwind, AssertUnwindSafe};

use warden::guard::{
    acquire_lock, release_lock, with_lock, LockError, Lockable, ReentrancyGuard, VaultLock,
};
use warden::layout::RecordReader;

/// Minimal vault carrying a lock and a balance.
#[derive(Debug, Default)]
struct Vault {
    lock: VaultLock,
    balance: u64,
}

impl Lockable for Vault {
    fn vault_lock(&self) -> &VaultLock {
        &self.lock
    }

    fn vault_lock_mut(&mut self) -> &mut VaultLock {
        &mut self.lock
    }
}

#[derive(Debug, PartialEq, Eq)]
enum OpError {
    Lock(LockError),
    Insufficient,
}

impl From<LockError> for OpError {
    fn from(e: LockError) -> Self {
        Self::Lock(e)
    }
}

fn debit(vault: &mut Vault, amount: u64) -> Result<u64, OpError> {
    with_lock(vault, |v| {
        v.balance = v.balance.checked_sub(amount).ok_or(OpError::Insufficient)?;
        Ok(v.balance)
    })
}

#[test]
fn double_acquire_is_detected() {
    let mut lock = VaultLock::new();
    assert_eq!(acquire_lock(&mut lock), Ok(()));
    assert_eq!(acquire_lock(&mut lock), Err(LockError::ReentrancyDetected));
    assert!(lock.is_locked());
}

#[test]
fn acquire_release_acquire() {
    let mut lock = VaultLock::new();
    assert_eq!(acquire_lock(&mut lock), Ok(()));
    release_lock(&mut lock);
    assert_eq!(acquire_lock(&mut lock), Ok(()));
}

#[test]
fn nested_entry_through_guard_is_rejected() {
    let mut vault = Vault {
        balance: 10,
        ..Vault::default()
    };
    {
        let mut outer = ReentrancyGuard::acquire(&mut vault).expect("first entry");
        assert_eq!(debit(&mut outer, 1), Err(OpError::Lock(LockError::ReentrancyDetected)));
        assert_eq!(outer.balance, 10);
    }
    assert!(!vault.lock.is_locked());
    assert_eq!(debit(&mut vault, 1), Ok(9));
}

#[test]
fn error_propagation_releases_lock() {
    let mut vault = Vault {
        balance: 3,
        ..Vault::default()
    };
    assert_eq!(debit(&mut vault, 4), Err(OpError::Insufficient));
    assert!(!vault.lock.is_locked());
    assert_eq!(debit(&mut vault, 3), Ok(0));
}

#[test]
fn panic_releases_lock() {
    let mut vault = Vault::default();
    let result = catch_unwind(AssertUnwindSafe(|| {
        let _guard = ReentrancyGuard::acquire(&mut vault).expect("entry");
        panic!("transfer blew up");
    }));
    assert!(result.is_err());
    assert!(!vault.lock.is_locked());
}

#[test]
fn persisted_locked_flag_blocks_entry() {
    let persisted = [1u8];
    let mut vault = Vault {
        lock: VaultLock::read(&mut RecordReader::new(&persisted)).expect("lock byte"),
        balance: 1,
    };
    assert!(matches!(
        ReentrancyGuard::acquire(&mut vault),
        Err(LockError::ReentrancyDetected)
    ));
}

#[test]
fn lock_byte_must_be_a_boolean() {
    assert!(VaultLock::read(&mut RecordReader::new(&[2u8])).is_err());
    let unlocked = VaultLock::read(&mut RecordReader::new(&[0u8])).expect("lock byte");
    assert!(!unlocked.is_locked());
}
