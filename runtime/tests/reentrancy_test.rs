//! Transfer programs that call back into the vault while it is locked.

use ed25519_dalek::SigningKey;

use warden::auth::{ActionPayload, Authenticator, SignedAction};
use warden::guard::{acquire_lock, release_lock, LockError, Lockable};
use warden_runtime::accounts::{agent_address, vault_address, AccountStore};
use warden_runtime::instructions::{
    deposit_into_vault, rebalance_vault, InitializeParams, RecordingTransfer, TransferDirection,
    TransferProgram, VaultHandle,
};
use warden_runtime::{Outcome, Program, ProgramError};

const NOW: i64 = 1_700_000_000;

/// What the callee does with the vault it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Callback {
    /// Repeat the same operation on the vault.
    SameOperation,
    /// Rebalance the vault.
    Rebalance,
    /// Clear the lock on a detached copy and deposit into that.
    ResetCopy,
}

/// Re-enters the vault from inside every transfer and records what happened.
struct ReenteringTransfer {
    callback: Callback,
    swallow: bool,
    saw_locked: Vec<bool>,
    attempts: Vec<Result<u64, ProgramError>>,
}

impl ReenteringTransfer {
    fn new(callback: Callback, swallow: bool) -> Self {
        Self {
            callback,
            swallow,
            saw_locked: Vec::new(),
            attempts: Vec::new(),
        }
    }
}

impl TransferProgram for ReenteringTransfer {
    fn transfer(
        &mut self,
        vault: &mut VaultHandle<'_>,
        direction: TransferDirection,
        amount: u64,
    ) -> Result<(), ProgramError> {
        self.saw_locked.push(vault.is_locked());
        let mut inner = RecordingTransfer::default();
        let nested = match (self.callback, direction) {
            (Callback::SameOperation, TransferDirection::IntoVault) => {
                vault.deposit(&mut inner, amount, NOW)
            }
            (Callback::SameOperation, TransferDirection::OutOfVault) => {
                vault.withdraw(&mut inner, amount, NOW)
            }
            (Callback::Rebalance, _) => vault.rebalance(NOW).map(u64::from),
            (Callback::ResetCopy, _) => {
                let mut copy = (**vault).clone();
                release_lock(copy.vault_lock_mut());
                deposit_into_vault(&mut copy, &mut inner, amount, NOW)
            }
        };
        self.attempts.push(nested.clone());
        if self.swallow {
            return Ok(());
        }
        nested.map(|_| ())
    }
}

fn key() -> SigningKey {
    SigningKey::from_bytes(&[21u8; 32])
}

fn setup(callback: Callback, swallow: bool) -> (Program<ReenteringTransfer>, AccountStore) {
    let mut program = Program::new(
        Authenticator::default(),
        ReenteringTransfer::new(callback, swallow),
    );
    let mut store = AccountStore::new();
    let authority = key().verifying_key().to_bytes();
    program
        .initialize(
            &mut store,
            &InitializeParams {
                authority,
                vhr_threshold_bps: 15_000,
                liabilities: 0,
            },
        )
        .expect("initialize");
    program
        .register_agent(&mut store, &authority)
        .expect("register");
    (program, store)
}

#[test]
fn nested_deposit_is_detected_and_rolled_back() {
    let (mut program, mut store) = setup(Callback::SameOperation, false);
    let before = store.clone();

    let signed = SignedAction::sign(&key(), ActionPayload::Deposit { amount: 50 }, 1, NOW);
    assert_eq!(
        program.process(&mut store, &signed, NOW),
        Err(ProgramError::Lock(LockError::ReentrancyDetected))
    );
    assert_eq!(
        program.transfers().attempts,
        vec![Err(ProgramError::Lock(LockError::ReentrancyDetected))]
    );
    assert_eq!(program.transfers().saw_locked, vec![true]);

    assert_eq!(store, before);
    let vault = store.vault(&vault_address()).expect("vault");
    assert!(!vault.is_locked());
    assert_eq!(
        store
            .agent(&agent_address(&key().verifying_key().to_bytes()))
            .expect("agent")
            .nonce(),
        0
    );
}

#[test]
fn fresh_entry_after_rejected_reentry_succeeds() {
    let (mut program, mut store) = setup(Callback::SameOperation, false);
    let signed = SignedAction::sign(&key(), ActionPayload::Deposit { amount: 50 }, 1, NOW);
    assert!(program.process(&mut store, &signed, NOW).is_err());

    let vault = store.vault_mut(&vault_address()).expect("vault");
    assert_eq!(
        deposit_into_vault(vault, &mut RecordingTransfer::default(), 50, NOW),
        Ok(50)
    );
    assert!(!vault.is_locked());
}

#[test]
fn swallowed_reentry_credits_once() {
    let (mut program, mut store) = setup(Callback::SameOperation, true);

    let signed = SignedAction::sign(&key(), ActionPayload::Deposit { amount: 50 }, 1, NOW);
    assert_eq!(
        program.process(&mut store, &signed, NOW),
        Ok(Outcome::Deposited {
            amount: 50,
            total_value: 50
        })
    );

    let withdraw = SignedAction::sign(&key(), ActionPayload::Withdraw { amount: 20 }, 2, NOW);
    assert_eq!(
        program.process(&mut store, &withdraw, NOW),
        Ok(Outcome::Withdrawn {
            amount: 20,
            total_value: 30
        })
    );

    assert_eq!(
        program.transfers().attempts,
        vec![
            Err(ProgramError::Lock(LockError::ReentrancyDetected)),
            Err(ProgramError::Lock(LockError::ReentrancyDetected)),
        ]
    );
    let vault = store.vault(&vault_address()).expect("vault");
    assert_eq!(vault.total_value, 30);
    assert!(!vault.is_locked());
}

#[test]
fn rebalance_from_inside_a_transfer_is_rejected() {
    let (mut program, mut store) = setup(Callback::Rebalance, true);

    let signed = SignedAction::sign(&key(), ActionPayload::Deposit { amount: 5 }, 1, NOW + 1);
    assert!(program.process(&mut store, &signed, NOW + 1).is_ok());
    assert_eq!(
        program.transfers().attempts,
        vec![Err(ProgramError::Lock(LockError::ReentrancyDetected))]
    );

    // Only the outer deposit stamped the vault.
    let vault = store.vault(&vault_address()).expect("vault");
    assert_eq!(vault.last_rebalance, NOW + 1);
    assert!(!vault.is_locked());
}

#[test]
fn rebalance_on_locked_vault_is_rejected() {
    let (_program, mut store) = setup(Callback::Rebalance, false);
    let vault = store.vault_mut(&vault_address()).expect("vault");

    assert_eq!(acquire_lock(vault.vault_lock_mut()), Ok(()));
    assert_eq!(
        rebalance_vault(vault, NOW),
        Err(ProgramError::Lock(LockError::ReentrancyDetected))
    );
    assert_eq!(vault.last_rebalance, 0);

    release_lock(vault.vault_lock_mut());
    assert_eq!(rebalance_vault(vault, NOW), Ok(u16::MAX));
    assert_eq!(vault.last_rebalance, NOW);
}

#[test]
fn clearing_the_lock_on_a_copy_does_not_reach_the_vault() {
    let (mut program, mut store) = setup(Callback::ResetCopy, false);

    let signed = SignedAction::sign(&key(), ActionPayload::Deposit { amount: 50 }, 1, NOW);
    assert_eq!(
        program.process(&mut store, &signed, NOW),
        Ok(Outcome::Deposited {
            amount: 50,
            total_value: 50
        })
    );

    // The copy accepted the nested deposit, the real vault stayed locked
    // throughout and was credited exactly once.
    assert_eq!(program.transfers().attempts, vec![Ok(50)]);
    assert_eq!(program.transfers().saw_locked, vec![true]);
    let vault = store.vault(&vault_address()).expect("vault");
    assert_eq!(vault.total_value, 50);
    assert!(!vault.is_locked());
}
