//! Reserve vault deposits, withdrawals and rebalancing.
//!
//! Each operation runs as a critical section under the vault's
//! [`ReentrancyGuard`]. Deposits and withdrawals call out to a
//! [`TransferProgram`] while the lock is held. The callee sees the vault only
//! through a [`VaultHandle`]: it can read the record and call back into the
//! vault operations, and every such call fails with `ReentrancyDetected`.

use std::ops::Deref;

use serde::Serialize;
use tracing::info;

use warden::auth::{short_id, AgentIdentity};
use warden::guard::ReentrancyGuard;
use warden::math;

use super::Outcome;
use crate::accounts::{vault_address, AccountStore};
use crate::error::ProgramError;
use crate::state::ReserveVault;

/// Direction of a token movement relative to the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    /// Agent to vault.
    IntoVault,
    /// Vault to agent.
    OutOfVault,
}

/// The vault as seen from inside a transfer.
///
/// Derefs to a shared [`ReserveVault`]. There is no way to get a mutable
/// reference back out, so the callee cannot touch the lock flag or the
/// balances; it can only re-enter through the vault operations.
#[derive(Debug)]
pub struct VaultHandle<'a> {
    vault: &'a mut ReserveVault,
}

impl VaultHandle<'_> {
    /// Re-enter [`deposit_into_vault`] on this vault.
    ///
    /// # Errors
    ///
    /// As [`deposit_into_vault`]; while the outer operation holds the lock
    /// this is always `ReentrancyDetected`.
    pub fn deposit<T: TransferProgram + ?Sized>(
        &mut self,
        transfers: &mut T,
        amount: u64,
        now: i64,
    ) -> Result<u64, ProgramError> {
        deposit_into_vault(&mut *self.vault, transfers, amount, now)
    }

    /// Re-enter [`withdraw_from_vault`] on this vault.
    ///
    /// # Errors
    ///
    /// As [`withdraw_from_vault`].
    pub fn withdraw<T: TransferProgram + ?Sized>(
        &mut self,
        transfers: &mut T,
        amount: u64,
        now: i64,
    ) -> Result<u64, ProgramError> {
        withdraw_from_vault(&mut *self.vault, transfers, amount, now)
    }

    /// Re-enter [`rebalance_vault`] on this vault.
    ///
    /// # Errors
    ///
    /// As [`rebalance_vault`].
    pub fn rebalance(&mut self, now: i64) -> Result<u16, ProgramError> {
        rebalance_vault(&mut *self.vault, now)
    }
}

impl Deref for VaultHandle<'_> {
    type Target = ReserveVault;

    fn deref(&self) -> &ReserveVault {
        &*self.vault
    }
}

/// External program that moves tokens.
///
/// Called while the vault's lock is held.
pub trait TransferProgram {
    /// Move `amount` in `direction`.
    ///
    /// # Errors
    ///
    /// Any error aborts the surrounding vault operation.
    fn transfer(
        &mut self,
        vault: &mut VaultHandle<'_>,
        direction: TransferDirection,
        amount: u64,
    ) -> Result<(), ProgramError>;
}

/// Transfer program that only records the movements it was asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingTransfer {
    /// Movements in call order.
    pub movements: Vec<(TransferDirection, u64)>,
}

impl TransferProgram for RecordingTransfer {
    fn transfer(
        &mut self,
        _vault: &mut VaultHandle<'_>,
        direction: TransferDirection,
        amount: u64,
    ) -> Result<(), ProgramError> {
        info!(direction = ?direction, amount, "transfer");
        self.movements.push((direction, amount));
        Ok(())
    }
}

fn call_transfer<T: TransferProgram + ?Sized>(
    guard: &mut ReentrancyGuard<'_, ReserveVault>,
    transfers: &mut T,
    direction: TransferDirection,
    amount: u64,
) -> Result<(), ProgramError> {
    let mut handle = VaultHandle {
        vault: &mut **guard,
    };
    transfers.transfer(&mut handle, direction, amount)
}

/// Credit `amount` to `vault` after the transfer program moves it in.
///
/// Returns the vault's new total value.
///
/// # Errors
///
/// Returns [`ProgramError::InvalidAmount`] for zero, `ReentrancyDetected`
/// when the vault is already locked, `MathOverflow` when the total would
/// exceed `u64`, or the transfer program's error.
pub fn deposit_into_vault<T: TransferProgram + ?Sized>(
    vault: &mut ReserveVault,
    transfers: &mut T,
    amount: u64,
    now: i64,
) -> Result<u64, ProgramError> {
    if amount == 0 {
        return Err(ProgramError::InvalidAmount);
    }

    let mut guard = ReentrancyGuard::acquire(vault)?;
    call_transfer(&mut guard, transfers, TransferDirection::IntoVault, amount)?;

    // Credit against the balance as it stands after the callout.
    let total_value = math::checked_add(guard.total_value, amount)?;
    guard.total_value = total_value;
    guard.last_rebalance = now;
    Ok(total_value)
}

/// Debit `amount` from `vault`, then have the transfer program move it out.
///
/// Returns the vault's new total value.
///
/// # Errors
///
/// Returns [`ProgramError::InvalidAmount`] for zero, `ReentrancyDetected`
/// when the vault is already locked, `MathUnderflow` when `amount` exceeds
/// the vault's value, [`ProgramError::HealthBelowThreshold`] when the
/// remaining value would not cover liabilities at the configured ratio, or
/// the transfer program's error.
pub fn withdraw_from_vault<T: TransferProgram + ?Sized>(
    vault: &mut ReserveVault,
    transfers: &mut T,
    amount: u64,
    now: i64,
) -> Result<u64, ProgramError> {
    if amount == 0 {
        return Err(ProgramError::InvalidAmount);
    }

    let mut guard = ReentrancyGuard::acquire(vault)?;
    let remaining = math::checked_sub(guard.total_value, amount)?;
    let ratio_bps = math::health_ratio_bps(remaining, guard.liabilities)?;
    if ratio_bps < guard.vhr_threshold_bps {
        return Err(ProgramError::HealthBelowThreshold {
            ratio_bps,
            threshold_bps: guard.vhr_threshold_bps,
        });
    }

    guard.total_value = remaining;
    guard.last_rebalance = now;
    call_transfer(&mut guard, transfers, TransferDirection::OutOfVault, amount)?;
    Ok(remaining)
}

/// Stamp the vault's rebalance time under its lock.
///
/// Returns the vault's current health ratio in basis points.
///
/// # Errors
///
/// Returns `ReentrancyDetected` when the vault is already locked, or
/// `MathOverflow` if the ratio cannot be computed.
pub fn rebalance_vault(vault: &mut ReserveVault, now: i64) -> Result<u16, ProgramError> {
    let mut guard = ReentrancyGuard::acquire(vault)?;
    let ratio_bps = math::health_ratio_bps(guard.total_value, guard.liabilities)?;
    guard.last_rebalance = now;
    Ok(ratio_bps)
}

pub(crate) fn deposit<T: TransferProgram + ?Sized>(
    store: &mut AccountStore,
    transfers: &mut T,
    amount: u64,
    now: i64,
) -> Result<Outcome, ProgramError> {
    let vault = store.vault_mut(&vault_address())?;
    let total_value = deposit_into_vault(vault, transfers, amount, now)?;
    info!(amount, total_value, "deposit applied");
    Ok(Outcome::Deposited {
        amount,
        total_value,
    })
}

pub(crate) fn withdraw<T: TransferProgram + ?Sized>(
    store: &mut AccountStore,
    transfers: &mut T,
    agent: &AgentIdentity,
    amount: u64,
    now: i64,
) -> Result<Outcome, ProgramError> {
    let vault = store.vault_mut(&vault_address())?;
    if vault.authority != *agent {
        return Err(ProgramError::Unauthorized);
    }
    let total_value = withdraw_from_vault(vault, transfers, amount, now)?;
    info!(agent = %short_id(agent), amount, total_value, "withdrawal applied");
    Ok(Outcome::Withdrawn {
        amount,
        total_value,
    })
}

pub(crate) fn rebalance(
    store: &mut AccountStore,
    agent: &AgentIdentity,
    now: i64,
) -> Result<Outcome, ProgramError> {
    let vault = store.vault_mut(&vault_address())?;
    if vault.authority != *agent {
        return Err(ProgramError::Unauthorized);
    }
    let health_ratio_bps = rebalance_vault(vault, now)?;
    info!(agent = %short_id(agent), health_ratio_bps, "vault rebalanced");
    Ok(Outcome::Rebalanced {
        health_ratio_bps,
        last_rebalance: now,
    })
}
