//! Setup and administration.

use serde::Deserialize;
use tracing::{info, warn};

use warden::auth::{short_id, AgentAuthState, AgentIdentity};
use warden::math::MathError;

use super::CANONICAL_BUMP;
use crate::accounts::{agent_address, global_address, vault_address, Account, AccountStore, Address};
use crate::error::ProgramError;
use crate::state::{GlobalState, ReserveVault};

/// Default minimum vault health: 150%.
pub const DEFAULT_VHR_THRESHOLD_BPS: u16 = 15_000;

/// Time between requesting and activating the circuit breaker: one day.
pub const CIRCUIT_BREAKER_DELAY_SECS: i64 = 24 * 3_600;

/// Arguments to `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InitializeParams {
    /// Program and vault authority.
    pub authority: AgentIdentity,
    /// Minimum health ratio a withdrawal must leave, in basis points.
    pub vhr_threshold_bps: u16,
    /// Outstanding liabilities the vault backs.
    pub liabilities: u64,
}

pub(crate) fn initialize(
    store: &mut AccountStore,
    params: &InitializeParams,
) -> Result<(), ProgramError> {
    store.create(
        global_address(),
        Account::Global(GlobalState {
            authority: params.authority,
            proposal_counter: 0,
            circuit_breaker_active: false,
            circuit_breaker_requested_at: 0,
            bump: CANONICAL_BUMP,
        }),
    )?;
    store.create(
        vault_address(),
        Account::Vault(ReserveVault::new(
            params.authority,
            params.liabilities,
            params.vhr_threshold_bps,
            CANONICAL_BUMP,
        )),
    )?;

    info!(
        authority = %short_id(&params.authority),
        vhr_threshold_bps = params.vhr_threshold_bps,
        "program initialized"
    );
    Ok(())
}

pub(crate) fn register_agent(
    store: &mut AccountStore,
    agent: &AgentIdentity,
) -> Result<Address, ProgramError> {
    let address = agent_address(agent);
    store.create(
        address,
        Account::Agent(AgentAuthState::new(*agent, CANONICAL_BUMP)),
    )?;
    info!(agent = %short_id(agent), "agent registered");
    Ok(address)
}

fn authorized_global<'a>(
    store: &'a mut AccountStore,
    signer: &AgentIdentity,
) -> Result<&'a mut GlobalState, ProgramError> {
    let global = store.global_mut(&global_address())?;
    if global.authority != *signer {
        return Err(ProgramError::Unauthorized);
    }
    Ok(global)
}

pub(crate) fn request_circuit_breaker(
    store: &mut AccountStore,
    signer: &AgentIdentity,
    now: i64,
) -> Result<i64, ProgramError> {
    let global = authorized_global(store, signer)?;
    let activatable_at = now
        .checked_add(CIRCUIT_BREAKER_DELAY_SECS)
        .ok_or(MathError::MathOverflow)?;
    global.circuit_breaker_requested_at = now;
    warn!(requested_at = now, activatable_at, "circuit breaker requested");
    Ok(activatable_at)
}

pub(crate) fn activate_circuit_breaker(
    store: &mut AccountStore,
    signer: &AgentIdentity,
    now: i64,
) -> Result<(), ProgramError> {
    let global = authorized_global(store, signer)?;
    let requested_at = global.circuit_breaker_requested_at;
    if requested_at == 0 {
        return Err(ProgramError::CircuitBreakerTimelockNotMet);
    }
    let activatable_at = requested_at
        .checked_add(CIRCUIT_BREAKER_DELAY_SECS)
        .ok_or(MathError::MathOverflow)?;
    if now < activatable_at {
        return Err(ProgramError::CircuitBreakerTimelockNotMet);
    }
    global.circuit_breaker_active = true;
    warn!(requested_at, activated_at = now, "circuit breaker activated");
    Ok(())
}

pub(crate) fn deactivate_circuit_breaker(
    store: &mut AccountStore,
    signer: &AgentIdentity,
) -> Result<(), ProgramError> {
    let global = authorized_global(store, signer)?;
    global.circuit_breaker_active = false;
    global.circuit_breaker_requested_at = 0;
    warn!("circuit breaker deactivated");
    Ok(())
}
