//! Instruction handlers.
//!
//! [`Program`] is the entry point. Signed agent actions go through
//! [`Program::process`], which authenticates the action and dispatches it
//! inside one [`transaction`](crate::transaction), so a failure anywhere
//! after authentication also discards the nonce advance. Administrative
//! operations (setup, the circuit breaker, finalizing and executing
//! proposals) are transactional as well but carry no agent signature; the
//! host is expected to have authorised the caller.

pub mod admin;
pub mod governance;
pub mod vault;

use serde::Serialize;

use warden::auth::{ActionPayload, AgentIdentity, Authenticator, SignedAction};

use crate::accounts::{agent_address, AccountStore, Address};
use crate::error::ProgramError;
use crate::state::ProposalStatus;
use crate::transaction;

pub use admin::{InitializeParams, CIRCUIT_BREAKER_DELAY_SECS, DEFAULT_VHR_THRESHOLD_BPS};
pub use governance::{EXECUTION_DELAY_SECS, MAX_VOTING_PERIOD_SECS, MIN_VOTING_PERIOD_SECS};
pub use vault::{
    deposit_into_vault, rebalance_vault, withdraw_from_vault, RecordingTransfer,
    TransferDirection, TransferProgram, VaultHandle,
};

/// Tag byte stored in every record created by this program.
pub const CANONICAL_BUMP: u8 = 255;

/// Result of a successfully processed agent action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// A proposal was opened.
    ProposalCreated {
        /// Id of the new proposal.
        proposal_id: u64,
        /// When voting closes.
        end_time: i64,
    },
    /// A vote was counted.
    VoteRecorded {
        /// Proposal voted on.
        proposal_id: u64,
        /// Power added to the chosen side.
        voting_power: u64,
    },
    /// Funds moved into the vault.
    Deposited {
        /// Amount moved.
        amount: u64,
        /// Vault value afterwards.
        total_value: u64,
    },
    /// Funds moved out of the vault.
    Withdrawn {
        /// Amount moved.
        amount: u64,
        /// Vault value afterwards.
        total_value: u64,
    },
    /// The vault's rebalance time was stamped.
    Rebalanced {
        /// Current vault health in basis points.
        health_ratio_bps: u16,
        /// New rebalance timestamp.
        last_rebalance: i64,
    },
}

/// The reserve program: an authenticator plus the external transfer
/// program vault operations call into.
#[derive(Debug)]
pub struct Program<T> {
    authenticator: Authenticator,
    transfers: T,
}

impl<T: TransferProgram> Program<T> {
    /// Create a program instance.
    pub fn new(authenticator: Authenticator, transfers: T) -> Self {
        Self {
            authenticator,
            transfers,
        }
    }

    /// The external transfer program.
    pub fn transfers(&self) -> &T {
        &self.transfers
    }

    /// Create the global state and the reserve vault.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError::AccountExists`] if already initialized.
    pub fn initialize(
        &mut self,
        store: &mut AccountStore,
        params: &InitializeParams,
    ) -> Result<(), ProgramError> {
        transaction::execute(store, |tx| admin::initialize(tx, params))
    }

    /// Create an agent's replay record with nonce 0.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError::AccountExists`] if the agent is registered.
    pub fn register_agent(
        &mut self,
        store: &mut AccountStore,
        agent: &AgentIdentity,
    ) -> Result<Address, ProgramError> {
        transaction::execute(store, |tx| admin::register_agent(tx, agent))
    }

    /// Start the circuit breaker timelock.
    ///
    /// Returns the earliest time [`Program::activate_circuit_breaker`]
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError::Unauthorized`] unless `signer` is the
    /// program authority.
    pub fn request_circuit_breaker(
        &mut self,
        store: &mut AccountStore,
        signer: &AgentIdentity,
        now: i64,
    ) -> Result<i64, ProgramError> {
        transaction::execute(store, |tx| admin::request_circuit_breaker(tx, signer, now))
    }

    /// Pause governance once the requested delay has passed.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError::Unauthorized`] unless `signer` is the
    /// program authority, and [`ProgramError::CircuitBreakerTimelockNotMet`]
    /// without a pending request or before its delay elapses.
    pub fn activate_circuit_breaker(
        &mut self,
        store: &mut AccountStore,
        signer: &AgentIdentity,
        now: i64,
    ) -> Result<(), ProgramError> {
        transaction::execute(store, |tx| admin::activate_circuit_breaker(tx, signer, now))
    }

    /// Resume governance immediately and drop any pending request.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError::Unauthorized`] unless `signer` is the
    /// program authority.
    pub fn deactivate_circuit_breaker(
        &mut self,
        store: &mut AccountStore,
        signer: &AgentIdentity,
    ) -> Result<(), ProgramError> {
        transaction::execute(store, |tx| admin::deactivate_circuit_breaker(tx, signer))
    }

    /// Close voting on a proposal whose period has ended.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError::VotingPeriodActive`] before `end_time` and
    /// [`ProgramError::ProposalNotActive`] if already finalized.
    pub fn finalize_proposal(
        &mut self,
        store: &mut AccountStore,
        proposal_id: u64,
        now: i64,
    ) -> Result<ProposalStatus, ProgramError> {
        transaction::execute(store, |tx| {
            governance::finalize_proposal(tx, proposal_id, now)
        })
    }

    /// Mark a passed proposal executed once the execution delay is over.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError::Unauthorized`] unless `executor` is the
    /// program authority, [`ProgramError::ProposalNotPassed`] for any other
    /// status and [`ProgramError::ExecutionDelayNotMet`] too early.
    pub fn execute_proposal(
        &mut self,
        store: &mut AccountStore,
        executor: &AgentIdentity,
        proposal_id: u64,
        now: i64,
    ) -> Result<(), ProgramError> {
        transaction::execute(store, |tx| {
            governance::execute_proposal(tx, executor, proposal_id, now)
        })
    }

    /// Authenticate and apply a signed agent action.
    ///
    /// # Errors
    ///
    /// Returns the authentication or handler failure; `store` is unchanged
    /// in that case.
    pub fn process(
        &mut self,
        store: &mut AccountStore,
        signed: &SignedAction,
        now: i64,
    ) -> Result<Outcome, ProgramError> {
        let authenticator = self.authenticator;
        let transfers = &mut self.transfers;
        let agent = &signed.public_key;

        transaction::execute(store, |tx| {
            authenticate(&authenticator, tx, signed, now)?;

            match &signed.action {
                ActionPayload::CreateProposal {
                    policy_type,
                    policy_params,
                    duration_secs,
                } => governance::create_proposal(
                    tx,
                    agent,
                    *policy_type,
                    policy_params,
                    *duration_secs,
                    now,
                ),
                ActionPayload::Vote {
                    proposal_id,
                    prediction,
                    stake_amount,
                } => governance::vote_on_proposal(
                    tx,
                    agent,
                    *proposal_id,
                    *prediction,
                    *stake_amount,
                    now,
                ),
                ActionPayload::Deposit { amount } => vault::deposit(tx, transfers, *amount, now),
                ActionPayload::Withdraw { amount } => {
                    vault::withdraw(tx, transfers, agent, *amount, now)
                }
                ActionPayload::Rebalance => vault::rebalance(tx, agent, now),
            }
        })
    }
}

fn authenticate(
    authenticator: &Authenticator,
    store: &mut AccountStore,
    signed: &SignedAction,
    now: i64,
) -> Result<(), ProgramError> {
    let state = store.agent_mut(&agent_address(&signed.public_key))?;
    authenticator.verify(signed, now, state)?;
    Ok(())
}
