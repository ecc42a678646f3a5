//! Proposals and quadratic voting.

use tracing::info;

use warden::auth::{short_id, AgentIdentity, PolicyType, MAX_POLICY_PARAMS_LEN};
use warden::math::{self, MathError};

use super::{Outcome, CANONICAL_BUMP};
use crate::accounts::{global_address, proposal_address, vote_address, Account, AccountStore};
use crate::error::ProgramError;
use crate::state::{PolicyProposal, ProposalStatus, VoteRecord};

/// Shortest voting period: one hour.
pub const MIN_VOTING_PERIOD_SECS: i64 = 3_600;

/// Longest voting period: thirty days.
pub const MAX_VOTING_PERIOD_SECS: i64 = 30 * 24 * 3_600;

/// Time a passed proposal waits before it can be executed: two days.
pub const EXECUTION_DELAY_SECS: i64 = 2 * 24 * 3_600;

pub(crate) fn create_proposal(
    store: &mut AccountStore,
    proposer: &AgentIdentity,
    policy_type: PolicyType,
    policy_params: &[u8],
    duration_secs: i64,
    now: i64,
) -> Result<Outcome, ProgramError> {
    if !(MIN_VOTING_PERIOD_SECS..=MAX_VOTING_PERIOD_SECS).contains(&duration_secs) {
        return Err(ProgramError::InvalidVotingPeriod {
            min: MIN_VOTING_PERIOD_SECS,
            max: MAX_VOTING_PERIOD_SECS,
        });
    }
    if policy_params.len() > MAX_POLICY_PARAMS_LEN {
        return Err(ProgramError::PolicyParamsTooLong {
            len: policy_params.len(),
            max: MAX_POLICY_PARAMS_LEN,
        });
    }

    let global = store.global_mut(&global_address())?;
    if global.circuit_breaker_active {
        return Err(ProgramError::CircuitBreakerActive);
    }
    let proposal_id = global.proposal_counter;
    global.proposal_counter = proposal_id
        .checked_add(1)
        .ok_or(ProgramError::CounterOverflow)?;

    let end_time = now
        .checked_add(duration_secs)
        .ok_or(MathError::MathOverflow)?;

    store.create(
        proposal_address(proposal_id),
        Account::Proposal(PolicyProposal {
            id: proposal_id,
            proposer: *proposer,
            policy_type,
            policy_params: policy_params.to_vec(),
            start_time: now,
            end_time,
            yes_power: 0,
            no_power: 0,
            passed_at: 0,
            status: ProposalStatus::Active,
            bump: CANONICAL_BUMP,
        }),
    )?;

    info!(
        proposal_id,
        proposer = %short_id(proposer),
        policy = ?policy_type,
        end_time,
        "proposal created"
    );
    Ok(Outcome::ProposalCreated {
        proposal_id,
        end_time,
    })
}

pub(crate) fn vote_on_proposal(
    store: &mut AccountStore,
    agent: &AgentIdentity,
    proposal_id: u64,
    prediction: bool,
    stake_amount: u64,
    now: i64,
) -> Result<Outcome, ProgramError> {
    if store.global(&global_address())?.circuit_breaker_active {
        return Err(ProgramError::CircuitBreakerActive);
    }
    if stake_amount == 0 {
        return Err(ProgramError::InvalidStakeAmount);
    }

    let vote_addr = vote_address(proposal_id, agent);
    if store.contains(&vote_addr) {
        return Err(ProgramError::AlreadyVoted);
    }

    let voting_power = math::voting_power(stake_amount)?;

    let proposal = store.proposal_mut(&proposal_address(proposal_id))?;
    if proposal.status != ProposalStatus::Active
        || now < proposal.start_time
        || now >= proposal.end_time
    {
        return Err(ProgramError::ProposalNotActive);
    }
    if prediction {
        proposal.yes_power = math::checked_add(proposal.yes_power, voting_power)?;
    } else {
        proposal.no_power = math::checked_add(proposal.no_power, voting_power)?;
    }

    store.create(
        vote_addr,
        Account::Vote(VoteRecord {
            proposal_id,
            agent: *agent,
            stake_amount,
            voting_power,
            prediction,
            timestamp: now,
            bump: CANONICAL_BUMP,
        }),
    )?;

    info!(
        proposal_id,
        agent = %short_id(agent),
        voting_power,
        prediction,
        "vote recorded"
    );
    Ok(Outcome::VoteRecorded {
        proposal_id,
        voting_power,
    })
}

pub(crate) fn finalize_proposal(
    store: &mut AccountStore,
    proposal_id: u64,
    now: i64,
) -> Result<ProposalStatus, ProgramError> {
    let proposal = store.proposal_mut(&proposal_address(proposal_id))?;
    if proposal.status != ProposalStatus::Active {
        return Err(ProgramError::ProposalNotActive);
    }
    if now < proposal.end_time {
        return Err(ProgramError::VotingPeriodActive);
    }

    if proposal.yes_power > proposal.no_power {
        proposal.status = ProposalStatus::Passed;
        proposal.passed_at = now;
    } else {
        proposal.status = ProposalStatus::Rejected;
    }

    info!(
        proposal_id,
        yes_power = proposal.yes_power,
        no_power = proposal.no_power,
        status = ?proposal.status,
        "proposal finalized"
    );
    Ok(proposal.status)
}

pub(crate) fn execute_proposal(
    store: &mut AccountStore,
    executor: &AgentIdentity,
    proposal_id: u64,
    now: i64,
) -> Result<(), ProgramError> {
    if store.global(&global_address())?.authority != *executor {
        return Err(ProgramError::Unauthorized);
    }

    let proposal = store.proposal_mut(&proposal_address(proposal_id))?;
    if proposal.status != ProposalStatus::Passed {
        return Err(ProgramError::ProposalNotPassed);
    }
    let executable_at = proposal
        .passed_at
        .checked_add(EXECUTION_DELAY_SECS)
        .ok_or(MathError::MathOverflow)?;
    if now < executable_at {
        return Err(ProgramError::ExecutionDelayNotMet);
    }

    proposal.status = ProposalStatus::Executed;
    info!(
        proposal_id,
        policy = ?proposal.policy_type,
        executor = %short_id(executor),
        "proposal executed"
    );
    Ok(())
}
