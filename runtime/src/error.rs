//! Program-level error type.
//!
//! Every failure a handler can surface, whether raised by authentication,
//! arithmetic, the vault lock or the handler itself, folds into
//! [`ProgramError`]. Each variant carries a stable string code for
//! clients that match on outcomes.

use warden::auth::AuthError;
use warden::guard::LockError;
use warden::math::MathError;

/// Failure of a program instruction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    /// Authentication failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Checked arithmetic failed.
    #[error(transparent)]
    Math(#[from] MathError),

    /// The vault lock was already held.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// No account lives at the address.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// An account already lives at the address.
    #[error("account already exists: {0}")]
    AccountExists(String),

    /// The account at the address holds a different record type.
    #[error("account {address} is not a {expected}")]
    WrongAccountType {
        /// Hex address of the account.
        address: String,
        /// Record type the caller expected.
        expected: &'static str,
    },

    /// The signer is not allowed to perform this operation.
    #[error("unauthorized signer")]
    Unauthorized,

    /// Governance is paused by the circuit breaker.
    #[error("circuit breaker is active")]
    CircuitBreakerActive,

    /// No activation request is pending, or its delay has not elapsed.
    #[error("circuit breaker timelock not met")]
    CircuitBreakerTimelockNotMet,

    /// Voting period outside the allowed range.
    #[error("voting period must be between {min} and {max} seconds")]
    InvalidVotingPeriod {
        /// Shortest allowed period.
        min: i64,
        /// Longest allowed period.
        max: i64,
    },

    /// Policy parameters exceed the size limit.
    #[error("policy params too long: {len} bytes (max {max})")]
    PolicyParamsTooLong {
        /// Submitted length.
        len: usize,
        /// Allowed length.
        max: usize,
    },

    /// The proposal counter cannot advance.
    #[error("proposal counter overflow")]
    CounterOverflow,

    /// A vote must carry a positive stake.
    #[error("invalid stake amount")]
    InvalidStakeAmount,

    /// The proposal is not accepting votes.
    #[error("proposal is not active")]
    ProposalNotActive,

    /// The voting period has not ended yet.
    #[error("voting period has not ended")]
    VotingPeriodActive,

    /// Only a passed proposal can be executed.
    #[error("proposal has not passed")]
    ProposalNotPassed,

    /// The proposal passed too recently to execute.
    #[error("execution delay not met")]
    ExecutionDelayNotMet,

    /// The agent already voted on this proposal.
    #[error("agent already voted on this proposal")]
    AlreadyVoted,

    /// Transfers must move a positive amount.
    #[error("invalid amount")]
    InvalidAmount,

    /// The withdrawal would leave the vault under its health threshold.
    #[error("vault health {ratio_bps} bps below threshold {threshold_bps} bps")]
    HealthBelowThreshold {
        /// Ratio after the withdrawal.
        ratio_bps: u16,
        /// Configured minimum.
        threshold_bps: u16,
    },

    /// The external transfer program failed.
    #[error("transfer failed: {0}")]
    TransferFailed(String),
}

impl ProgramError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth(AuthError::InvalidSignature) => "invalid_signature",
            Self::Auth(AuthError::SignatureExpired) => "signature_expired",
            Self::Auth(AuthError::InvalidNonce) => "invalid_nonce",
            Self::Auth(AuthError::AgentMismatch) => "agent_mismatch",
            Self::Math(MathError::MathOverflow) => "math_overflow",
            Self::Math(MathError::MathUnderflow) => "math_underflow",
            Self::Math(MathError::DivisionByZero) => "division_by_zero",
            Self::Lock(LockError::ReentrancyDetected) => "reentrancy_detected",
            Self::AccountNotFound(_) => "account_not_found",
            Self::AccountExists(_) => "account_exists",
            Self::WrongAccountType { .. } => "wrong_account_type",
            Self::Unauthorized => "unauthorized",
            Self::CircuitBreakerActive => "circuit_breaker_active",
            Self::CircuitBreakerTimelockNotMet => "circuit_breaker_timelock_not_met",
            Self::InvalidVotingPeriod { .. } => "invalid_voting_period",
            Self::PolicyParamsTooLong { .. } => "policy_params_too_long",
            Self::CounterOverflow => "counter_overflow",
            Self::InvalidStakeAmount => "invalid_stake_amount",
            Self::ProposalNotActive => "proposal_not_active",
            Self::VotingPeriodActive => "voting_period_active",
            Self::ProposalNotPassed => "proposal_not_passed",
            Self::ExecutionDelayNotMet => "execution_delay_not_met",
            Self::AlreadyVoted => "already_voted",
            Self::InvalidAmount => "invalid_amount",
            Self::HealthBelowThreshold { .. } => "health_below_threshold",
            Self::TransferFailed(_) => "transfer_failed",
        }
    }
}
