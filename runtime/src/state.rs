//! Persisted program records.
//!
//! Each record has a fixed-size layout (see [`warden::layout`]) so account
//! sizes are known at creation time. Field order is part of the format:
//! new fields are appended before the trailing `bump` byte only together
//! with a legacy decoder for the previous length.

use serde::Serialize;

use warden::auth::{AgentIdentity, PolicyType, MAX_POLICY_PARAMS_LEN};
use warden::guard::{Lockable, VaultLock};
use warden::layout::{AccountLayout, LayoutError, RecordReader, RecordWriter};

/// Program-wide governance settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalState {
    /// Agent allowed to administer the program.
    #[serde(with = "hex_key")]
    pub authority: AgentIdentity,
    /// Id the next proposal receives.
    pub proposal_counter: u64,
    /// When set, no new proposals or votes are accepted.
    pub circuit_breaker_active: bool,
    /// When activation was requested; `0` when no request is pending.
    pub circuit_breaker_requested_at: i64,
    /// Structural tag byte.
    pub bump: u8,
}

impl AccountLayout for GlobalState {
    const NAME: &'static str = "GlobalState";
    const LEN: usize = 8 + 32 + 8 + 1 + 8 + 1;

    fn write_fields(&self, writer: &mut RecordWriter) {
        writer.put_bytes(&self.authority);
        writer.put_u64(self.proposal_counter);
        writer.put_bool(self.circuit_breaker_active);
        writer.put_i64(self.circuit_breaker_requested_at);
        writer.put_u8(self.bump);
    }

    fn read_fields(reader: &mut RecordReader<'_>) -> Result<Self, LayoutError> {
        Ok(Self {
            authority: reader.take_array()?,
            proposal_counter: reader.read_u64()?,
            circuit_breaker_active: reader.read_bool()?,
            circuit_breaker_requested_at: reader.read_i64()?,
            bump: reader.read_u8()?,
        })
    }
}

/// The reserve vault.
///
/// `lock` sits right before `bump`; records written before the lock existed
/// are one byte shorter and decode through [`ReserveVault::decode_any`].
/// The lock is private: holders of a `&mut ReserveVault` read it through
/// [`ReserveVault::is_locked`] and change it only via the guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReserveVault {
    /// Agent allowed to withdraw.
    #[serde(with = "hex_key")]
    pub authority: AgentIdentity,
    /// Value held, in raw fixed-point units.
    pub total_value: u64,
    /// Outstanding liabilities, in raw fixed-point units.
    pub liabilities: u64,
    /// Minimum health ratio a withdrawal must leave, in basis points.
    pub vhr_threshold_bps: u16,
    /// Timestamp of the last balance change.
    pub last_rebalance: i64,
    lock: VaultLock,
    /// Structural tag byte.
    pub bump: u8,
}

impl ReserveVault {
    /// Encoded size of a record written before the lock flag was added.
    pub const LEGACY_LEN: usize = Self::LEN - 1;

    /// An empty, unlocked vault.
    pub fn new(
        authority: AgentIdentity,
        liabilities: u64,
        vhr_threshold_bps: u16,
        bump: u8,
    ) -> Self {
        Self {
            authority,
            total_value: 0,
            liabilities,
            vhr_threshold_bps,
            last_rebalance: 0,
            lock: VaultLock::new(),
            bump,
        }
    }

    /// Whether a critical section is in flight.
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Decode either the current layout or the pre-lock layout.
    ///
    /// A legacy record decodes as unlocked.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when `data` matches neither layout.
    pub fn decode_any(data: &[u8]) -> Result<Self, LayoutError> {
        if data.len() != Self::LEGACY_LEN {
            return Self::decode(data);
        }

        let mut reader = RecordReader::new(data);
        let prefix: [u8; warden::layout::DISCRIMINATOR_LEN] = reader.take_array()?;
        if prefix != warden::layout::discriminator(Self::NAME) {
            return Err(LayoutError::DiscriminatorMismatch { record: Self::NAME });
        }
        Ok(Self {
            authority: reader.take_array()?,
            total_value: reader.read_u64()?,
            liabilities: reader.read_u64()?,
            vhr_threshold_bps: reader.read_u16()?,
            last_rebalance: reader.read_i64()?,
            lock: VaultLock::new(),
            bump: reader.read_u8()?,
        })
    }
}

impl Lockable for ReserveVault {
    fn vault_lock(&self) -> &VaultLock {
        &self.lock
    }

    fn vault_lock_mut(&mut self) -> &mut VaultLock {
        &mut self.lock
    }
}

impl AccountLayout for ReserveVault {
    const NAME: &'static str = "ReserveVault";
    // discriminator + authority + total + liabilities + threshold
    // + last_rebalance + locked + bump
    const LEN: usize = 8 + 32 + 8 + 8 + 2 + 8 + 1 + 1;

    fn write_fields(&self, writer: &mut RecordWriter) {
        writer.put_bytes(&self.authority);
        writer.put_u64(self.total_value);
        writer.put_u64(self.liabilities);
        writer.put_u16(self.vhr_threshold_bps);
        writer.put_i64(self.last_rebalance);
        self.lock.write(writer);
        writer.put_u8(self.bump);
    }

    fn read_fields(reader: &mut RecordReader<'_>) -> Result<Self, LayoutError> {
        Ok(Self {
            authority: reader.take_array()?,
            total_value: reader.read_u64()?,
            liabilities: reader.read_u64()?,
            vhr_threshold_bps: reader.read_u16()?,
            last_rebalance: reader.read_i64()?,
            lock: VaultLock::read(reader)?,
            bump: reader.read_u8()?,
        })
    }
}

/// Lifecycle of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Accepting votes.
    Active,
    /// Finalized with more yes than no power.
    Passed,
    /// Finalized otherwise.
    Rejected,
    /// Passed and enacted after the execution delay.
    Executed,
}

impl ProposalStatus {
    fn code(self) -> u8 {
        match self {
            Self::Active => 0,
            Self::Passed => 1,
            Self::Rejected => 2,
            Self::Executed => 3,
        }
    }

    fn from_code(code: u8) -> Result<Self, LayoutError> {
        match code {
            0 => Ok(Self::Active),
            1 => Ok(Self::Passed),
            2 => Ok(Self::Rejected),
            3 => Ok(Self::Executed),
            value => Err(LayoutError::InvalidTag {
                field: "status",
                value,
            }),
        }
    }
}

/// A monetary-policy proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyProposal {
    /// Sequential id from [`GlobalState::proposal_counter`].
    pub id: u64,
    /// Agent that opened the proposal.
    #[serde(with = "hex_key")]
    pub proposer: AgentIdentity,
    /// Policy to enact.
    pub policy_type: PolicyType,
    /// Opaque parameters, at most [`MAX_POLICY_PARAMS_LEN`] bytes.
    #[serde(serialize_with = "hex_bytes")]
    pub policy_params: Vec<u8>,
    /// Voting opens.
    pub start_time: i64,
    /// Voting closes (exclusive).
    pub end_time: i64,
    /// Quadratic voting power in favour.
    pub yes_power: u64,
    /// Quadratic voting power against.
    pub no_power: u64,
    /// When the proposal passed; `0` until then.
    pub passed_at: i64,
    /// Lifecycle state.
    pub status: ProposalStatus,
    /// Structural tag byte.
    pub bump: u8,
}

impl AccountLayout for PolicyProposal {
    const NAME: &'static str = "PolicyProposal";
    // params are stored length-prefixed in a fixed reserved region
    const LEN: usize = 8 + 8 + 32 + 1 + 4 + MAX_POLICY_PARAMS_LEN + 8 + 8 + 8 + 8 + 8 + 1 + 1;

    fn write_fields(&self, writer: &mut RecordWriter) {
        let len = self.policy_params.len().min(MAX_POLICY_PARAMS_LEN);
        let mut reserved = [0u8; MAX_POLICY_PARAMS_LEN];
        reserved[..len].copy_from_slice(&self.policy_params[..len]);

        writer.put_u64(self.id);
        writer.put_bytes(&self.proposer);
        writer.put_u8(self.policy_type.code());
        writer.put_u32(u32::try_from(len).unwrap_or(0));
        writer.put_bytes(&reserved);
        writer.put_i64(self.start_time);
        writer.put_i64(self.end_time);
        writer.put_u64(self.yes_power);
        writer.put_u64(self.no_power);
        writer.put_i64(self.passed_at);
        writer.put_u8(self.status.code());
        writer.put_u8(self.bump);
    }

    fn read_fields(reader: &mut RecordReader<'_>) -> Result<Self, LayoutError> {
        let id = reader.read_u64()?;
        let proposer = reader.take_array()?;
        let type_code = reader.read_u8()?;
        let policy_type = PolicyType::from_code(type_code).ok_or(LayoutError::InvalidTag {
            field: "policy_type",
            value: type_code,
        })?;

        let declared = usize::try_from(reader.read_u32()?).unwrap_or(usize::MAX);
        let reserved = reader.read_slice(MAX_POLICY_PARAMS_LEN)?;
        let policy_params = reserved
            .get(..declared)
            .ok_or(LayoutError::FieldTooLong {
                field: "policy_params",
                len: declared,
                max: MAX_POLICY_PARAMS_LEN,
            })?
            .to_vec();

        Ok(Self {
            id,
            proposer,
            policy_type,
            policy_params,
            start_time: reader.read_i64()?,
            end_time: reader.read_i64()?,
            yes_power: reader.read_u64()?,
            no_power: reader.read_u64()?,
            passed_at: reader.read_i64()?,
            status: ProposalStatus::from_code(reader.read_u8()?)?,
            bump: reader.read_u8()?,
        })
    }
}

/// One agent's vote on one proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteRecord {
    /// Proposal voted on.
    pub proposal_id: u64,
    /// Voting agent.
    #[serde(with = "hex_key")]
    pub agent: AgentIdentity,
    /// Stake backing the vote.
    pub stake_amount: u64,
    /// `integer_sqrt(stake_amount)`.
    pub voting_power: u64,
    /// `true` for yes.
    pub prediction: bool,
    /// When the vote was cast.
    pub timestamp: i64,
    /// Structural tag byte.
    pub bump: u8,
}

impl AccountLayout for VoteRecord {
    const NAME: &'static str = "VoteRecord";
    const LEN: usize = 8 + 8 + 32 + 8 + 8 + 1 + 8 + 1;

    fn write_fields(&self, writer: &mut RecordWriter) {
        writer.put_u64(self.proposal_id);
        writer.put_bytes(&self.agent);
        writer.put_u64(self.stake_amount);
        writer.put_u64(self.voting_power);
        writer.put_bool(self.prediction);
        writer.put_i64(self.timestamp);
        writer.put_u8(self.bump);
    }

    fn read_fields(reader: &mut RecordReader<'_>) -> Result<Self, LayoutError> {
        Ok(Self {
            proposal_id: reader.read_u64()?,
            agent: reader.take_array()?,
            stake_amount: reader.read_u64()?,
            voting_power: reader.read_u64()?,
            prediction: reader.read_bool()?,
            timestamp: reader.read_i64()?,
            bump: reader.read_u8()?,
        })
    }
}

mod hex_key {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(key: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(key))
    }
}

fn hex_bytes<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}
