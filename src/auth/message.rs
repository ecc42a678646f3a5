//! Canonical encoding of agent actions.
//!
//! The signer and the verifier build the same byte string:
//!
//! ```text
//! "WARDEN" | version u8 | discriminator u8 | agent [u8; 32]
//!          | payload (fixed-width LE, u32 length before variable bytes)
//!          | nonce u64 LE | timestamp i64 LE
//! ```
//!
//! There are no delimiters to confuse and every integer has a fixed width,
//! so two different actions can never share an encoding.

use serde::{Deserialize, Serialize};

use crate::layout::RecordWriter;

/// Domain tag that prefixes every signed message.
pub const DOMAIN_TAG: &[u8; 6] = b"WARDEN";

/// Current message encoding version.
pub const MESSAGE_VERSION: u8 = 1;

/// Largest `policy_params` blob a proposal may carry.
pub const MAX_POLICY_PARAMS_LEN: usize = 256;

/// Kind of monetary policy a proposal asks to enact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    /// Mint reserve units.
    Mint,
    /// Burn reserve units.
    Burn,
    /// Change the target collateral ratio.
    UpdateCollateralRatio,
    /// Rebalance vault asset weights.
    RebalanceVault,
}

impl PolicyType {
    /// Stable wire code.
    pub fn code(self) -> u8 {
        match self {
            Self::Mint => 0,
            Self::Burn => 1,
            Self::UpdateCollateralRatio => 2,
            Self::RebalanceVault => 3,
        }
    }

    /// Parse a wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Mint),
            1 => Some(Self::Burn),
            2 => Some(Self::UpdateCollateralRatio),
            3 => Some(Self::RebalanceVault),
            _ => None,
        }
    }
}

/// The action an agent asks the program to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    /// Open a new policy proposal.
    CreateProposal {
        /// Policy to enact if the proposal passes.
        policy_type: PolicyType,
        /// Opaque, policy-specific parameters.
        policy_params: Vec<u8>,
        /// Voting period in seconds.
        duration_secs: i64,
    },
    /// Vote on an open proposal.
    Vote {
        /// Target proposal.
        proposal_id: u64,
        /// `true` for yes.
        prediction: bool,
        /// Stake backing the vote, in raw fixed-point units.
        stake_amount: u64,
    },
    /// Move funds into the reserve vault.
    Deposit {
        /// Amount in raw fixed-point units.
        amount: u64,
    },
    /// Move funds out of the reserve vault.
    Withdraw {
        /// Amount in raw fixed-point units.
        amount: u64,
    },
    /// Stamp the vault's rebalance time.
    Rebalance,
}

impl ActionPayload {
    /// Per-action discriminator byte.
    pub fn discriminator(&self) -> u8 {
        match self {
            Self::CreateProposal { .. } => 1,
            Self::Vote { .. } => 2,
            Self::Deposit { .. } => 3,
            Self::Withdraw { .. } => 4,
            Self::Rebalance => 5,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateProposal { .. } => "create_proposal",
            Self::Vote { .. } => "vote",
            Self::Deposit { .. } => "deposit",
            Self::Withdraw { .. } => "withdraw",
            Self::Rebalance => "rebalance",
        }
    }

    fn write_payload(&self, writer: &mut RecordWriter) {
        match self {
            Self::CreateProposal {
                policy_type,
                policy_params,
                duration_secs,
            } => {
                writer.put_u8(policy_type.code());
                // Lengths past u32::MAX saturate. Such a proposal still
                // fails the handler's size check once authenticated.
                writer.put_u32(u32::try_from(policy_params.len()).unwrap_or(u32::MAX));
                writer.put_bytes(policy_params);
                writer.put_i64(*duration_secs);
            }
            Self::Vote {
                proposal_id,
                prediction,
                stake_amount,
            } => {
                writer.put_u64(*proposal_id);
                writer.put_bool(*prediction);
                writer.put_u64(*stake_amount);
            }
            Self::Deposit { amount } | Self::Withdraw { amount } => {
                writer.put_u64(*amount);
            }
            Self::Rebalance => {}
        }
    }
}

/// Build the exact bytes an agent signs for `action`.
pub fn canonical_message(
    agent: &[u8; 32],
    action: &ActionPayload,
    nonce: u64,
    timestamp: i64,
) -> Vec<u8> {
    let mut writer = RecordWriter::with_capacity(128);
    writer.put_bytes(DOMAIN_TAG);
    writer.put_u8(MESSAGE_VERSION);
    writer.put_u8(action.discriminator());
    writer.put_bytes(agent);
    action.write_payload(&mut writer);
    writer.put_u64(nonce);
    writer.put_i64(timestamp);
    writer.into_inner()
}
