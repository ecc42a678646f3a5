//! Agent action authentication.
//!
//! An action is accepted only when all of the following hold, checked in
//! this order and before any state is touched:
//! 1. the presented key is the key registered for the agent;
//! 2. the Ed25519 signature verifies (strictly) over the canonical message;
//! 3. the declared timestamp is inside the replay window of the verifier's
//!    clock, in either direction;
//! 4. the declared nonce is strictly greater than the stored nonce.
//!
//! On success the stored nonce and timestamp advance. Undoing that advance
//! when a later step of the same operation fails is the job of the enclosing
//! transaction, not of this module.

pub mod message;
pub mod request;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::layout::{AccountLayout, LayoutError, RecordReader, RecordWriter};

pub use message::{
    canonical_message, ActionPayload, PolicyType, DOMAIN_TAG, MAX_POLICY_PARAMS_LEN, MESSAGE_VERSION,
};
pub use request::{decode_key, RequestError, SignedRequest};

/// Raw Ed25519 public key identifying an agent.
pub type AgentIdentity = [u8; 32];

/// Raw Ed25519 signature.
pub type SignatureBytes = [u8; 64];

/// Default replay window: five minutes either side of the verifier's clock.
pub const DEFAULT_REPLAY_WINDOW_SECS: i64 = 300;

/// Authentication failures.
///
/// Messages name the failed check only; stored nonce and timestamp values
/// never appear in them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The signature does not verify over the canonical message.
    #[error("invalid agent signature")]
    InvalidSignature,

    /// The declared timestamp falls outside the replay window.
    #[error("signature expired")]
    SignatureExpired,

    /// The declared nonce does not advance the agent's nonce.
    #[error("invalid nonce")]
    InvalidNonce,

    /// The presented key is not the key registered for this agent.
    #[error("agent public key mismatch")]
    AgentMismatch,
}

/// Per-agent replay-protection record.
///
/// Fields are private: only registration ([`AgentAuthState::new`]),
/// persistence ([`AccountLayout::decode`]) and successful verification
/// produce or change a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAuthState {
    agent_identity: AgentIdentity,
    nonce: u64,
    last_action_timestamp: i64,
    bump: u8,
}

impl AgentAuthState {
    /// Fresh record for a newly registered agent (nonce 0).
    pub fn new(agent_identity: AgentIdentity, bump: u8) -> Self {
        Self {
            agent_identity,
            nonce: 0,
            last_action_timestamp: 0,
            bump,
        }
    }

    /// Rebuild a record from values read back from storage.
    pub fn restore(
        agent_identity: AgentIdentity,
        nonce: u64,
        last_action_timestamp: i64,
        bump: u8,
    ) -> Self {
        Self {
            agent_identity,
            nonce,
            last_action_timestamp,
            bump,
        }
    }

    /// The agent's registered public key.
    pub fn agent_identity(&self) -> &AgentIdentity {
        &self.agent_identity
    }

    /// Highest nonce accepted so far.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Timestamp of the most recently accepted action.
    pub fn last_action_timestamp(&self) -> i64 {
        self.last_action_timestamp
    }

    /// Structural tag byte stored with the record.
    pub fn bump(&self) -> u8 {
        self.bump
    }
}

impl AccountLayout for AgentAuthState {
    const NAME: &'static str = "AgentAuthState";
    // discriminator + identity + nonce + timestamp + tag
    const LEN: usize = 8 + 32 + 8 + 8 + 1;

    fn write_fields(&self, writer: &mut RecordWriter) {
        writer.put_bytes(&self.agent_identity);
        writer.put_u64(self.nonce);
        writer.put_i64(self.last_action_timestamp);
        writer.put_u8(self.bump);
    }

    fn read_fields(reader: &mut RecordReader<'_>) -> Result<Self, LayoutError> {
        Ok(Self {
            agent_identity: reader.take_array()?,
            nonce: reader.read_u64()?,
            last_action_timestamp: reader.read_i64()?,
            bump: reader.read_u8()?,
        })
    }
}

/// Accepted clock skew between a declared timestamp and the verifier's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayWindow {
    /// Maximum distance in seconds, applied in both directions.
    pub max_skew_secs: i64,
    /// Whether a distance of exactly `max_skew_secs` is accepted.
    pub inclusive: bool,
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self {
            max_skew_secs: DEFAULT_REPLAY_WINDOW_SECS,
            inclusive: false,
        }
    }
}

impl ReplayWindow {
    /// Whether `declared` is acceptable when the verifier's clock reads `now`.
    ///
    /// A difference that does not fit in `i64` is never acceptable.
    pub fn contains(&self, declared: i64, now: i64) -> bool {
        let Some(diff) = now.checked_sub(declared) else {
            return false;
        };
        let distance = diff.unsigned_abs();
        let max = self.max_skew_secs.unsigned_abs();
        if self.inclusive {
            distance <= max
        } else {
            distance < max
        }
    }
}

/// An action together with everything needed to authenticate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAction {
    /// Signature over [`SignedAction::message`].
    pub signature: SignatureBytes,
    /// Key the agent claims to sign with.
    pub public_key: AgentIdentity,
    /// Declared nonce.
    pub nonce: u64,
    /// Declared Unix timestamp.
    pub timestamp: i64,
    /// The requested action.
    pub action: ActionPayload,
}

impl SignedAction {
    /// Sign `action` off-chain with the agent's key.
    pub fn sign(signing_key: &SigningKey, action: ActionPayload, nonce: u64, timestamp: i64) -> Self {
        let public_key = signing_key.verifying_key().to_bytes();
        let signature = sign_action(signing_key, &action, nonce, timestamp);
        Self {
            signature,
            public_key,
            nonce,
            timestamp,
            action,
        }
    }

    /// Canonical bytes covered by the signature.
    pub fn message(&self) -> Vec<u8> {
        canonical_message(&self.public_key, &self.action, self.nonce, self.timestamp)
    }
}

/// Produce the signature an agent attaches to `action`.
pub fn sign_action(
    signing_key: &SigningKey,
    action: &ActionPayload,
    nonce: u64,
    timestamp: i64,
) -> SignatureBytes {
    let agent = signing_key.verifying_key().to_bytes();
    let message = canonical_message(&agent, action, nonce, timestamp);
    signing_key.sign(&message).to_bytes()
}

/// Verifies agent actions against their stored replay state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticator {
    window: ReplayWindow,
}

impl Authenticator {
    /// Create an authenticator with the given replay window.
    pub fn new(window: ReplayWindow) -> Self {
        Self { window }
    }

    /// The configured replay window.
    pub fn window(&self) -> ReplayWindow {
        self.window
    }

    /// Authenticate `signed` and advance `stored_state` on success.
    ///
    /// # Errors
    ///
    /// Returns the first failed check as an [`AuthError`]; `stored_state` is
    /// untouched in that case.
    pub fn verify(
        &self,
        signed: &SignedAction,
        current_time: i64,
        stored_state: &mut AgentAuthState,
    ) -> Result<(), AuthError> {
        let agent = short_id(&signed.public_key);

        let result = self.check(signed, current_time, stored_state);
        match result {
            Ok(()) => {
                stored_state.nonce = signed.nonce;
                stored_state.last_action_timestamp = signed.timestamp;
                debug!(
                    agent = %agent,
                    action = signed.action.name(),
                    nonce = signed.nonce,
                    "agent action authenticated"
                );
            }
            Err(e) => {
                warn!(
                    agent = %agent,
                    action = signed.action.name(),
                    error = %e,
                    "agent action rejected"
                );
            }
        }
        result
    }

    fn check(
        &self,
        signed: &SignedAction,
        current_time: i64,
        stored_state: &AgentAuthState,
    ) -> Result<(), AuthError> {
        if signed.public_key != stored_state.agent_identity {
            return Err(AuthError::AgentMismatch);
        }

        let key = VerifyingKey::from_bytes(&stored_state.agent_identity)
            .map_err(|_| AuthError::InvalidSignature)?;
        let signature = Signature::from_bytes(&signed.signature);
        key.verify_strict(&signed.message(), &signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        if !self.window.contains(signed.timestamp, current_time) {
            return Err(AuthError::SignatureExpired);
        }

        if signed.nonce <= stored_state.nonce {
            return Err(AuthError::InvalidNonce);
        }

        Ok(())
    }
}

/// Authenticate an agent action with the default five-minute window.
///
/// Shorthand for [`Authenticator::verify`] taking the action's parts
/// separately.
///
/// # Errors
///
/// See [`Authenticator::verify`].
pub fn verify_agent_signature(
    signature: &SignatureBytes,
    public_key: &AgentIdentity,
    declared_nonce: u64,
    declared_timestamp: i64,
    action_payload: &ActionPayload,
    current_time: i64,
    stored_state: &mut AgentAuthState,
) -> Result<(), AuthError> {
    let signed = SignedAction {
        signature: *signature,
        public_key: *public_key,
        nonce: declared_nonce,
        timestamp: declared_timestamp,
        action: action_payload.clone(),
    };
    Authenticator::default().verify(&signed, current_time, stored_state)
}

/// First four key bytes as hex, for log fields.
pub fn short_id(key: &AgentIdentity) -> String {
    hex::encode(&key[..4])
}
