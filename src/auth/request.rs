//! JSON wire form of a signed action.
//!
//! Off-chain callers submit requests as JSON; keys travel as hex and
//! signatures as standard base64. Conversion into [`SignedAction`] checks
//! lengths only, the cryptographic checks happen in the authenticator.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::{ActionPayload, SignedAction};

/// Request decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// The agent key is not 32 bytes of hex.
    #[error("malformed agent key: {0}")]
    MalformedKey(String),

    /// The signature is not 64 bytes of base64.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
}

/// A signed action as submitted over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    /// Agent public key, hex.
    pub agent: String,
    /// Ed25519 signature, base64.
    pub signature: String,
    /// Declared nonce.
    pub nonce: u64,
    /// Declared Unix timestamp.
    pub timestamp: i64,
    /// The requested action.
    pub action: ActionPayload,
}

impl From<&SignedAction> for SignedRequest {
    fn from(signed: &SignedAction) -> Self {
        Self {
            agent: hex::encode(signed.public_key),
            signature: STANDARD.encode(signed.signature),
            nonce: signed.nonce,
            timestamp: signed.timestamp,
            action: signed.action.clone(),
        }
    }
}

impl TryFrom<SignedRequest> for SignedAction {
    type Error = RequestError;

    fn try_from(request: SignedRequest) -> Result<Self, Self::Error> {
        let public_key = decode_key(&request.agent)?;

        let sig_bytes = STANDARD
            .decode(request.signature.trim())
            .map_err(|e| RequestError::MalformedSignature(e.to_string()))?;
        let signature: [u8; 64] = sig_bytes.try_into().map_err(|v: Vec<u8>| {
            RequestError::MalformedSignature(format!("expected 64 bytes, got {}", v.len()))
        })?;

        Ok(SignedAction {
            signature,
            public_key,
            nonce: request.nonce,
            timestamp: request.timestamp,
            action: request.action,
        })
    }
}

/// Decode a hex-encoded 32-byte key.
///
/// # Errors
///
/// Returns [`RequestError::MalformedKey`] for bad hex or a wrong length.
pub fn decode_key(encoded: &str) -> Result<[u8; 32], RequestError> {
    let bytes =
        hex::decode(encoded.trim()).map_err(|e| RequestError::MalformedKey(e.to_string()))?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        RequestError::MalformedKey(format!("expected 32 bytes, got {}", v.len()))
    })
}
