//! Canonical message encoding.

use warden::auth::{canonical_message, ActionPayload, PolicyType, MESSAGE_VERSION};

const AGENT: [u8; 32] = [0xAB; 32];

#[test]
fn header_is_tag_version_discriminator_agent() {
    let msg = canonical_message(&AGENT, &ActionPayload::Deposit { amount: 1 }, 1, 2);
    assert_eq!(&msg[..6], b"WARDEN");
    assert_eq!(msg[6], MESSAGE_VERSION);
    assert_eq!(msg[7], 3);
    assert_eq!(&msg[8..40], &AGENT);
}

#[test]
fn nonce_and_timestamp_close_the_message() {
    let msg = canonical_message(&AGENT, &ActionPayload::Withdraw { amount: 9 }, 77, -5);
    let tail = &msg[msg.len() - 16..];
    assert_eq!(&tail[..8], &77u64.to_le_bytes());
    assert_eq!(&tail[8..], &(-5i64).to_le_bytes());
}

#[test]
fn params_are_length_prefixed() {
    let a = ActionPayload::CreateProposal {
        policy_type: PolicyType::Mint,
        policy_params: vec![1, 2],
        duration_secs: 3_600,
    };
    let b = ActionPayload::CreateProposal {
        policy_type: PolicyType::Mint,
        policy_params: vec![1],
        duration_secs: 3_600,
    };
    let ma = canonical_message(&AGENT, &a, 1, 0);
    let mb = canonical_message(&AGENT, &b, 1, 0);
    assert_eq!(ma.len(), mb.len() + 1);
    // policy type code, then the u32 length prefix
    assert_eq!(ma[40], 0);
    assert_eq!(&ma[41..45], &2u32.to_le_bytes());
    assert_ne!(ma, mb);
}

#[test]
fn encoding_is_deterministic() {
    let action = ActionPayload::Vote {
        proposal_id: 1,
        prediction: false,
        stake_amount: 5,
    };
    assert_eq!(
        canonical_message(&AGENT, &action, 3, 4),
        canonical_message(&AGENT, &action, 3, 4)
    );
}

#[test]
fn agent_identity_is_bound() {
    let action = ActionPayload::Deposit { amount: 1 };
    assert_ne!(
        canonical_message(&AGENT, &action, 1, 0),
        canonical_message(&[0xCD; 32], &action, 1, 0)
    );
}
