//! Authentication checks through `Authenticator::verify` and
//! `verify_agent_signature`.

use ed25519_dalek::SigningKey;

use warden::auth::{
    verify_agent_signature, ActionPayload, AgentAuthState, AuthError, Authenticator,
    ReplayWindow, SignedAction,
};

const NOW: i64 = 1_700_000_000;

fn key() -> SigningKey {
    SigningKey::from_bytes(&[42u8; 32])
}

fn state_with_nonce(nonce: u64) -> AgentAuthState {
    AgentAuthState::restore(key().verifying_key().to_bytes(), nonce, NOW - 600, 255)
}

fn vote() -> ActionPayload {
    ActionPayload::Vote {
        proposal_id: 3,
        prediction: true,
        stake_amount: 10_000_000,
    }
}

#[test]
fn valid_action_sets_nonce_and_timestamp_exactly() {
    let mut state = state_with_nonce(5);
    let signed = SignedAction::sign(&key(), vote(), 9, NOW - 10);

    assert_eq!(Authenticator::default().verify(&signed, NOW, &mut state), Ok(()));
    assert_eq!(state.nonce(), 9);
    assert_eq!(state.last_action_timestamp(), NOW - 10);
}

#[test]
fn five_then_six_then_replay() {
    let mut state = state_with_nonce(5);
    let action = vote();
    let signed = SignedAction::sign(&key(), action.clone(), 6, NOW);

    let result = verify_agent_signature(
        &signed.signature,
        &signed.public_key,
        6,
        NOW,
        &action,
        NOW + 1,
        &mut state,
    );
    assert_eq!(result, Ok(()));
    assert_eq!(state.nonce(), 6);

    let snapshot = state.clone();
    let replay = verify_agent_signature(
        &signed.signature,
        &signed.public_key,
        6,
        NOW,
        &action,
        NOW + 2,
        &mut state,
    );
    assert_eq!(replay, Err(AuthError::InvalidNonce));
    assert_eq!(state, snapshot);
}

#[test]
fn lower_or_equal_nonce_is_rejected_without_mutation() {
    for declared in [0, 4, 5] {
        let mut state = state_with_nonce(5);
        let snapshot = state.clone();
        let signed = SignedAction::sign(&key(), vote(), declared, NOW);
        assert_eq!(
            Authenticator::default().verify(&signed, NOW, &mut state),
            Err(AuthError::InvalidNonce),
            "nonce {declared}"
        );
        assert_eq!(state, snapshot);
    }
}

#[test]
fn any_altered_field_fails_the_signature() {
    let signed = SignedAction::sign(&key(), vote(), 6, NOW);

    let mut flipped_sig = signed.clone();
    flipped_sig.signature[10] ^= 0x01;

    let mut other_nonce = signed.clone();
    other_nonce.nonce = 7;

    let mut other_time = signed.clone();
    other_time.timestamp = NOW + 1;

    let mut other_action = signed.clone();
    other_action.action = ActionPayload::Vote {
        proposal_id: 3,
        prediction: false,
        stake_amount: 10_000_000,
    };

    let mut other_kind = signed.clone();
    other_kind.action = ActionPayload::Deposit { amount: 10_000_000 };

    for (label, tampered) in [
        ("signature", flipped_sig),
        ("nonce", other_nonce),
        ("timestamp", other_time),
        ("payload", other_action),
        ("kind", other_kind),
    ] {
        let mut state = state_with_nonce(5);
        assert_eq!(
            Authenticator::default().verify(&tampered, NOW, &mut state),
            Err(AuthError::InvalidSignature),
            "altered {label}"
        );
        assert_eq!(state.nonce(), 5);
    }
}

#[test]
fn small_order_key_is_rejected() {
    // Encoding of the identity point.
    let mut weak = [0u8; 32];
    weak[0] = 1;
    let mut state = AgentAuthState::restore(weak, 0, 0, 255);
    let signed = SignedAction {
        signature: [0u8; 64],
        public_key: weak,
        nonce: 1,
        timestamp: NOW,
        action: vote(),
    };
    assert_eq!(
        Authenticator::default().verify(&signed, NOW, &mut state),
        Err(AuthError::InvalidSignature)
    );
}

#[test]
fn stale_and_future_timestamps_expire() {
    for declared in [NOW - 301, NOW + 301, NOW - 300, NOW + 300] {
        let mut state = state_with_nonce(5);
        let signed = SignedAction::sign(&key(), vote(), 6, declared);
        assert_eq!(
            Authenticator::default().verify(&signed, NOW, &mut state),
            Err(AuthError::SignatureExpired),
            "declared {declared}"
        );
        assert_eq!(state.nonce(), 5);
    }
}

#[test]
fn inclusive_window_accepts_exact_boundary() {
    let authenticator = Authenticator::new(ReplayWindow {
        max_skew_secs: 300,
        inclusive: true,
    });
    for declared in [NOW - 300, NOW + 300] {
        let mut state = state_with_nonce(5);
        let signed = SignedAction::sign(&key(), vote(), 6, declared);
        assert_eq!(authenticator.verify(&signed, NOW, &mut state), Ok(()));
    }

    let mut state = state_with_nonce(5);
    let signed = SignedAction::sign(&key(), vote(), 6, NOW - 301);
    assert_eq!(
        authenticator.verify(&signed, NOW, &mut state),
        Err(AuthError::SignatureExpired)
    );
}

#[test]
fn expiry_is_reported_before_nonce() {
    let mut state = state_with_nonce(5);
    let signed = SignedAction::sign(&key(), vote(), 1, NOW - 1_000);
    assert_eq!(
        Authenticator::default().verify(&signed, NOW, &mut state),
        Err(AuthError::SignatureExpired)
    );
}

#[test]
fn error_messages_hide_stored_values() {
    let mut state = state_with_nonce(123_456);
    let signed = SignedAction::sign(&key(), vote(), 1, NOW);
    let err = Authenticator::default()
        .verify(&signed, NOW, &mut state)
        .expect_err("stale nonce");
    assert!(!err.to_string().contains("123456"));
}
