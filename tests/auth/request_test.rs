//! JSON request form.

use ed25519_dalek::SigningKey;

use warden::auth::{ActionPayload, PolicyType, SignedAction, SignedRequest};

#[test]
fn action_json_uses_kind_tag() {
    let json = r#"{"kind":"create_proposal","policy_type":"rebalance_vault","policy_params":[7,8],"duration_secs":7200}"#;
    let action: ActionPayload = serde_json::from_str(json).expect("parse action");
    assert_eq!(
        action,
        ActionPayload::CreateProposal {
            policy_type: PolicyType::RebalanceVault,
            policy_params: vec![7, 8],
            duration_secs: 7_200,
        }
    );
}

#[test]
fn request_carries_hex_key_and_base64_signature() {
    let key = SigningKey::from_bytes(&[6u8; 32]);
    let signed = SignedAction::sign(&key, ActionPayload::Deposit { amount: 3 }, 1, 10);
    let request = SignedRequest::from(&signed);

    assert_eq!(request.agent, hex::encode(key.verifying_key().to_bytes()));
    assert_eq!(request.agent.len(), 64);
    assert_eq!(request.signature.len(), 88);
    assert_eq!(SignedAction::try_from(request), Ok(signed));
}
