//! CLI contract tests for the `warden` binary.

use std::process::Output;

use assert_cmd::Command;

fn warden(args: &[&str], envs: &[(&str, &str)]) -> Output {
    let mut cmd = Command::cargo_bin("warden").expect("binary");
    cmd.env_remove("WARDEN_AGENT_SECRET");
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd.args(args).output().expect("run warden")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_owned()
}

#[test]
fn power_prints_quadratic_power() {
    let output = warden(&["power", "10000000"], &[]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "3162");
}

#[test]
fn power_over_ceiling_fails() {
    let output = warden(&["power", "4294967296"], &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("math overflow"));
}

#[test]
fn sqrt_plain_and_scaled() {
    assert_eq!(stdout(&warden(&["sqrt", "99"], &[])), "9");
    assert_eq!(stdout(&warden(&["sqrt", "--scaled", "4000000"], &[])), "2000000");
}

#[test]
fn keygen_prints_hex_pair() {
    let output = warden(&["keygen"], &[]);
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(parsed["public_key"].as_str().map(str::len), Some(64));
    assert_eq!(parsed["secret_key"].as_str().map(str::len), Some(64));
}

#[test]
fn sign_then_verify() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("warden.toml");
    let config = config.to_str().expect("utf-8 path");
    let secret = hex::encode([5u8; 32]);

    let signed = warden(
        &[
            "sign",
            "--nonce",
            "6",
            "--timestamp",
            "1700000000",
            "--action",
            r#"{"kind":"deposit","amount":5}"#,
        ],
        &[("WARDEN_AGENT_SECRET", &secret)],
    );
    assert!(signed.status.success());
    let request_path = dir.path().join("request.json");
    std::fs::write(&request_path, &signed.stdout).expect("write request");
    let request_path = request_path.to_str().expect("utf-8 path");

    let ok = warden(
        &["verify", request_path, "--stored-nonce", "5", "--now", "1700000100"],
        &[("WARDEN_CONFIG_PATH", config)],
    );
    assert!(ok.status.success());
    assert_eq!(stdout(&ok), "ok");

    let replay = warden(
        &["verify", request_path, "--stored-nonce", "6", "--now", "1700000100"],
        &[("WARDEN_CONFIG_PATH", config)],
    );
    assert!(!replay.status.success());

    let expired = warden(
        &["verify", request_path, "--stored-nonce", "5", "--now", "1700000300"],
        &[("WARDEN_CONFIG_PATH", config)],
    );
    assert!(!expired.status.success());
}
