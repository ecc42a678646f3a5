//! Warden agent CLI.
//!
//! Off-chain tooling for agents: generate keys, sign actions in the
//! canonical format, check a request against a stored nonce, and compute
//! deterministic voting power.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use tracing::info;

use warden::auth::{
    decode_key, ActionPayload, AgentAuthState, Authenticator, SignedAction, SignedRequest,
};
use warden::config::WardenConfig;
use warden::math;

/// Warden: agent-side tooling for signed reserve actions.
#[derive(Parser)]
#[command(name = "warden", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Generate a new Ed25519 agent key pair.
    Keygen,
    /// Sign an action and print the JSON request.
    Sign {
        /// Secret key, 32 bytes hex.
        #[arg(long, env = "WARDEN_AGENT_SECRET", hide_env_values = true)]
        secret: String,
        /// Nonce to declare; must exceed the agent's stored nonce.
        #[arg(long)]
        nonce: u64,
        /// Unix timestamp to declare (default: now).
        #[arg(long)]
        timestamp: Option<i64>,
        /// Action as JSON, e.g. `{"kind":"deposit","amount":5}`.
        #[arg(long)]
        action: String,
    },
    /// Check a signed request against a stored nonce.
    Verify {
        /// Path to the JSON request.
        request: PathBuf,
        /// Agent's currently stored nonce.
        #[arg(long, default_value_t = 0)]
        stored_nonce: u64,
        /// Verifier clock (default: now).
        #[arg(long)]
        now: Option<i64>,
    },
    /// Quadratic voting power for a stake.
    Power {
        /// Stake in raw fixed-point units.
        stake: u64,
    },
    /// Integer square root.
    Sqrt {
        /// Input value.
        value: u64,
        /// Treat the input as a 6-decimal fixed-point value.
        #[arg(long)]
        scaled: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    warden::logging::init_cli();

    match cli.command {
        Command::Keygen => handle_keygen(),
        Command::Sign {
            secret,
            nonce,
            timestamp,
            action,
        } => handle_sign(&secret, nonce, timestamp, &action),
        Command::Verify {
            request,
            stored_nonce,
            now,
        } => handle_verify(&request, stored_nonce, now),
        Command::Power { stake } => {
            let power = math::voting_power(stake).context("voting power rejected")?;
            println!("{power}");
            Ok(())
        }
        Command::Sqrt { value, scaled } => {
            let root = if scaled {
                math::sqrt_scaled(value).context("scaled sqrt rejected")?
            } else {
                math::integer_sqrt(value)
            };
            println!("{root}");
            Ok(())
        }
    }
}

fn handle_keygen() -> anyhow::Result<()> {
    let key = SigningKey::generate(&mut rand::rngs::OsRng);
    let out = serde_json::json!({
        "public_key": hex::encode(key.verifying_key().to_bytes()),
        "secret_key": hex::encode(key.to_bytes()),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn handle_sign(
    secret: &str,
    nonce: u64,
    timestamp: Option<i64>,
    action: &str,
) -> anyhow::Result<()> {
    let secret = decode_key(secret).context("invalid secret key")?;
    let key = SigningKey::from_bytes(&secret);
    let action: ActionPayload = serde_json::from_str(action).context("invalid action JSON")?;
    let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());

    let signed = SignedAction::sign(&key, action, nonce, timestamp);
    let request = SignedRequest::from(&signed);
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

fn handle_verify(path: &Path, stored_nonce: u64, now: Option<i64>) -> anyhow::Result<()> {
    let config = WardenConfig::load()?;
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request {}", path.display()))?;
    let request: SignedRequest = serde_json::from_str(&raw).context("invalid request JSON")?;
    let signed = SignedAction::try_from(request).context("malformed request")?;

    let mut state = AgentAuthState::restore(signed.public_key, stored_nonce, 0, 0);
    let now = now.unwrap_or_else(|| chrono::Utc::now().timestamp());
    let authenticator = Authenticator::new(config.auth.replay_window());

    authenticator
        .verify(&signed, now, &mut state)
        .context("verification failed")?;

    info!(nonce = state.nonce(), "request verified");
    println!("ok");
    Ok(())
}
