//! Warden runtime CLI.
//!
//! Loads the account store from SQLite, applies one instruction as a
//! transaction, and writes the store back only if the instruction
//! succeeded.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use warden::auth::{decode_key, Authenticator, SignedAction, SignedRequest};
use warden::config::WardenConfig;

use warden_runtime::accounts::AccountStore;
use warden_runtime::db::StateDb;
use warden_runtime::instructions::{InitializeParams, RecordingTransfer, DEFAULT_VHR_THRESHOLD_BPS};
use warden_runtime::{Program, ProgramError};

/// Warden runtime: applies signed agent actions to persisted state.
#[derive(Parser)]
#[command(name = "warden-runtime", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Create the global state and reserve vault.
    Init {
        /// Authority public key, hex.
        #[arg(long)]
        authority: String,
        /// Minimum vault health ratio in basis points.
        #[arg(long, default_value_t = DEFAULT_VHR_THRESHOLD_BPS)]
        vhr_threshold_bps: u16,
        /// Liabilities the vault backs.
        #[arg(long, default_value_t = 0)]
        liabilities: u64,
    },
    /// Register an agent with nonce 0.
    Register {
        /// Agent public key, hex.
        #[arg(long)]
        agent: String,
    },
    /// Authenticate and apply a signed request.
    Apply {
        /// Path to the JSON request.
        request: PathBuf,
        /// Runtime clock (default: now).
        #[arg(long)]
        now: Option<i64>,
    },
    /// Close voting on a proposal whose period has ended.
    Finalize {
        /// Proposal id.
        #[arg(long)]
        proposal: u64,
        /// Runtime clock (default: now).
        #[arg(long)]
        now: Option<i64>,
    },
    /// Execute a passed proposal after its delay.
    Execute {
        /// Proposal id.
        #[arg(long)]
        proposal: u64,
        /// Authority public key, hex.
        #[arg(long)]
        signer: String,
        /// Runtime clock (default: now).
        #[arg(long)]
        now: Option<i64>,
    },
    /// Pause or resume governance.
    CircuitBreaker {
        /// Breaker step.
        #[command(subcommand)]
        step: BreakerCommand,
    },
    /// Print every account as JSON.
    Show,
}

/// Circuit breaker steps.
#[derive(Subcommand)]
enum BreakerCommand {
    /// Start the activation timelock.
    Request {
        /// Authority public key, hex.
        #[arg(long)]
        signer: String,
        /// Runtime clock (default: now).
        #[arg(long)]
        now: Option<i64>,
    },
    /// Activate after the timelock has elapsed.
    Activate {
        /// Authority public key, hex.
        #[arg(long)]
        signer: String,
        /// Runtime clock (default: now).
        #[arg(long)]
        now: Option<i64>,
    },
    /// Deactivate immediately.
    Deactivate {
        /// Authority public key, hex.
        #[arg(long)]
        signer: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = WardenConfig::load()?;
    let _log_guard = warden::logging::init_production(&config.logging.logs_dir)?;

    let db = StateDb::open(&config.runtime.state_db).await?;
    let mut store = db.load_store().await?;
    let mut program = Program::new(
        Authenticator::new(config.auth.replay_window()),
        RecordingTransfer::default(),
    );

    let result = run(cli.command, &mut program, &mut store);
    match result {
        Ok(Some(output)) => {
            db.save_store(&store).await?;
            println!("{output}");
            Ok(())
        }
        Ok(None) => {
            println!("{}", show(&store)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "instruction failed, state unchanged");
            Err(e)
        }
    }
}

/// Apply a state-changing command and return its printable result, or
/// `None` for read-only commands.
fn run(
    command: Command,
    program: &mut Program<RecordingTransfer>,
    store: &mut AccountStore,
) -> anyhow::Result<Option<String>> {
    let output = match command {
        Command::Init {
            authority,
            vhr_threshold_bps,
            liabilities,
        } => {
            let params = InitializeParams {
                authority: decode_key(&authority).context("invalid authority key")?,
                vhr_threshold_bps,
                liabilities,
            };
            program.initialize(store, &params).map_err(program_error)?;
            "initialized".to_owned()
        }
        Command::Register { agent } => {
            let agent = decode_key(&agent).context("invalid agent key")?;
            let address = program
                .register_agent(store, &agent)
                .map_err(program_error)?;
            hex::encode(address)
        }
        Command::Apply { request, now } => {
            let signed = read_request(&request)?;
            let outcome = program
                .process(store, &signed, clock(now))
                .map_err(program_error)?;
            info!(nonce = signed.nonce, "request applied");
            serde_json::to_string_pretty(&outcome)?
        }
        Command::Finalize { proposal, now } => {
            let status = program
                .finalize_proposal(store, proposal, clock(now))
                .map_err(program_error)?;
            serde_json::to_string(&status)?
        }
        Command::Execute {
            proposal,
            signer,
            now,
        } => {
            let signer = decode_key(&signer).context("invalid signer key")?;
            program
                .execute_proposal(store, &signer, proposal, clock(now))
                .map_err(program_error)?;
            format!("proposal {proposal} executed")
        }
        Command::CircuitBreaker { step } => run_breaker(step, program, store)?,
        Command::Show => return Ok(None),
    };
    Ok(Some(output))
}

fn run_breaker(
    step: BreakerCommand,
    program: &mut Program<RecordingTransfer>,
    store: &mut AccountStore,
) -> anyhow::Result<String> {
    let output = match step {
        BreakerCommand::Request { signer, now } => {
            let signer = decode_key(&signer).context("invalid signer key")?;
            let activatable_at = program
                .request_circuit_breaker(store, &signer, clock(now))
                .map_err(program_error)?;
            format!("circuit breaker requested, activatable at {activatable_at}")
        }
        BreakerCommand::Activate { signer, now } => {
            let signer = decode_key(&signer).context("invalid signer key")?;
            program
                .activate_circuit_breaker(store, &signer, clock(now))
                .map_err(program_error)?;
            "circuit breaker active".to_owned()
        }
        BreakerCommand::Deactivate { signer } => {
            let signer = decode_key(&signer).context("invalid signer key")?;
            program
                .deactivate_circuit_breaker(store, &signer)
                .map_err(program_error)?;
            "circuit breaker inactive".to_owned()
        }
    };
    Ok(output)
}

fn clock(now: Option<i64>) -> i64 {
    now.unwrap_or_else(|| chrono::Utc::now().timestamp())
}

fn read_request(path: &Path) -> anyhow::Result<SignedAction> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request {}", path.display()))?;
    let request: SignedRequest = serde_json::from_str(&raw).context("invalid request JSON")?;
    SignedAction::try_from(request).context("malformed request")
}

fn show(store: &AccountStore) -> anyhow::Result<String> {
    let accounts: serde_json::Map<String, serde_json::Value> = store
        .iter()
        .map(|(address, account)| Ok((hex::encode(address), serde_json::to_value(account)?)))
        .collect::<serde_json::Result<_>>()?;
    Ok(serde_json::to_string_pretty(&accounts)?)
}

fn program_error(e: ProgramError) -> anyhow::Error {
    anyhow::anyhow!("{} ({})", e, e.code())
}
