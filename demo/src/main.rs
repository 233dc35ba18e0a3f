//! LRI identity continuity runtime: command-line driver.
//!
//! Runs single authorize-then-commit cycles and the read-only audit views
//! against an in-memory ledger, or a JSON file ledger with `--store-dir`.
//!
//! Usage:
//!   cargo run -p lri-demo -- scenario
//!   cargo run -p lri-demo -- --store-dir ./state cycle --subject a1 --action study --intention learn
//!   cargo run -p lri-demo -- --store-dir ./state continuity --subject a1
//!
//! Exit status is 1 on error, 2 when `continuity --strict` finds a broken
//! chain, and 3 when the authority gate refuses an action.

mod runtime;
mod scenario;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use lri_contracts::{
    authority::Context,
    cycle::ActionRequest,
    error::{ErrorClass, LriError, LriResult},
    identity::SubjectId,
};

use crate::runtime::{Runtime, RuntimeOptions};

const EXIT_ERROR: i32 = 1;
const EXIT_BROKEN_CHAIN: i32 = 2;
const EXIT_DENIED: i32 = 3;

// ── CLI definition ────────────────────────────────────────────────────────────

/// LRI: identity continuity runtime for autonomous agents.
#[derive(Parser)]
#[command(
    name = "lri-demo",
    about = "LRI identity continuity runtime",
    long_about = "Runs authorize-then-commit cycles against a hash-chained identity ledger\n\
                  and prints audit snapshots, continuity reports, drift, and authority claims."
)]
struct Cli {
    /// Persist identity records as JSON files in this directory.
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// TOML authority policy. The reference policy is used when absent.
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Append committed decisions to this JSONL file.
    #[arg(long, global = true)]
    dmp_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one cycle and print the resulting snapshot.
    Cycle {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        action: String,
        /// Declared intention; "unknown" when omitted.
        #[arg(long)]
        intention: Option<String>,
        /// Context entry as key=value. JSON values are parsed, anything else is a string.
        #[arg(long = "context", value_parser = parse_context_entry)]
        context: Vec<(String, serde_json::Value)>,
    },
    /// Print the audit snapshot for a subject.
    Snapshot {
        #[arg(long)]
        subject: String,
    },
    /// Print head hash, chain length, and verification status.
    Continuity {
        #[arg(long)]
        subject: String,
        /// Exit with status 2 when the chain does not verify.
        #[arg(long)]
        strict: bool,
    },
    /// Print current drift and sample counts.
    Drift {
        #[arg(long)]
        subject: String,
    },
    /// Print authority claims under the active policy.
    Claims {
        #[arg(long)]
        subject: String,
    },
    /// Run the scripted two-agent walkthrough.
    Scenario,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for per-phase output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let options = RuntimeOptions {
        store_dir: cli.store_dir,
        policy: cli.policy,
        dmp_log: cli.dmp_log,
    };

    let result = Runtime::build(&options).and_then(|runtime| dispatch(&runtime, cli.command));

    if let Err(e) = result {
        eprintln!("lri-demo: {}", e);
        std::process::exit(exit_code(&e));
    }
}

fn dispatch(runtime: &Runtime, command: Command) -> LriResult<()> {
    match command {
        Command::Cycle {
            subject,
            action,
            intention,
            context,
        } => {
            let request = build_request(subject, action, intention, context);
            print_json(&runtime.engine.run_cycle(&request)?)
        }
        Command::Snapshot { subject } => {
            print_json(&runtime.observer.snapshot(&SubjectId::new(subject))?)
        }
        Command::Continuity { subject, strict } => {
            let report = runtime.observer.continuity(&SubjectId::new(subject))?;
            print_json(&report)?;
            if strict {
                lri_ledger::ensure_verified(&report)?;
            }
            Ok(())
        }
        Command::Drift { subject } => {
            print_json(&runtime.observer.drift(&SubjectId::new(subject))?)
        }
        Command::Claims { subject } => {
            print_json(&runtime.observer.authority_claims(&SubjectId::new(subject))?)
        }
        Command::Scenario => scenario::run(runtime),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn exit_code(e: &LriError) -> i32 {
    match e.class() {
        ErrorClass::Forbidden => EXIT_DENIED,
        ErrorClass::IntegrityFinding => EXIT_BROKEN_CHAIN,
        ErrorClass::ServerFault | ErrorClass::Configuration => EXIT_ERROR,
    }
}

fn build_request(
    subject: String,
    action: String,
    intention: Option<String>,
    context: Vec<(String, serde_json::Value)>,
) -> ActionRequest {
    let mut request = ActionRequest::new(subject, action);
    if let Some(intention) = intention {
        request = request.with_intention(intention);
    }
    if !context.is_empty() {
        request = request.with_context(context.into_iter().collect::<Context>());
    }
    request
}

fn parse_context_entry(s: &str) -> Result<(String, serde_json::Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    let value =
        serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

pub(crate) fn to_pretty<T: Serialize>(value: &T) -> LriResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| LriError::Serialization {
        reason: format!("failed to render JSON: {}", e),
    })
}

fn print_json<T: Serialize>(value: &T) -> LriResult<()> {
    println!("{}", to_pretty(value)?);
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
