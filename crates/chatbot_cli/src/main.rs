mod chat;
mod engine;
mod server;

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chatbot_core::{evaluate_cases, read_eval_cases, DiscardQueryLog, DEFAULT_REQUIRED_PASS_RATE};
use clap::{Parser, Subcommand};
use engine::{EngineArgs, PolicyKind};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "chatbot", version, about = "Retrieval chatbot for college FAQs")]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive prompt on stdin/stdout.
    Chat {
        #[arg(long, value_enum, default_value_t = PolicyKind::Classifier)]
        policy: PolicyKind,
    },
    /// JSON API: POST /chatbot {"message": ...} -> {"response": ...}.
    Serve {
        #[arg(long, env = "CHATBOT_BIND", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,
        #[arg(long, value_enum, default_value_t = PolicyKind::Hybrid)]
        policy: PolicyKind,
    },
    /// Score a JSON array of cases against the corpus. Nothing is logged as unanswered.
    Eval {
        #[arg(long)]
        cases: PathBuf,
        #[arg(long, value_enum, default_value_t = PolicyKind::Hybrid)]
        policy: PolicyKind,
        #[arg(long, default_value_t = DEFAULT_REQUIRED_PASS_RATE)]
        min_pass_rate: f32,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn run_eval(
    engine: &EngineArgs,
    cases: &Path,
    policy: PolicyKind,
    min_pass_rate: f32,
) -> Result<bool> {
    let matcher = engine.build_matcher(policy, Box::new(DiscardQueryLog))?;
    let cases = read_eval_cases(cases)
        .with_context(|| format!("read eval cases {}", cases.display()))?;
    let summary = evaluate_cases(&matcher, &cases);

    for o in &summary.outcomes {
        println!(
            "case={} passed={} decision={:?} semantic={} fuzzy={} latency={:.1}ms{}",
            o.case_id,
            o.passed,
            o.decision,
            o.semantic_score
                .map_or_else(|| "null".to_string(), |s| format!("{s:.4}")),
            o.fuzzy_score
                .map_or_else(|| "null".to_string(), |s| format!("{s:.1}")),
            o.latency_ms,
            o.error
                .as_deref()
                .map(|e| format!(" error={e}"))
                .unwrap_or_default()
        );
    }

    let meets = summary.meets(min_pass_rate);
    println!(
        "policy={} total={} passed={} failed={} pass_rate={:.4} required={:.4} meets_threshold={} total_latency={:.1}ms",
        matcher.policy().name(),
        summary.total,
        summary.passed,
        summary.failed,
        summary.pass_rate,
        min_pass_rate,
        meets,
        summary.total_latency_ms()
    );
    Ok(meets)
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if let Err(msg) = cli.engine.validate() {
        anyhow::bail!(msg);
    }

    match &cli.command {
        Commands::Chat { policy } => {
            let matcher = cli.engine.build_matcher(*policy, cli.engine.file_log())?;
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            chat::run_loop(&matcher, stdin.lock(), &mut stdout)?;
        }
        Commands::Serve { bind, policy } => {
            let matcher = Arc::new(cli.engine.build_matcher(*policy, cli.engine.file_log())?);
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("start tokio runtime")?
                .block_on(server::serve(matcher, *bind))?;
        }
        Commands::Eval {
            cases,
            policy,
            min_pass_rate,
        } => {
            if !run_eval(&cli.engine, cases, *policy, *min_pass_rate)? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
