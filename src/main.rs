// src/main.rs
// fixfast - Fix Fast regression triage agent

mod cli;

use anyhow::{Result, bail};
use clap::Parser;
use cli::{Cli, Commands, InputSource};
use fixfast::agent::Orchestrator;
use fixfast::config::{FileConfig, Settings};
use fixfast::llm::create_client;
use fixfast::tools::ToolRegistry;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Run one tool through the dispatcher and print its JSON
fn run_tool(settings: &Settings, name: &str, args: &str) -> Result<()> {
    let registry = ToolRegistry::new(settings.load_tables()?);
    let output = registry.dispatch(name, args)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_agent(cli: &Cli, settings: Settings) -> Result<()> {
    let (input, source) = cli::gather_input(cli)?;

    let validation = settings.validate();
    if !validation.is_valid() {
        bail!("{}", validation.report());
    }
    for warning in &validation.warnings {
        warn!("{}", warning);
    }

    let registry = ToolRegistry::new(settings.load_tables()?);
    let client = create_client(&settings)?;
    let orchestrator = Orchestrator::new(client, registry).with_config(settings.agent.clone());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    if source != InputSource::Interactive {
        cli::print_banner();
    }

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let renderer = cli::spawn_renderer(rx);
    let result = orchestrator.run(&input, Some(&tx), &cancel).await;
    drop(tx);
    let _ = renderer.await;

    let outcome = result?;
    info!(
        rounds = outcome.rounds,
        tool_calls = outcome.tool_calls,
        prompt_tokens = outcome.usage.prompt_tokens,
        completion_tokens = outcome.usage.completion_tokens,
        "Run finished"
    );
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(&cli.overrides())?;
    match cli.command {
        Some(Commands::Tool { ref name, ref args }) => run_tool(&settings, name, args),
        None => run_agent(&cli, settings).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Project .env first; dotenvy never replaces a variable that is already set
    let _ = dotenvy::dotenv();
    let _ = dotenvy::from_path(FileConfig::config_dir().join(".env"));

    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: failed to install log subscriber: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\nerror: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
