//! # scout
//!
//! Product research assistant. Wires settings, telemetry, the model client
//! and the catalog operations into one orchestrator and runs it from the
//! command line.

#![deny(unsafe_code)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use scout_core::messages::Message;
use scout_core::provider::{InvokeOptions, ModelProvider};
use scout_engine::operations::{create_default_registry, Catalog};
use scout_engine::{Orchestrator, OrchestratorConfig, RetrievalBudget, SessionOutcome};
use scout_llm::{OpenAiProvider, ReliableConfig, ReliableProvider};
use scout_settings::ScoutSettings;
use scout_telemetry::{init_telemetry, parse_level, parse_module_levels, TelemetryConfig};

/// Product research assistant.
#[derive(Parser, Debug)]
#[command(name = "scout", about = "Answer product questions by researching the catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Catalog JSON file (defaults to the bundled catalog).
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Settings file (defaults to ~/.scout/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Retrieval turn budget (overrides settings).
    #[arg(long, global = true)]
    max_turns: Option<u32>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one session and print the answer or clarification question.
    Ask {
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Interactive session; the conversation carries across questions.
    Chat,
    /// List the operations offered to the model.
    Operations,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => scout_settings::load_settings_from_path(path),
        None => scout_settings::load_settings(),
    }
    .context("Failed to load settings")?;
    if let Some(max_turns) = cli.max_turns {
        if max_turns == 0 {
            bail!("--max-turns must be at least 1");
        }
        settings.retrieval.max_turns = max_turns;
    }

    let telemetry = init_telemetry(TelemetryConfig {
        log_level: parse_level(&settings.logging.level).unwrap_or(tracing::Level::WARN),
        module_levels: parse_module_levels(&settings.logging.modules),
        json: cli.json_logs || settings.logging.json,
    });

    let catalog_path = cli
        .catalog
        .clone()
        .or_else(|| settings.catalog.path.as_ref().map(PathBuf::from));
    let catalog = match &catalog_path {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::bundled()?,
    };
    let catalog = Arc::new(catalog);
    tracing::info!(products = catalog.products().len(), "catalog loaded");
    let registry = Arc::new(create_default_registry(catalog.clone()));

    if let Command::Operations = cli.command {
        let defs = registry.definitions();
        println!("{}", serde_json::to_string_pretty(&defs)?);
        return Ok(());
    }

    let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
    let provider = build_provider(
        &settings,
        SecretString::from(api_key.clone()),
        &settings.model.model,
    )?;
    let compressor = build_provider(
        &settings,
        SecretString::from(api_key),
        &settings.model.compression_model,
    )?;

    let options = InvokeOptions {
        max_tokens: Some(settings.model.max_tokens),
        temperature: Some(settings.model.temperature),
    };
    let config = OrchestratorConfig {
        budget: RetrievalBudget {
            max_turns: settings.retrieval.max_turns,
            max_duration: settings.retrieval.max_duration(),
        },
        options: options.clone(),
        compression_options: options,
        products: catalog.names(),
        operation_timeout: settings.retrieval.operation_timeout(),
        max_result_bytes: settings.retrieval.max_result_bytes,
    };
    let orchestrator = Orchestrator::new(provider, registry, config)
        .with_compression_provider(compressor)
        .with_metrics(telemetry.metrics());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Command::Ask { message } => {
            let report = orchestrator
                .run_session(vec![Message::user(message.join(" "))], &cancel)
                .await?;
            print_outcome(&report.outcome);
        }
        Command::Chat => chat(&orchestrator, &cancel).await?,
        Command::Operations => {}
    }

    for metric in telemetry.metrics().snapshot() {
        tracing::debug!(name = %metric.name, value = metric.value, "metric");
    }
    Ok(())
}

fn build_provider(
    settings: &ScoutSettings,
    api_key: SecretString,
    model: &str,
) -> Result<Arc<dyn ModelProvider>> {
    let inner = OpenAiProvider::new(
        api_key,
        model,
        Some(&settings.model.base_url),
        Duration::from_secs(settings.model.request_timeout_secs),
    )?;
    let retry = &settings.retry;
    let config = ReliableConfig {
        max_retries: retry.max_retries,
        base_delay: Duration::from_millis(retry.base_delay_ms),
        max_delay: Duration::from_millis(retry.max_delay_ms),
        circuit_breaker_threshold: retry.circuit_breaker_threshold,
        circuit_breaker_cooldown: Duration::from_secs(retry.circuit_breaker_cooldown_secs),
        ..ReliableConfig::default()
    };
    Ok(Arc::new(ReliableProvider::new(inner, config)))
}

fn print_outcome(outcome: &SessionOutcome) {
    match outcome {
        SessionOutcome::Clarification { question } => println!("{question}"),
        SessionOutcome::Answer { answer } => println!("{answer}"),
    }
}

async fn chat(orchestrator: &Orchestrator, cancel: &CancellationToken) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut conversation: Vec<Message> = Vec::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/exit" || line == "/quit" {
            break;
        }

        conversation.push(Message::user(line));
        match orchestrator.run_session(conversation.clone(), cancel).await {
            Ok(report) => {
                print_outcome(&report.outcome);
                conversation = report.conversation;
            }
            Err(e) => {
                eprintln!("error: {e}");
                conversation.pop();
                if cancel.is_cancelled() {
                    break;
                }
            }
        }
    }
    Ok(())
}
