//! AI Spine CLI - command-line interface for the AI Spine platform
//!
//! This is the main entry point for the `ai-spine` binary: submit and wait
//! for flow executions, inspect flows and agents, and manage API keys.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use ai_spine_core::AiSpine;
use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::instrument;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    control::set_override(cli.use_color());

    // A broken config file is reported by `run`; logging falls back to defaults
    let file_config = Config::load_with_file(cli.config.as_deref()).unwrap_or_default();
    if let Err(e) = init_logging(&cli, &file_config) {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    match run(cli).await {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));

            if e.should_show_help() {
                eprintln!("\nFor more information, try '--help'");
            }

            process::exit(e.exit_code());
        }
    }
}

/// Main application logic
#[instrument(skip(cli), fields(command = ?cli.command))]
async fn run(cli: Cli) -> Result<()> {
    let _timer = Timer::new("cli_execution");

    let mut config = Config::load_with_file(cli.config.as_deref())?;
    config.merge(&cli.connection);

    let client_config = config.client_config()?;
    tracing::info!(
        base_url = %client_config.base_url,
        authenticated = client_config.api_key.is_some(),
        "Client configured"
    );
    let client = AiSpine::new(client_config)?;

    let mut output = OutputWriter::new(cli.output, cli.use_color(), cli.quiet);

    match cli.command {
        Commands::Execute(args) => handlers::handle_execute(&client, args, &mut output).await,
        Commands::Wait(args) => {
            handlers::handle_wait(&client, &args.execution_id, args.poll, &mut output).await
        }
        Commands::Status(args) => handlers::handle_status(&client, &args.execution_id, &mut output).await,
        Commands::Cancel(args) => handlers::handle_cancel(&client, &args.execution_id, &mut output).await,
        Commands::Flows(action) => handlers::handle_flows(&client, action, &mut output).await,
        Commands::Agents(action) => handlers::handle_agents(&client, action, &mut output).await,
        Commands::System(action) => handlers::handle_system(&client, action, &mut output).await,
        Commands::Credits => handlers::handle_credits(&client, &mut output).await,
        Commands::Keys(action) => handlers::handle_keys(&client, action, &mut output).await,
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli, file_config: &Config) -> anyhow::Result<()> {
    let mut logging_config = LoggingConfig::from_verbosity(cli.verbosity_level());
    logging_config.merge_with_file(&file_config.logging);
    logging_config.merge_with_env();

    if cli.quiet {
        logging_config.level = "error".to_string();
    }

    logging::init_logging(logging_config)
}
