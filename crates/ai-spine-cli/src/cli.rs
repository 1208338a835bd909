//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.
//! Connection flags fall back to the same `AI_SPINE_*` environment
//! variables the library reads.

use clap::{Args, Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::path::PathBuf;

/// AI Spine CLI - run flows and manage agents on the AI Spine platform
#[derive(Parser, Debug)]
#[command(
    name = "ai-spine",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, global = true, env = "AI_SPINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the client configuration
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Base URL of the AI Spine API
    #[arg(long, global = true, env = "AI_SPINE_BASE_URL")]
    pub base_url: Option<String>,

    /// API key (starts with sk_)
    #[arg(long, global = true, env = "AI_SPINE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "AI_SPINE_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Maximum retries for transient failures
    #[arg(long, global = true, env = "AI_SPINE_MAX_RETRIES")]
    pub max_retries: Option<u32>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a flow execution
    Execute(ExecuteArgs),

    /// Wait for an execution to finish
    Wait(WaitArgs),

    /// Show the current state of an execution
    Status(ExecutionIdArgs),

    /// Ask the service to cancel an execution
    Cancel(ExecutionIdArgs),

    /// Inspect flows
    #[command(subcommand)]
    Flows(FlowsAction),

    /// Manage agents
    #[command(subcommand)]
    Agents(AgentsAction),

    /// Service health, metrics and status
    #[command(subcommand)]
    System(SystemAction),

    /// Show the current user and credit balance
    Credits,

    /// Manage a user's API key
    #[command(subcommand)]
    Keys(KeysAction),
}

/// Polling knobs shared by `execute --wait` and `wait`
#[derive(Args, Debug, Clone, Copy)]
pub struct PollArgs {
    /// Give up waiting after this many seconds
    #[arg(long = "wait-timeout", default_value = "300")]
    pub timeout: u64,

    /// Seconds between status checks
    #[arg(long, default_value = "2")]
    pub interval: u64,
}

/// Arguments for the execute command
#[derive(Args, Debug)]
pub struct ExecuteArgs {
    /// Flow to run
    pub flow_id: String,

    /// Input data as a JSON object
    #[arg(short, long, default_value = "{}")]
    pub input: String,

    /// Optional metadata as a JSON object
    #[arg(long)]
    pub metadata: Option<String>,

    /// Wait for the execution to finish
    #[arg(short, long)]
    pub wait: bool,

    #[command(flatten)]
    pub poll: PollArgs,
}

/// Arguments for the wait command
#[derive(Args, Debug)]
pub struct WaitArgs {
    pub execution_id: String,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(Args, Debug)]
pub struct ExecutionIdArgs {
    pub execution_id: String,
}

#[derive(Subcommand, Debug)]
pub enum FlowsAction {
    /// List available flows
    List,
    /// Show one flow definition
    Get { flow_id: String },
}

#[derive(Subcommand, Debug)]
pub enum AgentsAction {
    /// List agents
    List,
    /// Create an agent
    Create {
        /// Agent name
        name: String,
        /// Agent type, e.g. processor
        #[arg(short = 't', long = "type")]
        agent_type: String,
        /// Agent configuration as a JSON object
        #[arg(long, default_value = "{}")]
        configuration: String,
    },
    /// Delete an agent
    Delete { agent_id: String },
}

#[derive(Subcommand, Debug)]
pub enum SystemAction {
    /// Check service health
    Health,
    /// Show service metrics
    Metrics,
    /// Show service status
    Status,
}

#[derive(Subcommand, Debug)]
pub enum KeysAction {
    /// Show whether the user has an API key
    Check { user_id: String },
    /// Create or replace the user's API key
    Generate { user_id: String },
    /// Revoke the user's API key
    Revoke { user_id: String },
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// Pretty-printed JSON output
    JsonPretty,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl PollArgs {
    pub fn wait_options(&self) -> ai_spine_core::WaitOptions {
        ai_spine_core::WaitOptions::new(
            std::time::Duration::from_secs(self.timeout),
            std::time::Duration::from_secs(self.interval),
        )
    }
}
