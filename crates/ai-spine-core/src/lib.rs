//! AI Spine Core - resilient client for the AI Spine flow orchestration API
//!
//! This crate submits flow executions, waits for their results, and manages
//! agents and API keys, while handling transient failures of the remote
//! service.
//!
//! # Main Components
//!
//! - **Configuration**: validated base URL, timeout, retries and API key
//! - **Session**: one pooled HTTP client with retry and backoff
//! - **Dispatcher**: one logical request in, a decoded value or typed error out
//! - **Error Classifier**: total mapping from HTTP outcomes to [`Error`]
//! - **Execution Poller**: bounded, cancellable wait for a terminal execution
//!
//! # Example
//!
//! ```no_run
//! use ai_spine_core::{AiSpine, ClientConfig, WaitOptions, Result};
//! use serde_json::json;
//!
//! async fn example() -> Result<()> {
//!     let client = AiSpine::new(ClientConfig::builder().api_key("sk_live_key").build()?)?;
//!     let submitted = client
//!         .execute_flow("sentiment-analysis", json!({"text": "ok"}), None)
//!         .await?;
//!     let finished = client
//!         .wait_for_execution(&submitted.execution_id, WaitOptions::default())
//!         .await?;
//!     println!("{:?}", finished.output_data);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod poller;

// Re-export main types for convenience
pub use client::AiSpine;
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL};
pub use error::{Error, ErrorKind, Result};
pub use http::{ApiKey, AuthMode, Dispatcher, Session};
pub use models::{
    Agent, AgentConfig, ApiKeyStatus, Execution, ExecutionStatus, Flow, FlowNode,
    GeneratedApiKey, KeyAction, RevokedApiKey, User,
};
pub use poller::{ExecutionPoller, ExecutionSource, WaitOptions};

// Re-exported so callers can build cancellation tokens without a direct dependency
pub use tokio_util::sync::CancellationToken;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
