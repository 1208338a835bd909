//! High-level AI Spine client
//!
//! [`AiSpine`] owns one [`Session`] and exposes every remote operation as a
//! typed method. There is no process-wide client; create one and share it
//! (it is cheap to clone).

use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use crate::config::ClientConfig;
use crate::http::auth::AuthMode;
use crate::http::dispatcher::Dispatcher;
use crate::http::session::Session;
use crate::models::{
    Agent, AgentConfig, ApiKeyStatus, ExecuteFlowRequest, Execution, Flow, GeneratedApiKey,
    RevokedApiKey, User,
};
use crate::poller::{ExecutionPoller, WaitOptions};
use crate::{Error, Result};

/// Client for the AI Spine flow orchestration API
#[derive(Debug, Clone)]
pub struct AiSpine {
    dispatcher: Dispatcher,
}

/// The service returns collections either bare or wrapped in an object
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Flows { flows: Vec<T> },
    Agents { agents: Vec<T> },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) | Listing::Flows { flows: items } | Listing::Agents { agents: items } => items,
        }
    }
}

impl AiSpine {
    /// Create a client from a configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self::with_session(Session::new(config)?))
    }

    /// Create a client from `AI_SPINE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client over an existing session
    pub fn with_session(session: Session) -> Self {
        Self {
            dispatcher: Dispatcher::new(session),
        }
    }

    /// Get the session configuration
    pub fn config(&self) -> &ClientConfig {
        self.dispatcher.session().config()
    }

    /// Get the dispatcher, for calls this client has no method for
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// A poller that fetches through this client
    pub fn poller(&self) -> ExecutionPoller<'_, Dispatcher> {
        ExecutionPoller::new(&self.dispatcher)
    }

    // ---- flows and executions ----

    /// Submit a flow execution. Returns the initial (usually pending) snapshot.
    pub async fn execute_flow(
        &self,
        flow_id: &str,
        input_data: Value,
        metadata: Option<Value>,
    ) -> Result<Execution> {
        let flow_id = require_id(flow_id, "Flow ID")?;
        if !input_data.is_object() {
            return Err(Error::validation("Input data must be a JSON object"));
        }

        let request = ExecuteFlowRequest {
            flow_id: flow_id.to_string(),
            input_data,
            metadata,
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| Error::validation(format!("could not encode request: {}", e)))?;

        let execution: Execution = self.dispatcher.post("/flows/execute", &body).await?;
        tracing::info!(
            flow_id,
            execution_id = %execution.execution_id,
            status = %execution.status,
            "Flow execution submitted"
        );
        Ok(execution)
    }

    /// Fetch the current snapshot of an execution
    pub async fn get_execution(&self, execution_id: &str) -> Result<Execution> {
        let execution_id = require_id(execution_id, "Execution ID")?;
        self.dispatcher
            .get(&format!("/executions/{}", encode(execution_id)))
            .await
    }

    /// Poll until the execution reaches a terminal state
    pub async fn wait_for_execution(&self, execution_id: &str, options: WaitOptions) -> Result<Execution> {
        let execution_id = require_id(execution_id, "Execution ID")?;
        self.poller().wait(execution_id, options).await
    }

    /// Poll until terminal, timeout, or `cancel` fires
    pub async fn wait_for_execution_with_cancel(
        &self,
        execution_id: &str,
        options: WaitOptions,
        cancel: &CancellationToken,
    ) -> Result<Execution> {
        let execution_id = require_id(execution_id, "Execution ID")?;
        self.poller()
            .wait_with_cancel(execution_id, options, cancel)
            .await
    }

    /// Submit a flow and wait for its terminal snapshot
    pub async fn run_flow(
        &self,
        flow_id: &str,
        input_data: Value,
        metadata: Option<Value>,
        options: WaitOptions,
    ) -> Result<Execution> {
        let submitted = self.execute_flow(flow_id, input_data, metadata).await?;
        self.wait_for_execution(&submitted.execution_id, options).await
    }

    /// Ask the service to cancel an execution
    pub async fn cancel_execution(&self, execution_id: &str) -> Result<Value> {
        let execution_id = require_id(execution_id, "Execution ID")?;
        self.dispatcher
            .post(&format!("/executions/{}/cancel", encode(execution_id)), &json!({}))
            .await
    }

    /// List the flows visible to this account
    pub async fn list_flows(&self) -> Result<Vec<Flow>> {
        let listing: Listing<Flow> = self.dispatcher.get("/flows").await?;
        Ok(listing.into_vec())
    }

    /// Fetch one flow definition
    pub async fn get_flow(&self, flow_id: &str) -> Result<Flow> {
        let flow_id = require_id(flow_id, "Flow ID")?;
        self.dispatcher.get(&format!("/flows/{}", encode(flow_id))).await
    }

    // ---- agents ----

    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        let listing: Listing<Agent> = self.dispatcher.get("/agents").await?;
        Ok(listing.into_vec())
    }

    pub async fn create_agent(&self, config: &AgentConfig) -> Result<Agent> {
        require_id(&config.name, "Agent name")?;
        let body = serde_json::to_value(config)
            .map_err(|e| Error::validation(format!("could not encode agent: {}", e)))?;
        self.dispatcher.post("/agents", &body).await
    }

    /// Delete an agent. A missing agent surfaces as [`Error::Execution`] with status 404.
    pub async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        let agent_id = require_id(agent_id, "Agent ID")?;
        let _: Value = self
            .dispatcher
            .delete(&format!("/agents/{}", encode(agent_id)))
            .await?;
        Ok(())
    }

    // ---- system ----

    pub async fn health_check(&self) -> Result<Value> {
        self.dispatcher.get("/health").await
    }

    pub async fn get_metrics(&self) -> Result<Value> {
        self.dispatcher.get("/metrics").await
    }

    pub async fn get_status(&self) -> Result<Value> {
        self.dispatcher.get("/status").await
    }

    // ---- user and credits ----

    pub async fn get_current_user(&self) -> Result<User> {
        self.dispatcher.get("/api/v1/users/me").await
    }

    /// Remaining credit balance (0 when the service reports none)
    pub async fn check_credits(&self) -> Result<u64> {
        Ok(self.get_current_user().await?.credits)
    }

    // ---- API keys (unauthenticated, keyed by user id) ----

    pub async fn check_user_api_key(&self, user_id: &str) -> Result<ApiKeyStatus> {
        let user_id = require_user_id(user_id)?;
        self.dispatcher
            .call(
                Method::GET,
                &format!("/api/v1/user/keys/my-key?user_id={}", encode(user_id)),
                None,
                AuthMode::None,
            )
            .await
    }

    /// Create a key, or replace the existing one
    pub async fn generate_user_api_key(&self, user_id: &str) -> Result<GeneratedApiKey> {
        let user_id = require_user_id(user_id)?;
        let generated: GeneratedApiKey = self
            .dispatcher
            .call(
                Method::POST,
                "/api/v1/user/keys/generate",
                Some(&json!({ "user_id": user_id })),
                AuthMode::None,
            )
            .await?;
        tracing::info!(action = ?generated.action, "API key generated");
        Ok(generated)
    }

    pub async fn revoke_user_api_key(&self, user_id: &str) -> Result<RevokedApiKey> {
        let user_id = require_user_id(user_id)?;
        self.dispatcher
            .call(
                Method::DELETE,
                "/api/v1/user/keys/revoke",
                Some(&json!({ "user_id": user_id })),
                AuthMode::None,
            )
            .await
    }
}

fn require_id<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{} is required", what)));
    }
    Ok(trimmed)
}

fn require_user_id(user_id: &str) -> Result<&str> {
    require_id(user_id, "User ID")
}

/// Percent-encode one path segment or query value
fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
