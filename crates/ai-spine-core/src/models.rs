//! Domain models returned by the AI Spine API
//!
//! Every value here is an immutable snapshot of server state. Fetching the
//! same resource twice yields two independent values; nothing on the client
//! side is updated in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A server-defined pipeline of processing nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub flow_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Nodes in execution order
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One node specification inside a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: Option<String>,
    /// Node-specific fields the client does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Lifecycle state of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Terminal states are absorbing: the service never moves out of them
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "pending"),
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Snapshot of one run of a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Opaque identifier assigned by the service
    pub execution_id: String,
    #[serde(default)]
    pub flow_id: Option<String>,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub input_data: Value,
    #[serde(default)]
    pub output_data: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Execution {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Body of `POST /flows/execute`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteFlowRequest {
    pub flow_id: String,
    pub input_data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// A configured server-side agent. Agents are created and deleted, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub agent_type: Option<String>,
    #[serde(default)]
    pub configuration: Value,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for creating an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    #[serde(default)]
    pub configuration: Value,
}

/// The authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Remaining credit balance; zero when the service omits it
    #[serde(default)]
    pub credits: u64,
    #[serde(default)]
    pub plan: Option<String>,
}

/// API-key descriptor for a user. Only a redacted prefix of the key is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyStatus {
    pub has_api_key: bool,
    #[serde(rename = "api_key", default, deserialize_with = "redacted_key")]
    pub key_prefix: Option<String>,
    #[serde(default)]
    pub credits: u64,
    #[serde(default)]
    pub rate_limit: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Whether key generation created a fresh key or replaced one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    Created,
    Regenerated,
}

/// Result of key generation; the only value that carries a raw secret
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedApiKey {
    #[serde(default)]
    pub message: String,
    pub api_key: String,
    pub action: KeyAction,
}

impl fmt::Debug for GeneratedApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedApiKey")
            .field("message", &self.message)
            .field("api_key", &crate::http::auth::redact(&self.api_key))
            .field("action", &self.action)
            .finish()
    }
}

/// Result of key revocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevokedApiKey {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

fn redacted_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|key| crate::http::auth::redact(&key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flow_deserialization() {
        let flow: Flow = serde_json::from_value(json!({
            "flow_id": "test-flow-123",
            "name": "Test Flow",
            "description": "A test flow",
            "nodes": [
                {"id": "node1", "type": "input"},
                {"id": "node2", "type": "process", "agent_id": "agent-789"},
                {"id": "node3", "type": "output"}
            ],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(flow.flow_id, "test-flow-123");
        let ids: Vec<&str> = flow.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["node1", "node2", "node3"]);
        assert_eq!(flow.nodes[1].node_type.as_deref(), Some("process"));
        assert_eq!(flow.nodes[1].extra["agent_id"], "agent-789");
        assert!(flow.created_at.is_some());
    }

    #[test]
    fn test_partial_execution() {
        let execution: Execution =
            serde_json::from_value(json!({"execution_id": "exec-123", "status": "pending"})).unwrap();
        assert_eq!(execution.status, ExecutionStatus::Pending);
        assert!(!execution.is_terminal());
        assert_eq!(execution.input_data, Value::Null);
        assert!(execution.output_data.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
        assert_eq!(ExecutionStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_unknown_status_rejected() {
        let result = serde_json::from_value::<Execution>(json!({"execution_id": "e", "status": "paused"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_user_credits_default_to_zero() {
        let user: User = serde_json::from_value(json!({
            "id": "user-123",
            "email": "test@example.com",
            "plan": "basic"
        }))
        .unwrap();
        assert_eq!(user.credits, 0);
    }

    #[test]
    fn test_api_key_status_is_redacted() {
        let status: ApiKeyStatus = serde_json::from_value(json!({
            "has_api_key": true,
            "api_key": "sk_user_test_key",
            "credits": 1000,
            "rate_limit": 100,
            "created_at": "2024-01-01T00:00:00Z",
            "last_used_at": null
        }))
        .unwrap();
        assert!(status.has_api_key);
        assert_eq!(status.key_prefix.as_deref(), Some("sk_user…"));
        assert_eq!(status.credits, 1000);
        assert!(status.last_used_at.is_none());

        let empty: ApiKeyStatus = serde_json::from_value(json!({
            "has_api_key": false,
            "api_key": null
        }))
        .unwrap();
        assert!(empty.key_prefix.is_none());
    }

    #[test]
    fn test_generated_key_debug_is_redacted() {
        let generated: GeneratedApiKey = serde_json::from_value(json!({
            "message": "API key created successfully",
            "api_key": "sk_new_user_key",
            "action": "created"
        }))
        .unwrap();
        assert_eq!(generated.action, KeyAction::Created);
        assert_eq!(generated.api_key, "sk_new_user_key");
        assert!(!format!("{:?}", generated).contains("sk_new_user_key"));
    }

    #[test]
    fn test_execute_request_omits_missing_metadata() {
        let request = ExecuteFlowRequest {
            flow_id: "sentiment-analysis".to_string(),
            input_data: json!({"text": "ok"}),
            metadata: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"flow_id": "sentiment-analysis", "input_data": {"text": "ok"}}));
    }
}
