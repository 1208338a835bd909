//! Command handlers for CLI subcommands
//!
//! Each handler makes one or two library calls and hands the result to the
//! [`OutputWriter`]. Retries, classification and polling all live in the
//! library.

use crate::cli::{AgentsAction, ExecuteArgs, FlowsAction, KeysAction, PollArgs, SystemAction};
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use ai_spine_core::{AgentConfig, AiSpine, CancellationToken, Execution, KeyAction};
use serde_json::Value;
use tracing::{info, instrument};

/// Parse a JSON object argument
pub fn parse_object(argument: &str, raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).map_err(|e| Error::invalid_json(argument, e))?;
    if !value.is_object() {
        return Err(Error::Core(ai_spine_core::Error::validation(format!(
            "{} must be a JSON object",
            argument
        ))));
    }
    Ok(value)
}

/// Handle the execute command
#[instrument(skip_all, fields(flow_id = %args.flow_id))]
pub async fn handle_execute(client: &AiSpine, args: ExecuteArgs, output: &mut OutputWriter) -> Result<()> {
    let input = parse_object("--input", &args.input)?;
    let metadata = args
        .metadata
        .as_deref()
        .map(|raw| parse_object("--metadata", raw))
        .transpose()?;

    let submitted = client.execute_flow(&args.flow_id, input, metadata).await?;
    info!(execution_id = %submitted.execution_id, "Execution submitted");

    if !args.wait {
        output.success(&format!("✓ Submitted execution {}", submitted.execution_id))?;
        return output.execution(&submitted);
    }

    output.info(&format!("Waiting for execution {}", submitted.execution_id))?;
    let finished = wait_interruptibly(client, &submitted.execution_id, args.poll).await?;
    output.execution(&finished)
}

/// Handle the wait command
#[instrument(skip(client, output))]
pub async fn handle_wait(
    client: &AiSpine,
    execution_id: &str,
    poll: PollArgs,
    output: &mut OutputWriter,
) -> Result<()> {
    let finished = wait_interruptibly(client, execution_id, poll).await?;
    output.execution(&finished)
}

/// Wait until terminal; Ctrl-C stops waiting without cancelling remotely
async fn wait_interruptibly(client: &AiSpine, execution_id: &str, poll: PollArgs) -> Result<Execution> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let result = client
        .wait_for_execution_with_cancel(execution_id, poll.wait_options(), &cancel)
        .await;
    watcher.abort();
    Ok(result?)
}

pub async fn handle_status(client: &AiSpine, execution_id: &str, output: &mut OutputWriter) -> Result<()> {
    let execution = client.get_execution(execution_id).await?;
    output.execution(&execution)
}

pub async fn handle_cancel(client: &AiSpine, execution_id: &str, output: &mut OutputWriter) -> Result<()> {
    let response = client.cancel_execution(execution_id).await?;
    output.success(&format!("✓ Cancellation requested for {}", execution_id))?;
    if !output.is_human() {
        output.data(&response)?;
    }
    Ok(())
}

pub async fn handle_flows(client: &AiSpine, action: FlowsAction, output: &mut OutputWriter) -> Result<()> {
    match action {
        FlowsAction::List => {
            let flows = client.list_flows().await?;
            output.flows(&flows)
        }
        FlowsAction::Get { flow_id } => {
            let flow = client.get_flow(&flow_id).await?;
            output.data(&flow)
        }
    }
}

pub async fn handle_agents(client: &AiSpine, action: AgentsAction, output: &mut OutputWriter) -> Result<()> {
    match action {
        AgentsAction::List => {
            let agents = client.list_agents().await?;
            output.agents(&agents)
        }
        AgentsAction::Create {
            name,
            agent_type,
            configuration,
        } => {
            let config = AgentConfig {
                name,
                agent_type,
                configuration: parse_object("--configuration", &configuration)?,
            };
            let agent = client.create_agent(&config).await?;
            output.success(&format!("✓ Created agent {}", agent.agent_id))?;
            output.data(&agent)
        }
        AgentsAction::Delete { agent_id } => {
            client.delete_agent(&agent_id).await?;
            output.success(&format!("✓ Deleted agent {}", agent_id))
        }
    }
}

pub async fn handle_system(client: &AiSpine, action: SystemAction, output: &mut OutputWriter) -> Result<()> {
    let value = match action {
        SystemAction::Health => client.health_check().await?,
        SystemAction::Metrics => client.get_metrics().await?,
        SystemAction::Status => client.get_status().await?,
    };
    output.data(&value)
}

pub async fn handle_credits(client: &AiSpine, output: &mut OutputWriter) -> Result<()> {
    let user = client.get_current_user().await?;
    if !output.is_human() {
        return output.data(&user);
    }

    output.writeln(&format!("User:    {}", user.email.as_deref().unwrap_or(&user.id)))?;
    if let Some(plan) = &user.plan {
        output.writeln(&format!("Plan:    {}", plan))?;
    }
    output.writeln(&format!("Credits: {}", user.credits))
}

pub async fn handle_keys(client: &AiSpine, action: KeysAction, output: &mut OutputWriter) -> Result<()> {
    match action {
        KeysAction::Check { user_id } => {
            let status = client.check_user_api_key(&user_id).await?;
            if !output.is_human() {
                return output.data(&status);
            }
            match (status.has_api_key, status.key_prefix.as_deref()) {
                (true, Some(prefix)) => output.writeln(&format!("API key: {}", prefix))?,
                (true, None) => output.writeln("API key: present")?,
                (false, _) => output.writeln("API key: none")?,
            }
            output.writeln(&format!("Credits: {}", status.credits))?;
            output.writeln(&format!("Rate limit: {}", status.rate_limit))
        }
        KeysAction::Generate { user_id } => {
            let generated = client.generate_user_api_key(&user_id).await?;
            if !output.is_human() {
                return output.data(&generated);
            }
            let verb = match generated.action {
                KeyAction::Created => "Created",
                KeyAction::Regenerated => "Regenerated",
            };
            output.success(&format!("✓ {} API key", verb))?;
            // shown once, the service cannot display it again
            output.writeln(&generated.api_key)
        }
        KeysAction::Revoke { user_id } => {
            let revoked = client.revoke_user_api_key(&user_id).await?;
            output.success(&format!("✓ {}", revoked.message))?;
            if !output.is_human() {
                output.data(&revoked)?;
            }
            Ok(())
        }
    }
}
