//! Output formatting and writing utilities
//!
//! Machine formats print the raw serialized value; the human format prints
//! short summaries and tables.

use crate::cli::OutputFormat;
use crate::error::Result;
use ai_spine_core::{Agent, Execution, ExecutionStatus, Flow};
use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    quiet: bool,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool) -> Self {
        Self::with_writer(format, use_color, quiet, Box::new(io::stdout()))
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(format: OutputFormat, use_color: bool, quiet: bool, writer: Box<dyn Write>) -> Self {
        Self {
            format,
            use_color,
            quiet,
            writer,
        }
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message (human format only)
    pub fn info(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(message)
        }
    }

    /// Write a success message (human format only)
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let formatted = match self.format {
            OutputFormat::Json => serde_json::to_string(value)?,
            OutputFormat::JsonPretty | OutputFormat::Human => serde_json::to_string_pretty(value)?,
        };
        self.writeln(&formatted)
    }

    /// Write an execution snapshot
    pub fn execution(&mut self, execution: &Execution) -> Result<()> {
        if !self.is_human() {
            return self.data(execution);
        }

        let status = self.status_label(execution.status);
        self.writeln(&format!("Execution: {}", execution.execution_id))?;
        if let Some(flow_id) = &execution.flow_id {
            self.writeln(&format!("Flow:      {}", flow_id))?;
        }
        self.writeln(&format!("Status:    {}", status))?;
        if let Some(completed_at) = execution.completed_at {
            self.writeln(&format!("Completed: {}", completed_at.to_rfc3339()))?;
        }
        if let Some(message) = &execution.error_message {
            self.writeln(&format!("Error:     {}", message))?;
        }
        if let Some(output) = &execution.output_data {
            self.section("Output")?;
            self.data(output)?;
        }
        Ok(())
    }

    /// Write a list of flows
    pub fn flows(&mut self, flows: &[Flow]) -> Result<()> {
        if !self.is_human() {
            return self.data(&flows);
        }
        if flows.is_empty() {
            return self.info("No flows found");
        }

        let rows = flows
            .iter()
            .map(|f| {
                vec![
                    f.flow_id.clone(),
                    f.name.clone(),
                    f.nodes.len().to_string(),
                    f.description.clone().unwrap_or_default(),
                ]
            })
            .collect();
        self.table(&["FLOW ID", "NAME", "NODES", "DESCRIPTION"], rows)
    }

    /// Write a list of agents
    pub fn agents(&mut self, agents: &[Agent]) -> Result<()> {
        if !self.is_human() {
            return self.data(&agents);
        }
        if agents.is_empty() {
            return self.info("No agents found");
        }

        let rows = agents
            .iter()
            .map(|a| {
                vec![
                    a.agent_id.clone(),
                    a.name.clone().unwrap_or_default(),
                    a.agent_type.clone().unwrap_or_default(),
                    a.status.clone().unwrap_or_default(),
                ]
            })
            .collect();
        self.table(&["AGENT ID", "NAME", "TYPE", "STATUS"], rows)
    }

    /// Write a table (for human format)
    pub fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        // Calculate column widths
        let mut widths = headers.iter().map(|h| h.len()).collect::<Vec<_>>();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        let header_row = pad_row(headers.iter().map(|h| h.to_string()), &widths);
        if self.use_color {
            self.writeln(&header_row.bold().to_string())?;
        } else {
            self.writeln(&header_row)?;
        }

        let separator = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─");
        self.writeln(&separator)?;

        for row in rows {
            self.writeln(&pad_row(row.into_iter(), &widths))?;
        }

        Ok(())
    }

    fn status_label(&self, status: ExecutionStatus) -> String {
        let label = status.to_string();
        if !self.use_color {
            return label;
        }
        match status {
            ExecutionStatus::Completed => label.green().to_string(),
            ExecutionStatus::Failed => label.red().to_string(),
            ExecutionStatus::Cancelled => label.yellow().to_string(),
            ExecutionStatus::Pending | ExecutionStatus::Running => label.cyan().to_string(),
        }
    }
}

fn pad_row(cells: impl Iterator<Item = String>, widths: &[usize]) -> String {
    cells
        .enumerate()
        .map(|(i, cell)| match widths.get(i) {
            Some(width) => format!("{:width$}", cell, width = *width),
            None => cell,
        })
        .collect::<Vec<_>>()
        .join(" │ ")
        .trim_end()
        .to_string()
}
