//! CLI renderer for provision events.
//!
//! The pipeline markers go to stdout, everything else to stderr.
//! This module is allowed to use println!/eprintln! as it's the output layer.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use super::EventRenderer;
use crate::event::{
    EventCategory, OutputEvent, PipelineEvent, ProvisionEvent, StageEvent, Stream,
};
use std::io::{self, Write};

/// CLI renderer configuration.
#[derive(Debug, Clone, Default)]
pub struct CliRendererConfig {
    /// Whether to show stage completion lines.
    pub verbose: bool,
}

/// A rendered line and the stream it belongs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    /// Destination stream.
    pub stream: Stream,
    /// Text without trailing newline.
    pub text: String,
}

impl RenderedLine {
    fn stdout(text: String) -> Self {
        Self {
            stream: Stream::Stdout,
            text,
        }
    }

    fn stderr(text: String) -> Self {
        Self {
            stream: Stream::Stderr,
            text,
        }
    }
}

/// CLI renderer that outputs events to stdout/stderr.
#[derive(Debug, Default)]
pub struct CliRenderer {
    config: CliRendererConfig,
}

impl CliRenderer {
    /// Create a new CLI renderer with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new CLI renderer with the given configuration.
    #[must_use]
    pub fn with_config(config: CliRendererConfig) -> Self {
        Self { config }
    }

    /// Format an event without printing it.
    #[must_use]
    pub fn line(&self, event: &ProvisionEvent) -> Option<RenderedLine> {
        match &event.category {
            EventCategory::Pipeline(pipeline_event) => Some(Self::pipeline_line(pipeline_event)),
            EventCategory::Stage(stage_event) => self.stage_line(stage_event),
            EventCategory::Output(OutputEvent::Stdout { content }) => {
                Some(RenderedLine::stdout(content.clone()))
            }
            EventCategory::Output(OutputEvent::Stderr { content }) => {
                Some(RenderedLine::stderr(content.clone()))
            }
        }
    }

    fn pipeline_line(event: &PipelineEvent) -> RenderedLine {
        match event {
            PipelineEvent::Started { tool } => {
                RenderedLine::stdout(format!("[*] Provisioning {tool}: starting"))
            }
            PipelineEvent::Completed { tool, duration_ms } => RenderedLine::stdout(format!(
                "[+] Provisioning {tool}: complete in {}",
                format_duration(*duration_ms)
            )),
            PipelineEvent::Failed { stage, exit_code } => RenderedLine::stderr(format!(
                "[!] Provisioning stopped at stage '{stage}' (exit code {exit_code})"
            )),
        }
    }

    fn stage_line(&self, event: &StageEvent) -> Option<RenderedLine> {
        match event {
            StageEvent::Started { stage, description } => {
                Some(RenderedLine::stderr(format!("> [{stage}] {description}")))
            }
            StageEvent::Completed { stage, duration_ms } => self.config.verbose.then(|| {
                RenderedLine::stderr(format!(
                    "> [{stage}] done in {}",
                    format_duration(*duration_ms)
                ))
            }),
            StageEvent::Failed {
                stage,
                exit_code,
                error,
            } => Some(RenderedLine::stderr(format!(
                "> [{stage}] failed (exit code {exit_code}): {error}"
            ))),
        }
    }
}

impl EventRenderer for CliRenderer {
    fn render(&self, event: &ProvisionEvent) {
        let Some(line) = self.line(event) else {
            return;
        };
        match line.stream {
            Stream::Stdout => {
                println!("{}", line.text);
                let _ = io::stdout().flush();
            }
            Stream::Stderr => {
                eprintln!("{}", line.text);
                let _ = io::stderr().flush();
            }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_duration(duration_ms: u64) -> String {
    if duration_ms < 1000 {
        format!("{duration_ms}ms")
    } else {
        format!("{:.1}s", duration_ms as f64 / 1000.0)
    }
}
