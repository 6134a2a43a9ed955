//! Structured event system for provision.
//!
//! Stages report progress through the emit macros below, which are plain
//! `tracing` events with a `provision::*` target and an `event_type` field.
//! [`ProvisionEventLayer`] captures them and hands them to a renderer: the
//! [`CliRenderer`] prints the start/end markers on stdout and stage progress
//! on stderr, the [`JsonRenderer`] prints one JSON object per event.
//!
//! # Usage
//!
//! ```rust,ignore
//! use provision_events::{ProvisionEventLayer, CliRenderer, emit_pipeline_started};
//! use tracing_subscriber::layer::SubscriberExt;
//! use tracing_subscriber::util::SubscriberInitExt;
//!
//! tracing_subscriber::registry()
//!     .with(ProvisionEventLayer::rendering(CliRenderer::new()))
//!     .init();
//!
//! emit_pipeline_started!("naabu");
//! ```

pub mod event;
pub mod layer;
pub mod metadata;
pub mod renderers;

pub use event::{
    EventCategory, EventSource, OutputEvent, PipelineEvent, ProvisionEvent, StageEvent, Stream,
};
pub use layer::ProvisionEventLayer;
pub use metadata::{correlation_id, set_correlation_id};
pub use renderers::{CliRenderer, CliRendererConfig, EventRenderer, JsonRenderer};

// ============================================================================
// Emit Macros
// ============================================================================

/// Emit the pipeline start marker.
///
/// # Example
/// ```rust,ignore
/// emit_pipeline_started!("naabu");
/// ```
#[macro_export]
macro_rules! emit_pipeline_started {
    ($tool:expr) => {
        ::tracing::info!(
            target: "provision::pipeline",
            event_type = "pipeline.started",
            tool = %$tool,
        )
    };
}

/// Emit the pipeline end marker.
///
/// # Example
/// ```rust,ignore
/// emit_pipeline_completed!("naabu", 93_000u64);
/// ```
#[macro_export]
macro_rules! emit_pipeline_completed {
    ($tool:expr, $duration_ms:expr) => {
        ::tracing::info!(
            target: "provision::pipeline",
            event_type = "pipeline.completed",
            tool = %$tool,
            duration_ms = $duration_ms,
        )
    };
}

/// Emit a pipeline failure (no end marker follows).
#[macro_export]
macro_rules! emit_pipeline_failed {
    ($stage:expr, $exit_code:expr) => {
        ::tracing::info!(
            target: "provision::pipeline",
            event_type = "pipeline.failed",
            stage = %$stage,
            exit_code = $exit_code,
        )
    };
}

/// Emit a stage started event.
///
/// # Example
/// ```rust,ignore
/// emit_stage_started!("toolchain", "Fetching go 1.24.5");
/// ```
#[macro_export]
macro_rules! emit_stage_started {
    ($stage:expr, $description:expr) => {
        ::tracing::info!(
            target: "provision::stage",
            event_type = "stage.started",
            stage = %$stage,
            description = %$description,
        )
    };
}

/// Emit a stage completed event.
#[macro_export]
macro_rules! emit_stage_completed {
    ($stage:expr, $duration_ms:expr) => {
        ::tracing::info!(
            target: "provision::stage",
            event_type = "stage.completed",
            stage = %$stage,
            duration_ms = $duration_ms,
        )
    };
}

/// Emit a stage failed event.
#[macro_export]
macro_rules! emit_stage_failed {
    ($stage:expr, $exit_code:expr, $error:expr) => {
        ::tracing::info!(
            target: "provision::stage",
            event_type = "stage.failed",
            stage = %$stage,
            exit_code = $exit_code,
            error = %$error,
        )
    };
}

/// Emit a line for standard output.
#[macro_export]
macro_rules! emit_stdout {
    ($content:expr) => {
        ::tracing::info!(
            target: "provision::output",
            event_type = "output.stdout",
            content = %$content,
        )
    };
}

/// Emit a line for standard error.
#[macro_export]
macro_rules! emit_stderr {
    ($content:expr) => {
        ::tracing::info!(
            target: "provision::output",
            event_type = "output.stderr",
            content = %$content,
        )
    };
}
