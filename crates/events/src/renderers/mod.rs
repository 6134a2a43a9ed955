//! Renderers that turn provision events into terminal output.

pub mod cli;
pub mod json;

pub use cli::{CliRenderer, CliRendererConfig, RenderedLine};
pub use json::JsonRenderer;

use crate::event::ProvisionEvent;

/// Prints events as they are emitted.
///
/// Called from [`crate::ProvisionEventLayer`] on the emitting thread, so an
/// implementation must not block for long.
pub trait EventRenderer: Send + Sync {
    /// Render a single event.
    fn render(&self, event: &ProvisionEvent);
}
