//! JSON renderer for provision events.
//!
//! Renders events as JSON lines for machine consumption.
//! This module is allowed to use println! as it's the output layer.

#![allow(clippy::print_stdout)]

use super::EventRenderer;
use crate::event::ProvisionEvent;

/// JSON renderer that outputs events as JSON lines.
#[derive(Debug, Default)]
pub struct JsonRenderer {
    /// Whether to pretty-print JSON.
    pretty: bool,
}

impl JsonRenderer {
    /// Create a new JSON renderer with compact output.
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Create a new JSON renderer with pretty-printed output.
    #[must_use]
    pub const fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Serialize an event the way it is printed.
    #[must_use]
    pub fn to_json(&self, event: &ProvisionEvent) -> Option<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(event)
        } else {
            serde_json::to_string(event)
        };
        json.ok()
    }
}

impl EventRenderer for JsonRenderer {
    fn render(&self, event: &ProvisionEvent) {
        if let Some(json) = self.to_json(event) {
            println!("{json}");
        }
    }
}
