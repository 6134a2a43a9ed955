//! Custom tracing Layer for capturing provision events.
//!
//! This layer intercepts tracing events with `provision::` targets and an
//! `event_type` field and converts them to `ProvisionEvent` instances. Events
//! are either rendered on the emitting thread, so a marker is on the terminal
//! before the next child process starts, or sent down a channel.

// These casts are intentional for tracing field extraction - values come from our own macros
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::event::{
    EventCategory, EventSource, OutputEvent, PipelineEvent, ProvisionEvent, StageEvent,
};
use crate::metadata::correlation_id;
use crate::renderers::EventRenderer;
use tokio::sync::mpsc;
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Prefix every captured target starts with.
const TARGET_PREFIX: &str = "provision::";

enum Delivery {
    Channel(mpsc::UnboundedSender<ProvisionEvent>),
    Render(Box<dyn EventRenderer>),
}

/// A tracing Layer that captures provision-specific events.
pub struct ProvisionEventLayer {
    delivery: Delivery,
}

impl ProvisionEventLayer {
    /// Create a new layer that sends events to the given channel.
    #[must_use]
    pub fn new(sender: mpsc::UnboundedSender<ProvisionEvent>) -> Self {
        Self {
            delivery: Delivery::Channel(sender),
        }
    }

    /// Create a layer that renders each event synchronously as it is emitted.
    #[must_use]
    pub fn rendering(renderer: impl EventRenderer + 'static) -> Self {
        Self {
            delivery: Delivery::Render(Box::new(renderer)),
        }
    }

    /// Create a layer together with the receiving end of its channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProvisionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl<S> Layer<S> for ProvisionEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let target = event.metadata().target();
        if !target.starts_with(TARGET_PREFIX) {
            return;
        }

        let mut visitor = ProvisionEventVisitor::new(target);
        event.record(&mut visitor);

        let Some(provision_event) = visitor.build() else {
            return;
        };
        match &self.delivery {
            Delivery::Channel(sender) => {
                // Receiver gone means nobody renders; dropping the event is fine
                let _ = sender.send(provision_event);
            }
            Delivery::Render(renderer) => renderer.render(&provision_event),
        }
    }
}

/// Visitor for extracting typed fields from tracing events.
#[derive(Default)]
struct ProvisionEventVisitor {
    target: String,
    event_type: Option<String>,
    tool: Option<String>,
    stage: Option<String>,
    description: Option<String>,
    error: Option<String>,
    content: Option<String>,
    exit_code: Option<i32>,
    duration_ms: Option<u64>,
}

impl ProvisionEventVisitor {
    fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            ..Self::default()
        }
    }

    fn build(self) -> Option<ProvisionEvent> {
        let event_type = self.event_type.as_deref()?;
        let source = EventSource::new(&self.target);

        let category = match event_type {
            "pipeline.started" => {
                EventCategory::Pipeline(PipelineEvent::Started { tool: self.tool? })
            }
            "pipeline.completed" => EventCategory::Pipeline(PipelineEvent::Completed {
                tool: self.tool?,
                duration_ms: self.duration_ms.unwrap_or(0),
            }),
            "pipeline.failed" => EventCategory::Pipeline(PipelineEvent::Failed {
                stage: self.stage?,
                exit_code: self.exit_code?,
            }),
            "stage.started" => EventCategory::Stage(StageEvent::Started {
                stage: self.stage?,
                description: self.description.unwrap_or_default(),
            }),
            "stage.completed" => EventCategory::Stage(StageEvent::Completed {
                stage: self.stage?,
                duration_ms: self.duration_ms.unwrap_or(0),
            }),
            "stage.failed" => EventCategory::Stage(StageEvent::Failed {
                stage: self.stage?,
                exit_code: self.exit_code?,
                error: self.error.unwrap_or_default(),
            }),
            "output.stdout" => EventCategory::Output(OutputEvent::Stdout {
                content: self.content?,
            }),
            "output.stderr" => EventCategory::Output(OutputEvent::Stderr {
                content: self.content?,
            }),
            _ => return None,
        };

        Some(ProvisionEvent::new(correlation_id(), source, category))
    }

    fn set_string(&mut self, name: &str, value: String) {
        match name {
            "event_type" => self.event_type = Some(value),
            "tool" => self.tool = Some(value),
            "stage" => self.stage = Some(value),
            "description" => self.description = Some(value),
            "error" => self.error = Some(value),
            "content" => self.content = Some(value),
            _ => {}
        }
    }
}

impl Visit for ProvisionEventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.set_string(field.name(), value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        match field.name() {
            "exit_code" => self.exit_code = Some(value as i32),
            "duration_ms" => self.duration_ms = Some(value as u64),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "exit_code" => self.exit_code = Some(value as i32),
            "duration_ms" => self.duration_ms = Some(value),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // `%value` fields arrive here with Display formatting
        self.set_string(field.name(), format!("{value:?}"));
    }
}
