//! Event type definitions for structured provision events.
//!
//! Events are categorized by scope: the whole pipeline run, a single stage,
//! or raw output forwarded from an external program.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A structured provision event with full metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// Correlation ID shared by every event of one run.
    pub correlation_id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Source information for the event.
    pub source: EventSource,
    /// The event category and data.
    pub category: EventCategory,
}

impl ProvisionEvent {
    /// Create a new event with the given category.
    #[must_use]
    pub fn new(correlation_id: Uuid, source: EventSource, category: EventCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_id,
            timestamp: Utc::now(),
            source,
            category,
        }
    }
}

/// Source information for an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSource {
    /// The tracing target (e.g., "`provision::stage`").
    pub target: String,
}

impl EventSource {
    /// Create a new event source.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

/// Event categories organized by scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventCategory {
    /// Whole-run lifecycle (the start/end markers).
    Pipeline(PipelineEvent),
    /// Per-stage lifecycle.
    Stage(StageEvent),
    /// Output forwarded from external programs.
    Output(OutputEvent),
}

/// Whole-run lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum PipelineEvent {
    /// Provisioning started.
    Started {
        /// Name of the tool being provisioned.
        tool: String,
    },
    /// Every stage succeeded.
    Completed {
        /// Name of the tool being provisioned.
        tool: String,
        /// Duration in milliseconds.
        duration_ms: u64,
    },
    /// A stage failed and the run stopped.
    Failed {
        /// Stage that failed.
        stage: String,
        /// Exit code the process will end with.
        exit_code: i32,
    },
}

/// Per-stage lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum StageEvent {
    /// Stage started.
    Started {
        /// Stage name.
        stage: String,
        /// What the stage is about to do.
        description: String,
    },
    /// Stage finished successfully.
    Completed {
        /// Stage name.
        stage: String,
        /// Duration in milliseconds.
        duration_ms: u64,
    },
    /// Stage failed.
    Failed {
        /// Stage name.
        stage: String,
        /// Exit code of the failure.
        exit_code: i32,
        /// Error description.
        error: String,
    },
}

/// Output stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// Generic output events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutputEvent {
    /// Line for standard output.
    Stdout {
        /// Content.
        content: String,
    },
    /// Line for standard error.
    Stderr {
        /// Content.
        content: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_shape() {
        let event = ProvisionEvent::new(
            Uuid::nil(),
            EventSource::new("provision::stage"),
            EventCategory::Stage(StageEvent::Failed {
                stage: "packages".to_string(),
                exit_code: 100,
                error: "apt-get update exited with 100".to_string(),
            }),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["category"]["type"], "Stage");
        assert_eq!(json["category"]["data"]["event"], "Failed");
        assert_eq!(json["category"]["data"]["data"]["exit_code"], 100);
        assert_eq!(json["source"]["target"], "provision::stage");
    }

    #[test]
    fn test_events_get_unique_ids() {
        let source = EventSource::new("provision::pipeline");
        let category = EventCategory::Pipeline(PipelineEvent::Started {
            tool: "naabu".to_string(),
        });
        let a = ProvisionEvent::new(Uuid::nil(), source.clone(), category.clone());
        let b = ProvisionEvent::new(Uuid::nil(), source, category);
        assert_ne!(a.id, b.id);
        assert_eq!(a.correlation_id, b.correlation_id);
    }
}
