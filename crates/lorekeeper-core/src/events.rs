//! The typed event-bus frame shared by ingestion (§4.8) and agentic search
//! (§4.10): a closed sum type serialized on the wire as `{type, data}`.

use serde::{Deserialize, Serialize};

use crate::model::Reference;

/// Progress payload for an in-flight ingestion stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub step: String,
    pub progress: u32,
    pub total: u32,
    pub percent: f32,
}

impl Progress {
    #[must_use]
    pub fn new(step: impl Into<String>, progress: u32, total: u32) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            (progress as f32 / total as f32) * 100.0
        };
        Progress {
            step: step.into(),
            progress,
            total,
            percent,
        }
    }
}

/// Terminal payload for a completed turn (`done`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Done {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// The closed set of frames C11 may deliver, one send-point, one shape.
///
/// `Event::tag` and the `#[serde(tag = "type", content = "data")]`
/// representation together are what §4.11 calls "each event is a JSON
/// object `{type, data}`".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    Status(String),
    Progress(Progress),
    Sources(Vec<Reference>),
    Answer(String),
    Success(serde_json::Value),
    Error(String),
    Done(Done),
}

impl Event {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Done(_) | Event::Error(_))
    }

    #[must_use]
    pub fn status(msg: impl Into<String>) -> Self {
        Event::Status(msg.into())
    }

    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Event::Error(msg.into())
    }

    #[must_use]
    pub fn done(session_id: Option<String>) -> Self {
        Event::Done(Done { session_id })
    }
}
