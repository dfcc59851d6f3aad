use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a user is in the template → height → photo flow.
///
/// Progression is strictly linear; only `/start` moves a user back to the
/// beginning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// No `/start` received yet.
    #[default]
    None,
    AwaitingTemplate,
    AwaitingHeight,
    /// Template and height chosen; every photo gets composed.
    Ready,
}

impl Stage {
    /// Value stored in the `stage` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::None => "none",
            Stage::AwaitingTemplate => "awaiting_template",
            Stage::AwaitingHeight => "awaiting_height",
            Stage::Ready => "ready",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Stage::None),
            "awaiting_template" => Some(Stage::AwaitingTemplate),
            "awaiting_height" => Some(Stage::AwaitingHeight),
            "ready" => Some(Stage::Ready),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mutable part of a session: what the transition function reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub stage: Stage,
    pub template_name: Option<String>,
    pub max_height: Option<u32>,
}

/// A persisted session row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identity from the transport (Telegram user id).
    pub user_id: String,
    pub state: SessionState,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    /// RFC3339 timestamp of the last update.
    pub updated_at: String,
}
