//! Conversation turns and the per-turn result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::StepStatus;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    /// Label used when a turn is rendered into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        }
    }
}

/// A single entry of the in-process conversation history.
///
/// `content` is always in the display language. `pivot_content` carries the
/// same text in the pivot language; the pipeline fills it on every append,
/// so with translation disabled it simply mirrors `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_content: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    /// Creates a user turn stamped with the current time.
    pub fn user(content: impl Into<String>, pivot_content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            pivot_content: Some(pivot_content.into()),
            timestamp: Utc::now(),
        }
    }

    /// Creates an assistant turn stamped with the current time.
    pub fn assistant(content: impl Into<String>, pivot_content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            pivot_content: Some(pivot_content.into()),
            timestamp: Utc::now(),
        }
    }

    /// The pivot-language text, falling back to the display text.
    pub fn pivot_or_content(&self) -> &str {
        self.pivot_content.as_deref().unwrap_or(&self.content)
    }
}

/// One line of conversation context as handed to the reply template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowEntry {
    pub role: TurnRole,
    pub text: String,
}

impl WindowEntry {
    pub fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Everything a completed turn produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    /// The reply in the display language.
    pub reply_text: String,
    /// Attribute name -> stored value, for every definition judged relevant
    /// that actually had a stored value, in definition order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_attributes: Vec<(String, String)>,
    /// Attribute name -> newly extracted content, in definition order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extracted_attributes: Vec<(String, String)>,
    /// Terminal status snapshot of every step the turn executed, in
    /// execution order.
    pub statuses: Vec<StepStatus>,
}
