//! Step statuses reported while a turn runs.
//!
//! Every stage of a turn announces itself as a `StepStatus` snapshot:
//! first in the `Processing` state, then again once it settles. Status
//! objects transition at most once, from `Processing` to a terminal state,
//! and are never resurrected. The `ReplyReady` status is special: it is
//! born terminal and carries the reply so observers can show it before
//! extraction has finished.

use serde::{Deserialize, Serialize};

/// Which step of the turn a status refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    InputTranslation,
    Judgment,
    ReplyGeneration,
    OutputTranslation,
    ReplyReady,
    AttributeExtraction,
}

impl StepKind {
    /// Wire/storage identifier for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::InputTranslation => "input_translation",
            StepKind::Judgment => "judgment",
            StepKind::ReplyGeneration => "reply_generation",
            StepKind::OutputTranslation => "output_translation",
            StepKind::ReplyReady => "reply_ready",
            StepKind::AttributeExtraction => "attribute_extraction",
        }
    }
}

/// Lifecycle state of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Processing,
    Completed,
    Failed,
}

/// One progress snapshot emitted by the turn pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepStatus {
    pub kind: StepKind,
    /// Attribute name, for the per-definition kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub state: StepState,
    /// The finished reply. Only present on `ReplyReady`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    /// Attributes woven into the reply, in definition order. Only present
    /// on `ReplyReady`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_attributes: Option<Vec<(String, String)>>,
}

impl StepStatus {
    /// A freshly started step.
    pub fn processing(kind: StepKind, attribute: Option<String>) -> Self {
        Self {
            kind,
            attribute,
            state: StepState::Processing,
            reply: None,
            used_attributes: None,
        }
    }

    /// The terminal announcement that the reply is available.
    pub fn reply_ready(reply: String, used_attributes: Vec<(String, String)>) -> Self {
        Self {
            kind: StepKind::ReplyReady,
            attribute: None,
            state: StepState::Completed,
            reply: Some(reply),
            used_attributes: Some(used_attributes),
        }
    }

    /// Marks a processing step as completed. No-op once terminal.
    pub fn complete(&mut self) {
        if self.state == StepState::Processing {
            self.state = StepState::Completed;
        }
    }

    /// Marks a processing step as failed. No-op once terminal.
    pub fn fail(&mut self) {
        if self.state == StepState::Processing {
            self.state = StepState::Failed;
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state != StepState::Processing
    }

    /// Human-readable one-liner for progress displays.
    pub fn display_line(&self) -> String {
        let attribute = self.attribute.as_deref().unwrap_or("?");
        match self.kind {
            StepKind::InputTranslation => "Translating input".to_string(),
            StepKind::Judgment => {
                format!("Judging whether \"{attribute}\" is needed for the reply")
            }
            StepKind::ReplyGeneration => "Generating reply".to_string(),
            StepKind::OutputTranslation => "Translating reply".to_string(),
            StepKind::ReplyReady => "Reply ready".to_string(),
            StepKind::AttributeExtraction => {
                format!("Extracting \"{attribute}\" from the input")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_once() {
        let mut status = StepStatus::processing(StepKind::Judgment, Some("User Profile".into()));
        assert!(!status.is_terminal());

        status.complete();
        assert_eq!(status.state, StepState::Completed);

        // A settled status stays settled.
        status.fail();
        assert_eq!(status.state, StepState::Completed);
    }

    #[test]
    fn failed_is_terminal() {
        let mut status = StepStatus::processing(StepKind::ReplyGeneration, None);
        status.fail();
        assert!(status.is_terminal());
        status.complete();
        assert_eq!(status.state, StepState::Failed);
    }

    #[test]
    fn reply_ready_is_born_terminal() {
        let used = vec![("User Profile".to_string(), "engineer".to_string())];
        let status = StepStatus::reply_ready("Hi there!".into(), used);
        assert!(status.is_terminal());
        assert_eq!(status.reply.as_deref(), Some("Hi there!"));
        assert_eq!(status.kind.as_str(), "reply_ready");
    }

    #[test]
    fn display_lines_name_the_attribute() {
        let status = StepStatus::processing(StepKind::Judgment, Some("Current Tasks".into()));
        assert_eq!(
            status.display_line(),
            "Judging whether \"Current Tasks\" is needed for the reply"
        );

        let status = StepStatus::processing(StepKind::AttributeExtraction, Some("Skills".into()));
        assert_eq!(status.display_line(), "Extracting \"Skills\" from the input");
    }

    #[test]
    fn serializes_without_empty_fields() {
        let status = StepStatus::processing(StepKind::ReplyGeneration, None);
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "{\"kind\":\"reply_generation\",\"state\":\"processing\"}");

        let back: StepStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }
}
