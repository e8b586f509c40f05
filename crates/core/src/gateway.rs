//! The language-model gateway abstraction.
//!
//! A `Gateway` needs exactly one capability: turn a prompt into a
//! completion. The three task-shaped behaviors the pipeline relies on
//! (relevance judgment, extraction, reply generation) are default methods
//! built from fixed prompt templates plus response parsers, so every
//! backend inherits identical task semantics for free. Backends override
//! them only to short-circuit (e.g. a scripted backend answering from
//! canned rules).
//!
//! The templates and parsers are free functions rather than private
//! helpers precisely so overriding implementations can reuse them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::turn::WindowEntry;

/// What a generation request is for. Carried through to audit logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Judgment,
    Extraction,
    Reply,
    TranslateToPivot,
    TranslateToDisplay,
    General,
}

impl TaskKind {
    /// Wire/storage identifier for this task.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Judgment => "judgment",
            TaskKind::Extraction => "extraction",
            TaskKind::Reply => "reply",
            TaskKind::TranslateToPivot => "translate_to_pivot",
            TaskKind::TranslateToDisplay => "translate_to_display",
            TaskKind::General => "general",
        }
    }
}

/// One completion from a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    /// The completion text, as the backend produced it.
    pub text: String,
    /// The full backend payload, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

/// Audit record of a single backend interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub model: String,
    pub task: TaskKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub prompt: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
    pub sent_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

/// Sink for generation audit records.
///
/// Recording is observational: implementations must swallow their own
/// failures rather than surface them into the calling turn.
#[async_trait]
pub trait GenerationLog: Send + Sync {
    async fn record(&self, record: GenerationRecord);
}

/// A language-model backend.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Short identifier for logs, e.g. "scripted" or "ollama".
    fn name(&self) -> &str;

    /// Sends one prompt to the backend and returns its completion.
    ///
    /// `task` and `attribute` do not change what is generated; they label
    /// the request for logging and for backends that answer by rule.
    async fn generate(
        &self,
        prompt: &str,
        task: TaskKind,
        attribute: Option<&str>,
    ) -> Result<Generation, GatewayError>;

    /// Asks whether `question` is answered affirmatively for `input`.
    async fn judge(
        &self,
        question: &str,
        input: &str,
        attribute: Option<&str>,
    ) -> Result<bool, GatewayError> {
        let prompt = judgment_template(question, input);
        let generation = self.generate(&prompt, TaskKind::Judgment, attribute).await?;
        Ok(is_affirmative(&generation.text))
    }

    /// Runs an extraction instruction against `input`.
    ///
    /// Returns `None` when the backend reports there is nothing to
    /// extract, per [`extracted_content`].
    async fn extract(
        &self,
        instruction: &str,
        input: &str,
        attribute: Option<&str>,
    ) -> Result<Option<String>, GatewayError> {
        let prompt = extraction_template(instruction, input);
        let generation = self
            .generate(&prompt, TaskKind::Extraction, attribute)
            .await?;
        Ok(extracted_content(&generation.text))
    }

    /// Produces a reply to `input` given recent history and the stored
    /// attributes judged relevant, as name/value pairs in definition order.
    async fn generate_reply(
        &self,
        window: &[WindowEntry],
        input: &str,
        attributes: &[(String, String)],
    ) -> Result<String, GatewayError> {
        let prompt = reply_template(window, input, attributes);
        let generation = self.generate(&prompt, TaskKind::Reply, None).await?;
        Ok(generation.text.trim().to_string())
    }
}

// --- Prompt templates ---

/// Builds the yes/no relevance prompt.
pub fn judgment_template(question: &str, input: &str) -> String {
    format!(
        "You are an assistant that makes judgments.\n\
         Please answer the following question with only 'yes' or 'no'.\n\
         \n\
         <Judgment Question>\n\
         {question}\n\
         </Judgment Question>\n\
         \n\
         <User Input>\n\
         {input}\n\
         </User Input>\n\
         \n\
         Answer (only 'yes' or 'no'):"
    )
}

/// Builds the extraction prompt.
pub fn extraction_template(instruction: &str, input: &str) -> String {
    format!(
        "You are an assistant that extracts information.\n\
         \n\
         <Extraction Instructions>\n\
         {instruction}\n\
         </Extraction Instructions>\n\
         \n\
         <User Input>\n\
         {input}\n\
         </User Input>\n\
         \n\
         If there is no information to extract, please respond with 'none'.\n\
         Extracted content:"
    )
}

/// Builds the reply prompt from at most the last five window entries and
/// the attributes block (omitted entirely when no attributes apply).
/// Attribute lines keep the order they are given in.
pub fn reply_template(
    window: &[WindowEntry],
    input: &str,
    attributes: &[(String, String)],
) -> String {
    let mut history_text = String::new();
    let start = window.len().saturating_sub(5);
    for entry in &window[start..] {
        history_text.push_str(entry.role.label());
        history_text.push_str(": ");
        history_text.push_str(&entry.text);
        history_text.push('\n');
    }

    let mut attributes_text = String::new();
    if !attributes.is_empty() {
        attributes_text.push_str("\n<User Attribute Information>\n");
        for (name, value) in attributes {
            attributes_text.push_str(&format!("- {name}: {value}\n"));
        }
        attributes_text.push_str("</User Attribute Information>\n");
    }

    format!(
        "You are a helpful assistant.\n\
         Please generate an appropriate response considering the user's attribute information.\n\
         {attributes_text}\n\
         <Conversation History>\n\
         {history_text}\n\
         </Conversation History>\n\
         \n\
         <User Input>\n\
         {input}\n\
         </User Input>\n\
         \n\
         Response:"
    )
}

// --- Response parsers ---

/// Whether a judgment answer counts as affirmative.
///
/// Matching is deliberately loose: any answer containing "yes"
/// (case-insensitively) or "はい" counts, so "Yes." and "yes, it is"
/// both pass.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer.contains("yes") || answer.contains("はい")
}

/// Interprets an extraction answer, returning the content to store.
///
/// An empty answer, or one carrying the sentinel word "none" (or "なし")
/// within its first ten characters, means nothing was extracted. The
/// ten-character window catches preambles like "None found in the text"
/// while leaving sentinel words deeper in real content alone.
pub fn extracted_content(answer: &str) -> Option<String> {
    let content = answer.trim();
    if content.is_empty() {
        return None;
    }
    let head: String = content.chars().take(10).collect();
    if content.eq_ignore_ascii_case("none")
        || content == "なし"
        || head.to_lowercase().contains("none")
        || head.contains("なし")
    {
        return None;
    }
    Some(content.to_string())
}
