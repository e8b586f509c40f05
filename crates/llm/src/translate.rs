//! Translation between the display language and the pivot language.
//!
//! The attribute tasks all run in the pivot language, so user input is
//! translated on the way in and the reply on the way out. Translation is
//! just another generation task: the adapter wraps any `Gateway` and
//! builds the prompts itself.
//!
//! Both directions carry at most the last two turns as context. Going to
//! the pivot language only turns that already have pivot text qualify
//! (the context must match the output language); going back to the
//! display language every turn qualifies, preferring its pivot text.

use std::sync::Arc;

use keepsake_core::error::GatewayError;
use keepsake_core::gateway::{Gateway, TaskKind};
use keepsake_core::turn::{ChatTurn, TurnRole};
use tracing::debug;

/// Translates turn text through the configured gateway.
#[derive(Clone)]
pub struct Translator {
    gateway: Arc<dyn Gateway>,
    display_language: String,
    pivot_language: String,
}

impl Translator {
    /// Japanese-display, English-pivot translator.
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self::with_languages(gateway, "Japanese", "English")
    }

    pub fn with_languages(
        gateway: Arc<dyn Gateway>,
        display_language: impl Into<String>,
        pivot_language: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            display_language: display_language.into(),
            pivot_language: pivot_language.into(),
        }
    }

    pub fn display_language(&self) -> &str {
        &self.display_language
    }

    pub fn pivot_language(&self) -> &str {
        &self.pivot_language
    }

    /// Display language -> pivot language (user input on the way in).
    pub async fn to_pivot(
        &self,
        text: &str,
        context: &[ChatTurn],
    ) -> Result<String, GatewayError> {
        let recent = last_two(context);
        let lines: Vec<(TurnRole, String)> = recent
            .iter()
            .filter_map(|turn| {
                turn.pivot_content
                    .clone()
                    .map(|content| (turn.role, content))
            })
            .collect();

        let prompt = translation_template(&self.display_language, &self.pivot_language, text, &lines);
        debug!(context_lines = lines.len(), "Translating to pivot language");
        let generation = self
            .gateway
            .generate(&prompt, TaskKind::TranslateToPivot, None)
            .await?;
        Ok(generation.text.trim().to_string())
    }

    /// Pivot language -> display language (the reply on the way out).
    pub async fn to_display(
        &self,
        text: &str,
        context: &[ChatTurn],
    ) -> Result<String, GatewayError> {
        let recent = last_two(context);
        let lines: Vec<(TurnRole, String)> = recent
            .iter()
            .map(|turn| (turn.role, turn.pivot_or_content().to_string()))
            .collect();

        let prompt = translation_template(&self.pivot_language, &self.display_language, text, &lines);
        debug!(context_lines = lines.len(), "Translating to display language");
        let generation = self
            .gateway
            .generate(&prompt, TaskKind::TranslateToDisplay, None)
            .await?;
        Ok(generation.text.trim().to_string())
    }
}

fn last_two(context: &[ChatTurn]) -> &[ChatTurn] {
    &context[context.len().saturating_sub(2)..]
}

/// Builds the translation prompt, with an optional recent-context block.
fn translation_template(
    source_language: &str,
    target_language: &str,
    text: &str,
    context_lines: &[(TurnRole, String)],
) -> String {
    let mut context_text = String::new();
    if !context_lines.is_empty() {
        context_text.push_str("\n<Recent Conversation Context>\n");
        for (role, content) in context_lines {
            context_text.push_str(role.label());
            context_text.push_str(": ");
            context_text.push_str(content);
            context_text.push('\n');
        }
        context_text.push_str("</Recent Conversation Context>\n\n");
    }

    format!(
        "Translate the {source_language} text to {target_language}. Output only the translation.\n\
         {context_text}\n\
         <{source_language} Text>\n\
         {text}\n\
         </{source_language} Text>"
    )
}
