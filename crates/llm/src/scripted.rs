//! Scripted gateway — answers from canned rules instead of a model.
//!
//! Used for offline demos and deterministic tests. Judgments and
//! extractions are looked up by attribute name; replies come from a FIFO
//! queue. Anything without a matching rule falls through to the template
//! logic against `generate`, which recognizes the task templates by their
//! fixed trailing markers and answers negatively ("no" / "none"), so an
//! unscripted turn still completes.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use keepsake_core::error::GatewayError;
use keepsake_core::gateway::{
    extracted_content, extraction_template, is_affirmative, judgment_template, Gateway,
    Generation, GenerationLog, GenerationRecord, TaskKind,
};
use tokio::sync::Mutex;
use tracing::debug;

/// Reply used once the scripted queue runs dry.
pub const DEFAULT_REPLY: &str = "This is a scripted reply.";

/// Marker lines the task templates end with. Matching on these lets the
/// fallthrough `generate` tell a judgment prompt from an extraction one.
const JUDGMENT_MARKER: &str = "Answer (only 'yes' or 'no'):";
const EXTRACTION_MARKER: &str = "Extracted content:";

/// One recorded interaction with the scripted gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedCall {
    Judge {
        question: String,
        input: String,
        attribute: Option<String>,
    },
    Extract {
        instruction: String,
        input: String,
        attribute: Option<String>,
    },
    Generate {
        task: TaskKind,
        prompt: String,
        attribute: Option<String>,
    },
}

#[derive(Default)]
struct Inner {
    judgment_rules: BTreeMap<String, bool>,
    extraction_rules: BTreeMap<String, Option<String>>,
    replies: VecDeque<String>,
    calls: Vec<ScriptedCall>,
}

/// A rule-driven gateway with no model behind it.
pub struct ScriptedGateway {
    inner: Mutex<Inner>,
    log: Option<Arc<dyn GenerationLog>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            log: None,
        }
    }

    /// Attach an audit sink; every `generate` call gets recorded to it.
    pub fn with_generation_log(mut self, log: Arc<dyn GenerationLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Fixes the judgment verdict for one attribute.
    pub async fn set_judgment(&self, attribute: impl Into<String>, required: bool) {
        self.inner
            .lock()
            .await
            .judgment_rules
            .insert(attribute.into(), required);
    }

    /// Fixes the extraction outcome for one attribute. `None` means the
    /// input reveals nothing for it.
    pub async fn set_extraction(&self, attribute: impl Into<String>, content: Option<&str>) {
        self.inner
            .lock()
            .await
            .extraction_rules
            .insert(attribute.into(), content.map(str::to_string));
    }

    /// Queues the next reply.
    pub async fn enqueue_reply(&self, reply: impl Into<String>) {
        self.inner.lock().await.replies.push_back(reply.into());
    }

    /// Everything this gateway has been asked so far, in order.
    pub async fn calls(&self) -> Vec<ScriptedCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Clears rules, queued replies and the call record.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        *inner = Inner::default();
    }
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        prompt: &str,
        task: TaskKind,
        attribute: Option<&str>,
    ) -> Result<Generation, GatewayError> {
        let text = {
            let mut inner = self.inner.lock().await;
            inner.calls.push(ScriptedCall::Generate {
                task,
                prompt: prompt.to_string(),
                attribute: attribute.map(str::to_string),
            });

            if prompt.contains(JUDGMENT_MARKER) {
                let verdict = inner
                    .judgment_rules
                    .iter()
                    .find(|(name, _)| prompt.contains(name.as_str()))
                    .map(|(_, verdict)| *verdict)
                    .unwrap_or(false);
                if verdict { "yes" } else { "no" }.to_string()
            } else if prompt.contains(EXTRACTION_MARKER) {
                inner
                    .extraction_rules
                    .iter()
                    .find(|(name, _)| prompt.contains(name.as_str()))
                    .and_then(|(_, content)| content.clone())
                    .unwrap_or_else(|| "none".to_string())
            } else {
                inner
                    .replies
                    .pop_front()
                    .unwrap_or_else(|| DEFAULT_REPLY.to_string())
            }
        };

        debug!(task = task.as_str(), "Scripted generation");

        if let Some(log) = &self.log {
            let now = Utc::now();
            log.record(GenerationRecord {
                model: "scripted".into(),
                task,
                attribute: attribute.map(str::to_string),
                prompt: prompt.to_string(),
                response: text.clone(),
                raw: None,
                sent_at: now,
                received_at: now,
            })
            .await;
        }

        Ok(Generation { text, raw: None })
    }

    async fn judge(
        &self,
        question: &str,
        input: &str,
        attribute: Option<&str>,
    ) -> Result<bool, GatewayError> {
        {
            let mut inner = self.inner.lock().await;
            inner.calls.push(ScriptedCall::Judge {
                question: question.to_string(),
                input: input.to_string(),
                attribute: attribute.map(str::to_string),
            });
            for (name, verdict) in &inner.judgment_rules {
                if attribute == Some(name.as_str()) || question.contains(name.as_str()) {
                    return Ok(*verdict);
                }
            }
        }

        let prompt = judgment_template(question, input);
        let generation = self.generate(&prompt, TaskKind::Judgment, attribute).await?;
        Ok(is_affirmative(&generation.text))
    }

    async fn extract(
        &self,
        instruction: &str,
        input: &str,
        attribute: Option<&str>,
    ) -> Result<Option<String>, GatewayError> {
        {
            let mut inner = self.inner.lock().await;
            inner.calls.push(ScriptedCall::Extract {
                instruction: instruction.to_string(),
                input: input.to_string(),
                attribute: attribute.map(str::to_string),
            });
            for (name, content) in &inner.extraction_rules {
                if attribute == Some(name.as_str()) || instruction.contains(name.as_str()) {
                    return Ok(content.clone());
                }
            }
        }

        let prompt = extraction_template(instruction, input);
        let generation = self
            .generate(&prompt, TaskKind::Extraction, attribute)
            .await?;
        Ok(extracted_content(&generation.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn judgments_follow_rules() {
        let gateway = ScriptedGateway::new();
        gateway.set_judgment("User Profile", true).await;
        gateway.set_judgment("Expertise & Skills", false).await;

        assert!(gateway
            .judge("Is profile needed?", "hi", Some("User Profile"))
            .await
            .unwrap());
        assert!(!gateway
            .judge("Are skills needed?", "hi", Some("Expertise & Skills"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn rules_also_match_by_question_substring() {
        let gateway = ScriptedGateway::new();
        gateway.set_judgment("User Profile", true).await;

        // No attribute label, but the question mentions the name.
        assert!(gateway
            .judge("Is the User Profile relevant here?", "hi", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn unscripted_judgment_defaults_to_no() {
        let gateway = ScriptedGateway::new();
        assert!(!gateway
            .judge("Is anything needed?", "hi", Some("Unknown"))
            .await
            .unwrap());

        // The fallthrough runs through generate, so both calls are recorded.
        let calls = gateway.calls().await;
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], ScriptedCall::Judge { .. }));
        assert!(matches!(
            calls[1],
            ScriptedCall::Generate {
                task: TaskKind::Judgment,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn extractions_follow_rules() {
        let gateway = ScriptedGateway::new();
        gateway.set_extraction("User Profile", Some("engineer")).await;
        gateway.set_extraction("Current Tasks & Projects", None).await;

        assert_eq!(
            gateway
                .extract("Extract profile.", "I am an engineer", Some("User Profile"))
                .await
                .unwrap(),
            Some("engineer".to_string())
        );
        assert_eq!(
            gateway
                .extract("Extract tasks.", "hi", Some("Current Tasks & Projects"))
                .await
                .unwrap(),
            None
        );
        // Unscripted attribute falls through to the "none" default.
        assert_eq!(
            gateway
                .extract("Extract decisions.", "hi", Some("Past Decisions"))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn replies_come_from_the_queue() {
        let gateway = ScriptedGateway::new();
        gateway.enqueue_reply("First reply").await;
        gateway.enqueue_reply("Second reply").await;

        assert_eq!(
            gateway.generate_reply(&[], "hi", &[]).await.unwrap(),
            "First reply"
        );
        assert_eq!(
            gateway.generate_reply(&[], "hi", &[]).await.unwrap(),
            "Second reply"
        );
        // Queue exhausted.
        assert_eq!(
            gateway.generate_reply(&[], "hi", &[]).await.unwrap(),
            DEFAULT_REPLY
        );
    }

    #[test]
    fn markers_match_the_templates() {
        assert!(judgment_template("q", "i").contains(JUDGMENT_MARKER));
        assert!(extraction_template("instr", "i").contains(EXTRACTION_MARKER));
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let gateway = ScriptedGateway::new();
        gateway.set_judgment("User Profile", true).await;
        gateway.enqueue_reply("queued").await;
        gateway
            .generate("free-form", TaskKind::General, None)
            .await
            .unwrap();
        assert!(!gateway.calls().await.is_empty());

        gateway.reset().await;
        assert!(gateway.calls().await.is_empty());
        assert!(!gateway
            .judge("Is profile needed?", "hi", Some("User Profile"))
            .await
            .unwrap());
    }
}
