//! The public entry point for running turns.

use std::sync::Arc;

use keepsake_core::{AttributeStore, ChatTurn, Gateway, Result, StepStatus, TurnResult};
use keepsake_llm::Translator;
use tokio::sync::RwLock;

use crate::driver::{self, TurnContext};
use crate::sink::{CallbackSink, NullSink, StatusCallback};
use crate::stream::TurnStream;

/// Runs conversational turns against a gateway and an attribute store.
///
/// The pipeline owns the in-process conversation history; attribute
/// definitions and values live in the store and survive it. One pipeline
/// is one conversation: create a new pipeline (or clear the history) to
/// start over.
pub struct TurnPipeline {
    gateway: Arc<dyn Gateway>,
    store: Arc<dyn AttributeStore>,
    translator: Option<Translator>,
    history: Arc<RwLock<Vec<ChatTurn>>>,
    status_callback: Option<StatusCallback>,
}

impl TurnPipeline {
    pub fn new(gateway: Arc<dyn Gateway>, store: Arc<dyn AttributeStore>) -> Self {
        Self {
            gateway,
            store,
            translator: None,
            history: Arc::new(RwLock::new(Vec::new())),
            status_callback: None,
        }
    }

    /// Routes inputs and replies through a display/pivot translation hop.
    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Observes every status snapshot of batch runs.
    ///
    /// Streaming runs ignore the callback; the stream itself is the
    /// observer there.
    pub fn with_status_callback(
        mut self,
        callback: impl Fn(&StepStatus) + Send + Sync + 'static,
    ) -> Self {
        self.status_callback = Some(Arc::new(callback));
        self
    }

    fn context(&self) -> TurnContext {
        TurnContext {
            gateway: self.gateway.clone(),
            store: self.store.clone(),
            translator: self.translator.clone(),
            history: self.history.clone(),
        }
    }

    /// Runs one full turn to completion and returns its result.
    pub async fn process(&self, user_input: &str) -> Result<TurnResult> {
        let ctx = self.context();
        match &self.status_callback {
            Some(callback) => {
                let sink = CallbackSink::new(callback.clone());
                driver::run_turn(&ctx, user_input, &sink).await
            }
            None => driver::run_turn(&ctx, user_input, &NullSink).await,
        }
    }

    /// Starts one turn and hands back a stream of its status snapshots.
    ///
    /// The turn runs on its own task. Its emissions go through a one-slot
    /// channel, so it pauses whenever it gets a snapshot ahead of the
    /// consumer and resumes as statuses are taken. The sequence of
    /// snapshots matches a batch run of the same turn exactly.
    pub fn process_streaming(&self, user_input: &str) -> TurnStream {
        TurnStream::spawn(self.context(), user_input.to_string())
    }

    /// A copy of the conversation so far.
    pub async fn history(&self) -> Vec<ChatTurn> {
        self.history.read().await.clone()
    }

    /// Forgets the conversation. Stored attribute values are untouched.
    pub async fn clear_history(&self) {
        self.history.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake_core::{AttributeDefinition, StepKind, TurnRole};
    use keepsake_llm::{DEFAULT_REPLY, ScriptedGateway};
    use keepsake_store::MemoryStore;

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let definition = AttributeDefinition::new(
            "User Profile",
            "Extract profile facts.",
            "Does the reply need the user's profile?",
        )
        .unwrap();
        store.insert_definition(&definition).await.unwrap();
        store
    }

    #[tokio::test]
    async fn batch_turn_uses_stored_attribute() {
        let store = seeded_store().await;
        store.insert_value(1, "engineer").await.unwrap();

        let gateway = Arc::new(ScriptedGateway::new());
        gateway.set_judgment("User Profile", true).await;
        gateway.enqueue_reply("You build things for a living.").await;

        let pipeline = TurnPipeline::new(gateway, store);
        let result = pipeline.process("What do I do?").await.unwrap();

        assert_eq!(result.reply_text, "You build things for a living.");
        assert_eq!(
            result.used_attributes,
            vec![("User Profile".to_string(), "engineer".to_string())]
        );

        let history = pipeline.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[1].role, TurnRole::Assistant);
        assert_eq!(history[1].content, "You build things for a living.");
    }

    #[tokio::test]
    async fn exhausted_reply_queue_falls_back_to_default() {
        let store = seeded_store().await;
        let gateway = Arc::new(ScriptedGateway::new());

        let pipeline = TurnPipeline::new(gateway, store);
        let result = pipeline.process("Hello.").await.unwrap();

        assert_eq!(result.reply_text, DEFAULT_REPLY);
        assert!(result.used_attributes.is_empty());
    }

    #[tokio::test]
    async fn callback_sees_every_snapshot() {
        let store = seeded_store().await;
        let gateway = Arc::new(ScriptedGateway::new());

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let captured = seen.clone();
        let pipeline = TurnPipeline::new(gateway, store).with_status_callback(
            move |status: &StepStatus| {
                captured.lock().unwrap().push(status.clone());
            },
        );

        pipeline.process("Hello.").await.unwrap();

        // One judgment pair, one reply pair, the reply announcement, one
        // extraction pair.
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 7);
        assert_eq!(seen[4].kind, StepKind::ReplyReady);
    }

    #[tokio::test]
    async fn clear_history_starts_a_fresh_conversation() {
        let store = seeded_store().await;
        let gateway = Arc::new(ScriptedGateway::new());

        let pipeline = TurnPipeline::new(gateway, store);
        pipeline.process("First.").await.unwrap();
        assert_eq!(pipeline.history().await.len(), 2);

        pipeline.clear_history().await;
        assert!(pipeline.history().await.is_empty());

        pipeline.process("Second.").await.unwrap();
        assert_eq!(pipeline.history().await.len(), 2);
    }

    #[tokio::test]
    async fn streaming_statuses_match_result_statuses() {
        let store = seeded_store().await;
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.enqueue_reply("Streamed reply.").await;

        let pipeline = TurnPipeline::new(gateway, store);
        let mut stream = pipeline.process_streaming("Hello.");

        let mut seen = Vec::new();
        while let Some(status) = stream.next_status().await {
            seen.push(status);
        }
        let result = stream.finish().await.unwrap();

        assert_eq!(result.reply_text, "Streamed reply.");
        // The result keeps the terminal snapshot of each emitted pair.
        let terminal: Vec<&StepStatus> = seen.iter().filter(|s| s.is_terminal()).collect();
        let kept: Vec<&StepStatus> = result.statuses.iter().collect();
        assert_eq!(terminal, kept);
    }
}
