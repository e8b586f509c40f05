//! The turn driver.
//!
//! One turn walks a fixed sequence of stages: translate the input to the
//! pivot language (when a translator is configured), record the user turn,
//! judge each attribute definition for relevance, generate the reply over
//! the recent history window, translate the reply back, record and announce
//! the reply, then extract new attribute values from the input. Every stage
//! reports a processing snapshot before it starts and a completed snapshot
//! when it ends; the reply announcement is a single terminal snapshot.
//!
//! Batch and streaming execution both call [`run_turn`] with different
//! sinks, so the status sequence a caller observes is identical either way.

use std::sync::Arc;
use std::time::Instant;

use keepsake_core::{
    AttributeStore, ChatTurn, Gateway, Result, StepKind, StepStatus, TurnResult, WindowEntry,
};
use keepsake_llm::Translator;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::sink::StatusSink;

/// How many preceding turns the reply prompt may see.
const HISTORY_WINDOW: usize = 5;

/// How many preceding turns a translation prompt may see.
const TRANSLATION_CONTEXT: usize = 2;

/// Everything one turn needs. Cloned into the spawned task for streaming
/// runs, so all state is behind shared handles.
#[derive(Clone)]
pub(crate) struct TurnContext {
    pub(crate) gateway: Arc<dyn Gateway>,
    pub(crate) store: Arc<dyn AttributeStore>,
    pub(crate) translator: Option<Translator>,
    pub(crate) history: Arc<RwLock<Vec<ChatTurn>>>,
}

/// Runs one full turn, emitting status snapshots into `sink` as it goes.
///
/// On failure the error propagates immediately; the stage that failed has
/// emitted its processing snapshot but no completed one, and any turns
/// already appended to the history stay there.
pub(crate) async fn run_turn(
    ctx: &TurnContext,
    user_input: &str,
    sink: &dyn StatusSink,
) -> Result<TurnResult> {
    let started = Instant::now();
    info!(
        gateway = ctx.gateway.name(),
        translated = ctx.translator.is_some(),
        "Processing user turn"
    );
    let mut statuses: Vec<StepStatus> = Vec::new();

    // Stage 1: bring the input into the pivot language. Context is the
    // conversation as it stood before this turn.
    let pivot_input = match &ctx.translator {
        Some(translator) => {
            let mut status = StepStatus::processing(StepKind::InputTranslation, None);
            sink.emit(status.clone()).await;
            let context = {
                let history = ctx.history.read().await;
                recent_turns(&history, TRANSLATION_CONTEXT)
            };
            let translated = translator.to_pivot(user_input, &context).await?;
            status.complete();
            sink.emit(status.clone()).await;
            statuses.push(status);
            translated
        }
        None => user_input.to_string(),
    };

    // Stage 2: the user turn joins the history before any model work that
    // should not see it (the reply window excludes it explicitly).
    ctx.history
        .write()
        .await
        .push(ChatTurn::user(user_input, &pivot_input));

    // Stage 3: judge every definition against the input; relevant ones
    // contribute their most recent stored value to the reply prompt, in
    // definition order. The value fetch comes after the step's completed
    // snapshot; it gets no snapshot of its own.
    let definitions = ctx.store.list_definitions().await?;
    debug!(definitions = definitions.len(), "Judging attribute relevance");
    let mut used_attributes: Vec<(String, String)> = Vec::new();
    for definition in &definitions {
        let mut status = StepStatus::processing(StepKind::Judgment, Some(definition.name.clone()));
        sink.emit(status.clone()).await;
        let step_started = Instant::now();
        let required = ctx
            .gateway
            .judge(&definition.judgment_prompt, &pivot_input, Some(&definition.name))
            .await?;
        debug!(
            attribute = %definition.name,
            required,
            duration_ms = step_started.elapsed().as_millis() as u64,
            "Judgment complete"
        );
        status.complete();
        sink.emit(status.clone()).await;
        statuses.push(status);
        if required {
            if let Some(value) = ctx.store.latest_value(definition.id).await? {
                used_attributes.push((definition.name.clone(), value.content));
            }
        }
    }

    // Stage 4: generate the reply. The window holds the turns preceding
    // the current input; with a translator it is the pivot-language view.
    let mut status = StepStatus::processing(StepKind::ReplyGeneration, None);
    sink.emit(status.clone()).await;
    let window = {
        let history = ctx.history.read().await;
        reply_window(&history, ctx.translator.is_some())
    };
    let step_started = Instant::now();
    let pivot_reply = ctx
        .gateway
        .generate_reply(&window, &pivot_input, &used_attributes)
        .await?;
    debug!(
        used = used_attributes.len(),
        window = window.len(),
        duration_ms = step_started.elapsed().as_millis() as u64,
        "Reply generated"
    );
    status.complete();
    sink.emit(status.clone()).await;
    statuses.push(status);

    // Stage 5: bring the reply back into the display language. Context now
    // includes the user turn recorded in stage 2.
    let reply_text = match &ctx.translator {
        Some(translator) => {
            let mut status = StepStatus::processing(StepKind::OutputTranslation, None);
            sink.emit(status.clone()).await;
            let context = {
                let history = ctx.history.read().await;
                recent_turns(&history, TRANSLATION_CONTEXT)
            };
            let translated = translator.to_display(&pivot_reply, &context).await?;
            status.complete();
            sink.emit(status.clone()).await;
            statuses.push(status);
            translated
        }
        None => pivot_reply.clone(),
    };

    // Stage 6: record the assistant turn and announce the reply. The
    // announcement lands before extraction so callers can show the reply
    // while the slower write-side work continues.
    ctx.history
        .write()
        .await
        .push(ChatTurn::assistant(&reply_text, &pivot_reply));
    let ready = StepStatus::reply_ready(reply_text.clone(), used_attributes.clone());
    sink.emit(ready.clone()).await;
    statuses.push(ready);

    // Stage 7: extract new attribute values from the input and store them.
    let mut extracted_attributes: Vec<(String, String)> = Vec::new();
    for definition in &definitions {
        let mut status =
            StepStatus::processing(StepKind::AttributeExtraction, Some(definition.name.clone()));
        sink.emit(status.clone()).await;
        let step_started = Instant::now();
        let extracted = ctx
            .gateway
            .extract(&definition.extraction_prompt, &pivot_input, Some(&definition.name))
            .await?;
        if let Some(content) = &extracted {
            ctx.store.insert_value(definition.id, content).await?;
            extracted_attributes.push((definition.name.clone(), content.clone()));
        }
        debug!(
            attribute = %definition.name,
            extracted = extracted.is_some(),
            duration_ms = step_started.elapsed().as_millis() as u64,
            "Extraction complete"
        );
        status.complete();
        sink.emit(status.clone()).await;
        statuses.push(status);
    }

    info!(
        used = used_attributes.len(),
        extracted = extracted_attributes.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Turn complete"
    );

    Ok(TurnResult {
        reply_text,
        used_attributes,
        extracted_attributes,
        statuses,
    })
}

/// The last `count` turns, cloned out so no lock is held across awaits.
fn recent_turns(history: &[ChatTurn], count: usize) -> Vec<ChatTurn> {
    let start = history.len().saturating_sub(count);
    history[start..].to_vec()
}

/// The reply prompt window: up to [`HISTORY_WINDOW`] turns preceding the
/// current user turn, which is always the last history entry here.
fn reply_window(history: &[ChatTurn], use_pivot: bool) -> Vec<WindowEntry> {
    let preceding = &history[..history.len().saturating_sub(1)];
    let start = preceding.len().saturating_sub(HISTORY_WINDOW);
    preceding[start..]
        .iter()
        .map(|turn| {
            let text = if use_pivot {
                turn.pivot_or_content().to_string()
            } else {
                turn.content.clone()
            };
            WindowEntry::new(turn.role, text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use keepsake_core::{
        AttributeDefinition, AttributeValue, Error, Generation, GatewayError, StepState,
        StoreError, TaskKind, TurnRole,
    };
    use keepsake_llm::ScriptedGateway;
    use keepsake_store::MemoryStore;

    use crate::sink::BufferSink;

    fn context(gateway: Arc<dyn Gateway>, store: Arc<dyn AttributeStore>) -> TurnContext {
        TurnContext {
            gateway,
            store,
            translator: None,
            history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    async fn store_with_definitions(names: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for name in names {
            let definition =
                AttributeDefinition::new(*name, "Extract it.", "Is it needed?").unwrap();
            store.insert_definition(&definition).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn emission_sequence_follows_stage_order() {
        let gateway = Arc::new(ScriptedGateway::new());
        let store = store_with_definitions(&["Likes", "Dislikes"]).await;
        let ctx = context(gateway, store);
        let sink = BufferSink::new();

        let result = run_turn(&ctx, "Hello.", &sink).await.unwrap();

        // Two judgment pairs, one reply pair, reply-ready, two extraction
        // pairs: eleven emissions in all.
        let seen = sink.snapshot().await;
        let kinds: Vec<(StepKind, StepState)> =
            seen.iter().map(|s| (s.kind, s.state)).collect();
        assert_eq!(
            kinds,
            vec![
                (StepKind::Judgment, StepState::Processing),
                (StepKind::Judgment, StepState::Completed),
                (StepKind::Judgment, StepState::Processing),
                (StepKind::Judgment, StepState::Completed),
                (StepKind::ReplyGeneration, StepState::Processing),
                (StepKind::ReplyGeneration, StepState::Completed),
                (StepKind::ReplyReady, StepState::Completed),
                (StepKind::AttributeExtraction, StepState::Processing),
                (StepKind::AttributeExtraction, StepState::Completed),
                (StepKind::AttributeExtraction, StepState::Processing),
                (StepKind::AttributeExtraction, StepState::Completed),
            ]
        );

        // The result keeps only the terminal snapshot of each step.
        assert_eq!(result.statuses.len(), 6);
        assert!(result.statuses.iter().all(StepStatus::is_terminal));
    }

    #[tokio::test]
    async fn failure_leaves_processing_snapshot_and_user_turn() {
        struct OfflineGateway;

        #[async_trait]
        impl Gateway for OfflineGateway {
            fn name(&self) -> &str {
                "offline"
            }

            async fn generate(
                &self,
                _prompt: &str,
                _task: TaskKind,
                _attribute: Option<&str>,
            ) -> std::result::Result<Generation, GatewayError> {
                Err(GatewayError::Connectivity("backend offline".into()))
            }
        }

        let store = store_with_definitions(&["Likes"]).await;
        let ctx = context(Arc::new(OfflineGateway), store);
        let sink = BufferSink::new();

        let result = run_turn(&ctx, "Hello.", &sink).await;
        assert!(result.is_err());

        let seen = sink.snapshot().await;
        let last = seen.last().unwrap();
        assert_eq!(last.kind, StepKind::Judgment);
        assert_eq!(last.state, StepState::Processing);
        assert!(!last.is_terminal());

        // The user turn was already recorded when the judgment failed.
        let history = ctx.history.read().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, TurnRole::User);
    }

    #[tokio::test]
    async fn judgment_settles_before_the_value_fetch() {
        /// Healthy store except `latest_value`, which always fails.
        struct ValueFetchFailingStore {
            inner: MemoryStore,
        }

        #[async_trait]
        impl AttributeStore for ValueFetchFailingStore {
            async fn insert_definition(
                &self,
                definition: &AttributeDefinition,
            ) -> std::result::Result<i64, StoreError> {
                self.inner.insert_definition(definition).await
            }

            async fn get_definition(
                &self,
                id: i64,
            ) -> std::result::Result<Option<AttributeDefinition>, StoreError> {
                self.inner.get_definition(id).await
            }

            async fn list_definitions(
                &self,
            ) -> std::result::Result<Vec<AttributeDefinition>, StoreError> {
                self.inner.list_definitions().await
            }

            async fn update_definition(
                &self,
                definition: &AttributeDefinition,
            ) -> std::result::Result<bool, StoreError> {
                self.inner.update_definition(definition).await
            }

            async fn delete_definition(&self, id: i64) -> std::result::Result<bool, StoreError> {
                self.inner.delete_definition(id).await
            }

            async fn insert_value(
                &self,
                definition_id: i64,
                content: &str,
            ) -> std::result::Result<i64, StoreError> {
                self.inner.insert_value(definition_id, content).await
            }

            async fn latest_value(
                &self,
                _definition_id: i64,
            ) -> std::result::Result<Option<AttributeValue>, StoreError> {
                Err(StoreError::Backend("value table unavailable".into()))
            }

            async fn values_for_definition(
                &self,
                definition_id: i64,
            ) -> std::result::Result<Vec<AttributeValue>, StoreError> {
                self.inner.values_for_definition(definition_id).await
            }

            async fn list_values(&self) -> std::result::Result<Vec<AttributeValue>, StoreError> {
                self.inner.list_values().await
            }

            async fn update_value(
                &self,
                sequence_id: i64,
                content: &str,
            ) -> std::result::Result<bool, StoreError> {
                self.inner.update_value(sequence_id, content).await
            }

            async fn delete_value(&self, sequence_id: i64) -> std::result::Result<bool, StoreError> {
                self.inner.delete_value(sequence_id).await
            }
        }

        let inner = MemoryStore::new();
        let definition = AttributeDefinition::new("Likes", "Extract it.", "Is it needed?").unwrap();
        inner.insert_definition(&definition).await.unwrap();

        let gateway = Arc::new(ScriptedGateway::new());
        gateway.set_judgment("Likes", true).await;

        let ctx = context(gateway, Arc::new(ValueFetchFailingStore { inner }));
        let sink = BufferSink::new();

        let result = run_turn(&ctx, "Hello.", &sink).await;
        assert!(matches!(result, Err(Error::Store(StoreError::Backend(_)))));

        // The judgment step had already settled when the fetch failed; its
        // completed snapshot is the last thing observers saw.
        let seen = sink.snapshot().await;
        let last = seen.last().unwrap();
        assert_eq!(last.kind, StepKind::Judgment);
        assert_eq!(last.state, StepState::Completed);
    }

    #[test]
    fn reply_window_drops_oldest_and_current_turn() {
        let mut history = Vec::new();
        for i in 1..=3 {
            history.push(ChatTurn::user(format!("u{i}"), format!("u{i}")));
            history.push(ChatTurn::assistant(format!("a{i}"), format!("a{i}")));
        }
        history.push(ChatTurn::user("u4", "u4"));

        let window = reply_window(&history, false);
        let texts: Vec<&str> = window.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["a1", "u2", "a2", "u3", "a3"], "u1 falls outside, u4 is current");
    }

    #[test]
    fn reply_window_prefers_pivot_text_when_translating() {
        let history = vec![
            ChatTurn::user("こんにちは", "Hello"),
            ChatTurn::assistant("やあ", "Hi"),
            ChatTurn::user("元気？", "How are you?"),
        ];

        let window = reply_window(&history, true);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].text, "Hello");
        assert_eq!(window[1].text, "Hi");
    }
}
