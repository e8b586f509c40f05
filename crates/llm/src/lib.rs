//! Gateway implementations for Keepsake.
//!
//! Two backends: `ScriptedGateway` (canned rules, no model) and
//! `OllamaGateway` (local Ollama daemon), plus the `Translator` adapter
//! that runs the display/pivot language hop through any gateway.

pub mod ollama;
pub mod scripted;
pub mod translate;

pub use ollama::OllamaGateway;
pub use scripted::{ScriptedCall, ScriptedGateway, DEFAULT_REPLY};
pub use translate::Translator;
