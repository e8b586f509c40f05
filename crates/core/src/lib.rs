//! # Keepsake Core
//!
//! Domain types, traits, and error definitions for the Keepsake
//! conversational memory pipeline. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod attribute;
pub mod error;
pub mod gateway;
pub mod status;
pub mod store;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use attribute::{AttributeDefinition, AttributeValue};
pub use error::{Error, GatewayError, Result, StoreError, ValidationError};
pub use gateway::{Gateway, Generation, GenerationLog, GenerationRecord, TaskKind};
pub use status::{StepKind, StepState, StepStatus};
pub use store::AttributeStore;
pub use turn::{ChatTurn, TurnResult, TurnRole, WindowEntry};
