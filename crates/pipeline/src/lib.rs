//! # Keepsake Pipeline
//!
//! The attribute-augmented turn pipeline. A turn takes one user input and
//! walks a fixed stage sequence: optional input translation, relevance
//! judgment per attribute definition, reply generation over the recent
//! history window, optional output translation, the reply announcement,
//! then attribute extraction and storage.
//!
//! [`TurnPipeline::process`] runs a turn to completion; statuses can be
//! observed through a callback. [`TurnPipeline::process_streaming`] runs
//! the same driver on its own task and yields statuses one at a time
//! through a [`TurnStream`]. Both forms emit the identical status
//! sequence for the same turn.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use keepsake_llm::ScriptedGateway;
//! use keepsake_pipeline::TurnPipeline;
//! use keepsake_store::MemoryStore;
//!
//! # async fn run() -> keepsake_core::Result<()> {
//! let gateway = Arc::new(ScriptedGateway::new());
//! let store = Arc::new(MemoryStore::new());
//! let pipeline = TurnPipeline::new(gateway, store);
//!
//! let result = pipeline.process("I am an engineer.").await?;
//! println!("{}", result.reply_text);
//! # Ok(())
//! # }
//! ```

mod driver;
mod pipeline;
pub mod sink;
pub mod stream;

pub use pipeline::TurnPipeline;
pub use sink::{BufferSink, CallbackSink, ChannelSink, NullSink, StatusCallback, StatusSink};
pub use stream::TurnStream;
