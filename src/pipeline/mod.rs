//! Split → batch → dispatch → reassemble.

pub mod batcher;
pub mod dispatcher;
pub mod reassembler;
pub mod splitter;

pub use batcher::{Batch, SEPARATOR, batches};
pub use dispatcher::{BatchOutcome, BatchResult, DispatchOptions, Dispatcher, translate_with_retry};
pub use reassembler::{output_path, reassemble, write_artifact};
pub use splitter::{Block, ContentKind, Document, decode_source};
