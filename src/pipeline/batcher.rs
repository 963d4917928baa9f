use std::num::NonZeroUsize;

use super::splitter::Block;

/// Blocks inside a batch, and batch results inside the final artifact, are
/// joined with a blank line.
pub const SEPARATOR: &str = "\n\n";

/// A contiguous run of blocks sent to the remote service as one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// `first_block_position / batch_size`; contiguous from zero.
    pub index: usize,
    pub blocks: Vec<Block>,
}

impl Batch {
    /// The text sent out, and the fallback if every attempt fails.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }
}

/// Group blocks into batches of `size`, the last one possibly shorter.
pub fn batches(blocks: Vec<Block>, size: NonZeroUsize) -> Vec<Batch> {
    let size = size.get();
    let mut out: Vec<Batch> = Vec::with_capacity(blocks.len().div_ceil(size));
    let mut blocks = blocks.into_iter().peekable();

    while blocks.peek().is_some() {
        let chunk: Vec<Block> = blocks.by_ref().take(size).collect();
        out.push(Batch {
            index: out.len(),
            blocks: chunk,
        });
    }
    out
}
