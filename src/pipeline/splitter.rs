use std::path::Path;

/// Shape of the source text, which decides how it is cut into blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// SRT-style timed captions: cues separated by blank lines.
    Subtitle,
    /// Anything else: one block per non-blank line.
    PlainText,
}

impl ContentKind {
    pub fn from_path(path: &Path) -> Self {
        let is_srt = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("srt"));
        if is_srt {
            ContentKind::Subtitle
        } else {
            ContentKind::PlainText
        }
    }
}

/// Decode raw source bytes as UTF-8, dropping invalid sequences instead of
/// replacing them, so nothing foreign reaches the remote call or the artifact.
pub fn decode_source(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Smallest addressable piece of a document, with its position in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub position: usize,
    pub text: String,
}

/// A source document cut into ordered, non-empty, trimmed blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn split(raw: &str, kind: ContentKind) -> Self {
        let chunks: Vec<String> = match kind {
            ContentKind::Subtitle => subtitle_chunks(raw),
            ContentKind::PlainText => raw
                .split('\n')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        };
        let blocks = chunks
            .into_iter()
            .enumerate()
            .map(|(position, text)| Block { position, text })
            .collect();
        Self { blocks }
    }

    /// Blocks in source order. Each call starts from the first block.
    pub fn blocks(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}

/// Cues are runs of lines between whitespace-only lines, after folding
/// `\r\n` and bare `\r` into `\n`.
fn subtitle_chunks(raw: &str) -> Vec<String> {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in normalized.split('\n') {
        if line.trim().is_empty() {
            push_chunk(&mut chunks, &mut current);
        } else {
            current.push(line);
        }
    }
    push_chunk(&mut chunks, &mut current);
    chunks
}

fn push_chunk(chunks: &mut Vec<String>, current: &mut Vec<&str>) {
    if current.is_empty() {
        return;
    }
    let chunk = current.join("\n");
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}
