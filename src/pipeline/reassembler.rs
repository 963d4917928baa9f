use std::path::{Path, PathBuf};

use super::batcher::SEPARATOR;
use super::dispatcher::BatchResult;

/// Join batch results, already ordered by batch index, into the artifact text.
pub fn reassemble(results: &[BatchResult]) -> String {
    results
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Sibling of `source` with `marker` inserted before the extension:
/// `movie.srt` → `movie.chi.srt`, `notes` → `notes.chi`.
pub fn output_path(source: &Path, marker: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{stem}.{marker}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{marker}"),
    };
    source.with_file_name(name)
}

/// Write the artifact text to `path`, replacing any existing file.
pub async fn write_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    tokio::fs::write(path, content.as_bytes()).await
}
