use thiserror::Error;

use crate::deepseek::DeepSeekError;

#[derive(Debug, Error)]
pub enum SeasideError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Job id already in use: {0}")]
    DuplicateJob(String),

    #[error("No async runtime available: {0}")]
    Runtime(String),

    #[error("DeepSeek API error: {0}")]
    DeepSeek(#[from] DeepSeekError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Why a single batch ended up with its untranslated text.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FallbackReason {
    /// Every attempt failed (remote error, timeout, or empty response).
    Exhausted { attempts: u32, last_error: String },
    /// The attempt itself blew up (panic) outside the retry loop.
    Crashed(String),
    /// No worker ever reported a result for the batch.
    Lost,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::Exhausted {
                attempts,
                last_error,
            } => write!(f, "gave up after {attempts} attempts: {last_error}"),
            FallbackReason::Crashed(msg) => write!(f, "worker crashed: {msg}"),
            FallbackReason::Lost => write!(f, "result never reported"),
        }
    }
}
