pub mod client;
pub mod error;
pub mod types;

pub use client::DeepSeekClient;
pub use error::DeepSeekError;
pub use types::{ChatMessage, ChatRequest, ChatResponse, Usage};
