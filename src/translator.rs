use std::future::Future;

use crate::deepseek::{ChatMessage, ChatRequest, DeepSeekClient, DeepSeekError};

/// The remote text-processing call: one batch of text in, its translation out.
///
/// Implementations may fail or hang; callers bound each call with their own
/// deadline and treat an empty string as a failure.
pub trait Translator: Send + Sync + 'static {
    fn translate(&self, text: &str) -> impl Future<Output = Result<String, DeepSeekError>> + Send;
}

const SYSTEM_PROMPT: &str = "You are an expert film subtitle translator fluent in many languages. \
    You will receive a segment of an SRT file including cue numbers and timing lines. \
    Using the surrounding context, translate the dialogue into fluent, natural Simplified Chinese. \
    Follow these format rules strictly: \
    1. Keep every cue number and timing line exactly as given; never change a digit. \
    2. Replace only the dialogue lines beneath each timing line with the translation. \
    3. Preserve the SRT structure (number, timing, text) with a blank line between cues. \
    4. Output nothing but the translated SRT content, with no explanations.";

/// [`Translator`] backed by the DeepSeek chat-completions API.
pub struct DeepSeekTranslator {
    client: DeepSeekClient,
    model: String,
    temperature: f32,
}

impl DeepSeekTranslator {
    pub fn new(client: DeepSeekClient, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }

    fn request_for(&self, text: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(format!(
                    "Translate the following subtitle segment:\n\n{text}"
                )),
            ],
            stream: false,
            temperature: self.temperature,
        }
    }
}

impl Translator for DeepSeekTranslator {
    async fn translate(&self, text: &str) -> Result<String, DeepSeekError> {
        let response = self.client.chat(&self.request_for(text)).await?;
        let cleaned = strip_code_fences(response.first_text().unwrap_or_default());
        if cleaned.is_empty() {
            return Err(DeepSeekError::EmptyResponse);
        }
        Ok(cleaned)
    }
}

/// Models like to wrap SRT output in Markdown fences; drop them.
pub fn strip_code_fences(raw: &str) -> String {
    raw.trim()
        .replace("```srt", "")
        .replace("```", "")
        .trim()
        .to_string()
}
