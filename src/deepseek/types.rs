//! Tipos de dados para o endpoint `chat/completions` da DeepSeek.
//!
//! O formato segue a API compatível com OpenAI: a requisição leva o modelo,
//! as mensagens e a temperatura; a resposta traz uma lista de `choices`.

use serde::{Deserialize, Serialize};

/// Corpo da requisição para `POST {base_url}/chat/completions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Identificador do modelo (ex.: "deepseek-chat").
    pub model: String,
    /// Mensagens da conversa, na ordem (system primeiro).
    pub messages: Vec<ChatMessage>,
    /// Sempre `false`: o console consome a resposta inteira.
    pub stream: bool,
    pub temperature: f32,
}

/// Uma única mensagem da conversa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Papel do remetente: "system", "user" ou "assistant".
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Resposta do endpoint de chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub model: String,
    /// Estatísticas de uso de tokens, quando o servidor as envia.
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Texto da primeira escolha, se houver.
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Mensagem devolvida pelo modelo; `content` pode vir nulo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Estatísticas de consumo de tokens para uma chamada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
