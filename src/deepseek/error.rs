//! Tipos de erro para o cliente da API DeepSeek.
//!
//! Define [`DeepSeekError`] com variantes para rate limiting, erros da API,
//! respostas vazias e erros de rede. Usa `thiserror` para derivar `Display`
//! e `Error` a partir dos atributos `#[error(...)]`.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com a API da DeepSeek.
///
/// - [`RateLimited`](DeepSeekError::RateLimited) — o servidor retornou HTTP 429
/// - [`ApiError`](DeepSeekError::ApiError) — qualquer outro erro HTTP (4xx/5xx)
/// - [`EmptyResponse`](DeepSeekError::EmptyResponse) — resposta sem texto útil
/// - [`NetworkError`](DeepSeekError::NetworkError) — falha na camada de rede
#[derive(Debug, Error)]
pub enum DeepSeekError {
    /// O servidor retornou HTTP 429 (rate limit).
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Erro retornado pela API (ex.: 401 chave inválida, 500 erro interno).
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// O modelo respondeu, mas sem conteúdo depois da limpeza.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// Falha de rede subjacente (DNS, conexão recusada, timeout do cliente).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}
