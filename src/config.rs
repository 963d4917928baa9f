//! Configuração do seaside carregada a partir de `seaside.toml`.
//!
//! A struct [`SeasideConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `DEEPSEEK_API_KEY` tem precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use crate::error::SeasideError;

/// Nome do arquivo de configuração procurado no diretório atual.
pub const CONFIG_FILE: &str = "seaside.toml";

/// Configuração de nível superior carregada de `seaside.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SeasideConfig {
    /// Chave da API DeepSeek.
    #[serde(default)]
    pub api_key: String,

    /// URL base da API compatível com OpenAI.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Modelo usado nas chamadas de chat.
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperatura de amostragem enviada ao modelo.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Quantidade de blocos por lote enviado ao serviço remoto.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Número de workers paralelos por job.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Tentativas totais por lote antes de usar o texto original.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Prazo de cada chamada remota, em segundos.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Marcador inserido antes da extensão do arquivo gerado (`nome.chi.srt`).
    #[serde(default = "default_output_marker")]
    pub output_marker: String,
}

fn default_base_url() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_temperature() -> f32 {
    1.3
}

fn default_batch_size() -> usize {
    30
}

fn default_max_workers() -> usize {
    8
}

fn default_max_attempts() -> u32 {
    3
}

fn default_call_timeout_secs() -> u64 {
    120
}

fn default_output_marker() -> String {
    "chi".to_string()
}

impl Default for SeasideConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            batch_size: default_batch_size(),
            max_workers: default_max_workers(),
            max_attempts: default_max_attempts(),
            call_timeout_secs: default_call_timeout_secs(),
            output_marker: default_output_marker(),
        }
    }
}

impl SeasideConfig {
    /// Carrega a configuração de `seaside.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de um caminho explícito.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<SeasideConfig>(&contents).map_err(SeasideError::from)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração para a chave API.
        if let Ok(key) = std::env::var("DEEPSEEK_API_KEY")
            && !key.is_empty()
        {
            config.api_key = key;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejeita valores que tornariam o pipeline inoperante.
    pub fn validate(&self) -> Result<(), SeasideError> {
        if self.batch_size == 0 {
            return Err(SeasideError::Config("batch_size must be at least 1".into()));
        }
        if self.max_workers == 0 {
            return Err(SeasideError::Config("max_workers must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(SeasideError::Config("max_attempts must be at least 1".into()));
        }
        if self.call_timeout_secs == 0 {
            return Err(SeasideError::Config(
                "call_timeout_secs must be at least 1".into(),
            ));
        }
        if self.output_marker.trim().is_empty() {
            return Err(SeasideError::Config("output_marker must not be empty".into()));
        }
        Ok(())
    }

    /// Tamanho de lote já validado.
    pub fn batch_size(&self) -> Result<NonZeroUsize, SeasideError> {
        NonZeroUsize::new(self.batch_size)
            .ok_or_else(|| SeasideError::Config("batch_size must be at least 1".into()))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Chave efetiva: o override da submissão vence a configuração.
    pub fn resolve_api_key(&self, override_key: Option<&str>) -> Option<String> {
        override_key
            .filter(|k| !k.trim().is_empty())
            .map(str::to_string)
            .or_else(|| (!self.api_key.trim().is_empty()).then(|| self.api_key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = SeasideConfig::default();
        assert_eq!(config.base_url, "https://api.deepseek.com");
        assert_eq!(config.model, "deepseek-chat");
        assert_eq!(config.batch_size, 30);
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.output_marker, "chi");
        assert!(config.api_key.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            api_key = "sk-test-123"
            batch_size = 10
        "#;
        let config: SeasideConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_key, "sk-test-123");
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.call_timeout_secs, 120);
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let config = SeasideConfig {
            batch_size: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SeasideError::Config(_)));
        assert!(config.batch_size().is_err());
    }

    #[test]
    fn validate_rejects_zero_workers_and_attempts() {
        let no_workers = SeasideConfig {
            max_workers: 0,
            ..Default::default()
        };
        assert!(no_workers.validate().is_err());

        let no_attempts = SeasideConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(no_attempts.validate().is_err());
    }

    #[test]
    fn load_from_missing_path_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SeasideConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.batch_size, 30);
    }

    #[test]
    fn load_from_file_reads_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seaside.toml");
        std::fs::write(&path, "max_workers = 2\noutput_marker = \"zh\"\n").unwrap();
        let config = SeasideConfig::load_from(&path).unwrap();
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.output_marker, "zh");
    }

    #[test]
    fn load_from_file_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seaside.toml");
        std::fs::write(&path, "batch_size = 0\n").unwrap();
        assert!(SeasideConfig::load_from(&path).is_err());
    }

    #[test]
    fn resolve_api_key_prefers_override() {
        let config = SeasideConfig {
            api_key: "from-file".into(),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key(Some("override")).as_deref(), Some("override"));
        assert_eq!(config.resolve_api_key(None).as_deref(), Some("from-file"));
        assert_eq!(config.resolve_api_key(Some("  ")).as_deref(), Some("from-file"));

        let empty = SeasideConfig::default();
        assert_eq!(empty.resolve_api_key(None), None);
    }
}
