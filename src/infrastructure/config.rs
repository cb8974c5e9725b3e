use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::DomainError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";
pub const DEFAULT_PROMPTS_PATH: &str = "config/prompts.yaml";

/// Runtime settings plus prompt templates.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    /// Loads both YAML files (either may be missing) and applies env overrides.
    ///
    /// Paths come from `DOCQUERY_CONFIG` and `DOCQUERY_PROMPTS` when set.
    pub fn load() -> Result<Self, DomainError> {
        let config_path =
            std::env::var("DOCQUERY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let prompts_path =
            std::env::var("DOCQUERY_PROMPTS").unwrap_or_else(|_| DEFAULT_PROMPTS_PATH.into());

        let mut config: Config = load_yaml(Path::new(&config_path))?;
        config.apply_env_overrides();
        let prompts: PromptsConfig = load_yaml(Path::new(&prompts_path))?;

        Ok(Self { config, prompts })
    }

    pub fn from_yaml(config: &str, prompts: &str) -> Result<Self, DomainError> {
        Ok(Self {
            config: parse_yaml(config)?,
            prompts: parse_yaml(prompts)?,
        })
    }
}

fn load_yaml<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> Result<T, DomainError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DomainError::internal(format!("reading {}: {e}", path.display())))?;
    parse_yaml(&raw)
}

fn parse_yaml<T: for<'de> Deserialize<'de> + Default>(raw: &str) -> Result<T, DomainError> {
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(raw).map_err(|e| DomainError::validation(format!("invalid config: {e}")))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub log: LogConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub rag: RagConfig,
    pub directory: DirectoryConfig,
    pub upload: UploadConfig,
}

impl Config {
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Ok(url) = std::env::var("QDRANT_URL") {
            self.vector_store.url = url;
        }
        if let Ok(backend) = std::env::var("VECTOR_BACKEND") {
            match backend.to_ascii_lowercase().as_str() {
                "qdrant" => self.vector_store.backend = VectorBackend::Qdrant,
                "memory" => self.vector_store.backend = VectorBackend::Memory,
                other => tracing::warn!(backend = other, "ignoring unknown VECTOR_BACKEND"),
            }
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.log.format = if format.eq_ignore_ascii_case("json") {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            };
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "docquery=debug,tower_http=debug".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://integrate.api.nvidia.com/v1".to_string(),
            model: "meta/llama-3.1-405b-instruct".to_string(),
            api_key_env: "NVIDIA_API_KEY".to_string(),
            temperature: 0.2,
            top_p: 0.7,
            max_tokens: 1024,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Hashing,
    #[default]
    Openai,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    /// Unset: the model's native size (`openai`) or 768 (`hashing`).
    pub dimension: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Openai,
            model: "text-embedding-3-small".to_string(),
            dimension: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Memory,
    Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub backend: VectorBackend,
    pub url: String,
    pub collection: String,
    pub nprobe: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Memory,
            url: "http://localhost:6334".to_string(),
            collection: "document_chunks".to_string(),
            nprobe: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub top_k: usize,
    /// Without an LLM credential, chat answers with the retrieved passages
    /// instead of failing with `MissingCredential`.
    pub retrieval_only_without_llm: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            top_k: 5,
            retrieval_only_without_llm: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub recursive: bool,
    pub include_hidden: bool,
    pub skip_unsupported: bool,
    /// Only directories under this path may be submitted. Unset allows any.
    pub root: Option<PathBuf>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            include_hidden: false,
            skip_unsupported: true,
            root: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub document: String,
    pub chat: String,
    pub no_results: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            document: "You have the following document text:\n\n{document_text}\n\n\
                       User query: {user_query}\nPlease provide the best possible answer."
                .to_string(),
            chat: "You are answering questions about uploaded documents.\n\n\
                   Relevant passages:\n{context}\n\n{history}\
                   User query: {user_query}\nPlease provide the best possible answer \
                   using only the passages above."
                .to_string(),
            no_results: "No relevant passages found in the indexed documents.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_completion_contract() {
        let config = Config::default();
        assert_eq!(config.llm.model, "meta/llama-3.1-405b-instruct");
        assert_eq!(config.llm.base_url, "https://integrate.api.nvidia.com/v1");
        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.llm.top_p, 0.7);
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.vector_store.nprobe, 10);
        assert!(config.rag.retrieval_only_without_llm);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let app = AppConfig::from_yaml("", "").unwrap();
        assert_eq!(app.config.server.port, 8080);
        assert!(app.prompts.document.contains("{document_text}"));
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = r#"
vector_store:
  backend: qdrant
  collection: reports
embedding:
  dimension: 384
directory:
  recursive: false
rag:
  retrieval_only_without_llm: false
"#;
        let app = AppConfig::from_yaml(yaml, "no_results: nothing").unwrap();
        assert_eq!(app.config.vector_store.backend, VectorBackend::Qdrant);
        assert_eq!(app.config.vector_store.collection, "reports");
        assert_eq!(app.config.vector_store.url, "http://localhost:6334");
        assert_eq!(app.config.embedding.dimension, Some(384));
        assert_eq!(app.config.embedding.provider, EmbeddingProvider::Openai);
        assert!(!app.config.directory.recursive);
        assert!(!app.config.directory.include_hidden);
        assert!(!app.config.rag.retrieval_only_without_llm);
        assert_eq!(app.config.rag.top_k, 5);
        assert_eq!(app.prompts.no_results, "nothing");
    }

    #[test]
    fn test_invalid_yaml_is_validation_error() {
        let err = AppConfig::from_yaml("server: [1, 2", "").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
