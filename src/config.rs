use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default embedding endpoint (a local Ollama-compatible server).
pub const DEFAULT_EMBEDDING_API_URL: &str = "http://localhost:11434";

/// Where the embedding client sends its requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingEndpoint {
    /// Offline stub: fixed vectors, no I/O.
    Debug,
    /// Base URL of a real endpoint, without trailing slash.
    Remote(String),
}

impl EmbeddingEndpoint {
    /// Parse an `EMBEDDING_API_URL`-style value. The literal `debug` selects the stub.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value == "debug" {
            Self::Debug
        } else if value.is_empty() {
            Self::Remote(DEFAULT_EMBEDDING_API_URL.to_string())
        } else {
            Self::Remote(value.trim_end_matches('/').to_string())
        }
    }
}

impl Default for EmbeddingEndpoint {
    fn default() -> Self {
        Self::Remote(DEFAULT_EMBEDDING_API_URL.to_string())
    }
}

pub struct Config {
    pub embedding_endpoint: EmbeddingEndpoint,
    /// Per-request timeout for the embedding endpoint.
    pub embedding_timeout: Duration,
    /// Directory holding one sub-folder per packaged tool.
    pub tools_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// - `EMBEDDING_API_URL`: endpoint base URL, or `debug` for the offline stub
    /// - `EMBEDDING_TIMEOUT_SECS`: request timeout (default 30)
    /// - `TOOLS_DIR`: packaged tools directory (default `tools`)
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            embedding_endpoint: env::var("EMBEDDING_API_URL")
                .map(|v| EmbeddingEndpoint::parse(&v))
                .unwrap_or_default(),
            embedding_timeout: Duration::from_secs(
                env::var("EMBEDDING_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            ),
            tools_dir: PathBuf::from(env::var("TOOLS_DIR").unwrap_or_else(|_| "tools".to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_debug_literal() {
        assert_eq!(EmbeddingEndpoint::parse("debug"), EmbeddingEndpoint::Debug);
        assert_eq!(EmbeddingEndpoint::parse(" debug\n"), EmbeddingEndpoint::Debug);
    }

    #[test]
    fn test_parse_strips_trailing_slash() {
        assert_eq!(
            EmbeddingEndpoint::parse("http://embed.local:11434/"),
            EmbeddingEndpoint::Remote("http://embed.local:11434".to_string())
        );
    }

    #[test]
    fn test_empty_value_falls_back_to_default() {
        assert_eq!(EmbeddingEndpoint::parse(""), EmbeddingEndpoint::default());
    }

    #[test]
    fn test_debug_is_case_sensitive() {
        assert!(matches!(
            EmbeddingEndpoint::parse("DEBUG"),
            EmbeddingEndpoint::Remote(_)
        ));
    }
}
