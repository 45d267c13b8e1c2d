//! Configuration management for the engine

use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub llm: LlmConfig,
    pub index: IndexConfig,
    pub catalog: CatalogConfig,
    pub server: ServerConfig,
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            llm: LlmConfig::from_env(),
            index: IndexConfig::from_env(),
            catalog: CatalogConfig::from_env(),
            server: ServerConfig::from_env(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            index: IndexConfig::default(),
            catalog: CatalogConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("LLM_ENDPOINT")
                .unwrap_or_else(|_| "http://127.0.0.1:11434".to_string()),
            model: env::var("LLM_MODEL").unwrap_or_else(|_| "llama3.1".to_string()),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434".to_string(),
            model: "llama3.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub endpoint: String,
}

impl IndexConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("VECTOR_INDEX_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8100".to_string()),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8100".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub database_url: String,
    /// Permanent pool connections
    pub pool_size: u32,
    /// Additional connections allowed under load
    pub pool_overflow: u32,
}

impl CatalogConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/cartwise".to_string()),
            pool_size: env::var("DB_POOL_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            pool_overflow: env::var("DB_POOL_OVERFLOW")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .unwrap_or(20),
        }
    }

    pub fn max_connections(&self) -> u32 {
        self.pool_size + self.pool_overflow
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/cartwise".to_string(),
            pool_size: 10,
            pool_overflow: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.catalog.max_connections(), 30);
        assert!(config.server.cors_origins.is_empty());
    }
}
