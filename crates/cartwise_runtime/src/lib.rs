//! Runtime collaborators for the recommendation engine
//!
//! Houses everything the analysis layer talks to that is not the catalog:
//! the text-generation client, the vector index client, the per-agent TTL
//! caches, and environment-driven configuration. All remote services sit
//! behind traits so tests can substitute in-process fakes.

pub mod cache;
pub mod config;
pub mod llm;
pub mod vector;

pub use cache::{AgentCache, COMPARISON_CACHE_TTL_SECS, PRICE_CACHE_TTL_SECS, REVIEW_CACHE_TTL_SECS};
pub use config::{CatalogConfig, EngineConfig, IndexConfig, LlmConfig, ServerConfig};
pub use llm::{GenerateOptions, GenerateRequest, LlmClient, LlmError, MockLlmClient, OllamaClient};
pub use vector::{HttpVectorIndex, IndexError, MockVectorIndex, ProductMetadata, SimilarProduct, VectorIndex};
