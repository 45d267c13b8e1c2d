//! Vector index client for semantic product search

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index request failed: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Product attributes stored alongside each embedding.
///
/// `features` is kept as a JSON-encoded string exactly as indexed; callers
/// that need the list decode it themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductMetadata {
    pub product_id: i64,
    pub name: String,
    pub brand: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    pub price: f64,
    pub rating: f64,
    pub review_count: i64,
    #[serde(default)]
    pub features: String,
}

/// A nearest-neighbour match returned by the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarProduct {
    pub metadata: ProductMetadata,
    /// Cosine distance; smaller is closer
    pub distance: f64,
}

impl SimilarProduct {
    /// Similarity score in [0,1] derived from cosine distance.
    pub fn similarity(&self) -> f64 {
        (1.0 - self.distance).clamp(0.0, 1.0)
    }
}

/// Trait for vector index implementations
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed a piece of text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the k nearest products to an embedding
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SimilarProduct>>;

    /// Embed then query in one step
    async fn search(&self, text: &str, k: usize) -> Result<Vec<SimilarProduct>> {
        let embedding = self.embed(text).await?;
        self.query(&embedding, k).await
    }
}

/// Client for an HTTP-fronted similarity index
pub struct HttpVectorIndex {
    base_url: String,
    client: reqwest::Client,
}

impl HttpVectorIndex {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| IndexError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IndexError::ApiError(format!("HTTP {}", response.status())));
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            embedding: Vec<f32>,
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| IndexError::SerializationError(e.to_string()))?;
        Ok(parsed.embedding)
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SimilarProduct>> {
        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&serde_json::json!({ "embedding": embedding, "k": k }))
            .send()
            .await
            .map_err(|e| IndexError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IndexError::ApiError(format!("HTTP {}", response.status())));
        }

        #[derive(Deserialize)]
        struct QueryResponse {
            matches: Vec<SimilarProduct>,
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| IndexError::SerializationError(e.to_string()))?;
        Ok(parsed.matches)
    }
}

/// In-process index for tests: returns a canned result list
pub struct MockVectorIndex {
    pub results: Vec<SimilarProduct>,
    /// When set, every call fails; exercises predicate-only degradation
    pub fail: bool,
}

impl MockVectorIndex {
    pub fn new(results: Vec<SimilarProduct>) -> Self {
        Self { results, fail: false }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            results: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl VectorIndex for MockVectorIndex {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(IndexError::ApiError("mock index failure".to_string()));
        }
        Ok(vec![0.0; 384])
    }

    async fn query(&self, _embedding: &[f32], k: usize) -> Result<Vec<SimilarProduct>> {
        if self.fail {
            return Err(IndexError::ApiError("mock index failure".to_string()));
        }
        Ok(self.results.iter().take(k).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(id: i64) -> ProductMetadata {
        ProductMetadata {
            product_id: id,
            name: format!("Product {id}"),
            brand: "Brand".into(),
            category: "Electronics".into(),
            subcategory: "Headphones".into(),
            price: 2999.0,
            rating: 4.2,
            review_count: 120,
            features: "[]".into(),
        }
    }

    #[test]
    fn test_similarity_from_distance() {
        let hit = SimilarProduct { metadata: metadata(1), distance: 0.25 };
        assert!((hit.similarity() - 0.75).abs() < 1e-9);

        // Distances above 1.0 clamp to zero similarity rather than going negative
        let far = SimilarProduct { metadata: metadata(2), distance: 1.4 };
        assert_eq!(far.similarity(), 0.0);
    }

    #[tokio::test]
    async fn test_mock_index_takes_k() {
        let index = MockVectorIndex::new(vec![
            SimilarProduct { metadata: metadata(1), distance: 0.1 },
            SimilarProduct { metadata: metadata(2), distance: 0.2 },
            SimilarProduct { metadata: metadata(3), distance: 0.3 },
        ]);
        let hits = index.search("headphones", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.product_id, 1);
    }

    #[tokio::test]
    async fn test_mock_index_failure() {
        let index = MockVectorIndex::failing();
        assert!(index.search("headphones", 5).await.is_err());
    }
}
