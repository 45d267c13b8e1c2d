//! Request-scoped retrieval types: parsed intent, filters, candidates

use serde::{Deserialize, Serialize};

/// Structured interpretation of a free-text shopper query.
///
/// Every field is optional; an absent field means "no constraint". A usable
/// intent always exists: when LLM extraction fails the fallback carries just
/// the whitespace-tokenized keywords.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchIntent {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub keywords: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub features: Vec<String>,
    /// Free-text restatement of what the shopper wants
    pub summary: Option<String>,
}

impl SearchIntent {
    /// Keyword-only intent used when LLM extraction is unavailable.
    pub fn fallback(query: &str) -> Self {
        Self {
            keywords: query
                .split_whitespace()
                .map(|w| w.to_lowercase())
                .collect(),
            summary: Some(query.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.brand.is_none()
            && self.keywords.is_empty()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.features.is_empty()
    }
}

/// Explicit filter overrides supplied by the API caller.
///
/// Overrides win over the parsed intent; intent fields fill the gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
}

/// A product surfaced by the hybrid ranker before enrichment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedCandidate {
    pub product_id: i64,
    /// Cosine similarity in [0,1]; absent when the semantic leg did not match
    pub semantic_score: Option<f64>,
    /// Whether the attribute-predicate leg matched
    pub keyword_match: bool,
    /// Weighted fusion of both legs, in [0,1]
    pub fused_score: f64,
}

impl RetrievedCandidate {
    /// Candidate contributed by the semantic leg only.
    pub fn semantic(product_id: i64, similarity: f64) -> Self {
        Self {
            product_id,
            semantic_score: Some(similarity),
            keyword_match: false,
            fused_score: 0.0,
        }
    }

    /// Candidate contributed by the predicate leg only.
    pub fn predicate(product_id: i64) -> Self {
        Self {
            product_id,
            semantic_score: None,
            keyword_match: true,
            fused_score: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_intent() {
        let intent = SearchIntent::fallback("Wireless Headphones under 5000");
        assert_eq!(intent.keywords, vec!["wireless", "headphones", "under", "5000"]);
        assert!(intent.category.is_none());
        assert!(intent.min_price.is_none());
        assert_eq!(intent.summary.as_deref(), Some("Wireless Headphones under 5000"));
    }

    #[test]
    fn test_empty_intent() {
        assert!(SearchIntent::default().is_empty());
        assert!(!SearchIntent::fallback("phone").is_empty());
    }
}
