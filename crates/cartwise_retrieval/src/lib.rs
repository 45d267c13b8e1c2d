//! Hybrid retrieval: intent parsing and semantic + predicate ranking
//!
//! The flow is sequential within a request: the intent parser turns the raw
//! query into a `SearchIntent`, the hybrid ranker fans out to the vector
//! index and the catalog, fuses both result sets, and enriches the survivors
//! with full product detail.

pub mod intent;
pub mod ranker;

pub use intent::IntentParser;
pub use ranker::{
    quick_recommendations, search_summary, HybridRanker, RankedProduct, DEFAULT_LIMIT, MAX_LIMIT,
};
