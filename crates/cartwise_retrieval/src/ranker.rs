//! Hybrid ranking: weighted fusion of semantic and predicate retrieval

use cartwise_catalog::{CatalogStore, ProductQuery};
use cartwise_core::{
    format_rupees, Product, Result, RetrievedCandidate, SearchFilters, SearchIntent,
};
use cartwise_runtime::vector::VectorIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;

const SEMANTIC_WEIGHT: f64 = 0.7;
const PREDICATE_WEIGHT: f64 = 0.3;
const DESCRIPTION_MAX_CHARS: usize = 200;

/// A fully enriched search hit ready for analysis or direct display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedProduct {
    pub id: i64,
    pub name: String,
    pub brand: String,
    pub model: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub price: f64,
    pub mrp: f64,
    pub discount_percent: f64,
    pub rating: f64,
    pub review_count: i64,
    pub in_stock: bool,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub specifications: std::collections::BTreeMap<String, String>,
    pub search_score: f64,
}

impl RankedProduct {
    fn new(product: &Product, search_score: f64) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            brand: product.brand.clone(),
            model: product.model.clone(),
            category: product.category.clone(),
            subcategory: product.subcategory.clone(),
            price: product.price,
            mrp: product.mrp_or_price(),
            discount_percent: product.discount_percent(),
            rating: product.rating,
            review_count: product.review_count,
            in_stock: product.in_stock,
            description: product.description.as_deref().map(truncate_description),
            features: product.features.clone(),
            specifications: product.specifications.clone(),
            search_score,
        }
    }
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        let truncated: String = description.chars().take(DESCRIPTION_MAX_CHARS).collect();
        format!("{truncated}...")
    } else {
        description.to_string()
    }
}

/// Merges semantic vector hits with attribute-predicate hits into one ranked
/// list. A vector index outage degrades to predicate-only ranking; a catalog
/// failure is fatal for the request.
pub struct HybridRanker {
    index: Arc<dyn VectorIndex>,
    catalog: Arc<dyn CatalogStore>,
}

impl HybridRanker {
    pub fn new(index: Arc<dyn VectorIndex>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { index, catalog }
    }

    /// Run the full hybrid search and return at most `limit` enriched hits.
    pub async fn search(
        &self,
        query: &str,
        intent: &SearchIntent,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<RankedProduct>> {
        let limit = limit.clamp(1, MAX_LIMIT);

        // Explicit caller filters win; intent fills the gaps
        let category = filters.category.clone().or_else(|| intent.category.clone());
        let min_price = filters.min_price.or(intent.min_price);
        let max_price = filters.max_price.or(intent.max_price);
        let min_rating = filters.min_rating;

        let semantic = self
            .semantic_leg(query, category.as_deref(), min_price, max_price, min_rating, limit)
            .await;

        let predicate_query = ProductQuery {
            category,
            brand: intent.brand.clone(),
            keywords: intent.keywords.clone(),
            min_price,
            max_price,
            min_rating,
            limit: (limit * 2) as i64,
        };
        let predicate_ids: Vec<i64> = self
            .catalog
            .search(&predicate_query)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        debug!(
            semantic = semantic.len(),
            predicate = predicate_ids.len(),
            "hybrid legs complete"
        );

        let candidates = fuse(&semantic, &predicate_ids, limit);
        self.enrich(&candidates).await
    }

    /// Semantic leg: vector search for up to 2x limit candidates, post-filtered
    /// on category/price/rating. Outages degrade gracefully to an empty leg.
    async fn semantic_leg(
        &self,
        query: &str,
        category: Option<&str>,
        min_price: Option<f64>,
        max_price: Option<f64>,
        min_rating: Option<f64>,
        limit: usize,
    ) -> Vec<(i64, f64)> {
        let hits = match self.index.search(query, limit * 2).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Vector index unavailable, falling back to predicate-only ranking: {e}");
                return Vec::new();
            }
        };

        hits.into_iter()
            .filter(|hit| {
                let meta = &hit.metadata;
                if let Some(category) = category {
                    let filter = category.to_lowercase();
                    let in_category = meta.category.to_lowercase().contains(&filter)
                        || meta.subcategory.to_lowercase().contains(&filter);
                    if !in_category {
                        return false;
                    }
                }
                if min_price.is_some_and(|min| meta.price < min) {
                    return false;
                }
                if max_price.is_some_and(|max| meta.price > max) {
                    return false;
                }
                if min_rating.is_some_and(|min| meta.rating < min) {
                    return false;
                }
                true
            })
            .map(|hit| (hit.metadata.product_id, hit.similarity()))
            .collect()
    }

    async fn enrich(&self, candidates: &[RetrievedCandidate]) -> Result<Vec<RankedProduct>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = candidates.iter().map(|c| c.product_id).collect();
        let products = self.catalog.products(&ids).await?;
        let by_id: HashMap<i64, &Product> = products.iter().map(|p| (p.id, p)).collect();

        Ok(candidates
            .iter()
            .filter_map(|c| by_id.get(&c.product_id).map(|p| RankedProduct::new(p, c.fused_score)))
            .collect())
    }
}

/// Union both legs by product id: the semantic leg contributes
/// `0.7 x similarity`, the predicate leg adds a flat `0.3`. Products present
/// in both get both contributions.
fn fuse(semantic: &[(i64, f64)], predicate_ids: &[i64], limit: usize) -> Vec<RetrievedCandidate> {
    let mut combined: HashMap<i64, RetrievedCandidate> = HashMap::new();

    for (product_id, similarity) in semantic {
        let mut candidate = RetrievedCandidate::semantic(*product_id, *similarity);
        candidate.fused_score = SEMANTIC_WEIGHT * similarity;
        combined.insert(*product_id, candidate);
    }

    for product_id in predicate_ids {
        combined
            .entry(*product_id)
            .and_modify(|c| {
                c.keyword_match = true;
                c.fused_score += PREDICATE_WEIGHT;
            })
            .or_insert_with(|| {
                let mut candidate = RetrievedCandidate::predicate(*product_id);
                candidate.fused_score = PREDICATE_WEIGHT;
                candidate
            });
    }

    let mut candidates: Vec<RetrievedCandidate> = combined.into_values().collect();
    candidates.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.product_id.cmp(&b.product_id))
    });
    candidates.truncate(limit);
    candidates
}

/// One-line rule-based summary of a result set.
pub fn search_summary(query: &str, products: &[RankedProduct]) -> String {
    match products.first() {
        Some(top) => format!(
            "Found {} products matching '{}'. Top pick: {} at {} with {} rating.",
            products.len(),
            query,
            top.name,
            format_rupees(top.price),
            top.rating
        ),
        None => format!(
            "No products found matching '{query}'. Try different keywords or broader search terms."
        ),
    }
}

/// Up to three quick recommendations: best value, top rated, best deal.
pub fn quick_recommendations(products: &[RankedProduct]) -> Vec<String> {
    let mut recommendations = Vec::new();
    if products.is_empty() {
        return recommendations;
    }

    if products.len() >= 2 {
        if let Some(best_value) = products.iter().min_by(|a, b| {
            let va = a.price / a.rating.max(1.0);
            let vb = b.price / b.rating.max(1.0);
            va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
        }) {
            recommendations.push(format!(
                "Best Value: {} - Great features at {}",
                best_value.name,
                format_rupees(best_value.price)
            ));
        }
    }

    if let Some(top_rated) = products.iter().max_by(|a, b| {
        a.rating.partial_cmp(&b.rating).unwrap_or(std::cmp::Ordering::Equal)
    }) {
        if top_rated.rating >= 4.0 {
            recommendations.push(format!(
                "Top Rated: {} - {}/5 with {} reviews",
                top_rated.name, top_rated.rating, top_rated.review_count
            ));
        }
    }

    if let Some(best_deal) = products.iter().max_by(|a, b| {
        a.discount_percent
            .partial_cmp(&b.discount_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
    }) {
        if best_deal.discount_percent > 10.0 {
            recommendations.push(format!(
                "Best Deal: {} - {}% off!",
                best_deal.name, best_deal.discount_percent
            ));
        }
    }

    recommendations.truncate(3);
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartwise_catalog::MemoryCatalog;
    use cartwise_runtime::vector::{MockVectorIndex, ProductMetadata, SimilarProduct};
    use std::collections::BTreeMap;

    fn product(id: i64, name: &str, price: f64, rating: f64, reviews: i64) -> Product {
        Product {
            id,
            name: name.into(),
            brand: "Acme".into(),
            model: None,
            category: "Electronics".into(),
            subcategory: Some("Headphones".into()),
            price,
            mrp: Some(price * 1.2),
            description: Some("A long description ".repeat(20)),
            features: vec!["wireless".into()],
            specifications: BTreeMap::new(),
            rating,
            review_count: reviews,
            in_stock: true,
        }
    }

    fn hit(id: i64, distance: f64, price: f64) -> SimilarProduct {
        SimilarProduct {
            metadata: ProductMetadata {
                product_id: id,
                name: format!("Product {id}"),
                brand: "Acme".into(),
                category: "Electronics".into(),
                subcategory: "Headphones".into(),
                price,
                rating: 4.0,
                review_count: 50,
                features: "[]".into(),
            },
            distance,
        }
    }

    #[test]
    fn test_fusion_weights() {
        let semantic = vec![(1, 0.9), (2, 0.5)];
        let predicate = vec![2, 3];
        let fused = fuse(&semantic, &predicate, 10);

        let by_id: HashMap<i64, &RetrievedCandidate> =
            fused.iter().map(|c| (c.product_id, c)).collect();

        assert!((by_id[&1].fused_score - 0.63).abs() < 1e-9);
        assert!((by_id[&2].fused_score - 0.65).abs() < 1e-9);
        assert!((by_id[&3].fused_score - 0.3).abs() < 1e-9);

        // product in both legs outranks semantic-only despite lower similarity
        assert_eq!(fused[0].product_id, 2);
        assert!(by_id[&2].keyword_match);
        assert!(!by_id[&1].keyword_match);
    }

    #[test]
    fn test_fusion_truncates_and_breaks_ties_by_id() {
        let semantic = vec![];
        let predicate = vec![5, 3, 9];
        let fused = fuse(&semantic, &predicate, 2);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].product_id, 3);
        assert_eq!(fused[1].product_id, 5);
    }

    #[tokio::test]
    async fn test_index_outage_degrades_to_predicate_only() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_product(product(1, "Wireless Headphones", 2999.0, 4.5, 200));

        let ranker = Arc::new(HybridRanker::new(
            Arc::new(MockVectorIndex::failing()),
            catalog,
        ));
        let intent = SearchIntent::fallback("wireless headphones");
        let hits = ranker
            .search("wireless headphones", &intent, &SearchFilters::default(), 10)
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert!((hits[0].search_score - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_both_legs_merge_and_enrich() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_product(product(1, "Wireless Headphones", 2999.0, 4.5, 200));
        catalog.add_product(product(2, "Gaming Mouse", 1999.0, 4.0, 80));

        let index = Arc::new(MockVectorIndex::new(vec![hit(1, 0.2, 2999.0)]));
        let ranker = HybridRanker::new(index, catalog);

        let intent = SearchIntent {
            keywords: vec!["wireless".into()],
            ..SearchIntent::default()
        };
        let hits = ranker
            .search("wireless headphones", &intent, &SearchFilters::default(), 10)
            .await
            .unwrap();

        assert_eq!(hits[0].id, 1);
        // 0.7 * 0.8 + 0.3
        assert!((hits[0].search_score - 0.86).abs() < 1e-9);
        // description is truncated with ellipsis
        let desc = hits[0].description.as_deref().unwrap();
        assert!(desc.ends_with("..."));
        assert_eq!(desc.chars().count(), DESCRIPTION_MAX_CHARS + 3);
    }

    #[tokio::test]
    async fn test_semantic_post_filter_applies_price_cap() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_product(product(1, "Budget Buds", 2999.0, 4.5, 200));
        catalog.add_product(product(2, "Premium Cans", 29_999.0, 4.8, 500));

        let index = Arc::new(MockVectorIndex::new(vec![
            hit(1, 0.2, 2999.0),
            hit(2, 0.1, 29_999.0),
        ]));
        let ranker = HybridRanker::new(index, catalog);

        let filters = SearchFilters {
            max_price: Some(5000.0),
            ..SearchFilters::default()
        };
        let hits = ranker
            .search("headphones", &SearchIntent::default(), &filters, 10)
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[tokio::test]
    async fn test_empty_legs_yield_empty_result() {
        let ranker = HybridRanker::new(
            Arc::new(MockVectorIndex::empty()),
            Arc::new(MemoryCatalog::new()),
        );
        let hits = ranker
            .search("nonexistent-sku-XYZ", &SearchIntent::fallback("nonexistent-sku-XYZ"),
                &SearchFilters::default(), 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_summary_and_recommendations() {
        let p1 = RankedProduct::new(&product(1, "Buds", 2000.0, 4.5, 100), 0.9);
        let p2 = RankedProduct::new(&product(2, "Cans", 4000.0, 4.0, 50), 0.5);

        let summary = search_summary("headphones", &[p1.clone(), p2.clone()]);
        assert!(summary.contains("Buds"));
        assert!(summary.contains("₹2,000"));

        let recs = quick_recommendations(&[p1, p2]);
        assert!(recs.iter().any(|r| r.starts_with("Best Value")));
        assert!(recs.iter().any(|r| r.starts_with("Top Rated")));
        assert!(recs.iter().any(|r| r.starts_with("Best Deal")));

        let empty = search_summary("nonexistent-sku-XYZ", &[]);
        assert!(empty.starts_with("No products found"));
    }
}
