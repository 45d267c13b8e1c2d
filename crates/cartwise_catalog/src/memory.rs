//! In-memory catalog used by tests across the workspace
//!
//! Mirrors the SQL semantics of `PgCatalog` (case-insensitive LIKE matching,
//! popularity ordering, windowed history) over plain vectors.

use crate::store::{CatalogStore, ProductQuery};
use async_trait::async_trait;
use cartwise_core::{CardOffer, PricePoint, Product, Result, Review};
use chrono::{Duration, Utc};
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryCatalog {
    products: RwLock<Vec<Product>>,
    reviews: RwLock<Vec<Review>>,
    price_points: RwLock<Vec<PricePoint>>,
    offers: RwLock<Vec<CardOffer>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, product: Product) {
        self.products.write().unwrap().push(product);
    }

    pub fn add_review(&self, review: Review) {
        self.reviews.write().unwrap().push(review);
    }

    pub fn add_price_point(&self, point: PricePoint) {
        self.price_points.write().unwrap().push(point);
    }

    pub fn add_offer(&self, offer: CardOffer) {
        self.offers.write().unwrap().push(offer);
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_keyword(product: &Product, keyword: &str) -> bool {
    contains_ci(&product.name, keyword)
        || product
            .description
            .as_deref()
            .is_some_and(|d| contains_ci(d, keyword))
        || contains_ci(&product.category, keyword)
        || product
            .subcategory
            .as_deref()
            .is_some_and(|s| contains_ci(s, keyword))
        || contains_ci(&product.brand, keyword)
        || product.model.as_deref().is_some_and(|m| contains_ci(m, keyword))
        || product.features.iter().any(|f| contains_ci(f, keyword))
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn product(&self, id: i64) -> Result<Option<Product>> {
        Ok(self
            .products
            .read()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn products(&self, ids: &[i64]) -> Result<Vec<Product>> {
        Ok(self
            .products
            .read()
            .unwrap()
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn search(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let mut hits: Vec<Product> = self
            .products
            .read()
            .unwrap()
            .iter()
            .filter(|p| {
                if let Some(category) = &query.category {
                    let in_category = contains_ci(&p.category, category)
                        || p.subcategory
                            .as_deref()
                            .is_some_and(|s| contains_ci(s, category));
                    if !in_category {
                        return false;
                    }
                }
                if let Some(brand) = &query.brand {
                    if !contains_ci(&p.brand, brand) {
                        return false;
                    }
                }
                if let Some(min_price) = query.min_price {
                    if p.price < min_price {
                        return false;
                    }
                }
                if let Some(max_price) = query.max_price {
                    if p.price > max_price {
                        return false;
                    }
                }
                if let Some(min_rating) = query.min_rating {
                    if p.rating < min_rating {
                        return false;
                    }
                }
                if !query.keywords.is_empty()
                    && !query.keywords.iter().any(|k| matches_keyword(p, k))
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        hits.sort_by(|a, b| {
            let pa = a.rating * a.review_count as f64;
            let pb = b.rating * b.review_count as f64;
            pb.partial_cmp(&pa).unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(query.limit.max(1) as usize);
        Ok(hits)
    }

    async fn reviews(&self, product_id: i64, limit: i64) -> Result<Vec<Review>> {
        let mut hits: Vec<Review> = self
            .reviews
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.helpful_count.cmp(&a.helpful_count));
        hits.truncate(limit.max(0) as usize);
        Ok(hits)
    }

    async fn price_history(&self, product_id: i64, days: i64) -> Result<Vec<PricePoint>> {
        let cutoff = Utc::now() - Duration::days(days);
        let mut hits: Vec<PricePoint> = self
            .price_points
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.product_id == product_id && p.recorded_at >= cutoff)
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(hits)
    }

    async fn card_offers(&self, product_id: i64) -> Result<Vec<CardOffer>> {
        Ok(self
            .offers
            .read()
            .unwrap()
            .iter()
            .filter(|o| o.product_id == product_id && o.is_active)
            .cloned()
            .collect())
    }

    async fn deal_candidates(&self, category: Option<&str>, limit: i64) -> Result<Vec<Product>> {
        let mut hits: Vec<Product> = self
            .products
            .read()
            .unwrap()
            .iter()
            .filter(|p| {
                p.in_stock
                    && p.mrp.is_some_and(|mrp| mrp > p.price)
                    && category
                        .map(|c| p.category.eq_ignore_ascii_case(c))
                        .unwrap_or(true)
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            b.discount_percent()
                .partial_cmp(&a.discount_percent())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit.max(1) as usize);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn product(id: i64, name: &str, category: &str, subcategory: &str, price: f64) -> Product {
        Product {
            id,
            name: name.into(),
            brand: "Acme".into(),
            model: None,
            category: category.into(),
            subcategory: Some(subcategory.into()),
            price,
            mrp: Some(price * 1.25),
            description: Some(format!("{name} description")),
            features: vec!["wireless".into()],
            specifications: BTreeMap::new(),
            rating: 4.0,
            review_count: 100,
            in_stock: true,
        }
    }

    #[tokio::test]
    async fn test_category_matches_subcategory() {
        let catalog = MemoryCatalog::new();
        catalog.add_product(product(1, "ZenBook 14", "Electronics", "Laptops", 60_000.0));
        catalog.add_product(product(2, "Buds Pro", "Electronics", "Headphones", 5_000.0));

        let query = ProductQuery {
            category: Some("Laptops".into()),
            limit: 10,
            ..Default::default()
        };
        let hits = catalog.search(&query).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[tokio::test]
    async fn test_keyword_disjunction_and_price_filter() {
        let catalog = MemoryCatalog::new();
        catalog.add_product(product(1, "Wireless Headphones", "Electronics", "Headphones", 2_999.0));
        catalog.add_product(product(2, "Wired Earphones", "Electronics", "Headphones", 999.0));

        let query = ProductQuery {
            keywords: vec!["wireless".into()],
            max_price: Some(5_000.0),
            limit: 10,
            ..Default::default()
        };
        let hits = catalog.search(&query).await.unwrap();
        // both match: product 2 carries "wireless" in its feature list
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_reviews_sorted_by_helpfulness() {
        let catalog = MemoryCatalog::new();
        for (i, helpful) in [3_i64, 10, 7].iter().enumerate() {
            catalog.add_review(Review {
                product_id: 1,
                rating: 4,
                text: format!("review {i}"),
                verified_purchase: true,
                helpful_count: *helpful,
                created_at: Utc::now(),
            });
        }
        let reviews = catalog.reviews(1, 2).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].helpful_count, 10);
        assert_eq!(reviews[1].helpful_count, 7);
    }

    #[tokio::test]
    async fn test_price_history_window() {
        let catalog = MemoryCatalog::new();
        catalog.add_price_point(PricePoint {
            product_id: 1,
            price: 100.0,
            recorded_at: Utc::now() - Duration::days(2),
        });
        catalog.add_price_point(PricePoint {
            product_id: 1,
            price: 120.0,
            recorded_at: Utc::now() - Duration::days(40),
        });

        let history = catalog.price_history(1, 30).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].price, 100.0);
    }

    #[tokio::test]
    async fn test_deal_candidates_require_stock_and_mrp() {
        let catalog = MemoryCatalog::new();
        let mut no_mrp = product(1, "No MRP", "Electronics", "Laptops", 1000.0);
        no_mrp.mrp = None;
        catalog.add_product(no_mrp);
        let mut out_of_stock = product(2, "Gone", "Electronics", "Laptops", 1000.0);
        out_of_stock.in_stock = false;
        catalog.add_product(out_of_stock);
        catalog.add_product(product(3, "Deal", "Electronics", "Laptops", 1000.0));

        let deals = catalog.deal_candidates(Some("electronics"), 10).await.unwrap();
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].id, 3);
    }
}
