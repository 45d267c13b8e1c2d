//! Catalog store trait and the Postgres implementation

use async_trait::async_trait;
use cartwise_core::{CardOffer, Error, OfferKind, PricePoint, Product, Result, Review};
use cartwise_runtime::config::CatalogConfig;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, QueryBuilder, Row};
use std::collections::BTreeMap;
use tracing::info;

/// Attribute-predicate search over the products table
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Matched case-insensitively against category OR subcategory
    pub category: Option<String>,
    pub brand: Option<String>,
    /// Disjunction: a product matches when any keyword appears in any
    /// searchable text field
    pub keywords: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub limit: i64,
}

impl ProductQuery {
    pub fn with_limit(limit: i64) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

/// Read-only access to the catalog tables
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetch one product by id
    async fn product(&self, id: i64) -> Result<Option<Product>>;

    /// Fetch several products by id; order is unspecified
    async fn products(&self, ids: &[i64]) -> Result<Vec<Product>>;

    /// Attribute search sorted by popularity (rating x review_count)
    async fn search(&self, query: &ProductQuery) -> Result<Vec<Product>>;

    /// Reviews for a product, most helpful first
    async fn reviews(&self, product_id: i64, limit: i64) -> Result<Vec<Review>>;

    /// Price observations within the trailing window, newest first
    async fn price_history(&self, product_id: i64, days: i64) -> Result<Vec<PricePoint>>;

    /// Active card offers for a product (validity window checked by callers)
    async fn card_offers(&self, product_id: i64) -> Result<Vec<CardOffer>>;

    /// In-stock products carrying an MRP, best discount first
    async fn deal_candidates(&self, category: Option<&str>, limit: i64) -> Result<Vec<Product>>;
}

fn catalog_err(e: sqlx::Error) -> Error {
    Error::Catalog(e.to_string())
}

#[derive(FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    brand: Option<String>,
    model: Option<String>,
    category: String,
    subcategory: Option<String>,
    price: f64,
    mrp: Option<f64>,
    description: Option<String>,
    features: Option<String>,
    specifications: Option<String>,
    rating: Option<f64>,
    review_count: Option<i64>,
    in_stock: Option<bool>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        // features/specifications are persisted as JSON text; tolerate garbage
        let features: Vec<String> = row
            .features
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();
        let specifications: BTreeMap<String, serde_json::Value> = row
            .specifications
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();
        let specifications = specifications
            .into_iter()
            .map(|(k, v)| {
                let rendered = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, rendered)
            })
            .collect();

        Product {
            id: row.id,
            name: row.name,
            brand: row.brand.unwrap_or_default(),
            model: row.model,
            category: row.category,
            subcategory: row.subcategory,
            price: row.price,
            mrp: row.mrp,
            description: row.description,
            features,
            specifications,
            rating: row.rating.unwrap_or(0.0),
            review_count: row.review_count.unwrap_or(0),
            in_stock: row.in_stock.unwrap_or(true),
        }
    }
}

#[derive(FromRow)]
struct ReviewRow {
    product_id: i64,
    rating: i32,
    review_text: Option<String>,
    verified_purchase: Option<bool>,
    helpful_count: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            product_id: row.product_id,
            rating: row.rating,
            text: row.review_text.unwrap_or_default(),
            verified_purchase: row.verified_purchase.unwrap_or(false),
            helpful_count: row.helpful_count.unwrap_or(0),
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct OfferRow {
    id: i64,
    product_id: i64,
    bank_name: String,
    card_type: Option<String>,
    offer_type: String,
    discount_percent: Option<f64>,
    discount_amount: Option<f64>,
    cashback_amount: Option<f64>,
    emi_tenure: Option<String>,
    is_no_cost_emi: Option<bool>,
    min_transaction_amount: Option<f64>,
    offer_description: Option<String>,
    is_active: Option<bool>,
    valid_from: Option<DateTime<Utc>>,
    valid_till: Option<DateTime<Utc>>,
}

impl From<OfferRow> for CardOffer {
    fn from(row: OfferRow) -> Self {
        CardOffer {
            id: row.id,
            product_id: row.product_id,
            bank_name: row.bank_name,
            card_type: row.card_type,
            kind: OfferKind::parse(&row.offer_type).unwrap_or(OfferKind::InstantDiscount),
            discount_percent: row.discount_percent,
            discount_amount: row.discount_amount,
            cashback_amount: row.cashback_amount,
            // tenure is stored as text in the legacy schema; normalize to months
            emi_tenure_months: row.emi_tenure.as_deref().and_then(|t| t.trim().parse().ok()),
            is_no_cost_emi: row.is_no_cost_emi.unwrap_or(false),
            min_transaction_amount: row.min_transaction_amount,
            description: row.offer_description,
            is_active: row.is_active.unwrap_or(false),
            valid_from: row.valid_from,
            valid_till: row.valid_till,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, brand, model, category, subcategory, price, mrp, \
     description, features, specifications, rating, review_count, in_stock";

/// Postgres-backed catalog store
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Connect with a bounded pool and pre-use validation.
    pub async fn connect(config: &CatalogConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(config.pool_size)
            .max_connections(config.max_connections())
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await
            .map_err(catalog_err)?;

        info!(
            "Catalog pool ready ({} + {} overflow connections)",
            config.pool_size, config.pool_overflow
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn product(&self, id: i64) -> Result<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(catalog_err)?;

        Ok(row.map(Product::from))
    }

    async fn products(&self, ids: &[i64]) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(catalog_err)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn search(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1=1"));

        if let Some(category) = &query.category {
            let pattern = format!("%{category}%");
            builder.push(" AND (category ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR subcategory ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        if let Some(brand) = &query.brand {
            builder.push(" AND brand ILIKE ");
            builder.push_bind(format!("%{brand}%"));
        }

        if let Some(min_price) = query.min_price {
            builder.push(" AND price >= ");
            builder.push_bind(min_price);
        }

        if let Some(max_price) = query.max_price {
            builder.push(" AND price <= ");
            builder.push_bind(max_price);
        }

        if let Some(min_rating) = query.min_rating {
            builder.push(" AND rating >= ");
            builder.push_bind(min_rating);
        }

        if !query.keywords.is_empty() {
            builder.push(" AND (");
            for (i, keyword) in query.keywords.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                let pattern = format!("%{keyword}%");
                for (j, column) in [
                    "name",
                    "description",
                    "category",
                    "subcategory",
                    "brand",
                    "model",
                    "features",
                ]
                .iter()
                .enumerate()
                {
                    if j > 0 {
                        builder.push(" OR ");
                    }
                    builder.push(format!("{column} ILIKE "));
                    builder.push_bind(pattern.clone());
                }
            }
            builder.push(")");
        }

        builder.push(" ORDER BY rating * review_count DESC LIMIT ");
        builder.push_bind(query.limit.max(1));

        let rows: Vec<ProductRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(catalog_err)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn reviews(&self, product_id: i64, limit: i64) -> Result<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            "SELECT product_id, rating, review_text, verified_purchase, helpful_count, created_at \
             FROM reviews WHERE product_id = $1 ORDER BY helpful_count DESC LIMIT $2",
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(catalog_err)?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn price_history(&self, product_id: i64, days: i64) -> Result<Vec<PricePoint>> {
        let cutoff = Utc::now() - Duration::days(days);
        let rows = sqlx::query(
            "SELECT product_id, price, recorded_at FROM price_history \
             WHERE product_id = $1 AND recorded_at >= $2 ORDER BY recorded_at DESC",
        )
        .bind(product_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(catalog_err)?;

        Ok(rows
            .into_iter()
            .map(|row| PricePoint {
                product_id: row.get("product_id"),
                price: row.get("price"),
                recorded_at: row.get("recorded_at"),
            })
            .collect())
    }

    async fn card_offers(&self, product_id: i64) -> Result<Vec<CardOffer>> {
        let rows: Vec<OfferRow> = sqlx::query_as(
            "SELECT id, product_id, bank_name, card_type, offer_type, discount_percent, \
             discount_amount, cashback_amount, emi_tenure, is_no_cost_emi, \
             min_transaction_amount, offer_description, is_active, valid_from, valid_till \
             FROM card_offers WHERE product_id = $1 AND is_active = TRUE",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(catalog_err)?;

        Ok(rows.into_iter().map(CardOffer::from).collect())
    }

    async fn deal_candidates(&self, category: Option<&str>, limit: i64) -> Result<Vec<Product>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE mrp IS NOT NULL AND mrp > price AND in_stock = TRUE"
        ));

        if let Some(category) = category {
            builder.push(" AND LOWER(category) = LOWER(");
            builder.push_bind(category.to_string());
            builder.push(")");
        }

        builder.push(" ORDER BY (mrp - price) / mrp DESC LIMIT ");
        builder.push_bind(limit.max(1));

        let rows: Vec<ProductRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(catalog_err)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }
}
