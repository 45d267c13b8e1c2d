//! Route handlers and request/response shapes

use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cartwise_agents::price::DEFAULT_MIN_DISCOUNT;
use cartwise_agents::{ComparisonStyle, PaymentPreference};
use cartwise_core::{AgentResult, Error, SearchFilters};
use cartwise_orchestrator::OrchestrateRequest;
use cartwise_retrieval::{quick_recommendations, search_summary, DEFAULT_LIMIT, MAX_LIMIT};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(api_health))
        .route("/api/orchestrate", post(api_orchestrate))
        .route("/api/orchestrate/simple", post(api_orchestrate_simple))
        .route("/api/search", post(api_search))
        .route("/api/products/:id", get(api_product_detail))
        .route("/api/reviews/:id/analysis", get(api_review_analysis))
        .route("/api/prices/:id/analysis", get(api_price_analysis))
        .route("/api/prices/deals", get(api_deals))
        .route("/api/prices/deals/flash", get(api_flash_deals))
        .route("/api/compare", post(api_compare))
        .route("/api/buyplan", post(api_buy_plan))
        .route("/api/buyplan/recommend", post(api_buy_plan_recommend))
        .with_state(state)
}

/// Error wrapper mapping the engine taxonomy onto HTTP status codes
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) | Error::ProductNotFound(_) => StatusCode::NOT_FOUND,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::Catalog(_) | Error::Serialization(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error!("Request failed: {}", self.0);
        let body = Json(json!({ "success": false, "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

/// Flatten an agent outcome into the `success`-flagged wire shape
fn agent_json<T: Serialize>(result: &AgentResult<T>) -> Json<serde_json::Value> {
    match result {
        AgentResult::Ok(value) => {
            let mut body = serde_json::to_value(value).unwrap_or_else(|_| json!({}));
            if let Some(object) = body.as_object_mut() {
                object.insert("success".to_string(), json!(true));
            }
            Json(body)
        }
        AgentResult::Timeout => Json(json!({ "success": false, "error": "Timeout" })),
        AgentResult::Failed(reason) => Json(json!({ "success": false, "error": reason })),
        AgentResult::Skipped(reason) => Json(json!({ "success": false, "message": reason })),
    }
}

async fn api_health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
pub struct OrchestrateReq {
    pub query: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default)]
    pub user_preference: Option<String>,
    #[serde(default)]
    pub user_cards: Option<Vec<String>>,
}

fn default_top_n() -> usize {
    3
}

async fn api_orchestrate(
    State(state): State<AppState>,
    Json(req): Json<OrchestrateReq>,
) -> Result<Json<cartwise_orchestrator::RecommendationResponse>, ApiError> {
    let request = OrchestrateRequest {
        query: req.query,
        category: req.category,
        min_price: req.min_price,
        max_price: req.max_price,
        top_n: req.top_n,
        user_preference: req.user_preference,
        user_cards: req.user_cards,
    };
    let response = state.orchestrator.orchestrate(&request).await?;
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct SimpleOrchestrateReq {
    pub query: String,
}

async fn api_orchestrate_simple(
    State(state): State<AppState>,
    Json(req): Json<SimpleOrchestrateReq>,
) -> Result<Json<cartwise_orchestrator::RecommendationResponse>, ApiError> {
    let request = OrchestrateRequest::simple(req.query);
    let response = state.orchestrator.orchestrate(&request).await?;
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct SearchReq {
    pub query: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchRes {
    pub success: bool,
    pub query: String,
    pub products: Vec<cartwise_retrieval::RankedProduct>,
    pub count: usize,
    pub reasoning: String,
    pub recommendations: Vec<String>,
    pub search_method: &'static str,
}

async fn api_search(
    State(state): State<AppState>,
    Json(req): Json<SearchReq>,
) -> Result<Json<SearchRes>, ApiError> {
    let limit = req.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(Error::InvalidInput(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        ))
        .into());
    }

    let intent = state.intent.parse(&req.query).await;
    let filters = SearchFilters {
        category: req.category,
        min_price: req.min_price,
        max_price: req.max_price,
        min_rating: req.min_rating,
    };
    let products = state
        .ranker
        .search(&req.query, &intent, &filters, limit)
        .await?;

    let reasoning = search_summary(&req.query, &products);
    let recommendations = quick_recommendations(&products);
    Ok(Json(SearchRes {
        success: true,
        query: req.query,
        count: products.len(),
        reasoning,
        recommendations,
        products,
        search_method: "hybrid",
    }))
}

async fn api_product_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let product = state
        .catalog
        .product(id)
        .await?
        .ok_or(Error::ProductNotFound(id))?;

    let reviews = state.catalog.reviews(id, 10).await?;
    let price_history = state.catalog.price_history(id, 30).await?;
    let offers = state.catalog.card_offers(id).await?;

    Ok(Json(json!({
        "success": true,
        "product": product,
        "reviews": reviews,
        "price_history": price_history,
        "offers": offers,
    })))
}

async fn api_review_analysis(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Json<serde_json::Value> {
    agent_json(&state.reviews.analyze(id).await)
}

async fn api_price_analysis(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Json<serde_json::Value> {
    agent_json(&state.prices.analyze(id).await)
}

#[derive(Deserialize)]
pub struct DealsQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_discount: Option<f64>,
    #[serde(default)]
    pub limit: Option<usize>,
}

async fn api_deals(
    State(state): State<AppState>,
    Query(query): Query<DealsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deals = state
        .prices
        .find_deals(
            query.category.as_deref(),
            query.min_discount.unwrap_or(DEFAULT_MIN_DISCOUNT),
            query.limit.unwrap_or(10),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": deals.len(),
        "category": query.category.unwrap_or_else(|| "All Categories".to_string()),
        "deals": deals,
    })))
}

async fn api_flash_deals(
    State(state): State<AppState>,
    Query(query): Query<DealsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deals = state
        .prices
        .find_flash_deals(query.category.as_deref(), query.limit.unwrap_or(10))
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": deals.len(),
        "category": query.category.unwrap_or_else(|| "All Categories".to_string()),
        "deals": deals,
    })))
}

#[derive(Deserialize)]
pub struct CompareReq {
    pub product_ids: Vec<i64>,
    #[serde(default)]
    pub style: Option<String>,
}

async fn api_compare(
    State(state): State<AppState>,
    Json(req): Json<CompareReq>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.product_ids.len() < cartwise_agents::compare::MIN_PRODUCTS {
        return Err(Error::InvalidInput("Need at least 2 products to compare".into()).into());
    }
    if req.product_ids.len() > cartwise_agents::compare::MAX_PRODUCTS {
        return Err(
            Error::InvalidInput("Maximum 5 products can be compared at once".into()).into(),
        );
    }

    let style = req
        .style
        .as_deref()
        .map(ComparisonStyle::parse)
        .unwrap_or(ComparisonStyle::Detailed);
    Ok(agent_json(
        &state.comparator.compare(&req.product_ids, style).await,
    ))
}

#[derive(Deserialize)]
pub struct BuyPlanReq {
    pub product_id: i64,
    #[serde(default)]
    pub preference: Option<String>,
    #[serde(default)]
    pub user_cards: Option<Vec<String>>,
}

async fn api_buy_plan(
    State(state): State<AppState>,
    Json(req): Json<BuyPlanReq>,
) -> Json<serde_json::Value> {
    let preference = req
        .preference
        .as_deref()
        .map(PaymentPreference::parse)
        .unwrap_or(PaymentPreference::Balanced);
    agent_json(&state.buy_plans.create_plan(req.product_id, preference).await)
}

async fn api_buy_plan_recommend(
    State(state): State<AppState>,
    Json(req): Json<BuyPlanReq>,
) -> Json<serde_json::Value> {
    let preference = req
        .preference
        .as_deref()
        .map(PaymentPreference::parse)
        .unwrap_or(PaymentPreference::Balanced);
    agent_json(
        &state
            .buy_plans
            .recommend_payment_method(req.product_id, req.user_cards, preference)
            .await,
    )
}
