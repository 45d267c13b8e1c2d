//! Route-level tests over in-process fakes

use axum::body::Body;
use axum::http::{Request, StatusCode};
use cartwise_api::{router, AppState};
use cartwise_catalog::MemoryCatalog;
use cartwise_core::{CardOffer, OfferKind, PricePoint, Product, Review};
use cartwise_runtime::llm::{LlmClient, MockLlmClient};
use cartwise_runtime::vector::{MockVectorIndex, ProductMetadata, SimilarProduct, VectorIndex};
use chrono::{Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceExt;

fn product(id: i64, name: &str, price: f64) -> Product {
    Product {
        id,
        name: name.into(),
        brand: "Acme".into(),
        model: None,
        category: "Electronics".into(),
        subcategory: Some("Headphones".into()),
        price,
        mrp: Some(price * 1.25),
        description: Some("Wireless earbuds".into()),
        features: vec!["wireless".into()],
        specifications: BTreeMap::new(),
        rating: 4.3,
        review_count: 120,
        in_stock: true,
    }
}

fn test_state() -> AppState {
    let catalog = Arc::new(MemoryCatalog::new());
    catalog.add_product(product(1, "Alpha Buds", 2999.0));
    catalog.add_product(product(2, "Beta Buds", 3499.0));

    for product_id in 1..=2 {
        catalog.add_review(Review {
            product_id,
            rating: 4,
            text: "great sound quality".into(),
            verified_purchase: true,
            helpful_count: 5,
            created_at: Utc::now(),
        });
        for day in 0..5 {
            catalog.add_price_point(PricePoint {
                product_id,
                price: 3000.0 - day as f64 * 20.0,
                recorded_at: Utc::now() - Duration::days(day),
            });
        }
    }

    catalog.add_offer(CardOffer {
        id: 1,
        product_id: 1,
        bank_name: "HDFC".into(),
        card_type: None,
        kind: OfferKind::InstantDiscount,
        discount_percent: Some(10.0),
        discount_amount: None,
        cashback_amount: None,
        emi_tenure_months: None,
        is_no_cost_emi: false,
        min_transaction_amount: None,
        description: None,
        is_active: true,
        valid_from: None,
        valid_till: None,
    });

    let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new("ok"));
    let index: Arc<dyn VectorIndex> = Arc::new(MockVectorIndex::new(vec![SimilarProduct {
        metadata: ProductMetadata {
            product_id: 1,
            name: "Alpha Buds".into(),
            brand: "Acme".into(),
            category: "Electronics".into(),
            subcategory: "Headphones".into(),
            price: 2999.0,
            rating: 4.3,
            review_count: 120,
            features: "[]".into(),
        },
        distance: 0.2,
    }]));

    AppState::assemble(llm, index, catalog, "mock-model")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = router(test_state());
    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn orchestrate_returns_full_response() {
    let app = router(test_state());
    let response = app
        .oneshot(post(
            "/api/orchestrate",
            serde_json::json!({ "query": "wireless buds", "top_n": 2 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["products"].as_array().unwrap().len(), 2);
    assert_eq!(body["metadata"]["execution_type"], "parallel");
    assert!(body["comparison"]["available"].as_bool().unwrap());
}

#[tokio::test]
async fn orchestrate_rejects_out_of_range_top_n() {
    let app = router(test_state());
    let response = app
        .oneshot(post(
            "/api/orchestrate",
            serde_json::json!({ "query": "buds", "top_n": 6 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn orchestrate_simple_defaults_to_three() {
    let app = router(test_state());
    let response = app
        .oneshot(post(
            "/api/orchestrate/simple",
            serde_json::json!({ "query": "wireless buds" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    // only two products exist, so both come back
    assert_eq!(body["products"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn search_returns_ranked_products() {
    let app = router(test_state());
    let response = app
        .oneshot(post(
            "/api/search",
            serde_json::json!({ "query": "wireless buds", "limit": 5 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["search_method"], "hybrid");
    assert!(body["count"].as_u64().unwrap() >= 1);
    assert!(body["reasoning"].as_str().unwrap().contains("Found"));
}

#[tokio::test]
async fn compare_rejects_too_many_ids() {
    let app = router(test_state());
    let response = app
        .oneshot(post(
            "/api/compare",
            serde_json::json!({ "product_ids": [1, 2, 3, 4, 5, 6] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn compare_two_products_succeeds() {
    let app = router(test_state());
    let response = app
        .oneshot(post(
            "/api/compare",
            serde_json::json!({ "product_ids": [2, 1], "style": "battle" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["output"]["kind"], "battle");
}

#[tokio::test]
async fn product_detail_missing_is_not_found() {
    let app = router(test_state());
    let response = app.oneshot(get("/api/products/404")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_detail_includes_related_data() {
    let app = router(test_state());
    let response = app.oneshot(get("/api/products/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["product"]["name"], "Alpha Buds");
    assert!(!body["reviews"].as_array().unwrap().is_empty());
    assert!(!body["price_history"].as_array().unwrap().is_empty());
    assert!(!body["offers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn deals_endpoint_honors_threshold() {
    let app = router(test_state());
    let response = app
        .oneshot(get("/api/prices/deals?min_discount=15&limit=5"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    for deal in body["deals"].as_array().unwrap() {
        assert!(deal["discount_pct"].as_f64().unwrap() >= 15.0);
        assert!(deal["is_flash_deal"].is_boolean());
    }
}

#[tokio::test]
async fn buyplan_endpoint_returns_plan() {
    let app = router(test_state());
    let response = app
        .oneshot(post(
            "/api/buyplan",
            serde_json::json!({ "product_id": 1, "preference": "instant_savings" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert!(body["emi_eligible"].as_bool().is_some());
    assert!(!body["payment_options"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn review_analysis_for_unreviewed_product_reports_message() {
    let app = router(test_state());
    let response = app.oneshot(get("/api/reviews/999/analysis")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "No reviews found for this product");
}
