//! Normalizes heterogeneous agent outcomes into the final response shape
//!
//! Missing analysis sections are explicit (`available: false`) rather than
//! absent, so the frontend never guesses. Products without price history
//! still get a 30-point synthetic chart to render.

use cartwise_agents::compare::{ComparisonReport, StyledOutput};
use cartwise_agents::price::{ChartMarkers, ChartSeries, PriceAnalysis};
use cartwise_agents::review::{ReviewAnalysis, ReviewStatistics};
use cartwise_agents::PurchasePlan;
use cartwise_core::{format_rupees, round2, AgentResult};
use cartwise_retrieval::RankedProduct;
use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

const MOCK_CHART_DAYS: usize = 30;
const AGENT_NAMES: [&str; 5] = [
    "Product Search",
    "Review Analyzer",
    "Price Tracker",
    "Comparison Specialist",
    "Buy Plan Optimizer",
];

/// Final orchestrated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub success: bool,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
    pub execution_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryBlock>,
    pub products: Vec<ProductView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_plan: Option<BuyPlanBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

impl RecommendationResponse {
    /// Error response carrying the echoed query.
    pub fn failure(query: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            query: query.into(),
            error: Some(error.into()),
            timestamp: Utc::now().to_rfc3339(),
            execution_time_seconds: 0.0,
            summary: None,
            products: Vec::new(),
            comparison: None,
            buy_plan: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryBlock {
    pub total_products_found: usize,
    pub top_recommendation: String,
    pub top_price: f64,
    pub top_rating: f64,
    pub ai_recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingBlock {
    pub current_price: f64,
    pub mrp: f64,
    pub discount_percent: f64,
    pub you_save: f64,
    pub in_stock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingsBlock {
    pub average_rating: f64,
    pub total_reviews: i64,
    pub rating_badge: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewBlock {
    pub available: bool,
    pub sentiment: String,
    pub sentiment_emoji: String,
    pub trust_score: f64,
    pub trust_score_percent: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub summary: String,
    pub top_pro: String,
    pub top_con: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ReviewStatistics>,
    pub full_analysis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBlock {
    pub available: bool,
    pub recommendation: String,
    pub recommendation_badge: String,
    pub current_price: f64,
    pub average_price: f64,
    pub lowest_price: f64,
    pub highest_price: f64,
    pub price_trend: String,
    pub price_change_percent: f64,
    pub ai_recommendation: String,
    pub confidence: String,
    pub chart_data: ChartSeries,
    /// Days of real history behind the chart; zero when the series is synthetic
    pub history_days: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductView {
    pub rank: usize,
    pub id: i64,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub search_score: f64,
    pub pricing: PricingBlock,
    pub ratings: RatingsBlock,
    pub review_analysis: ReviewBlock,
    pub price_tracking: PriceBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerBlock {
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    pub reason: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWinner {
    pub product_name: String,
    pub value: String,
    pub raw: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWinners {
    pub best_price: CategoryWinner,
    pub best_rating: CategoryWinner,
    pub best_value: CategoryWinner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonBlock {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<WinnerBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_winners: Option<CategoryWinners>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub differences: Option<cartwise_agents::compare::Differences>,
    pub ai_comparison: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<cartwise_agents::compare::ComparisonTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyPlanBlock {
    pub available: bool,
    pub product_name: String,
    pub product_price: f64,
    pub emi_eligible: bool,
    pub payment_options: Vec<cartwise_agents::PaymentOption>,
    pub regular_emi_plans: Vec<cartwise_agents::emi::EmiPlan>,
    pub no_cost_emi_plans: Vec<cartwise_agents::emi::EmiPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<cartwise_agents::buyplan::BuyPlanRecommendations>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub request_id: Uuid,
    pub agents_used: Vec<String>,
    pub total_agents: usize,
    pub execution_type: String,
    pub llm_model: String,
}

/// Builds the final response from raw orchestration state
pub struct Assembler {
    model_name: String,
}

impl Assembler {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        &self,
        request_id: Uuid,
        query: &str,
        products: &[RankedProduct],
        reviews: &HashMap<i64, AgentResult<ReviewAnalysis>>,
        prices: &HashMap<i64, AgentResult<PriceAnalysis>>,
        comparison: Option<&AgentResult<ComparisonReport>>,
        buy_plan: Option<&AgentResult<PurchasePlan>>,
        execution_time_seconds: f64,
    ) -> RecommendationResponse {
        let product_views: Vec<ProductView> = products
            .iter()
            .enumerate()
            .map(|(i, product)| {
                let review = reviews
                    .get(&product.id)
                    .cloned()
                    .unwrap_or(AgentResult::Timeout);
                let price = prices
                    .get(&product.id)
                    .cloned()
                    .unwrap_or(AgentResult::Timeout);
                build_product_view(i + 1, product, &review, &price)
            })
            .collect();

        let comparison_block = comparison.map(|result| build_comparison_block(result, products));
        let buy_plan_block = buy_plan.map(build_buy_plan_block);
        let summary = build_summary(query, products);

        RecommendationResponse {
            success: true,
            query: query.to_string(),
            error: None,
            timestamp: Utc::now().to_rfc3339(),
            execution_time_seconds: round2(execution_time_seconds),
            summary: Some(summary),
            products: product_views,
            comparison: comparison_block,
            buy_plan: buy_plan_block,
            metadata: Some(ResponseMetadata {
                request_id,
                agents_used: AGENT_NAMES.iter().map(|s| s.to_string()).collect(),
                total_agents: AGENT_NAMES.len(),
                execution_type: "parallel".to_string(),
                llm_model: self.model_name.clone(),
            }),
        }
    }
}

fn build_product_view(
    rank: usize,
    product: &RankedProduct,
    review: &AgentResult<ReviewAnalysis>,
    price: &AgentResult<PriceAnalysis>,
) -> ProductView {
    ProductView {
        rank,
        id: product.id,
        name: product.name.clone(),
        brand: product.brand.clone(),
        category: product.category.clone(),
        search_score: product.search_score,
        pricing: PricingBlock {
            current_price: product.price,
            mrp: product.mrp,
            discount_percent: product.discount_percent,
            you_save: round2(product.mrp - product.price),
            in_stock: product.in_stock,
        },
        ratings: RatingsBlock {
            average_rating: product.rating,
            total_reviews: product.review_count,
            rating_badge: rating_badge(product.rating).to_string(),
        },
        review_analysis: build_review_block(review),
        price_tracking: build_price_block(product, price),
    }
}

fn build_review_block(result: &AgentResult<ReviewAnalysis>) -> ReviewBlock {
    match result.ok_ref() {
        Some(analysis) => {
            let sentiment = analysis.sentiment.as_str().to_string();
            ReviewBlock {
                available: true,
                sentiment_emoji: sentiment_emoji(&sentiment).to_string(),
                sentiment,
                trust_score: analysis.trust_score,
                trust_score_percent: format!("{:.0}%", analysis.trust_score * 100.0),
                pros: analysis.pros.clone(),
                cons: analysis.cons.clone(),
                summary: analysis.summary.clone(),
                top_pro: analysis
                    .pros
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "No pros available".to_string()),
                top_con: analysis
                    .cons
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "No cons mentioned".to_string()),
                statistics: Some(analysis.statistics.clone()),
                full_analysis: analysis.full_analysis.clone(),
                error: None,
            }
        }
        None => {
            let reason = result.failure_reason().unwrap_or("Unavailable").to_string();
            warn!("Review analysis unavailable: {reason}");
            ReviewBlock {
                available: false,
                sentiment: "N/A".to_string(),
                sentiment_emoji: sentiment_emoji("neutral").to_string(),
                trust_score: 0.0,
                trust_score_percent: "0%".to_string(),
                pros: Vec::new(),
                cons: Vec::new(),
                summary: String::new(),
                top_pro: "No pros available".to_string(),
                top_con: "No cons mentioned".to_string(),
                statistics: None,
                full_analysis: String::new(),
                error: Some(reason),
            }
        }
    }
}

fn build_price_block(product: &RankedProduct, result: &AgentResult<PriceAnalysis>) -> PriceBlock {
    match result.ok_ref() {
        Some(analysis) => {
            let (chart_data, history_days) = match &analysis.chart {
                Some(chart) => (chart.clone(), analysis.stats.data_points),
                // The UI contract requires a series even with zero history
                None => (mock_chart(analysis.stats.current_price), 0),
            };
            PriceBlock {
                available: true,
                recommendation: analysis.stats.recommendation.as_str().to_string(),
                recommendation_badge: price_badge(analysis.stats.recommendation.as_str())
                    .to_string(),
                current_price: analysis.stats.current_price,
                average_price: analysis.stats.average_price,
                lowest_price: analysis.stats.min_price,
                highest_price: analysis.stats.max_price,
                price_trend: analysis.stats.trend.as_str().to_string(),
                price_change_percent: analysis.stats.price_change_pct,
                ai_recommendation: analysis.ai_recommendation.clone(),
                confidence: analysis.confidence.as_str().to_string(),
                chart_data,
                history_days,
                error: None,
            }
        }
        None => {
            let reason = result.failure_reason().unwrap_or("Unavailable").to_string();
            warn!("Price analysis unavailable: {reason}");
            PriceBlock {
                available: false,
                recommendation: "N/A".to_string(),
                recommendation_badge: price_badge("wait").to_string(),
                current_price: product.price,
                average_price: product.price,
                lowest_price: product.price,
                highest_price: product.price,
                price_trend: "stable".to_string(),
                price_change_percent: 0.0,
                ai_recommendation: String::new(),
                confidence: "medium".to_string(),
                chart_data: mock_chart(product.price),
                history_days: 0,
                error: Some(reason),
            }
        }
    }
}

fn build_comparison_block(
    result: &AgentResult<ComparisonReport>,
    products: &[RankedProduct],
) -> ComparisonBlock {
    match result.ok_ref() {
        Some(report) => {
            let best_overall = &report.winners.best_overall;
            let winner_id = report
                .products
                .iter()
                .find(|p| p.name == best_overall.product)
                .map(|p| p.id);

            let min_price = report
                .products
                .iter()
                .map(|p| p.price)
                .fold(f64::INFINITY, f64::min);
            let max_rating = report
                .products
                .iter()
                .map(|p| p.rating)
                .fold(f64::NEG_INFINITY, f64::max);
            let best_discount = report
                .products
                .iter()
                .map(|p| p.discount_pct)
                .fold(f64::NEG_INFINITY, f64::max);

            let table = report.output.as_ref().and_then(|output| match output {
                StyledOutput::Table(table) => Some(table.clone()),
                StyledOutput::Battle(_) => None,
            });

            ComparisonBlock {
                available: true,
                winner: Some(WinnerBlock {
                    product_name: best_overall.product.clone(),
                    product_id: winner_id,
                    reason: best_overall.reason.clone(),
                    value: best_overall.value.clone(),
                }),
                category_winners: Some(CategoryWinners {
                    best_price: CategoryWinner {
                        product_name: report.winners.best_price.product.clone(),
                        value: report.winners.best_price.value.clone(),
                        raw: min_price,
                        reason: report.winners.best_price.reason.clone(),
                    },
                    best_rating: CategoryWinner {
                        product_name: report.winners.best_rating.product.clone(),
                        value: report.winners.best_rating.value.clone(),
                        raw: max_rating,
                        reason: report.winners.best_rating.reason.clone(),
                    },
                    best_value: CategoryWinner {
                        product_name: report.winners.best_value.product.clone(),
                        value: report.winners.best_value.value.clone(),
                        raw: best_discount,
                        reason: report.winners.best_value.reason.clone(),
                    },
                }),
                differences: Some(report.differences.clone()),
                ai_comparison: report.ai_analysis.clone(),
                table,
                error: None,
            }
        }
        None => {
            let reason = result.failure_reason().unwrap_or("Unavailable").to_string();
            warn!("Comparison unavailable for {} products: {reason}", products.len());
            ComparisonBlock {
                available: false,
                winner: None,
                category_winners: None,
                differences: None,
                ai_comparison: String::new(),
                table: None,
                error: Some(reason),
            }
        }
    }
}

fn build_buy_plan_block(result: &AgentResult<PurchasePlan>) -> BuyPlanBlock {
    match result.ok_ref() {
        Some(plan) => BuyPlanBlock {
            available: true,
            product_name: plan.product_name.clone(),
            product_price: plan.product_price,
            emi_eligible: plan.emi_eligible,
            payment_options: plan.payment_options.clone(),
            regular_emi_plans: plan.regular_emi_plans.clone(),
            no_cost_emi_plans: plan.no_cost_emi_plans.clone(),
            recommendations: Some(plan.recommendations.clone()),
            summary: plan.summary.clone(),
            error: None,
        },
        None => {
            let reason = result.failure_reason().unwrap_or("Unavailable").to_string();
            warn!("Buy plan unavailable: {reason}");
            BuyPlanBlock {
                available: false,
                product_name: String::new(),
                product_price: 0.0,
                emi_eligible: false,
                payment_options: Vec::new(),
                regular_emi_plans: Vec::new(),
                no_cost_emi_plans: Vec::new(),
                recommendations: None,
                summary: String::new(),
                error: Some(reason),
            }
        }
    }
}

fn build_summary(query: &str, products: &[RankedProduct]) -> SummaryBlock {
    let ai_recommendation = match products.first() {
        Some(top) => {
            let mut text = format!(
                "Based on your search for '{}', I recommend the {} at {}. ",
                query,
                top.name,
                format_rupees(top.price)
            );
            if top.rating > 0.0 {
                text.push_str(&format!("It has a rating of {}/5 stars. ", top.rating));
            }
            if products.len() > 1 {
                text.push_str(&format!(
                    "I've also analyzed {} alternative options for comparison. ",
                    products.len() - 1
                ));
            }
            text.push_str(
                "Check the detailed analysis above for reviews, price trends, and payment options.",
            );
            text
        }
        None => format!("No products found for '{query}'."),
    };

    SummaryBlock {
        total_products_found: products.len(),
        top_recommendation: products
            .first()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "N/A".to_string()),
        top_price: products.first().map(|p| p.price).unwrap_or(0.0),
        top_rating: products.first().map(|p| p.rating).unwrap_or(0.0),
        ai_recommendation,
    }
}

/// Synthetic 30-day series: a ±5% walk around the current price. Present so
/// the UI always has something to render; `history_days` stays zero.
pub fn mock_chart(current_price: f64) -> ChartSeries {
    let mut rng = rand::thread_rng();
    let today = Utc::now().date_naive();

    let mut labels = Vec::with_capacity(MOCK_CHART_DAYS);
    let mut prices = Vec::with_capacity(MOCK_CHART_DAYS);
    for i in (1..=MOCK_CHART_DAYS).rev() {
        let date = today - Duration::days(i as i64);
        labels.push(date.format("%Y-%m-%d").to_string());
        let variation: f64 = rng.gen_range(-0.05..=0.05);
        prices.push(round2(current_price * (1.0 + variation)));
    }

    let lowest = prices.iter().cloned().fold(f64::INFINITY, f64::min);
    let highest = prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let average = round2(prices.iter().sum::<f64>() / prices.len() as f64);

    ChartSeries {
        labels,
        prices,
        average: vec![average; MOCK_CHART_DAYS],
        markers: ChartMarkers {
            current_price,
            lowest_price: lowest,
            highest_price: highest,
        },
        data_points: MOCK_CHART_DAYS,
    }
}

fn rating_badge(rating: f64) -> &'static str {
    if rating >= 4.5 {
        "⭐ Excellent"
    } else if rating >= 4.0 {
        "👍 Very Good"
    } else if rating >= 3.5 {
        "✅ Good"
    } else if rating >= 3.0 {
        "⚠️ Average"
    } else {
        "❌ Below Average"
    }
}

fn sentiment_emoji(sentiment: &str) -> &'static str {
    let lower = sentiment.to_lowercase();
    if lower.contains("positive") {
        "😊 Positive"
    } else if lower.contains("negative") {
        "😞 Negative"
    } else {
        "😐 Neutral"
    }
}

fn price_badge(recommendation: &str) -> &'static str {
    let lower = recommendation.to_lowercase();
    if lower.contains("buy") || lower.contains("now") {
        "🟢 Buy Now"
    } else if lower.contains("good") {
        "🟡 Good Deal"
    } else {
        "🔴 Wait"
    }
}
