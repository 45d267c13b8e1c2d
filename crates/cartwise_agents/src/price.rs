//! Price analysis agent: trend detection, buy/wait decisions, and deal scans

use cartwise_catalog::CatalogStore;
use cartwise_core::{format_rupees, round2, AgentResult, PricePoint, Product, Result};
use cartwise_runtime::cache::{AgentCache, PRICE_CACHE_TTL_SECS};
use cartwise_runtime::llm::{GenerateOptions, GenerateRequest, LlmClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const HISTORY_WINDOW_DAYS: i64 = 30;
const HISTORY_RETURN_LIMIT: usize = 10;
const LLM_TIMEOUT: Duration = Duration::from_secs(25);
const FLASH_DROP_PCT: f64 = 10.0;
const FLASH_LOW_TOLERANCE: f64 = 1.01;
pub const DEFAULT_MIN_DISCOUNT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTrend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
    Unknown,
}

impl PriceTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceTrend::Increasing => "increasing",
            PriceTrend::Decreasing => "decreasing",
            PriceTrend::Stable => "stable",
            PriceTrend::InsufficientData => "insufficient_data",
            PriceTrend::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyRecommendation {
    BuyNow,
    GoodTime,
    Wait,
}

impl BuyRecommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuyRecommendation::BuyNow => "buy_now",
            BuyRecommendation::GoodTime => "good_time",
            BuyRecommendation::Wait => "wait",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Statistics over the trailing 30-day price window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceStats {
    pub current_price: f64,
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub trend: PriceTrend,
    /// Percentage change from the 30-day maximum
    pub price_change_pct: f64,
    pub recommendation: BuyRecommendation,
    pub data_points: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartMarkers {
    pub current_price: f64,
    pub lowest_price: f64,
    pub highest_price: f64,
}

/// Chart-ready series, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSeries {
    /// YYYY-MM-DD labels
    pub labels: Vec<String>,
    pub prices: Vec<f64>,
    /// Constant 30-day-average overlay, one value per label
    pub average: Vec<f64>,
    pub markers: ChartMarkers,
    pub data_points: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub price: f64,
    pub date: String,
}

/// Complete price analysis for one product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAnalysis {
    pub product_id: i64,
    pub product_name: String,
    pub stats: PriceStats,
    /// Absent when the product has no recorded history
    pub chart: Option<ChartSeries>,
    /// Most recent entries, newest first, capped at 10
    pub history: Vec<HistoryEntry>,
    pub ai_recommendation: String,
    pub confidence: Confidence,
}

/// A discounted product surfaced by the deal scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub product_id: i64,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: f64,
    pub mrp: f64,
    pub discount_pct: f64,
    pub savings: f64,
    pub rating: f64,
    pub review_count: i64,
    pub is_flash_deal: bool,
    pub deal_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency_score: Option<f64>,
}

pub struct PriceAnalyzer {
    llm: Arc<dyn LlmClient>,
    catalog: Arc<dyn CatalogStore>,
    cache: AgentCache<PriceAnalysis>,
}

impl PriceAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            llm,
            catalog,
            cache: AgentCache::with_ttl_secs(PRICE_CACHE_TTL_SECS),
        }
    }

    /// Analyze the trailing price window for a product.
    pub async fn analyze(&self, product_id: i64) -> AgentResult<PriceAnalysis> {
        let cache_key = format!("price_analysis_{product_id}");
        if let Some(cached) = self.cache.get(&cache_key).await {
            info!("Returning cached price analysis for product {product_id}");
            return AgentResult::Ok((*cached).clone());
        }

        let product = match self.catalog.product(product_id).await {
            Ok(Some(product)) => product,
            Ok(None) => return AgentResult::Failed(format!("Product {product_id} not found")),
            Err(e) => return AgentResult::Failed(e.to_string()),
        };

        let history = match self
            .catalog
            .price_history(product_id, HISTORY_WINDOW_DAYS)
            .await
        {
            Ok(history) => history,
            Err(e) => return AgentResult::Failed(e.to_string()),
        };

        // Current price comes from the product record; history may lag it
        let stats = compute_stats(product.price, &history);
        let confidence = confidence_for(&stats);
        let chart = (!history.is_empty()).then(|| build_chart(&history, &stats));
        let recent: Vec<HistoryEntry> = history
            .iter()
            .take(HISTORY_RETURN_LIMIT)
            .map(|p| HistoryEntry {
                price: p.price,
                date: p.recorded_at.to_rfc3339(),
            })
            .collect();

        let ai_recommendation = self.narrate(&product.name, &stats).await;

        let analysis = PriceAnalysis {
            product_id,
            product_name: product.name,
            stats,
            chart,
            history: recent,
            ai_recommendation,
            confidence,
        };

        self.cache.insert(cache_key, analysis.clone()).await;
        AgentResult::Ok(analysis)
    }

    async fn narrate(&self, product_name: &str, stats: &PriceStats) -> String {
        let prompt = build_narrative_prompt(product_name, stats);
        let request = GenerateRequest::new(prompt).with_options(
            GenerateOptions::default()
                .with_temperature(0.7)
                .with_max_tokens(200),
        );

        match tokio::time::timeout(LLM_TIMEOUT, self.llm.generate(request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Price narrative failed for '{product_name}', using rule-based text: {e}");
                fallback_narrative(stats)
            }
            Err(_) => {
                warn!("Price narrative timed out for '{product_name}', using rule-based text");
                fallback_narrative(stats)
            }
        }
    }

    /// Scan for products discounted at least `min_discount` percent.
    pub async fn find_deals(
        &self,
        category: Option<&str>,
        min_discount: f64,
        limit: usize,
    ) -> Result<Vec<Deal>> {
        let candidates = self
            .catalog
            .deal_candidates(category, (limit * 2) as i64)
            .await?;

        let mut deals = Vec::new();
        for product in &candidates {
            let discount_pct = product.discount_percent();
            if discount_pct < min_discount {
                continue;
            }
            let is_flash = self.is_flash_deal(product.id).await;
            deals.push(make_deal(product, discount_pct, is_flash));
        }

        deals.sort_by(|a, b| {
            b.discount_pct
                .partial_cmp(&a.discount_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        deals.truncate(limit);
        Ok(deals)
    }

    /// Flash deals only, annotated with an urgency level and sorted by it.
    pub async fn find_flash_deals(
        &self,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Deal>> {
        let all = self
            .find_deals(category, DEFAULT_MIN_DISCOUNT, limit * 3)
            .await?;

        let mut flash: Vec<Deal> = all
            .into_iter()
            .filter(|d| d.is_flash_deal)
            .map(|mut d| {
                d.urgency_level = Some(urgency_level(d.discount_pct).to_string());
                d.urgency_score = Some(round2(d.discount_pct));
                d
            })
            .collect();

        flash.sort_by(|a, b| {
            b.urgency_score
                .partial_cmp(&a.urgency_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        flash.truncate(limit);
        Ok(flash)
    }

    /// Flash deal = price dropped >=10% within ~48h, or the current price sits
    /// within 1% of the 90-day minimum.
    async fn is_flash_deal(&self, product_id: i64) -> bool {
        let recent = match self.catalog.price_history(product_id, 7).await {
            Ok(history) => history,
            Err(_) => return false,
        };
        if recent.len() < 2 {
            return false;
        }

        let current = recent[0].price;
        if recent.len() >= 3 {
            let old = recent[2].price;
            if old > 0.0 && (old - current) / old * 100.0 >= FLASH_DROP_PCT {
                return true;
            }
        }

        let full = match self.catalog.price_history(product_id, 90).await {
            Ok(history) => history,
            Err(_) => return false,
        };
        if let Some(min) = full
            .iter()
            .map(|p| p.price)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        {
            if current <= min * FLASH_LOW_TOLERANCE {
                return true;
            }
        }
        false
    }
}

/// Trend and statistics over the window; `history` is newest first.
fn compute_stats(current_price: f64, history: &[PricePoint]) -> PriceStats {
    if history.is_empty() {
        return PriceStats {
            current_price,
            average_price: current_price,
            min_price: current_price,
            max_price: current_price,
            trend: PriceTrend::Unknown,
            price_change_pct: 0.0,
            recommendation: BuyRecommendation::Wait,
            data_points: 0,
        };
    }

    let prices: Vec<f64> = history.iter().map(|p| p.price).collect();
    let average = prices.iter().sum::<f64>() / prices.len() as f64;
    let min = prices.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let trend = if prices.len() >= 14 {
        let recent_avg = prices[..7].iter().sum::<f64>() / 7.0;
        let older_avg = prices[7..14].iter().sum::<f64>() / 7.0;
        if recent_avg < older_avg * 0.95 {
            PriceTrend::Decreasing
        } else if recent_avg > older_avg * 1.05 {
            PriceTrend::Increasing
        } else {
            PriceTrend::Stable
        }
    } else {
        PriceTrend::InsufficientData
    };

    let price_change_pct = if max > 0.0 {
        round2((current_price - max) / max * 100.0)
    } else {
        0.0
    };

    let recommendation = if current_price <= min * 1.05 {
        BuyRecommendation::BuyNow
    } else if trend == PriceTrend::Decreasing || current_price >= average {
        BuyRecommendation::Wait
    } else {
        BuyRecommendation::GoodTime
    };

    PriceStats {
        current_price,
        average_price: round2(average),
        min_price: min,
        max_price: max,
        trend,
        price_change_pct,
        recommendation,
        data_points: prices.len(),
    }
}

fn confidence_for(stats: &PriceStats) -> Confidence {
    if stats.data_points >= 20 && stats.current_price <= stats.min_price * 1.05 {
        Confidence::High
    } else if stats.data_points >= 10 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

fn build_chart(history: &[PricePoint], stats: &PriceStats) -> ChartSeries {
    let mut points: Vec<&PricePoint> = history.iter().collect();
    points.sort_by_key(|p| p.recorded_at);

    let labels: Vec<String> = points
        .iter()
        .map(|p| p.recorded_at.format("%Y-%m-%d").to_string())
        .collect();
    let prices: Vec<f64> = points.iter().map(|p| p.price).collect();
    let average = vec![stats.average_price; labels.len()];
    let data_points = labels.len();

    ChartSeries {
        labels,
        prices,
        average,
        markers: ChartMarkers {
            current_price: stats.current_price,
            lowest_price: stats.min_price,
            highest_price: stats.max_price,
        },
        data_points,
    }
}

fn build_narrative_prompt(product_name: &str, stats: &PriceStats) -> String {
    format!(
        "You are a price analysis expert helping shoppers make smart buying decisions.\n\n\
         Analyze this price data for \"{product_name}\":\n\n\
         PRICE STATISTICS:\n\
         - Current Price: {}\n\
         - Average Price (30 days): {}\n\
         - Lowest Price: {}\n\
         - Highest Price: {}\n\n\
         TREND ANALYSIS:\n\
         - Trend: {}\n\
         - Price Change: {:.1}%\n\
         - Data Points: {} days\n\n\
         SYSTEM RECOMMENDATION: {}\n\n\
         Provide a recommendation in 2-3 sentences:\n\
         1. Should the user BUY NOW or WAIT?\n\
         2. Why? (based on the data)\n\
         3. What's the confidence level? (high/medium/low)\n\n\
         Keep it conversational and helpful. Start with your recommendation.",
        format_rupees(stats.current_price),
        format_rupees(stats.average_price),
        format_rupees(stats.min_price),
        format_rupees(stats.max_price),
        stats.trend.as_str().to_uppercase(),
        stats.price_change_pct,
        stats.data_points,
        stats.recommendation.as_str().to_uppercase(),
    )
}

fn fallback_narrative(stats: &PriceStats) -> String {
    let current = format_rupees(stats.current_price);
    match stats.recommendation {
        BuyRecommendation::BuyNow => format!(
            "BUY NOW! Price is at {current}, which is near the all-time low. \
             This is an excellent time to purchase."
        ),
        BuyRecommendation::GoodTime => format!(
            "GOOD DEAL! Current price ({current}) is below the 30-day average ({}). \
             Fair time to buy.",
            format_rupees(stats.average_price)
        ),
        BuyRecommendation::Wait => format!(
            "WAIT! Price is currently {current}, which is above average. \
             Consider waiting for a better deal."
        ),
    }
}

fn make_deal(product: &Product, discount_pct: f64, is_flash: bool) -> Deal {
    Deal {
        product_id: product.id,
        name: product.name.clone(),
        brand: product.brand.clone(),
        category: product.category.clone(),
        price: product.price,
        mrp: product.mrp_or_price(),
        discount_pct,
        savings: product.savings(),
        rating: product.rating,
        review_count: product.review_count,
        is_flash_deal: is_flash,
        deal_type: if is_flash { "flash" } else { "regular" }.to_string(),
        urgency_level: None,
        urgency_score: None,
    }
}

fn urgency_level(discount_pct: f64) -> &'static str {
    if discount_pct >= 40.0 {
        "extreme"
    } else if discount_pct >= 25.0 {
        "high"
    } else if discount_pct >= 15.0 {
        "medium"
    } else {
        "low"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartwise_catalog::MemoryCatalog;
    use cartwise_runtime::llm::MockLlmClient;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::collections::BTreeMap;

    fn point(product_id: i64, price: f64, days_ago: i64) -> PricePoint {
        PricePoint {
            product_id,
            price,
            recorded_at: Utc::now() - ChronoDuration::days(days_ago),
        }
    }

    fn product(id: i64, price: f64, mrp: Option<f64>) -> Product {
        Product {
            id,
            name: format!("Product {id}"),
            brand: "Acme".into(),
            model: None,
            category: "Electronics".into(),
            subcategory: None,
            price,
            mrp,
            description: None,
            features: vec![],
            specifications: BTreeMap::new(),
            rating: 4.2,
            review_count: 150,
            in_stock: true,
        }
    }

    fn history(newest_first: &[f64]) -> Vec<PricePoint> {
        newest_first
            .iter()
            .enumerate()
            .map(|(i, price)| point(1, *price, i as i64))
            .collect()
    }

    #[test]
    fn test_trend_decreasing() {
        // recent week well below prior week
        let mut prices = vec![900.0; 7];
        prices.extend(vec![1000.0; 7]);
        let stats = compute_stats(900.0, &history(&prices));
        assert_eq!(stats.trend, PriceTrend::Decreasing);
    }

    #[test]
    fn test_trend_increasing_and_stable() {
        let mut prices = vec![1100.0; 7];
        prices.extend(vec![1000.0; 7]);
        let stats = compute_stats(1100.0, &history(&prices));
        assert_eq!(stats.trend, PriceTrend::Increasing);

        let mut prices = vec![1020.0; 7];
        prices.extend(vec![1000.0; 7]);
        let stats = compute_stats(1020.0, &history(&prices));
        assert_eq!(stats.trend, PriceTrend::Stable);
    }

    #[test]
    fn test_trend_insufficient_data() {
        let stats = compute_stats(1000.0, &history(&[1000.0; 10]));
        assert_eq!(stats.trend, PriceTrend::InsufficientData);
    }

    #[test]
    fn test_recommendation_buy_now_near_minimum() {
        let prices = vec![1000.0, 1100.0, 1200.0, 1300.0];
        let stats = compute_stats(1020.0, &history(&prices));
        assert_eq!(stats.recommendation, BuyRecommendation::BuyNow);
    }

    #[test]
    fn test_recommendation_wait_above_average() {
        let prices = vec![1400.0, 1000.0, 1000.0, 1000.0];
        let stats = compute_stats(1400.0, &history(&prices));
        assert_eq!(stats.recommendation, BuyRecommendation::Wait);
    }

    #[test]
    fn test_recommendation_wait_while_decreasing() {
        // decreasing trend, current well above minimum but below average
        let mut prices = vec![900.0; 7];
        prices.extend(vec![1200.0; 7]);
        prices[0] = 700.0; // minimum far below current
        let stats = compute_stats(1000.0, &history(&prices));
        assert_eq!(stats.trend, PriceTrend::Decreasing);
        assert_eq!(stats.recommendation, BuyRecommendation::Wait);
    }

    #[test]
    fn test_price_change_measured_from_maximum() {
        let prices = vec![900.0, 1000.0];
        let stats = compute_stats(900.0, &history(&prices));
        assert_eq!(stats.price_change_pct, -10.0);
    }

    #[test]
    fn test_confidence_levels() {
        let many_near_min = compute_stats(1000.0, &history(&[1000.0; 25]));
        assert_eq!(confidence_for(&many_near_min), Confidence::High);

        let some = compute_stats(1500.0, &history(&[1000.0; 12]));
        assert_eq!(confidence_for(&some), Confidence::Medium);

        let few = compute_stats(1000.0, &history(&[1000.0; 3]));
        assert_eq!(confidence_for(&few), Confidence::Low);
    }

    #[test]
    fn test_chart_is_oldest_first_with_average_overlay() {
        let prices = vec![900.0, 950.0, 1000.0];
        let h = history(&prices);
        let stats = compute_stats(900.0, &h);
        let chart = build_chart(&h, &stats);

        assert_eq!(chart.data_points, 3);
        // newest-first history renders oldest-first
        assert_eq!(chart.prices, vec![1000.0, 950.0, 900.0]);
        assert!(chart.labels.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(chart.average.len(), 3);
        assert!(chart.average.iter().all(|a| (*a - 950.0).abs() < 1e-9));
        assert_eq!(chart.markers.lowest_price, 900.0);
        assert_eq!(chart.markers.highest_price, 1000.0);
    }

    #[tokio::test]
    async fn test_empty_history_yields_unknown_wait() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_product(product(1, 2500.0, None));
        let analyzer = PriceAnalyzer::new(Arc::new(MockLlmClient::failing()), catalog);

        let result = analyzer.analyze(1).await;
        let analysis = result.ok_ref().expect("empty history is still an Ok analysis");
        assert_eq!(analysis.stats.trend, PriceTrend::Unknown);
        assert_eq!(analysis.stats.recommendation, BuyRecommendation::Wait);
        assert_eq!(analysis.stats.data_points, 0);
        assert!(analysis.chart.is_none());
        assert!(analysis.history.is_empty());
    }

    #[tokio::test]
    async fn test_missing_product_fails() {
        let analyzer = PriceAnalyzer::new(
            Arc::new(MockLlmClient::default()),
            Arc::new(MemoryCatalog::new()),
        );
        let result = analyzer.analyze(404).await;
        assert!(matches!(result, AgentResult::Failed(_)));
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back_to_rule_text() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_product(product(1, 1000.0, None));
        for i in 0..5 {
            catalog.add_price_point(point(1, 1000.0 + i as f64 * 50.0, i));
        }
        let analyzer = PriceAnalyzer::new(Arc::new(MockLlmClient::failing()), catalog);

        let result = analyzer.analyze(1).await;
        let analysis = result.ok_ref().unwrap();
        assert!(analysis.ai_recommendation.contains("BUY NOW"));
    }

    #[tokio::test]
    async fn test_history_capped_at_ten_entries() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_product(product(1, 1000.0, None));
        for i in 0..20 {
            catalog.add_price_point(point(1, 1000.0, i));
        }
        let analyzer = PriceAnalyzer::new(Arc::new(MockLlmClient::default()), catalog);
        let analysis = analyzer.analyze(1).await.into_ok().unwrap();
        assert_eq!(analysis.history.len(), 10);
        assert_eq!(analysis.stats.data_points, 20);
    }

    #[tokio::test]
    async fn test_find_deals_threshold_and_order() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_product(product(1, 800.0, Some(1000.0))); // 20%
        catalog.add_product(product(2, 950.0, Some(1000.0))); // 5%
        catalog.add_product(product(3, 600.0, Some(1000.0))); // 40%
        let analyzer = PriceAnalyzer::new(Arc::new(MockLlmClient::default()), catalog);

        let deals = analyzer.find_deals(None, 10.0, 5).await.unwrap();
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[0].product_id, 3);
        assert_eq!(deals[1].product_id, 1);
        assert!(deals.iter().all(|d| d.discount_pct >= 10.0));
    }

    #[tokio::test]
    async fn test_flash_deal_on_sharp_drop() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_product(product(1, 800.0, Some(1000.0)));
        catalog.add_price_point(point(1, 800.0, 0));
        catalog.add_price_point(point(1, 900.0, 1));
        catalog.add_price_point(point(1, 1000.0, 2)); // 20% above current
        let analyzer = PriceAnalyzer::new(Arc::new(MockLlmClient::default()), catalog);

        let deals = analyzer.find_deals(None, 10.0, 5).await.unwrap();
        assert!(deals[0].is_flash_deal);
        assert_eq!(deals[0].deal_type, "flash");
    }

    #[tokio::test]
    async fn test_flash_deal_on_ninety_day_low() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_product(product(1, 900.0, Some(1100.0)));
        catalog.add_price_point(point(1, 900.0, 0));
        catalog.add_price_point(point(1, 905.0, 1));
        catalog.add_price_point(point(1, 910.0, 2));
        catalog.add_price_point(point(1, 950.0, 60));
        let analyzer = PriceAnalyzer::new(Arc::new(MockLlmClient::default()), catalog);

        let deals = analyzer.find_deals(None, 10.0, 5).await.unwrap();
        assert!(deals[0].is_flash_deal);
    }

    #[tokio::test]
    async fn test_flash_deals_carry_urgency() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_product(product(1, 550.0, Some(1000.0))); // 45% off
        catalog.add_price_point(point(1, 550.0, 0));
        catalog.add_price_point(point(1, 700.0, 1));
        catalog.add_price_point(point(1, 900.0, 2));
        let analyzer = PriceAnalyzer::new(Arc::new(MockLlmClient::default()), catalog);

        let flash = analyzer.find_flash_deals(None, 5).await.unwrap();
        assert_eq!(flash.len(), 1);
        assert_eq!(flash[0].urgency_level.as_deref(), Some("extreme"));
    }

    #[test]
    fn test_urgency_levels() {
        assert_eq!(urgency_level(45.0), "extreme");
        assert_eq!(urgency_level(30.0), "high");
        assert_eq!(urgency_level(18.0), "medium");
        assert_eq!(urgency_level(11.0), "low");
    }
}
