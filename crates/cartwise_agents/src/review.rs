//! Review analysis agent: sentiment, pros/cons, and trust score

use crate::themes::{extract_themes, ReviewThemes};
use cartwise_catalog::CatalogStore;
use cartwise_core::{AgentResult, Review};
use cartwise_runtime::cache::{AgentCache, REVIEW_CACHE_TTL_SECS};
use cartwise_runtime::llm::{GenerateOptions, GenerateRequest, LlmClient};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const REVIEW_FETCH_LIMIT: i64 = 100;
const LLM_TIMEOUT: Duration = Duration::from_secs(90);
const MAX_PROS: usize = 3;
const MAX_CONS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }

    /// Rule-based sentiment from the mean rating.
    fn from_rating(average: f64) -> Self {
        if average >= 4.0 {
            Sentiment::Positive
        } else if average >= 3.0 {
            Sentiment::Neutral
        } else {
            Sentiment::Negative
        }
    }
}

/// Aggregate statistics over the analyzed review set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewStatistics {
    pub total_reviews: i64,
    pub average_rating: f64,
    /// Star rating -> count, keys 1 through 5
    pub rating_distribution: BTreeMap<i32, i64>,
    pub rating_distribution_pct: BTreeMap<i32, f64>,
    pub verified_purchases: i64,
}

impl ReviewStatistics {
    fn compute(reviews: &[Review]) -> Self {
        let total = reviews.len() as i64;
        let mut distribution: BTreeMap<i32, i64> = (1..=5).map(|star| (star, 0)).collect();
        let mut rating_sum = 0_i64;
        let mut verified = 0_i64;

        for review in reviews {
            rating_sum += review.rating as i64;
            *distribution.entry(review.rating.clamp(1, 5)).or_insert(0) += 1;
            if review.verified_purchase {
                verified += 1;
            }
        }

        let average = if total > 0 {
            (rating_sum as f64 / total as f64 * 100.0).round() / 100.0
        } else {
            0.0
        };
        let distribution_pct = distribution
            .iter()
            .map(|(star, count)| {
                let pct = if total > 0 {
                    *count as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                (*star, pct)
            })
            .collect();

        Self {
            total_reviews: total,
            average_rating: average,
            rating_distribution: distribution,
            rating_distribution_pct: distribution_pct,
            verified_purchases: verified,
        }
    }

    fn verified_ratio(&self) -> f64 {
        if self.total_reviews == 0 {
            return 0.0;
        }
        self.verified_purchases as f64 / self.total_reviews as f64
    }

    fn star_share(&self, star: i32) -> f64 {
        if self.total_reviews == 0 {
            return 0.0;
        }
        *self.rating_distribution.get(&star).unwrap_or(&0) as f64 / self.total_reviews as f64
    }
}

/// Complete review analysis for one product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAnalysis {
    pub product_id: i64,
    pub statistics: ReviewStatistics,
    pub sentiment: Sentiment,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub summary: String,
    /// Whether the review profile looks organic, in [0,1]
    pub trust_score: f64,
    pub themes: ReviewThemes,
    pub full_analysis: String,
}

pub struct ReviewAnalyzer {
    llm: Arc<dyn LlmClient>,
    catalog: Arc<dyn CatalogStore>,
    cache: AgentCache<ReviewAnalysis>,
}

impl ReviewAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            llm,
            catalog,
            cache: AgentCache::with_ttl_secs(REVIEW_CACHE_TTL_SECS),
        }
    }

    /// Analyze reviews for a product, serving repeated requests from cache.
    pub async fn analyze(&self, product_id: i64) -> AgentResult<ReviewAnalysis> {
        let cache_key = format!("review_analysis_{product_id}");
        if let Some(cached) = self.cache.get(&cache_key).await {
            info!("Returning cached review analysis for product {product_id}");
            return AgentResult::Ok((*cached).clone());
        }

        let reviews = match self.catalog.reviews(product_id, REVIEW_FETCH_LIMIT).await {
            Ok(reviews) => reviews,
            Err(e) => return AgentResult::Failed(e.to_string()),
        };

        if reviews.is_empty() {
            return AgentResult::Skipped("No reviews found for this product".to_string());
        }

        let statistics = ReviewStatistics::compute(&reviews);
        let themes = extract_themes(&reviews);
        let trust_score = trust_score(&statistics);

        let prompt = build_prompt(&statistics, &themes);
        let request = GenerateRequest::new(prompt).with_options(
            GenerateOptions::default()
                .with_temperature(0.3)
                .with_max_tokens(150),
        );

        let analysis = match tokio::time::timeout(LLM_TIMEOUT, self.llm.generate(request)).await {
            Ok(Ok(text)) => {
                let (sentiment, pros, cons, summary) = parse_analysis(&text);
                ReviewAnalysis {
                    product_id,
                    statistics,
                    sentiment,
                    pros,
                    cons,
                    summary,
                    trust_score,
                    themes,
                    full_analysis: text,
                }
            }
            Ok(Err(e)) => {
                warn!("Review LLM failed for product {product_id}, using rule-based fallback: {e}");
                fallback_analysis(product_id, statistics, themes, trust_score)
            }
            Err(_) => {
                warn!("Review LLM timed out for product {product_id}, using rule-based fallback");
                fallback_analysis(product_id, statistics, themes, trust_score)
            }
        };

        self.cache.insert(cache_key, analysis.clone()).await;
        AgentResult::Ok(analysis)
    }
}

fn build_prompt(stats: &ReviewStatistics, themes: &ReviewThemes) -> String {
    let verified_pct = stats.verified_ratio() * 100.0;
    let top_positive = themes.positive.iter().take(3).cloned().collect::<Vec<_>>();
    let top_negative = themes.negative.iter().take(2).cloned().collect::<Vec<_>>();

    format!(
        "Product Review Analysis:\n\
         Rating: {:.1}/5 ({} reviews, {:.0}% verified)\n\n\
         Positive: {}\n\
         Negative: {}\n\n\
         Provide:\n\
         1. Sentiment (Positive/Neutral/Negative)\n\
         2. Top 3 pros (brief)\n\
         3. Top 2 cons (brief)\n\
         4. One sentence summary\n\n\
         Be concise.",
        stats.average_rating,
        stats.total_reviews,
        verified_pct,
        top_positive.join(", "),
        top_negative.join(", "),
    )
}

/// Synthesize an analysis when the LLM is unavailable.
fn fallback_analysis(
    product_id: i64,
    statistics: ReviewStatistics,
    themes: ReviewThemes,
    trust_score: f64,
) -> ReviewAnalysis {
    let sentiment = Sentiment::from_rating(statistics.average_rating);
    let pros = if themes.positive.is_empty() {
        vec!["Overall positive feedback".to_string()]
    } else {
        themes.positive.iter().take(MAX_PROS).cloned().collect()
    };
    let cons = if themes.negative.is_empty() {
        vec!["Some concerns noted".to_string()]
    } else {
        themes.negative.iter().take(MAX_CONS).cloned().collect()
    };
    let summary = format!(
        "Product rated {}/5 by {} customers",
        statistics.average_rating, statistics.total_reviews
    );
    let full_analysis = format!(
        "{} sentiment based on {} reviews",
        sentiment.as_str(),
        statistics.total_reviews
    );

    ReviewAnalysis {
        product_id,
        statistics,
        sentiment,
        pros,
        cons,
        summary,
        trust_score,
        themes,
        full_analysis,
    }
}

/// Trust score in [0,1]: base 0.5, plus verified share, balanced rating
/// distribution, and sample size terms.
fn trust_score(stats: &ReviewStatistics) -> f64 {
    let mut score = 0.5;

    score += stats.verified_ratio() * 0.3;

    let five_star = stats.star_share(5);
    let one_star = stats.star_share(1);
    if five_star < 0.7 && one_star < 0.3 {
        score += 0.2;
    } else if five_star > 0.9 {
        score -= 0.1;
    }

    if stats.total_reviews > 50 {
        score += 0.1;
    } else if stats.total_reviews > 20 {
        score += 0.05;
    }

    score.clamp(0.0, 1.0)
}

/// Parse the model output section by section, driven by header keywords and
/// bullet prefixes. Missing sections fall back to synthesized text.
fn parse_analysis(text: &str) -> (Sentiment, Vec<String>, Vec<String>, String) {
    let mut sentiment = Sentiment::Neutral;
    let mut pros = Vec::new();
    let mut cons = Vec::new();
    let mut summary = String::new();

    #[derive(PartialEq)]
    enum Section {
        None,
        Pros,
        Cons,
        Summary,
    }
    let mut section = Section::None;

    for line in text.lines() {
        let line = line.trim();
        let upper = line.to_uppercase();
        let lower = line.to_lowercase();

        if upper.contains("SENTIMENT") || upper.contains("OVERALL") {
            if lower.contains("positive") {
                sentiment = Sentiment::Positive;
            } else if lower.contains("negative") {
                sentiment = Sentiment::Negative;
            } else if lower.contains("neutral") {
                sentiment = Sentiment::Neutral;
            }
        } else if upper.contains("PROS") || upper.contains("ADVANTAGES") {
            section = Section::Pros;
        } else if upper.contains("CONS") || upper.contains("DISADVANTAGES") {
            section = Section::Cons;
        } else if upper.contains("SUMMARY") {
            section = Section::Summary;
        } else if let Some(item) = line
            .strip_prefix('-')
            .or_else(|| line.strip_prefix('•'))
            .or_else(|| line.strip_prefix('*'))
        {
            let item = item.trim().to_string();
            if section == Section::Pros && pros.len() < MAX_PROS {
                pros.push(item);
            } else if section == Section::Cons && cons.len() < MAX_CONS {
                cons.push(item);
            }
        } else if section == Section::Summary && !line.is_empty() && !line.ends_with(':') {
            summary.push_str(line);
            summary.push(' ');
        }
    }

    if pros.is_empty() {
        pros.push("Overall positive feedback from customers".to_string());
    }
    if cons.is_empty() {
        cons.push("Some minor issues reported".to_string());
    }
    if summary.trim().is_empty() {
        summary = if text.chars().count() > 200 {
            let head: String = text.chars().take(200).collect();
            format!("{head}...")
        } else {
            text.to_string()
        };
    }

    (sentiment, pros, cons, summary.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartwise_catalog::MemoryCatalog;
    use cartwise_runtime::llm::MockLlmClient;
    use chrono::Utc;

    fn seed_reviews(catalog: &MemoryCatalog, product_id: i64, ratings: &[i32], verified: usize) {
        for (i, rating) in ratings.iter().enumerate() {
            catalog.add_review(Review {
                product_id,
                rating: *rating,
                text: "good quality sound, very comfortable fit".into(),
                verified_purchase: i < verified,
                helpful_count: (ratings.len() - i) as i64,
                created_at: Utc::now(),
            });
        }
    }

    const LLM_REPLY: &str = "SENTIMENT: Positive\n\
        PROS:\n- Great sound\n- Comfortable\n- Long battery\n- Extra pro ignored\n\
        CONS:\n- Average mic\n- Bulky case\n- Extra con ignored\n\
        SUMMARY:\nSolid headphones for the price.";

    #[tokio::test]
    async fn test_analyze_with_llm_response() {
        let catalog = Arc::new(MemoryCatalog::new());
        seed_reviews(&catalog, 1, &[5, 4, 4, 3], 3);
        let analyzer = ReviewAnalyzer::new(Arc::new(MockLlmClient::new(LLM_REPLY)), catalog);

        let result = analyzer.analyze(1).await;
        let analysis = result.ok_ref().expect("analysis should succeed");

        assert_eq!(analysis.sentiment, Sentiment::Positive);
        assert_eq!(analysis.pros.len(), 3);
        assert_eq!(analysis.cons.len(), 2);
        assert_eq!(analysis.summary, "Solid headphones for the price.");
        assert_eq!(analysis.statistics.total_reviews, 4);
        assert!((0.0..=1.0).contains(&analysis.trust_score));
    }

    #[tokio::test]
    async fn test_no_reviews_skips_without_llm() {
        let analyzer = ReviewAnalyzer::new(
            Arc::new(MockLlmClient::failing()),
            Arc::new(MemoryCatalog::new()),
        );
        let result = analyzer.analyze(99).await;
        assert!(matches!(result, AgentResult::Skipped(_)));
        assert_eq!(result.failure_reason(), Some("No reviews found for this product"));
    }

    #[tokio::test]
    async fn test_llm_failure_uses_fallback_and_caches() {
        let catalog = Arc::new(MemoryCatalog::new());
        seed_reviews(&catalog, 1, &[5, 5, 4], 2);
        let analyzer = ReviewAnalyzer::new(Arc::new(MockLlmClient::failing()), catalog);

        let result = analyzer.analyze(1).await;
        let analysis = result.ok_ref().expect("fallback should still produce Ok");
        assert_eq!(analysis.sentiment, Sentiment::Positive);
        assert!(analysis.summary.contains("rated"));
        assert!((0.0..=1.0).contains(&analysis.trust_score));

        // fallback result is cached too
        assert!(analyzer.cache.get("review_analysis_1").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_llm_timeout_uses_fallback() {
        let catalog = Arc::new(MemoryCatalog::new());
        seed_reviews(&catalog, 1, &[2, 2, 1], 0);
        let slow = MockLlmClient::new("late").with_delay(Duration::from_secs(600));
        let analyzer = ReviewAnalyzer::new(Arc::new(slow), catalog);

        let result = analyzer.analyze(1).await;
        let analysis = result.ok_ref().expect("timeout falls back to rules");
        assert_eq!(analysis.sentiment, Sentiment::Negative);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_recompute() {
        let catalog = Arc::new(MemoryCatalog::new());
        seed_reviews(&catalog, 1, &[4, 4], 1);
        let analyzer = ReviewAnalyzer::new(Arc::new(MockLlmClient::new(LLM_REPLY)), catalog.clone());

        let first = analyzer.analyze(1).await;
        // a review added after caching must not change the cached answer
        seed_reviews(&catalog, 1, &[1], 0);
        let second = analyzer.analyze(1).await;

        let a = first.ok_ref().unwrap();
        let b = second.ok_ref().unwrap();
        assert_eq!(a.statistics.total_reviews, b.statistics.total_reviews);
    }

    #[test]
    fn test_trust_score_formula() {
        // 4 reviews, half verified, balanced distribution, small sample:
        // 0.5 + 0.5*0.3 + 0.2 = 0.85
        let reviews: Vec<Review> = [5, 4, 3, 2]
            .iter()
            .enumerate()
            .map(|(i, r)| Review {
                product_id: 1,
                rating: *r,
                text: String::new(),
                verified_purchase: i < 2,
                helpful_count: 0,
                created_at: Utc::now(),
            })
            .collect();
        let stats = ReviewStatistics::compute(&reviews);
        assert!((trust_score(&stats) - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_trust_score_penalizes_suspicious_profile() {
        // all five-star, unverified -> 0.5 - 0.1 = 0.4
        let reviews: Vec<Review> = (0..10)
            .map(|_| Review {
                product_id: 1,
                rating: 5,
                text: String::new(),
                verified_purchase: false,
                helpful_count: 0,
                created_at: Utc::now(),
            })
            .collect();
        let stats = ReviewStatistics::compute(&reviews);
        assert!((trust_score(&stats) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_trust_score_clamped() {
        let reviews: Vec<Review> = (0..100)
            .map(|i| Review {
                product_id: 1,
                rating: if i % 2 == 0 { 5 } else { 4 },
                text: String::new(),
                verified_purchase: true,
                helpful_count: 0,
                created_at: Utc::now(),
            })
            .collect();
        let stats = ReviewStatistics::compute(&reviews);
        let score = trust_score(&stats);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn test_parse_analysis_missing_sections() {
        let (sentiment, pros, cons, summary) = parse_analysis("The product seems fine.");
        assert_eq!(sentiment, Sentiment::Neutral);
        assert_eq!(pros, vec!["Overall positive feedback from customers"]);
        assert_eq!(cons, vec!["Some minor issues reported"]);
        assert_eq!(summary, "The product seems fine.");
    }
}
