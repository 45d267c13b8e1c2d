//! Fan-out/fan-in coordination of the analysis agents
//!
//! One review and one price task per retrieved product, a comparison task
//! over up to five products, and a buy-plan task for the top product all run
//! concurrently. Each task carries its own deadline; a global ceiling bounds
//! the whole fan-in. Results attach by product id, never by completion order.

use crate::assembler::{Assembler, RecommendationResponse};
use cartwise_agents::{
    BuyPlanOptimizer, Comparator, ComparisonReport, ComparisonStyle, PaymentPreference,
    PriceAnalysis, PriceAnalyzer, PurchasePlan, ReviewAnalysis, ReviewAnalyzer,
};
use cartwise_core::{AgentResult, Error, Result, SearchFilters};
use cartwise_retrieval::{HybridRanker, IntentParser, RankedProduct};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub const REVIEW_TASK_TIMEOUT: Duration = Duration::from_secs(60);
pub const PRICE_TASK_TIMEOUT: Duration = Duration::from_secs(30);
pub const COMPARISON_TASK_TIMEOUT: Duration = Duration::from_secs(100);
pub const BUYPLAN_TASK_TIMEOUT: Duration = Duration::from_secs(8);
pub const GLOBAL_TIMEOUT: Duration = Duration::from_secs(120);

pub const MIN_TOP_N: usize = 1;
pub const MAX_TOP_N: usize = 5;
const MAX_COMPARISON_PRODUCTS: usize = 5;

/// Inputs for one orchestrated recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrateRequest {
    pub query: String,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub top_n: usize,
    pub user_preference: Option<String>,
    pub user_cards: Option<Vec<String>>,
}

impl OrchestrateRequest {
    /// Simple form: three products, balanced payment preference.
    pub fn simple(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            category: None,
            min_price: None,
            max_price: None,
            top_n: 3,
            user_preference: None,
            user_cards: None,
        }
    }
}

enum TaskOutput {
    Review(i64, AgentResult<ReviewAnalysis>),
    Price(i64, AgentResult<PriceAnalysis>),
    Comparison(AgentResult<ComparisonReport>),
    BuyPlan(AgentResult<PurchasePlan>),
}

/// Coordinates retrieval, the parallel analysis fan-out, and assembly
pub struct Orchestrator {
    intent: Arc<IntentParser>,
    ranker: Arc<HybridRanker>,
    reviews: Arc<ReviewAnalyzer>,
    prices: Arc<PriceAnalyzer>,
    comparator: Arc<Comparator>,
    buy_plans: Arc<BuyPlanOptimizer>,
    assembler: Assembler,
}

impl Orchestrator {
    pub fn new(
        intent: Arc<IntentParser>,
        ranker: Arc<HybridRanker>,
        reviews: Arc<ReviewAnalyzer>,
        prices: Arc<PriceAnalyzer>,
        comparator: Arc<Comparator>,
        buy_plans: Arc<BuyPlanOptimizer>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            intent,
            ranker,
            reviews,
            prices,
            comparator,
            buy_plans,
            assembler: Assembler::new(model_name),
        }
    }

    /// Run the full orchestration. Returns `success: true` whenever at least
    /// one product is retrieved, regardless of which analysis agents timed
    /// out. Only invalid input and catalog failures surface as errors.
    #[instrument(skip(self, request), fields(query = %request.query, top_n = request.top_n))]
    pub async fn orchestrate(&self, request: &OrchestrateRequest) -> Result<RecommendationResponse> {
        if !(MIN_TOP_N..=MAX_TOP_N).contains(&request.top_n) {
            return Err(Error::InvalidInput(format!(
                "top_n must be between {MIN_TOP_N} and {MAX_TOP_N}, got {}",
                request.top_n
            )));
        }

        let request_id = Uuid::new_v4();
        let started = Instant::now();
        info!("Orchestrating recommendation {request_id} for query: {}", request.query);

        let intent = self.intent.parse(&request.query).await;
        let filters = SearchFilters {
            category: request.category.clone(),
            min_price: request.min_price,
            max_price: request.max_price,
            min_rating: None,
        };

        let products = match self
            .ranker
            .search(&request.query, &intent, &filters, request.top_n)
            .await
        {
            Ok(products) => products,
            Err(e) if e.is_fatal() => {
                error!("Retrieval failed fatally: {e}");
                return Err(e);
            }
            Err(e) => {
                warn!("Retrieval failed: {e}");
                return Ok(RecommendationResponse::failure(&request.query, e.to_string()));
            }
        };

        if products.is_empty() {
            return Ok(RecommendationResponse::failure(
                &request.query,
                "No products found matching your query",
            ));
        }

        info!(
            "Found {} products, launching analysis fan-out",
            products.len()
        );

        let preference = request
            .user_preference
            .as_deref()
            .map(PaymentPreference::parse)
            .unwrap_or(PaymentPreference::Balanced);

        let (reviews, prices, comparison, buy_plan) =
            self.run_analysis(&products, preference).await;

        let response = self.assembler.assemble(
            request_id,
            &request.query,
            &products,
            &reviews,
            &prices,
            comparison.as_ref(),
            Some(&buy_plan),
            started.elapsed().as_secs_f64(),
        );
        info!(
            "Orchestration {request_id} complete in {:.2}s",
            started.elapsed().as_secs_f64()
        );
        Ok(response)
    }

    /// Launch every analysis task and harvest results under the global
    /// ceiling. Slots still open when the ceiling fires become `Timeout`.
    async fn run_analysis(
        &self,
        products: &[RankedProduct],
        preference: PaymentPreference,
    ) -> (
        HashMap<i64, AgentResult<ReviewAnalysis>>,
        HashMap<i64, AgentResult<PriceAnalysis>>,
        Option<AgentResult<ComparisonReport>>,
        AgentResult<PurchasePlan>,
    ) {
        let product_ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        let top_product_id = product_ids[0];
        let comparison_ids: Vec<i64> = product_ids
            .iter()
            .take(MAX_COMPARISON_PRODUCTS)
            .copied()
            .collect();
        let compare = comparison_ids.len() >= 2;

        let mut set: JoinSet<TaskOutput> = JoinSet::new();

        for &product_id in &product_ids {
            let reviews = Arc::clone(&self.reviews);
            set.spawn(async move {
                let result =
                    match tokio::time::timeout(REVIEW_TASK_TIMEOUT, reviews.analyze(product_id))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => AgentResult::Timeout,
                    };
                TaskOutput::Review(product_id, result)
            });

            let prices = Arc::clone(&self.prices);
            set.spawn(async move {
                let result =
                    match tokio::time::timeout(PRICE_TASK_TIMEOUT, prices.analyze(product_id))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => AgentResult::Timeout,
                    };
                TaskOutput::Price(product_id, result)
            });
        }

        if compare {
            let comparator = Arc::clone(&self.comparator);
            set.spawn(async move {
                let result = match tokio::time::timeout(
                    COMPARISON_TASK_TIMEOUT,
                    comparator.compare(&comparison_ids, ComparisonStyle::Table),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => AgentResult::Timeout,
                };
                TaskOutput::Comparison(result)
            });
        }

        let buy_plans = Arc::clone(&self.buy_plans);
        set.spawn(async move {
            let result = match tokio::time::timeout(
                BUYPLAN_TASK_TIMEOUT,
                buy_plans.create_plan(top_product_id, preference),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => AgentResult::Timeout,
            };
            TaskOutput::BuyPlan(result)
        });

        let mut reviews = HashMap::new();
        let mut prices = HashMap::new();
        let mut comparison: Option<AgentResult<ComparisonReport>> = None;
        let mut buy_plan: Option<AgentResult<PurchasePlan>> = None;

        let deadline = tokio::time::sleep(GLOBAL_TIMEOUT);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = set.join_next() => match joined {
                    None => break,
                    Some(Ok(output)) => match output {
                        TaskOutput::Review(id, result) => {
                            reviews.insert(id, result);
                        }
                        TaskOutput::Price(id, result) => {
                            prices.insert(id, result);
                        }
                        TaskOutput::Comparison(result) => comparison = Some(result),
                        TaskOutput::BuyPlan(result) => buy_plan = Some(result),
                    },
                    Some(Err(join_err)) => {
                        warn!("Analysis task panicked or was cancelled: {join_err}");
                    }
                },
                _ = &mut deadline => {
                    warn!("Global orchestration ceiling hit, collecting partial results");
                    set.abort_all();
                    break;
                }
            }
        }

        // Slots the ceiling cut off become explicit timeouts
        for &product_id in &product_ids {
            reviews.entry(product_id).or_insert(AgentResult::Timeout);
            prices.entry(product_id).or_insert(AgentResult::Timeout);
        }
        let comparison = if compare {
            Some(comparison.unwrap_or(AgentResult::Timeout))
        } else {
            None
        };
        let buy_plan = buy_plan.unwrap_or(AgentResult::Timeout);

        (reviews, prices, comparison, buy_plan)
    }
}
