//! Axum REST surface for the recommendation engine

use cartwise_agents::{BuyPlanOptimizer, Comparator, PriceAnalyzer, ReviewAnalyzer};
use cartwise_catalog::{CatalogStore, PgCatalog};
use cartwise_core::Result;
use cartwise_orchestrator::Orchestrator;
use cartwise_retrieval::{HybridRanker, IntentParser};
use cartwise_runtime::llm::{LlmClient, OllamaClient};
use cartwise_runtime::vector::{HttpVectorIndex, VectorIndex};
use cartwise_runtime::EngineConfig;
use std::sync::Arc;

mod routes;
pub use routes::router;

/// Shared handler state: every collaborator is constructor-injected so tests
/// can assemble the state from in-process fakes.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub intent: Arc<IntentParser>,
    pub ranker: Arc<HybridRanker>,
    pub reviews: Arc<ReviewAnalyzer>,
    pub prices: Arc<PriceAnalyzer>,
    pub comparator: Arc<Comparator>,
    pub buy_plans: Arc<BuyPlanOptimizer>,
    pub catalog: Arc<dyn CatalogStore>,
}

impl AppState {
    /// Wire the production clients from environment-driven configuration.
    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        let llm: Arc<dyn LlmClient> =
            Arc::new(OllamaClient::new(&config.llm.endpoint, &config.llm.model));
        let index: Arc<dyn VectorIndex> = Arc::new(HttpVectorIndex::new(&config.index.endpoint));
        let catalog: Arc<dyn CatalogStore> = Arc::new(PgCatalog::connect(&config.catalog).await?);

        Ok(Self::assemble(llm, index, catalog, &config.llm.model))
    }

    /// Build the state from explicit collaborators (used by tests).
    pub fn assemble(
        llm: Arc<dyn LlmClient>,
        index: Arc<dyn VectorIndex>,
        catalog: Arc<dyn CatalogStore>,
        model_name: &str,
    ) -> Self {
        let intent = Arc::new(IntentParser::new(Arc::clone(&llm)));
        let ranker = Arc::new(HybridRanker::new(index, Arc::clone(&catalog)));
        let reviews = Arc::new(ReviewAnalyzer::new(Arc::clone(&llm), Arc::clone(&catalog)));
        let prices = Arc::new(PriceAnalyzer::new(Arc::clone(&llm), Arc::clone(&catalog)));
        let comparator = Arc::new(Comparator::new(Arc::clone(&llm), Arc::clone(&catalog)));
        let buy_plans = Arc::new(BuyPlanOptimizer::new(Arc::clone(&llm), Arc::clone(&catalog)));

        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&intent),
            Arc::clone(&ranker),
            Arc::clone(&reviews),
            Arc::clone(&prices),
            Arc::clone(&comparator),
            Arc::clone(&buy_plans),
            model_name,
        ));

        Self {
            orchestrator,
            intent,
            ranker,
            reviews,
            prices,
            comparator,
            buy_plans,
            catalog,
        }
    }
}
