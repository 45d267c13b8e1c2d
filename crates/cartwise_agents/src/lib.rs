//! Analysis agents for the recommendation engine
//!
//! Four specialized agents sit between retrieval and assembly:
//!
//! - [`review::ReviewAnalyzer`] - sentiment, pros/cons, and trust score
//! - [`price::PriceAnalyzer`] - trend, buy/wait decision, and deal scan
//! - [`compare::Comparator`] - differences and category winners across products
//! - [`buyplan::BuyPlanOptimizer`] - best payment option from the offer set
//!
//! Each agent wraps its LLM call with a timeout and a rule-based fallback and
//! reports through `AgentResult`; nothing here raises into the orchestrator.

pub mod buyplan;
pub mod compare;
pub mod emi;
pub mod price;
pub mod review;
pub mod themes;

pub use buyplan::{BuyPlanOptimizer, PaymentOption, PaymentPreference, PurchasePlan};
pub use compare::{Comparator, ComparisonReport, ComparisonStyle, Winners};
pub use price::{BuyRecommendation, Confidence, Deal, PriceAnalysis, PriceAnalyzer, PriceTrend};
pub use review::{ReviewAnalysis, ReviewAnalyzer, Sentiment};
