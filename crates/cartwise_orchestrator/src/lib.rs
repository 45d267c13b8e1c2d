//! Orchestration layer: parallel analysis fan-out and response assembly
//!
//! The orchestrator retrieves the top products, launches one review and one
//! price task per product plus a comparison and a buy-plan task, harvests the
//! outcomes under per-task and global deadlines, and hands everything to the
//! assembler for the final frontend-ready shape. Partial failures degrade
//! individual sections; they never fail the request.

pub mod assembler;
pub mod orchestrator;

pub use assembler::{
    Assembler, BuyPlanBlock, ComparisonBlock, PriceBlock, ProductView, RecommendationResponse,
    ResponseMetadata, ReviewBlock, SummaryBlock,
};
pub use orchestrator::{OrchestrateRequest, Orchestrator};
