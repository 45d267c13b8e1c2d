//! Core domain types for the Cartwise recommendation engine
//!
//! This crate provides the shared vocabulary of the engine:
//!
//! - Catalog entities (products, reviews, price points, card offers)
//! - Request-scoped retrieval types (search intent, retrieved candidates)
//! - The `AgentResult` outcome type every analysis stage returns
//! - Error taxonomy and result alias
//!
//! # Architecture
//!
//! Everything here is plain data. Services (catalog store, LLM client, vector
//! index) live in sibling crates and are injected behind traits, so this crate
//! stays dependency-light and usable from every layer.

pub mod error;
pub mod intent;
pub mod models;
pub mod money;
pub mod outcome;

pub use error::{Error, Result};
pub use intent::{RetrievedCandidate, SearchFilters, SearchIntent};
pub use models::{CardOffer, OfferKind, PricePoint, Product, Review};
pub use money::{format_rupees, round2};
pub use outcome::AgentResult;
