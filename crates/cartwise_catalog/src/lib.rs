//! Catalog access layer
//!
//! The engine reads four tables (products, reviews, price_history,
//! card_offers) and never writes them. `CatalogStore` is the seam: production
//! uses the Postgres-backed `PgCatalog`, tests inject `MemoryCatalog`.

pub mod memory;
pub mod store;

pub use memory::MemoryCatalog;
pub use store::{CatalogStore, PgCatalog, ProductQuery};
