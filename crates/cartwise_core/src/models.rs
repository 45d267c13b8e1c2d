//! Catalog entities: products, reviews, price history, and card offers
//!
//! These are read-only views over persisted state owned by the ingestion
//! pipeline. The engine never writes them.

use crate::money::round2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A catalog product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub brand: String,
    pub model: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    /// Current selling price
    pub price: f64,
    /// Maximum retail price; `None` when the listing has no strike-through price
    pub mrp: Option<f64>,
    pub description: Option<String>,
    pub features: Vec<String>,
    /// Specification key -> rendered value; ordered so output is deterministic
    pub specifications: BTreeMap<String, String>,
    pub rating: f64,
    pub review_count: i64,
    pub in_stock: bool,
}

impl Product {
    /// Discount percentage derived from MRP, rounded to 2 decimals.
    /// Zero when no MRP is set or the listing sells at MRP or above.
    pub fn discount_percent(&self) -> f64 {
        match self.mrp {
            Some(mrp) if mrp > 0.0 && mrp > self.price => {
                round2((mrp - self.price) / mrp * 100.0)
            }
            _ => 0.0,
        }
    }

    /// Absolute savings versus MRP, zero when no MRP is set.
    pub fn savings(&self) -> f64 {
        match self.mrp {
            Some(mrp) if mrp > self.price => round2(mrp - self.price),
            _ => 0.0,
        }
    }

    /// MRP falling back to the selling price when absent.
    pub fn mrp_or_price(&self) -> f64 {
        self.mrp.unwrap_or(self.price)
    }
}

/// A customer review, append-only from the engine's perspective
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub product_id: i64,
    /// Star rating, 1-5
    pub rating: i32,
    pub text: String,
    pub verified_purchase: bool,
    pub helpful_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A single observation in a product's price history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub product_id: i64,
    pub price: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Kind of bank card offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferKind {
    InstantDiscount,
    Cashback,
    NoCostEmi,
    RegularEmi,
    Combo,
}

impl OfferKind {
    /// Lenient parse of the persisted offer_type column.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "instant_discount" => Some(OfferKind::InstantDiscount),
            "cashback" => Some(OfferKind::Cashback),
            "no_cost_emi" => Some(OfferKind::NoCostEmi),
            "regular_emi" => Some(OfferKind::RegularEmi),
            "combo" => Some(OfferKind::Combo),
            _ => None,
        }
    }
}

/// A bank card offer attached to a product
///
/// Invariant: at least one of `discount_percent`, `discount_amount`,
/// `cashback_amount`, `emi_tenure_months` is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardOffer {
    pub id: i64,
    pub product_id: i64,
    pub bank_name: String,
    pub card_type: Option<String>,
    pub kind: OfferKind,
    pub discount_percent: Option<f64>,
    pub discount_amount: Option<f64>,
    pub cashback_amount: Option<f64>,
    pub emi_tenure_months: Option<u32>,
    pub is_no_cost_emi: bool,
    pub min_transaction_amount: Option<f64>,
    pub description: Option<String>,
    pub is_active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_till: Option<DateTime<Utc>>,
}

impl CardOffer {
    /// Whether the offer can be applied right now.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(from) = self.valid_from {
            if now < from {
                return false;
            }
        }
        if let Some(till) = self.valid_till {
            if now > till {
                return false;
            }
        }
        true
    }
}
