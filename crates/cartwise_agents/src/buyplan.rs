//! Buy-plan optimization agent: best payment option from the offer set

use crate::emi::{self, EmiPlan, PROCESSING_FEE};
use cartwise_catalog::CatalogStore;
use cartwise_core::{format_rupees, round2, AgentResult, CardOffer, OfferKind, Product};
use cartwise_runtime::llm::{GenerateOptions, GenerateRequest, LlmClient};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const LLM_TIMEOUT: Duration = Duration::from_secs(8);
const CASHBACK_CREDIT_DAYS: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPreference {
    InstantSavings,
    Emi,
    Cashback,
    Balanced,
}

impl PaymentPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPreference::InstantSavings => "instant_savings",
            PaymentPreference::Emi => "emi",
            PaymentPreference::Cashback => "cashback",
            PaymentPreference::Balanced => "balanced",
        }
    }

    /// Lenient parse; anything unrecognized means balanced.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "instant_savings" => PaymentPreference::InstantSavings,
            "emi" => PaymentPreference::Emi,
            "cashback" => PaymentPreference::Cashback,
            _ => PaymentPreference::Balanced,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    OneTime,
    Cashback,
    Emi,
}

/// One enumerated way to pay for the product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOption {
    pub option_name: String,
    pub payment_method: String,
    pub payment_type: PaymentKind,
    pub final_price: f64,
    pub discount_from_mrp: f64,
    /// Savings on top of the sticker discount
    pub additional_savings: f64,
    pub total_savings: f64,
    pub savings_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashback_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashback_credit_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emi_per_month: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenure_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_interest: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_details: Option<String>,
}

/// Best-in-class selections plus the narrative recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyPlanRecommendations {
    pub best_instant_savings: Option<PaymentOption>,
    pub best_cashback: Option<PaymentOption>,
    pub best_emi: Option<PaymentOption>,
    pub ai_recommendation: String,
}

/// Complete purchase plan for one product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchasePlan {
    pub product_id: i64,
    pub product_name: String,
    pub product_price: f64,
    pub product_mrp: f64,
    pub emi_eligible: bool,
    pub payment_options: Vec<PaymentOption>,
    pub regular_emi_plans: Vec<EmiPlan>,
    pub no_cost_emi_plans: Vec<EmiPlan>,
    pub recommendations: BuyPlanRecommendations,
    pub summary: String,
}

/// Preference- and card-aware pick from the enumerated options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecommendation {
    pub product_id: i64,
    pub product_name: String,
    pub product_price: f64,
    pub user_preference: PaymentPreference,
    pub user_cards: Option<Vec<String>>,
    pub recommended_option: Option<PaymentOption>,
    pub alternative_options: Vec<PaymentOption>,
    pub reason: String,
}

pub struct BuyPlanOptimizer {
    llm: Arc<dyn LlmClient>,
    catalog: Arc<dyn CatalogStore>,
}

impl BuyPlanOptimizer {
    pub fn new(llm: Arc<dyn LlmClient>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { llm, catalog }
    }

    /// Build the full purchase plan for a product.
    pub async fn create_plan(
        &self,
        product_id: i64,
        preference: PaymentPreference,
    ) -> AgentResult<PurchasePlan> {
        let product = match self.catalog.product(product_id).await {
            Ok(Some(product)) => product,
            Ok(None) => return AgentResult::Failed(format!("Product {product_id} not found")),
            Err(e) => return AgentResult::Failed(e.to_string()),
        };

        let offers = match self.catalog.card_offers(product_id).await {
            Ok(offers) => offers,
            Err(e) => return AgentResult::Failed(e.to_string()),
        };
        let now = Utc::now();
        let offers: Vec<CardOffer> = offers.into_iter().filter(|o| o.is_live(now)).collect();

        info!(
            "Building purchase plan for product {product_id} with {} live offers",
            offers.len()
        );

        let regular_emi_plans = emi::regular_plans(product.price);
        let no_cost_emi_plans = emi::no_cost_plans(product.price);
        let payment_options = enumerate_options(&product, &offers);
        let (best_instant_savings, best_cashback, best_emi) =
            select_best(&payment_options, &no_cost_emi_plans);

        let ai_recommendation = self
            .narrate(
                &product,
                best_instant_savings.as_ref(),
                best_cashback.as_ref(),
                best_emi.as_ref(),
                preference,
            )
            .await;

        let recommendations = BuyPlanRecommendations {
            best_instant_savings,
            best_cashback,
            best_emi,
            ai_recommendation,
        };
        let summary = build_summary(&product, &recommendations);

        AgentResult::Ok(PurchasePlan {
            product_id,
            product_name: product.name.clone(),
            product_price: product.price,
            product_mrp: product.mrp_or_price(),
            emi_eligible: emi::eligibility(product.price).eligible_for_emi,
            payment_options,
            regular_emi_plans,
            no_cost_emi_plans,
            recommendations,
            summary,
        })
    }

    /// Pick one option for the user's preference, restricted to their cards.
    pub async fn recommend_payment_method(
        &self,
        product_id: i64,
        user_cards: Option<Vec<String>>,
        preference: PaymentPreference,
    ) -> AgentResult<PaymentRecommendation> {
        let plan = match self.create_plan(product_id, preference).await {
            AgentResult::Ok(plan) => plan,
            AgentResult::Timeout => return AgentResult::Timeout,
            AgentResult::Failed(reason) => return AgentResult::Failed(reason),
            AgentResult::Skipped(reason) => return AgentResult::Skipped(reason),
        };

        let available: Vec<PaymentOption> = match &user_cards {
            Some(cards) => plan
                .payment_options
                .iter()
                .filter(|opt| {
                    opt.payment_method == "Any Card/Cash"
                        || cards.iter().any(|bank| {
                            opt.payment_method
                                .to_lowercase()
                                .contains(&bank.to_lowercase())
                        })
                })
                .cloned()
                .collect(),
            None => plan.payment_options.clone(),
        };

        let recommended = pick_for_preference(&available, &plan.no_cost_emi_plans, preference)
            .or_else(|| available.first().cloned());
        let reason = explain_recommendation(recommended.as_ref(), preference);

        AgentResult::Ok(PaymentRecommendation {
            product_id,
            product_name: plan.product_name,
            product_price: plan.product_price,
            user_preference: preference,
            user_cards,
            alternative_options: available.into_iter().take(3).collect(),
            recommended_option: recommended,
            reason,
        })
    }

    async fn narrate(
        &self,
        product: &Product,
        best_instant: Option<&PaymentOption>,
        best_cashback: Option<&PaymentOption>,
        best_emi: Option<&PaymentOption>,
        preference: PaymentPreference,
    ) -> String {
        let prompt = build_narrative_prompt(product, best_instant, best_cashback, best_emi, preference);
        let request = GenerateRequest::new(prompt)
            .with_system(
                "You are a helpful financial advisor specializing in purchase optimization. \
                 Be concise and practical.",
            )
            .with_options(
                GenerateOptions::default()
                    .with_temperature(0.7)
                    .with_max_tokens(200),
            );

        match tokio::time::timeout(LLM_TIMEOUT, self.llm.generate(request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Buy-plan narrative failed for '{}': {e}", product.name);
                "Choose the option with highest savings based on your payment preference."
                    .to_string()
            }
            Err(_) => {
                warn!("Buy-plan narrative timed out for '{}'", product.name);
                "Choose the option with highest savings based on your payment preference."
                    .to_string()
            }
        }
    }
}

/// Enumerate every way to pay: the full-price baseline plus one option per
/// live card offer. Sorted by total savings, best first.
fn enumerate_options(product: &Product, offers: &[CardOffer]) -> Vec<PaymentOption> {
    let price = product.price;
    let mrp = product.mrp_or_price();
    let base_discount = (mrp - price).max(0.0);
    let savings_pct = |total: f64| {
        if mrp > 0.0 {
            round2(total / mrp * 100.0)
        } else {
            0.0
        }
    };

    let mut options = vec![PaymentOption {
        option_name: "Full Price Payment".to_string(),
        payment_method: "Any Card/Cash".to_string(),
        payment_type: PaymentKind::OneTime,
        final_price: price,
        discount_from_mrp: base_discount,
        additional_savings: 0.0,
        total_savings: round2(base_discount),
        savings_percent: savings_pct(base_discount),
        cashback_amount: None,
        effective_price: None,
        cashback_credit_days: None,
        emi_per_month: None,
        tenure_months: None,
        total_amount: None,
        processing_fee: None,
        total_interest: None,
        offer_details: None,
    }];

    for offer in offers {
        match offer.kind {
            OfferKind::InstantDiscount | OfferKind::Combo => {
                let additional = if let Some(amount) = offer.discount_amount {
                    amount
                } else if let Some(percent) = offer.discount_percent {
                    price * percent / 100.0
                } else {
                    continue;
                };
                options.push(PaymentOption {
                    option_name: format!("{} Instant Discount", offer.bank_name),
                    payment_method: format!("{} Card", offer.bank_name),
                    payment_type: PaymentKind::OneTime,
                    final_price: round2(price - additional),
                    discount_from_mrp: base_discount,
                    additional_savings: round2(additional),
                    total_savings: round2(base_discount + additional),
                    savings_percent: savings_pct(base_discount + additional),
                    cashback_amount: None,
                    effective_price: None,
                    cashback_credit_days: None,
                    emi_per_month: None,
                    tenure_months: None,
                    total_amount: None,
                    processing_fee: None,
                    total_interest: None,
                    offer_details: offer.description.clone(),
                });
            }
            OfferKind::Cashback => {
                let cashback = offer.cashback_amount.unwrap_or(0.0);
                options.push(PaymentOption {
                    option_name: format!("{} Cashback", offer.bank_name),
                    payment_method: format!("{} Card", offer.bank_name),
                    payment_type: PaymentKind::Cashback,
                    final_price: price,
                    discount_from_mrp: base_discount,
                    additional_savings: round2(cashback),
                    total_savings: round2(base_discount + cashback),
                    savings_percent: savings_pct(base_discount + cashback),
                    cashback_amount: Some(round2(cashback)),
                    effective_price: Some(round2(price - cashback)),
                    cashback_credit_days: Some(CASHBACK_CREDIT_DAYS),
                    emi_per_month: None,
                    tenure_months: None,
                    total_amount: None,
                    processing_fee: None,
                    total_interest: None,
                    offer_details: offer.description.clone(),
                });
            }
            OfferKind::NoCostEmi | OfferKind::RegularEmi => {
                let Some(months) = offer.emi_tenure_months else {
                    continue;
                };
                let no_cost = offer.kind == OfferKind::NoCostEmi || offer.is_no_cost_emi;
                let (emi_amount, total, interest) = if no_cost {
                    (round2(price / months as f64), round2(price), 0.0)
                } else {
                    let plan = emi::regular_plans(price)
                        .into_iter()
                        .find(|p| p.tenure_months == months)
                        .unwrap_or_else(|| {
                            emi::regular_plans(price)
                                .into_iter()
                                .next()
                                .expect("regular tenure table is non-empty")
                        });
                    (plan.emi_per_month, plan.total_amount, plan.total_interest)
                };
                let label = if no_cost { "No Cost EMI" } else { "EMI" };
                options.push(PaymentOption {
                    option_name: format!("{} {label}", offer.bank_name),
                    payment_method: format!("{} Card", offer.bank_name),
                    payment_type: PaymentKind::Emi,
                    final_price: total,
                    discount_from_mrp: base_discount,
                    additional_savings: 0.0,
                    total_savings: round2(base_discount),
                    savings_percent: savings_pct(base_discount),
                    cashback_amount: None,
                    effective_price: None,
                    cashback_credit_days: None,
                    emi_per_month: Some(emi_amount),
                    tenure_months: Some(months),
                    total_amount: Some(total),
                    processing_fee: Some(PROCESSING_FEE),
                    total_interest: Some(interest),
                    offer_details: offer.description.clone(),
                });
            }
        }
    }

    options.sort_by(|a, b| {
        b.total_savings
            .partial_cmp(&a.total_savings)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    options
}

/// Best-in-class selections: max-savings instant discount, max-savings
/// cashback, and lowest-monthly EMI with a no-cost schedule fallback.
fn select_best(
    options: &[PaymentOption],
    no_cost_plans: &[EmiPlan],
) -> (Option<PaymentOption>, Option<PaymentOption>, Option<PaymentOption>) {
    let best_instant = options
        .iter()
        .filter(|o| o.payment_type == PaymentKind::OneTime && o.additional_savings > 0.0)
        .max_by(|a, b| {
            a.total_savings
                .partial_cmp(&b.total_savings)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned();

    let best_cashback = options
        .iter()
        .filter(|o| o.payment_type == PaymentKind::Cashback)
        .max_by(|a, b| {
            a.total_savings
                .partial_cmp(&b.total_savings)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned();

    let best_emi = options
        .iter()
        .filter(|o| o.payment_type == PaymentKind::Emi)
        .min_by(|a, b| {
            a.emi_per_month
                .unwrap_or(f64::INFINITY)
                .partial_cmp(&b.emi_per_month.unwrap_or(f64::INFINITY))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned()
        .or_else(|| no_cost_plans.first().map(option_from_no_cost_plan));

    (best_instant, best_cashback, best_emi)
}

fn option_from_no_cost_plan(plan: &EmiPlan) -> PaymentOption {
    PaymentOption {
        option_name: "No Cost EMI (Best for Budget)".to_string(),
        payment_method: "Any EMI-enabled Card".to_string(),
        payment_type: PaymentKind::Emi,
        final_price: plan.total_amount,
        discount_from_mrp: 0.0,
        additional_savings: 0.0,
        total_savings: 0.0,
        savings_percent: 0.0,
        cashback_amount: None,
        effective_price: None,
        cashback_credit_days: None,
        emi_per_month: Some(plan.emi_per_month),
        tenure_months: Some(plan.tenure_months),
        total_amount: Some(plan.total_amount),
        processing_fee: Some(plan.processing_fee),
        total_interest: Some(plan.total_interest),
        offer_details: None,
    }
}

fn pick_for_preference(
    options: &[PaymentOption],
    no_cost_plans: &[EmiPlan],
    preference: PaymentPreference,
) -> Option<PaymentOption> {
    match preference {
        PaymentPreference::InstantSavings => options
            .iter()
            .filter(|o| o.payment_type == PaymentKind::OneTime)
            .max_by(|a, b| {
                a.total_savings
                    .partial_cmp(&b.total_savings)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned(),
        PaymentPreference::Cashback => options
            .iter()
            .filter(|o| o.payment_type == PaymentKind::Cashback)
            .max_by(|a, b| {
                a.total_savings
                    .partial_cmp(&b.total_savings)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned(),
        PaymentPreference::Emi => options
            .iter()
            .filter(|o| o.payment_type == PaymentKind::Emi)
            .min_by(|a, b| {
                a.emi_per_month
                    .unwrap_or(f64::INFINITY)
                    .partial_cmp(&b.emi_per_month.unwrap_or(f64::INFINITY))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
            .or_else(|| no_cost_plans.first().map(option_from_no_cost_plan)),
        PaymentPreference::Balanced => options
            .iter()
            .max_by(|a, b| {
                a.total_savings
                    .partial_cmp(&b.total_savings)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned(),
    }
}

fn explain_recommendation(
    option: Option<&PaymentOption>,
    preference: PaymentPreference,
) -> String {
    let Some(option) = option else {
        return "No specific recommendation available. Choose based on your preference.".to_string();
    };

    let mut reasons = Vec::new();
    match preference {
        PaymentPreference::InstantSavings => {
            reasons.push("Maximizes immediate savings".to_string());
            if option.additional_savings > 0.0 {
                reasons.push(format!(
                    "Save {} instantly",
                    format_rupees(option.additional_savings)
                ));
            }
        }
        PaymentPreference::Emi => {
            reasons.push("Spreads payment over time".to_string());
            if let Some(emi) = option.emi_per_month {
                reasons.push(format!("Affordable EMI of {}/month", format_rupees(emi)));
            }
        }
        PaymentPreference::Cashback => {
            if let Some(cashback) = option.cashback_amount {
                reasons.push(format!(
                    "Earn {} back (credited in {} days)",
                    format_rupees(cashback),
                    CASHBACK_CREDIT_DAYS
                ));
            }
        }
        PaymentPreference::Balanced => {
            if option.total_savings > 0.0 {
                reasons.push(format!(
                    "Best overall value with {} total savings",
                    format_rupees(option.total_savings)
                ));
            }
        }
    }

    if option.payment_type == PaymentKind::Emi && option.total_interest == Some(0.0) {
        reasons.push("Zero interest (No Cost EMI)".to_string());
    }
    if reasons.is_empty() {
        reasons.push("Best available option".to_string());
    }

    format!("{}.", reasons.join(". "))
}

fn build_narrative_prompt(
    product: &Product,
    best_instant: Option<&PaymentOption>,
    best_cashback: Option<&PaymentOption>,
    best_emi: Option<&PaymentOption>,
    preference: PaymentPreference,
) -> String {
    let mut prompt = format!(
        "You are a buy-plan optimizer helping users make smart purchase decisions.\n\n\
         Product: {}\nPrice: {}\nMRP: {}\n\nAvailable Payment Options:\n",
        product.name,
        format_rupees(product.price),
        format_rupees(product.mrp_or_price()),
    );

    if let Some(opt) = best_instant {
        prompt.push_str(&format!(
            "\n1. INSTANT SAVINGS: {}\n   Final Price: {}\n   You Save: {}\n",
            opt.option_name,
            format_rupees(opt.final_price),
            format_rupees(opt.additional_savings),
        ));
    }
    if let Some(opt) = best_cashback {
        prompt.push_str(&format!(
            "\n2. CASHBACK: {}\n   Cashback: {}\n   Effective Price: {}\n",
            opt.option_name,
            format_rupees(opt.cashback_amount.unwrap_or(0.0)),
            format_rupees(opt.effective_price.unwrap_or(opt.final_price)),
        ));
    }
    if let Some(opt) = best_emi {
        prompt.push_str(&format!(
            "\n3. EMI: {}\n   EMI: {}/month x {} months\n",
            opt.option_name,
            format_rupees(opt.emi_per_month.unwrap_or(0.0)),
            opt.tenure_months.unwrap_or(0),
        ));
    }

    prompt.push_str(&format!("\nUser Preference: {}\n", preference.as_str()));
    prompt.push_str(
        "\nProvide a recommendation in 2-3 sentences. Consider:\n\
         - Maximum savings\n\
         - Payment convenience\n\
         - User preference if specified\n\
         - Time value of money (cashback takes 90 days)\n\n\
         Keep it conversational and helpful.",
    );
    prompt
}

fn build_summary(product: &Product, recommendations: &BuyPlanRecommendations) -> String {
    let mut lines = Vec::new();
    lines.push("PURCHASE PLAN SUMMARY".to_string());
    lines.push(format!("Product: {}", product.name));
    lines.push(format!("Price: {}", format_rupees(product.price)));

    if let Some(opt) = &recommendations.best_instant_savings {
        lines.push(String::new());
        lines.push("Best Instant Savings:".to_string());
        lines.push(format!("  {}", opt.option_name));
        lines.push(format!("  Final Price: {}", format_rupees(opt.final_price)));
        lines.push(format!("  You Save: {}", format_rupees(opt.additional_savings)));
    }
    if let Some(opt) = &recommendations.best_cashback {
        lines.push(String::new());
        lines.push("Best Cashback:".to_string());
        lines.push(format!("  {}", opt.option_name));
        lines.push(format!(
            "  Cashback: {} (credited in {} days)",
            format_rupees(opt.cashback_amount.unwrap_or(0.0)),
            CASHBACK_CREDIT_DAYS
        ));
    }
    if let Some(opt) = &recommendations.best_emi {
        lines.push(String::new());
        lines.push("Best EMI Option:".to_string());
        lines.push(format!("  {}", opt.option_name));
        lines.push(format!(
            "  {}/month x {} months",
            format_rupees(opt.emi_per_month.unwrap_or(0.0)),
            opt.tenure_months.unwrap_or(0)
        ));
    }

    lines.push(String::new());
    lines.push("RECOMMENDATION:".to_string());
    lines.push(format!("  {}", recommendations.ai_recommendation));
    lines.join("\n")
}
