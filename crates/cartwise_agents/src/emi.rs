//! EMI schedules: standard annuity plans and no-cost plans

use cartwise_core::round2;
use serde::{Deserialize, Serialize};

/// Minimum purchase amount for EMI eligibility
pub const EMI_MIN_PRICE: f64 = 5000.0;
/// Flat processing fee charged on every EMI plan
pub const PROCESSING_FEE: f64 = 199.0;

pub const REGULAR_TENURES: [u32; 6] = [3, 6, 9, 12, 18, 24];
pub const NO_COST_TENURES: [u32; 4] = [3, 6, 9, 12];

/// Annual interest rate for a regular-EMI tenure
pub fn annual_rate(months: u32) -> f64 {
    match months {
        3 => 12.0,
        6 => 13.0,
        9 => 14.0,
        12 => 15.0,
        18 => 16.0,
        24 => 17.0,
        _ => 15.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmiPlanType {
    RegularEmi,
    NoCostEmi,
}

/// One installment schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmiPlan {
    pub tenure_months: u32,
    pub emi_per_month: f64,
    /// Sum of all installments
    pub total_amount: f64,
    pub total_interest: f64,
    pub interest_rate_annual: f64,
    pub processing_fee: f64,
    pub plan_type: EmiPlanType,
    /// Last installment of a no-cost plan; absorbs rounding so the schedule
    /// sums to the sticker price exactly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_installment: Option<f64>,
    /// Total amount plus processing fee
    pub total_payable: f64,
}

/// Standard annuity schedules across the fixed tenure set.
/// `EMI = P*r*(1+r)^n / ((1+r)^n - 1)` with r the monthly rate.
pub fn regular_plans(price: f64) -> Vec<EmiPlan> {
    REGULAR_TENURES
        .iter()
        .map(|&months| {
            let rate = annual_rate(months);
            let monthly_rate = rate / 12.0 / 100.0;
            let n = months as f64;
            let factor = (1.0 + monthly_rate).powf(n);
            let emi = round2(price * monthly_rate * factor / (factor - 1.0));
            let total = round2(emi * n);
            EmiPlan {
                tenure_months: months,
                emi_per_month: emi,
                total_amount: total,
                total_interest: round2(total - price),
                interest_rate_annual: rate,
                processing_fee: PROCESSING_FEE,
                plan_type: EmiPlanType::RegularEmi,
                final_installment: None,
                total_payable: round2(total + PROCESSING_FEE),
            }
        })
        .collect()
}

/// No-cost schedules: the merchant absorbs financing, so the installments sum
/// to the price exactly. The monthly amount is floored to the paisa and the
/// final installment picks up the remainder.
pub fn no_cost_plans(price: f64) -> Vec<EmiPlan> {
    NO_COST_TENURES
        .iter()
        .map(|&months| {
            let n = months as f64;
            let emi = (price * 100.0 / n).floor() / 100.0;
            let final_installment = round2(price - emi * (n - 1.0));
            EmiPlan {
                tenure_months: months,
                emi_per_month: emi,
                total_amount: round2(price),
                total_interest: 0.0,
                interest_rate_annual: 0.0,
                processing_fee: PROCESSING_FEE,
                plan_type: EmiPlanType::NoCostEmi,
                final_installment: Some(final_installment),
                total_payable: round2(price + PROCESSING_FEE),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmiEligibility {
    pub eligible_for_emi: bool,
    pub product_price: f64,
    pub minimum_amount_required: f64,
    pub message: String,
}

pub fn eligibility(price: f64) -> EmiEligibility {
    let eligible = price >= EMI_MIN_PRICE;
    EmiEligibility {
        eligible_for_emi: eligible,
        product_price: price,
        minimum_amount_required: EMI_MIN_PRICE,
        message: if eligible {
            "Eligible for EMI".to_string()
        } else {
            format!(
                "EMI available for purchases above {}",
                cartwise_core::format_rupees(EMI_MIN_PRICE)
            )
        },
    }
}
