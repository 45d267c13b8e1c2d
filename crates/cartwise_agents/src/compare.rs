//! Comparison agent: differences, category winners, and styled output

use cartwise_catalog::CatalogStore;
use cartwise_core::{format_rupees, round2, AgentResult, Product};
use cartwise_runtime::cache::{AgentCache, COMPARISON_CACHE_TTL_SECS};
use cartwise_runtime::llm::{GenerateOptions, GenerateRequest, LlmClient};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const MIN_PRODUCTS: usize = 2;
pub const MAX_PRODUCTS: usize = 5;
const LLM_TIMEOUT: Duration = Duration::from_secs(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStyle {
    Table,
    Battle,
    Winner,
    Detailed,
    UseCase,
}

impl ComparisonStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonStyle::Table => "table",
            ComparisonStyle::Battle => "battle",
            ComparisonStyle::Winner => "winner",
            ComparisonStyle::Detailed => "detailed",
            ComparisonStyle::UseCase => "use_case",
        }
    }

    /// Lenient parse; unknown styles default to detailed prose.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "table" => ComparisonStyle::Table,
            "battle" => ComparisonStyle::Battle,
            "winner" => ComparisonStyle::Winner,
            "use_case" => ComparisonStyle::UseCase,
            _ => ComparisonStyle::Detailed,
        }
    }
}

/// Product view used inside comparisons
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparedProduct {
    pub id: i64,
    pub name: String,
    pub brand: String,
    pub model: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub price: f64,
    pub mrp: Option<f64>,
    pub discount_pct: f64,
    pub rating: f64,
    pub review_count: i64,
    pub in_stock: bool,
    pub specifications: BTreeMap<String, String>,
    pub features: Vec<String>,
}

impl From<&Product> for ComparedProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            brand: product.brand.clone(),
            model: product.model.clone(),
            category: product.category.clone(),
            subcategory: product.subcategory.clone(),
            price: product.price,
            mrp: product.mrp,
            discount_pct: product.discount_percent(),
            rating: product.rating,
            review_count: product.review_count,
            in_stock: product.in_stock,
            specifications: product.specifications.clone(),
            features: product.features.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSpread {
    pub cheapest: f64,
    pub most_expensive: f64,
    pub price_difference: f64,
    pub cheapest_product: String,
    pub expensive_product: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSpread {
    pub highest_rated: f64,
    pub lowest_rated: f64,
    pub best_product: String,
    pub worst_product: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountSpread {
    pub best_discount: f64,
    pub worst_discount: f64,
    pub best_deal_product: String,
}

/// Key differences across the compared set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Differences {
    pub price_analysis: PriceSpread,
    pub rating_analysis: RatingSpread,
    pub discount_analysis: DiscountSpread,
    /// Spec key -> product name -> rendered value over the union of spec keys
    pub specification_comparison: BTreeMap<String, BTreeMap<String, String>>,
    pub product_count: usize,
}

/// Winner of one fixed category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Winner {
    pub product: String,
    pub value: String,
    pub reason: String,
}

/// Winners across the five fixed categories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Winners {
    pub best_price: Winner,
    pub best_value: Winner,
    pub best_rating: Winner,
    pub most_popular: Winner,
    pub best_overall: Winner,
}

/// One cell of the frontend comparison table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCell {
    pub value: String,
    pub raw: serde_json::Value,
    pub style: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumn {
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRow {
    pub attribute: String,
    pub attribute_key: String,
    /// Column key (`product_1`, `product_2`, ...) -> cell
    pub cells: BTreeMap<String, TableCell>,
}

/// Structured table ready for any frontend grid component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<TableRow>,
    pub total_products: usize,
    pub attributes_compared: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleRound {
    pub name: String,
    pub first_value: String,
    pub second_value: String,
    pub winner: String,
    pub reason: String,
}

/// Round-by-round duel between exactly two products
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleReport {
    pub rounds: Vec<BattleRound>,
    /// None on a tie
    pub overall_winner: Option<String>,
    pub verdict: String,
}

/// Style-specific structured output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StyledOutput {
    Table(ComparisonTable),
    Battle(BattleReport),
}

/// Complete comparison result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub products: Vec<ComparedProduct>,
    pub differences: Differences,
    pub winners: Winners,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<StyledOutput>,
    pub ai_analysis: String,
    pub style: ComparisonStyle,
}

pub struct Comparator {
    llm: Arc<dyn LlmClient>,
    catalog: Arc<dyn CatalogStore>,
    cache: AgentCache<ComparisonReport>,
}

impl Comparator {
    pub fn new(llm: Arc<dyn LlmClient>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            llm,
            catalog,
            cache: AgentCache::with_ttl_secs(COMPARISON_CACHE_TTL_SECS),
        }
    }

    /// Compare 2-5 products. The cache key sorts the ids so the result is
    /// invariant under permutation of the input list.
    pub async fn compare(
        &self,
        product_ids: &[i64],
        style: ComparisonStyle,
    ) -> AgentResult<ComparisonReport> {
        if product_ids.len() < MIN_PRODUCTS {
            return AgentResult::Failed("Need at least 2 products to compare".to_string());
        }
        if product_ids.len() > MAX_PRODUCTS {
            return AgentResult::Failed("Maximum 5 products can be compared at once".to_string());
        }

        let mut sorted_ids: Vec<i64> = product_ids.to_vec();
        sorted_ids.sort_unstable();
        sorted_ids.dedup();
        let cache_key = format!(
            "comparison_{}_{}",
            sorted_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join("_"),
            style.as_str()
        );
        if let Some(cached) = self.cache.get(&cache_key).await {
            info!("Returning cached comparison for products {sorted_ids:?}");
            return AgentResult::Ok((*cached).clone());
        }

        let fetched = match self.catalog.products(&sorted_ids).await {
            Ok(products) => products,
            Err(e) => return AgentResult::Failed(e.to_string()),
        };
        if fetched.len() < sorted_ids.len() {
            return AgentResult::Failed(format!(
                "Only found {} out of {} products",
                fetched.len(),
                sorted_ids.len()
            ));
        }

        // Stable order regardless of how the catalog returned them
        let mut products: Vec<ComparedProduct> = fetched.iter().map(ComparedProduct::from).collect();
        products.sort_by_key(|p| p.id);

        let differences = calculate_differences(&products);
        let winners = determine_winners(&products);

        let output = match style {
            ComparisonStyle::Table => Some(StyledOutput::Table(build_table(&products))),
            ComparisonStyle::Battle if products.len() == 2 => {
                Some(StyledOutput::Battle(build_battle(&products[0], &products[1])))
            }
            _ => None,
        };

        let ai_analysis = self
            .generate_analysis(&products, &differences, &winners, style)
            .await;

        let report = ComparisonReport {
            products,
            differences,
            winners,
            output,
            ai_analysis,
            style,
        };

        self.cache.insert(cache_key, report.clone()).await;
        AgentResult::Ok(report)
    }

    async fn generate_analysis(
        &self,
        products: &[ComparedProduct],
        differences: &Differences,
        winners: &Winners,
        style: ComparisonStyle,
    ) -> String {
        let prompt = build_analysis_prompt(products, differences, winners, style);
        let request = GenerateRequest::new(prompt).with_options(
            GenerateOptions::default()
                .with_temperature(0.3)
                .with_max_tokens(120),
        );

        match tokio::time::timeout(LLM_TIMEOUT, self.llm.generate(request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Comparison LLM failed, using rule-based analysis: {e}");
                fallback_analysis(products, winners)
            }
            Err(_) => {
                warn!("Comparison LLM timed out, using rule-based analysis");
                fallback_analysis(products, winners)
            }
        }
    }
}

fn max_by_f64<'a>(
    products: &'a [ComparedProduct],
    key: impl Fn(&ComparedProduct) -> f64,
) -> &'a ComparedProduct {
    products
        .iter()
        .max_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal))
        .expect("comparison set is never empty")
}

fn min_by_f64<'a>(
    products: &'a [ComparedProduct],
    key: impl Fn(&ComparedProduct) -> f64,
) -> &'a ComparedProduct {
    products
        .iter()
        .min_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal))
        .expect("comparison set is never empty")
}

fn value_score(product: &ComparedProduct) -> f64 {
    product.rating * product.review_count as f64 / (product.price / 1000.0)
}

pub fn calculate_differences(products: &[ComparedProduct]) -> Differences {
    let cheapest = min_by_f64(products, |p| p.price);
    let priciest = max_by_f64(products, |p| p.price);
    let best_rated = max_by_f64(products, |p| p.rating);
    let worst_rated = min_by_f64(products, |p| p.rating);
    let best_deal = max_by_f64(products, |p| p.discount_pct);
    let worst_deal = min_by_f64(products, |p| p.discount_pct);

    let mut all_spec_keys: BTreeSet<String> = BTreeSet::new();
    for product in products {
        all_spec_keys.extend(product.specifications.keys().cloned());
    }

    let specification_comparison = all_spec_keys
        .into_iter()
        .map(|key| {
            let per_product = products
                .iter()
                .map(|p| {
                    let value = p
                        .specifications
                        .get(&key)
                        .cloned()
                        .unwrap_or_else(|| "N/A".to_string());
                    (p.name.clone(), value)
                })
                .collect();
            (key, per_product)
        })
        .collect();

    Differences {
        price_analysis: PriceSpread {
            cheapest: cheapest.price,
            most_expensive: priciest.price,
            price_difference: round2(priciest.price - cheapest.price),
            cheapest_product: cheapest.name.clone(),
            expensive_product: priciest.name.clone(),
        },
        rating_analysis: RatingSpread {
            highest_rated: best_rated.rating,
            lowest_rated: worst_rated.rating,
            best_product: best_rated.name.clone(),
            worst_product: worst_rated.name.clone(),
        },
        discount_analysis: DiscountSpread {
            best_discount: best_deal.discount_pct,
            worst_discount: worst_deal.discount_pct,
            best_deal_product: best_deal.name.clone(),
        },
        specification_comparison,
        product_count: products.len(),
    }
}

pub fn determine_winners(products: &[ComparedProduct]) -> Winners {
    let cheapest = min_by_f64(products, |p| p.price);
    let best_value = max_by_f64(products, |p| p.discount_pct);
    let highest_rated = max_by_f64(products, |p| p.rating);
    let most_reviewed = products
        .iter()
        .max_by_key(|p| p.review_count)
        .expect("comparison set is never empty");
    let best_overall = max_by_f64(products, value_score);

    Winners {
        best_price: Winner {
            product: cheapest.name.clone(),
            value: format_rupees(cheapest.price),
            reason: "Lowest price".to_string(),
        },
        best_value: Winner {
            product: best_value.name.clone(),
            value: format!("{}% OFF", best_value.discount_pct),
            reason: format!(
                "Save {}",
                format_rupees(best_value.mrp.map(|m| m - best_value.price).unwrap_or(0.0))
            ),
        },
        best_rating: Winner {
            product: highest_rated.name.clone(),
            value: format!("{}/5", highest_rated.rating),
            reason: format!("{} reviews", highest_rated.review_count),
        },
        most_popular: Winner {
            product: most_reviewed.name.clone(),
            value: format!("{} reviews", most_reviewed.review_count),
            reason: "Most user feedback".to_string(),
        },
        best_overall: Winner {
            product: best_overall.name.clone(),
            value: format!("Score: {:.2}", value_score(best_overall)),
            reason: "Best combination of price, rating, and popularity".to_string(),
        },
    }
}

const TABLE_ATTRIBUTES: &[(&str, &str)] = &[
    ("price", "Price"),
    ("rating", "Rating"),
    ("discount_pct", "Discount"),
    ("review_count", "Total Reviews"),
    ("in_stock", "Availability"),
];

pub fn build_table(products: &[ComparedProduct]) -> ComparisonTable {
    let mut columns = vec![TableColumn {
        key: "attribute".to_string(),
        label: "Feature".to_string(),
        product_id: None,
    }];
    for (idx, product) in products.iter().enumerate() {
        columns.push(TableColumn {
            key: format!("product_{}", idx + 1),
            label: product.name.chars().take(30).collect(),
            product_id: Some(product.id),
        });
    }

    let rows = TABLE_ATTRIBUTES
        .iter()
        .map(|(key, label)| {
            let cells = products
                .iter()
                .enumerate()
                .map(|(idx, product)| (format!("product_{}", idx + 1), build_cell(key, product)))
                .collect();
            TableRow {
                attribute: label.to_string(),
                attribute_key: key.to_string(),
                cells,
            }
        })
        .collect();

    ComparisonTable {
        columns,
        rows,
        total_products: products.len(),
        attributes_compared: TABLE_ATTRIBUTES.len(),
    }
}

fn build_cell(attribute: &str, product: &ComparedProduct) -> TableCell {
    match attribute {
        "price" => TableCell {
            value: format_rupees(product.price),
            raw: serde_json::json!(product.price),
            style: "currency".to_string(),
            color: None,
        },
        "rating" => TableCell {
            value: format!("{}/5", product.rating),
            raw: serde_json::json!(product.rating),
            style: "rating".to_string(),
            color: Some(
                if product.rating >= 4.0 {
                    "green"
                } else if product.rating >= 3.0 {
                    "orange"
                } else {
                    "red"
                }
                .to_string(),
            ),
        },
        "discount_pct" => TableCell {
            value: if product.discount_pct > 0.0 {
                format!("{}% OFF", product.discount_pct)
            } else {
                "No discount".to_string()
            },
            raw: serde_json::json!(product.discount_pct),
            style: "badge".to_string(),
            color: Some(
                if product.discount_pct >= 20.0 {
                    "green"
                } else if product.discount_pct > 0.0 {
                    "blue"
                } else {
                    "gray"
                }
                .to_string(),
            ),
        },
        "in_stock" => TableCell {
            value: if product.in_stock { "In Stock" } else { "Out of Stock" }.to_string(),
            raw: serde_json::json!(product.in_stock),
            style: "status".to_string(),
            color: Some(if product.in_stock { "green" } else { "red" }.to_string()),
        },
        "review_count" => TableCell {
            value: product.review_count.to_string(),
            raw: serde_json::json!(product.review_count),
            style: "text".to_string(),
            color: None,
        },
        _ => TableCell {
            value: String::new(),
            raw: serde_json::Value::Null,
            style: "text".to_string(),
            color: None,
        },
    }
}

pub fn build_battle(first: &ComparedProduct, second: &ComparedProduct) -> BattleReport {
    let price_winner = if first.price < second.price { first } else { second };
    let rating_winner = if first.rating > second.rating { first } else { second };
    let discount_winner = if first.discount_pct > second.discount_pct {
        first
    } else {
        second
    };

    let rounds = vec![
        BattleRound {
            name: "Price".to_string(),
            first_value: format_rupees(first.price),
            second_value: format_rupees(second.price),
            winner: price_winner.name.clone(),
            reason: format!("{} cheaper", format_rupees((first.price - second.price).abs())),
        },
        BattleRound {
            name: "Rating".to_string(),
            first_value: format!("{}/5 ({} reviews)", first.rating, first.review_count),
            second_value: format!("{}/5 ({} reviews)", second.rating, second.review_count),
            winner: rating_winner.name.clone(),
            reason: format!("{:.1} stars better", (first.rating - second.rating).abs()),
        },
        BattleRound {
            name: "Discount".to_string(),
            first_value: format!("{}% OFF", first.discount_pct),
            second_value: format!("{}% OFF", second.discount_pct),
            winner: discount_winner.name.clone(),
            reason: format!(
                "{:.1}% more savings",
                (first.discount_pct - second.discount_pct).abs()
            ),
        },
    ];

    let first_wins = rounds.iter().filter(|r| r.winner == first.name).count();
    let second_wins = rounds.len() - first_wins;

    let (overall_winner, verdict) = if first_wins > second_wins {
        (
            Some(first.name.clone()),
            format!("Winner: {} ({} rounds)", first.name, first_wins),
        )
    } else if second_wins > first_wins {
        (
            Some(second.name.clone()),
            format!("Winner: {} ({} rounds)", second.name, second_wins),
        )
    } else {
        (None, "It's a tie! Both products are equally matched".to_string())
    };

    BattleReport {
        rounds,
        overall_winner,
        verdict,
    }
}

fn build_analysis_prompt(
    products: &[ComparedProduct],
    differences: &Differences,
    winners: &Winners,
    style: ComparisonStyle,
) -> String {
    let mut lines = String::new();
    for (i, product) in products.iter().enumerate() {
        let mrp = product.mrp.unwrap_or(product.price);
        lines.push_str(&format!(
            "Product {}: {}\n- Brand: {}\n- Price: {} (MRP: {})\n- Discount: {}% OFF\n\
             - Rating: {}/5 ({} reviews)\n- In Stock: {}\n",
            i + 1,
            product.name,
            product.brand,
            format_rupees(product.price),
            format_rupees(mrp),
            product.discount_pct,
            product.rating,
            product.review_count,
            if product.in_stock { "Yes" } else { "No" },
        ));
    }

    format!(
        "Compare {} products:\n\n{}\n\
         Price: {}-{}\n\
         Ratings: {}-{}/5\n\
         Best Deal: {}% off {}\n\n\
         Winners:\n\
         - Price: {}\n\
         - Rating: {}\n\
         - Value: {}\n\
         - Overall: {}\n\n\
         Provide:\n\
         1. Key differences\n\
         2. Category winners\n\
         3. Recommendation\n\
         4. Best for scenarios\n\n\
         {} style. 200 words max.",
        products.len(),
        lines,
        format_rupees(differences.price_analysis.cheapest),
        format_rupees(differences.price_analysis.most_expensive),
        differences.rating_analysis.lowest_rated,
        differences.rating_analysis.highest_rated,
        differences.discount_analysis.best_discount,
        differences.discount_analysis.best_deal_product,
        winners.best_price.product,
        winners.best_rating.product,
        winners.best_value.product,
        winners.best_overall.product,
        style.as_str().to_uppercase(),
    )
}

/// Rule-based prose from the already-computed winners.
fn fallback_analysis(products: &[ComparedProduct], winners: &Winners) -> String {
    let cheapest = min_by_f64(products, |p| p.price);
    let priciest = max_by_f64(products, |p| p.price);
    let best_rated = max_by_f64(products, |p| p.rating);

    let mut out = Vec::new();
    out.push("COMPARISON ANALYSIS".to_string());
    out.push(String::new());
    out.push(format!("PRICE WINNER: {}", cheapest.name));
    out.push(format!("   {} (cheapest)", format_rupees(cheapest.price)));
    if products.len() > 1 {
        out.push(format!(
            "   Save {} vs most expensive",
            format_rupees(priciest.price - cheapest.price)
        ));
    }
    out.push(String::new());
    out.push(format!("RATING WINNER: {}", best_rated.name));
    out.push(format!(
        "   {}/5 ({} reviews)",
        best_rated.rating, best_rated.review_count
    ));
    out.push(String::new());
    out.push(format!("BEST OVERALL: {}", winners.best_overall.product));
    out.push(format!("   {}", winners.best_overall.reason));
    out.push(String::new());
    out.push("RECOMMENDATIONS:".to_string());
    out.push(format!("   - For budget: {}", cheapest.name));
    out.push(format!("   - For quality: {}", best_rated.name));
    out.push(format!("   - For value: {}", winners.best_overall.product));
    out.join("\n")
}
