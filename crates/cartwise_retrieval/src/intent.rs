//! LLM-backed extraction of structured search intent
//!
//! The parser never raises: any LLM failure, oversized response, or
//! unparseable JSON falls back to a whitespace-tokenized keyword intent
//! within the 2 second budget.

use cartwise_core::SearchIntent;
use cartwise_runtime::llm::{GenerateOptions, GenerateRequest, LlmClient};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const QUERY_MAX_CHARS: usize = 512;
const RESPONSE_MAX_BYTES: usize = 4096;
const PARSE_TIMEOUT: Duration = Duration::from_secs(2);

pub struct IntentParser {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl IntentParser {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            timeout: PARSE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parse a raw query into a structured intent. Always returns a usable
    /// intent; intent parsing is on the critical path and must not block.
    pub async fn parse(&self, query: &str) -> SearchIntent {
        let query: String = query.chars().take(QUERY_MAX_CHARS).collect();

        let request = GenerateRequest::new(build_prompt(&query)).with_options(
            GenerateOptions::default()
                .with_temperature(0.1)
                .with_max_tokens(200)
                .json(),
        );

        let response = match tokio::time::timeout(self.timeout, self.llm.generate(request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Intent extraction failed, using keyword fallback: {e}");
                return SearchIntent::fallback(&query);
            }
            Err(_) => {
                warn!("Intent extraction timed out, using keyword fallback");
                return SearchIntent::fallback(&query);
            }
        };

        if response.len() > RESPONSE_MAX_BYTES {
            warn!("Intent response over size cap, using keyword fallback");
            return SearchIntent::fallback(&query);
        }

        match parse_response(&query, &response) {
            Some(intent) => intent,
            None => {
                warn!("Intent response was not usable JSON, using keyword fallback");
                SearchIntent::fallback(&query)
            }
        }
    }
}

fn build_prompt(query: &str) -> String {
    format!(
        r#"Analyze this product search query and extract structured information.

Query: "{query}"

Extract the following information in JSON format:
{{
    "category": "product category if clear",
    "brand": "brand name if mentioned",
    "keywords": ["list", "of", "important", "keywords"],
    "price_range": [min_price_number_only, max_price_number_only] or null,
    "features": ["specific", "features", "mentioned"],
    "intent": "brief description of what the user wants"
}}

Examples:
- "best gaming laptop under 80000" -> {{"category": "Laptops", "keywords": ["gaming"], "price_range": [null, 80000]}}
- "Samsung phone with good camera" -> {{"category": "Smartphones", "brand": "Samsung", "keywords": ["camera"]}}
- "wireless headphones" -> {{"category": "Headphones", "keywords": ["wireless"]}}

Return ONLY valid JSON, no other text."#
    )
}

/// Lenient parse of the model output. Accepts fenced JSON, tolerates missing
/// fields, and accepts `price_range` as `[min, max]` (either end nullable) or
/// a bare number treated as a maximum.
fn parse_response(query: &str, text: &str) -> Option<SearchIntent> {
    let body = strip_code_fence(text);
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    let mut intent = SearchIntent {
        category: string_field(object.get("category")),
        brand: string_field(object.get("brand")),
        keywords: string_list(object.get("keywords")),
        features: string_list(object.get("features")),
        summary: string_field(object.get("intent")),
        ..SearchIntent::default()
    };

    match object.get("price_range") {
        Some(Value::Array(range)) if range.len() == 2 => {
            intent.min_price = range[0].as_f64();
            intent.max_price = range[1].as_f64();
        }
        Some(Value::Number(n)) => {
            intent.max_price = n.as_f64();
        }
        _ => {}
    }

    if intent.keywords.is_empty() {
        intent.keywords = query.split_whitespace().map(|w| w.to_lowercase()).collect();
    }

    Some(intent)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartwise_runtime::llm::MockLlmClient;

    #[tokio::test]
    async fn test_parse_well_formed_response() {
        let llm = Arc::new(MockLlmClient::new(
            r#"{"category": "Headphones", "brand": null, "keywords": ["wireless"],
                "price_range": [null, 5000], "features": ["noise cancellation"],
                "intent": "affordable wireless headphones"}"#,
        ));
        let parser = IntentParser::new(llm);
        let intent = parser.parse("wireless headphones under 5000").await;

        assert_eq!(intent.category.as_deref(), Some("Headphones"));
        assert_eq!(intent.keywords, vec!["wireless"]);
        assert_eq!(intent.min_price, None);
        assert_eq!(intent.max_price, Some(5000.0));
        assert_eq!(intent.features, vec!["noise cancellation"]);
    }

    #[tokio::test]
    async fn test_parse_fenced_response() {
        let llm = Arc::new(MockLlmClient::new(
            "```json\n{\"category\": \"Laptops\", \"keywords\": [\"gaming\"]}\n```",
        ));
        let parser = IntentParser::new(llm);
        let intent = parser.parse("gaming laptop").await;
        assert_eq!(intent.category.as_deref(), Some("Laptops"));
    }

    #[tokio::test]
    async fn test_scalar_price_range_is_max() {
        let llm = Arc::new(MockLlmClient::new(
            r#"{"keywords": ["phone"], "price_range": 20000}"#,
        ));
        let parser = IntentParser::new(llm);
        let intent = parser.parse("phone under 20000").await;
        assert_eq!(intent.max_price, Some(20000.0));
        assert_eq!(intent.min_price, None);
    }

    #[tokio::test]
    async fn test_non_json_falls_back() {
        let llm = Arc::new(MockLlmClient::new("I think you want headphones"));
        let parser = IntentParser::new(llm);
        let intent = parser.parse("Wireless Headphones").await;
        assert_eq!(intent.keywords, vec!["wireless", "headphones"]);
        assert!(intent.category.is_none());
    }

    #[tokio::test]
    async fn test_llm_error_falls_back() {
        let llm = Arc::new(MockLlmClient::failing());
        let parser = IntentParser::new(llm);
        let intent = parser.parse("gaming laptop").await;
        assert_eq!(intent.keywords, vec!["gaming", "laptop"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_llm_falls_back() {
        let llm = Arc::new(MockLlmClient::new("{}").with_delay(Duration::from_secs(10)));
        let parser = IntentParser::new(llm);
        let intent = parser.parse("gaming laptop").await;
        assert_eq!(intent.keywords, vec!["gaming", "laptop"]);
    }

    #[tokio::test]
    async fn test_oversized_response_falls_back() {
        let llm = Arc::new(MockLlmClient::new(format!(
            "{{\"keywords\": [\"{}\"]}}",
            "x".repeat(8192)
        )));
        let parser = IntentParser::new(llm);
        let intent = parser.parse("gaming laptop").await;
        assert_eq!(intent.keywords, vec!["gaming", "laptop"]);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }
}
