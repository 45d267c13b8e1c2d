//! Keyword-based theme extraction from review text

use cartwise_core::Review;
use serde::{Deserialize, Serialize};

const POSITIVE_KEYWORDS: &[&str] = &[
    "excellent", "great", "amazing", "good", "best", "love", "perfect", "fantastic", "awesome",
    "quality", "worth", "comfortable", "easy", "fast", "clear", "bright", "beautiful", "sturdy",
    "reliable", "durable", "impressive", "satisfied", "recommend", "happy", "pleased",
    "outstanding", "superb",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "bad", "poor", "terrible", "worst", "hate", "issue", "problem", "broken", "defective",
    "disappointed", "waste", "cheap", "slow", "difficult", "uncomfortable", "useless", "failed",
    "not working", "stopped", "damage", "faulty",
];

const MAX_THEMES_PER_POLARITY: usize = 10;

/// Short phrases capturing what reviewers praise and complain about
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewThemes {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

/// Scan review text for the fixed keyword sets; for each match capture a
/// five-word window around the keyword. Deduplicated, capped at 10 per
/// polarity.
pub fn extract_themes(reviews: &[Review]) -> ReviewThemes {
    let mut positive = Vec::new();
    let mut negative = Vec::new();

    for review in reviews {
        let text = review.text.to_lowercase();
        collect_contexts(&text, POSITIVE_KEYWORDS, &mut positive);
        collect_contexts(&text, NEGATIVE_KEYWORDS, &mut negative);
    }

    dedupe(&mut positive);
    dedupe(&mut negative);
    positive.truncate(MAX_THEMES_PER_POLARITY);
    negative.truncate(MAX_THEMES_PER_POLARITY);

    ReviewThemes { positive, negative }
}

fn collect_contexts(text: &str, keywords: &[&str], out: &mut Vec<String>) {
    let words: Vec<&str> = text.split_whitespace().collect();
    for keyword in keywords {
        if !text.contains(keyword) {
            continue;
        }
        // compound keywords ("not working") anchor on the matching word run
        let parts: Vec<&str> = keyword.split_whitespace().collect();
        for i in 0..words.len() {
            let matched = parts
                .iter()
                .enumerate()
                .all(|(j, part)| words.get(i + j).is_some_and(|w| w.contains(part)));
            if matched {
                let start = i.saturating_sub(2);
                let end = (i + parts.len() + 2).min(words.len());
                out.push(words[start..end].join(" "));
            }
        }
    }
}

fn dedupe(themes: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    themes.retain(|t| seen.insert(t.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn review(text: &str) -> Review {
        Review {
            product_id: 1,
            rating: 4,
            text: text.into(),
            verified_purchase: true,
            helpful_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_window_around_keyword() {
        let themes = extract_themes(&[review("the sound is excellent for this price range")]);
        assert_eq!(themes.positive, vec!["sound is excellent for this"]);
        assert!(themes.negative.is_empty());
    }

    #[test]
    fn test_window_clamps_at_edges() {
        let themes = extract_themes(&[review("excellent product")]);
        assert_eq!(themes.positive, vec!["excellent product"]);
    }

    #[test]
    fn test_compound_keyword_matches_word_run() {
        let themes =
            extract_themes(&[review("the bluetooth is not working at all but otherwise decent")]);
        assert_eq!(themes.negative, vec!["bluetooth is not working at all"]);
        assert!(themes.positive.is_empty());
    }

    #[test]
    fn test_negative_detection_and_dedupe() {
        let reviews = vec![
            review("battery life is terrible after update"),
            review("battery life is terrible after update"),
        ];
        let themes = extract_themes(&reviews);
        assert_eq!(themes.negative, vec!["life is terrible after update"]);
    }

    #[test]
    fn test_caps_at_ten_per_polarity() {
        let reviews: Vec<Review> = (0..30)
            .map(|i| review(&format!("variant {i} is a good buy overall")))
            .collect();
        let themes = extract_themes(&reviews);
        assert!(themes.positive.len() <= 10);
    }
}
