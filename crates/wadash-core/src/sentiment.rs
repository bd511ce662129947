//! Sentiment labels attached to message records by the upstream classifier.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    /// Exact, case-sensitive match against the classifier's output.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Positive" => Some(Self::Positive),
            "Negative" => Some(Self::Negative),
            "Neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-side sentiment selector. `all` (or nothing) disables filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SentimentFilter {
    #[default]
    All,
    Only(String),
}

impl SentimentFilter {
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::All,
            Some(v) if v.eq_ignore_ascii_case("all") => Self::All,
            Some(v) => Self::Only(v.to_lowercase()),
        }
    }

    /// Case-insensitive comparison against a record's sentiment label.
    #[must_use]
    pub fn matches(&self, label: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => label.to_lowercase() == *wanted,
        }
    }
}

/// Tally keyed by the classifier's capitalised labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    #[serde(rename = "Positive")]
    pub positive: usize,
    #[serde(rename = "Negative")]
    pub negative: usize,
    #[serde(rename = "Neutral")]
    pub neutral: usize,
}

impl SentimentCounts {
    /// Counts `label` if it is one of the three known sentiments; anything else is ignored.
    pub fn record(&mut self, label: &str) {
        if let Some(sentiment) = Sentiment::from_label(label) {
            self.add(sentiment);
        }
    }

    pub fn add(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }

    #[must_use]
    pub fn get(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }

    pub fn merge(&mut self, other: &SentimentCounts) {
        self.positive += other.positive;
        self.negative += other.negative;
        self.neutral += other.neutral;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_all_matches_everything() {
        let filter = SentimentFilter::parse(Some("All"));
        assert_eq!(filter, SentimentFilter::All);
        assert!(filter.matches("Positive"));
        assert!(filter.matches(""));
    }

    #[test]
    fn filter_is_case_insensitive() {
        let filter = SentimentFilter::parse(Some("Positive"));
        assert!(filter.matches("positive"));
        assert!(filter.matches("POSITIVE"));
        assert!(!filter.matches("Negative"));
    }

    #[test]
    fn missing_filter_defaults_to_all() {
        assert_eq!(SentimentFilter::parse(None), SentimentFilter::All);
        assert_eq!(SentimentFilter::parse(Some("  ")), SentimentFilter::All);
    }

    #[test]
    fn counts_ignore_unknown_labels() {
        let mut counts = SentimentCounts::default();
        counts.record("Positive");
        counts.record("positive");
        counts.record("Mixed");
        counts.record("Neutral");
        assert_eq!(counts.positive, 1);
        assert_eq!(counts.neutral, 1);
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn counts_serialize_with_capitalised_keys() {
        let counts = SentimentCounts {
            positive: 3,
            negative: 1,
            neutral: 0,
        };
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"Positive":3,"Negative":1,"Neutral":0}"#);
    }
}
