//! Per-message predicates shared by the listing aggregations.

use wadash_core::SentimentFilter;

use crate::record::MessageRecord;
use crate::scan::GroupSource;
use crate::AnalyticsError;

/// Field a free-text search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchField {
    #[default]
    MessageContent,
    SenderName,
    SenderPhone,
    GroupName,
    Assembly,
    All,
}

impl SearchField {
    /// Unknown names fall back to message content.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.unwrap_or_default() {
            "senderName" => Self::SenderName,
            "senderPhone" => Self::SenderPhone,
            "groupName" => Self::GroupName,
            "assembly" => Self::Assembly,
            "all" => Self::All,
            _ => Self::MessageContent,
        }
    }
}

/// Lower-cased search term bound to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    term: String,
    field: SearchField,
}

impl SearchQuery {
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] when the term is blank.
    pub fn new(term: Option<&str>, field: SearchField) -> Result<Self, AnalyticsError> {
        let term = term.map(str::trim).unwrap_or_default().to_lowercase();
        if term.is_empty() {
            return Err(AnalyticsError::validation("Search term is required"));
        }
        Ok(Self { term, field })
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn matches(&self, source: &GroupSource, record: &MessageRecord) -> bool {
        let hit = |text: &str| text.to_lowercase().contains(&self.term);
        let phone = record.sender_phone.as_deref().unwrap_or_default();
        match self.field {
            SearchField::MessageContent => hit(&record.content),
            SearchField::SenderName => hit(record.sender_name_or_unknown()),
            SearchField::SenderPhone => hit(phone),
            SearchField::GroupName => hit(&source.group),
            SearchField::Assembly => hit(&source.assembly),
            SearchField::All => {
                hit(&record.content)
                    || hit(record.sender_name_or_unknown())
                    || hit(phone)
                    || hit(&source.group)
                    || hit(&source.assembly)
            }
        }
    }
}

/// Conjunction of the optional label, sentiment and search predicates.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    /// Exact label match; `None` admits every label.
    pub label: Option<String>,
    pub sentiment: SentimentFilter,
    pub search: Option<SearchQuery>,
}

impl MessageFilter {
    /// Builds a label selector where `all` (or nothing) disables it.
    #[must_use]
    pub fn label_selector(raw: Option<&str>) -> Option<String> {
        match raw.map(str::trim) {
            None | Some("" | "all") => None,
            Some(label) => Some(label.to_string()),
        }
    }

    #[must_use]
    pub fn matches(&self, source: &GroupSource, record: &MessageRecord) -> bool {
        self.label.as_ref().is_none_or(|l| *l == record.label)
            && self.sentiment.matches(&record.sentiment)
            && self
                .search
                .as_ref()
                .is_none_or(|q| q.matches(source, record))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;

    fn source() -> GroupSource {
        GroupSource {
            assembly: "North".to_string(),
            date: "2025-01-15".to_string(),
            group: "Ward Seven".to_string(),
            path: PathBuf::from("North/2025-01-15/messages/Ward Seven.json"),
        }
    }

    fn record() -> MessageRecord {
        let value = json!({
            "messageContent": "Road repair STARTED today",
            "sender": {"name": "Ravi Kumar", "phoneNumber": "919800000001"},
            "predicted_sentiment": "Positive",
            "predicted_label": "infrastructure"
        });
        match value {
            serde_json::Value::Object(map) => MessageRecord::from_object(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn blank_search_term_is_rejected() {
        let err = SearchQuery::new(Some("   "), SearchField::All).unwrap_err();
        assert_eq!(err.to_string(), "Search term is required");
    }

    #[test]
    fn content_search_is_case_insensitive() {
        let q = SearchQuery::new(Some(" started "), SearchField::MessageContent).unwrap();
        assert!(q.matches(&source(), &record()));
    }

    #[test]
    fn unknown_field_falls_back_to_content() {
        assert_eq!(SearchField::parse(Some("bogus")), SearchField::MessageContent);
        let q = SearchQuery::new(Some("ravi"), SearchField::parse(Some("bogus"))).unwrap();
        assert!(!q.matches(&source(), &record()));
    }

    #[test]
    fn all_field_searches_group_and_assembly() {
        let q = SearchQuery::new(Some("seven"), SearchField::All).unwrap();
        assert!(q.matches(&source(), &record()));
        let q = SearchQuery::new(Some("north"), SearchField::All).unwrap();
        assert!(q.matches(&source(), &record()));
        let q = SearchQuery::new(Some("9800"), SearchField::SenderPhone).unwrap();
        assert!(q.matches(&source(), &record()));
    }

    #[test]
    fn label_and_sentiment_must_both_match() {
        let filter = MessageFilter {
            label: MessageFilter::label_selector(Some("infrastructure")),
            sentiment: SentimentFilter::parse(Some("positive")),
            search: None,
        };
        assert!(filter.matches(&source(), &record()));

        let filter = MessageFilter {
            label: MessageFilter::label_selector(Some("health")),
            ..MessageFilter::default()
        };
        assert!(!filter.matches(&source(), &record()));
        assert!(MessageFilter::label_selector(Some("all")).is_none());
    }
}
