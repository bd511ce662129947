use rust_decimal::Decimal;
use serde::Serialize;
use wadash_core::SentimentCounts;

use super::{percentage, Ordered, SentimentBuckets};
use crate::layout::DataRoot;
use crate::loader::{load_group_file, PayloadPolicy};
use crate::record::UNKNOWN_SENDER;
use crate::AnalyticsError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupInfo {
    pub total_messages: usize,
    pub unique_senders: usize,
    pub sentiment_counts: SentimentCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopSenderShare {
    pub name: String,
    pub phone: String,
    pub message_count: usize,
    /// Share of the group's messages, one decimal.
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenderSummary {
    pub name: String,
    pub phone: String,
    pub message_count: usize,
    pub sentiment_breakdown: SentimentCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupMessage {
    pub content: String,
    pub sender_name: String,
    pub sender_phone: String,
    pub timestamp: String,
    pub label: String,
    pub sentiment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupDetails {
    pub group_info: GroupInfo,
    pub top_sender: Option<TopSenderShare>,
    /// Busiest senders first.
    pub unique_senders: Vec<SenderSummary>,
    pub messages_by_sentiment: SentimentBuckets<GroupMessage>,
}

/// Drill-down into one group file. Unlike the scans, senders without a phone
/// field are pooled under `Unknown` here; an explicit empty phone keeps its own
/// bucket.
///
/// # Errors
///
/// Returns [`AnalyticsError::Validation`] when a selector is missing or the file
/// is not a JSON array, [`AnalyticsError::NotFound`] when the file does not exist,
/// and I/O or JSON errors as they occur.
pub fn group_details(
    root: &DataRoot,
    assembly: Option<&str>,
    date: Option<&str>,
    group: Option<&str>,
) -> Result<GroupDetails, AnalyticsError> {
    fn present(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|s| !s.is_empty())
    }

    let (Some(assembly), Some(date), Some(group)) = (present(assembly), present(date), present(group))
    else {
        return Err(AnalyticsError::validation(
            "Group name, assembly, and date are required",
        ));
    };

    let path = root.group_file(assembly, date, group)?;
    if !path.is_file() {
        return Err(AnalyticsError::not_found("Group file not found"));
    }
    let records = match load_group_file(&path, PayloadPolicy::ListOnly) {
        Ok(records) => records,
        Err(AnalyticsError::InvalidPayload { .. }) => {
            return Err(AnalyticsError::validation("Invalid message data format"));
        }
        Err(e) => return Err(e),
    };

    let total = records.len();
    let mut sentiment_counts = SentimentCounts::default();
    let mut senders: Ordered<SenderSummary> = Ordered::default();
    let mut buckets: SentimentBuckets<GroupMessage> = SentimentBuckets::default();

    for record in &records {
        let phone = record
            .sender_phone_as_given()
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
        let phone = phone.as_str();
        let name = record.sender_name_or_unknown();
        sentiment_counts.record(&record.sentiment);

        let sender = senders.get_or_insert_with(phone, || SenderSummary {
            name: name.to_string(),
            phone: phone.to_string(),
            message_count: 0,
            sentiment_breakdown: SentimentCounts::default(),
        });
        sender.message_count += 1;
        sender.sentiment_breakdown.record(&record.sentiment);

        buckets.push(
            &record.sentiment,
            GroupMessage {
                content: record.content.clone(),
                sender_name: name.to_string(),
                sender_phone: phone.to_string(),
                timestamp: record.timestamp.clone(),
                label: record.label.clone(),
                sentiment: record.sentiment.clone(),
            },
        );
    }

    let mut top: Option<&SenderSummary> = None;
    for sender in senders.iter() {
        if top.is_none_or(|t| sender.message_count > t.message_count) {
            top = Some(sender);
        }
    }
    let top_sender = top.map(|t| TopSenderShare {
        name: t.name.clone(),
        phone: t.phone.clone(),
        message_count: t.message_count,
        percentage: percentage(t.message_count, total, 1),
    });

    let unique = senders.len();
    let mut unique_senders = senders.into_items();
    unique_senders.sort_by(|a, b| b.message_count.cmp(&a.message_count));

    Ok(GroupDetails {
        group_info: GroupInfo {
            total_messages: total,
            unique_senders: unique,
            sentiment_counts,
        },
        top_sender,
        unique_senders,
        messages_by_sentiment: buckets,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use serde_json::{json, Value};

    use super::*;

    fn write_group(root: &Path, body: &Value) {
        let dir = root.join("North/2025-01-15/messages");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Ward 1.json"), serde_json::to_vec(body).unwrap()).unwrap();
    }

    fn details(root: &Path) -> Result<GroupDetails, AnalyticsError> {
        group_details(
            &DataRoot::new(root),
            Some("North"),
            Some("2025-01-15"),
            Some("Ward 1"),
        )
    }

    fn message(sender: Value, sentiment: &str, text: &str) -> Value {
        json!({
            "messageContent": text,
            "timestamp": "2025-01-15T09:00:00",
            "sender": sender,
            "predicted_sentiment": sentiment,
        })
    }

    #[test]
    fn phoneless_senders_pool_under_unknown() {
        let tmp = tempfile::tempdir().unwrap();
        let mut messages = vec![message(json!({"name": "A", "phoneNumber": "1"}), "Positive", "hi")];
        for i in 0..15 {
            let sentiment = if i < 10 { "Negative" } else { "Neutral" };
            messages.push(message(json!({"name": "B"}), sentiment, "complaint"));
        }
        write_group(tmp.path(), &Value::Array(messages));

        let out = details(tmp.path()).unwrap();

        assert_eq!(out.group_info.total_messages, 16);
        assert_eq!(out.group_info.unique_senders, 2);
        let top = out.top_sender.expect("top sender");
        assert_eq!(top.name, "B");
        assert_eq!(top.phone, "Unknown");
        assert_eq!(top.message_count, 15);
        assert_eq!(top.percentage, Decimal::new(938, 1));

        let ranked: Vec<(&str, usize)> = out
            .unique_senders
            .iter()
            .map(|s| (s.phone.as_str(), s.message_count))
            .collect();
        assert_eq!(ranked, vec![("Unknown", 15), ("1", 1)]);
        assert_eq!(out.unique_senders[0].sentiment_breakdown.negative, 10);

        assert_eq!(out.messages_by_sentiment.positive.len(), 1);
        assert_eq!(out.messages_by_sentiment.positive[0].sender_phone, "1");
        assert_eq!(out.messages_by_sentiment.negative.len(), 10);
        assert_eq!(out.messages_by_sentiment.neutral.len(), 5);
        assert_eq!(out.group_info.sentiment_counts.neutral, 5);
    }

    #[test]
    fn explicit_empty_phone_keeps_its_own_bucket() {
        let tmp = tempfile::tempdir().unwrap();
        write_group(
            tmp.path(),
            &json!([
                message(json!({"name": "C", "phoneNumber": ""}), "Neutral", "x"),
                message(json!({"name": "D"}), "Neutral", "y"),
            ]),
        );

        let out = details(tmp.path()).unwrap();

        let phones: Vec<&str> = out.unique_senders.iter().map(|s| s.phone.as_str()).collect();
        assert_eq!(phones, vec!["", "Unknown"]);
    }

    #[test]
    fn object_payload_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write_group(tmp.path(), &message(json!({"name": "A"}), "Neutral", "x"));

        let err = details(tmp.path()).unwrap_err();

        assert!(
            matches!(&err, AnalyticsError::Validation(m) if m == "Invalid message data format"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn missing_selector_is_a_validation_error() {
        let tmp = tempfile::tempdir().unwrap();

        let err = group_details(&DataRoot::new(tmp.path()), Some("North"), Some(" "), Some("Ward 1"))
            .unwrap_err();

        assert!(matches!(err, AnalyticsError::Validation(_)));
    }
}
