//! One exported WhatsApp message, with the classifier's annotations.

use serde_json::{Map, Value};

pub const DEFAULT_SENTIMENT: &str = "Neutral";
pub const DEFAULT_LABEL: &str = "unknown";
pub const DEFAULT_MESSAGE_TYPE: &str = "text";
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Fields the aggregators consume, pulled out of the raw JSON object once.
/// Scalar values are accepted for text fields; anything else counts as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageRecord {
    pub content: String,
    pub message_type: String,
    /// Compared lexicographically, never parsed.
    pub timestamp: String,
    pub sender_name: Option<String>,
    /// `None` when absent or empty.
    pub sender_phone: Option<String>,
    pub sentiment: String,
    pub label: String,
    raw: Map<String, Value>,
}

impl MessageRecord {
    #[must_use]
    pub fn from_object(raw: Map<String, Value>) -> Self {
        let sender = raw.get("sender").and_then(Value::as_object);
        let sender_field = |key: &str| sender.and_then(|s| s.get(key)).and_then(scalar_text);

        Self {
            content: raw.get("messageContent").and_then(scalar_text).unwrap_or_default(),
            message_type: raw
                .get("messageType")
                .and_then(scalar_text)
                .unwrap_or_else(|| DEFAULT_MESSAGE_TYPE.to_string()),
            timestamp: raw.get("timestamp").and_then(scalar_text).unwrap_or_default(),
            sender_name: sender_field("name"),
            sender_phone: sender_field("phoneNumber").filter(|p| !p.is_empty()),
            sentiment: raw
                .get("predicted_sentiment")
                .and_then(scalar_text)
                .unwrap_or_else(|| DEFAULT_SENTIMENT.to_string()),
            label: raw
                .get("predicted_label")
                .and_then(scalar_text)
                .unwrap_or_else(|| DEFAULT_LABEL.to_string()),
            raw,
        }
    }

    /// Sender name, or `Unknown`.
    #[must_use]
    pub fn sender_name_or_unknown(&self) -> &str {
        self.sender_name.as_deref().unwrap_or(UNKNOWN_SENDER)
    }

    /// The sender's phone exactly as exported, so an explicit empty string
    /// stays distinct from a missing field.
    #[must_use]
    pub fn sender_phone_as_given(&self) -> Option<String> {
        self.raw
            .get("sender")
            .and_then(Value::as_object)
            .and_then(|s| s.get("phoneNumber"))
            .and_then(scalar_text)
    }

    /// The untouched JSON object as it appeared in the export.
    #[must_use]
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
