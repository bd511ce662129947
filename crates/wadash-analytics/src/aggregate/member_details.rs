use std::collections::BTreeSet;

use serde::Serialize;
use wadash_core::SentimentCounts;

use super::SentimentBuckets;
use crate::record::UNKNOWN_SENDER;
use crate::scan::{GroupReducer, LoadedGroup};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberInfo {
    pub name: String,
    pub phone: String,
    pub total_messages: usize,
    pub groups_involved: Vec<String>,
    pub sentiment_counts: SentimentCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberMessage {
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub timestamp: String,
    pub sentiment: String,
    pub label: String,
    pub group_name: String,
    pub assembly: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberDetails {
    pub member_info: MemberInfo,
    pub messages_by_sentiment: SentimentBuckets<MemberMessage>,
}

/// Everything one phone number said within the scan.
#[derive(Debug)]
pub struct MemberDetailsReducer {
    phone: String,
    name: String,
    total_messages: usize,
    groups: BTreeSet<String>,
    sentiment: SentimentCounts,
    messages: SentimentBuckets<MemberMessage>,
}

impl MemberDetailsReducer {
    #[must_use]
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            name: UNKNOWN_SENDER.to_string(),
            total_messages: 0,
            groups: BTreeSet::new(),
            sentiment: SentimentCounts::default(),
            messages: SentimentBuckets::default(),
        }
    }

    /// Each sentiment bucket is ordered newest first; groups are sorted.
    #[must_use]
    pub fn finish(self) -> MemberDetails {
        let mut messages = self.messages;
        messages.for_each_mut(|bucket| bucket.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)));
        MemberDetails {
            member_info: MemberInfo {
                name: self.name,
                phone: self.phone,
                total_messages: self.total_messages,
                groups_involved: self.groups.into_iter().collect(),
                sentiment_counts: self.sentiment,
            },
            messages_by_sentiment: messages,
        }
    }
}

impl GroupReducer for MemberDetailsReducer {
    fn reduce(&mut self, group: &LoadedGroup) {
        let source = &group.source;
        for record in &group.records {
            if record.sender_phone.as_deref() != Some(self.phone.as_str()) {
                continue;
            }
            if self.name == UNKNOWN_SENDER {
                self.name = record.sender_name_or_unknown().to_string();
            }
            self.total_messages += 1;
            self.groups.insert(source.key());
            self.sentiment.record(&record.sentiment);
            self.messages.push(
                &record.sentiment,
                MemberMessage {
                    content: record.content.clone(),
                    message_type: record.message_type.clone(),
                    timestamp: record.timestamp.clone(),
                    sentiment: record.sentiment.clone(),
                    label: record.label.clone(),
                    group_name: source.group.clone(),
                    assembly: source.assembly.clone(),
                    date: source.date.clone(),
                },
            );
        }
    }
}
