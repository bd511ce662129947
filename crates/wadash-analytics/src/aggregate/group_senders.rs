use std::collections::BTreeMap;

use serde::Serialize;
use wadash_core::{SentimentCounts, SentimentFilter};

use super::Ordered;
use crate::record::MessageRecord;
use crate::scan::{GroupReducer, GroupSource, LoadedGroup};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenderMessage {
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub timestamp: String,
    pub sentiment: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenderDetail {
    pub name: String,
    pub phone: String,
    pub message_count: usize,
    pub messages: Vec<SenderMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopSender {
    pub name: String,
    pub phone: String,
    pub message_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupAnalysis {
    pub assembly: String,
    pub date: String,
    pub group_name: String,
    /// Every record in the file, before the sentiment filter.
    pub total_messages: usize,
    pub unique_senders: usize,
    pub top_sender: Option<TopSender>,
    pub sentiment_breakdown: SentimentCounts,
    pub label_breakdown: BTreeMap<String, usize>,
    pub sender_details: Vec<SenderDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupSenderResults {
    pub total_groups: usize,
    pub total_unique_senders: usize,
    pub total_messages: usize,
    /// Largest groups first.
    pub group_analysis: Vec<GroupAnalysis>,
}

/// Ranks senders within one group. Records without a phone number are not
/// attributed to anyone.
#[must_use]
pub fn analyze_group(
    source: &GroupSource,
    records: &[MessageRecord],
    sentiment: &SentimentFilter,
) -> GroupAnalysis {
    let mut senders: Ordered<SenderDetail> = Ordered::default();
    let mut sentiment_breakdown = SentimentCounts::default();
    let mut label_breakdown: BTreeMap<String, usize> = BTreeMap::new();

    for record in records {
        let Some(phone) = record.sender_phone.as_deref() else {
            continue;
        };
        if !sentiment.matches(&record.sentiment) {
            continue;
        }
        let sender = senders.get_or_insert_with(phone, || SenderDetail {
            name: record.sender_name_or_unknown().to_string(),
            phone: phone.to_string(),
            message_count: 0,
            messages: Vec::new(),
        });
        sender.message_count += 1;
        sender.messages.push(SenderMessage {
            content: record.content.clone(),
            message_type: record.message_type.clone(),
            timestamp: record.timestamp.clone(),
            sentiment: record.sentiment.clone(),
            label: record.label.clone(),
        });
        sentiment_breakdown.record(&record.sentiment);
        *label_breakdown.entry(record.label.clone()).or_default() += 1;
    }

    // First sender to reach the maximum wins ties.
    let mut top: Option<&SenderDetail> = None;
    for sender in senders.iter() {
        if top.is_none_or(|t| sender.message_count > t.message_count) {
            top = Some(sender);
        }
    }
    let top_sender = top.map(|t| TopSender {
        name: t.name.clone(),
        phone: t.phone.clone(),
        message_count: t.message_count,
    });

    GroupAnalysis {
        assembly: source.assembly.clone(),
        date: source.date.clone(),
        group_name: source.group.clone(),
        total_messages: records.len(),
        unique_senders: senders.len(),
        top_sender,
        sentiment_breakdown,
        label_breakdown,
        sender_details: senders.into_items(),
    }
}

#[derive(Debug, Default)]
pub struct GroupSenderReducer {
    sentiment: SentimentFilter,
    groups: Vec<GroupAnalysis>,
}

impl GroupSenderReducer {
    #[must_use]
    pub fn new(sentiment: SentimentFilter) -> Self {
        Self {
            sentiment,
            groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn finish(self) -> GroupSenderResults {
        let mut groups = self.groups;
        groups.sort_by(|a, b| b.total_messages.cmp(&a.total_messages));
        GroupSenderResults {
            total_groups: groups.len(),
            total_unique_senders: groups.iter().map(|g| g.unique_senders).sum(),
            total_messages: groups.iter().map(|g| g.total_messages).sum(),
            group_analysis: groups,
        }
    }
}

impl GroupReducer for GroupSenderReducer {
    fn reduce(&mut self, group: &LoadedGroup) {
        if group.records.is_empty() {
            return;
        }
        self.groups
            .push(analyze_group(&group.source, &group.records, &self.sentiment));
    }
}
