use std::collections::HashSet;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use wadash_core::{Sentiment, SentimentCounts, SentimentFilter};

use super::{percentage, Ordered};
use crate::scan::{GroupReducer, LoadedGroup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedUser {
    pub name: String,
    pub phone: String,
    pub total_messages: usize,
    pub positive_messages: usize,
    pub negative_messages: usize,
    pub neutral_messages: usize,
    pub groups_count: usize,
    /// The sentiment this user was ranked by.
    pub target: Sentiment,
    /// Share of the target sentiment, two decimals.
    pub percentage: Decimal,
}

/// Serialized with the percentage keyed by sentiment, e.g. `positive_percentage`.
impl Serialize for RankedUser {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let percentage_key = match self.target {
            Sentiment::Positive => "positive_percentage",
            Sentiment::Negative => "negative_percentage",
            Sentiment::Neutral => "neutral_percentage",
        };
        let mut state = serializer.serialize_struct("RankedUser", 8)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("phone", &self.phone)?;
        state.serialize_field("total_messages", &self.total_messages)?;
        state.serialize_field("positive_messages", &self.positive_messages)?;
        state.serialize_field("negative_messages", &self.negative_messages)?;
        state.serialize_field("neutral_messages", &self.neutral_messages)?;
        state.serialize_field("groups_count", &self.groups_count)?;
        state.serialize_field(percentage_key, &self.percentage.to_f64().unwrap_or_default())?;
        state.end()
    }
}

#[derive(Debug)]
struct UserTally {
    name: String,
    phone: String,
    total_messages: usize,
    counts: SentimentCounts,
    groups: HashSet<String>,
}

/// Ranks senders by how many of their messages carry one sentiment.
#[derive(Debug)]
pub struct SentimentRankReducer {
    target: Sentiment,
    filter: SentimentFilter,
    users: Ordered<UserTally>,
}

impl SentimentRankReducer {
    #[must_use]
    pub fn new(target: Sentiment, filter: SentimentFilter) -> Self {
        Self {
            target,
            filter,
            users: Ordered::default(),
        }
    }

    #[must_use]
    pub fn target(&self) -> Sentiment {
        self.target
    }

    /// Users with at least one message of the target sentiment, ordered by
    /// that count and then by its percentage, both descending.
    #[must_use]
    pub fn finish(self) -> Vec<RankedUser> {
        let target = self.target;
        let mut ranked: Vec<RankedUser> = self
            .users
            .into_items()
            .into_iter()
            .filter(|u| u.counts.get(target) > 0)
            .map(|u| RankedUser {
                percentage: percentage(u.counts.get(target), u.total_messages, 2),
                name: u.name,
                phone: u.phone,
                total_messages: u.total_messages,
                positive_messages: u.counts.positive,
                negative_messages: u.counts.negative,
                neutral_messages: u.counts.neutral,
                groups_count: u.groups.len(),
                target,
            })
            .collect();
        ranked.sort_by(|a, b| {
            let key = |u: &RankedUser| {
                let count = match target {
                    Sentiment::Positive => u.positive_messages,
                    Sentiment::Negative => u.negative_messages,
                    Sentiment::Neutral => u.neutral_messages,
                };
                (count, u.percentage)
            };
            key(b).cmp(&key(a))
        });
        ranked
    }
}

impl GroupReducer for SentimentRankReducer {
    fn reduce(&mut self, group: &LoadedGroup) {
        let key = group.source.key();
        for record in &group.records {
            let Some(phone) = record.sender_phone.as_deref() else {
                continue;
            };
            if !self.filter.matches(&record.sentiment) {
                continue;
            }
            let user = self.users.get_or_insert_with(phone, || UserTally {
                name: record.sender_name_or_unknown().to_string(),
                phone: phone.to_string(),
                total_messages: 0,
                counts: SentimentCounts::default(),
                groups: HashSet::new(),
            });
            user.total_messages += 1;
            user.groups.insert(key.clone());
            user.counts.record(&record.sentiment);
        }
    }
}
