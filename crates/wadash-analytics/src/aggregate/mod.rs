//! Reducers over the scan pipeline, one per dashboard statistic.

pub mod assembly_messages;
pub mod common_members;
pub mod group_details;
pub mod group_senders;
pub mod json_overview;
pub mod member_details;
pub mod search;
pub mod sentiment_rank;

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use wadash_core::Sentiment;

pub use assembly_messages::{AssemblyMessages, AssemblyMessagesReducer};
pub use common_members::{CommonMember, CommonMembers, CommonMembersReducer};
pub use group_details::{group_details, GroupDetails};
pub use group_senders::{GroupAnalysis, GroupSenderReducer, GroupSenderResults};
pub use json_overview::{json_overview, JsonOverview};
pub use member_details::{MemberDetails, MemberDetailsReducer};
pub use search::{SearchReducer, SearchResults};
pub use sentiment_rank::{RankedUser, SentimentRankReducer};

/// `part / total * 100`, rounded half away from zero to `dp` places.
/// Zero when `total` is zero.
#[must_use]
pub fn percentage(part: usize, total: usize, dp: u32) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    let ratio = Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(total);
    ratio.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Keyed accumulator that remembers first-insertion order.
#[derive(Debug)]
pub(crate) struct Ordered<T> {
    index: HashMap<String, usize>,
    items: Vec<T>,
}

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            items: Vec::new(),
        }
    }
}

impl<T> Ordered<T> {
    pub(crate) fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> T) -> &mut T {
        let slot = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.items.push(make());
                let i = self.items.len() - 1;
                self.index.insert(key.to_string(), i);
                i
            }
        };
        &mut self.items[slot]
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub(crate) fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Items bucketed under the three known sentiments; other labels are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentimentBuckets<T> {
    #[serde(rename = "Positive")]
    pub positive: Vec<T>,
    #[serde(rename = "Negative")]
    pub negative: Vec<T>,
    #[serde(rename = "Neutral")]
    pub neutral: Vec<T>,
}

impl<T> Default for SentimentBuckets<T> {
    fn default() -> Self {
        Self {
            positive: Vec::new(),
            negative: Vec::new(),
            neutral: Vec::new(),
        }
    }
}

impl<T> SentimentBuckets<T> {
    pub(crate) fn push(&mut self, label: &str, item: T) {
        match Sentiment::from_label(label) {
            Some(Sentiment::Positive) => self.positive.push(item),
            Some(Sentiment::Negative) => self.negative.push(item),
            Some(Sentiment::Neutral) => self.neutral.push(item),
            None => {}
        }
    }

    pub(crate) fn for_each_mut(&mut self, mut f: impl FnMut(&mut Vec<T>)) {
        f(&mut self.positive);
        f(&mut self.negative);
        f(&mut self.neutral);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(3, 4, 2), Decimal::new(75, 0));
        assert_eq!(percentage(2, 3, 2), Decimal::new(6667, 2));
        assert_eq!(percentage(1, 8, 2), Decimal::new(125, 1));
        // 0.125% -> 0.13 under half-up, 0.12 under banker's rounding
        assert_eq!(percentage(1, 800, 2), Decimal::new(13, 2));
        assert_eq!(percentage(1, 16, 1), Decimal::new(63, 1));
    }

    #[test]
    fn percentage_of_nothing_is_zero() {
        assert_eq!(percentage(0, 0, 2), Decimal::ZERO);
    }

    #[test]
    fn ordered_keeps_first_insertion_order() {
        let mut ordered: Ordered<u32> = Ordered::default();
        *ordered.get_or_insert_with("b", || 0) += 1;
        *ordered.get_or_insert_with("a", || 0) += 1;
        *ordered.get_or_insert_with("b", || 0) += 1;
        assert_eq!(ordered.into_items(), vec![2, 1]);
    }
}
