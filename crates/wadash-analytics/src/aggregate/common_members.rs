use std::collections::HashSet;

use serde::Serialize;
use wadash_core::{SentimentCounts, SentimentFilter};

use super::Ordered;
use crate::scan::{GroupReducer, LoadedGroup};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonMember {
    pub name: String,
    pub phone: String,
    pub groups_count: usize,
    /// `assembly/date/group`, in the order the member was first seen in each.
    pub group_names: Vec<String>,
    pub total_messages: usize,
    pub sentiment_breakdown: SentimentCounts,
}

impl CommonMember {
    /// Group names as `Assembly - Group`, for the spreadsheet export.
    #[must_use]
    pub fn display_group_names(&self) -> Vec<String> {
        self.group_names
            .iter()
            .map(|key| {
                let parts: Vec<&str> = key.split('/').collect();
                if parts.len() >= 3 {
                    format!("{} - {}", parts[0], parts[2])
                } else {
                    key.clone()
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommonMembers {
    pub total_common_members: usize,
    pub max_groups_per_member: usize,
    /// Sum of `groups_count` over every common member.
    pub total_crossings: usize,
    pub common_members: Vec<CommonMember>,
}

#[derive(Debug)]
struct MemberTally {
    name: String,
    phone: String,
    groups: Vec<String>,
    seen: HashSet<String>,
    total_messages: usize,
    sentiment: SentimentCounts,
}

/// Tracks, per phone number, which groups a sender appears in.
#[derive(Debug, Default)]
pub struct CommonMembersReducer {
    sentiment: SentimentFilter,
    members: Ordered<MemberTally>,
}

impl CommonMembersReducer {
    #[must_use]
    pub fn new(sentiment: SentimentFilter) -> Self {
        Self {
            sentiment,
            members: Ordered::default(),
        }
    }

    /// Members seen in at least two groups, most groups first, then most messages.
    #[must_use]
    pub fn finish(self) -> CommonMembers {
        let mut common: Vec<CommonMember> = self
            .members
            .into_items()
            .into_iter()
            .filter(|m| m.groups.len() >= 2)
            .map(|m| CommonMember {
                name: m.name,
                phone: m.phone,
                groups_count: m.groups.len(),
                group_names: m.groups,
                total_messages: m.total_messages,
                sentiment_breakdown: m.sentiment,
            })
            .collect();
        common.sort_by(|a, b| {
            (b.groups_count, b.total_messages).cmp(&(a.groups_count, a.total_messages))
        });

        CommonMembers {
            total_common_members: common.len(),
            max_groups_per_member: common.iter().map(|m| m.groups_count).max().unwrap_or(0),
            total_crossings: common.iter().map(|m| m.groups_count).sum(),
            common_members: common,
        }
    }
}

impl GroupReducer for CommonMembersReducer {
    fn reduce(&mut self, group: &LoadedGroup) {
        let key = group.source.key();
        for record in &group.records {
            let Some(phone) = record.sender_phone.as_deref() else {
                continue;
            };
            if !self.sentiment.matches(&record.sentiment) {
                continue;
            }
            let member = self.members.get_or_insert_with(phone, || MemberTally {
                name: record.sender_name_or_unknown().to_string(),
                phone: phone.to_string(),
                groups: Vec::new(),
                seen: HashSet::new(),
                total_messages: 0,
                sentiment: SentimentCounts::default(),
            });
            if member.seen.insert(key.clone()) {
                member.groups.push(key.clone());
            }
            member.total_messages += 1;
            member.sentiment.record(&record.sentiment);
        }
    }
}
