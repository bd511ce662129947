use std::collections::HashSet;

use serde::Serialize;

use crate::filter::MessageFilter;
use crate::scan::{GroupReducer, LoadedGroup};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub message_content: String,
    pub sender_name: String,
    pub sender_phone: String,
    pub sentiment: String,
    pub label: String,
    pub timestamp: String,
    pub group_name: String,
    pub assembly: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    /// Newest first.
    pub search_results: Vec<SearchHit>,
    pub total_messages: usize,
    /// Distinct sender phone numbers among the hits.
    pub total_members: usize,
    /// Distinct `assembly/date/group` triples among the hits.
    pub total_groups: usize,
    pub search_term: String,
}

/// Message listing for the search page.
#[derive(Debug)]
pub struct SearchReducer {
    filter: MessageFilter,
    hits: Vec<SearchHit>,
    members: HashSet<String>,
    groups: HashSet<String>,
}

impl SearchReducer {
    #[must_use]
    pub fn new(filter: MessageFilter) -> Self {
        Self {
            filter,
            hits: Vec::new(),
            members: HashSet::new(),
            groups: HashSet::new(),
        }
    }

    #[must_use]
    pub fn finish(self) -> SearchResults {
        let mut hits = self.hits;
        hits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        SearchResults {
            total_messages: hits.len(),
            total_members: self.members.len(),
            total_groups: self.groups.len(),
            search_term: self
                .filter
                .search
                .as_ref()
                .map(|q| q.term().to_string())
                .unwrap_or_default(),
            search_results: hits,
        }
    }
}

impl GroupReducer for SearchReducer {
    fn reduce(&mut self, group: &LoadedGroup) {
        let source = &group.source;
        for record in &group.records {
            if !self.filter.matches(source, record) {
                continue;
            }
            let phone = record.sender_phone.clone().unwrap_or_default();
            if !phone.is_empty() {
                self.members.insert(phone.clone());
            }
            self.groups.insert(source.key());
            self.hits.push(SearchHit {
                message_content: record.content.clone(),
                sender_name: record.sender_name_or_unknown().to_string(),
                sender_phone: phone,
                sentiment: record.sentiment.clone(),
                label: record.label.clone(),
                timestamp: record.timestamp.clone(),
                group_name: source.group.clone(),
                assembly: source.assembly.clone(),
                date: source.date.clone(),
            });
        }
    }
}
