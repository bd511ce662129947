use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use wadash_core::SentimentFilter;

use crate::layout::DataRoot;
use crate::scan::{GroupReducer, LoadedGroup};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub name: String,
    pub count: usize,
}

/// Raw message listing for one assembly, as consumed by the group statistics page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssemblyMessages {
    pub total_messages: usize,
    pub total_groups: usize,
    pub groups: BTreeMap<String, GroupCount>,
    /// Original message objects plus a `file_path` relative to the data root.
    pub messages: Vec<Map<String, Value>>,
}

#[derive(Debug)]
pub struct AssemblyMessagesReducer<'a> {
    root: &'a DataRoot,
    sentiment: SentimentFilter,
    listing: AssemblyMessages,
}

impl<'a> AssemblyMessagesReducer<'a> {
    #[must_use]
    pub fn new(root: &'a DataRoot, sentiment: SentimentFilter) -> Self {
        Self {
            root,
            sentiment,
            listing: AssemblyMessages::default(),
        }
    }

    #[must_use]
    pub fn finish(self) -> AssemblyMessages {
        let mut listing = self.listing;
        listing.total_messages = listing.messages.len();
        listing.total_groups = listing.groups.len();
        listing
    }
}

impl GroupReducer for AssemblyMessagesReducer<'_> {
    fn reduce(&mut self, group: &LoadedGroup) {
        let file_path = self.root.relative_to_root(&group.source.path);
        for record in &group.records {
            if !self.sentiment.matches(&record.sentiment) {
                continue;
            }
            let mut message = record.raw().clone();
            message.insert("file_path".to_string(), Value::String(file_path.clone()));
            self.listing.messages.push(message);
            self.listing
                .groups
                .entry(group.source.group.clone())
                .or_insert_with(|| GroupCount {
                    name: group.source.group.clone(),
                    count: 0,
                })
                .count += 1;
        }
    }
}
