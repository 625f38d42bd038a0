//! Conversation storage.
//!
//! [`ConversationSet`] files every message under the normalized address of the
//! other party and, within that, under its millisecond timestamp. Both levels
//! are ordered maps, so iterating a conversation always yields messages oldest
//! first and documents are produced in a stable address order.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::Serialize;

use crate::message::Message;

/// Messages of one conversation, keyed by epoch milliseconds.
pub type Conversation = BTreeMap<i64, Message>;

/// All conversations, keyed by normalized counterparty address.
///
/// A timestamp is unique within one conversation: inserting a second message
/// with the same address and millisecond replaces the first. Backups do
/// contain such duplicates (the same message exported twice, or two files
/// covering the same period) and the later one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationSet {
    threads: BTreeMap<String, Conversation>,
}

impl ConversationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files `message` under `address`, returning the entry it replaced.
    pub fn insert(&mut self, address: &str, message: Message) -> Option<Message> {
        self.threads
            .entry(address.to_string())
            .or_default()
            .insert(message.timestamp, message)
    }

    /// Returns the conversation with `address`.
    pub fn get(&self, address: &str) -> Option<&Conversation> {
        self.threads.get(address)
    }

    /// Iterates conversations in address order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Conversation> {
        self.threads.iter()
    }

    /// Iterates the conversation addresses.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.threads.keys().map(String::as_str)
    }

    /// Number of conversations.
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Total number of stored messages across all conversations.
    pub fn message_count(&self) -> usize {
        self.threads.values().map(BTreeMap::len).sum()
    }
}

impl<'a> IntoIterator for &'a ConversationSet {
    type Item = (&'a String, &'a Conversation);
    type IntoIter = btree_map::Iter<'a, String, Conversation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Display names learned from SMS records, keyed by normalized address.
///
/// The first non-empty name seen for an address sticks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KnownUsers {
    names: BTreeMap<String, String>,
}

impl KnownUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name` for `address` unless the name is empty or the address
    /// already has one. Returns `true` if the name was recorded.
    pub fn learn(&mut self, address: &str, name: &str) -> bool {
        if name.is_empty() || self.names.contains_key(address) {
            return false;
        }
        self.names.insert(address.to_string(), name.to_string());
        true
    }

    /// Returns the name known for `address`.
    pub fn name(&self, address: &str) -> Option<&str> {
        self.names.get(address).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Everything accumulated from one or more backup files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Archive {
    /// Conversations by counterparty.
    pub conversations: ConversationSet,
    /// Contact names by counterparty.
    pub known_users: KnownUsers,
    /// Conversation entries produced so far.
    ///
    /// An MMS filed into three conversations counts three times. Entries that
    /// later overwrote an earlier one with the same timestamp still count, so
    /// this can exceed [`ConversationSet::message_count`].
    pub entries: usize,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }
}
