// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topic subscription registry.
//!
//! The registry is the record of what should be subscribed, independent of
//! whether a connection currently exists. It is replayed against the
//! transport after every (re)connect.

use crate::transport::{Listener, MessageListener};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Topic -> listeners, in subscription order.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: BTreeMap<String, Vec<Listener>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener to a topic, creating the entry if needed.
    pub fn add(&mut self, topic: &str, listener: Listener) {
        self.entries
            .entry(topic.to_string())
            .or_default()
            .push(listener);
    }

    /// Remove a topic with all its listeners.
    pub fn remove(&mut self, topic: &str) -> Option<Vec<Listener>> {
        self.entries.remove(topic)
    }

    /// Every topic with its listeners, in topic order.
    pub fn list_all(&self) -> impl Iterator<Item = (&str, &[Listener])> {
        self.entries
            .iter()
            .map(|(topic, listeners)| (topic.as_str(), listeners.as_slice()))
    }

    pub fn topics(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.entries.contains_key(topic)
    }

    pub fn listener_count(&self, topic: &str) -> usize {
        self.entries.get(topic).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One listener that delivers to every listener of `topic`.
    pub fn dispatcher(&self, topic: &str) -> Option<Listener> {
        match self.entries.get(topic)?.as_slice() {
            [] => None,
            [single] => Some(Arc::clone(single)),
            many => Some(Arc::new(FanOut(many.to_vec()))),
        }
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(t, l)| (t, l.len())))
            .finish()
    }
}

/// Delivers each message to several listeners in order.
struct FanOut(Vec<Listener>);

impl MessageListener for FanOut {
    fn message_arrived(&self, topic: &str, payload: &[u8]) {
        for listener in &self.0 {
            listener.message_arrived(topic, payload);
        }
    }
}
