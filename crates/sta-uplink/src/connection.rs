// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared pub/sub connection with subscription replay.
//!
//! One transport handle per manager, created on first use. Subscriptions
//! are recorded in a [`SubscriptionRegistry`] and replayed every time the
//! transport reports a completed (re)connect, so a broker restart or a
//! network drop never loses a topic.
//!
//! ```text
//!                 ensure_connected()
//!  Disconnected ----------------------> Connecting
//!       ^                                   | connect() ok
//!       | close()                           v
//!       +------------------------------ Connected <----------+
//!                                           | lost           | connect_complete
//!                                           v                |
//!                                      Reconnecting ---------+
//! ```
//!
//! Every state change, every wire call and the replay itself run under a
//! single lock per manager. Transport callbacks arrive on the transport's
//! thread and take the same lock.

use crate::config::MqttConfig;
use crate::subscription::SubscriptionRegistry;
use crate::transport::{
    ConnectOptions, ConnectionEvents, Listener, Transport, TransportError, TransportFactory,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Connection state together with the handle it owns.
enum Link {
    Disconnected,
    Connecting(Arc<dyn Transport>),
    Connected(Arc<dyn Transport>),
    Reconnecting(Arc<dyn Transport>),
}

impl Link {
    fn state(&self) -> ConnectionState {
        match self {
            Link::Disconnected => ConnectionState::Disconnected,
            Link::Connecting(_) => ConnectionState::Connecting,
            Link::Connected(_) => ConnectionState::Connected,
            Link::Reconnecting(_) => ConnectionState::Reconnecting,
        }
    }

    fn transport(&self) -> Option<&Arc<dyn Transport>> {
        match self {
            Link::Disconnected => None,
            Link::Connecting(t) | Link::Connected(t) | Link::Reconnecting(t) => Some(t),
        }
    }

    /// Transport usable for wire calls right now.
    fn live(&self) -> Option<&Arc<dyn Transport>> {
        match self {
            Link::Connected(t) if t.is_connected() => Some(t),
            _ => None,
        }
    }
}

struct Inner {
    link: Link,
    registry: SubscriptionRegistry,
    client_id: Option<String>,
    /// Bumped for every new handle and on close; stale callbacks are ignored.
    generation: u64,
}

impl Inner {
    fn client_id(&mut self, config: &MqttConfig) -> String {
        self.client_id
            .get_or_insert_with(|| {
                config
                    .fixed_client_id()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("processor-{}", Uuid::new_v4()))
            })
            .clone()
    }

    /// Remove one topic and unsubscribe it on the wire when connected.
    fn remove_topic(&mut self, topic: &str) -> Result<(), TransportError> {
        self.registry.remove(topic);
        match self.link.live() {
            Some(transport) => transport.unsubscribe(topic),
            None => Ok(()),
        }
    }

    fn unsubscribe_all(&mut self) {
        for topic in self.registry.topics() {
            if let Err(e) = self.remove_topic(&topic) {
                error!("Failed to unsubscribe from topic '{}': {}", topic, e);
            }
        }
    }

    /// Re-issue every registered topic once. Returns the number of failures.
    fn replay(&self) -> usize {
        let Some(transport) = self.link.transport() else {
            return 0;
        };
        let mut failures = 0;
        for (topic, _) in self.registry.list_all() {
            let Some(listener) = self.registry.dispatcher(topic) else {
                continue;
            };
            if let Err(e) = transport.subscribe(topic, listener) {
                failures += 1;
                error!("Failed to re-subscribe to topic '{}': {}", topic, e);
            }
        }
        debug!(
            "Replayed {} subscriptions ({} failed)",
            self.registry.len(),
            failures
        );
        failures
    }
}

/// Owns the shared pub/sub connection and its subscriptions.
///
/// Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    config: MqttConfig,
    options: ConnectOptions,
    factory: Arc<dyn TransportFactory>,
    inner: Arc<Mutex<Inner>>,
}

impl ConnectionManager {
    /// Create a manager. Nothing connects until [`ensure_connected`](Self::ensure_connected).
    pub fn new(config: MqttConfig, factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            config,
            options: ConnectOptions::persistent(),
            factory,
            inner: Arc::new(Mutex::new(Inner {
                link: Link::Disconnected,
                registry: SubscriptionRegistry::new(),
                client_id: None,
                generation: 0,
            })),
        }
    }

    /// Client identity: the configured one, or `processor-<uuid>`.
    ///
    /// Generated once and kept for the lifetime of the manager, across
    /// reconnects and closes.
    pub fn client_id(&self) -> String {
        self.inner.lock().client_id(&self.config)
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().link.state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().link.live().is_some()
    }

    /// Return the transport, creating and connecting it if there is none.
    ///
    /// Calls while a handle exists return it unchanged, even while the
    /// transport is reconnecting. A failed initial connect leaves the
    /// manager disconnected.
    pub fn ensure_connected(&self) -> Result<Arc<dyn Transport>, TransportError> {
        let mut inner = self.inner.lock();
        if let Some(transport) = inner.link.transport() {
            return Ok(Arc::clone(transport));
        }

        let client_id = inner.client_id(&self.config);
        info!(
            "Connecting to {} using clientId {}.",
            self.config.url, client_id
        );

        inner.generation += 1;
        let events = Arc::new(ReplayOnConnect {
            inner: Arc::downgrade(&self.inner),
            generation: inner.generation,
        });
        let transport = self.factory.create(&self.config.url, &client_id, events)?;

        inner.link = Link::Connecting(Arc::clone(&transport));
        match transport.connect(&self.options) {
            Ok(()) => {
                inner.link = Link::Connected(Arc::clone(&transport));
                Ok(transport)
            }
            Err(e) => {
                warn!("Failed to connect to {}: {}", self.config.url, e);
                inner.link = Link::Disconnected;
                Err(e)
            }
        }
    }

    /// Register a listener for `topic`, subscribing right away when connected.
    ///
    /// The registration is kept even when the wire call fails; the topic is
    /// retried at the next reconnect.
    pub fn subscribe(&self, topic: &str, listener: Listener) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        inner.registry.add(topic, Arc::clone(&listener));
        let Some(transport) = inner.link.live() else {
            return Ok(());
        };
        // The transport keeps only the latest listener per topic.
        let dispatcher = inner.registry.dispatcher(topic).unwrap_or(listener);
        transport.subscribe(topic, dispatcher)
    }

    /// Drop every listener of `topic`, unsubscribing on the wire when connected.
    pub fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.inner.lock().remove_topic(topic)
    }

    /// Drop every topic. Wire failures are logged and skipped.
    pub fn unsubscribe_all(&self) {
        self.inner.lock().unsubscribe_all();
    }

    /// Registered topics, in replay order.
    pub fn topics(&self) -> Vec<String> {
        self.inner.lock().registry.topics()
    }

    pub fn listener_count(&self, topic: &str) -> usize {
        self.inner.lock().registry.listener_count(topic)
    }

    /// Unsubscribe everything and drop the connection.
    ///
    /// The handle is discarded even when disconnecting fails, so the next
    /// [`ensure_connected`](Self::ensure_connected) starts fresh.
    pub fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        info!("Unsubscribing all topics...");
        inner.unsubscribe_all();

        inner.generation += 1;
        let link = std::mem::replace(&mut inner.link, Link::Disconnected);
        let Some(transport) = link.transport() else {
            return Ok(());
        };
        if transport.is_connected() {
            info!("Stopping MQTT client...");
            transport.disconnect()
        } else {
            info!("MQTT client already stopped.");
            Ok(())
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ConnectionManager")
            .field("url", &self.config.url)
            .field("state", &inner.link.state())
            .field("subscriptions", &inner.registry)
            .finish()
    }
}

/// Callbacks installed on each transport handle.
struct ReplayOnConnect {
    inner: Weak<Mutex<Inner>>,
    generation: u64,
}

impl ReplayOnConnect {
    fn with_current<F: FnOnce(&mut Inner)>(&self, f: F) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut inner = inner.lock();
        if inner.generation != self.generation {
            debug!("Ignoring event from a superseded connection");
            return;
        }
        f(&mut inner);
    }
}

impl ConnectionEvents for ReplayOnConnect {
    fn connection_lost(&self, cause: &TransportError) {
        self.with_current(|inner| {
            info!("Connection lost: {}", cause);
            inner.link = match std::mem::replace(&mut inner.link, Link::Disconnected) {
                Link::Connecting(t) | Link::Connected(t) | Link::Reconnecting(t) => {
                    Link::Reconnecting(t)
                }
                Link::Disconnected => Link::Disconnected,
            };
        });
    }

    fn connect_complete(&self, reconnect: bool, server_uri: &str) {
        self.with_current(|inner| {
            inner.link = match std::mem::replace(&mut inner.link, Link::Disconnected) {
                Link::Connecting(t) | Link::Connected(t) | Link::Reconnecting(t) => {
                    Link::Connected(t)
                }
                Link::Disconnected => return,
            };
            info!(
                "Connected to {} (reconnect: {}), restoring {} subscriptions",
                server_uri,
                reconnect,
                inner.registry.len()
            );
            inner.replay();
        });
    }
}
