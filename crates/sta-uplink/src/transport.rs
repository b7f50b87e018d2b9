// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pub/sub transport interface.
//!
//! The uplink does not speak MQTT itself. A [`TransportFactory`] supplied by
//! the application builds the client; the [`ConnectionManager`] drives it.
//!
//! # Callback contract
//!
//! Transports report connection changes through [`ConnectionEvents`] from
//! their own thread. They must not invoke a callback synchronously from
//! inside `connect`, `subscribe`, `unsubscribe` or `disconnect` on the
//! calling thread: the manager holds its lock during those calls.
//!
//! [`ConnectionManager`]: crate::connection::ConnectionManager

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Keep-alive interval requested from the broker.
pub const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Time allowed for establishing a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport errors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Subscribe to '{topic}' failed: {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("Unsubscribe from '{topic}' failed: {reason}")]
    Unsubscribe { topic: String, reason: String },

    #[error("Disconnect failed: {0}")]
    Disconnect(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),
}

/// Receives messages published on a subscribed topic.
pub trait MessageListener: Send + Sync {
    fn message_arrived(&self, topic: &str, payload: &[u8]);
}

impl<F> MessageListener for F
where
    F: Fn(&str, &[u8]) + Send + Sync,
{
    fn message_arrived(&self, topic: &str, payload: &[u8]) {
        self(topic, payload)
    }
}

/// Shared handle to a listener.
pub type Listener = Arc<dyn MessageListener>;

/// Options used when connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Let the transport reconnect by itself after a connection loss.
    pub auto_reconnect: bool,
    /// Start from a fresh broker session. `false` keeps the session.
    pub clean_session: bool,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
}

impl ConnectOptions {
    /// Auto-reconnecting client on a persistent session.
    pub fn persistent() -> Self {
        Self {
            auto_reconnect: true,
            clean_session: false,
            keep_alive: KEEP_ALIVE,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::persistent()
    }
}

/// A connected (or connectable) pub/sub client.
///
/// Implementations are internally synchronized; all methods take `&self`.
pub trait Transport: Send + Sync {
    /// Connect to the broker. On success the transport must later report
    /// `connect_complete(false, ..)`, and `connect_complete(true, ..)` after
    /// every automatic reconnect.
    fn connect(&self, options: &ConnectOptions) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// Subscribe to `topic`. Subscribing to an active topic again must be
    /// harmless; the latest listener receives the messages.
    fn subscribe(&self, topic: &str, listener: Listener) -> Result<(), TransportError>;

    fn unsubscribe(&self, topic: &str) -> Result<(), TransportError>;

    fn disconnect(&self) -> Result<(), TransportError>;
}

/// Connection notifications raised by a transport.
pub trait ConnectionEvents: Send + Sync {
    fn connection_lost(&self, cause: &TransportError);

    fn connect_complete(&self, reconnect: bool, server_uri: &str);
}

/// Builds transports for the connection manager.
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        server_uri: &str,
        client_id: &str,
        events: Arc<dyn ConnectionEvents>,
    ) -> Result<Arc<dyn Transport>, TransportError>;
}
