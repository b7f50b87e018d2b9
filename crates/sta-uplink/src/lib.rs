// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SensorThings Uplink
//!
//! Forwards sensor observations to an OGC SensorThings API service and
//! keeps a set of MQTT topic subscriptions alive across reconnects.
//!
//! This crate provides:
//! - Per-observation routing: update, single create, or batching
//! - Per-stream batching into SensorThings DataArray documents
//! - Bulk submission with per-item result reconciliation
//! - A shared pub/sub connection that replays subscriptions on reconnect
//! - YAML configuration
//!
//! # Overview
//!
//! The crate performs no HTTP or MQTT I/O itself. The service client and
//! the pub/sub transport are traits implemented by the application.
//!
//! ```text
//! Observation --> Validator --> Uplink --+--> ServiceClient::update / create
//!                                        +--> BatchAccumulator --flush--> ServiceClient::create_bulk
//!
//! subscribe() --> ConnectionManager --> Transport
//!                        ^    |
//!      connect_complete  |    +--> SubscriptionRegistry (replayed on reconnect)
//! ```

pub mod buffer;
pub mod bulk;
pub mod config;
pub mod connection;
pub mod data_array;
pub mod model;
pub mod service;
pub mod subscription;
pub mod transport;
pub mod uplink;
pub mod validator;

pub use buffer::BatchAccumulator;
pub use bulk::FlushReport;
pub use config::{AuthConfig, ConfigError, MqttConfig, UplinkConfig};
pub use connection::{ConnectionManager, ConnectionState};
pub use data_array::{Component, DataArrayDocument, DataArrayValue};
pub use model::{EntityId, Observation, StreamRef, Thing, TimeValue};
pub use service::{ItemResult, ServiceClient, ServiceError};
pub use subscription::SubscriptionRegistry;
pub use transport::{
    ConnectOptions, ConnectionEvents, Listener, MessageListener, Transport, TransportError,
    TransportFactory,
};
pub use uplink::{Counters, Uplink, UplinkError};
pub use validator::{AcceptAll, Validator};
