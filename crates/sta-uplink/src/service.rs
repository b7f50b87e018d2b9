// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client interface of the SensorThings service.
//!
//! The uplink never performs HTTP itself. Applications plug in a
//! [`ServiceClient`] that talks to the actual server.

use crate::config::AuthConfig;
use crate::data_array::DataArrayDocument;
use crate::model::{EntityId, Observation, Thing};
use thiserror::Error;
use url::Url;

/// Errors reported by a service client.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Entity rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Operations the uplink needs from the remote service.
pub trait ServiceClient: Send {
    /// Point the client at `endpoint` and install credentials.
    fn configure(&mut self, endpoint: &Url, auth: Option<&AuthConfig>) -> Result<(), ServiceError>;

    /// Create a single observation, returning its new identity.
    fn create(&mut self, obs: &Observation) -> Result<EntityId, ServiceError>;

    /// Update an observation that already carries an identity.
    fn update(&mut self, obs: &Observation) -> Result<(), ServiceError>;

    /// Create all observations of a DataArray document in one request.
    ///
    /// Returns one entry per observation, in submission order: the location
    /// of the created entity, or a string starting with `error`.
    fn create_bulk(&mut self, document: &DataArrayDocument<'_>) -> Result<Vec<String>, ServiceError>;

    /// List all Things on the service.
    fn things(&mut self) -> Result<Vec<Thing>, ServiceError>;
}

/// Outcome of one item of a bulk create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemResult {
    /// Created; holds the entity location.
    Created(String),
    /// Rejected; holds the server's error text.
    Failed(String),
}

impl ItemResult {
    /// Classify a raw bulk-create response entry.
    pub fn from_location(location: String) -> Self {
        if location.starts_with("error") {
            ItemResult::Failed(location)
        } else {
            ItemResult::Created(location)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ItemResult::Failed(_))
    }
}
