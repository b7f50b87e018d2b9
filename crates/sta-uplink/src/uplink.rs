// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Observation routing.
//!
//! Every observation goes one of three ways:
//!
//! ```text
//!                       +--> has id ----------------> update()
//! Observation -> valid? +--> data arrays off -------> create()
//!                       +--> data arrays on --------> BatchAccumulator --flush--> create_bulk()
//! ```
//!
//! In dry-run mode nothing reaches the service. Batching still happens so
//! a flush reports how much would have been sent; observations that would
//! have been sent singly are dropped.

use crate::buffer::BatchAccumulator;
use crate::bulk::{self, FlushReport};
use crate::config::{ConfigError, UplinkConfig};
use crate::connection::ConnectionManager;
use crate::model::{Observation, Thing};
use crate::service::{ServiceClient, ServiceError};
use crate::transport::TransportFactory;
use crate::validator::{AcceptAll, Validator};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

/// Uplink errors.
#[derive(Debug, Error)]
pub enum UplinkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

/// Running totals since creation or the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Observations created, singly or through a bulk request.
    pub inserted: u64,
    /// Existing observations updated.
    pub updated: u64,
}

/// Forwards observations to a SensorThings service.
///
/// Also owns the pub/sub [`ConnectionManager`] used for topic
/// notifications about the same data.
pub struct Uplink {
    config: UplinkConfig,
    client: Box<dyn ServiceClient>,
    validator: Box<dyn Validator>,
    accumulator: BatchAccumulator,
    counters: Counters,
    dry_run: bool,
    connection: ConnectionManager,
}

impl Uplink {
    /// Validate `config`, point `client` at the service and set up the
    /// (not yet connected) pub/sub manager.
    pub fn new(
        config: UplinkConfig,
        mut client: Box<dyn ServiceClient>,
        transports: Arc<dyn TransportFactory>,
    ) -> Result<Self, UplinkError> {
        config.validate()?;
        let endpoint = config.service_endpoint()?;
        client
            .configure(&endpoint, config.auth.as_ref())
            .map_err(|e| {
                error!("Failed to create service: {}", e);
                e
            })?;

        let connection = ConnectionManager::new(config.mqtt.clone(), transports);
        let dry_run = config.dry_run;

        Ok(Self {
            config,
            client,
            validator: Box::new(AcceptAll),
            accumulator: BatchAccumulator::new(),
            counters: Counters::default(),
            dry_run,
            connection,
        })
    }

    /// Replace the default accept-all validator.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Route one observation.
    ///
    /// Invalid observations are ignored. Batched observations only count
    /// once [`flush`](Self::flush) has sent them.
    pub fn submit(&mut self, obs: Observation) -> Result<(), UplinkError> {
        if !self.validator.is_valid(&obs) {
            return Ok(());
        }

        if obs.id.is_some() && !self.dry_run {
            self.client.update(&obs)?;
            self.counters.updated += 1;
        } else if !self.config.use_data_arrays && !self.dry_run {
            self.client.create(&obs)?;
            self.counters.inserted += 1;
        } else if self.config.use_data_arrays {
            self.accumulator.add(obs)?;
        }
        Ok(())
    }

    /// Send all pending batches in one bulk request.
    ///
    /// Items the service rejects are logged and dropped. The pending
    /// batches are discarded even when the request itself fails.
    pub fn flush(&mut self) -> Result<FlushReport, UplinkError> {
        let report = bulk::flush(
            &mut self.accumulator,
            self.client.as_mut(),
            &mut self.counters,
            self.dry_run,
        )?;
        Ok(report)
    }

    /// Flush pending batches, then close the pub/sub connection.
    pub fn shutdown(&mut self) -> Result<FlushReport, UplinkError> {
        let report = self.flush();
        if let Err(e) = self.connection.close() {
            warn!("Failed to close MQTT connection: {}", e);
        }
        report
    }

    /// All Things on the service.
    pub fn things(&mut self) -> Result<Vec<Thing>, UplinkError> {
        self.client.things().map_err(|e| {
            error!("Failed to fetch things: {}", e);
            e.into()
        })
    }

    pub fn inserted(&self) -> u64 {
        self.counters.inserted
    }

    pub fn updated(&self) -> u64 {
        self.counters.updated
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = Counters::default();
    }

    /// Observations waiting for the next flush.
    pub fn pending(&self) -> &BatchAccumulator {
        &self.accumulator
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn config(&self) -> &UplinkConfig {
        &self.config
    }
}
