// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-stream batching of observations.
//!
//! Observations are grouped by the stream they belong to. Sensors usually
//! report several values of the same stream back to back, so the last used
//! batch is remembered and consecutive adds skip the map lookup.
//!
//! The accumulator is single-writer: every mutating call takes `&mut self`.
//! Share it between threads only behind an external lock.

use crate::data_array::{defined_components, DataArrayValue};
use crate::model::{Observation, StreamRef};
use crate::uplink::UplinkError;
use std::collections::HashMap;

/// Groups observations into one [`DataArrayValue`] per stream.
///
/// Batches are unbounded; the owner decides when to [`drain`](Self::drain).
#[derive(Debug, Default)]
pub struct BatchAccumulator {
    /// Batches in creation order.
    batches: Vec<DataArrayValue>,
    /// Stream -> position in `batches`.
    index: HashMap<StreamRef, usize>,
    /// Most recently used stream and its position. Reset with `index`.
    last: Option<(StreamRef, usize)>,
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observation to the batch of its stream.
    ///
    /// The batch is created on first use, with its column set taken from
    /// this observation. Fails if the observation has no stream.
    pub fn add(&mut self, obs: Observation) -> Result<(), UplinkError> {
        let stream = obs.stream().ok_or_else(|| {
            UplinkError::InvalidArgument("Observation must have a (Multi)Datastream".into())
        })?;

        let hit = match &self.last {
            Some((cached, slot)) if *cached == stream => Some(*slot),
            _ => None,
        };
        let slot = hit.unwrap_or_else(|| self.find_or_create(stream, &obs));

        self.batches[slot].add_observation(obs);
        Ok(())
    }

    fn find_or_create(&mut self, stream: StreamRef, obs: &Observation) -> usize {
        let slot = match self.index.get(&stream) {
            Some(&slot) => slot,
            None => {
                let slot = self.batches.len();
                self.batches
                    .push(DataArrayValue::new(stream.clone(), defined_components(obs)));
                self.index.insert(stream.clone(), slot);
                slot
            }
        };
        self.last = Some((stream, slot));
        slot
    }

    /// Number of streams with pending observations.
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Number of pending observations across all batches.
    pub fn observation_count(&self) -> usize {
        self.batches.iter().map(DataArrayValue::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Pending batches in creation order.
    pub fn batches(&self) -> &[DataArrayValue] {
        &self.batches
    }

    /// Pending batch of `stream`, if any.
    pub fn batch_for(&self, stream: &StreamRef) -> Option<&DataArrayValue> {
        self.index.get(stream).map(|&slot| &self.batches[slot])
    }

    /// Stream served by the most-recently-used shortcut.
    pub fn cached_stream(&self) -> Option<&StreamRef> {
        self.last.as_ref().map(|(stream, _)| stream)
    }

    /// Take every pending batch, leaving the accumulator empty.
    pub fn drain(&mut self) -> Vec<DataArrayValue> {
        self.index.clear();
        self.last = None;
        std::mem::take(&mut self.batches)
    }

    /// Drop every pending batch.
    pub fn clear(&mut self) {
        self.drain();
    }
}
