// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SensorThings DataArray extension payloads.
//!
//! A DataArray groups many observations of one stream into a compact
//! table: a `components` header naming the columns and one row per
//! observation.
//!
//! ```text
//! [
//!   {
//!     "Datastream": {"@iot.id": 1},
//!     "components": ["phenomenonTime", "result"],
//!     "dataArray@iot.count": 2,
//!     "dataArray": [["2024-01-01T00:00:00.000Z", 20.1], [..., 20.4]]
//!   }
//! ]
//! ```

use crate::model::{iso, Observation, StreamRef};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// A column of a DataArray.
///
/// Declaration order is the column order in the rendered payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    PhenomenonTime,
    Result,
    ResultTime,
    ResultQuality,
    ValidTime,
    Parameters,
}

impl Component {
    /// Component name as used in the `components` header.
    pub fn name(self) -> &'static str {
        match self {
            Component::PhenomenonTime => "phenomenonTime",
            Component::Result => "result",
            Component::ResultTime => "resultTime",
            Component::ResultQuality => "resultQuality",
            Component::ValidTime => "validTime",
            Component::Parameters => "parameters",
        }
    }

    /// Cell value of this column for one observation; `null` when unset.
    fn cell(self, obs: &Observation) -> Value {
        match self {
            Component::PhenomenonTime => obs
                .phenomenon_time
                .map_or(Value::Null, |t| json!(t.to_string())),
            Component::Result => obs.result.clone(),
            Component::ResultTime => obs.result_time.map_or(Value::Null, |t| json!(iso(&t))),
            Component::ResultQuality => obs.result_quality.clone().unwrap_or(Value::Null),
            Component::ValidTime => obs
                .valid_time
                .map_or(Value::Null, |t| json!(t.to_string())),
            Component::Parameters => obs
                .parameters
                .clone()
                .map_or(Value::Null, Value::Object),
        }
    }
}

/// Columns populated by an observation. `Result` is always included.
pub fn defined_components(obs: &Observation) -> BTreeSet<Component> {
    let mut set = BTreeSet::new();
    set.insert(Component::Result);
    if obs.phenomenon_time.is_some() {
        set.insert(Component::PhenomenonTime);
    }
    if obs.result_time.is_some() {
        set.insert(Component::ResultTime);
    }
    if obs.result_quality.is_some() {
        set.insert(Component::ResultQuality);
    }
    if obs.parameters.is_some() {
        set.insert(Component::Parameters);
    }
    if obs.valid_time.is_some() {
        set.insert(Component::ValidTime);
    }
    set
}

/// Observations of one stream waiting to be sent as a DataArray.
///
/// The column set is fixed when the batch is created. Observations with a
/// different shape are still appended: missing columns render as `null`
/// and extra ones are left out of the payload.
#[derive(Debug, Clone)]
pub struct DataArrayValue {
    stream: StreamRef,
    components: BTreeSet<Component>,
    observations: Vec<Observation>,
    shape_mismatches: usize,
}

impl DataArrayValue {
    /// Create an empty batch for `stream` with a fixed column set.
    pub fn new(stream: StreamRef, components: BTreeSet<Component>) -> Self {
        Self {
            stream,
            components,
            observations: Vec::new(),
            shape_mismatches: 0,
        }
    }

    /// Append an observation to the batch.
    pub fn add_observation(&mut self, obs: Observation) {
        if defined_components(&obs) != self.components {
            self.shape_mismatches += 1;
            tracing::debug!(
                "Observation for {} does not match batch columns {:?}",
                self.stream,
                self.component_names()
            );
        }
        self.observations.push(obs);
    }

    pub fn stream(&self) -> &StreamRef {
        &self.stream
    }

    pub fn components(&self) -> &BTreeSet<Component> {
        &self.components
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    /// Observations in insertion order.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Number of appended observations whose shape differed from the columns.
    pub fn shape_mismatches(&self) -> usize {
        self.shape_mismatches
    }

    /// Render this batch as one DataArray entry.
    pub fn to_json(&self) -> Value {
        let rows: Vec<Value> = self
            .observations
            .iter()
            .map(|obs| Value::Array(self.components.iter().map(|c| c.cell(obs)).collect()))
            .collect();

        let mut obj = Map::new();
        obj.insert(
            self.stream.entity_name().into(),
            json!({ "@iot.id": self.stream.id().to_json() }),
        );
        obj.insert("components".into(), json!(self.component_names()));
        obj.insert("dataArray@iot.count".into(), json!(rows.len()));
        obj.insert("dataArray".into(), Value::Array(rows));
        Value::Object(obj)
    }
}

/// The body of a bulk create: every pending batch, in creation order.
#[derive(Debug, Clone, Copy)]
pub struct DataArrayDocument<'a> {
    values: &'a [DataArrayValue],
}

impl<'a> DataArrayDocument<'a> {
    pub fn new(values: &'a [DataArrayValue]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &'a [DataArrayValue] {
        self.values
    }

    /// Total number of observations across all batches.
    ///
    /// The service answers with one result per observation, in this order.
    pub fn observation_count(&self) -> usize {
        self.values.iter().map(DataArrayValue::len).sum()
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.values.iter().map(DataArrayValue::to_json).collect())
    }
}
