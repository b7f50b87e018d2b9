// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SensorThings entities handled by the uplink.
//!
//! Only the parts of the data model the uplink actually touches are
//! represented: observations (with their owning stream) and the things
//! returned by the read-only listing.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Identity of a SensorThings entity.
///
/// Servers use either numeric or string identifiers, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Numeric identifier (e.g. `42`).
    Number(i64),
    /// String identifier (e.g. `"ds-7"`).
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Number(n)
    }
}

impl From<i32> for EntityId {
    fn from(n: i32) -> Self {
        EntityId::Number(i64::from(n))
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId::Text(s)
    }
}

impl EntityId {
    pub(crate) fn to_json(&self) -> Value {
        match self {
            EntityId::Number(n) => json!(n),
            EntityId::Text(s) => json!(s),
        }
    }
}

/// A time instant or interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeValue {
    /// A single point in time.
    Instant(DateTime<Utc>),
    /// A closed interval, rendered as `start/end`.
    Interval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeValue::Instant(t) => write!(f, "{}", iso(t)),
            TimeValue::Interval { start, end } => write!(f, "{}/{}", iso(start), iso(end)),
        }
    }
}

impl From<DateTime<Utc>> for TimeValue {
    fn from(t: DateTime<Utc>) -> Self {
        TimeValue::Instant(t)
    }
}

pub(crate) fn iso(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Reference to the stream an observation belongs to.
///
/// This is the batching key: two observations pointing at the same
/// underlying stream always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamRef {
    /// A plain datastream.
    Datastream(EntityId),
    /// A composite (multi) datastream.
    MultiDatastream(EntityId),
}

impl StreamRef {
    /// Name of the navigation property in SensorThings payloads.
    pub fn entity_name(&self) -> &'static str {
        match self {
            StreamRef::Datastream(_) => "Datastream",
            StreamRef::MultiDatastream(_) => "MultiDatastream",
        }
    }

    /// Identity of the referenced stream.
    pub fn id(&self) -> &EntityId {
        match self {
            StreamRef::Datastream(id) | StreamRef::MultiDatastream(id) => id,
        }
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.entity_name(), self.id())
    }
}

/// A single sensor observation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    /// Server-side identity. Present only for observations that already exist.
    pub id: Option<EntityId>,
    pub datastream: Option<EntityId>,
    pub multi_datastream: Option<EntityId>,
    pub result: Value,
    pub phenomenon_time: Option<TimeValue>,
    pub result_time: Option<DateTime<Utc>>,
    pub result_quality: Option<Value>,
    pub valid_time: Option<TimeValue>,
    pub parameters: Option<Map<String, Value>>,
}

impl Observation {
    /// Create an observation carrying only a result.
    pub fn new(result: impl Into<Value>) -> Self {
        Self {
            result: result.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn for_datastream(mut self, id: impl Into<EntityId>) -> Self {
        self.datastream = Some(id.into());
        self
    }

    pub fn for_multi_datastream(mut self, id: impl Into<EntityId>) -> Self {
        self.multi_datastream = Some(id.into());
        self
    }

    pub fn with_phenomenon_time(mut self, time: impl Into<TimeValue>) -> Self {
        self.phenomenon_time = Some(time.into());
        self
    }

    pub fn with_result_time(mut self, time: DateTime<Utc>) -> Self {
        self.result_time = Some(time);
        self
    }

    pub fn with_result_quality(mut self, quality: impl Into<Value>) -> Self {
        self.result_quality = Some(quality.into());
        self
    }

    pub fn with_valid_time(mut self, time: TimeValue) -> Self {
        self.valid_time = Some(time);
        self
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// The stream this observation belongs to.
    ///
    /// A datastream reference takes precedence over a multi-datastream one.
    pub fn stream(&self) -> Option<StreamRef> {
        if let Some(id) = &self.datastream {
            return Some(StreamRef::Datastream(id.clone()));
        }
        self.multi_datastream
            .as_ref()
            .map(|id| StreamRef::MultiDatastream(id.clone()))
    }

    /// Render the observation as a SensorThings JSON entity.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        if let Some(id) = &self.id {
            obj.insert("@iot.id".into(), id.to_json());
        }
        if let Some(t) = &self.phenomenon_time {
            obj.insert("phenomenonTime".into(), json!(t.to_string()));
        }
        obj.insert("result".into(), self.result.clone());
        if let Some(t) = &self.result_time {
            obj.insert("resultTime".into(), json!(iso(t)));
        }
        if let Some(q) = &self.result_quality {
            obj.insert("resultQuality".into(), q.clone());
        }
        if let Some(t) = &self.valid_time {
            obj.insert("validTime".into(), json!(t.to_string()));
        }
        if let Some(p) = &self.parameters {
            obj.insert("parameters".into(), Value::Object(p.clone()));
        }
        if let Some(stream) = self.stream() {
            obj.insert(
                stream.entity_name().into(),
                json!({ "@iot.id": stream.id().to_json() }),
            );
        }
        Value::Object(obj)
    }
}

/// A Thing as returned by the service's listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    #[serde(rename = "@iot.id")]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}
