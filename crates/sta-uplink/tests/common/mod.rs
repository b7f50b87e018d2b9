// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Recording doubles for the service client and the pub/sub transport.

#![allow(dead_code)]

use parking_lot::Mutex;
use sta_uplink::{
    AuthConfig, ConnectOptions, ConnectionEvents, DataArrayDocument, EntityId, Listener,
    Observation, ServiceClient, ServiceError, Thing, Transport, TransportError, TransportFactory,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use url::Url;

// ============================================================================
// Service
// ============================================================================

/// What the fake service has seen.
#[derive(Default)]
pub struct ServiceLog {
    pub created: Vec<Observation>,
    pub updated: Vec<Observation>,
    pub bulk_documents: Vec<serde_json::Value>,
    /// Canned answers for the next bulk requests; default is all success.
    pub bulk_answers: VecDeque<Result<Vec<String>, ServiceError>>,
}

#[derive(Clone, Default)]
pub struct FakeService(pub Arc<Mutex<ServiceLog>>);

impl FakeService {
    pub fn answer_next_bulk(&self, answer: Result<Vec<String>, ServiceError>) {
        self.0.lock().bulk_answers.push_back(answer);
    }
}

impl ServiceClient for FakeService {
    fn configure(&mut self, _: &Url, _: Option<&AuthConfig>) -> Result<(), ServiceError> {
        Ok(())
    }

    fn create(&mut self, obs: &Observation) -> Result<EntityId, ServiceError> {
        let mut log = self.0.lock();
        log.created.push(obs.clone());
        Ok(EntityId::Number(log.created.len() as i64))
    }

    fn update(&mut self, obs: &Observation) -> Result<(), ServiceError> {
        self.0.lock().updated.push(obs.clone());
        Ok(())
    }

    fn create_bulk(&mut self, doc: &DataArrayDocument<'_>) -> Result<Vec<String>, ServiceError> {
        let mut log = self.0.lock();
        log.bulk_documents.push(doc.to_json());
        match log.bulk_answers.pop_front() {
            Some(answer) => answer,
            None => Ok((1..=doc.observation_count())
                .map(|i| format!("http://sta/v1.1/Observations({i})"))
                .collect()),
        }
    }

    fn things(&mut self) -> Result<Vec<Thing>, ServiceError> {
        Ok(vec![Thing {
            id: EntityId::Number(1),
            name: "Station".into(),
            description: String::new(),
            properties: None,
        }])
    }
}

// ============================================================================
// Transport
// ============================================================================

/// One wire call made by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireCall {
    Subscribe(String),
    Unsubscribe(String),
    Disconnect,
}

#[derive(Default)]
pub struct MockTransport {
    pub connected: AtomicBool,
    pub calls: Mutex<Vec<WireCall>>,
    /// Topics whose subscribe calls fail.
    pub failing_topics: Mutex<HashSet<String>>,
    /// Listeners currently installed per topic.
    pub installed: Mutex<Vec<(String, Listener)>>,
}

impl MockTransport {
    pub fn calls(&self) -> Vec<WireCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn fail_topic(&self, topic: &str) {
        self.failing_topics.lock().insert(topic.to_string());
    }

    pub fn drop_link(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn restore_link(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Deliver a message through the most recently installed listener.
    pub fn publish(&self, topic: &str, payload: &[u8]) {
        let listener = self
            .installed
            .lock()
            .iter()
            .rev()
            .find(|(t, _)| t == topic)
            .map(|(_, l)| Arc::clone(l));
        if let Some(listener) = listener {
            listener.message_arrived(topic, payload);
        }
    }
}

impl Transport for MockTransport {
    fn connect(&self, _: &ConnectOptions) -> Result<(), TransportError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&self, topic: &str, listener: Listener) -> Result<(), TransportError> {
        self.calls
            .lock()
            .push(WireCall::Subscribe(topic.to_string()));
        if self.failing_topics.lock().contains(topic) {
            return Err(TransportError::Subscribe {
                topic: topic.to_string(),
                reason: "not authorized".into(),
            });
        }
        self.installed.lock().push((topic.to_string(), listener));
        Ok(())
    }

    fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.calls
            .lock()
            .push(WireCall::Unsubscribe(topic.to_string()));
        self.installed.lock().retain(|(t, _)| t != topic);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        self.calls.lock().push(WireCall::Disconnect);
        Ok(())
    }
}

/// Hands out [`MockTransport`]s and keeps their callbacks.
#[derive(Default)]
pub struct MockFactory {
    pub created: Mutex<Vec<Created>>,
}

#[derive(Clone)]
pub struct Created {
    pub server_uri: String,
    pub client_id: String,
    pub transport: Arc<MockTransport>,
    pub events: Arc<dyn ConnectionEvents>,
}

impl MockFactory {
    pub fn last(&self) -> Created {
        self.created.lock().last().cloned().expect("no transport created")
    }

    pub fn count(&self) -> usize {
        self.created.lock().len()
    }
}

impl TransportFactory for MockFactory {
    fn create(
        &self,
        server_uri: &str,
        client_id: &str,
        events: Arc<dyn ConnectionEvents>,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        let transport = Arc::new(MockTransport::default());
        self.created.lock().push(Created {
            server_uri: server_uri.to_string(),
            client_id: client_id.to_string(),
            transport: Arc::clone(&transport),
            events,
        });
        Ok(transport as Arc<dyn Transport>)
    }
}

// ============================================================================
// Logs
// ============================================================================

/// Captures formatted log output for assertions.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with logs at `filter` captured into the returned buffer.
pub fn capture_logs<R>(filter: &str, f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(buffer.clone())
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}
