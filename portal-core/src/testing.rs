use crate::error::Result;
use crate::transport::Transport;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Transport answering from a queue; once drained it keeps repeating
/// `fallback`.
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<serde_json::Value>>>,
    fallback: Result<serde_json::Value>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    bearers: Mutex<Vec<Option<String>>>,
    bodies: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: Vec<Result<serde_json::Value>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: Ok(serde_json::Value::Null),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            bearers: Mutex::new(Vec::new()),
            bodies: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_fallback(mut self, fallback: Result<serde_json::Value>) -> Self {
        self.fallback = fallback;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn bearers(&self) -> Vec<Option<String>> {
        self.bearers.lock().expect("lock").clone()
    }

    pub(crate) fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().expect("lock").clone()
    }

    fn respond<'a>(&'a self, bearer: Option<&'a str>) -> BoxFuture<'a, Result<serde_json::Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bearers
            .lock()
            .expect("lock")
            .push(bearer.map(ToString::to_string));
        let next = self
            .responses
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        let delay = self.delay;
        let in_flight = Arc::clone(&self.in_flight);
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
            next
        }
        .boxed()
    }
}

impl Transport for ScriptedTransport {
    fn get_json<'a>(
        &'a self,
        _endpoint: &'a str,
        bearer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<serde_json::Value>> {
        self.respond(bearer)
    }

    fn post_json<'a>(
        &'a self,
        _endpoint: &'a str,
        bearer: Option<&'a str>,
        body: serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value>> {
        self.bodies.lock().expect("lock").push(body);
        self.respond(bearer)
    }
}
