//! Scripted transport and helpers shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::Notify;

use crate::api::transport::{HttpRequest, HttpResponse, Transport};
use crate::api::ApiError;

pub const BASE_URL: &str = "http://test.local";

#[derive(Clone)]
enum Reply {
    Respond(u16, String),
    NetworkDown,
}

/// Transport answering from per-route scripts.
///
/// `reply` queues a one-shot answer; `always` sets the answer used once the
/// queue for that route is empty. Unscripted routes answer 404. `hold`
/// makes the next call to a route wait until the returned `Notify` fires.
#[derive(Default)]
pub struct MockTransport {
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    sticky: Mutex<HashMap<String, Reply>>,
    held: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<HttpRequest>>,
}

fn route_key(method: &str, path: &str) -> String {
    format!("{} {}", method, path)
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, method: &str, path: &str, status: u16, body: Value) {
        self.queued
            .lock()
            .unwrap()
            .entry(route_key(method, path))
            .or_default()
            .push_back(Reply::Respond(status, body.to_string()));
    }

    pub fn always(&self, method: &str, path: &str, status: u16, body: Value) {
        self.always_raw(method, path, status, &body.to_string());
    }

    pub fn always_raw(&self, method: &str, path: &str, status: u16, body: &str) {
        self.sticky
            .lock()
            .unwrap()
            .insert(route_key(method, path), Reply::Respond(status, body.to_string()));
    }

    pub fn fail(&self, method: &str, path: &str) {
        self.sticky
            .lock()
            .unwrap()
            .insert(route_key(method, path), Reply::NetworkDown);
    }

    pub fn hold(&self, method: &str, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.held
            .lock()
            .unwrap()
            .insert(route_key(method, path), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        let url = format!("{}{}", BASE_URL, path);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.url == url)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .to_string();
        let key = route_key(request.method.as_str(), &path);
        self.calls.lock().unwrap().push(request);

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|q| q.pop_front());
        let reply = queued.or_else(|| self.sticky.lock().unwrap().get(&key).cloned());

        let gate = self.held.lock().unwrap().remove(&key);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match reply {
            Some(Reply::Respond(status, body)) => Ok(HttpResponse {
                status: StatusCode::from_u16(status).unwrap(),
                body,
            }),
            Some(Reply::NetworkDown) => Err(ApiError::NetworkError(format!(
                "connection refused: {}",
                key
            ))),
            None => Ok(HttpResponse {
                status: StatusCode::NOT_FOUND,
                body: format!(r#"{{"detail": "no route for {}"}}"#, key),
            }),
        }
    }
}
