//! In-memory transport with call recording for tests

use async_trait::async_trait;
use reqwest::Method;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::client::{HttpResponse, Transport};
use crate::auth::Credentials;
use crate::error::Result;

/// Recorded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub authenticated: bool,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<RecordedCall>,
    routes: HashMap<(Method, String), HttpResponse>,
}

/// Transport answering from scripted routes; unknown routes return 404.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, url: &str, status: u16, body: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert((method, url.to_string()), HttpResponse::new(status, body));
    }

    pub fn respond_json(&self, url: &str, body: serde_json::Value) {
        self.respond(Method::GET, url, 200, body.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_with(&self, method: &Method) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| &call.method == method)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(
        &self,
        method: Method,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<HttpResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            method: method.clone(),
            url: url.to_string(),
            authenticated: credentials.is_some(),
        });

        Ok(state
            .routes
            .get(&(method, url.to_string()))
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, "")))
    }
}
