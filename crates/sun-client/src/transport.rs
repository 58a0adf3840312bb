//! Node transport
//!
//! Every node interaction is a JSON POST to a fixed path on either the
//! full node (live state) or the solidity node (confirmed state).

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use sun_core::{Result, SunError};
use url::Url;

/// Which node a request goes to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Live state
    Full,
    /// Confirmed state
    Solidity,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Solidity => f.write_str("solidity"),
        }
    }
}

/// JSON POST seam to the ledger nodes
#[async_trait]
pub trait NodeTransport: Send + Sync {
    async fn post(&self, node: NodeKind, path: &str, payload: Value) -> Result<Value>;
}

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed transport
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    full_node: Url,
    solidity_node: Url,
}

impl HttpTransport {
    /// Transport against two node base URLs
    pub fn new(full_node: &str, solidity_node: &str) -> Result<Self> {
        Self::with_options(full_node, solidity_node, &HashMap::new(), DEFAULT_TIMEOUT)
    }

    /// Transport with extra headers (e.g. an API key) and a request timeout
    pub fn with_options(
        full_node: &str,
        solidity_node: &str,
        headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SunError::Configuration(format!("Invalid header {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| SunError::Configuration(format!("Invalid header value: {}", e)))?;
            header_map.insert(name, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(header_map)
            .build()
            .map_err(|e| SunError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            full_node: parse_base(full_node)?,
            solidity_node: parse_base(solidity_node)?,
        })
    }

    fn base(&self, node: NodeKind) -> &Url {
        match node {
            NodeKind::Full => &self.full_node,
            NodeKind::Solidity => &self.solidity_node,
        }
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)
        .map_err(|e| SunError::Configuration(format!("Invalid node url {}: {}", raw, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl NodeTransport for HttpTransport {
    async fn post(&self, node: NodeKind, path: &str, payload: Value) -> Result<Value> {
        let url = self
            .base(node)
            .join(path.trim_start_matches('/'))
            .map_err(|e| SunError::Configuration(format!("Invalid path {}: {}", path, e)))?;

        tracing::debug!(%node, %url, "POST");

        let response = self
            .client
            .post(url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| SunError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, %status, "node returned error status");
            return Err(SunError::Transport(format!("{} returned {}", url, status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SunError::Transport(e.to_string()))?;

        // some endpoints answer an empty body instead of `{}`
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Value::Object(Default::default()));
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use recording::{RecordedRequest, RecordingTransport};

#[cfg(any(test, feature = "test-util"))]
mod recording {
    use std::collections::{HashMap, VecDeque};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Value;
    use sun_core::{Result, SunError};

    use super::{NodeKind, NodeTransport};

    /// A request seen by [`RecordingTransport`]
    #[derive(Clone, Debug, PartialEq)]
    pub struct RecordedRequest {
        pub node: NodeKind,
        pub path: String,
        pub payload: Value,
    }

    /// In-memory transport that records requests and replays scripted responses
    ///
    /// Responses are queued per path. When a path's queue runs dry the
    /// fallback for that path is returned, if one was set.
    #[derive(Debug, Default)]
    pub struct RecordingTransport {
        requests: Mutex<Vec<RecordedRequest>>,
        queued: Mutex<HashMap<String, VecDeque<Value>>>,
        fallback: Mutex<HashMap<String, Value>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue one response for `path`
        pub fn respond(&self, path: &str, response: Value) -> &Self {
            self.queued
                .lock()
                .entry(path.to_string())
                .or_default()
                .push_back(response);
            self
        }

        /// Response for `path` once its queue is empty
        pub fn respond_always(&self, path: &str, response: Value) -> &Self {
            self.fallback.lock().insert(path.to_string(), response);
            self
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().clone()
        }

        /// Requests sent to `path`, in order
        pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
            self.requests
                .lock()
                .iter()
                .filter(|r| r.path == path)
                .cloned()
                .collect()
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    #[async_trait]
    impl NodeTransport for RecordingTransport {
        async fn post(&self, node: NodeKind, path: &str, payload: Value) -> Result<Value> {
            self.requests.lock().push(RecordedRequest {
                node,
                path: path.to_string(),
                payload,
            });

            if let Some(response) = self.queued.lock().get_mut(path).and_then(VecDeque::pop_front) {
                return Ok(response);
            }
            self.fallback
                .lock()
                .get(path)
                .cloned()
                .ok_or_else(|| SunError::Transport(format!("no scripted response for {}", path)))
        }
    }
}
