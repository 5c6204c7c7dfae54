//! HTTP client for the slskd REST API
//!
//! One `HttpClient` is built per run and passed by reference to every
//! component. All requests carry JSON content headers and, when configured,
//! the `X-API-Key` header.

use crate::error::{AcquireError, Result};
use crate::output;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::time::Duration;

/// Default HTTP timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: Option<String>,
}

impl HttpClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        let mut request = self
            .agent
            .request(method, url)
            .set("Content-Type", "application/json")
            .set("Accept", "application/json");

        if let Some(key) = &self.api_key {
            request = request.set(API_KEY_HEADER, key);
        }

        request
    }

    /// Send a request and return the raw body of a 2xx response.
    ///
    /// Non-2xx responses become `RemoteStatus`; the body is logged at debug
    /// level and kept on the error.
    pub fn send<B: Serialize>(&self, method: &str, endpoint: &str, body: Option<&B>) -> Result<String> {
        let url = self.url(endpoint);
        let request = self.request(method, &url);

        let response = match body {
            Some(payload) => request.send_json(payload),
            None => request.call(),
        };

        match response {
            Ok(resp) => read_body(resp).map_err(|e| AcquireError::Transport {
                url: url.clone(),
                message: format!("failed to read response body: {}", e),
            }),
            Err(ureq::Error::Status(status, resp)) => {
                let body = read_body(resp).unwrap_or_default();
                output::debug(&format!("full response: {}", body));
                Err(AcquireError::RemoteStatus { status, url, body })
            }
            Err(ureq::Error::Transport(t)) => Err(AcquireError::Transport {
                url,
                message: t.to_string(),
            }),
        }
    }

    pub fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let body = self.send::<()>("GET", endpoint, None)?;
        parse_response(&self.url(endpoint), &body)
    }

    pub fn post_json<B: Serialize, T: DeserializeOwned>(&self, endpoint: &str, payload: &B) -> Result<T> {
        let body = self.send("POST", endpoint, Some(payload))?;
        parse_response(&self.url(endpoint), &body)
    }

    /// POST where the response body is irrelevant.
    pub fn post<B: Serialize>(&self, endpoint: &str, payload: &B) -> Result<()> {
        self.send("POST", endpoint, Some(payload)).map(|_| ())
    }

    pub fn delete(&self, endpoint: &str) -> Result<()> {
        self.send::<()>("DELETE", endpoint, None).map(|_| ())
    }
}

/// Read the whole body. `Response::into_string` stops at 10 MB, which search
/// responses for popular queries exceed.
fn read_body(resp: ureq::Response) -> std::io::Result<String> {
    let mut body = String::new();
    resp.into_reader().read_to_string(&mut body)?;
    Ok(body)
}

/// Decode a JSON body, logging the raw body when it does not parse.
pub fn parse_response<T: DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| {
        output::debug(&format!("full response: {}", body));
        AcquireError::Decode {
            url: url.to_string(),
            source,
        }
    })
}
