// src/api_handler.rs

use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::warn;

const MAX_ATTEMPTS: u32 = 3;

/// Blocking HTTP client shared by the remote collaborators. Retries
/// rate-limited requests, honoring `Retry-After` when the server sends one.
pub struct ApiHandler {
    client: Client,
    base_url: String,
}

impl ApiHandler {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("peptide-predictor/0.1"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn get_json(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        self.send_with_retry(|| self.client.get(&url).query(query))
    }

    pub fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        self.send_with_retry(|| self.client.post(&url).json(body))
    }

    fn send_with_retry<F>(&self, build: F) -> Result<Value>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempts = 0;
        loop {
            let response = build().send()?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.json()?);
            }
            if status == StatusCode::TOO_MANY_REQUESTS {
                attempts += 1;
                if attempts >= MAX_ATTEMPTS {
                    bail!("exceeded {MAX_ATTEMPTS} attempts against rate-limited endpoint");
                }
                let wait = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!("rate limited, retrying in {wait} s");
                thread::sleep(Duration::from_secs(wait));
                continue;
            }

            let body = response.text().unwrap_or_default();
            bail!("request failed with status {status}: {body}");
        }
    }
}
