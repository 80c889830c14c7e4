//! reqwest-backed HTTP client for panel endpoints.

use fleetsync_endpoint::HttpClient;
use serde_json::Value;
use std::time::Duration;

/// Blocking HTTP client with a cookie jar for the panel session.
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Ok(Self { inner })
    }
}

impl HttpClient for ReqwestClient {
    fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<String, String> {
        let form: Vec<(&str, &str)> = fields.to_vec();
        self.inner
            .post(url)
            .form(&form)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(|e| e.to_string())
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<String, String> {
        self.inner
            .post(url)
            .json(body)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(|e| e.to_string())
    }

    fn get(&self, url: &str) -> Result<String, String> {
        self.inner
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(|e| e.to_string())
    }
}
