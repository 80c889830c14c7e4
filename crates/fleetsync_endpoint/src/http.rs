//! HTTP client abstraction.
//!
//! The panel adapter is generic over this trait so that the engine and
//! its tests never depend on a concrete HTTP library; callers plug in
//! reqwest, ureq, or a scripted fake. Implementations are expected to
//! carry the panel's cookie session across calls.

use serde_json::Value;

/// Minimal blocking HTTP surface the panel adapter needs.
///
/// All methods return the response body on success. The `Err` string is
/// a transport-level failure (connect, timeout, TLS); HTTP-level status
/// handling is left to the implementation, which should surface error
/// statuses as `Err` too.
pub trait HttpClient: Send + Sync {
    /// Sends a POST with form-encoded fields.
    fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<String, String>;

    /// Sends a POST with a JSON body.
    fn post_json(&self, url: &str, body: &Value) -> Result<String, String>;

    /// Sends a GET.
    fn get(&self, url: &str) -> Result<String, String>;
}
