//! Panel HTTP adapter.
//!
//! Speaks the management API of the proxy panels in the fleet:
//!
//! - `POST {base}/login` - form credentials, cookie-based session
//! - `GET {base}/panel/api/inbounds/get/{id}` - inbound details; the
//!   `settings` field is a JSON document encoded as a string, containing
//!   `{"clients": [...]}`
//! - `POST {base}/panel/api/inbounds/addClient` - payload `{id, settings}`
//!   with `settings` JSON-encoded the same way
//!
//! Every response carries a `{success, msg, obj}` envelope. The session
//! is established lazily and re-established once if a call is rejected
//! mid-run (an expired session answers with the login page instead of
//! JSON).

use crate::endpoint::ServerEndpoint;
use crate::error::{EndpointError, EndpointResult};
use crate::http::HttpClient;
use fleetsync_model::ClientRecord;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use url::{form_urlencoded, Url};

/// Login credentials for one panel.
#[derive(Debug, Clone)]
pub struct PanelCredentials {
    /// Panel account name.
    pub username: String,
    /// Panel account password.
    pub password: String,
}

impl PanelCredentials {
    /// Creates a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Response envelope every panel endpoint returns.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    obj: Option<Value>,
}

/// The `settings` document of an inbound (JSON-encoded string on the wire).
#[derive(Debug, Default, Deserialize)]
struct InboundSettings {
    #[serde(default)]
    clients: Vec<ClientRecord>,
}

/// A [`ServerEndpoint`] backed by the panel HTTP API.
///
/// Generic over [`HttpClient`] so the transport can be a real HTTP
/// library or a scripted fake. The implementation must carry cookies
/// across calls; this adapter owns the login dance.
pub struct PanelEndpoint<C: HttpClient> {
    name: String,
    base_url: String,
    credentials: PanelCredentials,
    client: C,
    session_active: AtomicBool,
}

impl<C: HttpClient> PanelEndpoint<C> {
    /// Creates an endpoint for one panel. No network access happens until
    /// the first call; login is lazy.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        credentials: PanelCredentials,
        client: C,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            client,
            session_active: AtomicBool::new(false),
        }
    }

    /// Returns the server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the panel base URL (without trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn login(&self) -> EndpointResult<()> {
        let url = format!("{}/login", self.base_url);
        let body = self
            .client
            .post_form(
                &url,
                &[
                    ("username", &self.credentials.username),
                    ("password", &self.credentials.password),
                ],
            )
            .map_err(EndpointError::unreachable)?;

        let envelope: ApiEnvelope = serde_json::from_str(&body)
            .map_err(|e| EndpointError::AuthFailed(format!("malformed login response: {}", e)))?;

        if !envelope.success {
            return Err(EndpointError::AuthFailed(envelope.msg));
        }

        self.session_active.store(true, Ordering::SeqCst);
        debug!(server = %self.name, "panel login succeeded");
        Ok(())
    }

    fn ensure_session(&self) -> EndpointResult<()> {
        if self.session_active.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.login()
    }

    /// Runs an API call under a live session, re-logging-in once if the
    /// session was rejected mid-run.
    fn with_session<T>(&self, op: impl Fn(&Self) -> EndpointResult<T>) -> EndpointResult<T> {
        self.ensure_session()?;
        match op(self) {
            Err(e) if e.is_auth() => {
                warn!(server = %self.name, "session rejected, re-logging in");
                self.session_active.store(false, Ordering::SeqCst);
                self.login()?;
                op(self)
            }
            other => other,
        }
    }

    fn parse_envelope(&self, body: &str) -> EndpointResult<ApiEnvelope> {
        // An expired session answers with the login page, not JSON.
        serde_json::from_str(body)
            .map_err(|_| EndpointError::AuthFailed("session rejected (non-JSON response)".into()))
    }

    fn fetch_inbound(&self, inbound_id: u32) -> EndpointResult<Value> {
        let url = format!("{}/panel/api/inbounds/get/{}", self.base_url, inbound_id);
        let body = self.client.get(&url).map_err(EndpointError::unreachable)?;

        let envelope = self.parse_envelope(&body)?;
        if !envelope.success {
            return Err(EndpointError::Api(envelope.msg));
        }
        envelope
            .obj
            .ok_or_else(|| EndpointError::Api("inbound response missing object".into()))
    }

    fn clients_of(&self, inbound: &Value) -> EndpointResult<Vec<ClientRecord>> {
        let settings = match inbound.get("settings").and_then(Value::as_str) {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };
        let parsed: InboundSettings = serde_json::from_str(settings)
            .map_err(|e| EndpointError::Api(format!("malformed inbound settings: {}", e)))?;
        Ok(parsed.clients)
    }

    fn push_client(&self, inbound_id: u32, record: &ClientRecord) -> EndpointResult<()> {
        let settings = serde_json::to_string(&json!({ "clients": [record] }))
            .map_err(|e| EndpointError::Api(format!("failed to encode client: {}", e)))?;
        let payload = json!({ "id": inbound_id, "settings": settings });

        let url = format!("{}/panel/api/inbounds/addClient", self.base_url);
        let body = self
            .client
            .post_json(&url, &payload)
            .map_err(EndpointError::unreachable)?;

        let envelope = self.parse_envelope(&body)?;
        if !envelope.success {
            return Err(EndpointError::Api(envelope.msg));
        }
        debug!(server = %self.name, identity = %record.raw_identity, "client pushed");
        Ok(())
    }

    fn build_access_url(&self, inbound: &Value, record: &ClientRecord) -> EndpointResult<String> {
        let parsed = Url::parse(&self.base_url)
            .map_err(|e| EndpointError::Api(format!("invalid base URL {}: {}", self.base_url, e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| EndpointError::Api(format!("base URL {} has no host", self.base_url)))?;

        let port = inbound.get("port").and_then(Value::as_u64).unwrap_or(443);

        let stream: Value = inbound
            .get("streamSettings")
            .and_then(Value::as_str)
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| json!({}));
        let reality = stream.get("realitySettings").cloned().unwrap_or_else(|| json!({}));
        let reality_keys = reality.get("settings").cloned().unwrap_or_else(|| json!({}));
        let sni = reality
            .get("serverNames")
            .and_then(|names| names.get(0))
            .and_then(Value::as_str)
            .unwrap_or("");

        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("type", stream.get("network").and_then(Value::as_str).unwrap_or("tcp"));
        query.append_pair(
            "security",
            stream.get("security").and_then(Value::as_str).unwrap_or("none"),
        );
        query.append_pair(
            "pbk",
            reality_keys.get("publicKey").and_then(Value::as_str).unwrap_or(""),
        );
        query.append_pair(
            "fp",
            reality_keys.get("fingerprint").and_then(Value::as_str).unwrap_or(""),
        );
        query.append_pair("sni", sni);
        // sid deliberately left empty
        query.append_pair("sid", "");
        query.append_pair(
            "spx",
            inbound.get("spiderX").and_then(Value::as_str).unwrap_or("/"),
        );

        let remark = inbound
            .get("remark")
            .and_then(Value::as_str)
            .unwrap_or(&self.name);
        let tag = format!("{}-{}", remark, record.raw_identity);

        Ok(format!(
            "vless://{}@{}:{}?{}#{}",
            record.credential_id,
            host,
            port,
            query.finish(),
            tag
        ))
    }
}

impl<C: HttpClient> ServerEndpoint for PanelEndpoint<C> {
    fn list_clients(&self, inbound_id: u32) -> EndpointResult<Vec<ClientRecord>> {
        self.with_session(|this| {
            let inbound = this.fetch_inbound(inbound_id)?;
            this.clients_of(&inbound)
        })
    }

    fn upsert_client(&self, inbound_id: u32, record: &ClientRecord) -> EndpointResult<()> {
        self.with_session(|this| this.push_client(inbound_id, record))
    }

    fn access_url(&self, inbound_id: u32, record: &ClientRecord) -> EndpointResult<String> {
        self.with_session(|this| {
            let inbound = this.fetch_inbound(inbound_id)?;
            this.build_access_url(&inbound, record)
        })
    }
}
