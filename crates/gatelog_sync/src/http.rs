//! HTTP remote table implementation.
//!
//! Speaks the PostgREST dialect the hosted mirror exposes. The actual
//! HTTP client is abstracted via a trait to allow different
//! implementations (reqwest, ureq, etc.).

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::{Condition, Filter, RemoteTable};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A single outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method (`POST`, `PATCH`, `DELETE`).
    pub method: &'static str,
    /// Fully assembled URL, query string included.
    pub url: String,
    /// Headers to send, in order.
    pub headers: Vec<(String, String)>,
    /// JSON body, absent for DELETE.
    pub body: Option<String>,
    /// Per-request deadline the client must enforce.
    pub timeout: Duration,
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. This
/// allows using different HTTP libraries or a loopback double in tests.
pub trait HttpClient: Send + Sync {
    /// Sends one request and returns the response, however the server
    /// answered. `Err` is reserved for transport-level failures where
    /// no response arrived.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, String>;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool;
}

/// Connection settings for the hosted mirror.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the project (e.g. `https://xyz.example.co`).
    pub base_url: String,
    /// API key, sent both as `apikey` and bearer token.
    pub api_key: String,
    /// Target table name.
    pub table: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl RemoteConfig {
    /// Settings for the default `security_logs` table.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            table: "security_logs".to_string(),
            timeout: SyncConfig::default().request_timeout,
        }
    }

    /// Overrides the target table.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Overrides the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`RemoteTable`] over a PostgREST endpoint.
pub struct HttpRemoteTable<C: HttpClient> {
    config: RemoteConfig,
    client: C,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpRemoteTable<C> {
    /// Creates a remote table over the given client.
    pub fn new(config: RemoteConfig, client: C) -> Self {
        Self {
            config,
            client,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Whether the last request (if any) reached the server.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn table_url(&self, filter: Option<&Filter>) -> String {
        let mut url = format!("{}/rest/v1/{}", self.config.base_url, self.config.table);
        if let Some(filter) = filter {
            let query = query_string(filter);
            if !query.is_empty() {
                url.push('?');
                url.push_str(&query);
            }
        }
        url
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("apikey".to_string(), self.config.api_key.clone()),
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.config.api_key),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Prefer".to_string(), "return=minimal".to_string()),
        ]
    }

    fn execute(
        &self,
        method: &'static str,
        filter: Option<&Filter>,
        body: Option<&Value>,
    ) -> SyncResult<()> {
        if !self.client.is_healthy() {
            return Err(SyncError::Transport("http client is offline".to_string()));
        }

        let request = HttpRequest {
            method,
            url: self.table_url(filter),
            headers: self.headers(),
            body: body.map(Value::to_string),
            timeout: self.config.timeout,
        };

        let response = self.client.send(&request).map_err(|e| {
            *self.last_error.write() = Some(e.clone());
            self.connected.store(false, Ordering::SeqCst);
            if e.to_ascii_lowercase().contains("timed out") {
                SyncError::Timeout
            } else {
                SyncError::Transport(e)
            }
        })?;

        self.connected.store(true, Ordering::SeqCst);
        *self.last_error.write() = None;

        match response.status {
            200..=299 => Ok(()),
            401 | 403 => Err(SyncError::Auth(format!(
                "remote rejected credentials (status {})",
                response.status
            ))),
            status => Err(SyncError::Remote {
                status,
                message: String::from_utf8_lossy(&response.body).into_owned(),
            }),
        }
    }
}

impl<C: HttpClient> RemoteTable for HttpRemoteTable<C> {
    fn insert(&self, row: &Value) -> SyncResult<()> {
        self.execute("POST", None, Some(row))
    }

    fn update(&self, filter: &Filter, patch: &Value) -> SyncResult<()> {
        self.execute("PATCH", Some(filter), Some(patch))
    }

    fn delete(&self, filter: &Filter) -> SyncResult<()> {
        self.execute("DELETE", Some(filter), None)
    }
}

fn query_string(filter: &Filter) -> String {
    filter
        .conditions
        .iter()
        .map(|c| match c {
            Condition::Eq(column, value) => format!("{column}=eq.{}", percent_encode(value)),
            Condition::IsNull(column) => format!("{column}=is.null"),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    struct ScriptedClient {
        requests: Mutex<Vec<HttpRequest>>,
        responses: Mutex<Vec<Result<HttpResponse, String>>>,
        healthy: AtomicBool,
    }

    impl ScriptedClient {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(Vec::new()),
                healthy: AtomicBool::new(true),
            }
        }

        fn respond(&self, status: u16, body: &str) {
            self.responses.lock().push(Ok(HttpResponse {
                status,
                body: body.as_bytes().to_vec(),
            }));
        }

        fn fail(&self, message: &str) {
            self.responses.lock().push(Err(message.to_string()));
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().clone()
        }
    }

    impl HttpClient for ScriptedClient {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
            self.requests.lock().push(request.clone());
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                Ok(HttpResponse {
                    status: 204,
                    body: Vec::new(),
                })
            } else {
                responses.remove(0)
            }
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }
    }

    fn table() -> HttpRemoteTable<ScriptedClient> {
        HttpRemoteTable::new(
            RemoteConfig::new("https://mirror.example.co", "test-key"),
            ScriptedClient::new(),
        )
    }

    fn client(table: &HttpRemoteTable<ScriptedClient>) -> &ScriptedClient {
        &table.client
    }

    #[test]
    fn insert_posts_row_to_table_endpoint() {
        let table = table();
        table.insert(&json!({"plate": "34 ABC 123"})).unwrap();

        let requests = client(&table).requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(
            requests[0].url,
            "https://mirror.example.co/rest/v1/security_logs"
        );
        assert_eq!(
            requests[0].body.as_deref(),
            Some(r#"{"plate":"34 ABC 123"}"#)
        );
    }

    #[test]
    fn auth_headers_carry_the_api_key() {
        let table = table();
        table.insert(&json!({})).unwrap();

        let headers = client(&table).requests()[0].headers.clone();
        assert!(headers.contains(&("apikey".to_string(), "test-key".to_string())));
        assert!(headers.contains(&(
            "Authorization".to_string(),
            "Bearer test-key".to_string()
        )));
    }

    #[test]
    fn update_encodes_filter_in_query_string() {
        let table = table();
        let filter = Filter::new().eq("created_at", "2026-08-30T10:00:00.000+00:00");
        table.update(&filter, &json!({"host": "Ops"})).unwrap();

        let request = &client(&table).requests()[0];
        assert_eq!(request.method, "PATCH");
        assert_eq!(
            request.url,
            "https://mirror.example.co/rest/v1/security_logs?created_at=eq.2026-08-30T10%3A00%3A00.000%2B00%3A00"
        );
    }

    #[test]
    fn delete_sends_no_body() {
        let table = table();
        let filter = Filter::new().eq("created_at", "t1").is_null("exit_at");
        table.delete(&filter).unwrap();

        let request = &client(&table).requests()[0];
        assert_eq!(request.method, "DELETE");
        assert_eq!(
            request.url,
            "https://mirror.example.co/rest/v1/security_logs?created_at=eq.t1&exit_at=is.null"
        );
        assert_eq!(request.body, None);
    }

    #[test]
    fn auth_failure_maps_to_auth_error() {
        let table = table();
        client(&table).respond(401, "bad key");
        let err = table.insert(&json!({})).unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
    }

    #[test]
    fn server_error_carries_status_and_body() {
        let table = table();
        client(&table).respond(500, "boom");
        match table.insert(&json!({})).unwrap_err() {
            SyncError::Remote { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn transport_failure_marks_disconnected() {
        let table = table();
        client(&table).fail("connection refused");
        let err = table.insert(&json!({})).unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
        assert!(!table.is_connected());
        assert_eq!(table.last_error().as_deref(), Some("connection refused"));

        // Next success clears the flag.
        table.insert(&json!({})).unwrap();
        assert!(table.is_connected());
        assert_eq!(table.last_error(), None);
    }

    #[test]
    fn timeouts_map_to_the_timeout_error() {
        let table = table();
        client(&table).fail("request timed out after 10s");
        assert!(matches!(
            table.insert(&json!({})).unwrap_err(),
            SyncError::Timeout
        ));
    }

    #[test]
    fn offline_client_fails_without_sending() {
        let table = table();
        client(&table).healthy.store(false, Ordering::SeqCst);
        assert!(table.insert(&json!({})).is_err());
        assert!(client(&table).requests().is_empty());
    }
}
