//! Remote data store client: fetches the crop profile and uploads telemetry
//! over the Supabase-style REST interface.
//!
//! ```text
//! GET  {base}/optimum_conditions?garden_id=eq.<id>&select=*   → 200 [record, ..]
//! POST {base}/garden_logs   <LogEntry json>                    → 200 | 201
//! ```
//!
//! Every request carries `apikey`, `Authorization: Bearer`, and
//! `Content-Type: application/json`.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::profile::ProfileRecord;

const PROFILE_TABLE: &str = "optimum_conditions";
const LOG_TABLE: &str = "garden_logs";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outbound telemetry record, one per upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub garden_id: String,
    pub crop_name: String,
    pub current_temp: Option<f32>,
    pub current_hum: Option<f32>,
    pub current_moist: f32,
    pub remaining_days: u32,
    pub status_message: String,
    pub internet_status: &'static str,
}

/// Uploads are only attempted while connected, so this is the only value
/// ever sent.
pub const ONLINE: &str = "online";

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// Connection, TLS, or timeout failure.
    Network(String),
    /// The server answered with an unexpected status code.
    Status(u16),
    /// The response body was not the expected JSON.
    Decode(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Status(code) => write!(f, "unexpected HTTP status {code}"),
            Self::Decode(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for RemoteError {}

/// The two remote operations the control loop depends on.
#[allow(async_fn_in_trait)]
pub trait RemoteClient {
    /// Fetch the profile record for `garden_id`: the first row of the
    /// result set, or `None` when the set is empty. Later rows are ignored.
    async fn fetch_profile(&self, garden_id: &str) -> Result<Option<ProfileRecord>, RemoteError>;

    /// Upload one log entry. Succeeds on HTTP 200 or 201.
    async fn push_log(&self, entry: &LogEntry) -> Result<(), RemoteError>;
}

// ---------------------------------------------------------------------------
// REST implementation
// ---------------------------------------------------------------------------

pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestClient {
    /// `timeout` bounds each request end to end.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, table: &str) -> String {
        format!("{}/{table}", self.base_url)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
    }
}

impl RemoteClient for RestClient {
    async fn fetch_profile(&self, garden_id: &str) -> Result<Option<ProfileRecord>, RemoteError> {
        let garden_filter = format!("eq.{garden_id}");
        let req = self
            .client
            .get(self.url(PROFILE_TABLE))
            .query(&[("garden_id", garden_filter.as_str()), ("select", "*")]);

        let resp = self
            .authed(req)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if resp.status() != StatusCode::OK {
            return Err(RemoteError::Status(resp.status().as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        tracing::debug!(body = %String::from_utf8_lossy(&body), "optimum conditions fetched");

        let rows: Vec<serde_json::Value> =
            serde_json::from_slice(&body).map_err(|e| RemoteError::Decode(e.to_string()))?;
        let Some(first) = rows.into_iter().next() else {
            return Ok(None);
        };
        serde_json::from_value(first)
            .map(Some)
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn push_log(&self, entry: &LogEntry) -> Result<(), RemoteError> {
        let body = serde_json::to_vec(entry).map_err(|e| RemoteError::Decode(e.to_string()))?;
        let req = self.client.post(self.url(LOG_TABLE)).body(body);

        let resp = self
            .authed(req)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        match resp.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            other => Err(RemoteError::Status(other.as_u16())),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    /// What the fake store saw and how it should answer.
    #[derive(Default)]
    struct Store {
        profile_status: u16,
        profile_body: String,
        log_status: u16,
        seen_headers: Vec<HeaderMap>,
        seen_query: Vec<HashMap<String, String>>,
        seen_logs: Vec<serde_json::Value>,
    }

    type Shared = Arc<Mutex<Store>>;

    async fn profile_handler(
        State(store): State<Shared>,
        Query(q): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> (AxumStatus, String) {
        let mut st = store.lock().unwrap();
        st.seen_headers.push(headers);
        st.seen_query.push(q);
        (
            AxumStatus::from_u16(st.profile_status).unwrap(),
            st.profile_body.clone(),
        )
    }

    async fn log_handler(
        State(store): State<Shared>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> AxumStatus {
        let mut st = store.lock().unwrap();
        st.seen_headers.push(headers);
        st.seen_logs.push(body);
        AxumStatus::from_u16(st.log_status).unwrap()
    }

    /// Serve a fake REST store on an ephemeral port; returns its base URL.
    async fn serve(store: Shared) -> String {
        let app = Router::new()
            .route("/rest/v1/optimum_conditions", get(profile_handler))
            .route("/rest/v1/garden_logs", post(log_handler))
            .with_state(store);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/rest/v1/")
    }

    fn store(profile_status: u16, profile_body: &str, log_status: u16) -> Shared {
        Arc::new(Mutex::new(Store {
            profile_status,
            profile_body: profile_body.to_string(),
            log_status,
            ..Store::default()
        }))
    }

    fn client(base: &str) -> RestClient {
        RestClient::new(base, "secret-key", Duration::from_secs(5)).unwrap()
    }

    fn entry() -> LogEntry {
        LogEntry {
            garden_id: "g-1".into(),
            crop_name: "onions".into(),
            current_temp: Some(24.5),
            current_hum: None,
            current_moist: 37.5,
            remaining_days: 12,
            status_message: "within range".into(),
            internet_status: ONLINE,
        }
    }

    const RECORD: &str = r#"[{"crop_name":"kale","optimum_temp":20,"optimum_hum":60,"optimum_moist":45,"total_days":40,"start_date":"2026-01-01T00:00:00Z"}]"#;

    // -- fetch_profile ------------------------------------------------------

    #[tokio::test]
    async fn fetch_sends_filter_and_auth_headers() {
        let st = store(200, RECORD, 201);
        let base = serve(st.clone()).await;

        let record = client(&base).fetch_profile("g-1").await.unwrap().unwrap();
        assert_eq!(record.crop_name, "kale");
        assert_eq!(record.total_days, 40);

        let st = st.lock().unwrap();
        assert_eq!(st.seen_query[0].get("garden_id").map(String::as_str), Some("eq.g-1"));
        assert_eq!(st.seen_query[0].get("select").map(String::as_str), Some("*"));
        let h = &st.seen_headers[0];
        assert_eq!(h["apikey"], "secret-key");
        assert_eq!(h["authorization"], "Bearer secret-key");
        assert_eq!(h["content-type"], "application/json");
    }

    #[tokio::test]
    async fn fetch_empty_array_is_ok() {
        let base = serve(store(200, "[]", 201)).await;
        assert_eq!(client(&base).fetch_profile("g-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn fetch_reads_only_the_first_row() {
        let body = r#"[
            {"crop_name":"kale","optimum_temp":20,"optimum_hum":60,"optimum_moist":45,"total_days":40,"start_date":"2026-01-01T00:00:00Z"},
            {"crop_name":"broken"}
        ]"#;
        let base = serve(store(200, body, 201)).await;

        let record = client(&base).fetch_profile("g-1").await.unwrap().unwrap();
        assert_eq!(record.crop_name, "kale");
    }

    #[tokio::test]
    async fn fetch_non_array_body_is_decode_error() {
        let base = serve(store(200, r#"{"crop_name":"kale"}"#, 201)).await;
        assert!(matches!(
            client(&base).fetch_profile("g-1").await,
            Err(RemoteError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn fetch_non_200_is_status_error() {
        let base = serve(store(401, "{}", 201)).await;
        assert_eq!(
            client(&base).fetch_profile("g-1").await.unwrap_err(),
            RemoteError::Status(401)
        );
    }

    #[tokio::test]
    async fn fetch_malformed_body_is_decode_error() {
        let base = serve(store(200, r#"[{"crop_name":"kale"}]"#, 201)).await;
        assert!(matches!(
            client(&base).fetch_profile("g-1").await,
            Err(RemoteError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn fetch_unreachable_is_network_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}"))
            .fetch_profile("g-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)), "got {err:?}");
    }

    // -- push_log -----------------------------------------------------------

    #[tokio::test]
    async fn push_posts_entry_fields() {
        let st = store(200, "[]", 201);
        let base = serve(st.clone()).await;

        client(&base).push_log(&entry()).await.unwrap();

        let st = st.lock().unwrap();
        let body = &st.seen_logs[0];
        assert_eq!(body["garden_id"], "g-1");
        assert_eq!(body["crop_name"], "onions");
        assert_eq!(body["current_temp"], 24.5);
        assert!(body["current_hum"].is_null());
        assert_eq!(body["current_moist"], 37.5);
        assert_eq!(body["remaining_days"], 12);
        assert_eq!(body["status_message"], "within range");
        assert_eq!(body["internet_status"], "online");
        assert_eq!(st.seen_headers[0]["authorization"], "Bearer secret-key");
    }

    #[tokio::test]
    async fn push_accepts_200() {
        let base = serve(store(200, "[]", 200)).await;
        client(&base).push_log(&entry()).await.unwrap();
    }

    #[tokio::test]
    async fn push_rejects_server_error() {
        let base = serve(store(200, "[]", 503)).await;
        assert_eq!(
            client(&base).push_log(&entry()).await.unwrap_err(),
            RemoteError::Status(503)
        );
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let c = client("https://example.supabase.co/rest/v1/");
        assert_eq!(c.url("garden_logs"), "https://example.supabase.co/rest/v1/garden_logs");
    }
}
