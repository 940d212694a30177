//! Fixed headers, endpoint paths and URL construction.

use url::Url;
use uuid::Uuid;

use crate::error::Result;

/// Header list passed to the transport, in insertion order.
pub type Headers = Vec<(String, String)>;

/// `Content-Type` value for request bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// `Accept` value naming the service's native response format.
pub const ACCEPT_SNOWFLAKE: &str = "application/snowflake";
/// Service-routing header, set from the `service_name` session parameter.
pub const SERVICE_HEADER: &str = "X-Snowflake-Service";
/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("zero-snowflake/", env!("CARGO_PKG_VERSION"), " (Rust)");

/// Query submission path.
pub const QUERY_REQUEST_PATH: &str = "/queries/v1/query-request";
/// Heartbeat path.
pub const HEARTBEAT_PATH: &str = "/session/heartbeat";
/// Session path (deleted on close).
pub const SESSION_PATH: &str = "/session";

/// Query parameter carrying the per-call request id.
pub const REQUEST_ID_KEY: &str = "requestId";
/// Query parameter carrying the per-call request guid.
pub const REQUEST_GUID_KEY: &str = "request_guid";
/// Query parameter carrying the client clock on result fetches.
pub const CLIENT_START_TIME_KEY: &str = "clientStartTime";

/// SSE-C algorithm header used when fetching encrypted chunks.
pub const SSE_C_ALGORITHM: &str = "x-amz-server-side-encryption-customer-algorithm";
/// SSE-C key header used when fetching encrypted chunks.
pub const SSE_C_KEY: &str = "x-amz-server-side-encryption-customer-key";
/// SSE-C algorithm value.
pub const SSE_C_AES: &str = "AES256";

/// Path of a (child) query result.
pub fn query_result_path(query_id: &str) -> String {
    format!("/queries/{}/result", query_id)
}

/// Standard headers for query endpoints.
pub fn query_headers(service_name: Option<&str>, token: Option<&str>) -> Headers {
    let mut headers = vec![
        ("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()),
        ("Accept".to_string(), ACCEPT_SNOWFLAKE.to_string()),
        ("User-Agent".to_string(), USER_AGENT.to_string()),
    ];
    if let Some(service) = service_name {
        headers.push((SERVICE_HEADER.to_string(), service.to_string()));
    }
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        headers.push((
            "Authorization".to_string(),
            format!("Snowflake Token=\"{}\"", token),
        ));
    }
    headers
}

/// Build an endpoint URL with a fresh request id and guid.
///
/// Returns the URL and the request id.
pub fn endpoint(base: &Url, path: &str, extra: &[(&str, &str)]) -> Result<(Url, Uuid)> {
    let (path, query) = match path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path, None),
    };
    let mut url = base.join(path)?;
    url.set_query(query);
    let request_id = Uuid::new_v4();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair(REQUEST_ID_KEY, &request_id.to_string());
        pairs.append_pair(REQUEST_GUID_KEY, &Uuid::new_v4().to_string());
        for (k, v) in extra {
            pairs.append_pair(k, v);
        }
    }
    Ok((url, request_id))
}
