//! In-process doubles for the HTTP transport and chunk downloads.

#![expect(dead_code, reason = "each test binary uses a different subset of the helpers")]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;
use zero_snowflake::error::Result;
use zero_snowflake::protocol::headers::Headers;
use zero_snowflake::tokio::Conn;
use zero_snowflake::{ChunkFetcher, ChunkRequest, Error, HttpResponse, Opts, Transport};

/// One recorded request.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub url: Url,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub timeout: Option<Duration>,
}

impl Call {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

/// Transport answering from per-path queues.
///
/// Paths without a queued answer get an empty success envelope.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    hanging: Mutex<Vec<String>>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, path: &str, response: HttpResponse) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn respond_json(&self, path: &str, body: Value) {
        self.respond(path, HttpResponse::new(200, body.to_string()));
    }

    /// Requests to `path` never complete.
    pub fn hang(&self, path: &str) {
        self.hanging.lock().unwrap().push(path.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.url.path() == path)
            .collect()
    }

    async fn answer(&self, call: Call) -> Result<HttpResponse> {
        let path = call.url.path().to_string();
        self.calls.lock().unwrap().push(call);
        let hangs = self.hanging.lock().unwrap().contains(&path);
        if hangs {
            std::future::pending::<()>().await;
        }
        let queued = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&path)
            .and_then(VecDeque::pop_front);
        Ok(queued.unwrap_or_else(|| HttpResponse::new(200, success(json!({})).to_string())))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(
        &self,
        url: &Url,
        headers: &Headers,
        body: Vec<u8>,
        timeout: Option<Duration>,
        _request_id: Uuid,
    ) -> Result<HttpResponse> {
        self.answer(Call {
            method: "POST",
            url: url.clone(),
            headers: headers.clone(),
            body,
            timeout,
        })
        .await
    }

    async fn get(
        &self,
        url: &Url,
        headers: &Headers,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse> {
        self.answer(Call {
            method: "GET",
            url: url.clone(),
            headers: headers.clone(),
            body: Vec::new(),
            timeout,
        })
        .await
    }
}

#[derive(Debug, Clone)]
enum ChunkAnswer {
    Body(Vec<u8>),
    Fail(Error),
    Hang,
}

/// Chunk fetcher serving bodies by URL.
#[derive(Debug, Default)]
pub struct MockFetcher {
    chunks: Mutex<HashMap<String, ChunkAnswer>>,
    delays: Mutex<HashMap<String, Duration>>,
    fetched: Mutex<Vec<ChunkRequest>>,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, body: &str) {
        self.serve_bytes(url, body.as_bytes().to_vec());
    }

    pub fn serve_bytes(&self, url: &str, body: Vec<u8>) {
        self.chunks
            .lock()
            .unwrap()
            .insert(url.to_string(), ChunkAnswer::Body(body));
    }

    pub fn fail(&self, url: &str, err: Error) {
        self.chunks
            .lock()
            .unwrap()
            .insert(url.to_string(), ChunkAnswer::Fail(err));
    }

    pub fn hang(&self, url: &str) {
        self.chunks
            .lock()
            .unwrap()
            .insert(url.to_string(), ChunkAnswer::Hang);
    }

    pub fn delay(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    pub fn fetched(&self) -> Vec<ChunkRequest> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChunkFetcher for MockFetcher {
    async fn fetch(&self, request: &ChunkRequest) -> Result<Vec<u8>> {
        let key = request.url.to_string();
        self.fetched.lock().unwrap().push(request.clone());
        let delay = self.delays.lock().unwrap().get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let answer = self.chunks.lock().unwrap().get(&key).cloned();
        match answer {
            Some(ChunkAnswer::Body(body)) => Ok(body),
            Some(ChunkAnswer::Fail(err)) => Err(err),
            Some(ChunkAnswer::Hang) => std::future::pending().await,
            None => Err(Error::HttpStatus {
                status: 404,
                body: key,
            }),
        }
    }
}

pub const QUERY_PATH: &str = "/queries/v1/query-request";

pub fn result_path(query_id: &str) -> String {
    format!("/queries/{}/result", query_id)
}

pub fn opts() -> Opts {
    Opts {
        account: "acct".into(),
        user: "tester".into(),
        token: Some("session-token".into()),
        database: Some("DB".into()),
        ..Default::default()
    }
}

pub async fn connect(transport: &Arc<MockTransport>, fetcher: &Arc<MockFetcher>) -> Conn {
    Conn::with_parts(opts(), transport.clone(), fetcher.clone())
        .await
        .unwrap()
}

/// Successful response envelope.
pub fn success(data: Value) -> Value {
    json!({
        "data": data,
        "code": null,
        "message": null,
        "success": true,
    })
}

/// Failed response envelope.
pub fn failure(code: &str, sql_state: &str, message: &str, query_id: &str) -> Value {
    json!({
        "data": {"sqlState": sql_state, "queryId": query_id},
        "code": code,
        "message": message,
        "success": false,
    })
}

pub fn fixed_column(name: &str) -> Value {
    json!({"name": name, "type": "fixed", "nullable": false, "scale": 0, "precision": 38})
}

pub fn text_column(name: &str) -> Value {
    json!({"name": name, "type": "text", "nullable": true})
}

/// DML response: one row of per-column counts.
pub fn dml(query_id: &str, type_id: i64, counts: &[&str]) -> Value {
    let columns: Vec<Value> = (0..counts.len())
        .map(|i| fixed_column(&format!("count{}", i)))
        .collect();
    success(json!({
        "queryId": query_id,
        "statementTypeId": type_id,
        "rowtype": columns,
        "rowset": [counts],
        "total": 1,
        "returned": 1,
        "sqlState": "00000",
        "finalDatabaseName": "DB",
    }))
}

/// Multi-statement parent response.
pub fn multi(query_id: &str, children: &[(&str, i64)]) -> Value {
    let ids: Vec<&str> = children.iter().map(|(id, _)| *id).collect();
    let types: Vec<String> = children.iter().map(|(_, t)| t.to_string()).collect();
    success(json!({
        "queryId": query_id,
        "statementTypeId": 0x1000,
        "rowtype": [{"name": "multiple statement execution", "type": "text"}],
        "rowset": [["Multiple statements executed successfully."]],
        "total": 1,
        "resultIds": ids.join(","),
        "resultTypes": types.join(","),
    }))
}
