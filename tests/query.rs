//! Tests for query: inline rows, chunk streaming, prefetch and failure handling

mod common;

use std::time::Duration;

use common::*;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use zero_snowflake::{CursorState, Error, ExecOptions};

fn chunk_url(n: usize) -> String {
    format!("https://stage.example.com/results/chunk{}?sig=s", n)
}

/// Response with inline rows `inline` and `chunks` remote chunks of `per_chunk` rows.
fn chunked(query_id: &str, inline: &[&str], chunks: usize, per_chunk: usize) -> Value {
    let total = inline.len() + chunks * per_chunk;
    let rowset: Vec<Vec<&str>> = inline.iter().map(|v| vec![*v]).collect();
    let metas: Vec<Value> = (0..chunks)
        .map(|i| json!({"url": chunk_url(i), "rowCount": per_chunk, "uncompressedSize": 100, "compressedSize": 50}))
        .collect();
    success(json!({
        "queryId": query_id,
        "statementTypeId": 0x1000,
        "rowtype": [fixed_column("N")],
        "rowset": rowset,
        "total": total,
        "returned": inline.len(),
        "chunks": metas,
        "qrmk": "result-key",
        "queryResultFormat": "json",
    }))
}

/// Serve chunk `n` with consecutive values starting at `first`.
fn serve_chunk(fetcher: &MockFetcher, n: usize, first: usize, rows: usize) {
    let body: Vec<String> = (first..first + rows)
        .map(|v| format!("[\"{}\"]", v))
        .collect();
    fetcher.serve(&chunk_url(n), &body.join(",\n"));
}

async fn drain(rows: &mut zero_snowflake::Rows) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(row) = rows.next().await.unwrap() {
        out.push(row.get(0).unwrap().to_string());
    }
    out
}

#[tokio::test]
async fn test_inline_single_row() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(
        QUERY_PATH,
        success(json!({
            "queryId": "01-one",
            "statementTypeId": 0x1000,
            "rowtype": [fixed_column("1")],
            "rowset": [["1"]],
            "total": 1,
            "returned": 1,
        })),
    );
    let conn = connect(&transport, &fetcher).await;

    let mut rows = conn.query("SELECT 1", ()).await.unwrap();
    assert_eq!(rows.query_id(), "01-one");
    assert_eq!(rows.columns()[0].name, "1");

    let row = rows.next().await.unwrap().unwrap();
    assert_eq!(row.values(), &[Some("1".to_string())]);
    assert!(rows.next().await.unwrap().is_none());
    assert!(rows.next().await.unwrap().is_none());
    assert_eq!(rows.state(), CursorState::Exhausted);
    assert!(fetcher.fetched().is_empty());
}

#[tokio::test]
async fn test_inline_then_chunks_in_order() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, chunked("01-big", &["0", "1"], 3, 4));
    for n in 0..3 {
        serve_chunk(&fetcher, n, 2 + n * 4, 4);
    }
    let conn = connect(&transport, &fetcher).await;

    let mut rows = conn.query("SELECT n FROM big", ()).await.unwrap();
    let values = drain(&mut rows).await;

    let expected: Vec<String> = (0..14).map(|v| v.to_string()).collect();
    assert_eq!(values, expected);
    assert!(rows.next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_chunks_consumed_in_order_when_downloads_finish_out_of_order() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, chunked("01-big", &[], 3, 2));
    for n in 0..3 {
        serve_chunk(&fetcher, n, n * 2, 2);
    }
    fetcher.delay(&chunk_url(0), Duration::from_millis(50));
    let conn = connect(&transport, &fetcher).await;

    let mut rows = conn.query("SELECT n FROM big", ()).await.unwrap();
    assert_eq!(drain(&mut rows).await, vec!["0", "1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn test_prefetch_window_bounds_downloads() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, chunked("01-big", &["x"], 6, 1));
    for n in 0..6 {
        fetcher.hang(&chunk_url(n));
    }
    let mut opts = opts();
    opts.prefetch_window = 2;
    let conn = zero_snowflake::Conn::with_parts(opts, transport.clone(), fetcher.clone())
        .await
        .unwrap();

    let mut rows = conn.query("SELECT n FROM big", ()).await.unwrap();
    assert_eq!(rows.next().await.unwrap().unwrap().get(0), Some("x"));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let fetched: Vec<String> = fetcher.fetched().iter().map(|r| r.url.to_string()).collect();
    assert_eq!(fetched, vec![chunk_url(0), chunk_url(1)]);
    rows.close();
}

#[tokio::test]
async fn test_chunk_request_carries_decryption_key() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, chunked("01-big", &[], 1, 1));
    serve_chunk(&fetcher, 0, 0, 1);
    let conn = connect(&transport, &fetcher).await;

    let mut rows = conn.query("SELECT n FROM big", ()).await.unwrap();
    drain(&mut rows).await;

    let request = &fetcher.fetched()[0];
    assert!(request.headers.contains(&(
        "x-amz-server-side-encryption-customer-key".to_string(),
        "result-key".to_string()
    )));
    assert!(request.headers.contains(&(
        "x-amz-server-side-encryption-customer-algorithm".to_string(),
        "AES256".to_string()
    )));
}

#[tokio::test]
async fn test_rows_capped_at_declared_total() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    let mut body = chunked("01-cap", &["0"], 1, 2);
    body["data"]["total"] = json!(2);
    transport.respond_json(QUERY_PATH, body);
    serve_chunk(&fetcher, 0, 1, 2);
    let conn = connect(&transport, &fetcher).await;

    let mut rows = conn.query("SELECT n FROM t", ()).await.unwrap();
    assert_eq!(drain(&mut rows).await, vec!["0", "1"]);
}

#[tokio::test]
async fn test_failed_chunk_is_sticky() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, chunked("01-big", &["0"], 2, 1));
    fetcher.fail(
        &chunk_url(0),
        Error::HttpStatus {
            status: 403,
            body: "expired".into(),
        },
    );
    serve_chunk(&fetcher, 1, 2, 1);
    let conn = connect(&transport, &fetcher).await;

    let mut rows = conn.query("SELECT n FROM big", ()).await.unwrap();
    assert_eq!(rows.next().await.unwrap().unwrap().get(0), Some("0"));

    for _ in 0..3 {
        let err = rows.next().await.unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 403, .. }));
    }
    assert_eq!(rows.state(), CursorState::Failed);
}

#[tokio::test]
async fn test_malformed_chunk_fails_cursor() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, chunked("01-big", &[], 1, 1));
    fetcher.serve(&chunk_url(0), "[\"1\", \"2\"]");
    let conn = connect(&transport, &fetcher).await;

    let mut rows = conn.query("SELECT n FROM big", ()).await.unwrap();
    let err = rows.next().await.unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(rows.state(), CursorState::Failed);
}

#[tokio::test]
async fn test_cancel_during_chunk_fetch() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, chunked("01-big", &["0"], 1, 1));
    fetcher.hang(&chunk_url(0));
    let conn = connect(&transport, &fetcher).await;

    let token = CancellationToken::new();
    let opts = ExecOptions::new().cancel_token(token.clone());
    let mut rows = conn.query_with("SELECT n FROM big", (), &opts).await.unwrap();
    assert_eq!(rows.next().await.unwrap().unwrap().get(0), Some("0"));

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });
    let err = rows.next().await.unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, Error::Canceled));
    assert_eq!(rows.state(), CursorState::Failed);
    assert!(matches!(rows.next().await.unwrap_err(), Error::Canceled));
}

#[tokio::test]
async fn test_chunk_timeout() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, chunked("01-big", &[], 1, 1));
    fetcher.hang(&chunk_url(0));
    let mut opts = opts();
    opts.request_timeout = Some(Duration::from_millis(30));
    let conn = zero_snowflake::Conn::with_parts(opts, transport.clone(), fetcher.clone())
        .await
        .unwrap();

    let mut rows = conn.query("SELECT n FROM big", ()).await.unwrap();
    let err = rows.next().await.unwrap_err();
    assert!(matches!(err, Error::Timeout));
    assert_eq!(rows.state(), CursorState::Failed);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, chunked("01-big", &["0", "1"], 1, 1));
    fetcher.hang(&chunk_url(0));
    let conn = connect(&transport, &fetcher).await;

    let mut rows = conn.query("SELECT n FROM big", ()).await.unwrap();
    assert!(rows.next().await.unwrap().is_some());
    rows.close();
    rows.close();
    assert!(rows.next().await.unwrap().is_none());
    assert_eq!(rows.state(), CursorState::Exhausted);
}

#[tokio::test]
async fn test_collect_typed_rows() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(
        QUERY_PATH,
        success(json!({
            "queryId": "01-typed",
            "statementTypeId": 0x1000,
            "rowtype": [fixed_column("ID"), text_column("NAME")],
            "rowset": [["1", "one"], ["2", null]],
            "total": 2,
            "returned": 2,
        })),
    );
    let conn = connect(&transport, &fetcher).await;

    let mut rows = conn.query("SELECT id, name FROM t", ()).await.unwrap();
    let all: Vec<(i64, Option<String>)> = rows.collect().await.unwrap();
    assert_eq!(all, vec![(1, Some("one".to_string())), (2, None)]);
}

#[cfg(feature = "arrow")]
#[tokio::test]
async fn test_arrow_chunk_applies_column_scale() {
    use std::sync::Arc;

    use arrow::array::{Int64Array, RecordBatch};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::ipc::writer::StreamWriter;

    let schema = Arc::new(Schema::new(vec![Field::new("AMOUNT", DataType::Int64, true)]));
    let batch = RecordBatch::try_new(
        Arc::clone(&schema),
        vec![Arc::new(Int64Array::from(vec![Some(1234), None, Some(-7)]))],
    )
    .unwrap();
    let mut body = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut body, &schema).unwrap();
        writer.write(&batch).unwrap();
        writer.finish().unwrap();
    }

    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(
        QUERY_PATH,
        success(json!({
            "queryId": "01-arrow",
            "statementTypeId": 0x1000,
            "rowtype": [{"name": "AMOUNT", "type": "fixed", "nullable": true, "scale": 2, "precision": 10}],
            "rowsetBase64": "",
            "total": 3,
            "returned": 0,
            "chunks": [{"url": chunk_url(0), "rowCount": 3, "uncompressedSize": 100, "compressedSize": 50}],
            "qrmk": "result-key",
            "queryResultFormat": "arrow",
        })),
    );
    fetcher.serve_bytes(&chunk_url(0), body);
    let conn = connect(&transport, &fetcher).await;

    let mut rows = conn.query("SELECT amount FROM ledger", ()).await.unwrap();
    let mut cells = Vec::new();
    while let Some(row) = rows.next().await.unwrap() {
        cells.push(row.values()[0].clone());
    }
    assert_eq!(
        cells,
        vec![Some("12.34".to_string()), None, Some("-0.07".to_string())]
    );
}
