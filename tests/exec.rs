//! Tests for exec: request shape, session bookkeeping and error mapping

mod common;

use common::*;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use zero_snowflake::{Error, ExecOptions, HttpResponse, Param};

#[tokio::test]
async fn test_insert_reports_affected_rows() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, dml("01-insert", 0x3100, &["2"]));
    let conn = connect(&transport, &fetcher).await;

    let result = conn.exec("INSERT INTO t VALUES (1),(2)", ()).await.unwrap();

    assert_eq!(result.affected_rows, 2);
    assert_eq!(result.last_insert_id, -1);
    assert_eq!(result.query_id, "01-insert");
}

#[tokio::test]
async fn test_merge_sums_count_columns() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, dml("01-merge", 0x3400, &["3", "2"]));
    let conn = connect(&transport, &fetcher).await;

    let result = conn
        .exec("MERGE INTO t USING s ON t.id = s.id WHEN MATCHED THEN UPDATE SET v = s.v WHEN NOT MATCHED THEN INSERT VALUES (s.id, s.v)", ())
        .await
        .unwrap();

    assert_eq!(result.affected_rows, 5);
    assert_eq!(result.query_id, "01-merge");
}

#[tokio::test]
async fn test_ddl_reports_zero_rows() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(
        QUERY_PATH,
        success(json!({
            "queryId": "01-create",
            "statementTypeId": 0x6101,
            "rowtype": [text_column("status")],
            "rowset": [["Table T successfully created."]],
            "total": 1,
        })),
    );
    let conn = connect(&transport, &fetcher).await;

    let result = conn.exec("CREATE TABLE t (a INT)", ()).await.unwrap();
    assert_eq!(result.affected_rows, 0);
    assert_eq!(result.last_insert_id, -1);
}

#[tokio::test]
async fn test_request_body_and_headers() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, dml("01", 0x3100, &["1"]));
    let conn = connect(&transport, &fetcher).await;

    conn.exec("INSERT INTO t VALUES (?, ?, ?)", (1_i64, "one", Option::<i32>::None))
        .await
        .unwrap();

    let calls = transport.calls_to(QUERY_PATH);
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.method, "POST");
    assert_eq!(call.header("Content-Type"), Some("application/json"));
    assert_eq!(call.header("Accept"), Some("application/snowflake"));
    assert_eq!(
        call.header("Authorization"),
        Some("Snowflake Token=\"session-token\"")
    );
    assert!(call.header("User-Agent").is_some());
    assert!(call.header("X-Snowflake-Service").is_none());
    assert!(call.query_param("requestId").is_some());
    assert!(call.query_param("request_guid").is_some());

    let body = call.json();
    assert_eq!(body["sqlText"], "INSERT INTO t VALUES (?, ?, ?)");
    assert_eq!(body["sequenceId"], 1);
    assert_eq!(body["asyncExec"], false);
    assert_eq!(body["isInternal"], false);
    assert!(body.get("parameters").is_none());
    assert_eq!(body["bindings"]["1"], json!({"type": "FIXED", "value": "1"}));
    assert_eq!(body["bindings"]["2"], json!({"type": "TEXT", "value": "one"}));
    assert_eq!(body["bindings"]["3"], json!({"type": "TEXT", "value": null}));
}

#[tokio::test]
async fn test_sequence_numbers_increase_by_one() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    let conn = connect(&transport, &fetcher).await;

    for _ in 0..5 {
        conn.exec("SELECT 1", ()).await.unwrap();
    }

    let sequence: Vec<u64> = transport
        .calls_to(QUERY_PATH)
        .iter()
        .map(|c| c.json()["sequenceId"].as_u64().unwrap())
        .collect();
    assert_eq!(sequence, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_request_ids_are_fresh() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    let conn = connect(&transport, &fetcher).await;

    conn.exec("SELECT 1", ()).await.unwrap();
    conn.exec("SELECT 1", ()).await.unwrap();

    let calls = transport.calls_to(QUERY_PATH);
    assert_ne!(
        calls[0].query_param("requestId"),
        calls[1].query_param("requestId")
    );
    assert_ne!(
        calls[0].query_param("request_guid"),
        calls[1].query_param("request_guid")
    );
}

#[tokio::test]
async fn test_bind_error_before_network() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    let conn = connect(&transport, &fetcher).await;

    let params = vec![Param::Array(vec![Param::Int(1), Param::Text("a".into())])];
    let err = conn.exec("INSERT INTO t VALUES (?)", params).await.unwrap_err();

    assert!(matches!(err, Error::TypeInference(_)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_session_state_follows_responses() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(
        QUERY_PATH,
        success(json!({
            "queryId": "01-use",
            "sqlState": "00000",
            "statementTypeId": 0x6000,
            "finalDatabaseName": "OTHER_DB",
            "finalSchemaName": "PUBLIC",
            "finalWarehouseName": "WH",
            "finalRoleName": "SYSADMIN",
            "parameters": [
                {"name": "TIMEZONE", "value": "UTC"},
                {"name": "CLIENT_PREFETCH_THREADS", "value": 4},
                {"name": "QUOTED_IDENTIFIERS_IGNORE_CASE", "value": false},
                {"name": "ODD", "value": {"nested": 1}},
            ],
        })),
    );
    let conn = connect(&transport, &fetcher).await;
    assert_eq!(conn.database().as_deref(), Some("DB"));

    conn.exec("USE DATABASE OTHER_DB", ()).await.unwrap();

    assert_eq!(conn.database().as_deref(), Some("OTHER_DB"));
    assert_eq!(conn.schema().as_deref(), Some("PUBLIC"));
    assert_eq!(conn.warehouse().as_deref(), Some("WH"));
    assert_eq!(conn.role().as_deref(), Some("SYSADMIN"));
    assert_eq!(conn.last_query_id().as_deref(), Some("01-use"));
    assert_eq!(conn.last_sql_state().as_deref(), Some("00000"));
    assert_eq!(conn.session_param("timezone").as_deref(), Some("UTC"));
    assert_eq!(
        conn.session_param("client_prefetch_threads").as_deref(),
        Some("4")
    );
    assert_eq!(
        conn.session_param("QUOTED_IDENTIFIERS_IGNORE_CASE").as_deref(),
        Some("false")
    );
    assert_eq!(conn.session_param("odd").as_deref(), Some(""));
}

#[tokio::test]
async fn test_service_name_header() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(
        QUERY_PATH,
        success(json!({
            "queryId": "01",
            "parameters": [{"name": "SERVICE_NAME", "value": "svc-a"}],
        })),
    );
    let conn = connect(&transport, &fetcher).await;

    conn.exec("SELECT 1", ()).await.unwrap();
    conn.exec("SELECT 1", ()).await.unwrap();

    let calls = transport.calls_to(QUERY_PATH);
    assert!(calls[0].header("X-Snowflake-Service").is_none());
    assert_eq!(calls[1].header("X-Snowflake-Service"), Some("svc-a"));
}

#[tokio::test]
async fn test_server_error() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(
        QUERY_PATH,
        failure("002003", "42S02", "Table 'T' does not exist", "01-err"),
    );
    let conn = connect(&transport, &fetcher).await;

    let err = conn.exec("SELECT * FROM t", ()).await.unwrap_err();

    assert!(matches!(err, Error::Server(_)));
    assert_eq!(err.code(), Some(2003));
    assert_eq!(err.sql_state(), Some("42S02"));
    assert_eq!(err.query_id(), Some("01-err"));
    assert!(conn.last_query_id().is_none());
}

#[tokio::test]
async fn test_unparsable_code_keeps_partial_response() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(
        QUERY_PATH,
        json!({
            "data": {"queryId": "01-odd"},
            "code": "not-a-number",
            "message": "odd",
            "success": false,
        }),
    );
    let conn = connect(&transport, &fetcher).await;

    let err = conn.exec("SELECT 1", ()).await.unwrap_err();

    let partial = err.partial_response().unwrap();
    assert_eq!(partial.code, "not-a-number");
    assert_eq!(err.query_id(), Some("01-odd"));
}

#[tokio::test]
async fn test_malformed_body() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond(QUERY_PATH, HttpResponse::new(200, "<html>"));
    let conn = connect(&transport, &fetcher).await;

    let err = conn.exec("SELECT 1", ()).await.unwrap_err();
    assert!(matches!(err, Error::Decode { partial: None, .. }));
}

#[tokio::test]
async fn test_http_status() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond(QUERY_PATH, HttpResponse::new(500, "boom"));
    let conn = connect(&transport, &fetcher).await;

    let err = conn.exec("SELECT 1", ()).await.unwrap_err();
    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_query_id_notification() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, dml("01-notify", 0x3200, &["5"]));
    let conn = connect(&transport, &fetcher).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let opts = ExecOptions::new().query_id_sender(tx);
    let result = conn.exec_with("UPDATE t SET a = 1", (), &opts).await.unwrap();

    assert_eq!(result.affected_rows, 5);
    assert_eq!(rx.recv().await.as_deref(), Some("01-notify"));
}

#[tokio::test]
async fn test_options_in_request() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    let conn = connect(&transport, &fetcher).await;

    let opts = ExecOptions::new().async_exec().internal().multi_statement(3);
    conn.exec_with("SELECT 1; SELECT 2; SELECT 3", (), &opts)
        .await
        .unwrap();

    let body = transport.calls_to(QUERY_PATH)[0].json();
    assert_eq!(body["asyncExec"], true);
    assert_eq!(body["isInternal"], true);
    assert_eq!(body["parameters"]["MULTI_STATEMENT_COUNT"], 3);
}

#[tokio::test]
async fn test_resume_fetches_result_without_submit() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(&result_path("01-prev"), dml("01-prev", 0x3300, &["4"]));
    let conn = connect(&transport, &fetcher).await;

    let opts = ExecOptions::new().resume("01-prev");
    let result = conn.exec_with("DELETE FROM t", (), &opts).await.unwrap();

    assert_eq!(result.affected_rows, 4);
    assert_eq!(result.query_id, "01-prev");
    assert!(transport.calls_to(QUERY_PATH).is_empty());
    let get = &transport.calls_to(&result_path("01-prev"))[0];
    assert_eq!(get.method, "GET");
    assert!(get.query_param("clientStartTime").is_some());

    // Resuming consumes no sequence number.
    conn.exec("SELECT 1", ()).await.unwrap();
    assert_eq!(transport.calls_to(QUERY_PATH)[0].json()["sequenceId"], 1);
}

#[tokio::test]
async fn test_cancel_during_submit() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.hang(QUERY_PATH);
    let conn = connect(&transport, &fetcher).await;

    let token = CancellationToken::new();
    let opts = ExecOptions::new().cancel_token(token.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = conn.exec_with("SELECT 1", (), &opts).await.unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, Error::Canceled));
}

#[tokio::test]
async fn test_cancelled_before_submit_sends_nothing() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    let conn = connect(&transport, &fetcher).await;

    let token = CancellationToken::new();
    token.cancel();
    let opts = ExecOptions::new().cancel_token(token);

    let err = conn.exec_with("SELECT 1", (), &opts).await.unwrap_err();
    assert!(matches!(err, Error::Canceled));
    let err = conn.query_with("SELECT 1", (), &opts).await.unwrap_err();
    assert!(matches!(err, Error::Canceled));
    assert!(transport.calls_to(QUERY_PATH).is_empty());

    // No sequence number was spent on the cancelled calls.
    conn.exec("SELECT 1", ()).await.unwrap();
    assert_eq!(transport.calls_to(QUERY_PATH)[0].json()["sequenceId"], 1);
}

#[tokio::test]
async fn test_request_timeout_passed_to_transport() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    let mut opts = opts();
    opts.request_timeout = Some(std::time::Duration::from_secs(7));
    let conn = zero_snowflake::Conn::with_parts(opts, transport.clone(), fetcher.clone())
        .await
        .unwrap();

    conn.exec("SELECT 1", ()).await.unwrap();

    assert_eq!(
        transport.calls_to(QUERY_PATH)[0].timeout,
        Some(std::time::Duration::from_secs(7))
    );
}

#[tokio::test]
async fn test_prepared_statement() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    transport.respond_json(QUERY_PATH, dml("01", 0x3100, &["1"]));
    let conn = connect(&transport, &fetcher).await;

    let stmt = conn.prepare("INSERT INTO t VALUES (?)").unwrap();
    assert_eq!(stmt.sql(), "INSERT INTO t VALUES (?)");
    assert_eq!(stmt.num_input(), None);
    assert!(transport.calls().is_empty());

    let result = stmt.exec((42_i32,)).await.unwrap();
    assert_eq!(result.affected_rows, 1);
    assert_eq!(
        transport.calls_to(QUERY_PATH)[0].json()["bindings"]["1"]["value"],
        "42"
    );
}

#[tokio::test]
async fn test_ping() {
    let transport = MockTransport::new();
    let fetcher = MockFetcher::new();
    let conn = connect(&transport, &fetcher).await;

    conn.ping().await.unwrap();
    assert_eq!(transport.calls_to(QUERY_PATH)[0].json()["sqlText"], "SELECT 1");
}
