//! End-to-end backend tests over real SQLite connections.

mod common;

use common::RecordingPrompt;
use omnisql::backend::SqlBackend;
use omnisql::error::SqlError;
use omnisql::record::CellValue;
use omnisql::table::CsvRenderer;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn backend_with_prompt() -> (SqlBackend, Arc<RecordingPrompt>) {
    let prompt = Arc::new(RecordingPrompt::default());
    let backend = SqlBackend::new(
        prompt.clone(),
        Box::new(CsvRenderer::new()),
        HashMap::new(),
    );
    (backend, prompt)
}

#[tokio::test]
async fn test_execute_multi_statement_renders_two_tables() {
    let (mut backend, prompt) = backend_with_prompt();
    backend.connect("sqlite://").await.unwrap();

    let query = backend.make_query(
        "CREATE TABLE t (x INTEGER); \
         INSERT INTO t VALUES (1), (2), (3); \
         SELECT x FROM t ORDER BY x; \
         SELECT COUNT(*) AS n FROM t",
    );
    backend.execute(&query).await.unwrap();

    let tables = prompt.tables.lock();
    assert_eq!(tables.len(), 2, "DDL and DML produce no tables");
    assert!(tables[0].starts_with("x\n"));
    assert_eq!(tables[0].lines().count(), 4);
    assert!(tables[1].starts_with("n\n"));
    assert!(tables[1].contains('3'));
}

#[tokio::test]
async fn test_connect_twice_fails_and_keeps_session() {
    let (mut backend, _prompt) = backend_with_prompt();
    backend.connect("sqlite://").await.unwrap();

    let err = backend.connect("sqlite://").await.unwrap_err();
    assert!(matches!(err, SqlError::ConnectionExists(_)));
    assert!(err.to_string().contains("Disconnect the existing session"));

    // the original session still works
    let query = backend.make_query("SELECT 1 AS one");
    backend.execute(&query).await.unwrap();
}

#[tokio::test]
async fn test_execute_without_connection() {
    let (mut backend, _prompt) = backend_with_prompt();
    let query = backend.make_query("SELECT 1");
    assert!(matches!(
        backend.execute(&query).await,
        Err(SqlError::Disconnected)
    ));
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let (mut backend, _prompt) = backend_with_prompt();
    backend.disconnect().await.unwrap();
    backend.connect("sqlite://").await.unwrap();
    backend.disconnect().await.unwrap();
    backend.disconnect().await.unwrap();
    assert!(!backend.get_status().connected);
}

#[tokio::test]
async fn test_foreign_query_is_refused() {
    let (mut backend_a, _) = backend_with_prompt();
    let (mut backend_b, _) = backend_with_prompt();
    backend_a.connect("sqlite://").await.unwrap();
    backend_b.connect("sqlite://").await.unwrap();

    let foreign = backend_b.make_query("SELECT 1");
    let err = backend_a.execute(&foreign).await.unwrap_err();
    assert!(matches!(err, SqlError::BackendMismatch(_)));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_unknown_target_is_invalid_url_with_original_text() {
    let (mut backend, _prompt) = backend_with_prompt();
    let err = backend.connect("no-such-alias").await.unwrap_err();
    match err {
        SqlError::InvalidUrl(text) => assert_eq!(text, "no-such-alias"),
        other => panic!("expected InvalidUrl, got {other:?}"),
    }
}

#[tokio::test]
async fn test_alias_resolution() {
    let prompt = Arc::new(RecordingPrompt::default());
    let mut aliases = HashMap::new();
    aliases.insert("mem".to_string(), "sqlite://".to_string());
    let mut backend = SqlBackend::new(prompt, Box::new(CsvRenderer::new()), aliases);

    backend.connect("mem").await.unwrap();
    let status = backend.get_status();
    assert!(status.connected);
    assert_eq!(status.dialect.as_deref(), Some("sqlite"));
}

#[tokio::test]
async fn test_query_error_surfaces_and_session_survives() {
    let (mut backend, prompt) = backend_with_prompt();
    backend.connect("sqlite://").await.unwrap();

    let query = backend.make_query("SELECT * FROM missing_table");
    let err = backend.execute(&query).await.unwrap_err();
    assert!(matches!(err, SqlError::Query(_)));
    assert!(prompt.tables.lock().is_empty());

    let query = backend.make_query("SELECT 1 AS one");
    backend.execute(&query).await.unwrap();
    assert_eq!(prompt.tables.lock().len(), 1);
}

#[tokio::test]
async fn test_fetch_results_for_returns_rows_without_rendering() {
    let (mut backend, prompt) = backend_with_prompt();
    backend.connect("sqlite://").await.unwrap();

    let query = backend.make_query("SELECT 2 + 2 AS four");
    let rows = backend.fetch_results_for(&query).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values[0], CellValue::Integer(4));
    assert!(prompt.tables.lock().is_empty());
}

#[tokio::test]
async fn test_status_reports_connection_detail() {
    let (mut backend, _prompt) = backend_with_prompt();
    let status = backend.get_status();
    assert!(!status.connected);
    assert!(status.connection_detail.is_none());

    backend.connect("sqlite://").await.unwrap();
    let status = backend.get_status();
    assert!(status.connected);
    assert_eq!(status.dialect.as_deref(), Some("sqlite"));
    // sqlite has no server-side session
    assert!(status.session_id.is_none());
}

#[tokio::test]
async fn test_inspector_discovers_file_database_structure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inspect.db");
    let url = format!("sqlite://{}", path.display());

    let (mut backend, _prompt) = backend_with_prompt();
    backend.connect(&url).await.unwrap();

    let query = backend.make_query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)");
    backend.execute(&query).await.unwrap();

    // the table was created after the connect-time discovery pass ran
    backend.invalidate_completions();
    for _ in 0..200 {
        if !backend.inspecting() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let structure = backend.structure().expect("discovery should have finished");
    let names: Vec<&str> = structure.flatten().iter().map(|o| o.name.as_str()).collect();
    assert!(names.contains(&"users"));
    assert!(names.contains(&"id"));
    assert!(names.contains(&"SELECT"));

    backend.disconnect().await.unwrap();
}
