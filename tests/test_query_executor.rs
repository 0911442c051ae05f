//! Query executor memoization tests

mod common;

use app_lib::infra::DbSession;
use app_lib::query::{ExecutorConfig, Params, QueryExecutor, SqlValue, Value, QUERY_TTL};
use common::{d, CountingSession};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

const SHORT_TTL: Duration = Duration::from_millis(50);

const BY_ZIP: &str = "SELECT address_id FROM addresses WHERE zip = :zip ORDER BY address_id";

fn zip_params(zip: &str) -> Params {
    let mut p = Params::new();
    p.insert("zip".into(), SqlValue::Text(zip.into()));
    p
}

fn executor(session: &Arc<CountingSession>, ttl: Duration) -> QueryExecutor {
    QueryExecutor::new(session.clone() as Arc<dyn DbSession>, ExecutorConfig { ttl })
}

// ══════════════════════════════════════════════════════════
//  freshness window
// ══════════════════════════════════════════════════════════

#[test]
fn default_window_is_ten_minutes() {
    assert_eq!(QUERY_TTL, Duration::from_secs(600));
    assert_eq!(ExecutorConfig::default().ttl, QUERY_TTL);
}

#[test]
fn identical_query_within_window_hits_cache() {
    let session = CountingSession::seeded();
    let mut exec = executor(&session, QUERY_TTL);

    let first = exec.run_query(BY_ZIP, zip_params("94110")).unwrap();
    let second = exec.run_query(BY_ZIP, zip_params("94110")).unwrap();

    assert_eq!(session.calls(), 1);
    assert_eq!(*first, *second);
    assert_eq!(first.rows, vec![vec![Value::Integer(1)], vec![Value::Integer(4)]]);
}

#[test]
fn query_reexecutes_after_window() {
    let session = CountingSession::seeded();
    let mut exec = executor(&session, SHORT_TTL);

    exec.run_query(BY_ZIP, zip_params("94110")).unwrap();
    sleep(SHORT_TTL * 3);
    exec.run_query(BY_ZIP, zip_params("94110")).unwrap();

    assert_eq!(session.calls(), 2);
    assert_eq!(exec.cached_queries(), 1);
}

#[test]
fn expired_entry_sees_new_rows() {
    let session = CountingSession::seeded();
    let window = Duration::from_millis(300);
    let mut exec = executor(&session, window);

    assert_eq!(exec.run_query(BY_ZIP, zip_params("94103")).unwrap().len(), 1);
    session
        .inner()
        .execute_batch("INSERT INTO addresses (address_id, street, city, state, zip) VALUES (9, '9 New St', 'San Francisco', 'CA', '94103')")
        .unwrap();
    // Still fresh: stale view is returned.
    assert_eq!(exec.run_query(BY_ZIP, zip_params("94103")).unwrap().len(), 1);
    sleep(window * 2);
    assert_eq!(exec.run_query(BY_ZIP, zip_params("94103")).unwrap().len(), 2);
}

// ══════════════════════════════════════════════════════════
//  cache key
// ══════════════════════════════════════════════════════════

#[test]
fn different_params_are_different_entries() {
    let session = CountingSession::seeded();
    let mut exec = executor(&session, QUERY_TTL);

    exec.run_query(BY_ZIP, zip_params("94110")).unwrap();
    exec.run_query(BY_ZIP, zip_params("94103")).unwrap();
    exec.run_query(BY_ZIP, zip_params("94110")).unwrap();

    assert_eq!(session.calls(), 2);
    assert_eq!(exec.cached_queries(), 2);
}

#[test]
fn different_sql_text_is_a_different_entry() {
    let session = CountingSession::seeded();
    let mut exec = executor(&session, QUERY_TTL);

    exec.run_query(BY_ZIP, zip_params("94110")).unwrap();
    exec.run_query(&format!("{} ", BY_ZIP), zip_params("94110")).unwrap();

    assert_eq!(session.calls(), 2);
}

#[test]
fn date_params_bind_as_iso_text() {
    let session = CountingSession::seeded();
    let mut exec = executor(&session, QUERY_TTL);

    let mut params = Params::new();
    params.insert("day".into(), SqlValue::Date(d(2021, 1, 15)));
    let ds = exec
        .run_query("SELECT listing_id FROM listings WHERE date = :day", params)
        .unwrap();
    assert_eq!(ds.rows, vec![vec![Value::Integer(3)]]);
}

// ══════════════════════════════════════════════════════════
//  errors
// ══════════════════════════════════════════════════════════

#[test]
fn query_error_propagates_and_is_not_cached() {
    let session = CountingSession::seeded();
    let mut exec = executor(&session, QUERY_TTL);

    let err = exec.run_query("SELECT * FROM no_such_table", Params::new()).unwrap_err();
    assert_eq!(err.code(), "QUERY_ERROR");
    let err = exec.run_query("SELECT * FROM no_such_table", Params::new()).unwrap_err();
    assert_eq!(err.code(), "QUERY_ERROR");

    assert_eq!(session.calls(), 2);
    assert_eq!(exec.cached_queries(), 0);
}

#[test]
fn closed_session_yields_connection_error() {
    let session = CountingSession::seeded();
    let mut exec = executor(&session, QUERY_TTL);

    session.close().unwrap();
    let err = exec.run_query(BY_ZIP, zip_params("94110")).unwrap_err();
    assert_eq!(err.code(), "CONNECTION_ERROR");
}
