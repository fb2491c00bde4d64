//! Integration tests for the execution engine.
//!
//! These drive `Request::send` through the public API against scripted
//! transports, so every retry, cookie and trace decision is observable.

use std::sync::Arc;

use request_kit::{
    CookieStore, Data, Headers, Outcome, RequestError, RequestOptions, RequestPool, Response, TraceLog,
    Transport, TransportError,
};
use reqwest::StatusCode;
use reqwest::cookie::Jar;
use url::Url;

mod support;
use support::stub::{Step, StubTransport};

fn pool_with(transport: &Arc<StubTransport>) -> RequestPool {
    RequestPool::new(Arc::clone(transport) as Arc<dyn Transport>)
}

// ==================== Retry budget ====================

#[tokio::test]
async fn test_k_transient_failures_then_success_takes_k_plus_one_attempts() {
    for k in 0..=3 {
        let steps = (0..k)
            .map(|i| if i % 2 == 0 { Step::timeout() } else { Step::closed() })
            .collect();
        let transport = Arc::new(StubTransport::new(steps));
        let pool = pool_with(&transport);
        let log = TraceLog::new();
        let (mut request, mut response) = pool.acquire_pair();
        request
            .get("http://stub.test/", RequestOptions::new())
            .retry(3)
            .with_trace(&log);

        let outcome = request.send(&mut response).await.unwrap();

        assert_eq!(outcome, Outcome::Completed, "k = {k}");
        assert_eq!(transport.calls(), k + 1, "k = {k}");
        assert_eq!(log.len(), 1, "k = {k}");
    }
}

#[tokio::test]
async fn test_budget_exhaustion_surfaces_final_error() {
    let transport = Arc::new(StubTransport::new(vec![
        Step::timeout(),
        Step::timeout(),
        Step::closed(),
    ]));
    let pool = pool_with(&transport);
    let (mut request, mut response) = pool.acquire_pair();
    request.get("http://stub.test/", RequestOptions::new()).retry(2);

    let err = request.send(&mut response).await.unwrap_err();

    assert!(matches!(
        err,
        RequestError::Transport(TransportError::ConnectionClosed { .. })
    ));
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_non_transient_error_stops_after_one_attempt() {
    let transport = Arc::new(StubTransport::new(vec![Step::Fail(
        TransportError::invalid_url("not a url"),
    )]));
    let pool = pool_with(&transport);
    let (mut request, mut response) = pool.acquire_pair();
    request.get("http://stub.test/", RequestOptions::new()).retry(10);

    let err = request.send(&mut response).await.unwrap_err();

    assert!(matches!(
        err,
        RequestError::Transport(TransportError::InvalidUrl { .. })
    ));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_cancellation_reported_as_outcome_without_retry() {
    let transport = Arc::new(StubTransport::new(vec![Step::Fail(
        TransportError::canceled("http://stub.test/"),
    )]));
    let pool = pool_with(&transport);
    let (mut request, mut response) = pool.acquire_pair();
    request.get("http://stub.test/", RequestOptions::new()).retry(3);

    let outcome = request.send(&mut response).await.unwrap();

    assert_eq!(outcome, Outcome::Canceled);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_retry_client_handles_later_attempts() {
    let primary = Arc::new(StubTransport::new(vec![Step::timeout()]));
    let secondary = Arc::new(StubTransport::new(Vec::new()));
    let pool = pool_with(&primary);
    let (mut request, mut response) = pool.acquire_pair();
    request
        .get("http://stub.test/", RequestOptions::new())
        .retry(1)
        .retry_client(Arc::clone(&secondary) as Arc<dyn Transport>);

    request.send(&mut response).await.unwrap();

    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 1);
    assert_eq!(response.text(), "ok");
}

// ==================== Redirect budget ====================

#[tokio::test]
async fn test_redirect_budget_above_one_uses_redirect_dispatch() {
    let transport = Arc::new(StubTransport::new(Vec::new()));
    let pool = pool_with(&transport);

    for (budget, expected) in [(0, 0), (1, 0), (2, 1), (10, 2)] {
        let (mut request, mut response) = pool.acquire_pair();
        request
            .get("http://stub.test/", RequestOptions::new())
            .max_redirects(budget);
        request.send(&mut response).await.unwrap();
        pool.release_pair(request, response);
        assert_eq!(transport.redirect_calls(), expected, "budget {budget}");
    }
}

#[tokio::test]
async fn test_trace_records_last_redirect_hop() {
    let transport = Arc::new(StubTransport::new(Vec::new()).redirecting_to("http://stub.test/final"));
    let pool = pool_with(&transport);
    let log = TraceLog::new();
    let (mut request, mut response) = pool.acquire_pair();
    request
        .get("http://stub.test/start", RequestOptions::new())
        .max_redirects(5)
        .with_trace(&log);

    request.send(&mut response).await.unwrap();

    assert!(log.entries()[0].request.starts_with("GET /final HTTP/1.1\r\n"));
    assert_eq!(request.wire().uri(), "http://stub.test/start");
}

#[tokio::test]
async fn test_trace_without_redirects_records_request_as_sent() {
    let transport = Arc::new(StubTransport::new(Vec::new()).redirecting_to("http://stub.test/final"));
    let pool = pool_with(&transport);
    let log = TraceLog::new();
    let (mut request, mut response) = pool.acquire_pair();
    request
        .get("http://stub.test/start", RequestOptions::new())
        .max_redirects(1)
        .with_trace(&log);

    request.send(&mut response).await.unwrap();

    assert!(log.entries()[0].request.starts_with("GET /start HTTP/1.1\r\n"));
}

// ==================== Cookies ====================

#[tokio::test]
async fn test_set_cookie_round_trips_through_shared_jar() {
    let transport = Arc::new(StubTransport::new(vec![Step::Reply {
        status: StatusCode::OK,
        headers: vec![("set-cookie", "sid=abc; Path=/")],
        body: Vec::new(),
    }]));
    let pool = pool_with(&transport);
    let jar = Arc::new(Jar::default());

    let (mut login, mut response) = pool.acquire_pair();
    login
        .post("http://stub.test/login", RequestOptions::new().body("u=me"))
        .jar(Arc::clone(&jar) as Arc<dyn CookieStore>);
    login.send(&mut response).await.unwrap();
    assert_eq!(response.cookie("sid").as_deref(), Some("abc"));
    pool.release_pair(login, response);

    let (mut next, mut response) = pool.acquire_pair();
    next.get("http://stub.test/account", RequestOptions::new())
        .jar(Arc::clone(&jar) as Arc<dyn CookieStore>);
    next.wire_mut().set_cookie("theme", "dark");
    next.send(&mut response).await.unwrap();

    let sent = transport.seen();
    assert_eq!(sent[1].cookie_header().as_deref(), Some("theme=dark; sid=abc"));
}

#[tokio::test]
async fn test_header_cookie_and_jar_cookie_share_one_line() {
    let transport = Arc::new(StubTransport::new(Vec::new()));
    let pool = pool_with(&transport);
    let jar = Arc::new(Jar::default());
    let url = Url::parse("http://stub.test/").unwrap();
    jar.store(&url, vec![cookie::Cookie::new("sid", "abc")]);

    let mut headers = Headers::new();
    headers.insert("Cookie".into(), "theme=dark; sid=stale".into());
    let (mut request, mut response) = pool.acquire_pair();
    request
        .get("http://stub.test/", RequestOptions::new().headers(headers))
        .jar(Arc::clone(&jar) as Arc<dyn CookieStore>);
    request.send(&mut response).await.unwrap();

    let sent = &transport.seen()[0];
    assert!(sent.headers().get("cookie").is_none());
    assert_eq!(sent.cookie_header().as_deref(), Some("theme=dark; sid=abc"));
    assert_eq!(sent.to_string().matches("Cookie:").count(), 1);
}

#[tokio::test]
async fn test_cookies_persisted_even_when_call_fails() {
    let transport = Arc::new(StubTransport::new(vec![Step::FailAfterHeaders {
        headers: vec![("set-cookie", "partial=1")],
        error: TransportError::protocol("http://stub.test/", "truncated body"),
    }]));
    let pool = pool_with(&transport);
    let jar = Arc::new(Jar::default());
    let (mut request, mut response) = pool.acquire_pair();
    request
        .get("http://stub.test/", RequestOptions::new())
        .jar(Arc::clone(&jar) as Arc<dyn CookieStore>);

    assert!(request.send(&mut response).await.is_err());

    let stored = jar.cookies_for(&Url::parse("http://stub.test/").unwrap());
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name(), "partial");
}

#[tokio::test]
async fn test_fresh_requests_do_not_share_cookies() {
    let transport = Arc::new(StubTransport::new(vec![Step::Reply {
        status: StatusCode::OK,
        headers: vec![("set-cookie", "sid=abc")],
        body: Vec::new(),
    }]));
    let pool = pool_with(&transport);

    let (mut first, mut response) = pool.acquire_pair();
    first.get("http://stub.test/", RequestOptions::new());
    first.send(&mut response).await.unwrap();
    pool.release_pair(first, response);

    let (mut second, mut response) = pool.acquire_pair();
    second.get("http://stub.test/", RequestOptions::new());
    second.send(&mut response).await.unwrap();

    assert!(transport.seen()[1].cookies().is_empty());
}

#[tokio::test]
async fn test_relative_uri_skips_cookie_handling() {
    let transport = Arc::new(StubTransport::new(Vec::new()));
    let pool = pool_with(&transport);
    let (mut request, mut response) = pool.acquire_pair();
    request.get("/relative", RequestOptions::new());

    let outcome = request.send(&mut response).await.unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert!(transport.seen()[0].cookies().is_empty());
}

// ==================== Trace ====================

#[tokio::test]
async fn test_trace_log_outlives_request_and_can_be_cleared() {
    let transport = Arc::new(StubTransport::new(vec![Step::Reply {
        status: StatusCode::CREATED,
        headers: Vec::new(),
        body: b"made".to_vec(),
    }]));
    let pool = pool_with(&transport);
    let log = TraceLog::new();

    let (mut request, mut response) = pool.acquire_pair();
    request
        .post("http://stub.test/items", RequestOptions::new().body(r#"{"n":1}"#))
        .with_trace(&log);
    request.send(&mut response).await.unwrap();
    pool.release_pair(request, response);

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].request.starts_with("POST /items HTTP/1.1\r\n"));
    assert!(entries[0].request.ends_with(r#"{"n":1}"#));
    assert!(entries[0].response.starts_with("HTTP/1.1 201 Created\r\n"));

    let (mut request, _) = pool.acquire_pair();
    request.with_trace(&log).clear_trace();
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_no_trace_entry_without_log() {
    let transport = Arc::new(StubTransport::new(Vec::new()));
    let pool = pool_with(&transport);
    let log = TraceLog::new();
    let (mut request, mut response) = pool.acquire_pair();
    request.get("http://stub.test/", RequestOptions::new());
    request.send(&mut response).await.unwrap();
    assert!(log.is_empty());
}

// ==================== Configuration errors ====================

#[tokio::test]
async fn test_conflicting_body_options_fail_before_sending() {
    let transport = Arc::new(StubTransport::new(Vec::new()));
    let pool = pool_with(&transport);
    let (mut request, mut response) = pool.acquire_pair();
    let mut data = Data::new();
    data.insert("a".into(), "1".into());
    request.post(
        "http://stub.test/",
        RequestOptions::new().body("raw").data(data),
    );

    let err = request.send(&mut response).await.unwrap_err();

    assert!(matches!(err, RequestError::ConflictingBody { .. }));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_response_caches_cleared_between_calls() {
    let transport = Arc::new(StubTransport::new(vec![
        Step::ok("<title>first</title>"),
        Step::ok("<title>second</title>"),
    ]));
    let pool = pool_with(&transport);
    let (mut request, mut response) = pool.acquire_pair();
    request.get("http://stub.test/", RequestOptions::new());

    request.send(&mut response).await.unwrap();
    assert_eq!(response.title(), "first");
    request.send(&mut response).await.unwrap();
    assert_eq!(response.title(), "second");
}

#[tokio::test]
async fn test_send_with_standalone_response() {
    let transport = Arc::new(StubTransport::new(Vec::new()));
    let pool = pool_with(&transport);
    let mut request = pool.acquire_request();
    let mut response = Response::new();
    request.head("http://stub.test/", RequestOptions::new());
    assert!(request.send(&mut response).await.unwrap().is_completed());
}
