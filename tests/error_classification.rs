//! Classification of real HTTP failures served by a mock server.

use ai_lib_orchestrator::{
    classify, is_retryable, Error, ErrorClass, InvokeOptions, ResilientInvoker, ResponseMeta,
};
use mockito::Server;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

async fn fetch_failure(server: &mut Server, status: usize, headers: &[(&str, &str)]) -> Error {
    let mut mock = server
        .mock("POST", "/v1/analyze")
        .with_status(status)
        .with_body(r#"{"error":{"message":"upstream said no"}}"#);
    for &(k, v) in headers {
        mock = mock.with_header(k, v);
    }
    let mock = mock.create_async().await;

    let resp = reqwest::Client::new()
        .post(format!("{}/v1/analyze", server.url()))
        .send()
        .await
        .expect("mock server reachable");
    let meta = ResponseMeta::from_response(&resp);
    let body = resp.text().await.unwrap_or_default();
    mock.assert_async().await;
    Error::remote(body, meta)
}

#[tokio::test]
async fn test_429_with_retry_after() {
    let mut server = Server::new_async().await;
    let err = fetch_failure(&mut server, 429, &[("retry-after", "3")]).await;

    assert_eq!(err.classification(), ErrorClass::RateLimit);
    assert!(is_retryable(err.classification()));
    assert_eq!(
        err.response().and_then(|r| r.retry_after()),
        Some(Duration::from_secs(3))
    );
}

#[tokio::test]
async fn test_401_is_terminal_auth() {
    let mut server = Server::new_async().await;
    let err = fetch_failure(&mut server, 401, &[]).await;

    assert_eq!(err.classification(), ErrorClass::Auth);
    assert!(!is_retryable(err.classification()));
    assert!(err.to_string().contains("upstream said no"));
}

#[tokio::test]
async fn test_503_is_server() {
    let mut server = Server::new_async().await;
    let err = fetch_failure(&mut server, 503, &[]).await;
    assert_eq!(err.classification(), ErrorClass::Server);
}

#[tokio::test]
async fn test_unmapped_status_uses_body_text() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/analyze")
        .with_status(404)
        .with_body("monthly quota exhausted")
        .create_async()
        .await;
    let resp = reqwest::Client::new()
        .post(format!("{}/v1/analyze", server.url()))
        .send()
        .await
        .unwrap();
    let meta = ResponseMeta::from_response(&resp);
    let err = Error::remote(resp.text().await.unwrap(), meta);
    mock.assert_async().await;

    assert_eq!(classify(&err, err.response()), ErrorClass::RateLimit);
}

#[tokio::test]
async fn test_refused_connection_is_network() {
    // nothing listens on port 1
    let err: Error = reqwest::Client::new()
        .get("http://127.0.0.1:1/")
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.classification(), ErrorClass::Network);
}

#[tokio::test]
async fn test_malformed_url_fails_fast_as_unknown() {
    let attempts = AtomicU32::new(0);
    let invoker = ResilientInvoker::new(InvokeOptions::new().with_max_retries(2));
    let client = reqwest::Client::new();

    let err = invoker
        .invoke(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            let req = client.get("not a url");
            async move {
                req.send().await?;
                Ok::<(), Error>(())
            }
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(err.classification(), ErrorClass::Unknown);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_taxonomy_names_are_stable() {
    let names: Vec<_> = ErrorClass::ALL.iter().map(|c| c.name()).collect();
    assert_eq!(
        names,
        vec!["auth", "rate_limit", "network", "server", "validation", "timeout", "unknown"]
    );
}
