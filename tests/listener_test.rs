//! Loopback callback listener integration tests
//!
//! Drives `LoopbackListener` over real sockets:
//!
//! - Fixed and OS-assigned ports end up in the redirect URI.
//! - A binding conflict is reported at `listen` time.
//! - Exactly one request is served and acknowledged.
//! - Cancellation and the ceiling both close the port promptly.

mod common;

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use oidc_loopback::auth::listener::{CallbackListener, CallbackOutcome, LoopbackListener};
use oidc_loopback::config::AuthenticationSettings;
use oidc_loopback::{AuthError, ErrorKind};

fn settings_with_port(port: u16) -> AuthenticationSettings {
    AuthenticationSettings {
        redirect_uri_port: port,
        ..AuthenticationSettings::default()
    }
}

#[tokio::test]
async fn test_fixed_port_appears_in_redirect_uri() {
    let port = common::free_port();
    let mut listener = LoopbackListener::new();

    let redirect_uri = listener.listen(&settings_with_port(port)).await.unwrap();

    assert_eq!(redirect_uri, format!("http://127.0.0.1:{}/callback", port));
    assert_eq!(listener.port(), port);
}

#[tokio::test]
async fn test_port_zero_yields_ephemeral_port() {
    let mut listener = LoopbackListener::new();

    let redirect_uri = listener.listen(&settings_with_port(0)).await.unwrap();
    let url = url::Url::parse(&redirect_uri).unwrap();

    let port = url.port().expect("redirect URI must carry a port");
    assert_ne!(port, 0);
    assert_eq!(url.host_str(), Some("127.0.0.1"));
    assert_eq!(url.path(), "/callback");
}

#[tokio::test]
async fn test_custom_path_is_used() {
    let mut listener = LoopbackListener::new();
    let settings = AuthenticationSettings {
        redirect_uri_path: "/oidc/done/".to_string(),
        ..AuthenticationSettings::default()
    };

    let redirect_uri = listener.listen(&settings).await.unwrap();
    assert!(redirect_uri.ends_with("/oidc/done"), "{}", redirect_uri);
}

#[tokio::test]
async fn test_port_in_use_fails_at_listen() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let mut listener = LoopbackListener::new();
    let err = listener
        .listen(&settings_with_port(port))
        .await
        .unwrap_err();

    assert_eq!(
        err.downcast_ref::<AuthError>().map(AuthError::kind),
        Some(ErrorKind::ListenerBindFailed)
    );
}

#[tokio::test]
async fn test_serves_single_request_and_acknowledges() {
    let mut listener = LoopbackListener::new();
    let redirect_uri = listener.listen(&settings_with_port(0)).await.unwrap();

    let callback = format!("{}?code=abc&state=xyz", redirect_uri);
    let browser = tokio::spawn(async move {
        let resp = reqwest::get(&callback).await.unwrap();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        (resp.status(), content_type, resp.text().await.unwrap())
    });

    let outcome = listener.wait_for_response(CancellationToken::new()).await;
    let (status, content_type, body) = browser.await.unwrap();

    match outcome {
        CallbackOutcome::Received(url) => {
            assert_eq!(url.path(), "/callback");
            assert_eq!(url.query(), Some("code=abc&state=xyz"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(status, reqwest::StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));
    assert!(body.contains("Authorization code received"));

    // The socket is gone once the callback has been served.
    assert!(!listener.is_listening());
    let port = url::Url::parse(&redirect_uri).unwrap().port().unwrap();
    assert!(reqwest::get(format!("http://127.0.0.1:{}/callback", port))
        .await
        .is_err());
}

#[tokio::test]
async fn test_error_callback_page_reports_failure() {
    let mut listener = LoopbackListener::new();
    let redirect_uri = listener.listen(&settings_with_port(0)).await.unwrap();

    let callback = format!("{}?error=access_denied", redirect_uri);
    let browser = tokio::spawn(async move { reqwest::get(&callback).await.unwrap().text().await });

    let outcome = listener.wait_for_response(CancellationToken::new()).await;
    let body = browser.await.unwrap().unwrap();

    assert!(matches!(outcome, CallbackOutcome::Received(_)));
    assert!(body.contains("Authorization request failed"));
}

#[tokio::test]
async fn test_idle_connection_does_not_count_as_callback() {
    let mut listener = LoopbackListener::new();
    let redirect_uri = listener.listen(&settings_with_port(0)).await.unwrap();
    let port = listener.port();

    // A pre-connect that closes without sending anything.
    let idle = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    drop(idle);

    let callback = format!("{}?code=abc&state=xyz", redirect_uri);
    let browser = tokio::spawn(async move { reqwest::get(&callback).await });

    let outcome = listener.wait_for_response(CancellationToken::new()).await;
    let _ = browser.await;

    assert!(matches!(outcome, CallbackOutcome::Received(_)));
}

#[tokio::test]
async fn test_cancel_returns_promptly_and_frees_port() {
    let port = common::free_port();
    let mut listener = LoopbackListener::new();
    listener.listen(&settings_with_port(port)).await.unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = listener.wait_for_response(cancel).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, CallbackOutcome::Canceled);
    assert!(elapsed >= Duration::from_millis(900), "{:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "{:?}", elapsed);

    // The port can be bound again straight away.
    let rebound = std::net::TcpListener::bind(("127.0.0.1", port));
    assert!(rebound.is_ok(), "port {} still in use", port);
}

#[tokio::test]
async fn test_ceiling_yields_timed_out() {
    let mut listener = LoopbackListener::new().with_timeout(Duration::from_millis(200));
    listener.listen(&settings_with_port(0)).await.unwrap();
    let port = listener.port();

    let outcome = listener.wait_for_response(CancellationToken::new()).await;

    assert_eq!(outcome, CallbackOutcome::TimedOut);
    assert!(std::net::TcpListener::bind(("127.0.0.1", port)).is_ok());
}

#[tokio::test]
async fn test_factory_applies_configured_timeout() {
    let settings = AuthenticationSettings {
        callback_timeout_seconds: 1,
        ..AuthenticationSettings::default()
    };
    let mut listener = oidc_loopback::auth::listener::create_listener(&settings);
    listener.listen(&settings).await.unwrap();

    let started = Instant::now();
    let outcome = listener.wait_for_response(CancellationToken::new()).await;

    assert_eq!(outcome, CallbackOutcome::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(3));
}
