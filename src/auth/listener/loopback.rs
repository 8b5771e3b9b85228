//! One-shot loopback HTTP listener
//!
//! [`LoopbackListener`] binds `127.0.0.1:<port>`, hands out
//! `http://127.0.0.1:<port>/<path>` as the redirect URI and serves exactly
//! one HTTP request: the browser's redirect back from the provider. The
//! request is answered with a short HTML page and the socket is closed
//! straight away.
//!
//! # Port selection
//!
//! A configured port is bound as is; some providers only accept redirect
//! URIs with a port registered up front. Port `0` asks the OS for a free
//! port through a probe socket that is closed before the real bind. The
//! port can be taken by another process in between, in which case the bind
//! fails and so does the login.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{CallbackListener, CallbackOutcome, DEFAULT_CALLBACK_TIMEOUT};
use crate::auth::error::AuthError;
use crate::config::AuthenticationSettings;
use crate::error::Result;

/// Upper bound on the size of the request head we are willing to read.
const MAX_REQUEST_HEAD_BYTES: usize = 16 * 1024;

/// How long a connection may take to send its request head.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Loopback HTTP implementation of [`CallbackListener`].
///
/// # Examples
///
/// ```no_run
/// use oidc_loopback::auth::listener::{CallbackListener, CallbackOutcome, LoopbackListener};
/// use oidc_loopback::config::AuthenticationSettings;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> oidc_loopback::error::Result<()> {
/// let mut listener = LoopbackListener::new();
/// let redirect_uri = listener.listen(&AuthenticationSettings::default()).await?;
/// println!("redirect the browser to {redirect_uri}");
///
/// match listener.wait_for_response(CancellationToken::new()).await {
///     CallbackOutcome::Received(url) => println!("callback: {url}"),
///     other => println!("no callback: {other:?}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LoopbackListener {
    listener: Option<TcpListener>,
    port: u16,
    timeout: Duration,
}

impl Default for LoopbackListener {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackListener {
    /// Creates an unbound listener with the default five minute ceiling.
    pub fn new() -> Self {
        Self {
            listener: None,
            port: 0,
            timeout: DEFAULT_CALLBACK_TIMEOUT,
        }
    }

    /// Overrides the ceiling on [`CallbackListener::wait_for_response`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Port bound by the last successful `listen`, or `0`.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the socket is currently open.
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Accepts connections until one delivers a request, answers it and
    /// returns the outcome.
    ///
    /// Connections that close or stall without sending a request line
    /// (browser pre-connects) are dropped without counting as the callback.
    async fn serve_one(listener: &TcpListener, port: u16) -> CallbackOutcome {
        loop {
            let (mut stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    return CallbackOutcome::ListenerError(format!(
                        "failed to accept callback connection: {e}"
                    ))
                }
            };
            tracing::debug!("Callback connection from {}", peer);

            let head =
                match tokio::time::timeout(REQUEST_READ_TIMEOUT, read_request_head(&mut stream))
                    .await
                {
                    Ok(Ok(Some(head))) => head,
                    Ok(Ok(None)) => {
                        tracing::debug!("Connection from {} closed without a request", peer);
                        continue;
                    }
                    Ok(Err(e)) => {
                        tracing::debug!("Discarding unreadable connection from {}: {}", peer, e);
                        continue;
                    }
                    Err(_) => {
                        tracing::debug!("Connection from {} sent no request in time", peer);
                        continue;
                    }
                };

            let callback = callback_url(&head, port);
            let page = acknowledgement_page(callback.as_ref().ok());
            if let Err(e) = write_response(&mut stream, &page).await {
                // The browser may already have gone; the callback still counts.
                tracing::debug!("Failed to write acknowledgement page: {}", e);
            }

            return match callback {
                Ok(url) => CallbackOutcome::Received(url),
                Err(message) => CallbackOutcome::ListenerError(message),
            };
        }
    }
}

#[async_trait::async_trait]
impl CallbackListener for LoopbackListener {
    async fn listen(&mut self, settings: &AuthenticationSettings) -> Result<String> {
        let port = select_port(settings.redirect_uri_port)?;

        tracing::info!("Starting HTTP listener on 127.0.0.1:{}...", port);
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
            .await
            .map_err(|e| {
                AuthError::ListenerBindFailed(format!("failed to bind 127.0.0.1:{port}: {e}"))
            })?;

        self.listener = Some(listener);
        self.port = port;

        Ok(format!(
            "http://{}:{}/{}",
            Ipv4Addr::LOCALHOST,
            port,
            settings.redirect_path()
        ))
    }

    async fn wait_for_response(&mut self, cancel: CancellationToken) -> CallbackOutcome {
        let Some(listener) = self.listener.take() else {
            return CallbackOutcome::ListenerError("listener is not bound".to_string());
        };

        let outcome = tokio::select! {
            outcome = Self::serve_one(&listener, self.port) => outcome,
            _ = tokio::time::sleep(self.timeout) => CallbackOutcome::TimedOut,
            _ = cancel.cancelled() => CallbackOutcome::Canceled,
        };

        // Close the socket before handing the outcome back.
        drop(listener);
        tracing::debug!("HTTP listener on port {} closed", self.port);

        outcome
    }
}

/// Chooses the port to bind: the configured one, or an OS-assigned one.
fn select_port(configured: u16) -> Result<u16> {
    if configured != 0 {
        return Ok(configured);
    }

    let probe = std::net::TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .map_err(|e| AuthError::ListenerBindFailed(format!("failed to probe for a port: {e}")))?;
    let port = probe
        .local_addr()
        .map_err(|e| AuthError::ListenerBindFailed(format!("failed to read probe port: {e}")))?
        .port();
    drop(probe);

    Ok(port)
}

/// Reads the request line and headers. Returns `None` on a connection that
/// closed before sending anything.
async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<Option<Vec<String>>> {
    let mut reader = BufReader::new(stream);
    let mut lines = Vec::new();
    let mut total = 0usize;

    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(if lines.is_empty() { None } else { Some(lines) });
        }

        total += read;
        if total > MAX_REQUEST_HEAD_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "request head too large",
            ));
        }

        let line = line.trim_end_matches(['\r', '\n']).to_string();
        // HTTP headers end at the first empty line.
        if line.is_empty() {
            if lines.is_empty() {
                continue;
            }
            return Ok(Some(lines));
        }
        lines.push(line);
    }
}

/// Rebuilds the absolute callback URL from the request head.
///
/// The authority comes from the `Host` header when present so that the
/// validator sees what the browser actually requested.
fn callback_url(head: &[String], port: u16) -> std::result::Result<Url, String> {
    let request_line = head.first().map(String::as_str).unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(_method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(format!("malformed callback request line: {request_line:?}"));
    };

    if target.starts_with("http://") || target.starts_with("https://") {
        return Url::parse(target).map_err(|e| format!("malformed callback URL: {e}"));
    }

    let host = head
        .iter()
        .skip(1)
        .find_map(|h| {
            let (name, value) = h.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("host")
                .then(|| value.trim().to_string())
        })
        .unwrap_or_else(|| format!("{}:{}", Ipv4Addr::LOCALHOST, port));

    Url::parse(&format!("http://{host}{target}"))
        .map_err(|e| format!("malformed callback URL: {e}"))
}

/// Short human-readable page shown in the browser tab.
fn acknowledgement_page(callback: Option<&Url>) -> String {
    let failed = callback
        .map(|url| url.query_pairs().any(|(k, _)| k == "error"))
        .unwrap_or(true);

    let message = if failed {
        "Authorization request failed."
    } else {
        "Authorization code received."
    };

    format!("<HTML><BODY>{message} Please return to the application.</BODY></HTML>")
}

async fn write_response(stream: &mut TcpStream, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
