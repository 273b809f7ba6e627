//! Local HTTP listener receiving the OAuth redirect.
//!
//! The listener is bound before anything is sent to the browser, serves from a
//! background task, and hands the first callback over a one-shot channel. The
//! server is shut down once the listener has been waited on or dropped.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::any;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::AuthError;

pub const DEFAULT_CALLBACK_PORT: u16 = 53535;
pub const CALLBACK_PATH: &str = "/oauth/callback";

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>consolectl</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
<h2>Login complete</h2>
<p>You can close this tab and return to the terminal.</p>
</body>
</html>"#;

const DENIED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>consolectl</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
<h2>Login failed</h2>
<p>The provider did not authorize this login. Check the terminal for details.</p>
</body>
</html>"#;

/// Query parameters of the redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
    /// Set when the provider redirected with `error=...` instead of a code.
    pub error: Option<String>,
}

type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

#[derive(Debug)]
pub struct CallbackListener {
    addr: SocketAddr,
    receiver: oneshot::Receiver<CallbackParams>,
    shutdown: CancellationToken,
}

impl CallbackListener {
    /// Bind `127.0.0.1:<port>` and start serving. Port 0 lets the OS pick.
    pub async fn bind(port: u16) -> Result<Self, AuthError> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .await
            .map_err(|source| AuthError::PortUnavailable { port, source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| AuthError::PortUnavailable { port, source })?;

        let (tx, receiver) = oneshot::channel();
        let slot: CallbackSlot = Arc::new(Mutex::new(Some(tx)));
        let router = Router::new()
            .route(CALLBACK_PATH, any(handle_callback))
            .fallback(not_found)
            .with_state(slot);

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        tokio::spawn(async move {
            let server = axum::serve(listener, router)
                .with_graceful_shutdown(async move { signal.cancelled().await });
            if let Err(e) = server.await {
                warn!("callback server stopped: {e}");
            }
        });

        debug!(%addr, "callback listener ready");
        Ok(Self {
            addr,
            receiver,
            shutdown,
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Redirect target to hand to the provider, using the bound port.
    pub fn redirect_uri(&self) -> String {
        format!("http://{}{}", self.addr, CALLBACK_PATH)
    }

    /// Wait for the redirect, at most `timeout`, or until `cancel` fires.
    pub async fn wait(
        mut self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<CallbackParams, AuthError> {
        let result = tokio::select! {
            received = &mut self.receiver => received.map_err(|_| AuthError::Cancelled),
            _ = tokio::time::sleep(timeout) => Err(AuthError::Timeout(timeout)),
            _ = cancel.cancelled() => Err(AuthError::Cancelled),
        };
        self.shutdown.cancel();
        result
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_callback(
    State(slot): State<CallbackSlot>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if method != Method::GET {
        return not_found().await.into_response();
    }

    let params = CallbackParams {
        code: query.get("code").cloned().unwrap_or_default(),
        state: query.get("state").cloned().unwrap_or_default(),
        error: query.get("error").cloned(),
    };
    let denied = params.error.is_some();

    match slot.lock().await.take() {
        Some(sender) => {
            debug!("received oauth callback");
            let _ = sender.send(params);
        }
        None => debug!("ignoring repeated oauth callback"),
    }

    if denied {
        Html(DENIED_PAGE).into_response()
    } else {
        Html(SUCCESS_PAGE).into_response()
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
