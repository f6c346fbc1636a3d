// judgment-gate-mcp/src/server.rs
// ============================================================================
// Module: Gate Server Transports
// Description: Stdio and HTTP front-ends over the request dispatcher.
// Purpose: Serve JSON-RPC over line-delimited stdio or HTTP with SSE.
// Dependencies: axum, tokio, tokio-stream, tower-http, judgment-gate-config
// ============================================================================

//! ## Overview
//! Two independent front-ends share one dispatcher. The stdio transport
//! serves a single long-lived client: one JSON document per line in, one per
//! line out, diagnostics strictly on stderr, shutdown on end-of-stream. The
//! HTTP transport serves many clients: a health document, an SSE stream that
//! announces the message route and pings every thirty seconds, and a message
//! route with 204-for-notification semantics. Both run the same envelope
//! check before the dispatcher ever sees a message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Json;
use axum::response::Response;
use axum::response::Sse;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use axum::routing::get;
use axum::routing::post;
use judgment_gate_config::JudgmentGateConfig;
use judgment_gate_config::ServerTransport;
use judgment_gate_config::config::server_version;
use serde_json::json;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;

use crate::audit::GateAuditSink;
use crate::audit::RpcAuditEvent;
use crate::audit::now_unix_millis;
use crate::dispatcher::Dispatcher;
use crate::rpc::INVALID_REQUEST;
use crate::rpc::RpcResponse;
use crate::rpc::decode_message;
use crate::telemetry::RpcMetricEvent;
use crate::telemetry::RpcMetrics;
use crate::telemetry::RpcOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message-submission route announced on the SSE endpoint event.
const MESSAGE_PATH: &str = "/message";
/// SSE keep-alive interval.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gate server errors.
#[derive(Debug, thiserror::Error)]
pub enum GateServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Gate server binding one transport over the dispatcher.
pub struct GateServer {
    /// Validated server configuration.
    config: JudgmentGateConfig,
    /// Request dispatcher shared by every transport.
    dispatcher: Arc<Dispatcher>,
    /// Audit sink for transport diagnostics.
    audit: Arc<dyn GateAuditSink>,
    /// Metrics sink for request counters and latencies.
    metrics: Arc<dyn RpcMetrics>,
}

impl GateServer {
    /// Creates a new gate server.
    #[must_use]
    pub fn new(
        config: JudgmentGateConfig,
        dispatcher: Arc<Dispatcher>,
        audit: Arc<dyn GateAuditSink>,
        metrics: Arc<dyn RpcMetrics>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            audit,
            metrics,
        }
    }

    /// Serves requests on the configured transport until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`GateServerError`] when the transport fails.
    pub async fn serve(self) -> Result<(), GateServerError> {
        match self.config.server.transport {
            ServerTransport::Stdio => self.serve_stdio().await,
            ServerTransport::Http => self.serve_http().await,
        }
    }

    // ------------------------------------------------------------------
    // Stdio transport
    // ------------------------------------------------------------------

    /// Serves line-delimited JSON-RPC over stdin/stdout.
    ///
    /// Each complete line is one message, processed to completion before the
    /// next is read. Partial lines are buffered by the reader across chunk
    /// boundaries. End-of-stream triggers graceful shutdown.
    async fn serve_stdio(&self) -> Result<(), GateServerError> {
        let shutdown = self.dispatcher.shutdown_signal();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        loop {
            tokio::select! {
                () = shutdown.notified() => break,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        if line.len() > self.config.server.max_body_bytes {
                            let response = RpcResponse::error(
                                serde_json::Value::Null,
                                INVALID_REQUEST,
                                "request exceeds size limit",
                            );
                            write_line(&mut stdout, &response).await?;
                            continue;
                        }
                        match self.handle_message(line.as_bytes()).await {
                            HandledMessage::Response(response) => {
                                write_line(&mut stdout, &response).await?;
                            }
                            HandledMessage::EnvelopeFault {
                                response,
                                notification_shaped,
                            } => {
                                // Never answer a message that carried no id.
                                if !notification_shaped {
                                    write_line(&mut stdout, &response).await?;
                                }
                            }
                            HandledMessage::Silent => {}
                        }
                    }
                    Ok(None) => {
                        self.audit.rpc(RpcAuditEvent {
                            event: "stdin_closed",
                            timestamp_ms: now_unix_millis(),
                            method: String::new(),
                            request_id: None,
                            error_code: None,
                            detail: Some("end of stream, shutting down".to_string()),
                        });
                        shutdown.notify_one();
                        break;
                    }
                    Err(err) => {
                        return Err(GateServerError::Transport(format!(
                            "stdio read failed: {err}"
                        )));
                    }
                },
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Shared message handling
    // ------------------------------------------------------------------

    /// Runs the envelope check and dispatch for one raw message.
    async fn handle_message(&self, bytes: &[u8]) -> HandledMessage {
        let started = Instant::now();
        let transport = self.config.server.transport;
        match decode_message(bytes) {
            Ok(request) => {
                let method = request.method.clone();
                let response = self.dispatcher.dispatch(request).await;
                let outcome = match response.as_ref() {
                    None => RpcOutcome::Silent,
                    Some(response) if response.error.is_some() => RpcOutcome::Error,
                    Some(_) => RpcOutcome::Ok,
                };
                self.record(transport, method, outcome, started);
                response.map_or(HandledMessage::Silent, HandledMessage::Response)
            }
            Err(fault) => {
                self.audit.rpc(RpcAuditEvent {
                    event: "envelope_rejected",
                    timestamp_ms: now_unix_millis(),
                    method: String::new(),
                    request_id: None,
                    error_code: fault.response.error.as_ref().map(|err| err.code),
                    detail: fault.response.error.as_ref().map(|err| err.message.clone()),
                });
                self.record(transport, "invalid".to_string(), RpcOutcome::Error, started);
                HandledMessage::EnvelopeFault {
                    response: fault.response,
                    notification_shaped: fault.notification_shaped,
                }
            }
        }
    }

    /// Records request metrics for one handled message.
    fn record(
        &self,
        transport: ServerTransport,
        method: String,
        outcome: RpcOutcome,
        started: Instant,
    ) {
        let event = RpcMetricEvent {
            transport,
            method,
            outcome,
        };
        self.metrics.record_request(event.clone());
        self.metrics.record_latency(event, started.elapsed());
    }

    // ------------------------------------------------------------------
    // HTTP transport
    // ------------------------------------------------------------------

    /// Serves JSON-RPC over HTTP with health, SSE, and message routes.
    async fn serve_http(self) -> Result<(), GateServerError> {
        let bind = self
            .config
            .server
            .bind
            .clone()
            .ok_or_else(|| GateServerError::Config("bind address required".to_string()))?;
        let addr: SocketAddr = bind
            .parse()
            .map_err(|_| GateServerError::Config("invalid bind address".to_string()))?;
        let shutdown = self.dispatcher.shutdown_signal();
        let tool_count = self.dispatcher.executor().catalog().len();
        let server_name = self.config.server.name.clone();
        let state = Arc::new(HttpState {
            server: self,
            clients: SseClients::default(),
            started: Instant::now(),
            server_name,
            tool_count,
        });
        let app = Router::new()
            .route("/", get(handle_health))
            .route("/health", get(handle_health))
            .route("/sse", get(handle_sse))
            .route(MESSAGE_PATH, post(handle_post_message))
            .fallback(handle_not_found)
            .layer(CorsLayer::permissive())
            .with_state(state);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| GateServerError::Transport(format!("http bind failed: {err}")))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await
            .map_err(|err| GateServerError::Transport(format!("http server failed: {err}")))
    }
}

/// Outcome of handling one raw message, before transport-specific framing.
enum HandledMessage {
    /// A response to deliver.
    Response(RpcResponse),
    /// A notification; no output is produced.
    Silent,
    /// The envelope check rejected the message before dispatch.
    EnvelopeFault {
        /// Error envelope describing the rejection.
        response: RpcResponse,
        /// True when the body parsed as JSON but carried no id.
        notification_shaped: bool,
    },
}

/// Writes one response as a single line on stdout.
async fn write_line(
    stdout: &mut tokio::io::Stdout,
    response: &RpcResponse,
) -> Result<(), GateServerError> {
    let mut payload = serde_json::to_vec(response)
        .map_err(|_| GateServerError::Transport("response serialization failed".to_string()))?;
    payload.push(b'\n');
    stdout
        .write_all(&payload)
        .await
        .map_err(|err| GateServerError::Transport(format!("stdout write failed: {err}")))?;
    stdout
        .flush()
        .await
        .map_err(|err| GateServerError::Transport(format!("stdout flush failed: {err}")))
}

// ============================================================================
// SECTION: HTTP State
// ============================================================================

/// Shared state for HTTP handlers.
struct HttpState {
    /// The gate server (dispatcher, config, sinks).
    server: GateServer,
    /// Live SSE client set.
    clients: SseClients,
    /// Server start instant for uptime reporting.
    started: Instant,
    /// Advertised server name.
    server_name: String,
    /// Number of callable tools at boot.
    tool_count: usize,
}

/// Live SSE client registry.
#[derive(Clone, Default)]
struct SseClients {
    /// Connected client ids.
    ids: Arc<Mutex<BTreeSet<u64>>>,
    /// Next client id.
    next_id: Arc<AtomicU64>,
}

impl SseClients {
    /// Registers a new client and returns its id.
    fn register(&self) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.ids.lock() {
            guard.insert(id);
        }
        id
    }

    /// Removes a client from the live set.
    fn deregister(&self, id: u64) {
        if let Ok(mut guard) = self.ids.lock() {
            guard.remove(&id);
        }
    }

    /// Returns the number of connected clients.
    fn len(&self) -> usize {
        self.ids.lock().map_or(0, |guard| guard.len())
    }
}

// ============================================================================
// SECTION: HTTP Handlers
// ============================================================================

/// Serves the health document; never touches the dispatcher.
async fn handle_health(State(state): State<Arc<HttpState>>) -> Response {
    Json(json!({
        "status": "ok",
        "server": state.server_name,
        "version": server_version(),
        "tools": state.tool_count,
        "uptime": state.started.elapsed().as_secs(),
    }))
    .into_response()
}

/// Serves the server-push event stream.
///
/// Emits an `endpoint` event naming the message route on connect, keeps the
/// connection alive with comment pings, and deregisters on disconnect.
async fn handle_sse(State(state): State<Arc<HttpState>>) -> Response {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(4);
    let client_id = state.clients.register();
    state.server.audit.rpc(RpcAuditEvent {
        event: "sse_connected",
        timestamp_ms: now_unix_millis(),
        method: String::new(),
        request_id: Some(client_id.to_string()),
        error_code: None,
        detail: Some(format!("clients={}", state.clients.len())),
    });
    let _ = tx.try_send(Ok(Event::default().event("endpoint").data(MESSAGE_PATH)));
    let stream = EndpointStream {
        inner: ReceiverStream::new(rx),
        _tx: tx,
        clients: state.clients.clone(),
        client_id,
        audit: Arc::clone(&state.server.audit),
    };
    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)).into_response()
}

/// Handles one JSON-RPC message over HTTP.
///
/// Envelope failures yield 400 with a JSON-RPC error body; notifications
/// yield 204 with an empty body; everything else yields 200.
async fn handle_post_message(State(state): State<Arc<HttpState>>, bytes: Bytes) -> Response {
    if bytes.len() > state.server.config.server.max_body_bytes {
        let response = RpcResponse::error(
            serde_json::Value::Null,
            INVALID_REQUEST,
            "request body too large",
        );
        return (StatusCode::PAYLOAD_TOO_LARGE, Json(response)).into_response();
    }
    match state.server.handle_message(bytes.as_ref()).await {
        HandledMessage::Response(response) => (StatusCode::OK, Json(response)).into_response(),
        HandledMessage::EnvelopeFault {
            response, ..
        } => (StatusCode::BAD_REQUEST, Json(response)).into_response(),
        HandledMessage::Silent => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Serves 404 for every unknown route.
async fn handle_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
}

// ============================================================================
// SECTION: SSE Stream
// ============================================================================

/// Per-connection event stream that deregisters its client on drop.
struct EndpointStream {
    /// Queued server-push events.
    inner: ReceiverStream<Result<Event, Infallible>>,
    /// Keeps the channel open for the lifetime of the connection.
    _tx: tokio::sync::mpsc::Sender<Result<Event, Infallible>>,
    /// Live client registry.
    clients: SseClients,
    /// This connection's client id.
    client_id: u64,
    /// Audit sink for disconnect diagnostics.
    audit: Arc<dyn GateAuditSink>,
}

impl Stream for EndpointStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

impl Drop for EndpointStream {
    fn drop(&mut self) {
        self.clients.deregister(self.client_id);
        self.audit.rpc(RpcAuditEvent {
            event: "sse_disconnected",
            timestamp_ms: now_unix_millis(),
            method: String::new(),
            request_id: Some(self.client_id.to_string()),
            error_code: None,
            detail: Some(format!("clients={}", self.clients.len())),
        });
    }
}
