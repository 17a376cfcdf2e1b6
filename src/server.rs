// =============================================================================
// server.rs — THE WEB FORM, MINUS THE WEB FRAMEWORK
// =============================================================================
//
// A tiny HTTP/1.1 service over a raw tokio TcpListener. One request per
// connection, `Connection: close`, JSON in and JSON out, except where the
// answer is a download (PDF report, CSV export).
//
//   GET  /health    liveness
//   GET  /metrics   counters from metrics.rs
//   POST /analyze   {"text": "..."} → tier, tally, highlighted text
//   POST /report    {"text": "..."} → risk_analysis.pdf
//   POST /batch     CSV body        → risk_result.csv (BOM-prefixed)
//
// No keep-alive, no chunked bodies: Content-Length or nothing. A request
// that announces a Transfer-Encoding is answered 411 before any handler sees
// it. Every request
// gets a UUID in its tracing span so a single upload can be followed through
// the logs.
//
// Handlers are synchronous (the classifier is pure and the batch path uses
// Rayon), so they run under spawn_blocking and never stall the reactor.
// Connection tasks live in a JoinSet; shutdown stops accepting and then
// waits for the ones in flight.
// =============================================================================

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::batch::{self, CSV_MIME};
use crate::classifier::{analyze_single, Classifier};
use crate::config::Config;
use crate::error::AnalysisError;
use crate::metrics::MetricsCollector;
use crate::models::RiskTier;
use crate::report::REPORT_MIME;

/// Upper bound on the request line plus headers.
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Everything a request handler needs, shared across connection tasks.
pub struct AppState {
    pub classifier: Classifier,
    pub metrics: MetricsCollector,
    pub config: Config,
}

impl AppState {
    pub fn new(classifier: Classifier, config: Config) -> Self {
        Self {
            classifier,
            metrics: MetricsCollector::new(),
            config,
        }
    }
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request: {0}")]
    Malformed(&'static str),

    #[error("request body of {0} bytes exceeds the limit")]
    TooLarge(usize),

    #[error("unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        Self {
            status,
            content_type: "application/json".to_string(),
            headers: Vec::new(),
            body,
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::json(status, &json!({ "error": message }))
    }

    fn download(content_type: &str, filename: &str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: content_type.to_string(),
            headers: vec![(
                "Content-Disposition".to_string(),
                format!("attachment; filename=\"{filename}\""),
            )],
            body,
        }
    }

    /// Serialize status line, headers and body into wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len(),
        );
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        411 => "Length Required",
        413 => "Payload Too Large",
        422 => "Unprocessable Entity",
        _ => "Internal Server Error",
    }
}

#[derive(Debug, Deserialize)]
struct TextRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse<'a> {
    tier: RiskTier,
    tier_label: &'static str,
    keyword_count: usize,
    highlighted: &'a str,
}

/// Read one request: head up to the blank line, then `Content-Length` bytes.
pub async fn read_request<R>(stream: &mut R, max_body: usize) -> Result<HttpRequest, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = find_head_end(&buf) {
            break pos;
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(RequestError::Malformed("header section too large"));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(RequestError::Malformed("connection closed before end of headers"));
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = std::str::from_utf8(&buf[..head_end])
        .map_err(|_| RequestError::Malformed("header section is not UTF-8"))?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(_version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(RequestError::Malformed("bad request line"));
    };
    let method = method.to_string();
    let path = target.split('?').next().unwrap_or(target).to_string();

    let mut headers = Vec::new();
    for line in lines.filter(|l| !l.is_empty()) {
        let Some((name, value)) = line.split_once(':') else {
            return Err(RequestError::Malformed("bad header line"));
        };
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    if let Some((_, encoding)) = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("transfer-encoding"))
    {
        return Err(RequestError::UnsupportedTransferEncoding(encoding.clone()));
    }

    let content_length = match headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
    {
        Some((_, v)) => v
            .parse::<usize>()
            .map_err(|_| RequestError::Malformed("bad Content-Length"))?,
        None => 0,
    };
    if content_length > max_body {
        return Err(RequestError::TooLarge(content_length));
    }

    let mut body = buf.split_off(head_end + 4);
    body.truncate(content_length);
    if body.len() < content_length {
        let already = body.len();
        body.resize(content_length, 0);
        stream.read_exact(&mut body[already..]).await?;
    }

    Ok(HttpRequest {
        method,
        path,
        headers,
        body,
    })
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    memchr::memmem::find(buf, b"\r\n\r\n")
}

/// Route a request to its handler.
pub fn handle(state: &AppState, request: &HttpRequest) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => HttpResponse::json(200, &json!({ "status": "ok" })),
        ("GET", "/metrics") => HttpResponse::json(200, &state.metrics.snapshot()),
        ("POST", "/analyze") => handle_analyze(state, &request.body),
        ("POST", "/report") => handle_report(state, &request.body),
        ("POST", "/batch") => handle_batch(state, &request.body),
        (_, "/health" | "/metrics" | "/analyze" | "/report" | "/batch") => {
            HttpResponse::error(405, "method not allowed")
        }
        _ => HttpResponse::error(404, "not found"),
    }
}

fn parse_text(body: &[u8]) -> Result<String, HttpResponse> {
    serde_json::from_slice::<TextRequest>(body)
        .map(|req| req.text)
        .map_err(|e| HttpResponse::error(400, &format!("expected JSON body {{\"text\": ...}}: {e}")))
}

fn rejected(state: &AppState, err: &AnalysisError) -> HttpResponse {
    state.metrics.increment_rejected();
    match err {
        AnalysisError::EmptyInput => HttpResponse::json(422, &json!({ "warning": err.to_string() })),
        _ => HttpResponse::error(400, &err.to_string()),
    }
}

fn handle_analyze(state: &AppState, body: &[u8]) -> HttpResponse {
    let text = match parse_text(body) {
        Ok(text) => text,
        Err(response) => return response,
    };

    match analyze_single(&state.classifier, &text) {
        Ok(result) => {
            state.metrics.record_analysis(&result);
            HttpResponse::json(
                200,
                &AnalyzeResponse {
                    tier: result.tier,
                    tier_label: result.tier.label(),
                    keyword_count: result.keyword_count,
                    highlighted: &result.annotated_text,
                },
            )
        }
        Err(err) => rejected(state, &err),
    }
}

fn handle_report(state: &AppState, body: &[u8]) -> HttpResponse {
    let text = match parse_text(body) {
        Ok(text) => text,
        Err(response) => return response,
    };

    let result = match analyze_single(&state.classifier, &text) {
        Ok(result) => result,
        Err(err) => return rejected(state, &err),
    };
    state.metrics.record_analysis(&result);

    match state
        .classifier
        .build_report(&text, result.tier, result.keyword_count)
    {
        Ok(pdf) => {
            state.metrics.increment_reports();
            HttpResponse::download(REPORT_MIME, &state.config.report_filename, pdf)
        }
        Err(err) => {
            error!(error = %err, "Failed to render PDF report");
            HttpResponse::error(500, "failed to render report")
        }
    }
}

fn handle_batch(state: &AppState, body: &[u8]) -> HttpResponse {
    let outcome = match batch::analyze_csv(&state.classifier, body) {
        Ok(outcome) => outcome,
        Err(err @ AnalysisError::MissingTextColumn) => return rejected(state, &err),
        Err(err) => {
            warn!(error = %err, "Unreadable batch upload");
            return HttpResponse::error(400, &err.to_string());
        }
    };

    state.metrics.record_batch(outcome.rows.len());
    for row in &outcome.rows {
        state.metrics.record_tier(row.tier, row.keyword_count);
    }

    match outcome.to_csv_bytes() {
        Ok(csv) => HttpResponse::download(
            &format!("{CSV_MIME}; charset=utf-8"),
            &state.config.csv_filename,
            csv,
        ),
        Err(err) => {
            error!(error = %err, "Failed to serialize batch result");
            HttpResponse::error(500, "failed to serialize result")
        }
    }
}

/// Serve one connection: read, route, respond, close.
async fn handle_connection<S>(state: Arc<AppState>, mut stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    state.metrics.increment_requests();

    let response = match read_request(&mut stream, state.config.max_body_bytes).await {
        Ok(request) => {
            debug!(method = %request.method, path = %request.path, bytes = request.body.len(), "Request received");
            let handler_state = state.clone();
            match tokio::task::spawn_blocking(move || handle(&handler_state, &request)).await {
                Ok(response) => response,
                Err(e) => {
                    error!(error = %e, "Request handler panicked");
                    HttpResponse::error(500, "internal error")
                }
            }
        }
        Err(RequestError::TooLarge(n)) => {
            warn!(bytes = n, "Request body too large");
            HttpResponse::error(413, "request body too large")
        }
        Err(RequestError::UnsupportedTransferEncoding(encoding)) => {
            warn!(encoding = %encoding, "Request body without Content-Length");
            HttpResponse::error(411, "chunked request bodies are not supported; send Content-Length")
        }
        Err(RequestError::Malformed(why)) => {
            warn!(reason = why, "Malformed request");
            HttpResponse::error(400, why)
        }
        Err(RequestError::Io(e)) => {
            debug!(error = %e, "Connection dropped while reading");
            return;
        }
    };

    if response.status >= 400 {
        state.metrics.increment_errors();
    }
    info!(status = response.status, bytes = response.body.len(), "Response sent");

    if let Err(e) = stream.write_all(&response.to_bytes()).await {
        debug!(error = %e, "Failed to write response");
        return;
    }
    let _ = stream.shutdown().await;
}

/// Accept connections until the shutdown signal flips.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: &mut watch::Receiver<bool>,
) {
    if let Ok(addr) = listener.local_addr() {
        info!("🌐 Ad risk form listening on http://{}", addr);
    }

    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        let span = info_span!("request", request_id = %Uuid::new_v4(), peer = %peer);
                        connections.spawn(handle_connection(state.clone(), stream).instrument(span));
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    error!(error = %e, "Connection task failed");
                }
            }
            _ = shutdown.changed() => {
                info!(in_flight = connections.len(), "HTTP service: shutting down");
                break;
            }
        }
    }

    drop(listener);
    while let Some(finished) = connections.join_next().await {
        if let Err(e) = finished {
            error!(error = %e, "Connection task failed");
        }
    }
    info!("HTTP service: all connections drained");
}
