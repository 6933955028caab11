//! Sends one `HttpRequest` and normalizes the response to an `Outcome`.
//!
//! # Design
//! Each call opens its own `ureq::Agent` (a connection-reusing session) and
//! discards it afterwards. The agent is configured not to treat 4xx/5xx as
//! errors, so status interpretation stays in `interpret`. Every call is
//! bounded by `HttpSettings::timeout`.

use std::time::Duration;

use tracing::{debug, error, info, warn};
use ureq::http::Response;
use ureq::typestate::WithBody;
use ureq::{Agent, Body, RequestBuilder};

use crate::error::HttpError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Outcome, PreparedRequest};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport settings applied to every outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// Upper bound on the whole call: connect, send and read.
    pub timeout: Duration,
}

impl HttpSettings {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Prepare and send `request`, returning the decoded JSON for 2xx responses
/// and `Outcome::Failed` for any other status.
///
/// Transport failures are logged and returned as `HttpError::Transport`;
/// they are never retried. The body of a non-2xx response is read
/// best-effort and never turns the outcome into an error.
pub fn execute(request: HttpRequest, settings: &HttpSettings) -> Result<Outcome, HttpError> {
    let prepared = request.prepare()?;
    let agent = session(settings);

    debug!(method = %prepared.method, url = %prepared.url, "sending request");
    let mut response = send(&agent, &prepared).map_err(|source| transport_error(&prepared, source))?;

    let status = response.status();
    let reason = status.canonical_reason().unwrap_or_default();
    info!("Response status code: {} {}", status.as_u16(), reason);

    let read = if prepared.method == HttpMethod::Head {
        Ok(Vec::new())
    } else {
        response.body_mut().read_to_vec()
    };
    let body = body_text(&prepared, status.is_success(), read)?;

    interpret(HttpResponse {
        status: status.as_u16(),
        reason: reason.to_string(),
        body,
    })
}

/// Map a completed response to an `Outcome`.
///
/// A 2xx body is decoded as JSON; an empty 2xx body decodes to `Null`.
pub fn interpret(response: HttpResponse) -> Result<Outcome, HttpError> {
    if !(200..=299).contains(&response.status) {
        return Ok(Outcome::Failed {
            status: response.status,
            body: response.body,
        });
    }
    if response.body.trim().is_empty() {
        return Ok(Outcome::Ok(serde_json::Value::Null));
    }
    serde_json::from_str(&response.body)
        .map(Outcome::Ok)
        .map_err(|err| HttpError::Decode(err.to_string()))
}

/// Turn the raw body read into text.
///
/// Success bodies must be valid UTF-8 within the read limit. Failure bodies
/// are kept lossily and dropped when unreadable, so the status still reaches
/// the caller as `Outcome::Failed`.
fn body_text(
    prepared: &PreparedRequest,
    success: bool,
    read: Result<Vec<u8>, ureq::Error>,
) -> Result<String, HttpError> {
    match read {
        Ok(bytes) if success => String::from_utf8(bytes).map_err(|err| HttpError::Decode(err.to_string())),
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(ureq::Error::BodyExceedsLimit(limit)) if success => Err(HttpError::Decode(format!(
            "body exceeds the {limit} byte read limit"
        ))),
        Err(source) if success => Err(transport_error(prepared, source)),
        Err(err) => {
            warn!(url = %prepared.url, error = %err, "discarding unreadable error response body");
            Ok(String::new())
        }
    }
}

fn transport_error(prepared: &PreparedRequest, source: ureq::Error) -> HttpError {
    error!(method = %prepared.method, url = %prepared.url, error = %source, "request raised an error");
    HttpError::Transport {
        method: prepared.method,
        url: prepared.url.clone(),
        source,
    }
}

fn session(settings: &HttpSettings) -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(settings.timeout))
        .build()
        .new_agent()
}

fn send(agent: &Agent, prepared: &PreparedRequest) -> Result<Response<Body>, ureq::Error> {
    let url = prepared.url.as_str();
    let headers = prepared.headers.as_slice();
    let body = prepared.body.as_deref();

    match prepared.method {
        HttpMethod::Get => with_headers(agent.get(url), headers).call(),
        HttpMethod::Delete => with_headers(agent.delete(url), headers).call(),
        HttpMethod::Head => with_headers(agent.head(url), headers).call(),
        HttpMethod::Options => with_headers(agent.options(url), headers).call(),
        HttpMethod::Post => send_body(with_headers(agent.post(url), headers), body),
        HttpMethod::Put => send_body(with_headers(agent.put(url), headers), body),
        HttpMethod::Patch => send_body(with_headers(agent.patch(url), headers), body),
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_body(builder: RequestBuilder<WithBody>, body: Option<&str>) -> Result<Response<Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body),
        None => builder.send_empty(),
    }
}
