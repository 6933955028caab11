//! HTTP request and response types for the executor.
//!
//! # Design
//! A request is described as plain data (`HttpRequest`) and turned into a
//! `PreparedRequest` by `prepare`, which applies the auth strategy and
//! encodes the body. Nothing in this module performs I/O; the executor
//! sends the prepared value and hands back an `HttpResponse`.
//!
//! `prepare` consumes the descriptor, so a request cannot be mutated after it
//! is prepared or sent twice.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::error::HttpError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Whether requests with this method may carry a body.
    pub fn allows_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an outgoing request authenticates itself.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    /// HTTP Basic with a username (client id) and password (client secret).
    Basic { username: String, password: String },
    /// `Authorization: Bearer <token>`.
    Bearer(String),
}

impl Auth {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer(token.into())
    }

    /// The `Authorization` header value this strategy adds, if any.
    pub fn header_value(&self) -> Option<String> {
        match self {
            Auth::None => None,
            Auth::Basic { username, password } => {
                let credentials = STANDARD.encode(format!("{username}:{password}"));
                Some(format!("Basic {credentials}"))
            }
            Auth::Bearer(token) => Some(format!("Bearer {token}")),
        }
    }
}

// Credentials never reach logs through `{:?}`.
impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Auth::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    Raw(String),
    /// Fields encoded as `application/x-www-form-urlencoded`, in order.
    Form(Vec<(String, String)>),
}

impl RequestBody {
    pub fn form<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        RequestBody::Form(
            fields
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    fn encode(self) -> Result<Option<String>, HttpError> {
        match self {
            RequestBody::Empty => Ok(None),
            RequestBody::Raw(raw) => Ok(Some(raw)),
            RequestBody::Form(fields) => Ok(Some(serde_urlencoded::to_string(&fields)?)),
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    pub auth: Auth,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            auth: Auth::None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Apply the auth strategy and encode the body.
    ///
    /// An `Authorization` header set by hand is replaced when the auth
    /// strategy produces one.
    pub fn prepare(self) -> Result<PreparedRequest, HttpError> {
        if self.url.trim().is_empty() {
            return Err(HttpError::InvalidRequest("request URL is empty".to_string()));
        }
        if !self.body.is_empty() && !self.method.allows_body() {
            return Err(HttpError::InvalidRequest(format!(
                "{} requests cannot carry a body",
                self.method
            )));
        }

        let mut headers = self.headers;
        if let Some(value) = self.auth.header_value() {
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
            headers.push(("Authorization".to_string(), value));
        }

        Ok(PreparedRequest {
            method: self.method,
            url: self.url,
            headers,
            body: self.body.encode()?,
        })
    }
}

/// A request ready to send: auth applied, body encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl PreparedRequest {
    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A completed HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Canonical reason phrase for `status`, empty when unknown.
    pub reason: String,
    pub body: String,
}

/// What a completed request amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Status 200-299; the decoded JSON body (`Null` when the body was empty).
    Ok(Value),
    /// Any other status. The raw body is kept for diagnostics.
    Failed { status: u16, body: String },
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    pub fn json(&self) -> Option<&Value> {
        match self {
            Outcome::Ok(value) => Some(value),
            Outcome::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_adds_encoded_header() {
        let prepared = HttpRequest::new(HttpMethod::Get, "http://localhost/")
            .auth(Auth::basic("client", "secret"))
            .prepare()
            .unwrap();
        // base64("client:secret")
        assert_eq!(prepared.header("authorization"), Some("Basic Y2xpZW50OnNlY3JldA=="));
    }

    #[test]
    fn bearer_auth_adds_header() {
        let prepared = HttpRequest::new(HttpMethod::Get, "http://localhost/")
            .auth(Auth::bearer("abc123"))
            .prepare()
            .unwrap();
        assert_eq!(prepared.header("Authorization"), Some("Bearer abc123"));
    }

    #[test]
    fn no_auth_leaves_headers_untouched() {
        let prepared = HttpRequest::new(HttpMethod::Get, "http://localhost/")
            .header("Accept", "application/json")
            .prepare()
            .unwrap();
        assert_eq!(
            prepared.headers,
            vec![("Accept".to_string(), "application/json".to_string())]
        );
        assert!(prepared.header("authorization").is_none());
    }

    #[test]
    fn auth_strategy_replaces_manual_authorization_header() {
        let prepared = HttpRequest::new(HttpMethod::Get, "http://localhost/")
            .header("authorization", "Bearer stale")
            .auth(Auth::bearer("fresh"))
            .prepare()
            .unwrap();
        let values: Vec<_> = prepared
            .headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            .collect();
        assert_eq!(values.len(), 1);
        assert_eq!(prepared.header("authorization"), Some("Bearer fresh"));
    }

    #[test]
    fn form_body_is_urlencoded_in_order() {
        let prepared = HttpRequest::new(HttpMethod::Post, "http://localhost/token")
            .body(RequestBody::form([
                ("grant_type", "client_credentials"),
                ("scope", "read write"),
            ]))
            .prepare()
            .unwrap();
        assert_eq!(
            prepared.body.as_deref(),
            Some("grant_type=client_credentials&scope=read+write")
        );
    }

    #[test]
    fn raw_body_is_passed_through() {
        let prepared = HttpRequest::new(HttpMethod::Put, "http://localhost/")
            .body(RequestBody::Raw(r#"{"a":1}"#.to_string()))
            .prepare()
            .unwrap();
        assert_eq!(prepared.body.as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn empty_url_is_rejected() {
        let err = HttpRequest::new(HttpMethod::Get, "  ").prepare().unwrap_err();
        assert!(matches!(err, HttpError::InvalidRequest(_)));
    }

    #[test]
    fn body_on_get_is_rejected() {
        let err = HttpRequest::new(HttpMethod::Get, "http://localhost/")
            .body(RequestBody::Raw("x".to_string()))
            .prepare()
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidRequest(_)));
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let basic = format!("{:?}", Auth::basic("client", "hunter2"));
        assert!(basic.contains("client"));
        assert!(!basic.contains("hunter2"));

        let bearer = format!("{:?}", Auth::bearer("abc123"));
        assert!(!bearer.contains("abc123"));
    }

    #[test]
    fn outcome_json_only_for_success() {
        assert_eq!(Outcome::Ok(Value::Null).json(), Some(&Value::Null));
        let failed = Outcome::Failed {
            status: 500,
            body: String::new(),
        };
        assert!(failed.json().is_none());
        assert!(!failed.is_ok());
    }
}
