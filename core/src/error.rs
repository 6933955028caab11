//! Error types for the executor, the graph query and configuration loading.
//!
//! # Design
//! Only conditions the caller cannot recover from are errors. A non-2xx
//! response is not an `HttpError`; it is reported as `Outcome::Failed` and
//! the caller decides what it means. `GraphError` is the exception: a
//! rejected query has no useful "empty" reading, so it is surfaced.

use thiserror::Error;

use crate::http::HttpMethod;

/// Errors returned by `execute` and `HttpRequest::prepare`.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The descriptor cannot be sent as built (empty URL, body on a GET, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The form body could not be URL-encoded.
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),

    /// Connection refused, DNS failure, TLS failure or timeout.
    #[error("{method} {url} raised an error: {source}")]
    Transport {
        method: HttpMethod,
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// A 2xx response whose body is not UTF-8 JSON within the read limit.
    #[error("response body could not be decoded: {0}")]
    Decode(String),
}

/// Errors returned by the graph query operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The configured database URI cannot be mapped to a query endpoint.
    #[error("invalid database URI {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    /// The request itself failed at the transport level.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The server answered with a non-2xx status.
    #[error("query rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The server accepted the request but reported a query error.
    #[error("query failed ({code}): {message}")]
    Query { code: String, message: String },

    /// The response did not have the expected `data.fields`/`data.values` shape.
    #[error("malformed query response: {0}")]
    Malformed(String),
}

/// Errors returned while loading `Config`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration value {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to read env file {path}: {source}")]
    EnvFile {
        path: String,
        #[source]
        source: dotenvy::Error,
    },
}

/// Errors returned by `showcase::run`.
#[derive(Debug, Error)]
pub enum ShowcaseError {
    #[error("token request failed: {0}")]
    Token(#[source] HttpError),

    /// The token endpoint answered but issued no `access_token`.
    #[error("{token_uri} issued no access_token; not connecting to {database_uri} without a credential")]
    NoToken { token_uri: String, database_uri: String },

    #[error("query against {uri} failed: {source}")]
    Query {
        uri: String,
        #[source]
        source: GraphError,
    },

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}
