//! OAuth2 client-credentials grant.
//!
//! `build_token_request` and `extract_token` are pure; `acquire_token` runs
//! the request through the executor between them.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::HttpError;
use crate::executor::{execute, HttpSettings};
use crate::http::{Auth, HttpMethod, HttpRequest, Outcome, RequestBody};

pub const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";

/// An opaque bearer credential issued by the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    pub fn into_auth(self) -> Auth {
        Auth::Bearer(self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Successful token response fields (RFC 6749, section 5.1) other than the
/// token itself. Only used for logging.
#[derive(Debug, Deserialize)]
struct GrantMetadata {
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    scope: Option<String>,
}

/// Build the client-credentials request for `token_url`.
pub fn build_token_request(token_url: &str, client_id: &str, client_secret: &str, scope: &str) -> HttpRequest {
    HttpRequest::new(HttpMethod::Post, token_url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .header("Accept", "application/json")
        .body(RequestBody::form([
            ("grant_type", CLIENT_CREDENTIALS_GRANT),
            ("scope", scope),
        ]))
        .auth(Auth::basic(client_id, client_secret))
}

/// The `access_token` carried by a successful outcome.
///
/// Returns `None` for a failed outcome, a body without `access_token`, or an
/// `access_token` that is not a non-empty string.
pub fn extract_token(outcome: &Outcome) -> Option<BearerToken> {
    match outcome {
        Outcome::Ok(value) => value
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(BearerToken::new),
        Outcome::Failed { status, body } => {
            warn!(status, body = %body, "token endpoint did not issue a token");
            None
        }
    }
}

/// Exchange client credentials for a bearer token.
///
/// `Ok(None)` means the endpoint answered but issued no token (bad
/// credentials, bad scope, unexpected body). Only transport failures are
/// returned as errors.
pub fn acquire_token(
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    scope: &str,
    settings: &HttpSettings,
) -> Result<Option<BearerToken>, HttpError> {
    let request = build_token_request(token_url, client_id, client_secret, scope);
    let outcome = execute(request, settings)?;

    let token = extract_token(&outcome);
    match (&token, outcome.json()) {
        (Some(_), Some(value)) => {
            if let Ok(meta) = GrantMetadata::deserialize(value) {
                debug!(
                    token_type = meta.token_type.as_deref().unwrap_or("unknown"),
                    expires_in = meta.expires_in,
                    scope = meta.scope.as_deref().unwrap_or(scope),
                    "access token issued"
                );
            }
        }
        (None, Some(value)) => {
            let error = value.get("error").and_then(Value::as_str).unwrap_or("none");
            warn!(error, "token response has no access_token");
        }
        _ => {}
    }
    Ok(token)
}
