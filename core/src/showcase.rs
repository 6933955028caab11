//! The token-then-query flow behind the `querytoken` binary.
//!
//! Output goes to a caller-supplied writer: the token line, one JSON line
//! per record, then a summary line.

use std::io::Write;

use tracing::warn;

use crate::config::Config;
use crate::error::ShowcaseError;
use crate::graph::{execute_query, QueryResult};
use crate::token::acquire_token;

/// Acquire a token with `config.okta`, run `query` with it and print the
/// result to `out`.
///
/// Fails with `ShowcaseError::NoToken` before contacting the database when
/// the token endpoint issues no token.
pub fn run<W: Write>(config: &Config, query: &str, out: &mut W) -> Result<QueryResult, ShowcaseError> {
    let okta = &config.okta;
    let token = acquire_token(
        &okta.token_uri,
        &okta.client_id,
        &okta.client_secret,
        &okta.scope,
        &config.http,
    )
    .map_err(ShowcaseError::Token)?;

    let Some(token) = token else {
        warn!(token_uri = %okta.token_uri, "no access token issued, skipping query");
        return Err(ShowcaseError::NoToken {
            token_uri: okta.token_uri.clone(),
            database_uri: config.neo4j.uri.clone(),
        });
    };
    writeln!(out, "Okta token: {}", token.secret())?;

    let result = execute_query(&config.neo4j, query, &token, &config.http).map_err(|source| {
        ShowcaseError::Query {
            uri: config.neo4j.uri.clone(),
            source,
        }
    })?;

    for record in &result.records {
        writeln!(out, "{}", serde_json::Value::Object(record.clone()))?;
    }
    writeln!(
        out,
        "The query `{}` returned {} records in {} ms.",
        result.summary.query,
        result.records.len(),
        result.summary.result_available_after.as_millis()
    )?;
    Ok(result)
}
