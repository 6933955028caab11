//! Bearer-authenticated Cypher queries over the Neo4j HTTP Query API.
//!
//! # Design
//! The query goes through the same executor as the token request, with
//! `Auth::Bearer` carrying the issued token. Database URIs written for the
//! Bolt drivers (`neo4j+s://host`, `bolt://host:7687`) are mapped to the
//! HTTP endpoint serving the same database, so one `NEO4J_URI` works for
//! both.

use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::config::Neo4jConfig;
use crate::error::GraphError;
use crate::executor::{execute, HttpSettings};
use crate::http::{HttpMethod, HttpRequest, Outcome, RequestBody};
use crate::token::BearerToken;

pub const PERSON_NAMES_QUERY: &str = "MATCH (p:Person) RETURN p.name AS name";

const BOLT_PORT: u16 = 7687;
const HTTP_PORT: u16 = 7474;

/// One result row, keyed by the returned field names in column order.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct QuerySummary {
    pub query: String,
    pub database: String,
    /// Wall-clock time from sending the query to having the full result.
    pub result_available_after: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub keys: Vec<String>,
    pub records: Vec<Record>,
    pub summary: QuerySummary,
}

#[derive(Deserialize)]
struct QueryResponse {
    data: QueryData,
}

#[derive(Deserialize)]
struct QueryData {
    fields: Vec<String>,
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ServerError>,
}

#[derive(Deserialize)]
struct ServerError {
    code: String,
    message: String,
}

/// Query API endpoint for `database` on the server behind `uri`.
pub fn query_endpoint(uri: &str, database: &str) -> Result<Url, GraphError> {
    let invalid = |reason: &str| GraphError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };
    let parsed = Url::parse(uri).map_err(|err| invalid(&err.to_string()))?;
    let host = parsed.host_str().ok_or_else(|| invalid("missing host"))?;

    let mut endpoint = match parsed.scheme() {
        "http" | "https" => parsed.clone(),
        "neo4j+s" | "neo4j+ssc" | "bolt+s" | "bolt+ssc" => {
            let base = match parsed.port() {
                None | Some(BOLT_PORT) => format!("https://{host}/"),
                Some(port) => format!("https://{host}:{port}/"),
            };
            Url::parse(&base).map_err(|err| invalid(&err.to_string()))?
        }
        "neo4j" | "bolt" => {
            let port = match parsed.port() {
                None | Some(BOLT_PORT) => HTTP_PORT,
                Some(port) => port,
            };
            Url::parse(&format!("http://{host}:{port}/")).map_err(|err| invalid(&err.to_string()))?
        }
        other => return Err(invalid(&format!("unsupported scheme {other:?}"))),
    };

    endpoint.set_query(None);
    endpoint.set_fragment(None);
    endpoint
        .path_segments_mut()
        .map_err(|()| invalid("URI cannot be a base"))?
        .pop_if_empty()
        .extend(["db", database, "query", "v2"]);
    Ok(endpoint)
}

pub fn build_query_request(endpoint: &Url, statement: &str, token: &BearerToken) -> HttpRequest {
    HttpRequest::new(HttpMethod::Post, endpoint.as_str())
        .header("Content-Type", "application/json")
        .header("Accept", "application/json")
        .body(RequestBody::Raw(json!({ "statement": statement }).to_string()))
        .auth(token.clone().into_auth())
}

/// Turn the executor's outcome into rows and a summary.
pub fn parse_query_result(
    outcome: Outcome,
    statement: &str,
    database: &str,
    elapsed: Duration,
) -> Result<QueryResult, GraphError> {
    let value = match outcome {
        Outcome::Ok(value) => value,
        Outcome::Failed { status, body } => {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|resp| resp.errors.into_iter().next())
                .map(|err| format!("{}: {}", err.code, err.message))
                .unwrap_or(body);
            return Err(GraphError::Rejected { status, message });
        }
    };

    if let Ok(ErrorResponse { errors }) = ErrorResponse::deserialize(&value) {
        if let Some(err) = errors.into_iter().next() {
            return Err(GraphError::Query {
                code: err.code,
                message: err.message,
            });
        }
    }

    let response = QueryResponse::deserialize(&value).map_err(|err| GraphError::Malformed(err.to_string()))?;
    let QueryData { fields, values } = response.data;

    let records = values
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            if row.len() != fields.len() {
                return Err(GraphError::Malformed(format!(
                    "row {index} has {} values for {} fields",
                    row.len(),
                    fields.len()
                )));
            }
            Ok(fields.iter().cloned().zip(row).collect::<Record>())
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(QueryResult {
        keys: fields,
        records,
        summary: QuerySummary {
            query: statement.to_string(),
            database: database.to_string(),
            result_available_after: elapsed,
        },
    })
}

/// Run `statement` against the configured database, authenticated by `token`.
pub fn execute_query(
    neo4j: &Neo4jConfig,
    statement: &str,
    token: &BearerToken,
    settings: &HttpSettings,
) -> Result<QueryResult, GraphError> {
    let endpoint = query_endpoint(&neo4j.uri, &neo4j.database)?;
    debug!(endpoint = %endpoint, "running query");

    let started = Instant::now();
    let outcome = execute(build_query_request(&endpoint, statement, token), settings)?;
    let result = parse_query_result(outcome, statement, &neo4j.database, started.elapsed())?;

    info!(
        records = result.records.len(),
        elapsed_ms = result.summary.result_available_after.as_millis() as u64,
        "query completed"
    );
    Ok(result)
}
