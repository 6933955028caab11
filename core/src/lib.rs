//! Blocking OAuth2 client-credentials exchange and bearer-authenticated graph
//! queries.
//!
//! # Overview
//! Exchanges a client id and secret for a bearer token at an OAuth2 token
//! endpoint, then presents that token to a Neo4j HTTP Query API endpoint to
//! run a single Cypher statement.
//!
//! # Design
//! - `HttpRequest` describes one request as plain data. `prepare` applies the
//!   auth strategy and encodes the body without touching the network.
//! - `execute` is the only function that performs I/O. It opens one agent per
//!   call, sends exactly one request and maps the response to an `Outcome`.
//!   Non-2xx statuses are soft failures (`Outcome::Failed`); only transport
//!   failures are errors.
//! - The token and graph modules split each operation into a pure `build_*`
//!   half and a pure `extract_*`/`parse_*` half around `execute`.
//! - Configuration is a plain value built once and passed by reference.

pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod http;
pub mod showcase;
pub mod token;

pub use config::{Config, Neo4jConfig, OktaConfig};
pub use error::{ConfigError, GraphError, HttpError, ShowcaseError};
pub use executor::{execute, interpret, HttpSettings};
pub use graph::{execute_query, QueryResult, QuerySummary, Record, PERSON_NAMES_QUERY};
pub use http::{Auth, HttpMethod, HttpRequest, HttpResponse, Outcome, PreparedRequest, RequestBody};
pub use token::{acquire_token, BearerToken};
