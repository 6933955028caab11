use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use querytoken_core::{showcase, Config, PERSON_NAMES_QUERY};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exchange Okta client credentials for a bearer token and use it to query Neo4j.
#[derive(Debug, Parser)]
#[command(name = "querytoken", version)]
struct Cli {
    /// Env file to load before reading configuration (defaults to ./.env if present)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Cypher statement to run
    #[arg(long, default_value = PERSON_NAMES_QUERY)]
    query: String,

    /// Database name, overriding NEO4J_DATABASE
    #[arg(long)]
    database: Option<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load(cli.env_file.as_deref()).context("failed to load configuration")?;
    if let Some(database) = cli.database {
        config.neo4j.database = database;
    }

    let mut stdout = std::io::stdout().lock();
    showcase::run(&config, &cli.query, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("querytoken=info,querytoken_core=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
