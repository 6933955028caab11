use mock_server::{MockConfig, TOKEN_PATH};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mock_server=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let mut config = MockConfig::default();
    if let Ok(client_id) = std::env::var("MOCK_CLIENT_ID") {
        config.client_id = client_id;
    }
    if let Ok(client_secret) = std::env::var("MOCK_CLIENT_SECRET") {
        config.client_secret = client_secret;
    }

    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    info!("token endpoint: http://{addr}{TOKEN_PATH}");
    info!("database URI:   http://{addr}");
    mock_server::run_with(listener, config).await
}
