use std::net::TcpListener;
use sessionkeeper::configuration::get_configuration;
use sessionkeeper::startup::{build_auth_service, build_store, run};
use sessionkeeper::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let store = build_store(&configuration).await?;
    let auth = build_auth_service(&configuration, store);

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, auth, configuration.session.strict_epoch_check)?;
    server.await
}
