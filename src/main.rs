use std::net::TcpListener;
use token_gate::configuration::get_configuration;
use token_gate::startup::{build_state, run};
use token_gate::telemetry::init_telemetry;

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

    let state = build_state(&configuration).await.map_err(|e| {
        tracing::error!("Failed to initialise stores: {}", e);
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Store initialisation error")
    })?;

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, state)?;
    tracing::info!("Server started successfully");

    server.await
}
