use std::net::TcpListener;
use request_shield::configuration::get_configuration;
use request_shield::startup::run;
use request_shield::telemetry::init_telemetry;

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
            request_shield::safe_error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    if !configuration.https.enabled {
        request_shield::safe_warn!("HTTPS enforcement disabled; sensitive paths are only monitored");
    }

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, configuration)?;
    tracing::info!("Server started successfully");

    server.await
}
