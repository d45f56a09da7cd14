use tracing::info;

use gridsync::broker::BrokerClient;
use gridsync::config::load_config;
use gridsync::control::SimulationControlService;
use gridsync::transport::websocket::start_websocket_server;
use gridsync::utils::{GridError, logging};

#[tokio::main]
async fn main() -> Result<(), GridError> {
    dotenvy::dotenv().ok();
    let config = load_config()?;
    logging::init(&config.log.level);

    let broker = BrokerClient::connect(&config.broker.url).await?;
    let service = SimulationControlService::new(broker);

    let _output_relay = service.start_output_relay()?;
    let _started = service.on_simulation_started(|simulation_id| {
        info!("simulation {simulation_id} started");
    })?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    start_websocket_server(&addr, service).await
}
