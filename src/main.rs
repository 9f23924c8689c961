use std::sync::Arc;

use anyhow::{Context, Result};
use compass::{
    CompassClient, CompassConfig, ItineraryFlow, ItineraryFlowInput, api::AppState, telemetry, web,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let config = CompassConfig::load()?;
    let _telemetry = telemetry::init(&config)?;

    let client = Arc::new(CompassClient::new(config)?);
    for plugin in client.plugins() {
        info!("Enabled plugin {}", plugin);
    }
    let flow = Arc::new(ItineraryFlow::from_client(client.clone()));

    // `compass <request> [image urls...]` runs the flow once and prints the result
    let mut args = std::env::args().skip(1);
    if let Some(request) = args.next() {
        let image_urls: Vec<String> = args.collect();
        let mut input = ItineraryFlowInput::new(request);
        if !image_urls.is_empty() {
            input = input.with_images(image_urls);
        }

        let output = flow.run(&input).await?;
        let json = serde_json::to_string_pretty(&output).context("Failed to encode itineraries")?;
        println!("{json}");
        return Ok(());
    }

    let state = AppState {
        flow,
        project_id: client.project_id().to_string(),
        plugins: client.plugins().to_vec(),
    };
    web::run(&client.config().server, state).await
}
