use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tracing_subscriber::filter::LevelFilter;

use weconnect2mqtt::config::{Cli, Config};
use weconnect2mqtt::mqtt::{spawn_dispatcher, MessageRouter, MqttClient, RumqttcClient};
use weconnect2mqtt::observer::VehicleObserver;
use weconnect2mqtt::vehicle::{Vehicle, VehicleApi, WeConnectClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::resolve(Cli::parse())?;

    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(config.log_level))
        .init();

    info!("weconnect2mqtt starting");

    // MQTT first, so availability can be published as soon as entities exist
    let client = Arc::new(Mutex::new(RumqttcClient::new(&config)));
    {
        let mut client = client.lock().await;
        client.connect().await?;
    }
    info!("connected to MQTT broker at {}:{}", config.broker, config.port);

    // Inbound messages (switch command topics) are delivered by this task.
    let router = Arc::new(MessageRouter::new());
    let dispatcher = spawn_dispatcher(Arc::clone(&router), Arc::clone(&client));

    // Login failure is fatal: no entity is created before it succeeds.
    let mut api = WeConnectClient::new(&config.username, &config.password);
    api.login().await.context("We Connect login failed")?;
    info!("logged in to We Connect");

    let summaries = api.vehicles().await.context("failed to list vehicles")?;
    info!("account has {} vehicle(s)", summaries.len());

    let mut fleet: Vec<(Vehicle, VehicleObserver<RumqttcClient>)> = Vec::new();
    for summary in summaries {
        let status = api
            .vehicle_status(&summary.vin)
            .await
            .with_context(|| format!("initial status fetch failed for {}", summary.vin))?;

        let mut vehicle = Vehicle::new(summary);
        vehicle.apply_status(&status);

        let observer =
            VehicleObserver::register(Arc::clone(&client), &vehicle, &status, &config.prefix)
                .await?;

        if let Some(dir) = &config.images {
            if let Err(e) = save_vehicle_image(&api, dir, &vehicle.vin).await {
                warn!(vin = %vehicle.vin, "failed to save vehicle image: {e}");
            }
        }

        fleet.push((vehicle, observer));
    }

    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // the first tick fires immediately; the initial fetch already happened
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                for (vehicle, observer) in fleet.iter_mut() {
                    // transient refresh failures keep the loop running
                    match api.vehicle_status(&vehicle.vin).await {
                        Ok(status) => {
                            let events = vehicle.apply_status(&status);
                            if let Err(e) = observer.apply_events(&events).await {
                                warn!(vin = %vehicle.vin, "failed to publish update: {e}");
                            }
                        }
                        Err(e) => warn!(vin = %vehicle.vin, "status refresh failed: {e}"),
                    }
                }
                debug!("refresh complete");
            }
        }
    }

    // Mark everything offline before disconnecting so Home Assistant shows
    // entities unavailable immediately instead of waiting on a timeout.
    info!("marking entities offline");
    for (_, observer) in fleet.iter_mut() {
        if let Err(e) = observer.close().await {
            warn!("failed to publish offline availability: {e}");
        }
    }

    dispatcher.abort();
    {
        let mut client = client.lock().await;
        client.disconnect().await?;
    }

    info!("weconnect2mqtt shutdown complete");
    Ok(())
}

/// One-time vehicle picture fetch, saved as `{dir}/{vin}.png`.
async fn save_vehicle_image(api: &impl VehicleApi, dir: &Path, vin: &str) -> anyhow::Result<()> {
    let bytes = api.vehicle_image(vin).await?;
    let path = dir.join(format!("{vin}.png"));
    tokio::fs::write(&path, bytes).await?;
    info!(vin, path = %path.display(), "saved vehicle image");
    Ok(())
}
