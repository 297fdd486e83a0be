use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::hass::{Binary, Device, Sensor};
use crate::mqtt::MqttClient;
use crate::vehicle::{
    address, AttributeEvent, AttributeValue, ChargingState, Vehicle, VehicleStatus,
};

/// Per-vehicle orchestrator.
///
/// Maps the vehicle's status attributes to Home Assistant entities,
/// conditioned on which status categories the vehicle reports. For each
/// registered attribute the discovery config is published first, then the
/// initial availability, then the initial state; every later change event
/// re-publishes availability and state. `close` forces every entity
/// offline so Home Assistant marks them unavailable immediately instead of
/// waiting on a timeout.
pub struct VehicleObserver<C: MqttClient> {
    vin: String,
    prefix: String,
    client: Arc<Mutex<C>>,
    device: Arc<Device>,
    sensors: HashMap<String, Sensor<C>>,
    binaries: HashMap<String, Binary<C>>,
}

impl<C: MqttClient> VehicleObserver<C> {
    /// Register all entities for `vehicle` based on its first status
    /// snapshot. Called once per vehicle, after the first successful fetch.
    pub async fn register(
        client: Arc<Mutex<C>>,
        vehicle: &Vehicle,
        status: &VehicleStatus,
        prefix: &str,
    ) -> Result<Self> {
        let device = Arc::new(Device::new(
            vehicle.nickname.clone(),
            Some("Volkswagen".to_string()),
            vehicle.model.clone(),
            Some(vehicle.vin.clone()),
        ));

        let mut observer = Self {
            vin: vehicle.vin.clone(),
            prefix: prefix.to_string(),
            client,
            device,
            sensors: HashMap::new(),
            binaries: HashMap::new(),
        };

        observer
            .add_sensor(vehicle, address::VIN, "VIN", None, None)
            .await?;

        if status.access_status.is_some() {
            observer
                .add_sensor(vehicle, address::OVERALL_STATUS, "Access", None, None)
                .await?;
        }

        if status.battery_status.is_some() {
            observer
                .add_sensor(
                    vehicle,
                    address::CURRENT_SOC_PCT,
                    "Battery percentage",
                    Some("battery"),
                    Some("%"),
                )
                .await?;
            observer
                .add_sensor(vehicle, address::CRUISING_RANGE_KM, "Range", None, Some("km"))
                .await?;
        }

        if status.charging_status.is_some() {
            observer
                .add_binary(
                    vehicle,
                    address::CHARGING_STATE,
                    "Charge state",
                    Some("battery_charging"),
                    vec![json!("charging")],
                )
                .await?;
            observer
                .add_sensor(vehicle, address::CHARGE_MODE, "Charge mode", None, None)
                .await?;
            observer
                .add_sensor(
                    vehicle,
                    address::CHARGE_POWER_KW,
                    "Charge power",
                    Some("power"),
                    Some("kW"),
                )
                .await?;
            observer
                .add_sensor(
                    vehicle,
                    address::CHARGE_RATE_KMPH,
                    "Charge rate",
                    None,
                    Some("kmph"),
                )
                .await?;
        }

        if status.climatisation_status.is_some() {
            observer
                .add_sensor(
                    vehicle,
                    address::REMAINING_CLIMATISATION_TIME_MIN,
                    "Remaining climatisation time",
                    None,
                    Some("minutes"),
                )
                .await?;
            observer
                .add_binary(
                    vehicle,
                    address::CLIMATISATION_STATE,
                    "Climatisation",
                    Some("power"),
                    vec![json!("cooling"), json!("heating"), json!("ventilation")],
                )
                .await?;
        }

        if status.parking_position.is_some() {
            observer
                .add_sensor(vehicle, address::PARKING_LATITUDE, "Parking Latitude", None, None)
                .await?;
            observer
                .add_sensor(
                    vehicle,
                    address::PARKING_LONGITUDE,
                    "Parking Longitude",
                    None,
                    None,
                )
                .await?;
        }

        if status.plug_status.is_some() {
            observer
                .add_binary(
                    vehicle,
                    address::PLUG_CONNECTION_STATE,
                    "Plug",
                    Some("plug"),
                    vec![json!("connected")],
                )
                .await?;
            observer
                .add_binary(
                    vehicle,
                    address::PLUG_LOCK_STATE,
                    "Plug lock",
                    Some("lock"),
                    vec![json!("locked")],
                )
                .await?;
        }

        info!(
            vin = %observer.vin,
            sensors = observer.sensors.len(),
            binaries = observer.binaries.len(),
            "registered vehicle entities"
        );

        Ok(observer)
    }

    /// Unique id of the entity observing `address` on this vehicle.
    pub fn unique_id(&self, address: &str) -> String {
        format!("{}_{}", self.vin, address)
    }

    async fn add_sensor(
        &mut self,
        vehicle: &Vehicle,
        address: &'static str,
        name: &str,
        device_class: Option<&str>,
        unit_of_measurement: Option<&str>,
    ) -> Result<()> {
        let mut sensor = Sensor::new(
            Arc::clone(&self.client),
            self.unique_id(address),
            name,
            Some(Arc::clone(&self.device)),
            device_class.map(str::to_string),
            unit_of_measurement.map(str::to_string),
            self.prefix.clone(),
        );

        // discovery config must reach the broker before any state
        sensor.publish_config().await?;
        sensor.set_available(vehicle.enabled(address)).await?;
        if let Some(value) = vehicle.value(address) {
            sensor.publish_state(&normalize(address, value)).await?;
        }

        self.sensors.insert(address.to_string(), sensor);
        Ok(())
    }

    async fn add_binary(
        &mut self,
        vehicle: &Vehicle,
        address: &'static str,
        name: &str,
        device_class: Option<&str>,
        enable_values: Vec<Value>,
    ) -> Result<()> {
        let mut binary = Binary::new(
            Arc::clone(&self.client),
            self.unique_id(address),
            name,
            Some(Arc::clone(&self.device)),
            device_class.map(str::to_string),
            enable_values,
            Vec::new(),
            self.prefix.clone(),
        );

        binary.publish_config().await?;
        binary.set_available(vehicle.enabled(address)).await?;
        if let Some(value) = vehicle.value(address) {
            binary.set_state(&value.to_json()).await?;
        }

        self.binaries.insert(address.to_string(), binary);
        Ok(())
    }

    /// Forward one attribute change to the entity observing it, if any.
    pub async fn handle_event(&mut self, event: &AttributeEvent) -> Result<()> {
        if let Some(sensor) = self.sensors.get_mut(event.address.as_str()) {
            sensor.set_available(event.enabled).await?;
            if let Some(value) = &event.value {
                sensor.publish_state(&normalize(&event.address, value)).await?;
                debug!(unique_id = sensor.unique_id(), "sensor updated");
            }
        } else if let Some(binary) = self.binaries.get_mut(event.address.as_str()) {
            binary.set_available(event.enabled).await?;
            if let Some(value) = &event.value {
                binary.set_state(&value.to_json()).await?;
                debug!(unique_id = binary.unique_id(), "binary updated");
            }
        }
        Ok(())
    }

    pub async fn apply_events(&mut self, events: &[AttributeEvent]) -> Result<()> {
        for event in events {
            self.handle_event(event).await?;
        }
        Ok(())
    }

    /// Force every registered entity offline. Called before disconnect.
    pub async fn close(&mut self) -> Result<()> {
        for sensor in self.sensors.values_mut() {
            sensor.set_available(false).await?;
        }
        for binary in self.binaries.values_mut() {
            binary.set_available(false).await?;
        }
        Ok(())
    }
}

/// Per-attribute display normalization, applied to sensor values only.
///
/// The charge state enum collapses its inactive variants into a single
/// "off" label; every other value publishes its wire label unchanged.
fn normalize(address: &str, value: &AttributeValue) -> Value {
    if address == address::CHARGING_STATE {
        if let AttributeValue::Str(label) = value {
            if label
                .parse::<ChargingState>()
                .is_ok_and(ChargingState::is_inactive)
            {
                return json!("off");
            }
        }
    }
    value.to_json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::MockMqttClient;
    use crate::vehicle::{
        BatteryStatus, ChargeMode, ChargingStatus, PlugConnectionState, PlugLockState, PlugStatus,
        VehicleSummary,
    };

    const VIN: &str = "WVWZZZE1ZMP000001";

    fn vehicle() -> Vehicle {
        Vehicle::new(VehicleSummary {
            vin: VIN.to_string(),
            model: Some("ID.3".to_string()),
            nickname: Some("My ID.3".to_string()),
        })
    }

    fn charging_status() -> VehicleStatus {
        VehicleStatus {
            battery_status: Some(BatteryStatus {
                current_soc_pct: 82,
                cruising_range_electric_km: 310,
            }),
            charging_status: Some(ChargingStatus {
                charging_state: ChargingState::Charging,
                charge_mode: ChargeMode::Manual,
                charge_power_kw: 11.0,
                charge_rate_kmph: 45.0,
            }),
            ..VehicleStatus::default()
        }
    }

    async fn registered_observer(
        status: &VehicleStatus,
    ) -> (
        Arc<Mutex<MockMqttClient>>,
        Vehicle,
        VehicleObserver<MockMqttClient>,
    ) {
        let client = Arc::new(Mutex::new(MockMqttClient::new()));
        let mut vehicle = vehicle();
        vehicle.apply_status(status);
        let observer =
            VehicleObserver::register(Arc::clone(&client), &vehicle, status, "homeassistant")
                .await
                .unwrap();
        (client, vehicle, observer)
    }

    #[tokio::test]
    async fn test_battery_and_charging_scenario() {
        let (client, _, _) = registered_observer(&charging_status()).await;

        let mock = client.lock().await;
        assert_eq!(
            mock.payloads_for(&format!(
                "homeassistant/sensor/{VIN}_currentSOC_pct/state"
            )),
            vec!["82"]
        );
        assert_eq!(
            mock.payloads_for(&format!(
                "homeassistant/binary_sensor/{VIN}_chargingState/state"
            )),
            vec!["ON"]
        );
        assert_eq!(
            mock.payloads_for(&format!(
                "homeassistant/sensor/{VIN}_currentSOC_pct/available"
            )),
            vec!["online"]
        );
    }

    #[tokio::test]
    async fn test_config_published_before_state_for_every_entity() {
        let (client, _, _) = registered_observer(&charging_status()).await;

        let mock = client.lock().await;
        for (topic, _, _) in mock.published.iter().filter(|(t, _, _)| t.ends_with("/state")) {
            let config_topic = topic.replace("/state", "/config");
            let config_index = mock
                .published
                .iter()
                .position(|(t, _, _)| *t == config_topic)
                .unwrap_or_else(|| panic!("no config published for {topic}"));
            let state_index = mock
                .published
                .iter()
                .position(|(t, _, _)| t == topic)
                .unwrap();
            assert!(config_index < state_index, "state preceded config on {topic}");
        }
    }

    #[tokio::test]
    async fn test_config_published_exactly_once_per_entity() {
        let (client, _, _) = registered_observer(&charging_status()).await;

        let mock = client.lock().await;
        let mut config_topics: Vec<&str> = mock
            .published
            .iter()
            .filter(|(t, _, _)| t.ends_with("/config"))
            .map(|(t, _, _)| t.as_str())
            .collect();
        let total = config_topics.len();
        config_topics.sort_unstable();
        config_topics.dedup();
        assert_eq!(config_topics.len(), total);
        // VIN + 2 battery sensors + 3 charging sensors + 1 charging binary
        assert_eq!(total, 7);
    }

    #[tokio::test]
    async fn test_absent_categories_register_nothing() {
        let status = VehicleStatus {
            plug_status: Some(PlugStatus {
                plug_connection_state: PlugConnectionState::Connected,
                plug_lock_state: PlugLockState::Locked,
            }),
            ..VehicleStatus::default()
        };
        let (client, _, _) = registered_observer(&status).await;

        let mock = client.lock().await;
        assert!(mock
            .payloads_for(&format!("homeassistant/sensor/{VIN}_currentSOC_pct/state"))
            .is_empty());
        assert_eq!(
            mock.payloads_for(&format!(
                "homeassistant/binary_sensor/{VIN}_plugConnectionState/state"
            )),
            vec!["ON"]
        );
        assert_eq!(
            mock.payloads_for(&format!(
                "homeassistant/binary_sensor/{VIN}_plugLockState/state"
            )),
            vec!["ON"]
        );
    }

    #[tokio::test]
    async fn test_change_event_republishes_availability_and_state() {
        let status = charging_status();
        let (client, mut vehicle, mut observer) = registered_observer(&status).await;

        let mut updated = status.clone();
        if let Some(battery) = updated.battery_status.as_mut() {
            battery.current_soc_pct = 83;
        }
        let events = vehicle.apply_status(&updated);
        observer.apply_events(&events).await.unwrap();

        let mock = client.lock().await;
        assert_eq!(
            mock.payloads_for(&format!(
                "homeassistant/sensor/{VIN}_currentSOC_pct/state"
            )),
            vec!["82", "83"]
        );
        // availability re-published on every event, changed or not
        assert_eq!(
            mock.payloads_for(&format!(
                "homeassistant/sensor/{VIN}_currentSOC_pct/available"
            )),
            vec!["online", "online"]
        );
    }

    #[tokio::test]
    async fn test_charging_state_collapses_to_off_for_sensors() {
        assert_eq!(
            normalize(
                address::CHARGING_STATE,
                &AttributeValue::Str("readyForCharging".to_string())
            ),
            json!("off")
        );
        assert_eq!(
            normalize(
                address::CHARGING_STATE,
                &AttributeValue::Str("charging".to_string())
            ),
            json!("charging")
        );
        assert_eq!(
            normalize(address::CHARGE_MODE, &AttributeValue::Str("manual".to_string())),
            json!("manual")
        );
    }

    #[tokio::test]
    async fn test_binary_uses_raw_value_not_normalized() {
        let status = charging_status();
        let (client, mut vehicle, mut observer) = registered_observer(&status).await;

        let mut updated = status.clone();
        if let Some(charging) = updated.charging_status.as_mut() {
            charging.charging_state = ChargingState::ReadyForCharging;
        }
        let events = vehicle.apply_status(&updated);
        observer.apply_events(&events).await.unwrap();

        let mock = client.lock().await;
        // readyForCharging is in neither set, so the binary fails closed
        assert_eq!(
            mock.payloads_for(&format!(
                "homeassistant/binary_sensor/{VIN}_chargingState/state"
            )),
            vec!["ON", "OFF"]
        );
    }

    #[tokio::test]
    async fn test_unique_ids_are_deterministic_and_distinct() {
        let (_, _, observer) = registered_observer(&charging_status()).await;

        assert_eq!(
            observer.unique_id(address::CURRENT_SOC_PCT),
            format!("{VIN}_currentSOC_pct")
        );
        assert_eq!(
            observer.unique_id(address::CURRENT_SOC_PCT),
            observer.unique_id(address::CURRENT_SOC_PCT)
        );

        let mut ids: Vec<String> = observer
            .sensors
            .values()
            .map(|s| s.unique_id().to_string())
            .chain(observer.binaries.values().map(|b| b.unique_id().to_string()))
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[tokio::test]
    async fn test_close_marks_every_entity_offline() {
        let (client, _, mut observer) = registered_observer(&charging_status()).await;

        observer.close().await.unwrap();

        let mock = client.lock().await;
        let offline: Vec<_> = mock
            .published
            .iter()
            .filter(|(t, p, _)| t.ends_with("/available") && p == b"offline")
            .collect();
        // one offline publish per registered entity
        assert_eq!(offline.len(), 7);
        assert!(offline.iter().all(|(_, _, retain)| *retain));
    }

    #[tokio::test]
    async fn test_device_attached_to_discovery_config() {
        let (client, _, _) = registered_observer(&charging_status()).await;

        let mock = client.lock().await;
        let (_, payload, _) = mock
            .published
            .iter()
            .find(|(t, _, _)| t.ends_with(&format!("{VIN}_currentSOC_pct/config")))
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(payload).unwrap();
        assert_eq!(json["device"]["identifiers"][0], VIN);
        assert_eq!(json["device"]["manufacturer"], "Volkswagen");
        assert_eq!(json["device"]["model"], "ID.3");
        assert_eq!(json["device"]["name"], "My ID.3");
    }
}
