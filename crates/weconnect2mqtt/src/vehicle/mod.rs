//! The vehicle-account side: the API collaborator boundary, the typed
//! status model, and the attribute registry that turns snapshot refreshes
//! into change events.

mod api;
mod attribute;
mod status;

pub use api::{VehicleApi, VehicleSummary, WeConnectClient};
pub use attribute::{AttributeEvent, AttributeRegistry, AttributeValue, ChangeFlags};
pub use status::{
    address, AccessStatus, BatteryStatus, ChargeMode, ChargingState, ChargingStatus,
    ClimatisationState, ClimatisationStatus, OverallState, ParkingPosition, PlugConnectionState,
    PlugLockState, PlugStatus, VehicleStatus,
};

/// One vehicle of the account, holding its identity and attribute registry.
#[derive(Debug)]
pub struct Vehicle {
    pub vin: String,
    pub model: Option<String>,
    pub nickname: Option<String>,
    registry: AttributeRegistry,
}

impl Vehicle {
    pub fn new(summary: VehicleSummary) -> Self {
        Self {
            vin: summary.vin,
            model: summary.model,
            nickname: summary.nickname,
            registry: AttributeRegistry::new(),
        }
    }

    /// Apply a refreshed status snapshot, returning one change event per
    /// attribute. The VIN is carried as an always-enabled attribute so it
    /// is published like any other sensor.
    pub fn apply_status(&mut self, status: &VehicleStatus) -> Vec<AttributeEvent> {
        let mut snapshot = vec![(address::VIN, Some(AttributeValue::Str(self.vin.clone())))];
        snapshot.extend(status.attributes());
        self.registry.apply(snapshot)
    }

    pub fn value(&self, address: &str) -> Option<&AttributeValue> {
        self.registry.value(address)
    }

    pub fn enabled(&self, address: &str) -> bool {
        self.registry.enabled(address)
    }
}
