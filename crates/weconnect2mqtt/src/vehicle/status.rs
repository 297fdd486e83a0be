use serde::Deserialize;
use strum::{Display, EnumString};

use super::attribute::AttributeValue;

/// Local addresses of the attributes this daemon observes.
///
/// These are the leaf attribute names of the We Connect status model; they
/// are unique within one vehicle and contain no topic separators.
pub mod address {
    pub const VIN: &str = "vin";
    pub const OVERALL_STATUS: &str = "overallStatus";
    pub const CURRENT_SOC_PCT: &str = "currentSOC_pct";
    pub const CRUISING_RANGE_KM: &str = "cruisingRangeElectric_km";
    pub const CHARGING_STATE: &str = "chargingState";
    pub const CHARGE_MODE: &str = "chargeMode";
    pub const CHARGE_POWER_KW: &str = "chargePower_kW";
    pub const CHARGE_RATE_KMPH: &str = "chargeRate_kmph";
    pub const REMAINING_CLIMATISATION_TIME_MIN: &str = "remainingClimatisationTime_min";
    pub const CLIMATISATION_STATE: &str = "climatisationState";
    pub const PARKING_LATITUDE: &str = "latitude";
    pub const PARKING_LONGITUDE: &str = "longitude";
    pub const PLUG_CONNECTION_STATE: &str = "plugConnectionState";
    pub const PLUG_LOCK_STATE: &str = "plugLockState";
}

/// One full status snapshot for a vehicle, as returned by the API.
///
/// Categories the account or vehicle does not support are absent; their
/// attributes are then reported as disabled.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStatus {
    pub access_status: Option<AccessStatus>,
    pub battery_status: Option<BatteryStatus>,
    pub charging_status: Option<ChargingStatus>,
    pub climatisation_status: Option<ClimatisationStatus>,
    pub parking_position: Option<ParkingPosition>,
    pub plug_status: Option<PlugStatus>,
}

impl VehicleStatus {
    /// Flatten the snapshot into `(address, value)` pairs for every known
    /// attribute. Attributes of absent categories flatten to `None`.
    pub fn attributes(&self) -> Vec<(&'static str, Option<AttributeValue>)> {
        let access = self.access_status.as_ref();
        let battery = self.battery_status.as_ref();
        let charging = self.charging_status.as_ref();
        let climatisation = self.climatisation_status.as_ref();
        let parking = self.parking_position.as_ref();
        let plug = self.plug_status.as_ref();

        vec![
            (
                address::OVERALL_STATUS,
                access.map(|a| a.overall_status.to_string().into()),
            ),
            (
                address::CURRENT_SOC_PCT,
                battery.map(|b| b.current_soc_pct.into()),
            ),
            (
                address::CRUISING_RANGE_KM,
                battery.map(|b| b.cruising_range_electric_km.into()),
            ),
            (
                address::CHARGING_STATE,
                charging.map(|c| c.charging_state.to_string().into()),
            ),
            (
                address::CHARGE_MODE,
                charging.map(|c| c.charge_mode.to_string().into()),
            ),
            (
                address::CHARGE_POWER_KW,
                charging.map(|c| c.charge_power_kw.into()),
            ),
            (
                address::CHARGE_RATE_KMPH,
                charging.map(|c| c.charge_rate_kmph.into()),
            ),
            (
                address::REMAINING_CLIMATISATION_TIME_MIN,
                climatisation.map(|c| c.remaining_climatisation_time_min.into()),
            ),
            (
                address::CLIMATISATION_STATE,
                climatisation.map(|c| c.climatisation_state.to_string().into()),
            ),
            (address::PARKING_LATITUDE, parking.map(|p| p.lat.into())),
            (address::PARKING_LONGITUDE, parking.map(|p| p.lon.into())),
            (
                address::PLUG_CONNECTION_STATE,
                plug.map(|p| p.plug_connection_state.to_string().into()),
            ),
            (
                address::PLUG_LOCK_STATE,
                plug.map(|p| p.plug_lock_state.to_string().into()),
            ),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessStatus {
    pub overall_status: OverallState,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BatteryStatus {
    #[serde(rename = "currentSOC_pct")]
    pub current_soc_pct: i64,
    #[serde(rename = "cruisingRangeElectric_km")]
    pub cruising_range_electric_km: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChargingStatus {
    pub charging_state: ChargingState,
    pub charge_mode: ChargeMode,
    #[serde(rename = "chargePower_kW")]
    pub charge_power_kw: f64,
    #[serde(rename = "chargeRate_kmph")]
    pub charge_rate_kmph: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClimatisationStatus {
    #[serde(rename = "remainingClimatisationTime_min")]
    pub remaining_climatisation_time_min: i64,
    pub climatisation_state: ClimatisationState,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ParkingPosition {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlugStatus {
    pub plug_connection_state: PlugConnectionState,
    pub plug_lock_state: PlugLockState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum OverallState {
    Safe,
    Unsafe,
    Invalid,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ChargingState {
    Off,
    ReadyForCharging,
    NotReadyForCharging,
    Conservation,
    Charging,
    Discharging,
    Error,
    Unsupported,
    #[serde(other)]
    Unknown,
}

impl ChargingState {
    /// Variants that collapse to the "off" label for the charge state sensor.
    pub fn is_inactive(self) -> bool {
        matches!(
            self,
            ChargingState::Off | ChargingState::ReadyForCharging | ChargingState::Error
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ChargeMode {
    Manual,
    Timer,
    OnlyOwnCurrent,
    PreferredChargingTimes,
    TimerChargingWithClimatisation,
    Invalid,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ClimatisationState {
    Off,
    Heating,
    Cooling,
    Ventilation,
    Invalid,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PlugConnectionState {
    Connected,
    Disconnected,
    Invalid,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PlugLockState {
    Locked,
    Unlocked,
    Invalid,
    #[serde(other)]
    Unknown,
}
