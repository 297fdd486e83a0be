use serde::Serialize;

/// Discovery document published (retained) to an entity's config topic.
///
/// Follows Home Assistant's MQTT discovery schema. Optional keys are
/// omitted from the wire format entirely when unset, never sent as null.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiscoveryDocument {
    pub availability_topic: String,
    pub name: String,
    pub state_topic: String,
    pub unique_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,

    /// Entity device class (e.g. "battery", "plug")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,

    /// Sensor unit (e.g. "%", "km")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,

    /// Topic Home Assistant sends switch commands to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,
}

/// Device sub-object grouping all of one vehicle's entities.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DeviceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
