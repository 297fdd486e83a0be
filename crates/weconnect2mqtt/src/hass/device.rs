use super::discovery::DeviceInfo;

/// Static descriptor of the vehicle every entity belongs to.
///
/// Shared by `Arc` across all of one vehicle's components so Home Assistant
/// groups them under a single device. Immutable after creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Device {
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    /// Vehicle identification string (VIN)
    pub identifier: Option<String>,
}

impl Device {
    pub fn new(
        name: Option<String>,
        manufacturer: Option<String>,
        model: Option<String>,
        identifier: Option<String>,
    ) -> Self {
        Self {
            name,
            manufacturer,
            model,
            identifier,
        }
    }

    /// Build the discovery sub-object, carrying only the fields that are set.
    pub fn to_discovery(&self) -> DeviceInfo {
        DeviceInfo {
            identifiers: self.identifier.clone().map(|id| vec![id]),
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_discovery_full() {
        let device = Device::new(
            Some("My ID.3".to_string()),
            Some("Volkswagen".to_string()),
            Some("ID.3".to_string()),
            Some("WVWZZZE1ZMP000001".to_string()),
        );

        let info = device.to_discovery();
        assert_eq!(info.identifiers, Some(vec!["WVWZZZE1ZMP000001".to_string()]));
        assert_eq!(info.manufacturer.as_deref(), Some("Volkswagen"));
        assert_eq!(info.model.as_deref(), Some("ID.3"));
        assert_eq!(info.name.as_deref(), Some("My ID.3"));
    }

    #[test]
    fn test_to_discovery_partial() {
        let device = Device::new(None, Some("Volkswagen".to_string()), None, None);

        let info = device.to_discovery();
        assert!(info.identifiers.is_none());
        assert!(info.model.is_none());
        assert!(info.name.is_none());
        assert_eq!(info.manufacturer.as_deref(), Some("Volkswagen"));
    }
}
