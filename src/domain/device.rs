// Device domain model
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub device_type: Option<String>,
}

impl DeviceInfo {
    pub fn new(id: String, name: String, device_type: Option<String>) -> Self {
        Self {
            id,
            name,
            device_type,
        }
    }

    /// Used when the backend cannot describe the device.
    pub fn from_id(id: &str) -> Self {
        Self::new(id.to_string(), Self::format_name(id), None)
    }

    fn format_name(id: &str) -> String {
        // "boiler_room_sensor_" -> "boiler room sensor"
        let name = id.trim_end_matches(['_', '-']).replace(['_', '-'], " ");
        if name.trim().is_empty() {
            id.to_string()
        } else {
            name
        }
    }

    /// Lowercase, filesystem-safe form of the name for artifact file names.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        for c in self.name.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('-') {
                slug.push('-');
            }
        }
        let slug = slug.trim_matches('-').to_string();
        if slug.is_empty() { "device".to_string() } else { slug }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_name() {
        let device = DeviceInfo::from_id("boiler_room_sensor_");
        assert_eq!(device.name, "boiler room sensor");

        let device = DeviceInfo::from_id("dev-1");
        assert_eq!(device.name, "dev 1");
    }

    #[test]
    fn test_slug() {
        let device = DeviceInfo::new("x".into(), "Pump #3 (North)".into(), None);
        assert_eq!(device.slug(), "pump-3-north");

        let device = DeviceInfo::new("x".into(), "°°".into(), None);
        assert_eq!(device.slug(), "device");
    }
}
