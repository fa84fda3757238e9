// Telemetry service - opens device views over the shared ports
use crate::application::device_view::{DeviceView, ViewSettings};
use crate::application::telemetry_client::{Clock, TelemetryClient};
use crate::domain::device::DeviceInfo;
use crate::domain::error::{TelemetryError, ValidationError};
use std::sync::Arc;

#[derive(Clone)]
pub struct TelemetryService {
    client: Arc<dyn TelemetryClient>,
    clock: Arc<dyn Clock>,
    settings: ViewSettings,
}

impl TelemetryService {
    pub fn new(client: Arc<dyn TelemetryClient>, clock: Arc<dyn Clock>, settings: ViewSettings) -> Self {
        Self {
            client,
            clock,
            settings,
        }
    }

    pub async fn open_view(&self, device_id: &str) -> Result<DeviceView, TelemetryError> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(ValidationError::MissingDevice.into());
        }

        let device = match self.client.describe_device(device_id).await {
            Ok(device) => device,
            Err(e) => {
                tracing::warn!(device_id, error = %e, "Could not describe device, using its id");
                DeviceInfo::from_id(device_id)
            }
        };

        tracing::info!(device_id, name = %device.name, "Opened device view");
        Ok(DeviceView::new(
            device,
            self.client.clone(),
            self.clock.clone(),
            self.settings.clone(),
        ))
    }
}
