// Application state for HTTP handlers
use crate::application::device_view::{DeviceView, LiveMode};
use crate::application::telemetry_service::TelemetryService;
use crate::domain::error::TelemetryError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct AppState {
    pub telemetry_service: TelemetryService,
    /// Mode used when a live request does not name one
    pub live_mode: LiveMode,
    views: Mutex<HashMap<String, Arc<DeviceView>>>,
}

impl AppState {
    pub fn new(telemetry_service: TelemetryService, live_mode: LiveMode) -> Self {
        Self {
            telemetry_service,
            live_mode,
            views: Mutex::new(HashMap::new()),
        }
    }

    fn views(&self) -> MutexGuard<'_, HashMap<String, Arc<DeviceView>>> {
        self.views.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the open view for `device_id`, opening it on first use.
    pub async fn open_view(&self, device_id: &str) -> Result<Arc<DeviceView>, TelemetryError> {
        if let Some(view) = self.view(device_id) {
            return Ok(view);
        }

        let opened = Arc::new(self.telemetry_service.open_view(device_id).await?);
        // A concurrent open may have won; keep the first one registered.
        let view = self
            .views()
            .entry(device_id.to_string())
            .or_insert(opened)
            .clone();
        Ok(view)
    }

    pub fn view(&self, device_id: &str) -> Option<Arc<DeviceView>> {
        self.views().get(device_id).cloned()
    }

    /// Stops polling and forgets the view. Returns false if none was open.
    pub fn close_view(&self, device_id: &str) -> bool {
        let Some(view) = self.views().remove(device_id) else {
            return false;
        };
        view.stop_live();
        tracing::info!(device_id, "Closed device view");
        true
    }

    pub fn close_all(&self) {
        let views: Vec<_> = self.views().drain().collect();
        for (_, view) in &views {
            view.stop_live();
        }
        tracing::info!(count = views.len(), "Closed all device views");
    }
}
