// Application layer - ports, controllers and use cases
pub mod device_view;
pub mod export;
pub mod live_poller;
pub mod telemetry_client;
pub mod telemetry_service;
