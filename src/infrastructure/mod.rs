// Infrastructure layer - External dependencies and adapters
pub mod chunked_stream;
pub mod config;
pub mod credentials;
pub mod csv_export;
pub mod http_client;
pub mod http_response;
pub mod pdf_export;
