//! API layer: endpoint configuration, HTTP transport, the request pipeline
//! and the single-flight refresh coordinator.

pub mod config;
mod exports;
mod pipeline;
mod refresh;
mod transport;

pub use config::{
    generate_example_config, get_config_file_path_string, load_endpoint_config, ConfigSource,
    EndpointConfig,
};
pub use exports::{ExportCreated, Exports};
pub use pipeline::ApiClient;
pub use refresh::{RefreshCoordinator, RefreshOutcome};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport, TransportError};
