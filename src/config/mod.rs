mod settings;

pub use settings::{AuthConfig, ConnectionConfig, LogConfig, Settings};
