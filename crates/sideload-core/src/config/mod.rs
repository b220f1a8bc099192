//! Deployment configuration
//!
//! Retry/backoff parameters for device polling and the settings forwarded to
//! host install calls, read from `sideload.toml`.

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use parser::{parse_config_toml, parse_config_toml_str, to_toml};
pub use paths::{CONFIG_FILE_NAME, config_path_in, default_config_dir};
pub use schema::{DeployConfig, InstallSettings, PollPolicy};
pub use store::ConfigStore;
