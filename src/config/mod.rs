pub use oauth2_config::{ClientConfig, Config, StorageConfig};
