pub mod config;
pub mod error;
pub mod json_bridge;
pub mod project;
pub mod schema;
pub mod store;

pub use config::{SettingsDefaults, StoreConfig};
pub use error::{Result, StoreError};
pub use project::{ProjectStore, default_base_dir, list_projects};
pub use store::Store;
