pub mod config;
pub mod error;
pub mod file_config;
pub mod types;

pub use config::{AppConfig, Settings};
pub use error::{OracleError, PublishError};
pub use file_config::{load_config, FileConfig};
pub use types::*;
