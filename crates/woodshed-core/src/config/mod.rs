//! Configuration for Woodshed
//!
//! - Generic YAML loading/saving (`load_config`, `save_config`, `read_yaml`,
//!   `write_yaml`)
//! - Standard config and data paths
//! - Engine and practice settings (`PracticeConfig`)
//!
//! ```ignore
//! use woodshed_core::config::{default_config_path, load_config, save_config, PracticeConfig};
//!
//! let path = default_config_path();
//! let config: PracticeConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod io;
mod paths;
mod practice;

pub use io::{load_config, read_yaml, save_config, write_yaml};
pub use paths::{config_dir, data_dir, default_config_path, default_sessions_path};
pub use practice::{AudioCoreConfig, PracticeConfig, PracticeDefaults};
