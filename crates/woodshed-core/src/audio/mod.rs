//! Audio output backends
//!
//! The practice graph is rendered by an [`AudioBackend`]:
//!
//! - **CpalBackend**: the system output device via cpal
//! - **OfflineBackend**: rendered on demand (tests, headless hosts)
//!
//! # Architecture
//!
//! - **Control side**: `AudioCore` sends commands via a lock-free ring buffer
//! - **Audio thread**: owns the `PracticeGraph` exclusively
//! - **Clock**: the control side reads elapsed frames from a relaxed atomic
//!
//! ```ignore
//! use woodshed_core::audio::{AudioConfig, CpalBackend};
//!
//! let backend = CpalBackend::new(AudioConfig::default());
//! let mut core = AudioCore::new(Box::new(backend), AudioCoreConfig::default());
//! core.initialize();
//! ```

mod backend;
mod config;
mod cpal_backend;
mod device;
mod error;
mod offline;

pub use backend::{AudioBackend, BackendState, CommandSender};
pub use config::{AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE, MAX_BUFFER_SIZE};
pub use cpal_backend::CpalBackend;
pub use device::{find_device_by_id, get_output_devices, OutputDevice};
pub use error::{AudioError, AudioResult};
pub use offline::OfflineBackend;
