//! Audio error types

use thiserror::Error;

/// Errors raised by the backends and by `AudioCore`
///
/// None of these are fatal to the application: the public `AudioCore`
/// operations log them and report failure with `false`.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio output devices found")]
    NoDevices,

    #[error("Failed to get default audio device: {0}")]
    NoDefaultDevice(String),

    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Backend did not come up within the retry window
    #[error("Audio backend did not start within {0} ms")]
    StartupTimeout(u64),

    /// Operation needs a running backend
    #[error("Audio backend is not running")]
    NotStarted,

    /// The command queue to the audio thread is full
    #[error("Engine command queue is full")]
    QueueFull,

    /// The graph did not acknowledge a new source in time
    #[error("Timed out waiting for the audio graph to accept the source")]
    ReadyTimeout,

    /// The decoded buffer is empty or malformed
    #[error("Invalid sample buffer: {0}")]
    InvalidBuffer(String),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
