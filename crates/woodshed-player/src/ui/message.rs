//! Application messages for woodshed-player

use std::path::PathBuf;
use std::sync::Arc;

use woodshed_core::timestretch::QualityMode;
use woodshed_core::SampleBuffer;

/// Messages that can be sent to the application
#[derive(Debug, Clone)]
pub enum Message {
    /// Poll tick while playing
    Tick,

    // File
    /// Path text field edited
    PathInputChanged(String),
    /// Decode the file named in the path field
    OpenFile,
    /// Background decode finished
    FileLoaded(PathBuf, Result<Arc<SampleBuffer>, String>),

    // Transport
    Play,
    Pause,
    Stop,
    /// Seek to seconds (waveform click)
    Seek(f64),
    /// Pointer x over the waveform, `None` when it leaves
    WaveformHover(Option<f32>),
    /// Waveform canvas bounds changed (logical width, height)
    WaveformResized(f32, f32),
    /// Window device pixel ratio, at startup and when it changes
    ScaleFactorChanged(f32),

    // Speed / pitch / sound
    SetSpeed(f64),
    SpeedPreset(usize),
    SetPitch(f64),
    PitchPreset(usize),
    OctaveUp,
    OctaveDown,
    SetPreservePitch(bool),
    SetVolume(f64),
    SetQuality(QualityMode),

    // Loop
    LoopStartHere,
    LoopEndHere,
    ToggleLoop,
    ClearLoop,
    SetProgressionEnabled(bool),
    SetProgressionStep(f64),
    SetProgressionInterval(u32),
    SetProgressionMax(f64),
    ResetTempo,

    // Sessions
    SaveSession,
    RecallSession(usize),
    DeleteSession(usize),

    // Practice stopwatch
    ResetStopwatch,

    /// Slider released; write current settings to the config file
    PersistSettings,
    /// Background config save finished
    ConfigSaved(Result<(), String>),
}
