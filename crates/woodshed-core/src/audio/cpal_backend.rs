//! CPAL output backend
//!
//! ```text
//! ┌──────────────────┐                     ┌─────────────────────┐
//! │    AudioCore     │───push()───────────►│   Command Queue     │
//! │  (control side)  │                     │  (lock-free SPSC)   │
//! └──────────────────┘                     └──────────┬──────────┘
//!         ▲                                           │ pop()
//!         │ relaxed atomic                            ▼
//! ┌──────────────────┐                     ┌─────────────────────┐
//! │   EngineClock    │◄────────────────────│  CPAL Audio Thread  │
//! │                  │   advance(n)        │ (owns PracticeGraph)│
//! └──────────────────┘                     └─────────────────────┘
//! ```
//!
//! The render state is moved into the stream callback, so the audio thread
//! owns the graph outright and no lock is taken per block. Suspension is a
//! flag read by the callback: while set, commands are still drained but the
//! device receives silence and the clock stands still.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig};

use super::backend::{AudioBackend, BackendState};
use super::config::{AudioConfig, DEFAULT_SAMPLE_RATE, MAX_BUFFER_SIZE};
use super::device::{find_device_by_id, get_cpal_default_device};
use super::error::{AudioError, AudioResult};
use crate::engine::{EngineCommand, PracticeGraph};
use crate::types::StereoBuffer;

/// State moved into the audio callback
struct RenderState {
    graph: PracticeGraph,
    commands: rtrb::Consumer<EngineCommand>,
    /// Pre-allocated block buffer
    block: StereoBuffer,
    suspended: Arc<AtomicBool>,
}

impl RenderState {
    /// Fill an interleaved device buffer with `channels` channels
    fn render(&mut self, data: &mut [f32], channels: usize) {
        self.graph.process_commands(&mut self.commands);

        if self.suspended.load(Ordering::Relaxed) {
            data.fill(0.0);
            return;
        }

        for chunk in data.chunks_mut(MAX_BUFFER_SIZE * channels) {
            let n_frames = chunk.len() / channels;
            self.block.set_len_from_capacity(n_frames);
            self.graph.process(&mut self.block);

            for (frame, sample) in chunk.chunks_mut(channels).zip(self.block.iter()) {
                frame[0] = sample.left;
                if channels > 1 {
                    frame[1] = sample.right;
                }
                for ch in frame.iter_mut().skip(2) {
                    *ch = 0.0;
                }
            }
        }
    }
}

/// Output backend on a cpal device
pub struct CpalBackend {
    config: AudioConfig,
    stream: Option<Stream>,
    suspended: Arc<AtomicBool>,
    state: BackendState,
    sample_rate: u32,
    buffer_size: Option<u32>,
}

impl CpalBackend {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            stream: None,
            suspended: Arc::new(AtomicBool::new(false)),
            state: BackendState::Idle,
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_size: None,
        }
    }

    /// Negotiated buffer size in frames (None = device default)
    pub fn buffer_size(&self) -> Option<u32> {
        self.buffer_size
    }

    /// One-way output latency in milliseconds, if the buffer size is fixed
    pub fn latency_ms(&self) -> Option<f32> {
        self.buffer_size
            .map(|frames| (frames as f32 / self.sample_rate as f32) * 1000.0)
    }
}

impl AudioBackend for CpalBackend {
    fn start(
        &mut self,
        mut graph: PracticeGraph,
        commands: rtrb::Consumer<EngineCommand>,
    ) -> AudioResult<()> {
        if self.state == BackendState::Closed {
            return Err(AudioError::NotStarted);
        }

        let device = match &self.config.device {
            Some(id) => find_device_by_id(id)?,
            None => get_cpal_default_device()?,
        };
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio device: {}", device_name);

        let supported = get_output_config(&device, &self.config)?;
        let sample_rate = supported.sample_rate().0;
        let buffer_size = self.config.buffer_size.as_frames();

        let stream_config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: match buffer_size {
                Some(frames) => CpalBufferSize::Fixed(frames),
                None => CpalBufferSize::Default,
            },
        };

        log::info!(
            "Audio config: {} channels, {}Hz, {} frames",
            stream_config.channels,
            sample_rate,
            buffer_size.map_or_else(|| "default".to_string(), |f| f.to_string())
        );

        graph.prepare(sample_rate);
        self.suspended.store(false, Ordering::Relaxed);
        let render_state = RenderState {
            graph,
            commands,
            block: StereoBuffer::silence(MAX_BUFFER_SIZE),
            suspended: Arc::clone(&self.suspended),
        };

        let stream = build_output_stream(&device, &stream_config, render_state)?;
        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        log::info!("Audio stream started");

        self.stream = Some(stream);
        self.sample_rate = sample_rate;
        self.buffer_size = buffer_size;
        self.state = BackendState::Running;
        Ok(())
    }

    fn resume(&mut self) -> AudioResult<()> {
        match self.state {
            BackendState::Running => Ok(()),
            BackendState::Suspended => {
                self.suspended.store(false, Ordering::Relaxed);
                self.state = BackendState::Running;
                log::debug!("Audio output resumed");
                Ok(())
            }
            BackendState::Idle | BackendState::Closed => Err(AudioError::NotStarted),
        }
    }

    fn suspend(&mut self) -> AudioResult<()> {
        match self.state {
            BackendState::Suspended => Ok(()),
            BackendState::Running => {
                self.suspended.store(true, Ordering::Relaxed);
                self.state = BackendState::Suspended;
                log::debug!("Audio output suspended");
                Ok(())
            }
            BackendState::Idle | BackendState::Closed => Err(AudioError::NotStarted),
        }
    }

    fn state(&self) -> BackendState {
        self.state
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("Pausing stream on close failed: {}", e);
            }
            log::info!("Audio stream closed");
        }
        self.state = BackendState::Closed;
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        self.close();
    }
}

/// Pick an f32 output configuration, preferring stereo at the requested rate
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<cpal::SupportedStreamConfig> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();

    if supported_configs.is_empty() {
        return Err(AudioError::UnsupportedFormat(
            "device offers no f32 output configuration".to_string(),
        ));
    }

    let target_sample_rate = config.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);
    let supports_target = |c: &&cpal::SupportedStreamConfigRange| {
        target_sample_rate >= c.min_sample_rate().0 && target_sample_rate <= c.max_sample_rate().0
    };

    let best = supported_configs
        .iter()
        .filter(|c| c.channels() >= 2)
        .find(supports_target)
        .or_else(|| supported_configs.iter().find(|c| c.channels() >= 2))
        .or_else(|| supported_configs.first())
        .ok_or_else(|| AudioError::ConfigError("No suitable output configuration found".to_string()))?;

    let sample_rate = if supports_target(&best) {
        cpal::SampleRate(target_sample_rate)
    } else {
        let fallback = best.max_sample_rate();
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz",
            target_sample_rate,
            fallback.0
        );
        fallback
    };

    Ok(best.clone().with_sample_rate(sample_rate))
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut state: RenderState,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                state.render(data, channels);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}
