//! Main iced application for Woodshed
//!
//! Owns the practice orchestrator and the waveform controller. The poll tick
//! is a subscription that only exists while audio is playing; practice
//! events queued by the listener are drained after every update.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam::channel::Receiver;
use iced::widget::{button, column, container, row, scrollable, text, text_input, Space};
use iced::{event, time, window, Center, Element, Event, Fill, Length, Subscription, Task, Theme};

use woodshed_core::audio::{AudioBackend, CpalBackend};
use woodshed_core::config::{default_sessions_path, save_config};
use woodshed_core::practice::{AudioCore, Orchestrator, SessionSnapshot};
use woodshed_widgets::{waveform_view, WaveformController};

use super::controls;
use super::message::Message;
use crate::config::PlayerConfig;
use crate::events::{ChannelListener, PracticeEvent};
use crate::sessions::YamlSessionStore;
use crate::timer::{format_elapsed, Stopwatch};
use crate::wav::load_wav;

/// Application state
pub struct WoodshedApp {
    practice: Orchestrator,
    waveform: WaveformController,
    events: Receiver<PracticeEvent>,
    stopwatch: Stopwatch,
    /// Saved sessions of the loaded track, refreshed after every change
    sessions: Vec<SessionSnapshot>,
    config: PlayerConfig,
    config_path: PathBuf,
    path_input: String,
    /// Scale factor reported by the window
    window_scale: f32,
    loading: bool,
    /// Status message
    status: String,
}

impl WoodshedApp {
    /// Create the application on the default output device
    pub fn new(config: PlayerConfig, config_path: PathBuf) -> Self {
        let backend = CpalBackend::new(config.engine.audio.output.clone());
        Self::with_backend(config, config_path, default_sessions_path(), Box::new(backend))
    }

    pub fn with_backend(
        config: PlayerConfig,
        config_path: PathBuf,
        sessions_path: PathBuf,
        backend: Box<dyn AudioBackend>,
    ) -> Self {
        let stopwatch = Stopwatch::new();
        let audio = AudioCore::new(backend, config.engine.audio.clone());
        let mut practice = Orchestrator::new(audio, Box::new(stopwatch.clone()), &config.engine.practice);

        match YamlSessionStore::open(sessions_path) {
            Ok(store) => practice = practice.with_store(Box::new(store)),
            Err(e) => log::warn!("{:#}; saved sessions are disabled", e),
        }

        let (listener, events) = ChannelListener::new();
        practice.add_listener(Box::new(listener));

        let path_input = config
            .last_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        Self {
            practice,
            waveform: WaveformController::new(),
            events,
            stopwatch,
            sessions: Vec::new(),
            config,
            config_path,
            path_input,
            window_scale: 1.0,
            loading: false,
            status: String::from("Open a WAV file to start practicing"),
        }
    }

    /// Handle a message
    pub fn update(&mut self, message: Message) -> Task<Message> {
        let task = self.handle(message);
        self.sync_display();
        task
    }

    fn handle(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                let report = self.practice.tick();
                // Position goes to the waveform after the tick, so a loop
                // restart is never drawn at the pre-seek position
                self.waveform.set_position(report.position);
                Task::none()
            }

            Message::PathInputChanged(value) => {
                self.path_input = value;
                Task::none()
            }
            Message::OpenFile => {
                let path = PathBuf::from(self.path_input.trim());
                if path.as_os_str().is_empty() || self.loading {
                    return Task::none();
                }
                self.open_file(path)
            }
            Message::FileLoaded(path, result) => {
                self.loading = false;
                match result {
                    Ok(buffer) => self.install_track(path, buffer),
                    Err(e) => {
                        log::error!("Failed to load {:?}: {}", path, e);
                        self.status = format!("Error loading track: {}", e);
                        Task::none()
                    }
                }
            }

            Message::Play => {
                if !self.practice.play(None) {
                    self.status = String::from("Playback could not start (see log)");
                }
                Task::none()
            }
            Message::Pause => {
                self.practice.pause();
                Task::none()
            }
            Message::Stop => {
                self.practice.stop();
                Task::none()
            }
            Message::Seek(time) => {
                self.practice.seek(time);
                Task::none()
            }
            Message::WaveformHover(x) => {
                self.waveform.set_hover(x);
                Task::none()
            }
            Message::WaveformResized(width, height) => {
                self.waveform.resize(width, height, self.scale_factor());
                Task::none()
            }
            Message::ScaleFactorChanged(factor) => {
                log::debug!("Window scale factor is {}", factor);
                self.window_scale = factor;
                let (width, height) = self.waveform.size();
                self.waveform.resize(width, height, self.scale_factor());
                Task::none()
            }

            Message::SetSpeed(speed) => {
                self.practice.set_speed(speed);
                Task::none()
            }
            Message::SpeedPreset(index) => {
                self.practice.apply_speed_preset(index);
                Task::none()
            }
            Message::SetPitch(semitones) => {
                self.practice.set_pitch(semitones);
                Task::none()
            }
            Message::PitchPreset(index) => {
                self.practice.apply_pitch_preset(index);
                Task::none()
            }
            Message::OctaveUp => {
                self.practice.shift_pitch(woodshed_core::practice::OCTAVE);
                Task::none()
            }
            Message::OctaveDown => {
                self.practice.shift_pitch(-woodshed_core::practice::OCTAVE);
                Task::none()
            }
            Message::SetPreservePitch(preserve) => {
                self.practice.set_preserve_pitch(preserve);
                self.save_settings()
            }
            Message::SetVolume(db) => {
                self.practice.set_volume(db);
                Task::none()
            }
            Message::SetQuality(mode) => {
                if !self.practice.set_quality(mode) {
                    self.waveform.set_track(None);
                    self.sessions.clear();
                    self.status = format!("Could not switch to {} quality; track unloaded", mode);
                }
                self.save_settings()
            }

            Message::LoopStartHere => {
                if !self.practice.set_loop_here_start() {
                    self.status = String::from("Loop start must be before the loop end");
                }
                Task::none()
            }
            Message::LoopEndHere => {
                if !self.practice.set_loop_here_end() {
                    self.status = String::from("Loop end must be after the loop start");
                }
                Task::none()
            }
            Message::ToggleLoop => {
                self.practice.toggle_loop();
                Task::none()
            }
            Message::ClearLoop => {
                self.practice.clear_loop();
                Task::none()
            }
            Message::SetProgressionEnabled(enabled) => {
                self.update_progression(|p| p.enabled = enabled);
                self.save_settings()
            }
            Message::SetProgressionStep(step) => {
                self.update_progression(|p| p.increment_value = step);
                Task::none()
            }
            Message::SetProgressionInterval(interval) => {
                self.update_progression(|p| p.loop_interval = interval);
                Task::none()
            }
            Message::SetProgressionMax(max) => {
                self.update_progression(|p| p.max_tempo_percent = max);
                Task::none()
            }
            Message::ResetTempo => {
                self.practice.reset_tempo();
                Task::none()
            }

            Message::SaveSession => {
                match self.practice.save_session() {
                    Ok(()) => self.status = String::from("Session saved"),
                    Err(e) => self.status = format!("{:#}", e),
                }
                self.refresh_sessions();
                Task::none()
            }
            Message::RecallSession(index) => {
                if let Err(e) = self.practice.recall_session(index) {
                    self.status = format!("{:#}", e);
                }
                Task::none()
            }
            Message::DeleteSession(index) => {
                if let Err(e) = self.practice.delete_session(index) {
                    self.status = format!("{:#}", e);
                }
                self.refresh_sessions();
                Task::none()
            }

            Message::ResetStopwatch => {
                self.stopwatch.reset();
                Task::none()
            }

            Message::PersistSettings => self.save_settings(),
            Message::ConfigSaved(result) => {
                if let Err(e) = result {
                    log::warn!("Failed to save settings: {}", e);
                    self.status = format!("Failed to save settings: {}", e);
                }
                Task::none()
            }
        }
    }

    /// Ask the window for its scale factor
    pub fn query_scale_factor() -> Task<Message> {
        window::latest()
            .and_then(window::scale_factor)
            .map(Message::ScaleFactorChanged)
    }

    /// Device pixel ratio for the waveform; the config value overrides the window's
    fn scale_factor(&self) -> f32 {
        self.config.display.scale_factor.unwrap_or(self.window_scale)
    }

    /// Decode `path` on a blocking worker
    pub fn open_file(&mut self, path: PathBuf) -> Task<Message> {
        self.loading = true;
        self.path_input = path.display().to_string();
        self.status = format!("Loading {}...", display_name(&path));

        Task::perform(
            async move {
                let decode_path = path.clone();
                let result = tokio::task::spawn_blocking(move || load_wav(&decode_path))
                    .await
                    .map_err(|e| format!("Decoder task failed: {}", e))
                    .and_then(|decoded| decoded.map(Arc::new).map_err(|e| format!("{:#}", e)));
                (path, result)
            },
            |(path, result)| Message::FileLoaded(path, result),
        )
    }

    fn install_track(&mut self, path: PathBuf, buffer: Arc<woodshed_core::SampleBuffer>) -> Task<Message> {
        let buffer = Arc::try_unwrap(buffer)
            .unwrap_or_else(|shared| (*shared).clone())
            .into_shared();
        let track_id = path.to_string_lossy().into_owned();

        if !self.practice.load(buffer.clone(), &track_id) {
            self.waveform.set_track(None);
            self.sessions.clear();
            self.status = format!("Could not load {} (see log)", display_name(&path));
            return Task::none();
        }

        self.waveform.set_track(Some(buffer));
        self.refresh_sessions();
        self.status = format!("Loaded {}", display_name(&path));
        self.config.last_file = Some(path);
        self.save_settings()
    }

    fn update_progression(&mut self, edit: impl FnOnce(&mut woodshed_core::practice::TempoProgression)) {
        let mut progression = self.practice.loops().progression().clone();
        edit(&mut progression);
        self.practice.set_progression(progression);
    }

    fn refresh_sessions(&mut self) {
        self.sessions = if self.practice.track_id().is_some() {
            self.practice.sessions().unwrap_or_else(|e| {
                log::warn!("{:#}", e);
                Vec::new()
            })
        } else {
            Vec::new()
        };
    }

    /// Copy the live engine settings into the config and save it in the background
    fn save_settings(&mut self) -> Task<Message> {
        let state = self.practice.audio().state();
        self.config.engine.audio.quality = state.quality;
        self.config.engine.audio.volume_db = state.volume_db;
        self.config.engine.practice.preserve_pitch = self.practice.pitch_tempo().preserve_pitch();
        let mut progression = self.practice.loops().progression().clone();
        progression.progress_counter = 0;
        self.config.engine.practice.progression = progression;

        let config = self.config.clone();
        let path = self.config_path.clone();
        Task::perform(
            async move { save_config(&config, &path).map_err(|e| format!("{:#}", e)) },
            Message::ConfigSaved,
        )
    }

    /// Drain queued practice events, then mirror the position into the waveform
    fn sync_display(&mut self) {
        for event in self.events.try_iter() {
            match event {
                PracticeEvent::LoopUpdated { start, end, enabled } => {
                    self.waveform.set_loop(start, end);
                    log::debug!("Loop {:?}..{:?} enabled={}", start, end, enabled);
                }
                PracticeEvent::LoopCompleted(count) => {
                    log::debug!("Loop repetition {}", count);
                }
                PracticeEvent::TempoChanged(tempo) => {
                    self.status = format!("Tempo now {:.0}%", tempo);
                }
                PracticeEvent::SeekRequested(time) => {
                    log::debug!("Loop restart at {:.3}s", time);
                }
                PracticeEvent::SpeedChanged(speed) => {
                    log::debug!("Speed {:.2}x", speed);
                }
                PracticeEvent::PitchChanged(semitones) => {
                    log::debug!("Pitch {:+.1} st", semitones);
                }
                PracticeEvent::PlaybackEnded => {
                    self.status = String::from("End of track");
                }
            }
        }
        self.waveform.set_position(self.practice.current_time());
    }

    /// Poll only while playing; always follow scale factor changes
    pub fn subscription(&self) -> Subscription<Message> {
        let rescale = event::listen_with(|event, _status, _window| match event {
            Event::Window(window::Event::Rescaled(factor)) => Some(Message::ScaleFactorChanged(factor)),
            _ => None,
        });
        if self.practice.is_polling() {
            Subscription::batch([
                rescale,
                time::every(self.practice.poll_interval()).map(|_| Message::Tick),
            ])
        } else {
            rescale
        }
    }

    /// Build the view
    pub fn view(&self) -> Element<'_, Message> {
        let has_track = self.practice.audio().is_loaded();

        let open_button = button(text("Open"))
            .on_press_maybe((!self.loading).then_some(Message::OpenFile));
        let header = row![
            text("WOODSHED").size(24),
            Space::new().width(Fill),
            text_input("Path to a WAV file", &self.path_input)
                .on_input(Message::PathInputChanged)
                .on_submit(Message::OpenFile)
                .width(Length::Fixed(420.0)),
            open_button,
        ]
        .spacing(10)
        .align_y(Center)
        .padding(10);

        let waveform = waveform_view(
            &self.waveform,
            Message::Seek,
            Message::WaveformHover,
            Message::WaveformResized,
        );

        let transport = controls::transport_row(
            has_track,
            self.practice.audio().is_playing(),
            self.practice.current_time(),
            self.practice.duration(),
            format_elapsed(self.stopwatch.elapsed()),
        );

        let state = self.practice.audio().state();
        let left = column![
            controls::speed_pitch_panel(self.practice.pitch_tempo()),
            controls::sound_panel(state.volume_db, state.quality),
        ]
        .spacing(10)
        .width(Length::FillPortion(1));
        let right = column![
            controls::loop_panel(self.practice.loops(), has_track),
            controls::sessions_panel(&self.sessions, has_track),
        ]
        .spacing(10)
        .width(Length::FillPortion(1));

        let status_bar = container(text(&self.status).size(12)).padding(5);

        let content = column![
            header,
            waveform,
            transport,
            scrollable(row![left, right].spacing(10)).height(Fill),
            status_bar,
        ]
        .spacing(10)
        .padding(10);

        container(content).width(Fill).height(Fill).into()
    }

    /// Get the theme
    pub fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
