//! Practice events forwarded to the UI
//!
//! The orchestrator calls listeners synchronously from inside its own
//! methods, while the app is still borrowed. This listener only queues the
//! events; the app drains the queue after each update.

use crossbeam::channel::{unbounded, Receiver, Sender};
use woodshed_core::practice::{LoopRegion, PracticeListener, TempoProgression};

#[derive(Debug, Clone, PartialEq)]
pub enum PracticeEvent {
    LoopUpdated { start: Option<f64>, end: Option<f64>, enabled: bool },
    LoopCompleted(u32),
    TempoChanged(f64),
    SeekRequested(f64),
    SpeedChanged(f64),
    PitchChanged(f64),
    PlaybackEnded,
}

pub struct ChannelListener {
    tx: Sender<PracticeEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, Receiver<PracticeEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    fn send(&self, event: PracticeEvent) {
        // Receiver gone means the app is shutting down
        let _ = self.tx.send(event);
    }
}

impl PracticeListener for ChannelListener {
    fn on_loop_update(&mut self, region: &LoopRegion, _progression: &TempoProgression) {
        self.send(PracticeEvent::LoopUpdated {
            start: region.start,
            end: region.end,
            enabled: region.enabled,
        });
    }

    fn on_loop_complete(&mut self, count: u32) {
        self.send(PracticeEvent::LoopCompleted(count));
    }

    fn on_tempo_change(&mut self, tempo_percent: f64) {
        self.send(PracticeEvent::TempoChanged(tempo_percent));
    }

    fn on_seek_requested(&mut self, time: f64) {
        self.send(PracticeEvent::SeekRequested(time));
    }

    fn on_speed_change(&mut self, speed: f64) {
        self.send(PracticeEvent::SpeedChanged(speed));
    }

    fn on_pitch_change(&mut self, semitones: f64) {
        self.send(PracticeEvent::PitchChanged(semitones));
    }

    fn on_playback_ended(&mut self) {
        self.send(PracticeEvent::PlaybackEnded);
    }
}
