//! End-to-end practice sessions over the offline backend

use woodshed_core::audio::OfflineBackend;
use woodshed_core::config::{read_yaml, write_yaml, AudioCoreConfig, PracticeDefaults};
use woodshed_core::practice::{
    AudioCore, IncrementType, MemorySessionStore, Orchestrator, PracticeTimer, SessionSnapshot,
    TempoProgression,
};
use woodshed_core::{SampleBuffer, TrackBuffer};

const DEVICE_RATE: u32 = 48000;

struct NullTimer;

impl PracticeTimer for NullTimer {
    fn start(&mut self) {}
    fn pause(&mut self) {}
    fn is_running(&self) -> bool {
        false
    }
}

fn sine(sample_rate: u32, seconds: f64, freq: f32) -> TrackBuffer {
    let len = (sample_rate as f64 * seconds) as usize;
    let left: Vec<f32> = (0..len)
        .map(|i| (i as f32 * freq * std::f32::consts::TAU / sample_rate as f32).sin() * 0.5)
        .collect();
    let right = left.clone();
    SampleBuffer::new(sample_rate, vec![left, right]).unwrap().into_shared()
}

fn session() -> (Orchestrator, OfflineBackend) {
    let backend = OfflineBackend::new(DEVICE_RATE);
    let audio = AudioCore::new(Box::new(backend.clone()), AudioCoreConfig::default());
    let orchestrator = Orchestrator::new(audio, Box::new(NullTimer), &PracticeDefaults::default())
        .with_store(Box::new(MemorySessionStore::new()));
    (orchestrator, backend)
}

#[test]
fn test_speed_and_pitch_are_clamped() {
    let (mut practice, _backend) = session();
    assert!(practice.load(sine(8000, 5.0, 220.0), "scales"));

    assert_eq!(practice.set_speed(5.0), 4.0);
    assert_eq!(practice.set_pitch(-30.0), -24.0);
    assert_eq!(practice.audio().state().playback_rate, 4.0);
    assert_eq!(practice.audio().state().pitch_shift_semitones, -24.0);
}

#[test]
fn test_seek_is_clamped_to_track() {
    let (mut practice, _backend) = session();
    assert!(practice.load(sine(1000, 200.0, 110.0), "long-form"));

    assert!(practice.seek(-10.0));
    assert_eq!(practice.current_time(), 0.0);
    assert!(practice.seek(500.0));
    assert_eq!(practice.current_time(), 200.0);
}

#[test]
fn test_combined_pitch_without_preservation() {
    let (mut practice, _backend) = session();
    practice.set_preserve_pitch(false);
    practice.set_speed(2.0);
    practice.set_pitch(0.0);
    assert_eq!(practice.pitch_tempo().combined_pitch(), 12.0);
}

#[test]
fn test_playback_produces_bounded_audio() {
    let (mut practice, backend) = session();
    assert!(practice.load(sine(DEVICE_RATE, 3.0, 440.0), "a440"));
    practice.set_volume(12.0);

    assert!(practice.play(None));
    let out = backend.render(DEVICE_RATE as usize);
    assert!(out.peak() > 0.01);
    assert!(out.peak() <= 1.0);

    assert!(practice.pause());
    // Drain the stretcher tail, then expect silence
    backend.render(DEVICE_RATE as usize / 2);
    let out = backend.render(4096);
    assert!(out.peak() < 1e-3);
}

#[test]
fn test_stop_suspends_output_and_rewinds() {
    let (mut practice, backend) = session();
    practice.load(sine(DEVICE_RATE, 3.0, 440.0), "a440");
    practice.play(None);
    backend.advance(1.0);
    assert!(practice.stop());
    assert_eq!(practice.current_time(), 0.0);
    assert_eq!(backend.render(1024).peak(), 0.0);
}

#[test]
fn test_loop_with_progression_over_ticks() {
    let (mut practice, backend) = session();
    practice.load(sine(4000, 30.0, 330.0), "riff");
    practice.set_progression(TempoProgression {
        enabled: true,
        increment_type: IncrementType::Percentage,
        increment_value: 10.0,
        loop_interval: 2,
        max_tempo_percent: 120.0,
        ..Default::default()
    });
    assert!(practice.set_loop_start(2.0));
    assert!(practice.set_loop_end(3.0));
    assert!(practice.set_looping(true));
    assert!(practice.play(Some(2.0)));

    let mut restarts = 0;
    for _ in 0..400 {
        backend.advance(0.05);
        if practice.tick().seeked_to.is_some() {
            restarts += 1;
        }
        let position = practice.current_time();
        assert!((2.0..=3.0).contains(&position), "position {} escaped the loop", position);
    }

    assert_eq!(practice.loops().completed_count(), restarts);
    assert!(restarts >= 6);
    // 100 -> 110 -> 120, then held at the ceiling
    assert!((practice.loops().current_tempo() - 120.0).abs() < 1e-9);
    assert!((practice.audio().state().playback_rate - 1.2).abs() < 1e-9);
}

#[test]
fn test_snapshot_survives_yaml_store() {
    let (mut practice, _backend) = session();
    practice.load(sine(1000, 120.0, 110.0), "etude-7");
    practice.set_speed(0.65);
    practice.set_pitch(2.0);
    practice.set_loop_start(30.0);
    practice.set_loop_end(45.5);
    practice.set_looping(true);
    let before = practice.get_state();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.yaml");
    write_yaml(&before, &path).unwrap();
    let loaded: SessionSnapshot = read_yaml(&path).unwrap();

    practice.clear_loop();
    practice.set_speed(1.0);
    practice.set_state(loaded);
    assert_eq!(practice.get_state(), before);
}

#[test]
fn test_sample_rate_mismatch_keeps_timing() {
    let (mut practice, backend) = session();
    practice.load(sine(44100, 10.0, 440.0), "cd-rate");
    practice.play(None);
    backend.advance(2.0);
    assert!((practice.current_time() - 2.0).abs() < 1e-6);
    assert!(practice.tick().position > 1.9);
}
