//! Control panels for the practice view
//!
//! Stateless view functions; each takes the values it shows and returns an
//! element producing [`Message`]s.

use iced::widget::{button, column, container, pick_list, row, slider, text, toggler, Space};
use iced::{Alignment, Element, Length};

use woodshed_core::practice::{
    LoopController, PitchTempoController, SessionSnapshot, MIN_TEMPO_PERCENT, MAX_TEMPO_CEILING,
    PITCH_PRESETS, SPEED_PRESETS,
};
use woodshed_core::timestretch::QualityMode;
use woodshed_core::{
    MAX_PITCH_SEMITONES, MAX_PLAYBACK_RATE, MAX_VOLUME_DB, MIN_PITCH_SEMITONES, MIN_PLAYBACK_RATE,
    MIN_VOLUME_DB,
};
use woodshed_widgets::format_time;

use super::message::Message;

const PANEL_TITLE_SIZE: f32 = 14.0;
const LABEL_SIZE: f32 = 12.0;

fn panel<'a>(title: &'a str, body: impl Into<Element<'a, Message>>) -> Element<'a, Message> {
    container(column![text(title).size(PANEL_TITLE_SIZE), body.into()].spacing(8))
        .padding(10)
        .width(Length::Fill)
        .into()
}

/// Play/pause/stop, position readout and practice time
pub fn transport_row<'a>(
    has_track: bool,
    is_playing: bool,
    position: f64,
    duration: f64,
    practice_time: String,
) -> Element<'a, Message> {
    let play_pause = if is_playing {
        button(text("Pause")).on_press(Message::Pause)
    } else {
        button(text("Play")).on_press_maybe(has_track.then_some(Message::Play))
    };
    let stop = button(text("Stop")).on_press_maybe(has_track.then_some(Message::Stop));

    row![
        play_pause,
        stop,
        text(format!("{} / {}", format_time(position), format_time(duration))).size(16),
        Space::new().width(Length::Fill),
        text(format!("Practice time {}", practice_time)).size(LABEL_SIZE),
        button(text("Reset").size(LABEL_SIZE)).on_press(Message::ResetStopwatch),
    ]
    .spacing(10)
    .align_y(Alignment::Center)
    .into()
}

/// Speed and pitch sliders with presets
pub fn speed_pitch_panel(pitch_tempo: &PitchTempoController) -> Element<'_, Message> {
    let speed = pitch_tempo.speed();
    let pitch = pitch_tempo.pitch();

    let speed_presets = SPEED_PRESETS.iter().enumerate().fold(row![].spacing(4), |r, (i, &p)| {
        r.push(button(text(format!("{}%", (p * 100.0).round())).size(LABEL_SIZE)).on_press(Message::SpeedPreset(i)))
    });
    let pitch_presets = PITCH_PRESETS.iter().enumerate().fold(row![].spacing(4), |r, (i, &p)| {
        r.push(button(text(format_semitones(p)).size(LABEL_SIZE)).on_press(Message::PitchPreset(i)))
    });

    let body = column![
        row![
            text(format!("Speed {:.0}%", speed * 100.0)).size(LABEL_SIZE).width(90),
            slider(MIN_PLAYBACK_RATE..=MAX_PLAYBACK_RATE, speed, Message::SetSpeed).step(0.01),
        ]
        .spacing(10)
        .align_y(Alignment::Center),
        speed_presets,
        row![
            text(format!("Pitch {}", format_semitones(pitch))).size(LABEL_SIZE).width(90),
            slider(MIN_PITCH_SEMITONES..=MAX_PITCH_SEMITONES, pitch, Message::SetPitch).step(1.0),
        ]
        .spacing(10)
        .align_y(Alignment::Center),
        row![
            pitch_presets,
            Space::new().width(Length::Fill),
            button(text("-8va").size(LABEL_SIZE)).on_press(Message::OctaveDown),
            button(text("+8va").size(LABEL_SIZE)).on_press(Message::OctaveUp),
        ]
        .spacing(4),
        row![
            text("Keep pitch when changing speed").size(LABEL_SIZE),
            Space::new().width(Length::Fill),
            toggler(pitch_tempo.preserve_pitch()).on_toggle(Message::SetPreservePitch),
        ]
        .align_y(Alignment::Center),
    ]
    .spacing(6);

    panel("Speed & Pitch", body)
}

/// Output volume and time-stretch quality
pub fn sound_panel<'a>(volume_db: f64, quality: QualityMode) -> Element<'a, Message> {
    let body = column![
        row![
            text(format!("Volume {:+.1} dB", volume_db)).size(LABEL_SIZE).width(110),
            slider(MIN_VOLUME_DB..=MAX_VOLUME_DB, volume_db, Message::SetVolume)
                .step(0.5)
                .on_release(Message::PersistSettings),
        ]
        .spacing(10)
        .align_y(Alignment::Center),
        row![
            text("Stretch quality").size(LABEL_SIZE),
            Space::new().width(Length::Fill),
            pick_list(QualityMode::ALL, Some(quality), Message::SetQuality),
        ]
        .align_y(Alignment::Center),
    ]
    .spacing(6);

    panel("Sound", body)
}

/// A–B loop buttons and tempo progression settings
pub fn loop_panel(loops: &LoopController, has_track: bool) -> Element<'_, Message> {
    let region = loops.region();
    let progression = loops.progression();

    let bounds = match (region.start, region.end) {
        (None, None) => "No loop".to_string(),
        (start, end) => format!(
            "{} – {}",
            start.map_or("--".to_string(), format_time),
            end.map_or("--".to_string(), format_time),
        ),
    };
    let loop_label = if region.enabled { "Loop on" } else { "Loop off" };

    let marks = row![
        button(text("A")).on_press_maybe(has_track.then_some(Message::LoopStartHere)),
        button(text("B")).on_press_maybe(has_track.then_some(Message::LoopEndHere)),
        button(text(loop_label)).on_press_maybe(region.is_valid().then_some(Message::ToggleLoop)),
        button(text("Clear")).on_press(Message::ClearLoop),
        text(bounds).size(LABEL_SIZE),
        Space::new().width(Length::Fill),
        text(format!("Reps {}", loops.completed_count())).size(LABEL_SIZE),
    ]
    .spacing(8)
    .align_y(Alignment::Center);

    let progression_rows = column![
        row![
            text("Speed up while looping").size(LABEL_SIZE),
            Space::new().width(Length::Fill),
            toggler(progression.enabled).on_toggle(Message::SetProgressionEnabled),
        ]
        .align_y(Alignment::Center),
        row![
            text(format!("Step +{:.0}%", progression.increment_value)).size(LABEL_SIZE).width(110),
            slider(1.0..=25.0, progression.increment_value, Message::SetProgressionStep)
                .step(1.0)
                .on_release(Message::PersistSettings),
        ]
        .spacing(10),
        row![
            text(format!("Every {} reps", progression.loop_interval)).size(LABEL_SIZE).width(110),
            slider(1..=16, progression.loop_interval, Message::SetProgressionInterval)
                .on_release(Message::PersistSettings),
        ]
        .spacing(10),
        row![
            text(format!("Up to {:.0}%", progression.max_tempo_percent)).size(LABEL_SIZE).width(110),
            slider(MIN_TEMPO_PERCENT..=MAX_TEMPO_CEILING, progression.max_tempo_percent, Message::SetProgressionMax)
                .step(5.0)
                .on_release(Message::PersistSettings),
        ]
        .spacing(10),
        row![
            text(format!("Tempo now {:.0}%", loops.current_tempo())).size(LABEL_SIZE),
            Space::new().width(Length::Fill),
            button(text("Reset tempo").size(LABEL_SIZE)).on_press(Message::ResetTempo),
        ]
        .align_y(Alignment::Center),
    ]
    .spacing(6);

    panel("Loop", column![marks, progression_rows].spacing(10))
}

/// Saved sessions for the loaded track
pub fn sessions_panel(sessions: &[SessionSnapshot], has_track: bool) -> Element<'_, Message> {
    let list = sessions.iter().enumerate().fold(column![].spacing(4), |col, (i, snapshot)| {
        col.push(
            row![
                text(session_label(snapshot)).size(LABEL_SIZE),
                Space::new().width(Length::Fill),
                button(text("Recall").size(LABEL_SIZE)).on_press(Message::RecallSession(i)),
                button(text("Delete").size(LABEL_SIZE)).on_press(Message::DeleteSession(i)),
            ]
            .spacing(6)
            .align_y(Alignment::Center),
        )
    });

    let body = column![
        button(text("Save current")).on_press_maybe(has_track.then_some(Message::SaveSession)),
        list,
    ]
    .spacing(8);

    panel("Sessions", body)
}

/// One-line summary of a saved session
pub fn session_label(snapshot: &SessionSnapshot) -> String {
    let mut label = format!("{:.0}%", snapshot.speed * 100.0);
    if snapshot.pitch_shift_semitones != 0.0 {
        label.push_str(&format!(" {}", format_semitones(snapshot.pitch_shift_semitones)));
    }
    if let (Some(start), Some(end)) = (snapshot.loop_start, snapshot.loop_end) {
        label.push_str(&format!(" loop {}–{}", format_time(start), format_time(end)));
    }
    if snapshot.tempo_progression.enabled {
        label.push_str(" (progressive)");
    }
    label
}

fn format_semitones(semitones: f64) -> String {
    if semitones == 0.0 {
        "0 st".to_string()
    } else {
        format!("{:+.0} st", semitones)
    }
}
