//! Woodshed - practice player
//!
//! Loads a recording, changes its speed and pitch independently, loops an
//! A–B region and steps the tempo up as the loop repeats.
//!
//! ## Command line
//!
//! `woodshed-player [FILE.wav]` opens the file at startup. Without an
//! argument nothing is loaded; the last file is offered in the path field.
//!
//! - `--list-devices`: print the output devices and exit. Copy a name/host
//!   pair into `engine.audio.output.device` in the config to use it.

mod config;
mod events;
mod sessions;
mod timer;
mod ui;
mod wav;

use std::path::PathBuf;

use iced::{Size, Task};
use woodshed_core::audio::get_output_devices;
use woodshed_core::config::{default_config_path, load_config};

use ui::{Message, WoodshedApp};

fn main() -> iced::Result {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("woodshed-player starting up");

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--list-devices") {
        list_devices();
        return Ok(());
    }
    let initial_file = args.iter().find(|arg| !arg.starts_with("--")).map(PathBuf::from);

    let config_path = default_config_path();
    let config: config::PlayerConfig = load_config(&config_path);
    let window_size = Size::new(config.display.window_width, config.display.window_height);

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                          Woodshed                            ║");
    println!("║            slow down, loop, speed up, repeat                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    iced::application(
        move || {
            let mut app = WoodshedApp::new(config.clone(), config_path.clone());
            let open_task = match initial_file.clone() {
                Some(path) => app.open_file(path),
                None => Task::none(),
            };
            (app, Task::batch([WoodshedApp::query_scale_factor(), open_task]))
        },
        update,
        view,
    )
    .subscription(subscription)
    .theme(theme)
    .title("Woodshed")
    .window_size(window_size)
    .run()
}

fn list_devices() {
    match get_output_devices() {
        Ok(devices) if devices.is_empty() => println!("No output devices found"),
        Ok(devices) => {
            for device in devices {
                println!("{}", device);
                println!("    name: {:?}", device.id.name);
                if let Some(host) = &device.id.host {
                    println!("    host: {:?}", host);
                }
            }
        }
        Err(e) => eprintln!("Could not list output devices: {}", e),
    }
}

/// Update function for iced
fn update(app: &mut WoodshedApp, message: Message) -> Task<Message> {
    app.update(message)
}

/// View function for iced
fn view(app: &WoodshedApp) -> iced::Element<'_, Message> {
    app.view()
}

/// Subscription function for iced
fn subscription(app: &WoodshedApp) -> iced::Subscription<Message> {
    app.subscription()
}

/// Theme function for iced
fn theme(app: &WoodshedApp) -> iced::Theme {
    app.theme()
}
