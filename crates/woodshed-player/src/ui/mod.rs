//! UI module for woodshed-player
//!
//! Built with iced. The app owns the practice orchestrator directly; the
//! audio thread is only reached through the orchestrator's command queue.

pub mod app;
pub mod controls;
pub mod message;

pub use app::WoodshedApp;
pub use message::Message;
