//! Woodshed Core - Practice engine for slowing down, transposing and looping recordings

pub mod audio;
pub mod config;
pub mod engine;
pub mod practice;
pub mod timestretch;
pub mod types;

pub use types::*;
