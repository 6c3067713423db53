//! MiBuddy: an animated desk-buddy avatar whose mood follows the board's
//! motion, orientation, battery and clock.
//!
//! Everything board-independent lives in this library so it builds and tests
//! on the host; the ESP-IDF drivers and tasks are compiled for the device only.

pub mod app;
pub mod button;
pub mod config;
pub mod error;
pub mod input;
pub mod mochi;
pub mod platform;
pub mod scene;
pub mod sound;
pub mod timer;

#[cfg(target_os = "espidf")]
pub mod drivers;
#[cfg(target_os = "espidf")]
pub mod tasks;

pub use app::MiBuddyApp;
pub use error::{MochiError, Result};
