// MiBuddy — UI Task
//
// Owns the app, the LCD and the BOOT button. Polls the button at ~200 Hz,
// drives the app tick and repaints the panel whenever the scene changed.

use std::thread;
use std::time::Duration;

use esp_idf_hal::gpio::{AnyInputPin, Input, PinDriver};

use crate::app::MiBuddyApp;
use crate::button::ButtonDecoder;
use crate::config::*;
use crate::drivers::lcd::St7789;
use crate::input::DefaultMapper;
use crate::platform::ChannelAudio;
use crate::scene::{FrameBuffer, Scene};
use crate::tasks::now_ms;
use crate::tasks::sensor::BoardSensors;

pub type BoardApp = MiBuddyApp<Scene, ChannelAudio, BoardSensors, DefaultMapper>;

pub fn ui_task(mut app: BoardApp, button_pin: PinDriver<'static, AnyInputPin, Input>, mut lcd: St7789) {
    log::info!("UI task started");

    let root = app.mochi().display().root();
    if let Err(e) = app.run(root, now_ms()) {
        // the placeholder label is still shown
        log::error!("MiBuddy start failed: {}", e);
    }

    let mut button = ButtonDecoder::new(now_ms() as u64);
    let mut frame = FrameBuffer::new(DISPLAY_WIDTH, DISPLAY_HEIGHT);
    let poll_interval = Duration::from_millis(UI_POLL_INTERVAL_MS);

    loop {
        let now = now_ms();

        // 1. Button (active LOW with pull-up)
        if let Some(event) = button.update(button_pin.is_low(), now as u64) {
            log::info!("Button: {:?}", event);
            if let Err(e) = app.handle_button(event) {
                log::warn!("Button action failed: {}", e);
            }
        }

        // 2. Animation, particles and input pipeline
        app.tick(now);

        // 3. Repaint
        if app.mochi_mut().display_mut().take_dirty() {
            if let Err(e) = app.mochi().display().render(&mut frame) {
                match e {}
            }
            if let Err(e) = lcd.flush(&frame) {
                log::error!("LCD flush failed: {}", e);
            }
        }

        thread::sleep(poll_interval);
    }
}
