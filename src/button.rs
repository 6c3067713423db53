// MiBuddy — Button Gesture Decoder
//
// Debounced single-click, double-click and long-press detection. Fed the raw
// pin level and a millisecond clock at ~200 Hz from the UI task; holds no
// hardware so it runs the same on the host.

use crate::config::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    SingleClick,
    DoubleClick,
    LongPress,
}

#[derive(Debug)]
pub struct ButtonDecoder {
    // Debounce state
    last_raw: bool,
    last_change_ms: u64,

    // Press tracking
    press_start_ms: Option<u64>,
    button_down: bool,

    // Double-click window
    first_click_ms: Option<u64>,
}

impl ButtonDecoder {
    pub fn new(now_ms: u64) -> Self {
        Self {
            last_raw: false,
            last_change_ms: now_ms,
            press_start_ms: None,
            button_down: false,
            first_click_ms: None,
        }
    }

    /// Feed one sample. `pressed` is the logical level (true = held down).
    pub fn update(&mut self, pressed: bool, now_ms: u64) -> Option<ButtonEvent> {
        if pressed != self.last_raw {
            self.last_change_ms = now_ms;
        }
        self.last_raw = pressed;

        if now_ms.saturating_sub(self.last_change_ms) < DEBOUNCE_MS {
            // still bouncing
            return self.check_double_click_timeout(now_ms);
        }

        if pressed && !self.button_down {
            self.button_down = true;
            self.press_start_ms = Some(now_ms);
        }

        if !pressed && self.button_down {
            self.button_down = false;
            let hold_ms = self.press_start_ms.map(|t| now_ms.saturating_sub(t)).unwrap_or(0);

            if hold_ms >= LONG_PRESS_MS {
                self.first_click_ms = None;
                return Some(ButtonEvent::LongPress);
            }
            if self.first_click_ms.take().is_some() {
                return Some(ButtonEvent::DoubleClick);
            }
            self.first_click_ms = Some(now_ms);
            return None;
        }

        self.check_double_click_timeout(now_ms)
    }

    /// A lone click becomes a single click once the double-click window closes.
    fn check_double_click_timeout(&mut self, now_ms: u64) -> Option<ButtonEvent> {
        match self.first_click_ms {
            Some(t) if now_ms.saturating_sub(t) > DOUBLE_CLICK_WINDOW_MS => {
                self.first_click_ms = None;
                Some(ButtonEvent::SingleClick)
            }
            _ => None,
        }
    }
}
