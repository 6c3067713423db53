pub mod audio;
pub mod power;
pub mod remote;
pub mod sensor;
pub mod ui;

/// Milliseconds since boot (wraps at ~49 days; every consumer uses wrapping math).
pub fn now_ms() -> u32 {
    unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u32 }
}
