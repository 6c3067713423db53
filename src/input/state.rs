// MiBuddy — Input Classifier
//
// Turns one fresh snapshot of the board's sensors into an InputState: the raw
// readings plus every derived flag the mapper decides on. Nothing is cached
// across samples except what the braking and dwell-time flags need.

use core::f32::consts::PI;

use crate::config::*;

use super::motion_config::MotionConfig;

/// Raw readings gathered once per input tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReadings {
    pub battery_pct: f32,
    pub is_charging: bool,
    /// Board temperature in °C.
    pub temperature: f32,
    pub hour: u8,
    pub minute: u8,
    /// 0 = Sunday.
    pub day_of_week: u8,
    /// Acceleration in g.
    pub accel: [f32; 3],
    /// Angular rate in °/s.
    pub gyro: [f32; 3],
    pub wifi_connected: bool,
    pub touch_active: bool,
}

impl SensorReadings {
    /// Device lying flat on a table at noon on a Wednesday.
    pub fn resting() -> Self {
        Self {
            battery_pct: 80.0,
            hour: 12,
            day_of_week: 3,
            accel: [0.0, 0.0, 1.0],
            temperature: 25.0,
            ..Self::default()
        }
    }
}

/// Anything that can produce a [`SensorReadings`] snapshot.
pub trait SensorSource {
    fn read(&mut self) -> SensorReadings;
}

impl<F: FnMut() -> SensorReadings> SensorSource for F {
    fn read(&mut self) -> SensorReadings {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputState {
    // static
    pub battery_pct: f32,
    pub is_charging: bool,
    pub temperature: f32,
    pub hour: u8,
    pub minute: u8,
    pub day_of_week: u8,
    pub accel_x: f32,
    pub accel_y: f32,
    pub accel_z: f32,
    pub gyro_x: f32,
    pub gyro_y: f32,
    pub gyro_z: f32,
    pub wifi_connected: bool,
    pub touch_active: bool,

    // battery / clock
    pub is_low_battery: bool,
    pub is_critical_battery: bool,
    pub is_night: bool,
    pub is_weekend: bool,

    // motion
    pub accel_magnitude: f32,
    pub gyro_magnitude: f32,
    pub is_moving: bool,
    pub is_shaking: bool,
    pub is_rotating: bool,
    pub is_spinning: bool,
    pub is_braking: bool,
    pub is_idle: bool,

    // orientation
    pub is_face_up: bool,
    pub is_face_down: bool,
    pub is_portrait: bool,
    pub is_portrait_inv: bool,
    pub is_landscape_left: bool,
    pub is_landscape_right: bool,
    /// Degrees, forward/backward tilt.
    pub pitch: f32,
    /// Degrees, left/right tilt.
    pub roll: f32,

    pub current_state_duration_ms: u32,
}

impl InputState {
    pub fn orientation_name(&self) -> &'static str {
        if self.is_face_up {
            "FACE_UP"
        } else if self.is_face_down {
            "FACE_DOWN"
        } else if self.is_portrait {
            "PORTRAIT"
        } else if self.is_portrait_inv {
            "PORTRAIT_INV"
        } else if self.is_landscape_left {
            "LANDSCAPE_LEFT"
        } else if self.is_landscape_right {
            "LANDSCAPE_RIGHT"
        } else {
            "unknown"
        }
    }

    pub fn is_landscape(&self) -> bool {
        self.is_landscape_left || self.is_landscape_right
    }
}

fn magnitude(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

pub fn is_night_hour(hour: u8) -> bool {
    hour >= NIGHT_START_HOUR || hour < NIGHT_END_HOUR
}

/// Signed difference `angle - baseline` folded into (-180, 180].
pub fn signed_deviation(angle: f32, baseline: f32) -> f32 {
    let mut d = (angle - baseline) % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

/// Computes derived flags. Keeps the previous magnitude for braking and the
/// time of the last avatar transition for dwell time.
#[derive(Debug, Default)]
pub struct InputClassifier {
    previous: Option<(f32, u32)>,
    state_change_ms: u32,
    latest: InputState,
}

impl InputClassifier {
    pub fn new(now_ms: u32) -> Self {
        Self { previous: None, state_change_ms: now_ms, latest: InputState::default() }
    }

    /// The avatar moved to a new (state, activity); restart the dwell timer.
    pub fn mark_state_change(&mut self, now_ms: u32) {
        self.state_change_ms = now_ms;
    }

    pub fn latest(&self) -> &InputState {
        &self.latest
    }

    pub fn sample(&mut self, r: &SensorReadings, now_ms: u32, cfg: &MotionConfig) -> InputState {
        let [ax, ay, az] = r.accel;
        let [gx, gy, gz] = r.gyro;

        let mut s = InputState {
            battery_pct: r.battery_pct,
            is_charging: r.is_charging,
            temperature: r.temperature,
            hour: r.hour,
            minute: r.minute,
            day_of_week: r.day_of_week,
            accel_x: ax,
            accel_y: ay,
            accel_z: az,
            gyro_x: gx,
            gyro_y: gy,
            gyro_z: gz,
            wifi_connected: r.wifi_connected,
            touch_active: r.touch_active,
            ..InputState::default()
        };

        s.is_low_battery = r.battery_pct < LOW_BATTERY_PCT;
        s.is_critical_battery = r.battery_pct < CRITICAL_BATTERY_PCT;
        s.is_night = is_night_hour(r.hour);
        s.is_weekend = r.day_of_week == 0 || r.day_of_week == 6;

        s.accel_magnitude = magnitude(r.accel);
        s.is_moving = (s.accel_magnitude - 1.0).abs() > cfg.moving_threshold_g;
        s.is_shaking = s.accel_magnitude > cfg.shaking_threshold_g;

        s.gyro_magnitude = magnitude(r.gyro);
        s.is_rotating = s.gyro_magnitude > cfg.rotating_threshold_dps;
        s.is_spinning = s.gyro_magnitude > cfg.spinning_threshold_dps;
        s.is_idle = !s.is_moving && !s.is_rotating;

        if let Some((prev_mag, prev_ms)) = self.previous {
            let dt_ms = now_ms.wrapping_sub(prev_ms);
            if dt_ms > 0 {
                let rate = (prev_mag - s.accel_magnitude) * 1000.0 / dt_ms as f32;
                s.is_braking = rate > cfg.braking_threshold_gps;
            }
        }
        self.previous = Some((s.accel_magnitude, now_ms));

        classify_orientation(&mut s);

        let rad_to_deg = 180.0 / PI;
        s.pitch = az.atan2((ax * ax + ay * ay).sqrt()) * rad_to_deg;
        s.roll = ax.atan2(ay) * rad_to_deg;

        s.current_state_duration_ms = now_ms.wrapping_sub(self.state_change_ms);

        self.latest = s;
        s
    }
}

/// Sets at most one orientation flag, from the clearly dominant gravity axis.
fn classify_orientation(s: &mut InputState) {
    let (x, y, z) = (s.accel_x.abs(), s.accel_y.abs(), s.accel_z.abs());
    let t = ORIENTATION_THRESHOLD_G;

    if z > x && z > y && z > t {
        if s.accel_z > 0.0 {
            s.is_face_up = true;
        } else {
            s.is_face_down = true;
        }
    } else if y > x && y > z && y > t {
        if s.accel_y < 0.0 {
            s.is_portrait = true;
        } else {
            s.is_portrait_inv = true;
        }
    } else if x > y && x > z && x > t {
        if s.accel_x > 0.0 {
            s.is_landscape_left = true;
        } else {
            s.is_landscape_right = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(r: SensorReadings) -> InputState {
        InputClassifier::new(0).sample(&r, 100, &MotionConfig::default())
    }

    #[test]
    fn resting_flat_is_face_up_and_idle() {
        let s = sample(SensorReadings::resting());
        assert!(s.is_face_up);
        assert!(s.is_idle);
        assert!(!s.is_moving && !s.is_shaking && !s.is_braking);
        assert!((s.pitch - 90.0).abs() < 0.01);
        assert_eq!(s.orientation_name(), "FACE_UP");
    }

    #[test]
    fn battery_and_clock_thresholds() {
        let s = sample(SensorReadings { battery_pct: 4.0, hour: 23, day_of_week: 6, ..SensorReadings::resting() });
        assert!(s.is_low_battery && s.is_critical_battery);
        assert!(s.is_night && s.is_weekend);

        let s = sample(SensorReadings { battery_pct: 19.0, hour: 6, day_of_week: 1, ..SensorReadings::resting() });
        assert!(s.is_low_battery && !s.is_critical_battery);
        assert!(!s.is_night && !s.is_weekend);
        assert!(is_night_hour(5) && is_night_hour(22) && !is_night_hour(21));
    }

    #[test]
    fn motion_flags_follow_thresholds() {
        let shaking = sample(SensorReadings { accel: [2.0, 1.0, 0.5], ..SensorReadings::resting() });
        assert!(shaking.is_moving && shaking.is_shaking && !shaking.is_idle);

        let spinning = sample(SensorReadings { gyro: [0.0, 0.0, 150.0], ..SensorReadings::resting() });
        assert!(spinning.is_rotating && spinning.is_spinning);
        assert!(!spinning.is_idle);

        let gentle = sample(SensorReadings { gyro: [20.0, 20.0, 0.0], ..SensorReadings::resting() });
        assert!(!gentle.is_rotating);
    }

    #[test]
    fn orientation_needs_a_dominant_axis() {
        let inv = sample(SensorReadings { accel: [0.1, 0.9, 0.2], ..SensorReadings::resting() });
        assert!(inv.is_portrait_inv);
        let left = sample(SensorReadings { accel: [0.95, 0.0, 0.1], ..SensorReadings::resting() });
        assert!(left.is_landscape_left && left.is_landscape());
        assert!((left.roll - 90.0).abs() < 0.01);
        let tilted = sample(SensorReadings { accel: [0.6, 0.6, 0.5], ..SensorReadings::resting() });
        assert_eq!(tilted.orientation_name(), "unknown");
    }

    #[test]
    fn braking_is_a_magnitude_drop_rate() {
        let cfg = MotionConfig::default();
        let mut c = InputClassifier::new(0);
        let fast = SensorReadings { accel: [0.0, 0.0, 2.0], ..SensorReadings::resting() };
        assert!(!c.sample(&fast, 0, &cfg).is_braking);
        // 1 g lost in 200 ms = 5 g/s
        assert!(c.sample(&SensorReadings::resting(), 200, &cfg).is_braking);
        assert!(!c.sample(&SensorReadings::resting(), 400, &cfg).is_braking);
    }

    #[test]
    fn duration_counts_from_last_change() {
        let cfg = MotionConfig::default();
        let mut c = InputClassifier::new(1000);
        assert_eq!(c.sample(&SensorReadings::resting(), 1500, &cfg).current_state_duration_ms, 500);
        c.mark_state_change(1500);
        assert_eq!(c.sample(&SensorReadings::resting(), 1700, &cfg).current_state_duration_ms, 200);
        assert_eq!(c.latest().current_state_duration_ms, 200);
    }

    #[test]
    fn deviation_wraps() {
        assert_eq!(signed_deviation(50.0, 90.0), -40.0);
        assert_eq!(signed_deviation(-170.0, 170.0), 20.0);
        assert_eq!(signed_deviation(170.0, -170.0), -20.0);
    }
}
