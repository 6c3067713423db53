// MiBuddy — Procedural Animation Engine
//
// Every frame starts from the intensity-scaled base face, applies the state's
// personality overlay (Dizzy, Panic, Sleepy), then the activity's motion. All
// motion is a closed-form function of elapsed time; only Blink keeps memory.

use core::f32::consts::PI;

use log::debug;

use crate::config::*;
use crate::timer::PeriodicTimer;

use super::types::{Activity, EmotionalState, FaceParams};

// ---------------------------------------------------------------------------
// Motion constants
// ---------------------------------------------------------------------------
const IDLE_BREATH_HZ: f32 = 0.4;
const IDLE_SQUISH: f32 = 0.02;
const IDLE_SWAY: f32 = 2.0;

const SHAKE_HZ: f32 = 10.0;
const SHAKE_AMP: f32 = 8.0;

const BOUNCE_HZ: f32 = 3.0;
const BOUNCE_UP: f32 = 5.0;
const BOUNCE_DOWN: f32 = 10.0;

const SPIN_HZ: f32 = 0.5;

const WIGGLE_HZ: f32 = 4.0;
const WIGGLE_DEG: f32 = 5.0;

const NOD_HZ: f32 = 2.0;
const NOD_AMP: f32 = 5.0;

const VIBRATE_HZ: f32 = 30.0;
const VIBRATE_AMP: f32 = 2.0;

const SLIDE_OFFSET: f32 = 12.0;
const SLIDE_EYE_LEAD: f32 = 4.0;
const SLIDE_SWAY_HZ: f32 = 1.5;

const BLINK_SQUISH: f32 = 0.9;

#[inline]
fn wave(hz: f32, t: f32) -> f32 {
    (2.0 * PI * hz * t).sin()
}

// ---------------------------------------------------------------------------
// Blink sub-state
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlinkPhase {
    Waiting,
    Closing,
    Opening,
}

#[derive(Debug, Clone)]
struct Blink {
    blinking: bool,
    progress: f32,
    last_blink_ms: u32,
}

impl Blink {
    fn new(now_ms: u32) -> Self {
        Self { blinking: false, progress: 0.0, last_blink_ms: now_ms }
    }

    fn phase(&self) -> BlinkPhase {
        if !self.blinking {
            BlinkPhase::Waiting
        } else if self.progress < 0.5 {
            BlinkPhase::Closing
        } else {
            BlinkPhase::Opening
        }
    }

    /// Eyelid depth is fixed; intensity does not shorten a blink.
    fn step(&mut self, now_ms: u32, increment: f32, p: &mut FaceParams) {
        if !self.blinking && now_ms.wrapping_sub(self.last_blink_ms) >= BLINK_INTERVAL_MS {
            self.blinking = true;
            self.progress = 0.0;
            self.last_blink_ms = now_ms;
        }
        if !self.blinking {
            return;
        }

        self.progress += increment;
        if self.progress < 0.5 {
            p.eye_squish = self.progress * 2.0 * BLINK_SQUISH;
        } else if self.progress < 1.0 {
            p.eye_squish = (1.0 - self.progress) * 2.0 * BLINK_SQUISH;
        } else {
            p.eye_squish = 0.0;
            self.blinking = false;
            self.progress = 0.0;
        }
    }
}

// ---------------------------------------------------------------------------
// Overlays and activities
// ---------------------------------------------------------------------------

/// State personality, applied before the activity.
pub fn apply_state_overlay(state: EmotionalState, t: f32, frame: u32, intensity: f32, p: &mut FaceParams) {
    match state {
        EmotionalState::Dizzy => {
            p.eye_scale = 1.0 + (t * 6.0).sin() * 0.15 * intensity;
            p.eye_offset_x = (t * 10.0).sin() * 6.0 * intensity;
            p.eye_offset_y = (t * 8.0).cos() * 4.0 * intensity;
            p.face_rotation = (t * 5.0).sin() * 5.0 * intensity;
            p.face_offset_y = (t * 6.0).sin().abs() * 8.0 * intensity;
        }
        EmotionalState::Panic => {
            p.face_rotation = (frame as f32 * 8.0 * intensity) % 360.0;
        }
        EmotionalState::Sleepy => {
            p.eye_scale = 0.15 + t.sin() * 0.05;
        }
        _ => {}
    }
}

fn idle(t: f32, i: f32, p: &mut FaceParams) {
    p.face_squish = wave(IDLE_BREATH_HZ, t) * IDLE_SQUISH * i;
    p.eye_offset_x = (t * 0.5).sin() * IDLE_SWAY * i;
    p.eye_offset_y = (t * 0.3).sin() * 1.0 * i;
    p.face_offset_y = (t * 0.4).sin() * 2.0 * i;
}

/// Continuous motion of `activity` at time `t` seconds. Blink only applies
/// its breathing part here; the eyelid is driven by [`AnimEngine`].
pub fn apply_activity(activity: Activity, t: f32, i: f32, p: &mut FaceParams) {
    match activity {
        Activity::Idle | Activity::Blink => idle(t, i, p),
        Activity::Shake => {
            let s = wave(SHAKE_HZ, t);
            p.face_offset_y = s * SHAKE_AMP * i;
            p.eye_offset_x = -s * SHAKE_AMP * 0.3 * i;
        }
        Activity::Bounce => {
            let b = wave(BOUNCE_HZ, t);
            p.face_offset_y = if b > 0.0 { -b * BOUNCE_UP * i } else { -b * BOUNCE_DOWN * i };
            p.face_squish = b.abs() * 0.05 * i;
        }
        Activity::Spin => {
            p.face_rotation = ((t * 360.0 * SPIN_HZ) % 360.0) * i;
        }
        Activity::Wiggle => {
            p.face_rotation = wave(WIGGLE_HZ, t) * WIGGLE_DEG * i;
        }
        Activity::Nod => {
            p.face_offset_y = wave(NOD_HZ, t) * NOD_AMP * i;
        }
        Activity::Snore => {
            p.face_squish = wave(0.3, t) * 0.03 * i;
            // resting droop stays put, only the breathing scales
            p.face_offset_y = 3.0 + wave(0.25, t) * 2.0 * i;
            p.face_rotation = -3.0 + wave(0.2, t) * 2.0 * i;
            p.mouth_open = 0.2 + wave(0.4, t) * 0.1 * i;
        }
        Activity::Vibrate => {
            p.face_offset_y = wave(VIBRATE_HZ, t) * VIBRATE_AMP * i;
            p.eye_offset_x = (2.0 * PI * VIBRATE_HZ * 1.3 * t).cos() * VIBRATE_AMP * i;
        }
        Activity::SlideLeft | Activity::SlideRight => {
            let dir = if activity == Activity::SlideLeft { -1.0 } else { 1.0 };
            idle(t, i, p);
            p.face_offset_x = dir * (SLIDE_OFFSET + wave(SLIDE_SWAY_HZ, t) * 2.0) * i;
            p.eye_offset_x = dir * SLIDE_EYE_LEAD * i;
        }
        Activity::SlideUp | Activity::SlideDown => {
            let dir = if activity == Activity::SlideUp { -1.0 } else { 1.0 };
            idle(t, i, p);
            p.face_offset_y = dir * (SLIDE_OFFSET + wave(SLIDE_SWAY_HZ, t) * 2.0) * i;
            p.eye_offset_y = dir * SLIDE_EYE_LEAD * i;
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------
pub struct AnimEngine {
    state: EmotionalState,
    activity: Activity,
    intensity: f32,
    frame: u32,
    blink: Blink,
    blink_increment: f32,
    timer: PeriodicTimer,
}

impl AnimEngine {
    /// Engine ticking every `period_ms`, stopped until [`start`](Self::start).
    pub fn new(period_ms: u32) -> Self {
        Self {
            state: EmotionalState::Happy,
            activity: Activity::Idle,
            intensity: INTENSITY_DEFAULT,
            frame: 0,
            blink: Blink::new(0),
            blink_increment: BLINK_RATE_PER_SEC * period_ms as f32 / 1000.0,
            timer: PeriodicTimer::paused(period_ms),
        }
    }

    /// (Re)start for a new state/activity pair. Clock and blink reset.
    pub fn start(&mut self, state: EmotionalState, activity: Activity, intensity: f32, now_ms: u32) {
        self.state = state;
        self.activity = activity;
        self.intensity = intensity;
        self.frame = 0;
        self.blink = Blink::new(now_ms);
        self.timer.resume();
        debug!(target: "mochi_anim", "Start {} + {} @ {:.2}", state, activity, intensity);
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    pub fn pause(&mut self) {
        self.timer.pause();
    }

    pub fn resume(&mut self) {
        self.timer.resume();
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn blink_phase(&self) -> BlinkPhase {
        self.blink.phase()
    }

    /// Elapsed animation time in seconds.
    pub fn elapsed_s(&self) -> f32 {
        self.frame as f32 * self.timer.period_ms() as f32 / 1000.0
    }

    /// Advance one frame if the timer is due and write the result into
    /// `derived`. Returns `true` when a new frame was produced.
    pub fn poll(&mut self, now_ms: u32, base: &FaceParams, derived: &mut FaceParams) -> bool {
        if !self.timer.poll(now_ms) {
            return false;
        }
        self.step(now_ms, base, derived);
        true
    }

    /// Produce the next frame unconditionally.
    pub fn step(&mut self, now_ms: u32, base: &FaceParams, derived: &mut FaceParams) {
        self.frame = self.frame.wrapping_add(1);
        let t = self.elapsed_s();

        *derived = *base;
        apply_state_overlay(self.state, t, self.frame, self.intensity, derived);
        apply_activity(self.activity, t, self.intensity, derived);
        if self.activity == Activity::Blink {
            self.blink.step(now_ms, self.blink_increment, derived);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn blink_increment_is_derived_from_period() {
        let engine = AnimEngine::new(25);
        assert!(approx(engine.blink_increment, 0.15));
        let slow = AnimEngine::new(50);
        assert!(approx(slow.blink_increment, 0.30));
    }

    #[test]
    fn bounce_is_asymmetric() {
        let mut p = FaceParams::default();
        // quarter period of 3 Hz: sin = 1
        apply_activity(Activity::Bounce, 1.0 / 12.0, 1.0, &mut p);
        assert!(approx(p.face_offset_y, -5.0));
        apply_activity(Activity::Bounce, 3.0 / 12.0, 1.0, &mut p);
        assert!(approx(p.face_offset_y, -10.0 * -1.0));
    }

    #[test]
    fn activity_amplitude_follows_intensity() {
        let mut full = FaceParams::default();
        let mut half = FaceParams::default();
        apply_activity(Activity::Nod, 0.125, 1.0, &mut full);
        apply_activity(Activity::Nod, 0.125, 0.5, &mut half);
        assert!(approx(full.face_offset_y, 5.0));
        assert!(approx(half.face_offset_y, 2.5));
    }

    #[test]
    fn activity_overwrites_state_overlay() {
        let mut p = FaceParams::default();
        apply_state_overlay(EmotionalState::Dizzy, 0.3, 12, 1.0, &mut p);
        apply_activity(Activity::Wiggle, 0.0, 1.0, &mut p);
        assert!(approx(p.face_rotation, 0.0));
    }

    #[test]
    fn panic_spins_with_frame_count() {
        let mut p = FaceParams::default();
        apply_state_overlay(EmotionalState::Panic, 0.0, 50, 1.0, &mut p);
        assert!(approx(p.face_rotation, 40.0));
    }

    #[test]
    fn slide_left_moves_face_left() {
        let mut p = FaceParams::default();
        apply_activity(Activity::SlideLeft, 0.0, 1.0, &mut p);
        assert!(p.face_offset_x < -10.0);
        assert!(p.eye_offset_x < 0.0);
    }

    #[test]
    fn blink_cycle_closes_then_opens() {
        let mut engine = AnimEngine::new(25);
        let base = FaceParams::default();
        let mut out = base;
        engine.start(EmotionalState::Happy, Activity::Blink, 0.7, 0);

        engine.step(1000, &base, &mut out);
        assert_eq!(engine.blink_phase(), BlinkPhase::Waiting);

        let mut now = 3000;
        engine.step(now, &base, &mut out);
        assert_eq!(engine.blink_phase(), BlinkPhase::Closing);
        assert!(approx(out.eye_squish, 0.15 * 2.0 * 0.9));

        let mut peak: f32 = 0.0;
        while engine.blink_phase() != BlinkPhase::Waiting {
            now += 25;
            engine.step(now, &base, &mut out);
            peak = peak.max(out.eye_squish);
        }
        assert!(peak > 0.8);
        assert_eq!(out.eye_squish, 0.0);
    }

    #[test]
    fn snore_scales_breathing_not_droop() {
        let mut full = FaceParams::default();
        let mut half = FaceParams::default();
        apply_activity(Activity::Snore, 0.0, 1.0, &mut full);
        apply_activity(Activity::Snore, 0.0, 0.5, &mut half);
        assert!(approx(full.face_offset_y, 3.0) && approx(half.face_offset_y, 3.0));
        assert!(approx(full.face_rotation, -3.0) && approx(half.face_rotation, -3.0));

        // 0.25 Hz peak
        apply_activity(Activity::Snore, 1.0, 1.0, &mut full);
        apply_activity(Activity::Snore, 1.0, 0.5, &mut half);
        assert!(approx(full.face_offset_y, 5.0));
        assert!(approx(half.face_offset_y, 4.0));
        let mouth = (2.0 * PI * 0.4_f32).sin() * 0.1;
        assert!(approx(full.mouth_open, 0.2 + mouth));
        assert!(approx(half.mouth_open, 0.2 + mouth * 0.5));
    }

    #[test]
    fn paused_engine_produces_no_frames() {
        let mut engine = AnimEngine::new(25);
        let base = FaceParams::default();
        let mut out = base;
        engine.start(EmotionalState::Happy, Activity::Shake, 1.0, 0);
        engine.poll(0, &base, &mut out);
        assert!(engine.poll(25, &base, &mut out));
        engine.pause();
        assert!(!engine.poll(50, &base, &mut out));
        assert!(!engine.poll(500, &base, &mut out));
        assert_eq!(engine.frame(), 1);
    }
}
