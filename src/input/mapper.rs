// MiBuddy — Input Mapper
//
// Maps an InputState to the avatar's proposed (state, activity). The default
// mapper walks a fixed checklist, most urgent condition first; the first
// match wins and falling off the end yields Happy + Idle. One-shot sound cues
// fire only on entry into their condition.

use log::info;

use crate::config::*;
use crate::mochi::types::{Activity, EmotionalState};

use super::remote::RemoteMailbox;
use super::state::{signed_deviation, InputState};

/// One-shot sound played when a condition is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Braking,
    Weee,
}

impl SoundCue {
    /// File name under the SD sounds directory.
    pub fn file(&self) -> &'static str {
        match self {
            Self::Braking => "brake.mp3",
            Self::Weee => "weee.mp3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub state: EmotionalState,
    pub activity: Activity,
    pub cue: Option<SoundCue>,
}

impl Decision {
    pub const fn new(state: EmotionalState, activity: Activity) -> Self {
        Self { state, activity, cue: None }
    }

    pub const fn with_cue(mut self, cue: SoundCue) -> Self {
        self.cue = Some(cue);
        self
    }
}

impl Default for Decision {
    fn default() -> Self {
        Self::new(EmotionalState::Happy, Activity::Idle)
    }
}

/// Pluggable classification policy.
pub trait Mapper {
    fn map(&mut self, input: &InputState) -> Decision;
}

impl<F: FnMut(&InputState) -> Decision> Mapper for F {
    fn map(&mut self, input: &InputState) -> Decision {
        self(input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapperConfig {
    pub roll_baseline_deg: f32,
    pub pitch_baseline_deg: f32,
    /// Deviation that starts a slide.
    pub tilt_threshold_deg: f32,
    /// Deviation that makes the slide exciting.
    pub extreme_threshold_deg: f32,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            roll_baseline_deg: TILT_ROLL_BASELINE_DEG,
            pitch_baseline_deg: TILT_PITCH_BASELINE_DEG,
            tilt_threshold_deg: TILT_THRESHOLD_DEG,
            extreme_threshold_deg: TILT_EXTREME_THRESHOLD_DEG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tilt {
    slide: Activity,
    extreme: bool,
}

impl MapperConfig {
    /// Tilt zone for the current attitude. Roll is checked before pitch, and
    /// each axis keeps its own thresholds. Face-up attitude never tilts.
    fn tilt(&self, input: &InputState) -> Option<Tilt> {
        if input.is_face_up {
            return None;
        }
        let roll = signed_deviation(input.roll, self.roll_baseline_deg);
        let pitch = signed_deviation(input.pitch, self.pitch_baseline_deg);

        let roll_slide = if roll < 0.0 { Activity::SlideLeft } else { Activity::SlideRight };
        let pitch_slide = if pitch > 0.0 { Activity::SlideUp } else { Activity::SlideDown };

        for (threshold, extreme) in [(self.extreme_threshold_deg, true), (self.tilt_threshold_deg, false)] {
            if roll.abs() >= threshold {
                return Some(Tilt { slide: roll_slide, extreme });
            }
            if pitch.abs() >= threshold {
                return Some(Tilt { slide: pitch_slide, extreme });
            }
        }
        None
    }
}

/// The built-in checklist mapper.
pub struct DefaultMapper {
    config: MapperConfig,
    remote: Option<RemoteMailbox>,
    /// Braking cue already played for the current braking episode.
    braking_fired: bool,
    /// Weee cue already played for the current extreme-tilt episode.
    extreme_fired: bool,
    calls: u32,
}

impl Default for DefaultMapper {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}

impl DefaultMapper {
    pub fn new(config: MapperConfig) -> Self {
        Self { config, remote: None, braking_fired: false, extreme_fired: false, calls: 0 }
    }

    /// Ask `mailbox` for a decision when nothing local applies and WiFi is up.
    pub fn with_remote(mut self, mailbox: RemoteMailbox) -> Self {
        self.remote = Some(mailbox);
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn braking_fired(&self) -> bool {
        self.braking_fired
    }

    pub fn extreme_fired(&self) -> bool {
        self.extreme_fired
    }

    fn decide(&mut self, input: &InputState) -> (Decision, &'static str) {
        use Activity as A;
        use EmotionalState as S;

        if !input.is_braking {
            self.braking_fired = false;
        }
        let tilt = self.config.tilt(input);
        if !matches!(tilt, Some(Tilt { extreme: true, .. })) {
            self.extreme_fired = false;
        }

        if input.is_braking {
            let mut d = Decision::new(S::Shocked, A::Idle);
            if !self.braking_fired {
                self.braking_fired = true;
                d = d.with_cue(SoundCue::Braking);
            }
            return (d, "is_braking");
        }
        if input.is_shaking {
            return (Decision::new(S::Panic, A::Vibrate), "is_shaking");
        }
        if input.is_spinning {
            return (Decision::new(S::Dizzy, A::Spin), "is_spinning");
        }
        if input.is_critical_battery {
            return (Decision::new(S::Worried, A::Idle), "is_critical_battery");
        }
        if input.is_face_down {
            return (Decision::new(S::Sleepy, A::Snore), "is_face_down");
        }
        if input.is_portrait_inv {
            return (Decision::new(S::Shocked, A::Wiggle), "is_portrait_inv");
        }
        if let Some(t) = tilt {
            if t.extreme {
                let mut d = Decision::new(S::Excited, t.slide);
                if !self.extreme_fired {
                    self.extreme_fired = true;
                    d = d.with_cue(SoundCue::Weee);
                }
                return (d, "extreme tilt");
            }
            return (Decision::new(S::Happy, t.slide), "tilt");
        }
        if input.is_night {
            return (Decision::new(S::Sleepy, A::Snore), "is_night");
        }
        if input.is_rotating {
            return (Decision::new(S::Cool, A::Nod), "is_rotating");
        }
        if input.is_moving {
            return (Decision::new(S::Excited, A::Bounce), "is_moving");
        }
        if input.is_landscape() {
            return (Decision::new(S::Cool, A::Idle), "is_landscape");
        }
        if input.is_low_battery {
            return (Decision::new(S::Worried, A::Idle), "is_low_battery");
        }

        if input.wifi_connected {
            if let Some(remote) = &self.remote {
                if let Some(r) = remote.take_result() {
                    return (Decision::new(r.state, r.activity), "remote result");
                }
                remote.request(input);
            }
        }
        (Decision::default(), "fallback")
    }

    fn trace_inputs(&self, input: &InputState) {
        info!(target: "input_mapper", "MAPPER CALL #{}", self.calls);
        info!(
            target: "input_mapper",
            "Battery: {:.1}%, charging: {}, temp: {:.1}°C, time {:02}:{:02} dow {}",
            input.battery_pct, input.is_charging, input.temperature, input.hour, input.minute, input.day_of_week
        );
        info!(
            target: "input_mapper",
            "Accel: X={:.2} Y={:.2} Z={:.2} g ({:.2}g), Gyro: X={:.1} Y={:.1} Z={:.1} deg/s ({:.1})",
            input.accel_x, input.accel_y, input.accel_z, input.accel_magnitude,
            input.gyro_x, input.gyro_y, input.gyro_z, input.gyro_magnitude
        );
        info!(
            target: "input_mapper",
            "moving={} shaking={} rotating={} spinning={} braking={} | {} pitch={:.1} roll={:.1}",
            input.is_moving, input.is_shaking, input.is_rotating, input.is_spinning, input.is_braking,
            input.orientation_name(), input.pitch, input.roll
        );
        info!(
            target: "input_mapper",
            "low_batt={} critical={} night={} weekend={} wifi={} touch={}",
            input.is_low_battery, input.is_critical_battery, input.is_night, input.is_weekend,
            input.wifi_connected, input.touch_active
        );
    }
}

impl Mapper for DefaultMapper {
    fn map(&mut self, input: &InputState) -> Decision {
        self.calls = self.calls.wrapping_add(1);
        let verbose = self.calls % 10 == 1;
        if verbose {
            self.trace_inputs(input);
        }

        let (decision, reason) = self.decide(input);
        if verbose {
            info!(
                target: "input_mapper",
                "{} -> {} + {}{}",
                reason,
                decision.state,
                decision.activity,
                decision.cue.map(|c| format!(" ({})", c.file())).unwrap_or_default()
            );
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::remote::{mailbox, RemoteTransport};
    use crate::error::Result;
    use std::time::Duration;

    /// Upright at the baseline attitude with the given roll.
    fn rolled(roll: f32) -> InputState {
        InputState { roll, pitch: 0.0, battery_pct: 80.0, hour: 12, ..InputState::default() }
    }

    fn flat() -> InputState {
        InputState { is_face_up: true, battery_pct: 80.0, hour: 12, pitch: 90.0, ..InputState::default() }
    }

    #[test]
    fn fallback_is_happy_idle() {
        let mut m = DefaultMapper::default();
        assert_eq!(m.map(&flat()), Decision::default());
    }

    #[test]
    fn checklist_order() {
        let mut m = DefaultMapper::default();
        let both = InputState { is_shaking: true, is_spinning: true, ..flat() };
        assert_eq!(m.map(&both), Decision::new(EmotionalState::Panic, Activity::Vibrate));

        let low_and_moving = InputState { is_critical_battery: true, is_moving: true, ..flat() };
        assert_eq!(m.map(&low_and_moving).state, EmotionalState::Worried);

        let night_tilted = InputState { is_night: true, ..rolled(60.0) };
        assert_eq!(m.map(&night_tilted).activity, Activity::SlideLeft);

        let night = InputState { is_night: true, ..flat() };
        assert_eq!(m.map(&night), Decision::new(EmotionalState::Sleepy, Activity::Snore));

        let landscape = InputState { is_landscape_left: true, ..rolled(90.0) };
        assert_eq!(m.map(&landscape), Decision::new(EmotionalState::Cool, Activity::Idle));
    }

    #[test]
    fn braking_cue_is_edge_triggered() {
        let mut m = DefaultMapper::default();
        let braking = InputState { is_braking: true, ..flat() };

        let first = m.map(&braking);
        assert_eq!((first.state, first.activity), (EmotionalState::Shocked, Activity::Idle));
        assert_eq!(first.cue, Some(SoundCue::Braking));
        assert_eq!(m.map(&braking).cue, None);

        m.map(&flat());
        assert!(!m.braking_fired());
        assert_eq!(m.map(&braking).cue, Some(SoundCue::Braking));
    }

    #[test]
    fn tilt_zones_and_weee_edge() {
        let mut m = DefaultMapper::default();

        let normal = m.map(&rolled(60.0));
        assert_eq!(normal, Decision::new(EmotionalState::Happy, Activity::SlideLeft));

        let extreme = m.map(&rolled(50.0));
        assert_eq!((extreme.state, extreme.activity), (EmotionalState::Excited, Activity::SlideLeft));
        assert_eq!(extreme.cue, Some(SoundCue::Weee));
        assert_eq!(m.map(&rolled(50.0)).cue, None);

        assert_eq!(m.map(&rolled(70.0)), Decision::default());
        assert_eq!(m.map(&rolled(50.0)).cue, Some(SoundCue::Weee));

        assert_eq!(m.map(&rolled(130.0)).activity, Activity::SlideRight);
    }

    #[test]
    fn pitch_tilts_slide_vertically() {
        let mut m = DefaultMapper::default();
        let up = InputState { pitch: 30.0, ..rolled(90.0) };
        assert_eq!(m.map(&up), Decision::new(EmotionalState::Happy, Activity::SlideUp));
        let down = InputState { pitch: -40.0, ..rolled(90.0) };
        assert_eq!(m.map(&down).activity, Activity::SlideDown);
    }

    #[test]
    fn closures_are_mappers() {
        let mut always_cool = |_: &InputState| Decision::new(EmotionalState::Cool, Activity::Nod);
        assert_eq!(Mapper::map(&mut always_cool, &flat()).state, EmotionalState::Cool);
    }

    struct Fixed;
    impl RemoteTransport for Fixed {
        fn post_json(&mut self, _url: &str, _body: &str) -> Result<(u16, String)> {
            Ok((200, r#"{"state":"Cool","activity":"Wiggle"}"#.into()))
        }
    }

    #[test]
    fn remote_result_used_when_online() {
        let (mb, worker) = mailbox();
        let mut m = DefaultMapper::default().with_remote(mb.clone());
        let online = InputState { wifi_connected: true, ..flat() };

        assert_eq!(m.map(&online), Decision::default());
        assert!(mb.is_pending());
        worker.serve_one(&mut Fixed, "http://host", Duration::from_millis(10));

        assert_eq!(m.map(&online), Decision::new(EmotionalState::Cool, Activity::Wiggle));
        assert_eq!(m.map(&online), Decision::default(), "each answer is used once");
    }
}
