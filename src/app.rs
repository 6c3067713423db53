// MiBuddy — App Shell
//
// The MiBuddy screen: owns the avatar and the sensor pipeline
// (classifier → mapper → arbiter) and runs both off one cooperative tick.
// The input pipeline has its own timer, independent of the 25 ms animation
// timer, so its rate can change at runtime.

use log::{info, warn};

use crate::button::ButtonEvent;
use crate::config::*;
use crate::error::Result;
use crate::input::{HoldArbiter, InputClassifier, InputState, Mapper, MotionConfig, SensorSource};
use crate::mochi::types::{Activity, EmotionalState};
use crate::mochi::Mochi;
use crate::platform::{AudioOutput, Display, ObjectId, ObjectKind, Transform};
use crate::timer::PeriodicTimer;

const LABEL_Y: i32 = 24;
const PLACEHOLDER_TEXT: &str = "MiBuddy is napping";

pub fn clamp_input_interval(ms: u32) -> u32 {
    ms.clamp(INPUT_INTERVAL_MIN_MS, INPUT_INTERVAL_MAX_MS)
}

pub fn state_label(state: EmotionalState, activity: Activity) -> String {
    format!("{} + {}", state, activity)
}

pub struct MiBuddyApp<D: Display, A: AudioOutput, S: SensorSource, M: Mapper> {
    mochi: Mochi<D, A>,
    sensors: S,
    mapper: M,
    motion: MotionConfig,
    classifier: InputClassifier,
    arbiter: HoldArbiter,
    input_timer: PeriodicTimer,
    label: Option<ObjectId>,
    running: bool,
    intensity_step: usize,
}

impl<D: Display, A: AudioOutput, S: SensorSource, M: Mapper> MiBuddyApp<D, A, S, M> {
    pub fn new(mochi: Mochi<D, A>, sensors: S, mapper: M) -> Self {
        Self {
            mochi,
            sensors,
            mapper,
            motion: MotionConfig::default(),
            classifier: InputClassifier::new(0),
            arbiter: HoldArbiter::new(0, 0),
            input_timer: PeriodicTimer::paused(INPUT_INTERVAL_DEFAULT_MS),
            label: None,
            running: false,
            intensity_step: 0,
        }
    }

    pub fn mochi(&self) -> &Mochi<D, A> {
        &self.mochi
    }

    pub fn mochi_mut(&mut self) -> &mut Mochi<D, A> {
        &mut self.mochi
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn latest_input(&self) -> &InputState {
        self.classifier.latest()
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Set the input tick period, clamped to [50, 5000] ms. Returns the value applied.
    pub fn set_input_interval(&mut self, ms: u32) -> u32 {
        let ms = clamp_input_interval(ms);
        self.input_timer.set_period(ms);
        info!(target: "mochi_input", "Input interval {} ms ({:.1} Hz)", ms, 1000.0 / ms as f32);
        ms
    }

    pub fn input_interval(&self) -> u32 {
        self.input_timer.period_ms()
    }

    pub fn set_hold_ms(&mut self, hold_ms: u32) {
        self.arbiter.set_hold_ms(hold_ms);
    }

    pub fn set_motion_config(&mut self, motion: MotionConfig) {
        self.motion = motion;
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Bring the avatar up under `root` and start the input pipeline.
    pub fn run(&mut self, root: ObjectId, now_ms: u32) -> Result<()> {
        if self.running {
            warn!(target: "mochi", "MiBuddy already running");
            return Ok(());
        }

        let label = self.mochi.display_mut().create(root, ObjectKind::Label)?;
        self.mochi.display_mut().set_transform(
            label,
            &Transform { x: CENTER_X, y: LABEL_Y, ..Transform::default() },
        );
        self.label = Some(label);

        self.mochi.init()?;
        if let Err(e) = self.mochi.create(Some(root)) {
            self.mochi.display_mut().set_text(label, PLACEHOLDER_TEXT);
            return Err(e);
        }
        // label stays in front of the avatar
        if let Some(container) = self.mochi.container_object() {
            self.mochi.display_mut().move_to_back(container);
        }
        self.mochi.set(EmotionalState::Happy, Activity::Idle)?;

        self.classifier = InputClassifier::new(now_ms);
        self.arbiter.reset(EmotionalState::Happy, Activity::Idle, now_ms);
        self.input_timer.resume();
        self.running = true;
        self.update_label();

        info!(target: "mochi", "Input mapper started: interval={}ms", self.input_timer.period_ms());
        Ok(())
    }

    /// Back button: tear down, the shell closes the screen.
    pub fn back(&mut self) {
        self.close();
    }

    pub fn close(&mut self) {
        self.input_timer.pause();
        if let Some(label) = self.label.take() {
            self.mochi.display_mut().destroy(label);
        }
        if let Err(e) = self.mochi.stop_sound() {
            warn!(target: "mochi", "stop_sound: {}", e);
        }
        self.mochi.deinit();
        self.running = false;
        info!(target: "mochi", "MiBuddy closed");
    }

    pub fn pause(&mut self) {
        self.input_timer.pause();
        self.mochi.pause();
    }

    pub fn resume(&mut self) {
        self.mochi.resume();
        if self.running {
            self.input_timer.resume();
        }
        self.update_label();
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Drive animation, particles and, when due, the input pipeline.
    pub fn tick(&mut self, now_ms: u32) -> bool {
        let mut changed = self.mochi.tick(now_ms);
        if self.running && self.input_timer.poll(now_ms) {
            changed |= self.input_step(now_ms);
        }
        changed
    }

    /// One input tick: read, classify, map, arbitrate, apply. Returns
    /// `true` if the avatar changed.
    pub fn input_step(&mut self, now_ms: u32) -> bool {
        let readings = self.sensors.read();
        let input = self.classifier.sample(&readings, now_ms, &self.motion);
        let decision = self.mapper.map(&input);
        let (state, activity) = self.arbiter.arbitrate(decision.state, decision.activity, now_ms);

        // a cue belongs to its proposal; none if the arbiter kept the held pair
        let accepted = (state, activity) == (decision.state, decision.activity);
        if let (Some(cue), true) = (decision.cue, accepted) {
            if let Err(e) = self.mochi.play_sound(cue.file(), false) {
                warn!(target: "mochi_input", "Cue {} failed: {}", cue.file(), e);
            }
        }

        if (state, activity) == (self.mochi.get_state(), self.mochi.get_activity()) {
            return false;
        }
        if let Err(e) = self.mochi.set(state, activity) {
            warn!(target: "mochi_input", "set({}, {}) failed: {}", state, activity, e);
            return false;
        }
        self.classifier.mark_state_change(now_ms);
        self.update_label();
        true
    }

    pub fn handle_button(&mut self, event: ButtonEvent) -> Result<()> {
        match event {
            ButtonEvent::SingleClick => {
                let theme = self.mochi.next_theme()?;
                info!(target: "mochi", "Theme -> {}", theme);
            }
            ButtonEvent::DoubleClick => {
                let level = INTENSITY_STEPS[self.intensity_step % INTENSITY_STEPS.len()];
                self.intensity_step = (self.intensity_step + 1) % INTENSITY_STEPS.len();
                self.mochi.set_intensity(level)?;
            }
            ButtonEvent::LongPress => {
                if self.mochi.is_paused() {
                    self.resume();
                } else {
                    self.pause();
                }
            }
        }
        Ok(())
    }

    pub fn label_text(&self) -> String {
        state_label(self.mochi.get_state(), self.mochi.get_activity())
    }

    fn update_label(&mut self) {
        if let Some(label) = self.label {
            let text = self.label_text();
            self.mochi.display_mut().set_text(label, &text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Decision, DefaultMapper, SensorReadings};
    use crate::mochi::types::Theme;
    use crate::platform::AudioJournal;
    use crate::scene::Scene;

    type TestApp = MiBuddyApp<Scene, AudioJournal, fn() -> SensorReadings, DefaultMapper>;

    fn app() -> TestApp {
        let mochi = Mochi::new(Scene::default(), AudioJournal::new());
        let sensors: fn() -> SensorReadings = SensorReadings::resting;
        MiBuddyApp::new(mochi, sensors, DefaultMapper::default())
    }

    #[test]
    fn interval_is_clamped() {
        let mut a = app();
        assert_eq!(a.input_interval(), INPUT_INTERVAL_DEFAULT_MS);
        assert_eq!(a.set_input_interval(10), 50);
        assert_eq!(a.set_input_interval(60_000), 5000);
        assert_eq!(a.set_input_interval(100), 100);
        assert_eq!(a.input_interval(), 100);
    }

    #[test]
    fn run_shows_label_and_starts_happy() {
        let mut a = app();
        let root = a.mochi().display().root();
        a.run(root, 0).unwrap();
        assert!(a.is_running());
        assert_eq!(a.label_text(), "Happy + Idle");

        let label = a.mochi().display().objects().find(|o| o.kind == ObjectKind::Label).unwrap();
        assert_eq!(label.text, "Happy + Idle");
    }

    #[test]
    fn input_ticks_follow_the_interval() {
        let mut a = app();
        let root = a.mochi().display().root();
        a.run(root, 0).unwrap();
        // resting face-up input maps to the fallback, so nothing changes
        for now in (0..=1000).step_by(25) {
            a.tick(now);
        }
        assert_eq!(a.latest_input().current_state_duration_ms, 1000);
        assert!(a.latest_input().is_face_up);
    }

    #[test]
    fn buttons_cycle_theme_intensity_and_pause() {
        let mut a = app();
        let root = a.mochi().display().root();
        a.run(root, 0).unwrap();

        a.handle_button(ButtonEvent::SingleClick).unwrap();
        assert_eq!(a.mochi().get_theme(), Theme::Sakura.next());

        a.handle_button(ButtonEvent::DoubleClick).unwrap();
        assert_eq!(a.mochi().get_intensity(), INTENSITY_STEPS[0]);
        a.handle_button(ButtonEvent::DoubleClick).unwrap();
        assert_eq!(a.mochi().get_intensity(), INTENSITY_STEPS[1]);

        a.handle_button(ButtonEvent::LongPress).unwrap();
        assert!(a.mochi().is_paused());
        a.handle_button(ButtonEvent::LongPress).unwrap();
        assert!(!a.mochi().is_paused());
    }

    #[test]
    fn close_removes_everything() {
        let mut a = app();
        let root = a.mochi().display().root();
        a.run(root, 0).unwrap();
        a.close();
        assert!(!a.is_running());
        assert_eq!(a.mochi().display().object_count(), 0);
        assert_eq!(a.mochi().audio().commands().last(), Some(&crate::platform::AudioCommand::Stop));
    }

    #[test]
    fn custom_mapper_drives_the_avatar() {
        let mochi = Mochi::new(Scene::default(), AudioJournal::new());
        let mapper = |_: &InputState| Decision::new(EmotionalState::Dizzy, Activity::Spin);
        let mut a = MiBuddyApp::new(mochi, SensorReadings::resting, mapper);
        let root = a.mochi().display().root();
        a.run(root, 0).unwrap();
        assert!(a.input_step(200));
        assert_eq!(a.label_text(), "Dizzy + Spin");
        assert!(!a.input_step(400));
    }

    #[test]
    fn cue_only_plays_with_its_accepted_pair() {
        use crate::input::SoundCue;
        use std::cell::Cell;
        use std::rc::Rc;

        let proposal = Rc::new(Cell::new(Decision::new(EmotionalState::Panic, Activity::Vibrate)));
        let source = Rc::clone(&proposal);
        let mapper = move |_: &InputState| source.get();

        let mochi = Mochi::new(Scene::default(), AudioJournal::new());
        let mut a = MiBuddyApp::new(mochi, SensorReadings::resting, mapper);
        let root = a.mochi().display().root();
        a.run(root, 0).unwrap();
        a.set_hold_ms(1000);
        assert!(a.input_step(100));

        // Panic is held: the slide and its cue are dropped together
        proposal.set(Decision::new(EmotionalState::Excited, Activity::SlideLeft).with_cue(SoundCue::Weee));
        assert!(!a.input_step(300));
        assert_eq!(a.mochi().get_state(), EmotionalState::Panic);
        assert!(a.mochi().audio().commands().is_empty());

        assert!(a.input_step(1200));
        assert_eq!(
            a.mochi().audio().commands(),
            &[crate::platform::AudioCommand::PlayFile {
                url: "file://sdcard/Sounds/weee.mp3".into(),
                looping: false,
            }]
        );
    }
}
