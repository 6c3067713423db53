//! Whole-pipeline scenarios: scripted sensor readings go through the
//! classifier, the default mapper, the arbiter and into the avatar.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use mibuddy::error::Result;
use mibuddy::input::{remote, Decision, DefaultMapper, InputState, RemoteTransport, SensorReadings};
use mibuddy::mochi::{Activity, EmotionalState, Mochi};
use mibuddy::platform::{AudioCommand, AudioJournal};
use mibuddy::scene::{Scene, ROOT};
use mibuddy::MiBuddyApp;

use Activity as A;
use EmotionalState as S;

type Sensors = Box<dyn FnMut() -> SensorReadings>;

struct Rig {
    app: MiBuddyApp<Scene, AudioJournal, Sensors, DefaultMapper>,
    feed: Rc<Cell<SensorReadings>>,
    now: u32,
}

impl Rig {
    fn new(mapper: DefaultMapper) -> Self {
        let feed = Rc::new(Cell::new(SensorReadings::resting()));
        let source = Rc::clone(&feed);
        let sensors: Sensors = Box::new(move || source.get());

        let mochi = Mochi::new(Scene::default(), AudioJournal::new());
        let mut app = MiBuddyApp::new(mochi, sensors, mapper);
        app.run(ROOT, 0).unwrap();
        Self { app, feed, now: 0 }
    }

    /// One input tick, 200 ms after the previous one.
    fn step(&mut self, readings: SensorReadings) -> (EmotionalState, Activity) {
        self.now += 200;
        self.feed.set(readings);
        self.app.input_step(self.now);
        (self.app.mochi().get_state(), self.app.mochi().get_activity())
    }

    fn cue_count(&self, file: &str) -> usize {
        self.app
            .mochi()
            .audio()
            .commands()
            .iter()
            .filter(|c| matches!(c, AudioCommand::PlayFile { url, .. } if url.ends_with(file)))
            .count()
    }
}

fn accel(x: f32, y: f32, z: f32) -> SensorReadings {
    SensorReadings { accel: [x, y, z], ..SensorReadings::resting() }
}

/// Board upright on its edge, rotated `deg` in the screen plane.
fn rolled(deg: f32) -> SensorReadings {
    let r = deg.to_radians();
    accel(r.sin(), r.cos(), 0.0)
}

#[test]
fn braking_cue_fires_once_per_episode() {
    let mut rig = Rig::new(DefaultMapper::default());

    assert_eq!(rig.step(accel(0.0, 0.0, 1.0)), (S::Happy, A::Idle));
    assert_eq!(rig.step(accel(0.0, 0.0, 2.0)), (S::Excited, A::Bounce));

    // 1 g lost in 200 ms
    assert_eq!(rig.step(accel(0.0, 0.0, 1.0)), (S::Shocked, A::Idle));
    assert_eq!(rig.cue_count("brake.mp3"), 1);

    // still decelerating: same state, no replay
    assert_eq!(rig.step(accel(0.0, 0.0, 0.2)), (S::Shocked, A::Idle));
    assert_eq!(rig.cue_count("brake.mp3"), 1);

    // steady again clears the edge
    assert_eq!(rig.step(accel(0.0, 0.0, 1.0)), (S::Happy, A::Idle));
    rig.step(accel(0.0, 0.0, 2.0));
    assert_eq!(rig.step(accel(0.0, 0.0, 1.0)), (S::Shocked, A::Idle));
    assert_eq!(rig.cue_count("brake.mp3"), 2);
    assert_eq!(rig.app.label_text(), "Shocked + Idle");
}

#[test]
fn tilt_zones_slide_and_weee_on_entry() {
    let mut rig = Rig::new(DefaultMapper::default());

    // 30° off the upright baseline: gentle slide
    assert_eq!(rig.step(rolled(60.0)), (S::Happy, A::SlideLeft));
    assert_eq!(rig.cue_count("weee.mp3"), 0);

    // 40° off: exciting slide, cue on entry only
    assert_eq!(rig.step(rolled(50.0)), (S::Excited, A::SlideLeft));
    assert_eq!(rig.cue_count("weee.mp3"), 1);
    assert_eq!(rig.step(rolled(50.0)), (S::Excited, A::SlideLeft));
    assert_eq!(rig.cue_count("weee.mp3"), 1);

    // back inside the dead zone, then out again
    assert_eq!(rig.step(rolled(70.0)), (S::Cool, A::Idle));
    assert_eq!(rig.step(rolled(50.0)), (S::Excited, A::SlideLeft));
    assert_eq!(rig.cue_count("weee.mp3"), 2);

    // the other way round
    assert_eq!(rig.step(rolled(120.0)), (S::Happy, A::SlideRight));
}

#[test]
fn lying_flat_never_tilts() {
    let mut rig = Rig::new(DefaultMapper::default());
    for _ in 0..5 {
        assert_eq!(rig.step(SensorReadings::resting()), (S::Happy, A::Idle));
    }
    assert_eq!(rig.cue_count(".mp3"), 0);
}

#[test]
fn urgent_conditions_win() {
    let mut rig = Rig::new(DefaultMapper::default());

    let spun = SensorReadings { gyro: [0.0, 0.0, 180.0], ..SensorReadings::resting() };
    assert_eq!(rig.step(spun), (S::Dizzy, A::Spin));

    let dying = SensorReadings { battery_pct: 3.0, ..SensorReadings::resting() };
    assert_eq!(rig.step(dying), (S::Worried, A::Idle));

    let late = SensorReadings { hour: 23, ..SensorReadings::resting() };
    assert_eq!(rig.step(late), (S::Sleepy, A::Snore));

    assert_eq!(rig.step(accel(0.0, 0.0, -1.0)), (S::Sleepy, A::Snore));
    assert_eq!(rig.step(accel(0.0, 1.0, 0.0)), (S::Shocked, A::Wiggle));

    // last: the drop back to 1 g afterwards would read as braking
    assert_eq!(rig.step(accel(2.5, -1.0, 1.0)), (S::Panic, A::Vibrate));
}

#[test]
fn hold_damps_lower_priority_proposals() {
    let proposal = Rc::new(Cell::new((S::Happy, A::Idle)));
    let source = Rc::clone(&proposal);
    let mapper = move |_: &InputState| {
        let (s, a) = source.get();
        Decision::new(s, a)
    };

    let mochi = Mochi::new(Scene::default(), AudioJournal::new());
    let mut app = MiBuddyApp::new(mochi, SensorReadings::resting, mapper);
    app.run(ROOT, 0).unwrap();
    app.set_hold_ms(1000);

    // Worried ranks above Happy: immediate
    proposal.set((S::Worried, A::Idle));
    assert!(app.input_step(200));
    assert_eq!(app.label_text(), "Worried + Idle");

    // Cool ranks below Worried: held until the hold runs out
    proposal.set((S::Cool, A::Nod));
    assert!(!app.input_step(400));
    assert!(!app.input_step(1100));
    assert_eq!(app.mochi().get_state(), S::Worried);
    assert!(app.input_step(1200));
    assert_eq!(app.label_text(), "Cool + Nod");

    proposal.set((S::Panic, A::Vibrate));
    assert!(app.input_step(1300));
}

#[test]
fn input_interval_drives_the_tick() {
    let mut rig = Rig::new(DefaultMapper::default());
    assert_eq!(rig.app.set_input_interval(100), 100);
    rig.feed.set(accel(0.0, 0.0, -1.0));

    // first poll arms the timer
    rig.app.tick(0);
    rig.app.tick(50);
    assert_eq!(rig.app.mochi().get_state(), S::Happy);
    rig.app.tick(100);
    assert_eq!(rig.app.mochi().get_state(), S::Sleepy);

    rig.app.pause();
    rig.feed.set(SensorReadings::resting());
    for now in (125..=1000).step_by(25) {
        rig.app.tick(now);
    }
    assert_eq!(rig.app.mochi().get_state(), S::Sleepy);
    assert!(rig.app.mochi().is_paused());
}

struct FixedService;

impl RemoteTransport for FixedService {
    fn post_json(&mut self, _url: &str, body: &str) -> Result<(u16, String)> {
        assert!(body.contains("\"wifi\":true"));
        Ok((200, r#"{"state":"cool","activity":"nod"}"#.to_string()))
    }
}

#[test]
fn remote_answer_is_used_on_the_next_tick() {
    let (mailbox, worker) = remote::mailbox();
    let mut rig = Rig::new(DefaultMapper::default().with_remote(mailbox.clone()));
    let online = SensorReadings { wifi_connected: true, ..SensorReadings::resting() };

    // nothing local applies: fall back and ask
    assert_eq!(rig.step(online), (S::Happy, A::Idle));
    assert!(mailbox.is_pending());

    assert!(worker.serve_one(&mut FixedService, "http://buddy.local/state", Duration::from_millis(10)));
    assert!(!mailbox.is_pending());

    assert_eq!(rig.step(online), (S::Cool, A::Nod));
}
