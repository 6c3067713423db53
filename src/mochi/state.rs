// MiBuddy — Mochi State Machine
//
// Owns the avatar's runtime state and fans every transition out to the
// animation engine, the particle engine and the asset resolver. One instance
// lives on the UI thread; every method runs to completion within a tick.

use log::{info, warn};

use crate::config::*;
use crate::error::{MochiError, Result};
use crate::platform::{AudioOutput, Display, ObjectId, ObjectKind, Transform};

use super::anim::AnimEngine;
use super::assets::{self, AssetSetup, SoundAsset, StateConfig, StateTable};
use super::particles::ParticleEngine;
use super::types::{Activity, EmotionalState, FaceParams, Theme};

/// Display objects owned by the avatar once created.
#[derive(Debug, Clone, Copy)]
struct Objects {
    container: ObjectId,
    face: ObjectId,
    sprite: Option<ObjectId>,
    background: Option<ObjectId>,
}

pub fn clamp_intensity(x: f32) -> f32 {
    if x.is_nan() {
        return INTENSITY_MIN;
    }
    x.clamp(INTENSITY_MIN, INTENSITY_MAX)
}

pub struct Mochi<D: Display, A: AudioOutput> {
    display: D,
    audio: A,
    setup: Option<Box<dyn AssetSetup>>,

    initialized: bool,
    objects: Option<Objects>,
    table: StateTable,

    state: EmotionalState,
    activity: Activity,
    theme: Theme,
    intensity: f32,
    paused: bool,
    /// A state change arrived while paused; its assets are applied on resume.
    assets_dirty: bool,

    /// Intensity-scaled base of the current state.
    base: FaceParams,
    /// Per-frame output of the animation engine.
    derived: FaceParams,

    anim: AnimEngine,
    particles: ParticleEngine,
    last_tick_ms: u32,
}

impl<D: Display, A: AudioOutput> Mochi<D, A> {
    pub fn new(display: D, audio: A) -> Self {
        Self {
            display,
            audio,
            setup: None,
            initialized: false,
            objects: None,
            table: StateTable::default(),
            state: EmotionalState::Happy,
            activity: Activity::Idle,
            theme: Theme::Sakura,
            intensity: INTENSITY_DEFAULT,
            paused: false,
            assets_dirty: false,
            base: FaceParams::default(),
            derived: FaceParams::default(),
            anim: AnimEngine::new(ANIM_PERIOD_MS),
            particles: ParticleEngine::new(PARTICLE_PERIOD_MS),
            last_tick_ms: 0,
        }
    }

    /// Hook run by [`init`](Self::init) to populate per-state assets.
    pub fn register_asset_setup(&mut self, hook: impl AssetSetup + 'static) {
        self.setup = Some(Box::new(hook));
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            warn!(target: "mochi", "Already initialized");
            return Ok(());
        }
        self.table = StateTable::default();
        self.state = EmotionalState::Happy;
        self.activity = Activity::Idle;
        self.theme = Theme::Sakura;
        self.intensity = INTENSITY_DEFAULT;
        self.paused = false;
        self.assets_dirty = false;

        if let Some(hook) = self.setup.as_mut() {
            hook.setup(&mut self.table);
        }
        self.initialized = true;
        info!(target: "mochi", "Initialized");
        Ok(())
    }

    /// Build the avatar's display objects under `root` and draw the first frame.
    pub fn create(&mut self, root: Option<ObjectId>) -> Result<()> {
        if !self.initialized {
            return Err(MochiError::InvalidState("create() before init()"));
        }
        if self.objects.is_some() {
            warn!(target: "mochi", "Already created");
            return Ok(());
        }
        let root = root.ok_or_else(|| MochiError::invalid_arg("display root is required"))?;
        if !self.display.exists(root) {
            return Err(MochiError::invalid_arg(format!("display root {:?} does not exist", root)));
        }

        let container = self.display.create(root, ObjectKind::Container)?;
        let face = match self.display.create(container, ObjectKind::Face) {
            Ok(face) => face,
            Err(e) => {
                self.display.destroy(container);
                return Err(e);
            }
        };
        self.display.set_transform(
            face,
            &Transform { x: CENTER_X, y: CENTER_Y, ..Transform::default() },
        );
        self.objects = Some(Objects { container, face, sprite: None, background: None });
        info!(target: "mochi", "Created under {:?}", root);

        self.render(true);
        if self.paused {
            self.display.set_visible(container, false);
        }
        Ok(())
    }

    pub fn deinit(&mut self) {
        if let Some(objs) = self.objects.take() {
            self.particles.clear(&mut self.display);
            self.display.destroy(objs.container);
        }
        self.anim = AnimEngine::new(ANIM_PERIOD_MS);
        self.particles = ParticleEngine::new(PARTICLE_PERIOD_MS);
        self.initialized = false;
        info!(target: "mochi", "Deinitialized");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_created(&self) -> bool {
        self.objects.is_some()
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    pub fn set(&mut self, state: EmotionalState, activity: Activity) -> Result<()> {
        if !self.initialized {
            return Err(MochiError::InvalidState("set() before init()"));
        }
        info!(target: "mochi_api", "set({}, {})", state, activity);
        self.state = state;
        self.activity = activity;
        if self.paused {
            self.assets_dirty = true;
        }
        self.render(true);
        Ok(())
    }

    /// [`set`](Self::set) from raw catalogue indices.
    pub fn set_raw(&mut self, state: u8, activity: u8) -> Result<()> {
        let state = EmotionalState::try_from(state)?;
        let activity = Activity::try_from(activity)?;
        self.set(state, activity)
    }

    pub fn set_state(&mut self, state: EmotionalState) -> Result<()> {
        self.set(state, self.activity)
    }

    pub fn set_activity(&mut self, activity: Activity) -> Result<()> {
        self.set(self.state, activity)
    }

    pub fn get_state(&self) -> EmotionalState {
        self.state
    }

    pub fn get_activity(&self) -> Activity {
        self.activity
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        if !self.initialized {
            return Err(MochiError::InvalidState("set_theme() before init()"));
        }
        info!(target: "mochi_api", "set_theme({})", theme);
        self.theme = theme;
        self.render(false);
        Ok(())
    }

    pub fn next_theme(&mut self) -> Result<Theme> {
        let next = self.theme.next();
        self.set_theme(next)?;
        Ok(next)
    }

    pub fn get_theme(&self) -> Theme {
        self.theme
    }

    /// Clamp to [0.2, 1.0] and re-render.
    pub fn set_intensity(&mut self, intensity: f32) -> Result<()> {
        if !self.initialized {
            return Err(MochiError::InvalidState("set_intensity() before init()"));
        }
        self.intensity = clamp_intensity(intensity);
        info!(target: "mochi_api", "set_intensity({:.2})", self.intensity);
        self.anim.set_intensity(self.intensity);
        self.render(false);
        Ok(())
    }

    pub fn get_intensity(&self) -> f32 {
        self.intensity
    }

    // -----------------------------------------------------------------------
    // Pause / resume
    // -----------------------------------------------------------------------

    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.anim.pause();
        self.particles.pause();
        if let Some(objs) = self.objects {
            self.display.set_visible(objs.container, false);
        }
        info!(target: "mochi", "Paused");
    }

    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        self.particles.resume();
        if let Some(objs) = self.objects {
            self.display.set_visible(objs.container, true);
        }
        self.render(false);
        if core::mem::take(&mut self.assets_dirty) {
            if let Some(objs) = self.objects {
                self.apply_assets(objs, false);
            }
        }
        info!(target: "mochi", "Resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // -----------------------------------------------------------------------
    // Configuration & sound
    // -----------------------------------------------------------------------

    /// Replace a state's configuration; `None` restores the built-in one.
    /// Applies from the next transition into that state.
    pub fn configure_state(&mut self, state: EmotionalState, config: Option<StateConfig>) {
        info!(
            target: "mochi_api",
            "configure_state({}, {})",
            state,
            if config.is_some() { "custom" } else { "default" }
        );
        self.table.configure(state, config);
    }

    pub fn state_config(&self, state: EmotionalState) -> &StateConfig {
        self.table.get(state)
    }

    /// Play an SD sound by name or absolute path.
    pub fn play_sound(&mut self, path: &str, looping: bool) -> Result<()> {
        assets::play_sound(&mut self.audio, &SoundAsset::sd(path), looping)
    }

    pub fn stop_sound(&mut self) -> Result<()> {
        self.audio.stop()
    }

    // -----------------------------------------------------------------------
    // Frame loop
    // -----------------------------------------------------------------------

    /// Run the animation and particle timers. Returns `true` if anything moved.
    pub fn tick(&mut self, now_ms: u32) -> bool {
        self.last_tick_ms = now_ms;
        let Some(objs) = self.objects else {
            return false;
        };
        if self.paused {
            return false;
        }

        let mut changed = false;
        if self.anim.poll(now_ms, &self.base, &mut self.derived) {
            self.display.draw_face(objs.face, &self.derived, self.theme.palette());
            changed = true;
        }
        changed |= self.particles.poll(&mut self.display, now_ms);
        changed
    }

    pub fn derived(&self) -> &FaceParams {
        &self.derived
    }

    pub fn anim(&self) -> &AnimEngine {
        &self.anim
    }

    pub fn particles(&self) -> &ParticleEngine {
        &self.particles
    }

    pub fn face_object(&self) -> Option<ObjectId> {
        self.objects.map(|o| o.face)
    }

    pub fn container_object(&self) -> Option<ObjectId> {
        self.objects.map(|o| o.container)
    }

    pub fn sprite_object(&self) -> Option<ObjectId> {
        self.objects.and_then(|o| o.sprite)
    }

    pub fn background_object(&self) -> Option<ObjectId> {
        self.objects.and_then(|o| o.background)
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Recompute the face for the current state and push it everywhere.
    /// `enter` also applies the state's assets and plays its enter sound.
    fn render(&mut self, enter: bool) {
        let Some(objs) = self.objects else {
            return;
        };
        if self.paused {
            return;
        }

        let palette = self.theme.palette();
        self.base = self.table.get(self.state).face.scaled(self.state, self.intensity);
        self.derived = self.base;

        self.display.set_background_color(palette.bg);
        self.display.draw_face(objs.face, &self.derived, palette);
        if let Err(e) = self
            .particles
            .set_type(&mut self.display, objs.container, self.base.particle_type, self.theme)
        {
            warn!(target: "mochi", "Particles unavailable: {}", e);
        }
        self.anim.start(self.state, self.activity, self.intensity, self.last_tick_ms);

        if enter {
            self.apply_assets(objs, true);
        }
    }

    /// Sprite, background and, with `enter_sound`, the state's enter sound.
    fn apply_assets(&mut self, mut objs: Objects, enter_sound: bool) {
        let cfg = self.table.get(self.state);
        assets::log_config(self.state, cfg);

        if enter_sound {
            if let Err(e) = assets::play_sound(&mut self.audio, &cfg.enter_sound, false) {
                warn!(target: "mochi_asset", "Enter sound failed: {}", e);
            }
        }
        if !cfg.loop_sound.is_none() {
            info!(target: "mochi_asset", "Loop sound configured for {} (not started)", self.state);
        }

        // sprite overlay, on top of the face
        let sprite = &cfg.sprite;
        match objs.sprite {
            None => match assets::create_image(&mut self.display, objs.container, ObjectKind::Sprite, &sprite.image) {
                Ok(Some(obj)) => {
                    assets::place_centered(&mut self.display, obj, sprite.offset_x, sprite.offset_y);
                    objs.sprite = Some(obj);
                }
                Ok(None) => {}
                Err(e) => warn!(target: "mochi_asset", "Sprite unavailable: {}", e),
            },
            Some(obj) => {
                if let Err(e) = assets::update_image(&mut self.display, obj, &sprite.image) {
                    warn!(target: "mochi_asset", "Sprite update failed: {}", e);
                }
                assets::place_centered(&mut self.display, obj, sprite.offset_x, sprite.offset_y);
            }
        }

        // background, behind everything
        match objs.background {
            None => match assets::create_image(&mut self.display, objs.container, ObjectKind::Background, &cfg.background) {
                Ok(Some(obj)) => {
                    self.display.move_to_back(obj);
                    assets::place_centered(&mut self.display, obj, 0, 0);
                    objs.background = Some(obj);
                }
                Ok(None) => {}
                Err(e) => warn!(target: "mochi_asset", "Background unavailable: {}", e),
            },
            Some(obj) => {
                if let Err(e) = assets::update_image(&mut self.display, obj, &cfg.background) {
                    warn!(target: "mochi_asset", "Background update failed: {}", e);
                }
            }
        }

        self.objects = Some(objs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::AudioJournal;
    use crate::scene::{Scene, ROOT};

    fn created() -> Mochi<Scene, AudioJournal> {
        let mut m = Mochi::new(Scene::default(), AudioJournal::new());
        m.init().unwrap();
        m.create(Some(ROOT)).unwrap();
        m
    }

    #[test]
    fn create_requires_init_and_root() {
        let mut m = Mochi::new(Scene::default(), AudioJournal::new());
        assert_eq!(m.create(Some(ROOT)), Err(MochiError::InvalidState("create() before init()")));
        m.init().unwrap();
        assert!(matches!(m.create(None), Err(MochiError::InvalidArgument(_))));
        m.create(Some(ROOT)).unwrap();
        let count = m.display().object_count();
        m.create(Some(ROOT)).unwrap();
        assert_eq!(m.display().object_count(), count);
    }

    #[test]
    fn init_sets_defaults_and_is_idempotent() {
        let mut m = Mochi::new(Scene::default(), AudioJournal::new());
        m.init().unwrap();
        m.set_theme(Theme::Cloud).unwrap();
        m.init().unwrap();
        assert_eq!(m.get_theme(), Theme::Cloud);
        assert_eq!(m.get_state(), EmotionalState::Happy);
        assert_eq!(m.get_activity(), Activity::Idle);
        assert_eq!(m.get_intensity(), INTENSITY_DEFAULT);
    }

    #[test]
    fn set_before_init_is_invalid_state() {
        let mut m = Mochi::new(Scene::default(), AudioJournal::new());
        assert!(matches!(
            m.set(EmotionalState::Cool, Activity::Nod),
            Err(MochiError::InvalidState(_))
        ));
    }

    #[test]
    fn raw_indices_are_validated() {
        let mut m = created();
        assert!(matches!(m.set_raw(8, 0), Err(MochiError::InvalidArgument(_))));
        assert!(matches!(m.set_raw(0, 13), Err(MochiError::InvalidArgument(_))));
        m.set_raw(6, 7).unwrap();
        assert_eq!((m.get_state(), m.get_activity()), (EmotionalState::Sleepy, Activity::Snore));
    }

    #[test]
    fn set_before_create_only_stores() {
        let mut m = Mochi::new(Scene::default(), AudioJournal::new());
        m.init().unwrap();
        m.set(EmotionalState::Dizzy, Activity::Spin).unwrap();
        assert_eq!(m.display().object_count(), 0);
        m.create(Some(ROOT)).unwrap();
        assert_eq!(m.particles().objects().len(), 3);
    }

    #[test]
    fn intensity_scales_base_before_animation() {
        let mut m = created();
        m.set_intensity(0.5).unwrap();
        m.set(EmotionalState::Excited, Activity::Idle).unwrap();
        assert_eq!(m.derived().face_offset_y, 2.5);
        assert_eq!(m.derived().eye_squish, 0.15);

        m.set(EmotionalState::Sleepy, Activity::Idle).unwrap();
        assert_eq!(m.derived().eye_squish, 0.8);
    }

    #[test]
    fn tick_animates_only_when_running() {
        let mut m = created();
        m.set(EmotionalState::Happy, Activity::Shake).unwrap();
        m.tick(0);
        assert!(m.tick(25));
        m.pause();
        assert!(!m.tick(50));
        assert!(!m.anim().is_running());
        assert!(!m.particles().is_running());
        m.resume();
        assert!(m.anim().is_running());
        assert!(m.particles().is_running());
    }

    #[test]
    fn pause_hides_container() {
        let mut m = created();
        let face = m.face_object().unwrap();
        m.pause();
        m.pause();
        assert!(!m.display().is_shown(face));
        m.resume();
        m.resume();
        assert!(m.display().is_shown(face));
    }

    #[test]
    fn create_again_ignores_missing_root() {
        let mut m = created();
        let count = m.display().object_count();
        m.create(None).unwrap();
        assert_eq!(m.display().object_count(), count);
    }

    #[test]
    fn assets_of_a_paused_transition_apply_on_resume() {
        let mut m = created();
        let mut cfg = crate::mochi::StateConfig::default_for(EmotionalState::Excited);
        cfg.background = crate::mochi::ImageAsset::sd("party.png");
        cfg.enter_sound = crate::mochi::SoundAsset::sd("yay.mp3");
        m.configure_state(EmotionalState::Excited, Some(cfg));

        m.pause();
        m.set(EmotionalState::Excited, Activity::Bounce).unwrap();
        assert!(m.background_object().is_none());

        m.resume();
        let bg = m.background_object().unwrap();
        assert_eq!(
            m.display().get(bg).unwrap().image,
            Some(crate::platform::ImageSource::Path("S:/sdcard/Images/party.png".into()))
        );
        assert!(m.display().is_shown(bg));
        // no enter sound on resume
        assert!(m.audio().commands().is_empty());

        // a plain pause/resume leaves assets alone
        m.pause();
        m.resume();
        assert_eq!(m.background_object(), Some(bg));
    }

    #[test]
    fn deinit_releases_objects() {
        let mut m = created();
        m.deinit();
        assert_eq!(m.display().object_count(), 0);
        assert!(!m.is_initialized());
        m.init().unwrap();
        m.create(Some(ROOT)).unwrap();
        assert!(m.is_created());
    }

    #[test]
    fn play_sound_uses_sd_directory() {
        let mut m = created();
        m.play_sound("weee.mp3", false).unwrap();
        m.stop_sound().unwrap();
        assert_eq!(
            m.audio().commands(),
            &[
                crate::platform::AudioCommand::PlayFile { url: "file://sdcard/Sounds/weee.mp3".into(), looping: false },
                crate::platform::AudioCommand::Stop,
            ]
        );
    }
}
