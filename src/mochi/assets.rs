// MiBuddy — Asset Descriptors & Resolver
//
// A state can carry a background image, a sprite overlay and two sounds.
// Each asset is either absent, linked into the firmware, or a file on the SD
// card. The resolver turns a descriptor into a call on the display or audio
// primitive; paths are built into owned strings per call.

use log::{info, warn};

use crate::config::*;
use crate::error::{MochiError, Result};
use crate::platform::{AudioOutput, Display, EmbeddedImage, ImageSource, ObjectId, ObjectKind, Transform};

use super::types::{EmotionalState, FaceParams, MouthType, ParticleType};

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SoundAsset {
    #[default]
    None,
    Embedded {
        pcm: &'static [i16],
        sample_rate: u32,
        channels: u8,
    },
    /// File name under the sounds directory, or an absolute path.
    SdCard(String),
}

impl SoundAsset {
    pub fn embedded_mono(pcm: &'static [i16], sample_rate: u32) -> Self {
        Self::Embedded { pcm, sample_rate, channels: 1 }
    }

    pub fn sd(name: impl Into<String>) -> Self {
        Self::SdCard(name.into())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ImageAsset {
    #[default]
    None,
    Embedded(&'static EmbeddedImage),
    /// File name under the images directory, or an absolute path.
    SdCard(String),
}

impl ImageAsset {
    pub fn sd(name: impl Into<String>) -> Self {
        Self::SdCard(name.into())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteConfig {
    pub image: ImageAsset,
    /// Offset from the screen centre.
    pub offset_x: i32,
    pub offset_y: i32,
    /// 1 means a static image.
    pub frames: u8,
    pub frame_ms: u16,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            image: ImageAsset::None,
            offset_x: 0,
            offset_y: 0,
            frames: 1,
            frame_ms: 100,
        }
    }
}

/// Everything that defines how one emotional state looks and sounds.
#[derive(Debug, Clone, PartialEq)]
pub struct StateConfig {
    pub face: FaceParams,
    pub sprite: SpriteConfig,
    pub background: ImageAsset,
    pub enter_sound: SoundAsset,
    pub loop_sound: SoundAsset,
}

impl StateConfig {
    /// Built-in configuration for `state`: its face and no assets.
    pub fn default_for(state: EmotionalState) -> Self {
        Self {
            face: default_face(state),
            sprite: SpriteConfig::default(),
            background: ImageAsset::None,
            enter_sound: SoundAsset::None,
            loop_sound: SoundAsset::None,
        }
    }
}

/// Base face for every state.
pub fn default_face(state: EmotionalState) -> FaceParams {
    use EmotionalState::*;

    let base = FaceParams::default();
    match state {
        Happy => base,
        Excited => FaceParams {
            eye_scale: 0.8,
            eye_offset_y: 3.0,
            pupil_size: 0.7,
            eye_squish: 0.3,
            mouth_type: MouthType::OpenSmile,
            mouth_open: 0.7,
            face_squish: 0.05,
            face_offset_y: 5.0,
            particle_type: ParticleType::Burst,
            ..base
        },
        Worried => FaceParams {
            eye_scale: 1.2,
            eye_offset_y: -5.0,
            pupil_size: 1.3,
            eye_squish: -0.1,
            mouth_type: MouthType::SmallO,
            mouth_open: 0.5,
            face_squish: -0.03,
            face_offset_y: -5.0,
            show_blush: false,
            show_sparkle: false,
            particle_type: ParticleType::Sweat,
            ..base
        },
        Cool => FaceParams {
            eye_scale: 0.9,
            pupil_size: 0.9,
            eye_squish: 0.15,
            mouth_type: MouthType::Smirk,
            mouth_open: 0.2,
            show_blush: false,
            particle_type: ParticleType::Sparkle,
            ..base
        },
        Dizzy => FaceParams {
            pupil_size: 0.8,
            mouth_type: MouthType::Wavy,
            mouth_open: 0.4,
            show_blush: false,
            show_sparkle: false,
            particle_type: ParticleType::Spiral,
            ..base
        },
        Panic => FaceParams {
            eye_scale: 1.4,
            pupil_size: 0.4,
            eye_squish: -0.2,
            mouth_type: MouthType::Scream,
            mouth_open: 1.0,
            show_blush: false,
            show_sparkle: false,
            particle_type: ParticleType::Sweat,
            ..base
        },
        Sleepy => FaceParams {
            eye_scale: 0.15,
            eye_offset_y: 8.0,
            pupil_size: 0.5,
            eye_squish: 0.8,
            mouth_open: 0.2,
            face_offset_y: 3.0,
            face_rotation: -3.0,
            show_sparkle: false,
            particle_type: ParticleType::Zzz,
            ..base
        },
        Shocked => FaceParams {
            eye_scale: 1.3,
            pupil_size: 0.3,
            eye_squish: -0.2,
            mouth_type: MouthType::SmallO,
            mouth_open: 0.8,
            show_blush: false,
            show_sparkle: false,
            particle_type: ParticleType::None,
            ..base
        },
    }
}

// ---------------------------------------------------------------------------
// Per-state table
// ---------------------------------------------------------------------------

/// Exactly one [`StateConfig`] per emotional state, always populated.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTable {
    configs: [StateConfig; 8],
}

impl Default for StateTable {
    fn default() -> Self {
        Self {
            configs: EmotionalState::ALL.map(StateConfig::default_for),
        }
    }
}

impl StateTable {
    fn index(state: EmotionalState) -> usize {
        EmotionalState::ALL
            .iter()
            .position(|s| *s == state)
            .unwrap_or(0)
    }

    pub fn get(&self, state: EmotionalState) -> &StateConfig {
        &self.configs[Self::index(state)]
    }

    pub fn get_mut(&mut self, state: EmotionalState) -> &mut StateConfig {
        &mut self.configs[Self::index(state)]
    }

    /// Replace a state's config, or restore its built-in one with `None`.
    pub fn configure(&mut self, state: EmotionalState, config: Option<StateConfig>) {
        self.configs[Self::index(state)] = config.unwrap_or_else(|| StateConfig::default_for(state));
    }
}

/// Hook that fills the table before the avatar is first rendered.
pub trait AssetSetup {
    fn setup(&mut self, table: &mut StateTable);
}

impl<F: FnMut(&mut StateTable)> AssetSetup for F {
    fn setup(&mut self, table: &mut StateTable) {
        self(table)
    }
}

// ---------------------------------------------------------------------------
// Embedded sounds
// ---------------------------------------------------------------------------
pub const BEEP_8K_LEN: usize = 800;
pub const BEEP_8K_RATE: u32 = 8000;

const fn beep_wave() -> [i16; BEEP_8K_LEN] {
    // 440 Hz triangle in 16.16 phase steps with a short linear fade at both ends.
    const STEP: u32 = (440u32 << 16) / BEEP_8K_RATE;
    const FADE: usize = 80;
    let mut out = [0i16; BEEP_8K_LEN];
    let mut phase: u32 = 0;
    let mut i = 0;
    while i < BEEP_8K_LEN {
        let p = (phase & 0xFFFF) as i32;
        let tri = if p < 0x8000 { p - 0x4000 } else { 0xC000 - p };
        let mut sample = tri / 2;
        if i < FADE {
            sample = sample * i as i32 / FADE as i32;
        } else if i >= BEEP_8K_LEN - FADE {
            sample = sample * (BEEP_8K_LEN - i) as i32 / FADE as i32;
        }
        out[i] = sample as i16;
        phase = phase.wrapping_add(STEP);
        i += 1;
    }
    out
}

/// 100 ms 440 Hz beep, 8 kHz mono.
pub static BEEP_8K_MONO: [i16; BEEP_8K_LEN] = beep_wave();

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Playback URL for an SD sound: absolute paths are kept, bare names are
/// joined to the sounds directory.
pub fn sound_url(name: &str) -> String {
    if name.starts_with('/') {
        format!("{AUDIO_URL_PREFIX}{name}")
    } else {
        format!("{AUDIO_URL_PREFIX}{SD_SOUNDS_PATH}{name}")
    }
}

/// Display-filesystem path for an SD image.
pub fn image_path(name: &str) -> String {
    if name.starts_with('/') {
        format!("{DISPLAY_FS_PREFIX}{name}")
    } else {
        format!("{DISPLAY_FS_PREFIX}{SD_IMAGES_PATH}{name}")
    }
}

pub fn play_sound<A: AudioOutput + ?Sized>(audio: &mut A, sound: &SoundAsset, looping: bool) -> Result<()> {
    match sound {
        SoundAsset::None => Ok(()),
        SoundAsset::Embedded { pcm, sample_rate, channels } => {
            if pcm.is_empty() {
                warn!(target: "mochi_asset", "Embedded sound has no samples");
                return Err(MochiError::invalid_arg("embedded sound has no samples"));
            }
            audio.play_pcm(pcm, *sample_rate, *channels, looping)
        }
        SoundAsset::SdCard(name) => {
            if name.is_empty() {
                return Err(MochiError::invalid_arg("empty SD sound path"));
            }
            let url = sound_url(name);
            info!(target: "mochi_asset", "Playing {}", url);
            audio.play_file(&url, looping)
        }
    }
}

pub fn image_source(image: &ImageAsset) -> Option<ImageSource> {
    match image {
        ImageAsset::None => None,
        ImageAsset::Embedded(img) => Some(ImageSource::Embedded(*img)),
        ImageAsset::SdCard(name) if name.is_empty() => None,
        ImageAsset::SdCard(name) => Some(ImageSource::Path(image_path(name))),
    }
}

/// Create an image object for `image`. Returns `Ok(None)` for an absent asset.
pub fn create_image<D: Display + ?Sized>(
    display: &mut D,
    parent: ObjectId,
    kind: ObjectKind,
    image: &ImageAsset,
) -> Result<Option<ObjectId>> {
    let Some(source) = image_source(image) else {
        return Ok(None);
    };
    let obj = display.create(parent, kind)?;
    if let Err(e) = display.bind_image(obj, source) {
        display.destroy(obj);
        return Err(e);
    }
    Ok(Some(obj))
}

/// Rebind an existing image object; an absent asset hides it.
pub fn update_image<D: Display + ?Sized>(display: &mut D, obj: ObjectId, image: &ImageAsset) -> Result<()> {
    match image_source(image) {
        None => {
            display.set_visible(obj, false);
            Ok(())
        }
        Some(source) => {
            display.bind_image(obj, source)?;
            display.set_visible(obj, true);
            Ok(())
        }
    }
}

/// Centre an image object on screen, shifted by an offset.
pub fn place_centered<D: Display + ?Sized>(display: &mut D, obj: ObjectId, dx: i32, dy: i32) {
    display.set_transform(
        obj,
        &Transform {
            x: CENTER_X + dx,
            y: CENTER_Y + dy,
            ..Transform::default()
        },
    );
}

fn describe_sound(sound: &SoundAsset) -> String {
    match sound {
        SoundAsset::None => "none".into(),
        SoundAsset::Embedded { pcm, sample_rate, channels } => {
            format!("embedded {} samples @ {} Hz x{}", pcm.len(), sample_rate, channels)
        }
        SoundAsset::SdCard(name) => format!("sd '{}'", name),
    }
}

fn describe_image(image: &ImageAsset) -> String {
    match image {
        ImageAsset::None => "none".into(),
        ImageAsset::Embedded(img) => format!("embedded '{}' {}x{}", img.name, img.width, img.height),
        ImageAsset::SdCard(name) => format!("sd '{}'", name),
    }
}

/// Dump the full asset configuration of a state.
pub fn log_config(state: EmotionalState, cfg: &StateConfig) {
    info!(target: "mochi_asset", "=== {} asset config ===", state);
    info!(target: "mochi_asset", "  Background: {}", describe_image(&cfg.background));
    info!(
        target: "mochi_asset",
        "  Sprite: {} at ({}, {}) frames={} frame_ms={}",
        describe_image(&cfg.sprite.image),
        cfg.sprite.offset_x,
        cfg.sprite.offset_y,
        cfg.sprite.frames,
        cfg.sprite.frame_ms
    );
    info!(target: "mochi_asset", "  Enter sound: {}", describe_sound(&cfg.enter_sound));
    info!(target: "mochi_asset", "  Loop sound: {}", describe_sound(&cfg.loop_sound));
}
