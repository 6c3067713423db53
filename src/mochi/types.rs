// MiBuddy — Avatar Data Model
//
// Emotional states, activities, themes and the face-shape record shared by
// the state machine, the animation engine and the renderer.

use core::fmt;
use core::str::FromStr;

use crate::error::MochiError;

// ---------------------------------------------------------------------------
// Emotional state
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EmotionalState {
    #[default]
    Happy,
    Excited,
    Worried,
    Cool,
    Dizzy,
    Panic,
    Sleepy,
    Shocked,
}

/// Preemption order, most urgent first.
pub const PRIORITY_ORDER: [EmotionalState; 8] = [
    EmotionalState::Panic,
    EmotionalState::Shocked,
    EmotionalState::Dizzy,
    EmotionalState::Worried,
    EmotionalState::Sleepy,
    EmotionalState::Excited,
    EmotionalState::Cool,
    EmotionalState::Happy,
];

/// Rank assigned to a state missing from [`PRIORITY_ORDER`].
pub const PRIORITY_UNLISTED: u8 = 99;

impl EmotionalState {
    pub const ALL: [EmotionalState; 8] = [
        Self::Happy,
        Self::Excited,
        Self::Worried,
        Self::Cool,
        Self::Dizzy,
        Self::Panic,
        Self::Sleepy,
        Self::Shocked,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Happy   => "Happy",
            Self::Excited => "Excited",
            Self::Worried => "Worried",
            Self::Cool    => "Cool",
            Self::Dizzy   => "Dizzy",
            Self::Panic   => "Panic",
            Self::Sleepy  => "Sleepy",
            Self::Shocked => "Shocked",
        }
    }

    /// Lower value wins. Panic is 0, Happy is 7.
    pub fn priority(&self) -> u8 {
        PRIORITY_ORDER
            .iter()
            .position(|s| s == self)
            .map(|p| p as u8)
            .unwrap_or(PRIORITY_UNLISTED)
    }

    /// `true` when `self` may preempt `held` before its hold time expires.
    pub fn outranks(&self, held: EmotionalState) -> bool {
        self.priority() < held.priority()
    }

    /// Eye squish of these states follows intensity; others keep it as shape.
    pub fn scales_eye_squish(&self) -> bool {
        matches!(self, Self::Excited | Self::Cool)
    }
}

impl TryFrom<u8> for EmotionalState {
    type Error = MochiError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or_else(|| MochiError::invalid_arg(format!("emotional state {raw} out of range")))
    }
}

impl FromStr for EmotionalState {
    type Err = MochiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|st| st.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MochiError::invalid_arg(format!("unknown emotional state '{s}'")))
    }
}

impl fmt::Display for EmotionalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Activity {
    #[default]
    Idle,
    Shake,
    Bounce,
    Spin,
    Wiggle,
    Nod,
    Blink,
    Snore,
    Vibrate,
    SlideLeft,
    SlideRight,
    SlideUp,
    SlideDown,
}

impl Activity {
    pub const ALL: [Activity; 13] = [
        Self::Idle,
        Self::Shake,
        Self::Bounce,
        Self::Spin,
        Self::Wiggle,
        Self::Nod,
        Self::Blink,
        Self::Snore,
        Self::Vibrate,
        Self::SlideLeft,
        Self::SlideRight,
        Self::SlideUp,
        Self::SlideDown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle       => "Idle",
            Self::Shake      => "Shake",
            Self::Bounce     => "Bounce",
            Self::Spin       => "Spin",
            Self::Wiggle     => "Wiggle",
            Self::Nod        => "Nod",
            Self::Blink      => "Blink",
            Self::Snore      => "Snore",
            Self::Vibrate    => "Vibrate",
            Self::SlideLeft  => "SlideLeft",
            Self::SlideRight => "SlideRight",
            Self::SlideUp    => "SlideUp",
            Self::SlideDown  => "SlideDown",
        }
    }

    pub fn is_slide(&self) -> bool {
        matches!(
            self,
            Self::SlideLeft | Self::SlideRight | Self::SlideUp | Self::SlideDown
        )
    }
}

impl TryFrom<u8> for Activity {
    type Error = MochiError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or_else(|| MochiError::invalid_arg(format!("activity {raw} out of range")))
    }
}

impl FromStr for Activity {
    type Err = MochiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|a| {
                a.name().eq_ignore_ascii_case(wanted)
                    || a.name().replace("Slide", "slide_").eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| MochiError::invalid_arg(format!("unknown activity '{s}'")))
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Sakura,
    Mint,
    Lavender,
    Peach,
    Cloud,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Self::Sakura,
        Self::Mint,
        Self::Lavender,
        Self::Peach,
        Self::Cloud,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sakura   => "Sakura",
            Self::Mint     => "Mint",
            Self::Lavender => "Lavender",
            Self::Peach    => "Peach",
            Self::Cloud    => "Cloud",
        }
    }

    /// Next theme in catalogue order, wrapping after Cloud.
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|t| t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl TryFrom<u8> for Theme {
    type Error = MochiError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or_else(|| MochiError::invalid_arg(format!("theme {raw} out of range")))
    }
}

impl FromStr for Theme {
    type Err = MochiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MochiError::invalid_arg(format!("unknown theme '{s}'")))
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Face shape
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouthType {
    #[default]
    Smile,
    OpenSmile,
    SmallO,
    Smirk,
    Flat,
    Wavy,
    Scream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParticleType {
    #[default]
    None,
    Float,
    Burst,
    Sweat,
    Sparkle,
    Spiral,
    Zzz,
}

impl ParticleType {
    /// Size of the object pool a type keeps alive.
    pub fn pool_size(&self) -> usize {
        match self {
            Self::None    => 0,
            Self::Float   => 5,
            Self::Burst   => 8,
            Self::Sweat   => 2,
            Self::Sparkle => 4,
            Self::Spiral  => 3,
            Self::Zzz     => 3,
        }
    }
}

/// Numeric face descriptor. A state's base copy is never mutated by the
/// animation engine; it writes into a separate derived buffer each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceParams {
    pub eye_scale: f32,
    pub eye_offset_x: f32,
    pub eye_offset_y: f32,
    pub pupil_size: f32,
    pub eye_squish: f32,
    pub mouth_type: MouthType,
    pub mouth_open: f32,
    pub face_squish: f32,
    pub face_offset_x: f32,
    pub face_offset_y: f32,
    pub face_rotation: f32,
    pub show_blush: bool,
    pub show_sparkle: bool,
    pub particle_type: ParticleType,
}

impl Default for FaceParams {
    fn default() -> Self {
        Self {
            eye_scale: 1.0,
            eye_offset_x: 0.0,
            eye_offset_y: 0.0,
            pupil_size: 1.0,
            eye_squish: 0.0,
            mouth_type: MouthType::Smile,
            mouth_open: 0.3,
            face_squish: 0.0,
            face_offset_x: 0.0,
            face_offset_y: 0.0,
            face_rotation: 0.0,
            show_blush: true,
            show_sparkle: true,
            particle_type: ParticleType::Float,
        }
    }
}

impl FaceParams {
    /// Copy of `self` with the animated fields multiplied by `intensity`.
    pub fn scaled(&self, state: EmotionalState, intensity: f32) -> Self {
        let mut out = *self;
        out.eye_offset_x *= intensity;
        out.eye_offset_y *= intensity;
        out.face_squish *= intensity;
        out.face_offset_y *= intensity;
        out.face_rotation *= intensity;
        if state.scales_eye_squish() {
            out.eye_squish *= intensity;
        }
        out
    }
}
