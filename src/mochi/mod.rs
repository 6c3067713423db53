//! The Mochi avatar: data model, palettes, assets, animation, particles,
//! face rasteriser and the state machine tying them together.

pub mod anim;
pub mod assets;
pub mod face;
pub mod particles;
pub mod state;
pub mod theme;
pub mod types;

pub use assets::{ImageAsset, SoundAsset, SpriteConfig, StateConfig, StateTable};
pub use state::Mochi;
pub use types::{Activity, EmotionalState, FaceParams, MouthType, ParticleType, Theme};
