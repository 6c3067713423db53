//! Sensor side of the avatar: classify readings, map them to a mood,
//! damp the result, and optionally ask a remote service.

pub mod arbiter;
pub mod mapper;
pub mod motion_config;
pub mod remote;
pub mod state;

pub use arbiter::HoldArbiter;
pub use mapper::{Decision, DefaultMapper, Mapper, MapperConfig, SoundCue};
pub use motion_config::{MemoryStore, MotionConfig, MotionSettings, ThresholdStore};
pub use remote::{RemoteDecision, RemoteMailbox, RemoteTransport, RemoteWorker};
pub use state::{InputClassifier, InputState, SensorReadings, SensorSource};
