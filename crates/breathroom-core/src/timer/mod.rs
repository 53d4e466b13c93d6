mod driver;
mod engine;
mod pattern;
mod queue;
mod timing;

pub use driver::{FrameDriver, FrameSource, VsyncFrames};
pub use engine::{compute_progress, BreathEngine, SessionStatus};
pub use pattern::{Pattern, Phase, PHASE_ORDER};
pub use queue::{TimerId, TimerQueue};
pub use timing::{DriveMode, TimingConfig, MAX_INTERVAL_MS};
