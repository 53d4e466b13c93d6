//! # Breathroom Core Library
//!
//! This library provides the core logic for the Breathroom guided breathing
//! timer. All operations are available through the `breathroom` CLI, which is
//! a thin front end over the same library.
//!
//! ## Architecture
//!
//! - **Scheduler**: A timestamp-driven state machine that walks the four
//!   breathing phases and counts cycles. It never reads a clock; callers
//!   pass `now_ms` into every command.
//! - **Frame driver**: Decides when the scheduler is ticked: coarse sleeps
//!   between boundaries, frame refinement near them, and a watchdog that
//!   restarts a silent frame loop.
//! - **Session runtimes**: A tokio task driven by the monotonic clock, and a
//!   virtual-clock simulation for deterministic replays.
//! - **Techniques**: Built-in presets plus JSON technique files, with
//!   messages triggered by cycle count or running time.
//! - **Storage**: TOML-based configuration.
//!
//! ## Key Components
//!
//! - [`BreathEngine`]: Phase-cycle state machine
//! - [`FrameDriver`]: Tick scheduling and watchdog
//! - [`Session`]: Async session actor
//! - [`TechniqueLibrary`]: Technique lookup and loading
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod messages;
pub mod session;
pub mod storage;
pub mod technique;
pub mod timer;

pub use error::{ConfigError, CoreError, SessionError, ValidationError};
pub use events::{DebugSnapshot, Event};
pub use messages::{MessageScheduler, Notice};
pub use session::{Session, SessionHandle, Simulation};
pub use storage::Config;
pub use technique::{Technique, TechniqueLibrary, TechniqueMeta};
pub use timer::{
    BreathEngine, DriveMode, FrameDriver, FrameSource, Pattern, Phase, SessionStatus, TimingConfig,
    PHASE_ORDER,
};
