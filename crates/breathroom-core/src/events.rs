use serde::{Deserialize, Serialize};

use crate::timer::{Phase, SessionStatus};

/// Every observable change in a breathing session produces an Event.
///
/// Timestamps (`at_ms`) are on the driver's monotonic millisecond clock.
/// Renderers, audio and message layers consume these; none of them
/// derive timing on their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    StatusChanged {
        status: SessionStatus,
        at_ms: u64,
    },
    /// Emitted once per phase transition, including zero-duration hops.
    PhaseChanged {
        phase: Phase,
        /// Completed cycles at the moment of the transition.
        cycle: u64,
        at_ms: u64,
    },
    /// Emitted once per `hold_out -> inhale` transition.
    CycleCompleted {
        count: u64,
        at_ms: u64,
    },
    /// Read-only diagnostic view, sampled after every tick.
    Progress(DebugSnapshot),
}

impl Event {
    pub fn at_ms(&self) -> u64 {
        match self {
            Event::StatusChanged { at_ms, .. }
            | Event::PhaseChanged { at_ms, .. }
            | Event::CycleCompleted { at_ms, .. } => *at_ms,
            Event::Progress(snap) => snap.at_ms,
        }
    }
}

/// Diagnostic snapshot of the scheduler.
///
/// Safe to sample on every tick. Nothing may depend on it for correctness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugSnapshot {
    pub phase: Phase,
    pub phase_elapsed_secs: f64,
    pub phase_duration_secs: f64,
    /// 0.0 ..= 1.0 within the current phase.
    pub progress: f64,
    pub cycle_count: u64,
    pub is_running: bool,
    pub is_paused: bool,
    pub frame_loop_active: bool,
    /// Running time of the session, pauses excluded.
    pub active_secs: f64,
    pub at_ms: u64,
}

impl DebugSnapshot {
    /// Whole seconds left in the current phase, as shown on a countdown.
    pub fn remaining_whole_secs(&self) -> u64 {
        (self.phase_duration_secs - self.phase_elapsed_secs)
            .max(0.0)
            .ceil() as u64
    }
}
