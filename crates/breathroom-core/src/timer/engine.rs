//! Phase-cycle scheduler.
//!
//! The engine is a timestamp-driven state machine. It owns no timers and
//! spawns no threads - the caller (usually [`FrameDriver`]) delivers
//! `tick(now_ms)` calls in non-decreasing timestamp order.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running | Paused -> Idle   (reset)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = BreathEngine::new(Pattern::default(), 0.05);
//! engine.start(now_ms());
//! // On every frame:
//! for event in engine.tick(now_ms()) { /* PhaseChanged, CycleCompleted */ }
//! ```
//!
//! [`FrameDriver`]: super::FrameDriver

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pattern::{Pattern, Phase, PHASE_ORDER};
use crate::events::{DebugSnapshot, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
        })
    }
}

/// Fraction of `duration_secs` covered by `elapsed_secs`, in `[0, 1]`.
///
/// Durations below `epsilon_secs` are floored to it, so zero-length
/// phases resolve to full progress on their first tick instead of
/// dividing by zero.
pub fn compute_progress(elapsed_secs: f64, duration_secs: f64, epsilon_secs: f64) -> f64 {
    let safe = duration_secs.max(epsilon_secs).max(f64::MIN_POSITIVE);
    (elapsed_secs / safe).clamp(0.0, 1.0)
}

/// Breathing-cycle scheduler.
///
/// Tracks the current phase, the time spent in it and the number of
/// completed cycles. All mutation goes through `start`, `pause`,
/// `reset` and `tick`.
#[derive(Debug, Clone)]
pub struct BreathEngine {
    pattern: Pattern,
    /// Pattern waiting for the next start from idle.
    staged_pattern: Option<Pattern>,
    epsilon_secs: f64,
    status: SessionStatus,
    phase: Phase,
    phase_elapsed_secs: f64,
    cycle_count: u64,
    /// Timestamp the current phase is measured from.
    phase_started_at_ms: Option<u64>,
    /// Elapsed time frozen at pause, folded into the anchor on resume.
    resume_offset_secs: Option<f64>,
    last_tick_at_ms: Option<u64>,
    /// Running time accumulated before the last pause.
    active_banked_ms: u64,
    running_since_ms: Option<u64>,
}

impl BreathEngine {
    /// Create an idle engine positioned at the start of inhale.
    ///
    /// A non-positive or non-finite `epsilon_secs` falls back to 50ms.
    pub fn new(pattern: Pattern, epsilon_secs: f64) -> Self {
        let epsilon_secs = if epsilon_secs.is_finite() && epsilon_secs > 0.0 {
            epsilon_secs
        } else {
            0.05
        };
        Self {
            pattern,
            staged_pattern: None,
            epsilon_secs,
            status: SessionStatus::Idle,
            phase: Phase::Inhale,
            phase_elapsed_secs: 0.0,
            cycle_count: 0,
            phase_started_at_ms: None,
            resume_offset_secs: None,
            last_tick_at_ms: None,
            active_banked_ms: 0,
            running_since_ms: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn phase_elapsed_secs(&self) -> f64 {
        self.phase_elapsed_secs
    }

    pub fn phase_duration_secs(&self) -> f64 {
        self.pattern.duration(self.phase)
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn epsilon_secs(&self) -> f64 {
        self.epsilon_secs
    }

    pub fn last_tick_at_ms(&self) -> Option<u64> {
        self.last_tick_at_ms
    }

    /// 0.0 .. 1.0 progress within the current phase, as of the last tick.
    pub fn progress(&self) -> f64 {
        compute_progress(
            self.phase_elapsed_secs,
            self.phase_duration_secs(),
            self.epsilon_secs,
        )
    }

    /// Milliseconds from `now_ms` until the current phase's nominal end.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        let remaining = self.phase_duration_secs() - self.elapsed_at(now_ms);
        (remaining.max(0.0) * 1000.0).round() as u64
    }

    /// Running time of the session, pauses excluded.
    pub fn active_secs(&self, now_ms: u64) -> f64 {
        let live = self
            .running_since_ms
            .map(|since| now_ms.saturating_sub(since))
            .unwrap_or(0);
        (self.active_banked_ms + live) as f64 / 1000.0
    }

    pub fn snapshot(&self, now_ms: u64, frame_loop_active: bool) -> DebugSnapshot {
        DebugSnapshot {
            phase: self.phase,
            phase_elapsed_secs: self.phase_elapsed_secs,
            phase_duration_secs: self.phase_duration_secs(),
            progress: self.progress(),
            cycle_count: self.cycle_count,
            is_running: self.status == SessionStatus::Running,
            is_paused: self.status == SessionStatus::Paused,
            frame_loop_active,
            active_secs: self.active_secs(now_ms),
            at_ms: now_ms,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a fresh run from idle, or resume from pause. No-op while running.
    pub fn start(&mut self, now_ms: u64) -> Vec<Event> {
        match self.status {
            SessionStatus::Running => Vec::new(),
            SessionStatus::Idle => {
                if let Some(pattern) = self.staged_pattern.take() {
                    self.pattern = pattern;
                }
                self.phase = Phase::Inhale;
                self.phase_elapsed_secs = 0.0;
                self.cycle_count = 0;
                self.resume_offset_secs = None;
                self.active_banked_ms = 0;
                self.anchor(now_ms);
                self.enter_running(now_ms)
            }
            SessionStatus::Paused => {
                self.resume_offset_secs = Some(self.phase_elapsed_secs);
                self.anchor(now_ms);
                self.enter_running(now_ms)
            }
        }
    }

    /// Freeze the current phase. Only meaningful while running.
    pub fn pause(&mut self, now_ms: u64) -> Vec<Event> {
        if self.status != SessionStatus::Running {
            return Vec::new();
        }
        // Flush elapsed time first.
        self.phase_elapsed_secs = self
            .elapsed_at(now_ms)
            .clamp(0.0, self.phase_duration_secs());
        self.phase_started_at_ms = None;
        if let Some(since) = self.running_since_ms.take() {
            self.active_banked_ms += now_ms.saturating_sub(since);
        }
        self.status = SessionStatus::Paused;
        debug!(phase = %self.phase, elapsed = self.phase_elapsed_secs, "breathing paused");
        vec![
            Event::StatusChanged {
                status: SessionStatus::Paused,
                at_ms: now_ms,
            },
            Event::Progress(self.snapshot(now_ms, false)),
        ]
    }

    /// Return to idle at the start of inhale. Valid from any state.
    pub fn reset(&mut self, now_ms: u64) -> Vec<Event> {
        if let Some(pattern) = self.staged_pattern.take() {
            self.pattern = pattern;
        }
        self.status = SessionStatus::Idle;
        self.phase = Phase::Inhale;
        self.phase_elapsed_secs = 0.0;
        self.cycle_count = 0;
        self.phase_started_at_ms = None;
        self.resume_offset_secs = None;
        self.last_tick_at_ms = None;
        self.active_banked_ms = 0;
        self.running_since_ms = None;
        debug!("breathing reset");
        vec![
            Event::StatusChanged {
                status: SessionStatus::Idle,
                at_ms: now_ms,
            },
            Event::Progress(self.snapshot(now_ms, false)),
        ]
    }

    /// Evaluate the scheduler at `now_ms`.
    ///
    /// Returns the phase-change and cycle-complete events produced by this
    /// tick. Ticks delivered while not running are ignored.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Event> {
        if self.status != SessionStatus::Running {
            return Vec::new();
        }
        if self.phase_started_at_ms.is_none() {
            self.anchor(now_ms);
        }
        self.last_tick_at_ms = Some(now_ms);

        let mut events = Vec::new();
        let elapsed = self.elapsed_at(now_ms);
        let duration = self.phase_duration_secs();
        self.phase_elapsed_secs = elapsed.clamp(0.0, duration);

        if elapsed + self.epsilon_secs >= duration {
            self.advance(now_ms, &mut events);
            // Zero-length phases are crossed within the same tick, bounded
            // to one full cycle so an all-zero pattern cannot spin.
            let mut hops = 1;
            while hops < PHASE_ORDER.len() && self.phase_duration_secs() == 0.0 {
                self.advance(now_ms, &mut events);
                hops += 1;
            }
        }
        events
    }

    /// Replace the pattern.
    ///
    /// Applies immediately when idle; otherwise it is staged until the
    /// next start from idle so a running phase never changes length.
    pub fn set_pattern(&mut self, pattern: Pattern) {
        if self.status == SessionStatus::Idle {
            self.pattern = pattern;
            self.staged_pattern = None;
        } else {
            self.staged_pattern = Some(pattern);
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn enter_running(&mut self, now_ms: u64) -> Vec<Event> {
        self.status = SessionStatus::Running;
        self.running_since_ms = Some(now_ms);
        self.last_tick_at_ms = Some(now_ms);
        debug!(phase = %self.phase, "breathing running");
        vec![Event::StatusChanged {
            status: SessionStatus::Running,
            at_ms: now_ms,
        }]
    }

    fn anchor(&mut self, now_ms: u64) {
        let offset_ms = self
            .resume_offset_secs
            .take()
            .map(|secs| (secs * 1000.0).round() as u64)
            .unwrap_or(0);
        self.phase_started_at_ms = Some(now_ms.saturating_sub(offset_ms));
    }

    fn elapsed_at(&self, now_ms: u64) -> f64 {
        match (self.status, self.phase_started_at_ms) {
            (SessionStatus::Running, Some(start)) => now_ms.saturating_sub(start) as f64 / 1000.0,
            _ => self.phase_elapsed_secs,
        }
    }

    fn advance(&mut self, now_ms: u64, events: &mut Vec<Event>) {
        let from = self.phase;
        let next = from.next();
        self.phase = next;
        self.phase_elapsed_secs = 0.0;
        self.phase_started_at_ms = Some(now_ms);

        let wrapped = from == Phase::HoldOut;
        if wrapped {
            self.cycle_count += 1;
        }
        debug!(from = %from, to = %next, cycle = self.cycle_count, at_ms = now_ms, "phase transition");
        events.push(Event::PhaseChanged {
            phase: next,
            cycle: self.cycle_count,
            at_ms: now_ms,
        });
        if wrapped {
            events.push(Event::CycleCompleted {
                count: self.cycle_count,
                at_ms: now_ms,
            });
        }
    }
}
