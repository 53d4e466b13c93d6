//! Frame driver.
//!
//! Decides *when* the engine is ticked. Between boundaries it sleeps on a
//! coarse timer that ends `refine_margin_ms` before the phase is due, then
//! refines with a frame request so the boundary tick lands within a frame
//! of the nominal time. A low-frequency watchdog re-requests a frame if
//! the frame loop goes silent.
//!
//! The driver never reads a clock. Hosts feed it timestamps through
//! [`FrameDriver::fire_due`] whenever [`FrameDriver::next_deadline`] passes.

use tracing::{debug, warn};

use super::engine::{BreathEngine, SessionStatus};
use super::pattern::Pattern;
use super::queue::{TimerId, TimerQueue};
use super::timing::{DriveMode, TimingConfig};
use crate::events::{DebugSnapshot, Event};

/// Where frame callbacks come from.
pub trait FrameSource {
    /// Delivery time of a frame requested at `now_ms`.
    ///
    /// `None` models a request the host accepted but will never deliver.
    fn next_frame(&mut self, now_ms: u64) -> Option<u64>;
}

impl<F: FrameSource + ?Sized> FrameSource for Box<F> {
    fn next_frame(&mut self, now_ms: u64) -> Option<u64> {
        (**self).next_frame(now_ms)
    }
}

/// Fixed-rate frames, one interval after each request.
#[derive(Debug, Clone)]
pub struct VsyncFrames {
    interval_ms: u64,
}

impl VsyncFrames {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
        }
    }
}

impl FrameSource for VsyncFrames {
    fn next_frame(&mut self, now_ms: u64) -> Option<u64> {
        Some(now_ms.saturating_add(self.interval_ms))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Frame,
    Coarse,
    Watchdog,
}

#[derive(Debug, Clone, Copy)]
struct PendingFrame {
    /// `None` when the source swallowed the request.
    timer: Option<TimerId>,
    requested_at_ms: u64,
}

/// Drives a [`BreathEngine`] from timer and frame wake-ups.
#[derive(Debug)]
pub struct FrameDriver<F = VsyncFrames> {
    engine: BreathEngine,
    timing: TimingConfig,
    frames: F,
    queue: TimerQueue<Wake>,
    frame: Option<PendingFrame>,
    coarse: Option<TimerId>,
    watchdog: Option<TimerId>,
    recoveries: u64,
}

impl FrameDriver<VsyncFrames> {
    pub fn new(pattern: Pattern, timing: TimingConfig) -> Self {
        let frames = VsyncFrames::new(timing.frame_interval_ms);
        Self::with_frames(pattern, timing, frames)
    }
}

impl<F: FrameSource> FrameDriver<F> {
    pub fn with_frames(pattern: Pattern, timing: TimingConfig, frames: F) -> Self {
        Self {
            engine: BreathEngine::new(pattern, timing.epsilon_secs),
            timing,
            frames,
            queue: TimerQueue::new(),
            frame: None,
            coarse: None,
            watchdog: None,
            recoveries: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &BreathEngine {
        &self.engine
    }

    pub fn status(&self) -> SessionStatus {
        self.engine.status()
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn frames_mut(&mut self) -> &mut F {
        &mut self.frames
    }

    /// Earliest pending wake-up, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.next_due()
    }

    /// Number of timers and frame callbacks still scheduled.
    pub fn pending_timers(&self) -> usize {
        self.queue.len()
    }

    /// How many times the watchdog has restarted a silent frame loop.
    pub fn watchdog_recoveries(&self) -> u64 {
        self.recoveries
    }

    /// True while a frame or coarse wake-up is outstanding.
    pub fn frame_loop_active(&self) -> bool {
        self.frame.is_some() || self.coarse.is_some()
    }

    pub fn snapshot(&self, now_ms: u64) -> DebugSnapshot {
        self.engine.snapshot(now_ms, self.frame_loop_active())
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now_ms: u64) -> Vec<Event> {
        let events = self.engine.start(now_ms);
        if events.is_empty() {
            return events;
        }
        self.arm_watchdog(now_ms);
        self.plan(now_ms);
        events
    }

    /// Cancel every pending wake-up, then freeze the engine.
    pub fn pause(&mut self, now_ms: u64) -> Vec<Event> {
        if !self.engine.is_running() {
            return Vec::new();
        }
        self.cancel_all();
        self.engine.pause(now_ms)
    }

    /// Cancel every pending wake-up, then return the engine to idle.
    pub fn reset(&mut self, now_ms: u64) -> Vec<Event> {
        self.cancel_all();
        self.engine.reset(now_ms)
    }

    /// Release all timers without touching engine state. Used on shutdown.
    pub fn teardown(&mut self) {
        self.cancel_all();
    }

    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.engine.set_pattern(pattern);
    }

    /// Fire every wake-up due at or before `now_ms`.
    pub fn fire_due(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some((_, wake)) = self.queue.pop_due(now_ms) {
            match wake {
                Wake::Frame => {
                    self.frame = None;
                    self.run_tick(now_ms, &mut events);
                }
                Wake::Coarse => {
                    self.coarse = None;
                    if !self.engine.is_running() {
                        continue;
                    }
                    if self.engine.remaining_ms(now_ms) <= self.timing.near_boundary_ms {
                        self.run_tick(now_ms, &mut events);
                    } else {
                        self.request_frame(now_ms);
                    }
                }
                Wake::Watchdog => {
                    self.watchdog = None;
                    if !self.engine.is_running() {
                        continue;
                    }
                    if let Some(silent_ms) = self.stalled_for(now_ms) {
                        warn!(silent_ms, at_ms = now_ms, "frame loop stalled; re-requesting frame");
                        self.recover(now_ms);
                    }
                    self.arm_watchdog(now_ms);
                }
            }
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn run_tick(&mut self, now_ms: u64, events: &mut Vec<Event>) {
        events.extend(self.engine.tick(now_ms));
        self.plan(now_ms);
        events.push(Event::Progress(self.snapshot(now_ms)));
    }

    /// Schedule the next wake-up for the current phase.
    fn plan(&mut self, now_ms: u64) {
        if !self.engine.is_running() {
            return;
        }
        match self.timing.mode {
            DriveMode::Continuous => self.request_frame(now_ms),
            DriveMode::SleepRefine => {
                let remaining = self.engine.remaining_ms(now_ms);
                if remaining > self.timing.refine_margin_ms {
                    let sleep = (remaining - self.timing.refine_margin_ms).min(self.timing.max_sleep_ms);
                    self.schedule_coarse(now_ms.saturating_add(sleep));
                } else {
                    self.request_frame(now_ms);
                }
            }
        }
    }

    fn request_frame(&mut self, now_ms: u64) {
        if self.frame.is_some() {
            return;
        }
        let timer = self
            .frames
            .next_frame(now_ms)
            .map(|due| self.queue.schedule(due.max(now_ms.saturating_add(1)), Wake::Frame));
        self.frame = Some(PendingFrame {
            timer,
            requested_at_ms: now_ms,
        });
    }

    fn schedule_coarse(&mut self, due_ms: u64) {
        if let Some(id) = self.coarse.take() {
            self.queue.cancel(id);
        }
        self.coarse = Some(self.queue.schedule(due_ms, Wake::Coarse));
    }

    fn arm_watchdog(&mut self, now_ms: u64) {
        if let Some(id) = self.watchdog.take() {
            self.queue.cancel(id);
        }
        let due = now_ms.saturating_add(self.timing.watchdog_interval_ms);
        self.watchdog = Some(self.queue.schedule(due, Wake::Watchdog));
    }

    /// Milliseconds of silence if the frame loop looks dead.
    fn stalled_for(&self, now_ms: u64) -> Option<u64> {
        // A pending coarse timer is a deliberate sleep.
        if self.coarse.is_some() {
            return None;
        }
        let last_tick = self.engine.last_tick_at_ms().unwrap_or(0);
        match self.frame {
            None => Some(now_ms.saturating_sub(last_tick)),
            Some(frame) => {
                let silent = now_ms.saturating_sub(frame.requested_at_ms.max(last_tick));
                (silent > self.timing.stale_threshold_ms).then_some(silent)
            }
        }
    }

    fn recover(&mut self, now_ms: u64) {
        if let Some(timer) = self.frame.take().and_then(|f| f.timer) {
            self.queue.cancel(timer);
        }
        self.recoveries += 1;
        self.request_frame(now_ms);
    }

    fn cancel_all(&mut self) {
        if let Some(timer) = self.frame.take().and_then(|f| f.timer) {
            self.queue.cancel(timer);
        }
        for id in [self.coarse.take(), self.watchdog.take()].into_iter().flatten() {
            self.queue.cancel(id);
        }
        debug!(pending = self.queue.len(), "frame driver cancelled");
    }
}
