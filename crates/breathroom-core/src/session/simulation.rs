use crate::events::{DebugSnapshot, Event};
use crate::timer::{FrameDriver, FrameSource, Pattern, TimingConfig, VsyncFrames};

/// Runs a [`FrameDriver`] against a virtual clock.
///
/// Time only moves through [`Simulation::advance`], which fires every
/// wake-up in deadline order, so a whole session can be replayed in
/// microseconds and always produces the same events. Events are handed
/// back to the caller and not retained, so long runs stay flat in memory.
#[derive(Debug)]
pub struct Simulation<F = VsyncFrames> {
    driver: FrameDriver<F>,
    now_ms: u64,
}

impl Simulation<VsyncFrames> {
    pub fn new(pattern: Pattern, timing: TimingConfig) -> Self {
        Self::with_driver(FrameDriver::new(pattern, timing))
    }
}

impl<F: FrameSource> Simulation<F> {
    pub fn with_driver(driver: FrameDriver<F>) -> Self {
        Self {
            driver,
            now_ms: 0,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn driver(&self) -> &FrameDriver<F> {
        &self.driver
    }

    pub fn snapshot(&self) -> DebugSnapshot {
        self.driver.snapshot(self.now_ms)
    }

    pub fn start(&mut self) -> Vec<Event> {
        self.driver.start(self.now_ms)
    }

    pub fn pause(&mut self) -> Vec<Event> {
        self.driver.pause(self.now_ms)
    }

    pub fn reset(&mut self) -> Vec<Event> {
        self.driver.reset(self.now_ms)
    }

    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.driver.set_pattern(pattern);
    }

    /// Move the clock forward by `ms`, firing every deadline on the way.
    pub fn advance(&mut self, ms: u64) -> Vec<Event> {
        let target = self.now_ms.saturating_add(ms);
        let mut events = Vec::new();
        while let Some(due) = self.driver.next_deadline().filter(|due| *due <= target) {
            self.now_ms = self.now_ms.max(due);
            events.extend(self.driver.fire_due(self.now_ms));
        }
        self.now_ms = target;
        events
    }
}
