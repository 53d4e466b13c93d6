//! Session runtimes.
//!
//! A [`FrameDriver`] only knows about timestamps. This module gives it a
//! clock: [`Session`] runs it on a tokio task against the monotonic clock,
//! [`Simulation`] runs it against a virtual clock.

mod simulation;

pub use simulation::Simulation;

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::error::SessionError;
use crate::events::{DebugSnapshot, Event};
use crate::timer::{FrameDriver, FrameSource, Pattern};

const COMMAND_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 256;

enum Command {
    Start(oneshot::Sender<Vec<Event>>),
    Pause(oneshot::Sender<Vec<Event>>),
    Reset(oneshot::Sender<Vec<Event>>),
    SetPattern(Pattern, oneshot::Sender<()>),
    Snapshot(oneshot::Sender<DebugSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Monotonic milliseconds since the session was spawned.
#[derive(Debug, Clone, Copy)]
struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    /// Deadlines past what `Instant` can hold clamp to a day from now.
    fn instant_at(&self, ms: u64) -> Instant {
        self.origin
            .checked_add(Duration::from_millis(ms))
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400))
    }
}

/// Cloneable control surface for a running [`Session`].
///
/// Every command waits for the session task to apply it, so once
/// `pause()` or `reset()` returns no further tick will be delivered.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
}

impl SessionHandle {
    pub async fn start(&self) -> Result<Vec<Event>, SessionError> {
        self.request(Command::Start).await
    }

    pub async fn pause(&self) -> Result<Vec<Event>, SessionError> {
        self.request(Command::Pause).await
    }

    pub async fn reset(&self) -> Result<Vec<Event>, SessionError> {
        self.request(Command::Reset).await
    }

    pub async fn set_pattern(&self, pattern: Pattern) -> Result<(), SessionError> {
        self.request(|reply| Command::SetPattern(pattern, reply)).await
    }

    pub async fn snapshot(&self) -> Result<DebugSnapshot, SessionError> {
        self.request(Command::Snapshot).await
    }

    /// Cancel every timer and stop the session task.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(Command::Shutdown).await
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands.send(make(reply)).await?;
        Ok(response.await?)
    }
}

/// A frame driver running on its own tokio task.
pub struct Session;

impl Session {
    /// Spawn the session task. Must be called from within a tokio runtime.
    pub fn spawn<F>(driver: FrameDriver<F>) -> (SessionHandle, JoinHandle<()>)
    where
        F: FrameSource + Send + 'static,
    {
        let (commands, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let clock = SessionClock::new();
        let task = tokio::spawn(run(driver, command_rx, events.clone(), clock));
        (SessionHandle { commands, events }, task)
    }
}

async fn run<F: FrameSource>(
    mut driver: FrameDriver<F>,
    mut commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<Event>,
    clock: SessionClock,
) {
    loop {
        let deadline = driver.next_deadline().map(|ms| clock.instant_at(ms));
        let wake = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                let now = clock.now_ms();
                match command {
                    Command::Start(reply) => {
                        let emitted = driver.start(now);
                        publish(&events, &emitted);
                        let _ = reply.send(emitted);
                    }
                    Command::Pause(reply) => {
                        let emitted = driver.pause(now);
                        publish(&events, &emitted);
                        let _ = reply.send(emitted);
                    }
                    Command::Reset(reply) => {
                        let emitted = driver.reset(now);
                        publish(&events, &emitted);
                        let _ = reply.send(emitted);
                    }
                    Command::SetPattern(pattern, reply) => {
                        driver.set_pattern(pattern);
                        let _ = reply.send(());
                    }
                    Command::Snapshot(reply) => {
                        let _ = reply.send(driver.snapshot(now));
                    }
                    Command::Shutdown(reply) => {
                        driver.teardown();
                        let _ = reply.send(());
                        debug!("session shut down");
                        return;
                    }
                }
            }
            _ = wake => {
                let emitted = driver.fire_due(clock.now_ms());
                publish(&events, &emitted);
            }
        }
    }
    // Every handle dropped.
    driver.teardown();
}

/// Having no subscribers is not an error.
fn publish(events: &broadcast::Sender<Event>, emitted: &[Event]) {
    for event in emitted {
        let _ = events.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{Phase, SessionStatus, TimingConfig};

    fn spawn(pattern: Pattern) -> (SessionHandle, JoinHandle<()>) {
        Session::spawn(FrameDriver::new(pattern, TimingConfig::default()))
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn follows_the_clock_through_phases() {
        let (handle, task) = spawn(Pattern::new(2.0, 1.0, 2.0, 1.0));
        let mut rx = handle.subscribe();

        let started = handle.start().await.unwrap();
        assert!(matches!(
            started[0],
            Event::StatusChanged {
                status: SessionStatus::Running,
                ..
            }
        ));

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(handle.snapshot().await.unwrap().phase, Phase::HoldIn);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(handle.snapshot().await.unwrap().phase, Phase::Exhale);

        let phases: Vec<Phase> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                Event::PhaseChanged { phase, .. } => Some(phase),
                _ => None,
            })
            .collect();
        assert_eq!(phases, vec![Phase::HoldIn, Phase::Exhale]);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_ticks_until_resume() {
        let (handle, _task) = spawn(Pattern::new(2.0, 1.0, 2.0, 1.0));
        let mut rx = handle.subscribe();

        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.pause().await.unwrap();
        drain(&mut rx);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(drain(&mut rx).is_empty());
        let snap = handle.snapshot().await.unwrap();
        assert!(snap.is_paused);
        assert!((snap.phase_elapsed_secs - 0.5).abs() < 0.02);

        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert_eq!(handle.snapshot().await.unwrap().phase, Phase::Inhale);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(handle.snapshot().await.unwrap().phase, Phase::HoldIn);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_returns_to_idle_inhale() {
        let (handle, _task) = spawn(Pattern::new(1.0, 1.0, 1.0, 1.0));
        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(handle.snapshot().await.unwrap().cycle_count, 1);

        let events = handle.reset().await.unwrap();
        assert!(matches!(
            events[0],
            Event::StatusChanged {
                status: SessionStatus::Idle,
                ..
            }
        ));
        let mut rx = handle.subscribe();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(drain(&mut rx).is_empty());

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, Phase::Inhale);
        assert_eq!(snap.cycle_count, 0);
        assert_eq!(snap.progress, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_fail_after_shutdown() {
        let (handle, task) = spawn(Pattern::default());
        handle.shutdown().await.unwrap();
        task.await.unwrap();
        assert_eq!(handle.start().await, Err(SessionError::Closed));
    }
}
