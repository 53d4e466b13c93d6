//! Technique messages surfaced during a session.
//!
//! [`MessageScheduler`] watches the session's event stream and turns the
//! technique's messages into [`Notice`]s when their trigger is reached.
//! It never reads a clock of its own: cycle counts come from
//! `CycleCompleted` events and elapsed time from `Progress` snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::Event;
use crate::technique::{Message, MessageKind, RoundMessage, Technique, Trigger};
use crate::timer::SessionStatus;

/// A message ready to be shown, dismissed after `timeout_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub kind: MessageKind,
    pub text: String,
    pub timeout_ms: u64,
    pub issued_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(kind: MessageKind, text: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            text: text.into(),
            timeout_ms,
            issued_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
struct Armed {
    message: RoundMessage,
    fired: bool,
}

#[derive(Debug, Clone)]
pub struct MessageScheduler {
    timeout_ms: u64,
    pre_session: Vec<Message>,
    on_start: Vec<Message>,
    on_end: Vec<Message>,
    round: Vec<Armed>,
    started: bool,
}

impl MessageScheduler {
    /// Arms the technique-wide messages and those of the first round, the
    /// round whose pattern a session runs.
    pub fn for_technique(technique: &Technique, timeout_ms: u64) -> Self {
        let messages = technique.technique_messages.clone().unwrap_or_default();
        let round = technique
            .rounds
            .first()
            .into_iter()
            .flat_map(|r| r.round_messages.iter().cloned())
            .map(|message| Armed {
                message,
                fired: false,
            })
            .collect();
        Self {
            timeout_ms,
            pre_session: messages.pre_session,
            on_start: messages.on_start,
            on_end: messages.on_end,
            round,
            started: false,
        }
    }

    /// Messages to show before the session starts.
    pub fn pre_session(&self) -> Vec<Notice> {
        self.notices(&self.pre_session)
    }

    /// Messages to show once the session is over.
    pub fn finish(&self) -> Vec<Notice> {
        self.notices(&self.on_end)
    }

    /// Feed one session event; returns the notices it makes due.
    pub fn observe(&mut self, event: &Event) -> Vec<Notice> {
        match event {
            Event::StatusChanged {
                status: SessionStatus::Running,
                ..
            } if !self.started => {
                self.started = true;
                let mut out = self.notices(&self.on_start);
                out.extend(self.fire_where(|trigger| trigger.is_none()));
                out
            }
            Event::StatusChanged {
                status: SessionStatus::Idle,
                ..
            } => {
                self.rearm();
                Vec::new()
            }
            Event::CycleCompleted { count, .. } => {
                let count = *count;
                self.fire_where(|trigger| {
                    matches!(trigger, Some(Trigger::Repetition(n)) if u64::from(*n) <= count)
                })
            }
            Event::Progress(snap) if snap.is_running => {
                let active = snap.active_secs;
                self.fire_where(|trigger| matches!(trigger, Some(Trigger::Time(t)) if *t <= active))
            }
            _ => Vec::new(),
        }
    }

    fn rearm(&mut self) {
        self.started = false;
        for armed in &mut self.round {
            armed.fired = false;
        }
    }

    fn fire_where(&mut self, due: impl Fn(&Option<Trigger>) -> bool) -> Vec<Notice> {
        let timeout_ms = self.timeout_ms;
        self.round
            .iter_mut()
            .filter(|armed| !armed.fired && due(&armed.message.trigger))
            .map(|armed| {
                armed.fired = true;
                Notice::new(armed.message.kind, armed.message.text.clone(), timeout_ms)
            })
            .collect()
    }

    fn notices(&self, messages: &[Message]) -> Vec<Notice> {
        messages
            .iter()
            .map(|m| Notice::new(m.kind, m.text.clone(), self.timeout_ms))
            .collect()
    }
}
