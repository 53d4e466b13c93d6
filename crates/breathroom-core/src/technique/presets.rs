use super::{Difficulty, Message, MessageKind, Round, RoundMessage, Technique, TechniqueMessages, Trigger};
use crate::timer::Pattern;

struct Preset {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    explanation: &'static str,
    when_to_use: &'static str,
    pattern: [f64; 4],
    cycles: u32,
    difficulty: Difficulty,
}

const PRESETS: &[Preset] = &[
    Preset {
        id: "box",
        name: "Box Breathing",
        description: "Four equal sides: in, hold, out, hold.",
        explanation: "Equal phases steady the rhythm and give the mind a simple count to follow.",
        when_to_use: "Before focused work or a stressful conversation.",
        pattern: [4.0, 4.0, 4.0, 4.0],
        cycles: 6,
        difficulty: Difficulty::Beginner,
    },
    Preset {
        id: "4-7-8",
        name: "4-7-8 Relaxing Breath",
        description: "A natural tranquilizer for the nervous system.",
        explanation: "A long hold and a longer exhale slow the heart rate.",
        when_to_use: "Falling asleep or easing anxiety.",
        pattern: [4.0, 7.0, 8.0, 0.0],
        cycles: 4,
        difficulty: Difficulty::Beginner,
    },
    Preset {
        id: "calm",
        name: "Balance",
        description: "Short inhale, longer exhale, no holds.",
        explanation: "Exhaling longer than inhaling favours the parasympathetic system.",
        when_to_use: "Any time you want to settle.",
        pattern: [4.0, 0.0, 6.0, 0.0],
        cycles: 8,
        difficulty: Difficulty::Beginner,
    },
    Preset {
        id: "coherence",
        name: "Coherent Breathing",
        description: "Five to six breaths per minute.",
        explanation: "Even six-second phases line breathing up with heart rate variability.",
        when_to_use: "Daily practice for resilience.",
        pattern: [6.0, 0.0, 6.0, 0.0],
        cycles: 10,
        difficulty: Difficulty::Intermediate,
    },
    Preset {
        id: "deep-relax",
        name: "Deep Rest",
        description: "Doubling the exhale.",
        explanation: "An exhale twice as long as the inhale slows everything down.",
        when_to_use: "Stress relief after a long day.",
        pattern: [4.0, 0.0, 8.0, 0.0],
        cycles: 6,
        difficulty: Difficulty::Beginner,
    },
    Preset {
        id: "7-11",
        name: "7-11",
        description: "Long inhale, longer exhale.",
        explanation: "Counting to seven in and eleven out gives an anxious mind something to hold.",
        when_to_use: "Panic or deep anxiety.",
        pattern: [7.0, 0.0, 11.0, 0.0],
        cycles: 4,
        difficulty: Difficulty::Intermediate,
    },
    Preset {
        id: "triangle",
        name: "Triangle",
        description: "In, hold, out.",
        explanation: "Three equal sides with a single hold after the inhale.",
        when_to_use: "Emotional steadiness.",
        pattern: [4.0, 4.0, 4.0, 0.0],
        cycles: 8,
        difficulty: Difficulty::Beginner,
    },
];

fn message(kind: MessageKind, text: &str) -> Message {
    Message {
        kind,
        text: text.to_string(),
    }
}

pub(super) fn builtin() -> Vec<Technique> {
    PRESETS
        .iter()
        .map(|p| {
            let [inhale, hold_in, exhale, hold_out] = p.pattern;
            let pattern = Pattern::new(inhale, hold_in, exhale, hold_out);
            let minutes = (pattern.cycle_secs() * f64::from(p.cycles) / 60.0 * 10.0).round() / 10.0;
            Technique {
                id: p.id.to_string(),
                name: p.name.to_string(),
                estimated_duration_minutes: Some(minutes),
                description: p.description.to_string(),
                explanation: p.explanation.to_string(),
                when_to_use: p.when_to_use.to_string(),
                rounds: vec![Round {
                    phases: pattern,
                    repetitions: p.cycles,
                    label: None,
                    round_messages: vec![RoundMessage {
                        kind: MessageKind::Success,
                        text: "Halfway there.".to_string(),
                        trigger: Some(Trigger::Repetition((p.cycles / 2).max(1))),
                    }],
                }],
                recommended_cycles: p.cycles,
                difficulty: p.difficulty,
                technique_messages: Some(TechniqueMessages {
                    pre_session: vec![message(
                        MessageKind::Info,
                        "Sit comfortably and breathe through your nose.",
                    )],
                    on_start: vec![message(MessageKind::Info, "Follow the count.")],
                    on_end: vec![message(MessageKind::Success, "Session complete.")],
                }),
                cautions: if hold_in >= 7.0 {
                    vec!["Long holds can cause light-headedness. Stop if dizzy.".to_string()]
                } else {
                    Vec::new()
                },
            }
        })
        .collect()
}
