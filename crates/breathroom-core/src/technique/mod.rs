//! Breathing techniques.
//!
//! A technique is a named program of one or more rounds, each round a
//! [`Pattern`] repeated some number of times, plus optional messages shown
//! around and during the session. Techniques are stored one per JSON file;
//! a small set of presets ships built in.

mod presets;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, ValidationError};
use crate::timer::Pattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Info,
    Warning,
    Success,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Info => write!(f, "info"),
            MessageKind::Warning => write!(f, "warning"),
            MessageKind::Success => write!(f, "success"),
        }
    }
}

/// When a round message is due.
///
/// Serialized as `{"type": "repetition", "value": 3}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Trigger {
    /// After this many completed cycles.
    Repetition(u32),
    /// After this many seconds of running time.
    Time(f64),
}

/// A message with no trigger, shown at a fixed point of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Trigger>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechniqueMessages {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_session: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_start: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_end: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub phases: Pattern,
    pub repetitions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub round_messages: Vec<RoundMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technique {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration_minutes: Option<f64>,
    pub description: String,
    pub explanation: String,
    pub when_to_use: String,
    pub rounds: Vec<Round>,
    pub recommended_cycles: u32,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique_messages: Option<TechniqueMessages>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cautions: Vec<String>,
}

/// Listing entry for a technique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueMeta {
    pub id: String,
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration_minutes: Option<f64>,
}

impl Technique {
    /// Structural checks beyond what deserialization already enforces.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "id".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.rounds.is_empty() {
            return Err(ValidationError::EmptyCollection("rounds".to_string()));
        }
        for (i, round) in self.rounds.iter().enumerate() {
            if !round.phases.is_valid() {
                return Err(ValidationError::InvalidValue {
                    field: format!("rounds[{i}].phases"),
                    message: "durations must be finite and non-negative".to_string(),
                });
            }
            for (j, message) in round.round_messages.iter().enumerate() {
                if let Some(Trigger::Time(secs)) = message.trigger {
                    if !secs.is_finite() || secs < 0.0 {
                        return Err(ValidationError::InvalidValue {
                            field: format!("rounds[{i}].round_messages[{j}].trigger"),
                            message: format!("time must be finite and non-negative, got {secs}"),
                        });
                    }
                }
            }
        }
        if let Some(minutes) = self.estimated_duration_minutes {
            if !minutes.is_finite() || minutes < 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: "estimated_duration_minutes".to_string(),
                    message: format!("must be finite and non-negative, got {minutes}"),
                });
            }
        }
        Ok(())
    }

    /// Pattern of the first round; all zeros if there are no rounds.
    pub fn first_round_pattern(&self) -> Pattern {
        self.rounds
            .first()
            .map(|round| round.phases)
            .unwrap_or_else(|| Pattern::new(0.0, 0.0, 0.0, 0.0))
    }

    pub fn meta(&self) -> TechniqueMeta {
        TechniqueMeta {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            difficulty: self.difficulty,
            estimated_duration_minutes: self.estimated_duration_minutes,
        }
    }

    /// Parse and validate a technique file.
    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        let technique: Technique = serde_json::from_str(&raw)?;
        technique.validate()?;
        Ok(technique)
    }
}

/// Techniques keyed by id.
#[derive(Debug, Clone)]
pub struct TechniqueLibrary {
    techniques: BTreeMap<String, Technique>,
}

impl Default for TechniqueLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TechniqueLibrary {
    pub fn empty() -> Self {
        Self {
            techniques: BTreeMap::new(),
        }
    }

    /// The presets that ship with breathroom.
    pub fn builtin() -> Self {
        let mut library = Self::empty();
        for technique in presets::builtin() {
            library.insert(technique);
        }
        library
    }

    /// Add or replace a technique.
    pub fn insert(&mut self, technique: Technique) {
        self.techniques.insert(technique.id.clone(), technique);
    }

    /// Load every `*.json` file in `dir`.
    ///
    /// Files that cannot be read or fail validation are skipped with a
    /// warning. Loaded techniques replace any existing technique with the
    /// same id. Returns the number of techniques loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, CoreError> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            match Technique::from_file(&path) {
                Ok(technique) => {
                    debug!(id = %technique.id, path = %path.display(), "loaded technique");
                    self.insert(technique);
                    loaded += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping technique file"),
            }
        }
        Ok(loaded)
    }

    pub fn get(&self, id: &str) -> Option<&Technique> {
        self.techniques.get(id)
    }

    /// Look up a technique, failing with [`CoreError::TechniqueNotFound`].
    pub fn require(&self, id: &str) -> Result<&Technique, CoreError> {
        self.get(id)
            .ok_or_else(|| CoreError::TechniqueNotFound(id.to_string()))
    }

    /// Listing entries, ordered by id.
    pub fn list_meta(&self) -> Vec<TechniqueMeta> {
        self.techniques.values().map(Technique::meta).collect()
    }

    pub fn len(&self) -> usize {
        self.techniques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.techniques.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TECHNIQUE_JSON: &str = r#"{
        "id": "ladder",
        "name": "Ladder",
        "estimated_duration_minutes": 3,
        "description": "Lengthening exhale.",
        "explanation": "Each round extends the exhale.",
        "when_to_use": "Winding down.",
        "rounds": [
            {
                "phases": { "inhale": 4, "hold_in": 0, "exhale": 4, "hold_out": 0 },
                "repetitions": 3,
                "label": "Even",
                "round_messages": [
                    { "type": "info", "text": "Settle in." },
                    { "type": "success", "text": "Two done.", "trigger": { "type": "repetition", "value": 2 } },
                    { "type": "info", "text": "Ten seconds.", "trigger": { "type": "time", "value": 10 } }
                ]
            },
            {
                "phases": { "inhale": 4, "hold_in": 0, "exhale": 6, "hold_out": 0 },
                "repetitions": 3
            }
        ],
        "recommended_cycles": 6,
        "difficulty": "beginner",
        "technique_messages": {
            "pre_session": [{ "type": "info", "text": "Sit comfortably." }],
            "on_end": [{ "type": "success", "text": "Well done." }]
        },
        "cautions": ["Stop if dizzy."]
    }"#;

    fn sample() -> Technique {
        serde_json::from_str(TECHNIQUE_JSON).unwrap()
    }

    #[test]
    fn parses_technique_json() {
        let t = sample();
        assert_eq!(t.id, "ladder");
        assert_eq!(t.rounds.len(), 2);
        assert_eq!(t.difficulty, Difficulty::Beginner);
        assert_eq!(
            t.rounds[0].round_messages[1].trigger,
            Some(Trigger::Repetition(2))
        );
        assert_eq!(t.rounds[0].round_messages[2].trigger, Some(Trigger::Time(10.0)));
        assert_eq!(t.rounds[0].round_messages[0].trigger, None);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn trigger_uses_type_value_shape() {
        let json = serde_json::to_value(Trigger::Repetition(3)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "repetition", "value": 3 }));
    }

    #[test]
    fn first_round_pattern_comes_from_first_round() {
        assert_eq!(sample().first_round_pattern(), Pattern::new(4.0, 0.0, 4.0, 0.0));
    }

    #[test]
    fn validate_rejects_empty_rounds() {
        let mut t = sample();
        t.rounds.clear();
        assert_eq!(
            t.validate(),
            Err(ValidationError::EmptyCollection("rounds".to_string()))
        );
        assert_eq!(t.first_round_pattern().cycle_secs(), 0.0);
    }

    #[test]
    fn validate_rejects_negative_durations_and_times() {
        let mut t = sample();
        t.rounds[1].phases.exhale = -1.0;
        assert!(matches!(
            t.validate(),
            Err(ValidationError::InvalidValue { field, .. }) if field == "rounds[1].phases"
        ));

        let mut t = sample();
        t.rounds[0].round_messages[2].trigger = Some(Trigger::Time(-5.0));
        assert!(t.validate().is_err());

        let mut t = sample();
        t.estimated_duration_minutes = Some(f64::NAN);
        assert!(t.validate().is_err());
    }

    #[test]
    fn missing_required_field_fails_to_parse() {
        let broken = TECHNIQUE_JSON.replace(r#""difficulty": "beginner","#, "");
        assert!(serde_json::from_str::<Technique>(&broken).is_err());
    }

    #[test]
    fn builtin_presets_are_valid() {
        let library = TechniqueLibrary::builtin();
        assert!(library.get("box").is_some());
        assert!(library.get("4-7-8").is_some());
        for meta in library.list_meta() {
            let technique = library.require(&meta.id).unwrap();
            assert!(technique.validate().is_ok(), "{} invalid", meta.id);
        }
        assert_eq!(
            library.require("box").unwrap().first_round_pattern(),
            Pattern::new(4.0, 4.0, 4.0, 4.0)
        );
    }

    #[test]
    fn unknown_id_is_an_error() {
        let library = TechniqueLibrary::builtin();
        assert!(matches!(
            library.require("nope"),
            Err(CoreError::TechniqueNotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn list_meta_is_ordered_by_id() {
        let ids: Vec<String> = TechniqueLibrary::builtin()
            .list_meta()
            .into_iter()
            .map(|m| m.id)
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
