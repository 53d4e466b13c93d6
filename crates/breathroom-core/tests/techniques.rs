//! Technique directory loading and message triggering over a simulated run.

use std::fs;

use breathroom_core::technique::MessageKind;
use breathroom_core::{
    MessageScheduler, Pattern, Simulation, Technique, TechniqueLibrary, TimingConfig,
};

const CUSTOM_BOX: &str = r#"{
    "id": "box",
    "name": "Short Box",
    "description": "Two-second box.",
    "explanation": "A quick box for practice.",
    "when_to_use": "Testing.",
    "rounds": [{
        "phases": { "inhale": 2, "hold_in": 2, "exhale": 2, "hold_out": 2 },
        "repetitions": 3,
        "round_messages": [
            { "type": "info", "text": "first", "trigger": { "type": "repetition", "value": 1 } },
            { "type": "warning", "text": "ten seconds", "trigger": { "type": "time", "value": 10 } }
        ]
    }],
    "recommended_cycles": 3,
    "difficulty": "beginner"
}"#;

const EMPTY_ROUNDS: &str = r#"{
    "id": "broken",
    "name": "Broken",
    "description": "",
    "explanation": "",
    "when_to_use": "",
    "rounds": [],
    "recommended_cycles": 1,
    "difficulty": "advanced"
}"#;

#[test]
fn load_dir_skips_invalid_files_and_overrides_builtins() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("box.json"), CUSTOM_BOX).unwrap();
    fs::write(dir.path().join("broken.json"), EMPTY_ROUNDS).unwrap();
    fs::write(dir.path().join("garbage.json"), "{ not json").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let mut library = TechniqueLibrary::builtin();
    let before = library.len();
    let loaded = library.load_dir(dir.path()).unwrap();

    assert_eq!(loaded, 1);
    assert_eq!(library.len(), before);
    assert!(library.get("broken").is_none());
    let custom = library.get("box").unwrap();
    assert_eq!(custom.name, "Short Box");
    assert_eq!(custom.first_round_pattern(), Pattern::new(2.0, 2.0, 2.0, 2.0));
}

#[test]
fn load_dir_on_missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut library = TechniqueLibrary::empty();
    assert!(library.load_dir(&dir.path().join("absent")).is_err());
}

#[test]
fn from_file_reports_validation_failures() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, EMPTY_ROUNDS).unwrap();
    let err = Technique::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("rounds"), "{err}");
}

#[test]
fn messages_fire_during_a_simulated_session() {
    let technique: Technique = serde_json::from_str(CUSTOM_BOX).unwrap();
    let mut scheduler = MessageScheduler::for_technique(&technique, 4000);
    let mut sim = Simulation::new(technique.first_round_pattern(), TimingConfig::default());

    let mut events = sim.start();
    events.extend(sim.advance(12_000));
    let notices: Vec<_> = events.iter().flat_map(|e| scheduler.observe(e)).collect();

    let texts: Vec<&str> = notices.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "ten seconds"]);
    assert_eq!(notices[1].kind, MessageKind::Warning);
}
