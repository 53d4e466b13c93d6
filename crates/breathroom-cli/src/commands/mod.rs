pub mod breathe;
pub mod config;
pub mod simulate;
pub mod technique;

use clap::Args;
use breathroom_core::{Config, CoreError, Event, Notice, Pattern, SessionStatus, Technique};

/// What to breathe, shared by `breathe` and `simulate`.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Technique id (defaults to session.default_technique)
    #[arg(long, short)]
    pub technique: Option<String>,
    /// Explicit pattern in seconds: inhale,hold_in,exhale,hold_out
    #[arg(long, value_parser = parse_pattern)]
    pub pattern: Option<Pattern>,
    /// Stop after this many completed cycles
    #[arg(long)]
    pub cycles: Option<u32>,
    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

pub struct SessionPlan {
    pub technique: Option<Technique>,
    pub pattern: Pattern,
    pub target_cycles: Option<u32>,
}

impl SessionArgs {
    /// Resolve flags against the configuration.
    ///
    /// `--pattern` alone runs a bare pattern. Otherwise the technique named
    /// by `--technique` (or the configured default) supplies the pattern and
    /// messages, with `--pattern` still taking precedence for timing.
    pub fn plan(&self, config: &Config) -> Result<SessionPlan, CoreError> {
        let target_cycles = self.cycles.or(config.session.target_cycles);
        if let (Some(pattern), None) = (self.pattern, &self.technique) {
            return Ok(SessionPlan {
                technique: None,
                pattern,
                target_cycles,
            });
        }

        let library = config.technique_library()?;
        let id = self
            .technique
            .as_deref()
            .unwrap_or(config.session.default_technique.as_str());
        let technique = library.require(id)?.clone();
        Ok(SessionPlan {
            pattern: self
                .pattern
                .unwrap_or_else(|| technique.first_round_pattern()),
            technique: Some(technique),
            target_cycles,
        })
    }
}

fn parse_pattern(s: &str) -> Result<Pattern, String> {
    Pattern::parse_shorthand(s)
        .filter(Pattern::is_valid)
        .ok_or_else(|| format!("expected four non-negative durations like 4,7,8,0, got '{s}'"))
}

/// One human-readable line per event worth showing; progress is silent.
pub fn describe(event: &Event) -> Option<String> {
    let secs = event.at_ms() as f64 / 1000.0;
    let text = match event {
        Event::StatusChanged { status, .. } => match status {
            SessionStatus::Running => "running".to_string(),
            SessionStatus::Paused => "paused".to_string(),
            SessionStatus::Idle => "reset".to_string(),
        },
        Event::PhaseChanged { phase, .. } => {
            format!("{:<12} {:<6} ({})", phase.label(), format!("[{}]", phase.cue()), phase)
        }
        Event::CycleCompleted { count, .. } => format!("cycle {count} complete"),
        Event::Progress(_) => return None,
    };
    Some(format!("[{secs:>8.3}s] {text}"))
}

pub fn print_event(event: &Event, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else if let Some(line) = describe(event) {
        println!("{line}");
    }
    Ok(())
}

pub fn print_notice(notice: &Notice, json: bool) -> Result<(), serde_json::Error> {
    if json {
        let mut value = serde_json::to_value(notice)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("type".to_string(), serde_json::Value::from("Notice"));
        }
        println!("{}", serde_json::to_string(&value)?);
    } else {
        println!("  * [{}] {}", notice.kind, notice.text);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use breathroom_core::Phase;

    #[test]
    fn parse_pattern_accepts_four_values() {
        assert_eq!(parse_pattern("4,7,8,0"), Ok(Pattern::new(4.0, 7.0, 8.0, 0.0)));
        assert!(parse_pattern("4,7,8").is_err());
        assert!(parse_pattern("4,-1,8,0").is_err());
    }

    #[test]
    fn describe_skips_progress() {
        let line = describe(&Event::PhaseChanged {
            phase: Phase::HoldIn,
            cycle: 0,
            at_ms: 1992,
        })
        .unwrap();
        assert!(line.contains("1.992s"));
        assert!(line.contains("Hold"));
        assert!(line.contains("[hold]"));
        assert!(line.contains("hold_in"));
        assert_eq!(
            describe(&Event::CycleCompleted { count: 2, at_ms: 0 }).as_deref(),
            Some("[   0.000s] cycle 2 complete")
        );
    }
}
