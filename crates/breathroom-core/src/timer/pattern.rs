use serde::{Deserialize, Serialize};

/// One of the four breathing phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Inhale,
    HoldIn,
    Exhale,
    HoldOut,
}

/// Fixed cyclic order of a breathing cycle.
pub const PHASE_ORDER: [Phase; 4] = [Phase::Inhale, Phase::HoldIn, Phase::Exhale, Phase::HoldOut];

impl Phase {
    /// Position within [`PHASE_ORDER`].
    pub fn index(self) -> usize {
        match self {
            Phase::Inhale => 0,
            Phase::HoldIn => 1,
            Phase::Exhale => 2,
            Phase::HoldOut => 3,
        }
    }

    pub fn next(self) -> Phase {
        PHASE_ORDER[(self.index() + 1) % PHASE_ORDER.len()]
    }

    /// Human-readable phase name.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Inhale => "Breathe In",
            Phase::HoldIn | Phase::HoldOut => "Hold",
            Phase::Exhale => "Breathe Out",
        }
    }

    /// Short cue shown in the center of the guide.
    pub fn cue(self) -> &'static str {
        match self {
            Phase::Inhale => "in",
            Phase::HoldIn | Phase::HoldOut => "hold",
            Phase::Exhale => "out",
        }
    }

    pub fn is_hold(self) -> bool {
        matches!(self, Phase::HoldIn | Phase::HoldOut)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Inhale => "inhale",
            Phase::HoldIn => "hold_in",
            Phase::Exhale => "exhale",
            Phase::HoldOut => "hold_out",
        };
        f.write_str(name)
    }
}

/// Durations of the four phases, in seconds.
///
/// Zero is a legal duration and means the phase is skipped instantly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub inhale: f64,
    #[serde(default)]
    pub hold_in: f64,
    pub exhale: f64,
    #[serde(default)]
    pub hold_out: f64,
}

impl Pattern {
    pub fn new(inhale: f64, hold_in: f64, exhale: f64, hold_out: f64) -> Self {
        Self {
            inhale,
            hold_in,
            exhale,
            hold_out,
        }
    }

    /// Duration of `phase` in seconds.
    ///
    /// Negative or non-finite values read as zero so a malformed pattern
    /// degrades to instant phases instead of poisoning the timing math.
    pub fn duration(&self, phase: Phase) -> f64 {
        let raw = match phase {
            Phase::Inhale => self.inhale,
            Phase::HoldIn => self.hold_in,
            Phase::Exhale => self.exhale,
            Phase::HoldOut => self.hold_out,
        };
        if raw.is_finite() && raw > 0.0 {
            raw
        } else {
            0.0
        }
    }

    /// Duration of `phase` in whole milliseconds (rounded).
    pub fn duration_ms(&self, phase: Phase) -> u64 {
        (self.duration(phase) * 1000.0).round() as u64
    }

    pub fn cycle_secs(&self) -> f64 {
        PHASE_ORDER.iter().map(|p| self.duration(*p)).sum()
    }

    /// Breathing rate implied by one full cycle. Zero for an all-zero pattern.
    pub fn breaths_per_minute(&self) -> f64 {
        let cycle = self.cycle_secs();
        if cycle <= 0.0 {
            return 0.0;
        }
        60.0 / cycle
    }

    /// All four durations present, finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [self.inhale, self.hold_in, self.exhale, self.hold_out]
            .iter()
            .all(|d| d.is_finite() && *d >= 0.0)
    }

    /// Parse `"4,7,8,0"` style shorthand (inhale, hold_in, exhale, hold_out).
    pub fn parse_shorthand(s: &str) -> Option<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [i, h, e, o] => Some(Self::new(*i, *h, *e, *o)),
            _ => None,
        }
    }
}

impl Default for Pattern {
    /// Box breathing, 4-4-4-4.
    fn default() -> Self {
        Self::new(4.0, 4.0, 4.0, 4.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_cyclic() {
        assert_eq!(Phase::Inhale.next(), Phase::HoldIn);
        assert_eq!(Phase::HoldIn.next(), Phase::Exhale);
        assert_eq!(Phase::Exhale.next(), Phase::HoldOut);
        assert_eq!(Phase::HoldOut.next(), Phase::Inhale);
    }

    #[test]
    fn malformed_durations_read_as_zero() {
        let p = Pattern::new(-1.0, f64::NAN, f64::INFINITY, 2.0);
        assert_eq!(p.duration(Phase::Inhale), 0.0);
        assert_eq!(p.duration(Phase::HoldIn), 0.0);
        assert_eq!(p.duration(Phase::Exhale), 0.0);
        assert_eq!(p.duration(Phase::HoldOut), 2.0);
        assert!(!p.is_valid());
    }

    #[test]
    fn breaths_per_minute_for_box() {
        let p = Pattern::default();
        assert_eq!(p.cycle_secs(), 16.0);
        assert!((p.breaths_per_minute() - 3.75).abs() < 1e-9);
        assert_eq!(Pattern::new(0.0, 0.0, 0.0, 0.0).breaths_per_minute(), 0.0);
    }

    #[test]
    fn shorthand_parsing() {
        assert_eq!(
            Pattern::parse_shorthand("4, 7, 8, 0"),
            Some(Pattern::new(4.0, 7.0, 8.0, 0.0))
        );
        assert!(Pattern::parse_shorthand("4,7,8").is_none());
        assert!(Pattern::parse_shorthand("a,b,c,d").is_none());
    }

    #[test]
    fn missing_holds_deserialize_as_zero() {
        let p: Pattern = serde_json::from_str(r#"{"inhale": 4, "exhale": 6}"#).unwrap();
        assert_eq!(p, Pattern::new(4.0, 0.0, 6.0, 0.0));
    }

    #[test]
    fn display_uses_snake_case() {
        assert_eq!(Phase::HoldOut.to_string(), "hold_out");
        assert_eq!(
            serde_json::to_string(&Phase::HoldIn).unwrap(),
            "\"hold_in\""
        );
    }
}
