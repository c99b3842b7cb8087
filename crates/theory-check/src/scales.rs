use serde::{Deserialize, Serialize};

/// The scales a constraint document can name. The set is closed; anything
/// else fails the table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    Major,
    Minor,
    PentatonicMajor,
    PentatonicMinor,
    Blues,
    Dorian,
    Mixolydian,
    Lydian,
    Phrygian,
    Locrian,
}

impl ScaleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleKind::Major => "major",
            ScaleKind::Minor => "minor",
            ScaleKind::PentatonicMajor => "pentatonic_major",
            ScaleKind::PentatonicMinor => "pentatonic_minor",
            ScaleKind::Blues => "blues",
            ScaleKind::Dorian => "dorian",
            ScaleKind::Mixolydian => "mixolydian",
            ScaleKind::Lydian => "lydian",
            ScaleKind::Phrygian => "phrygian",
            ScaleKind::Locrian => "locrian",
        }
    }

    /// Parse a constraint document's scale name. Case-insensitive, and
    /// spaces or hyphens count as underscores.
    pub fn from_name(name: &str) -> Option<ScaleKind> {
        let name = name.trim().to_lowercase().replace([' ', '-'], "_");
        match name.as_str() {
            "major" => Some(ScaleKind::Major),
            "minor" => Some(ScaleKind::Minor),
            "pentatonic_major" | "major_pentatonic" => Some(ScaleKind::PentatonicMajor),
            "pentatonic_minor" | "minor_pentatonic" => Some(ScaleKind::PentatonicMinor),
            "blues" => Some(ScaleKind::Blues),
            "dorian" => Some(ScaleKind::Dorian),
            "mixolydian" => Some(ScaleKind::Mixolydian),
            "lydian" => Some(ScaleKind::Lydian),
            "phrygian" => Some(ScaleKind::Phrygian),
            "locrian" => Some(ScaleKind::Locrian),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScaleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scale template: kind + interval set from the root (as bitmask over 12
/// pitch classes).
pub struct ScaleTemplate {
    pub kind: ScaleKind,
    pub intervals: u16, // bitmask: bit i set means interval i is in the scale
    pub size: usize,
}

impl ScaleTemplate {
    const fn new(kind: ScaleKind, intervals: &[u8]) -> Self {
        let mut mask = 0u16;
        let mut i = 0;
        while i < intervals.len() {
            mask |= 1 << intervals[i];
            i += 1;
        }
        Self {
            kind,
            intervals: mask,
            size: intervals.len(),
        }
    }

    /// True if every pitch class lies in this scale rooted at `root`.
    pub fn contains_all(&self, pitch_classes: &[u8], root: u8) -> bool {
        to_interval_mask(pitch_classes, root) & !self.intervals == 0
    }

    /// First pitch class outside this scale rooted at `root`, if any.
    pub fn first_outside(&self, pitch_classes: &[u8], root: u8) -> Option<u8> {
        pitch_classes.iter().copied().find(|&pc| {
            let interval = (pc % 12 + 12 - root % 12) % 12;
            self.intervals & (1 << interval) == 0
        })
    }
}

/// The fixed scale table; constraint lookups recognize nothing else.
pub static TEMPLATES: &[ScaleTemplate] = &[
    ScaleTemplate::new(ScaleKind::Major, &[0, 2, 4, 5, 7, 9, 11]),
    ScaleTemplate::new(ScaleKind::Minor, &[0, 2, 3, 5, 7, 8, 10]),
    ScaleTemplate::new(ScaleKind::PentatonicMajor, &[0, 2, 4, 7, 9]),
    ScaleTemplate::new(ScaleKind::PentatonicMinor, &[0, 3, 5, 7, 10]),
    ScaleTemplate::new(ScaleKind::Blues, &[0, 3, 5, 6, 7, 10]),
    ScaleTemplate::new(ScaleKind::Dorian, &[0, 2, 3, 5, 7, 9, 10]),
    ScaleTemplate::new(ScaleKind::Mixolydian, &[0, 2, 4, 5, 7, 9, 10]),
    ScaleTemplate::new(ScaleKind::Lydian, &[0, 2, 4, 6, 7, 9, 11]),
    ScaleTemplate::new(ScaleKind::Phrygian, &[0, 1, 3, 5, 7, 8, 10]),
    ScaleTemplate::new(ScaleKind::Locrian, &[0, 1, 3, 5, 6, 8, 10]),
];

/// Look up a constraint document's scale name in the fixed table.
pub fn lookup(name: &str) -> Option<&'static ScaleTemplate> {
    let kind = ScaleKind::from_name(name)?;
    TEMPLATES.iter().find(|t| t.kind == kind)
}

/// Convert a set of pitch classes to an interval bitmask relative to a root.
fn to_interval_mask(pitch_classes: &[u8], root: u8) -> u16 {
    let mut mask = 0u16;
    for &pc in pitch_classes {
        let interval = (pc % 12 + 12 - root % 12) % 12;
        mask |= 1 << interval;
    }
    mask
}
