// Instrument timbres and the policy that assigns them to a part.
//
// The timbre set is closed: nine orchestral voices, each with a General MIDI
// program number (written into the score) and a synthesis voice profile in
// `synth.rs` (used to render it). Requested names resolve leniently: the
// sentinel `mixed` selects per-event random timbres, a known name selects that
// timbre, and anything else quietly becomes a random pick.

use melodist_prng::RandomSource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label reported for a part whose events carry their own timbres.
pub const MIXED_LABEL: &str = "Mixed";

/// Request sentinel selecting the mixed policy.
pub const MIXED_SENTINEL: &str = "mixed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timbre {
    Piano,
    Violin,
    Guitar,
    Flute,
    Trumpet,
    Clarinet,
    Oboe,
    Tuba,
    Bassoon,
}

impl Timbre {
    pub const ALL: [Timbre; 9] = [
        Timbre::Piano,
        Timbre::Violin,
        Timbre::Guitar,
        Timbre::Flute,
        Timbre::Trumpet,
        Timbre::Clarinet,
        Timbre::Oboe,
        Timbre::Tuba,
        Timbre::Bassoon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Timbre::Piano => "Piano",
            Timbre::Violin => "Violin",
            Timbre::Guitar => "Guitar",
            Timbre::Flute => "Flute",
            Timbre::Trumpet => "Trumpet",
            Timbre::Clarinet => "Clarinet",
            Timbre::Oboe => "Oboe",
            Timbre::Tuba => "Tuba",
            Timbre::Bassoon => "Bassoon",
        }
    }

    /// General MIDI program (0-based).
    pub fn program(self) -> u8 {
        match self {
            Timbre::Piano => 0,
            Timbre::Violin => 40,
            Timbre::Guitar => 24,
            Timbre::Flute => 73,
            Timbre::Trumpet => 56,
            Timbre::Clarinet => 71,
            Timbre::Oboe => 68,
            Timbre::Tuba => 58,
            Timbre::Bassoon => 70,
        }
    }

    pub fn from_program(program: u8) -> Option<Timbre> {
        Timbre::ALL.into_iter().find(|t| t.program() == program)
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Timbre> {
        let name = name.trim();
        Timbre::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    pub fn random(rng: &mut impl RandomSource) -> Timbre {
        *rng.choose(&Timbre::ALL).unwrap_or(&Timbre::Piano)
    }
}

impl fmt::Display for Timbre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the builder assigns timbres to one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentPolicy {
    /// Every event uses this timbre.
    Named(Timbre),
    /// Each event gets its own uniformly random timbre.
    Mixed,
    /// One uniformly random timbre for the whole part.
    Random,
}

impl InstrumentPolicy {
    /// Resolve a requested instrument name. Unknown names fall back to
    /// `Random` rather than failing.
    pub fn from_name(name: &str) -> InstrumentPolicy {
        if name.trim().eq_ignore_ascii_case(MIXED_SENTINEL) {
            return InstrumentPolicy::Mixed;
        }
        match Timbre::from_name(name) {
            Some(t) => InstrumentPolicy::Named(t),
            None => InstrumentPolicy::Random,
        }
    }
}
