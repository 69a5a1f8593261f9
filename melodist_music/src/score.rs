// Symbolic score: parts of sequential note/chord events with timbres.
//
// The score builder turns a sampled token sequence plus an instrument policy
// into a `Part`. A part is either `Solo` (one timbre for every event) or
// `Mixed` (a nominal timbre for the track header, and one timbre per event).
// A `Score` is a single part or several concurrent ones; the renderer walks
// `Score::parts()` and never needs to know which policy produced them.
//
// Events have no explicit timing. They are placed back to back, one beat
// each, and the renderer decides what a beat is.

use crate::instrument::{InstrumentPolicy, MIXED_LABEL, Timbre};
use crate::token::{Sound, parse_token};
use melodist_prng::RandomSource;
use tracing::debug;

/// Declared timbre of a mixed part's track.
pub const MIXED_NOMINAL: Timbre = Timbre::Piano;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Solo {
        timbre: Timbre,
        events: Vec<Sound>,
    },
    Mixed {
        nominal: Timbre,
        events: Vec<(Sound, Timbre)>,
    },
}

impl Part {
    /// Timbre declared at the head of the part's track.
    pub fn nominal_timbre(&self) -> Timbre {
        match self {
            Part::Solo { timbre, .. } => *timbre,
            Part::Mixed { nominal, .. } => *nominal,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Part::Solo { events, .. } => events.len(),
            Part::Mixed { events, .. } => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events in order with the timbre each one sounds with.
    pub fn events(&self) -> Vec<(&Sound, Timbre)> {
        match self {
            Part::Solo { timbre, events } => events.iter().map(|s| (s, *timbre)).collect(),
            Part::Mixed { events, .. } => events.iter().map(|(s, t)| (s, *t)).collect(),
        }
    }

    /// Name of the track in the written score.
    pub fn track_name(&self) -> &'static str {
        match self {
            Part::Solo { timbre, .. } => timbre.name(),
            Part::Mixed { .. } => MIXED_LABEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Score {
    Single(Part),
    Multi(Vec<Part>),
}

impl Score {
    /// Concatenate parts into one score. One part stays a `Single` score.
    pub fn merge(mut parts: Vec<Part>) -> Score {
        if parts.len() == 1 {
            if let Some(part) = parts.pop() {
                return Score::Single(part);
            }
        }
        Score::Multi(parts)
    }

    pub fn parts(&self) -> &[Part] {
        match self {
            Score::Single(part) => std::slice::from_ref(part),
            Score::Multi(parts) => parts,
        }
    }

    pub fn event_count(&self) -> usize {
        self.parts().iter().map(Part::len).sum()
    }
}

/// Resolve tokens into sounds, dropping whatever does not parse.
pub fn resolve_tokens<S: AsRef<str>>(tokens: &[S]) -> Vec<Sound> {
    let mut sounds = Vec::with_capacity(tokens.len());
    for token in tokens {
        match parse_token(token.as_ref()) {
            Ok((sound, skipped)) => {
                for skip in skipped {
                    debug!("{skip}");
                }
                sounds.push(sound);
            }
            Err(skip) => debug!("{skip}"),
        }
    }
    sounds
}

/// Build one part from a token sequence. Returns the part and the label
/// describing the instrument actually used.
pub fn build_part<S: AsRef<str>>(
    tokens: &[S],
    policy: InstrumentPolicy,
    rng: &mut impl RandomSource,
) -> (Part, String) {
    let sounds = resolve_tokens(tokens);
    if sounds.len() < tokens.len() {
        debug!(
            kept = sounds.len(),
            skipped = tokens.len() - sounds.len(),
            "dropped unparseable tokens"
        );
    }

    match policy {
        InstrumentPolicy::Named(timbre) => (
            Part::Solo {
                timbre,
                events: sounds,
            },
            timbre.name().to_string(),
        ),
        InstrumentPolicy::Random => {
            let timbre = Timbre::random(rng);
            (
                Part::Solo {
                    timbre,
                    events: sounds,
                },
                timbre.name().to_string(),
            )
        }
        InstrumentPolicy::Mixed => {
            let events = sounds
                .into_iter()
                .map(|sound| (sound, Timbre::random(rng)))
                .collect();
            (
                Part::Mixed {
                    nominal: MIXED_NOMINAL,
                    events,
                },
                MIXED_LABEL.to_string(),
            )
        }
    }
}
