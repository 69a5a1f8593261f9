// Melodist Music Generator
//
// Generates short pieces from a token-level sequence model and renders them to
// audio. A request names zero or more instruments and a duration; each part is
// sampled autoregressively from the model, turned into notes and chords, and
// the merged score is written as MIDI and synthesized to a 44.1 kHz WAV.
//
// Architecture:
// - vocab.rs: Token vocabulary (index <-> token), persisted as a JSON array
// - model.rs: SequenceModel trait + the Katz-style backoff count model
// - artifact.rs: Loading/saving the paired model + vocabulary files
// - sampler.rs: Autoregressive arg-max sampling over a sliding context window
// - token.rs: Token grammar (pitch names, C4-relative offsets, dotted chords)
// - instrument.rs: The nine supported timbres and per-part instrument policies
// - score.rs: Parts (solo or mixed-timbre) and their merge into a Score
// - midi.rs: MIDI file output from scores, and reading it back
// - synth.rs: Additive synthesizer (harmonic stacks + ADSR envelopes)
// - render.rs: Score -> MIDI file -> WAV file
// - config.rs: GeneratorConfig (paths, fixed seed, render settings)
// - generate.rs: Request orchestration (token budget, routing, output naming)
// - request.rs: Lenient request parsing and error responses
//
// Given a fixed seed the whole pipeline is deterministic: the only randomness
// is the initial context window and the timbre choices.

pub mod artifact;
pub mod config;
pub mod error;
pub mod generate;
pub mod instrument;
pub mod midi;
pub mod model;
pub mod render;
pub mod request;
pub mod sampler;
pub mod score;
pub mod synth;
pub mod token;
pub mod vocab;

pub use error::{MusicError, Result};
