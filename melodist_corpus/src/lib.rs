// Melodist corpus jobs.
//
// Offline preparation of the model artifact the generator loads:
// - extract.rs: MIDI folder -> JSON list of note/chord tokens
// - train.rs: token list -> backoff model + vocabulary files
// - error.rs: CorpusError
//
// Both jobs run to completion or fail without writing partial output.

pub mod error;
pub mod extract;
pub mod train;

pub use error::{CorpusError, Result};
