// Errors raised by the offline corpus jobs.
//
// Unparseable MIDI files are not errors at the job level: extraction logs and
// skips them. What remains here stops a job before it writes anything.

use melodist_music::MusicError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CorpusError>;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed MIDI: {0}")]
    Midi(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Too few tokens to form a single training pair.
    #[error("not enough tokens to train: have {have}, need at least {need}")]
    InsufficientTokens { have: usize, need: usize },

    #[error("no tokens extracted; check the MIDI folder")]
    NoTokens,

    #[error("invalid training config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Music(#[from] MusicError),
}
