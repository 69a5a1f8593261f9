// Error taxonomy for the generation pipeline.
//
// Every variant here is fatal for the request that raised it: it propagates
// with `?` up to the request boundary (`request.rs`) and is turned into a
// structured error response there. Nothing is retried.
//
// Malformed tokens are deliberately absent: they are recovered locally by the
// score builder (see `token::TokenSkip`) and only show up as fewer events.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MusicError>;

#[derive(Error, Debug)]
pub enum MusicError {
    /// The model or vocabulary file does not exist.
    #[error("model artifact not found at {}; train the model first", .0.display())]
    ArtifactMissing(PathBuf),

    /// An artifact file exists but cannot be used.
    #[error("model artifact {} is unusable: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    /// A model and vocabulary that describe different token counts.
    #[error("model covers {model} tokens but vocabulary has {vocabulary}")]
    ArtifactMismatch { model: usize, vocabulary: usize },

    /// A request asked for more audio than the generator allows.
    #[error("requested {requested} seconds; the limit is {max}")]
    LengthTooLong { requested: i64, max: i64 },

    /// A configuration value outside its usable range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The model could not produce a distribution for a window.
    #[error("inference failed: {0}")]
    InferenceFailure(String),

    /// The sampler was asked for zero tokens.
    #[error("token count must be at least 1, got {0}")]
    InvalidTokenCount(usize),

    /// Symbolic-to-audio synthesis failed.
    #[error("render failed: {0}")]
    RenderFailure(String),

    /// The renderer reported success but the waveform is not on disk.
    #[error("expected output {} was not written", .0.display())]
    OutputMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MusicError {
    pub(crate) fn render(reason: impl std::fmt::Display) -> Self {
        MusicError::RenderFailure(reason.to_string())
    }
}
