// Request boundary: JSON in, audio or an error message out.
//
// Request parsing is lenient. A missing or unusable `length` becomes the
// default of 60 seconds; `instruments` must be an array, and only its string
// entries are kept. Nothing about a request body is ever rejected outright.
//
// Every `MusicError` stops here and becomes an `ErrorResponse`. A missing
// output file gets a generic message; anything else names its reason. Any
// length parses, so the generator's configured maximum is what bounds work.

use crate::error::MusicError;
use crate::generate::Generator;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{error, info};

/// Length used when a request omits it or sends something unusable.
pub const DEFAULT_LENGTH_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(default = "default_length", deserialize_with = "lenient_length")]
    pub length: i64,
    #[serde(default, deserialize_with = "lenient_instruments")]
    pub instruments: Vec<String>,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        GenerationRequest {
            length: DEFAULT_LENGTH_SECONDS,
            instruments: Vec::new(),
        }
    }
}

impl GenerationRequest {
    /// Parse a request body. A body that is not a JSON object at all yields
    /// the default request.
    pub fn from_json(body: &str) -> GenerationRequest {
        serde_json::from_str(body).unwrap_or_default()
    }
}

fn default_length() -> i64 {
    DEFAULT_LENGTH_SECONDS
}

fn length_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_length<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(length_from_value(&value).unwrap_or(DEFAULT_LENGTH_SECONDS))
}

fn lenient_instruments<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

/// A rendered waveform and how it was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedAudio {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub instrument_label: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&MusicError> for ErrorResponse {
    fn from(err: &MusicError) -> Self {
        let error = match err {
            MusicError::OutputMissing(_) => {
                "Music generation failed. Please try again later.".to_string()
            }
            other => format!("Music generation failed: {other}"),
        };
        ErrorResponse { error }
    }
}

/// Serve one request end to end.
pub fn handle(
    generator: &Generator,
    request: &GenerationRequest,
) -> Result<GeneratedAudio, ErrorResponse> {
    let outcome = generator
        .generate(&request.instruments, request.length)
        .and_then(|generated| {
            let bytes = std::fs::read(&generated.wav_path)?;
            Ok(GeneratedAudio {
                bytes,
                instrument_label: generated.label,
                path: generated.wav_path,
            })
        });
    match outcome {
        Ok(audio) => {
            info!(label = %audio.instrument_label, bytes = audio.bytes.len(), "served request");
            Ok(audio)
        }
        Err(e) => {
            error!("generation failed: {e}");
            Err(ErrorResponse::from(&e))
        }
    }
}
