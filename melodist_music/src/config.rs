// Generator configuration.
//
// Where the model artifact lives, where output files go, how they are
// rendered, the longest request served, and an optional fixed seed. Loaded
// from a JSON file when one is given; every field has a default, so a partial
// file (or none at all) works. The `generate` binary applies its command-line
// flags on top, and `Generator` validates the result before serving.

use crate::error::{MusicError, Result};
use crate::render::RenderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub model_path: PathBuf,
    pub vocab_path: PathBuf,
    /// Directory receiving `generated_<id>.mid` / `.wav` pairs.
    pub output_dir: PathBuf,
    /// Seed every request's random source with this value instead of the
    /// request id. Makes output reproducible.
    pub seed: Option<u64>,
    /// Longest request served, in seconds. Bounds token and sample buffers.
    pub max_length_seconds: i64,
    pub render: RenderConfig,
}

/// Ten minutes.
pub const DEFAULT_MAX_LENGTH_SECONDS: i64 = 600;

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            model_path: PathBuf::from("model/model.json"),
            vocab_path: PathBuf::from("model/vocab.json"),
            output_dir: PathBuf::from("static/audio"),
            seed: None,
            max_length_seconds: DEFAULT_MAX_LENGTH_SECONDS,
            render: RenderConfig::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: GeneratorConfig =
            serde_json::from_str(&data).map_err(|e| MusicError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_length_seconds < 1 {
            return Err(MusicError::InvalidConfig(format!(
                "max_length_seconds must be at least 1, got {}",
                self.max_length_seconds
            )));
        }
        self.render.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{"seed": 7, "render": {"tempo_bpm": 90}}"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.render.tempo_bpm, 90);
        assert_eq!(config.render.gain, 0.9);
        assert_eq!(config.max_length_seconds, DEFAULT_MAX_LENGTH_SECONDS);
        assert_eq!(config.model_path, PathBuf::from("model/model.json"));
    }

    #[test]
    fn load_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            GeneratorConfig::load(&path),
            Err(MusicError::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_rejects_out_of_range_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        for body in [
            r#"{"render": {"tempo_bpm": 3}}"#,
            r#"{"render": {"gain": 0}}"#,
            r#"{"max_length_seconds": 0}"#,
        ] {
            std::fs::write(&path, body).unwrap();
            assert!(
                matches!(GeneratorConfig::load(&path), Err(MusicError::InvalidConfig(_))),
                "{body} accepted"
            );
        }
        std::fs::write(&path, r#"{"render": {"tempo_bpm": 4}}"#).unwrap();
        assert!(GeneratorConfig::load(&path).is_ok());
    }
}
