// Loading and saving the trained model artifact.
//
// The artifact is a pair of JSON files written by the training job: the
// serialized `BackoffModel` and the vocabulary list. Both must exist and agree
// on the vocabulary size. Absence of either file is `ArtifactMissing`, which
// the orchestrator reports before any sampling starts.

use crate::error::{MusicError, Result};
use crate::model::{BackoffModel, SequenceModel};
use crate::vocab::Vocabulary;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

/// A loaded model plus its vocabulary. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    model: BackoffModel,
    vocabulary: Vocabulary,
}

impl ModelArtifact {
    /// Pair a model with its vocabulary, checking they describe the same V.
    pub fn new(model: BackoffModel, vocabulary: Vocabulary) -> Result<Self> {
        if model.vocab_size != vocabulary.size() {
            return Err(MusicError::ArtifactMismatch {
                model: model.vocab_size,
                vocabulary: vocabulary.size(),
            });
        }
        Ok(ModelArtifact { model, vocabulary })
    }

    pub fn load(model_path: &Path, vocab_path: &Path) -> Result<Self> {
        for path in [model_path, vocab_path] {
            if !path.exists() {
                return Err(MusicError::ArtifactMissing(path.to_path_buf()));
            }
        }

        let model: BackoffModel = read_json(model_path)?;
        // An empty window never fills, so sampling could not advance.
        if model.window_len == 0 {
            return Err(MusicError::ArtifactCorrupt {
                path: model_path.to_path_buf(),
                reason: "window length is 0".into(),
            });
        }
        let vocabulary: Vocabulary = read_json(vocab_path)?;
        let artifact =
            ModelArtifact::new(model, vocabulary).map_err(|e| MusicError::ArtifactCorrupt {
                path: vocab_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        info!(
            vocab = artifact.vocabulary.size(),
            window = artifact.model.window_len(),
            order = artifact.model.order(),
            "loaded model artifact"
        );
        Ok(artifact)
    }

    /// Write both files. Used by the training job.
    pub fn save(&self, model_path: &Path, vocab_path: &Path) -> Result<()> {
        write_json(model_path, &self.model)?;
        write_json(vocab_path, &self.vocabulary)?;
        Ok(())
    }

    pub fn model(&self) -> &BackoffModel {
        &self.model
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| MusicError::ArtifactCorrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let data = serde_json::to_string(value).map_err(std::io::Error::other)?;
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_artifact() -> ModelArtifact {
        let vocab = Vocabulary::from_corpus(&["C4", "D4", "E4"]);
        let mut model = BackoffModel::new(2, 3, 1);
        model.observe(&[0, 1], 2);
        ModelArtifact::new(model, vocab).unwrap()
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model/model.json");
        let vocab_path = dir.path().join("model/vocab.json");
        small_artifact().save(&model_path, &vocab_path).unwrap();

        let loaded = ModelArtifact::load(&model_path, &vocab_path).unwrap();
        assert_eq!(loaded.vocabulary().size(), 3);
        assert_eq!(loaded.model().window_len(), 2);
    }

    #[test]
    fn missing_vocabulary_is_artifact_missing() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        let vocab_path = dir.path().join("vocab.json");
        small_artifact().save(&model_path, &vocab_path).unwrap();
        std::fs::remove_file(&vocab_path).unwrap();

        match ModelArtifact::load(&model_path, &vocab_path) {
            Err(MusicError::ArtifactMissing(p)) => assert_eq!(p, vocab_path),
            other => panic!("expected ArtifactMissing, got {other:?}"),
        }
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let vocab = Vocabulary::from_corpus(&["C4", "D4"]);
        let model = BackoffModel::new(2, 3, 1);
        assert!(matches!(
            ModelArtifact::new(model, vocab),
            Err(MusicError::ArtifactMismatch {
                model: 3,
                vocabulary: 2
            })
        ));
    }

    #[test]
    fn mismatched_files_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        let vocab_path = dir.path().join("vocab.json");
        small_artifact().save(&model_path, &vocab_path).unwrap();
        std::fs::write(&vocab_path, r#"["C4", "D4"]"#).unwrap();
        match ModelArtifact::load(&model_path, &vocab_path) {
            Err(MusicError::ArtifactCorrupt { path, .. }) => assert_eq!(path, vocab_path),
            other => panic!("expected ArtifactCorrupt, got {other:?}"),
        }
    }

    #[test]
    fn zero_window_model_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        let vocab_path = dir.path().join("vocab.json");
        let vocab = Vocabulary::from_corpus(&["C4", "D4"]);
        ModelArtifact::new(BackoffModel::new(0, 2, 1), vocab)
            .unwrap()
            .save(&model_path, &vocab_path)
            .unwrap();

        match ModelArtifact::load(&model_path, &vocab_path) {
            Err(MusicError::ArtifactCorrupt { path, reason }) => {
                assert_eq!(path, model_path);
                assert!(reason.contains("window"));
            }
            other => panic!("expected ArtifactCorrupt, got {other:?}"),
        }
    }

    #[test]
    fn garbage_model_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        let vocab_path = dir.path().join("vocab.json");
        std::fs::write(&model_path, "not json").unwrap();
        std::fs::write(&vocab_path, r#"["C4"]"#).unwrap();
        assert!(matches!(
            ModelArtifact::load(&model_path, &vocab_path),
            Err(MusicError::ArtifactCorrupt { .. })
        ));
    }
}
