// Backoff model training from a corpus token list.
//
// The vocabulary is the sorted set of distinct tokens. Every position i with a
// full window behind it is one training pair: the window `i..i + window_len`
// predicts the token at `i + window_len`. Each pair is counted under every
// context suffix up to the model order, plus the unigram table.
//
// Nothing is written unless training succeeds.

use crate::error::{CorpusError, Result};
use melodist_music::artifact::ModelArtifact;
use melodist_music::model::{BackoffModel, DEFAULT_ORDER, DEFAULT_WINDOW_LEN};
use melodist_music::vocab::Vocabulary;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Tokens of context the model conditions on.
    pub window_len: usize,
    /// Longest context suffix with its own count table.
    pub order: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            window_len: DEFAULT_WINDOW_LEN,
            order: DEFAULT_ORDER,
        }
    }
}

pub fn train<S: AsRef<str>>(
    tokens: &[S],
    config: &TrainConfig,
) -> Result<(BackoffModel, Vocabulary)> {
    if config.window_len == 0 {
        return Err(CorpusError::InvalidConfig(
            "window length must be at least 1".into(),
        ));
    }
    let need = config.window_len + 1;
    if tokens.len() < need {
        return Err(CorpusError::InsufficientTokens {
            have: tokens.len(),
            need,
        });
    }

    let vocabulary = Vocabulary::from_corpus(tokens);
    let indices: Vec<usize> = tokens
        .iter()
        .filter_map(|t| vocabulary.index_of(t.as_ref()))
        .collect();

    let mut model = BackoffModel::new(config.window_len, vocabulary.size(), config.order);
    for pair in indices.windows(need) {
        let (window, target) = pair.split_at(config.window_len);
        model.observe(window, target[0]);
    }

    info!(
        tokens = tokens.len(),
        vocab = vocabulary.size(),
        pairs = indices.len() - config.window_len,
        order = model.order(),
        "trained model"
    );
    Ok((model, vocabulary))
}

/// Train and write both artifact files.
pub fn train_to_files<S: AsRef<str>>(
    tokens: &[S],
    config: &TrainConfig,
    model_out: &Path,
    vocab_out: &Path,
) -> Result<ModelArtifact> {
    let (model, vocabulary) = train(tokens, config)?;
    let artifact = ModelArtifact::new(model, vocabulary)?;
    artifact.save(model_out, vocab_out)?;
    info!(
        model = %model_out.display(),
        vocab = %vocab_out.display(),
        "saved model artifact"
    );
    Ok(artifact)
}
