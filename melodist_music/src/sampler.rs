// Autoregressive sampler.
//
// Seeds a context window of the model's fixed length with uniform random
// vocabulary indices, then repeatedly asks the model for the next-token
// distribution, takes the arg-max, and slides the window forward by one.
// Only the initial window is random: from there every step is a pure
// function of the window, so two runs differ only through the seed.
//
// Failures inside `predict` abort the whole run; there is no retry.

use crate::error::{MusicError, Result};
use crate::model::SequenceModel;
use crate::vocab::Vocabulary;
use melodist_prng::RandomSource;
use std::collections::VecDeque;

/// Fixed-length trailing history of token indices.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    indices: VecDeque<usize>,
}

impl ContextWindow {
    /// `len` independent uniform draws in [0, vocab_size).
    pub fn random(len: usize, vocab_size: usize, rng: &mut impl RandomSource) -> Self {
        let indices = (0..len).map(|_| rng.range_usize(0, vocab_size)).collect();
        ContextWindow { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Drop the oldest index and append `next`.
    pub fn advance(&mut self, next: usize) {
        self.indices.pop_front();
        self.indices.push_back(next);
    }

    /// Contiguous view, oldest first.
    pub fn as_slice(&mut self) -> &[usize] {
        self.indices.make_contiguous()
    }
}

/// Index of the first maximal entry. NaN never wins.
pub fn argmax(dist: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &p) in dist.iter().enumerate() {
        if p.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if p <= top => {}
            _ => best = Some((i, p)),
        }
    }
    best.map(|(i, _)| i)
}

/// Sample `count` vocabulary indices.
pub fn sample_indices(
    model: &dyn SequenceModel,
    count: usize,
    rng: &mut impl RandomSource,
) -> Result<Vec<usize>> {
    if count == 0 {
        return Err(MusicError::InvalidTokenCount(count));
    }
    let vocab_size = model.vocab_size();
    if vocab_size == 0 {
        return Err(MusicError::InferenceFailure("empty vocabulary".into()));
    }

    let mut window = ContextWindow::random(model.window_len(), vocab_size, rng);
    let mut output = Vec::with_capacity(count);

    for step in 0..count {
        let dist = model.predict(window.as_slice())?;
        if dist.len() != vocab_size {
            return Err(MusicError::InferenceFailure(format!(
                "step {step}: distribution has {} entries, vocabulary has {vocab_size}",
                dist.len()
            )));
        }
        let next = argmax(&dist).ok_or_else(|| {
            MusicError::InferenceFailure(format!("step {step}: distribution has no finite entry"))
        })?;
        output.push(next);
        window.advance(next);
    }

    Ok(output)
}

/// Sample `count` tokens, mapping each index through the vocabulary.
pub fn sample_tokens(
    model: &dyn SequenceModel,
    vocabulary: &Vocabulary,
    count: usize,
    rng: &mut impl RandomSource,
) -> Result<Vec<String>> {
    if model.vocab_size() != vocabulary.size() {
        return Err(MusicError::InferenceFailure(format!(
            "model covers {} tokens, vocabulary has {}",
            model.vocab_size(),
            vocabulary.size()
        )));
    }
    sample_indices(model, count, rng)?
        .into_iter()
        .map(|i| {
            vocabulary
                .token(i)
                .map(str::to_string)
                .ok_or_else(|| MusicError::InferenceFailure(format!("index {i} has no token")))
        })
        .collect()
}
