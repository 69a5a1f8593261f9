// Sequence model: maps a fixed-length window of token indices to a
// probability distribution over the vocabulary.
//
// The sampler only sees the `SequenceModel` trait, so any predictor (the
// count-based `BackoffModel` below, or a test double) can drive generation.
//
// `BackoffModel` is the artifact the training job writes. It keeps count
// tables for context orders `order` down to 1, where an order-k context is
// the last k indices of the window, plus unigram counts. Prediction uses the
// highest order whose table knows the window's suffix and backs off from
// there, the same Katz-style scheme as a melodic n-gram model, only over
// vocabulary indices instead of intervals. Tables are keyed by the
// comma-joined context so the JSON artifact stays readable.

use crate::error::{MusicError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Window length the training job uses unless told otherwise.
pub const DEFAULT_WINDOW_LEN: usize = 100;

/// Longest context suffix the training job counts by default.
pub const DEFAULT_ORDER: usize = 3;

/// Opaque next-token predictor.
///
/// Implementations must be stateless across calls: `predict` may be invoked
/// concurrently from several requests sharing one loaded model.
pub trait SequenceModel: Send + Sync {
    /// Exact window length `predict` accepts.
    fn window_len(&self) -> usize;

    /// Vocabulary cardinality V the distribution ranges over.
    fn vocab_size(&self) -> usize;

    /// Distribution of length V for the token following `window`.
    fn predict(&self, window: &[usize]) -> Result<Vec<f64>>;
}

/// Next-index counts observed after one context.
pub type CountTable = BTreeMap<usize, f64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffModel {
    pub window_len: usize,
    pub vocab_size: usize,
    /// `contexts[k - 1]` holds the order-k tables.
    pub contexts: Vec<BTreeMap<String, CountTable>>,
    /// Overall next-index counts.
    pub unigram: CountTable,
}

impl BackoffModel {
    /// An untrained model: predicts uniformly until counts are added.
    pub fn new(window_len: usize, vocab_size: usize, order: usize) -> Self {
        let order = order.clamp(1, window_len.max(1));
        BackoffModel {
            window_len,
            vocab_size,
            contexts: vec![BTreeMap::new(); order],
            unigram: CountTable::new(),
        }
    }

    pub fn order(&self) -> usize {
        self.contexts.len()
    }

    /// Record one training pair: `next` followed `window`.
    pub fn observe(&mut self, window: &[usize], next: usize) {
        *self.unigram.entry(next).or_insert(0.0) += 1.0;
        for k in 1..=self.contexts.len().min(window.len()) {
            let key = context_key(&window[window.len() - k..]);
            *self.contexts[k - 1]
                .entry(key)
                .or_default()
                .entry(next)
                .or_insert(0.0) += 1.0;
        }
    }

    fn check_window(&self, window: &[usize]) -> Result<()> {
        if window.len() != self.window_len {
            return Err(MusicError::InferenceFailure(format!(
                "window has {} entries, model expects {}",
                window.len(),
                self.window_len
            )));
        }
        if let Some(&bad) = window.iter().find(|&&i| i >= self.vocab_size) {
            return Err(MusicError::InferenceFailure(format!(
                "window index {bad} outside vocabulary of {}",
                self.vocab_size
            )));
        }
        Ok(())
    }

    /// Normalize a count table into a length-V distribution, or `None` if
    /// it carries no usable mass.
    fn distribution(&self, table: &CountTable) -> Option<Vec<f64>> {
        let total: f64 = table
            .iter()
            .filter(|&(&i, _)| i < self.vocab_size)
            .map(|(_, &c)| c)
            .sum();
        if total <= 0.0 || !total.is_finite() {
            return None;
        }
        let mut dist = vec![0.0; self.vocab_size];
        for (&i, &c) in table {
            if i < self.vocab_size {
                dist[i] = c / total;
            }
        }
        Some(dist)
    }
}

impl SequenceModel for BackoffModel {
    fn window_len(&self) -> usize {
        self.window_len
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn predict(&self, window: &[usize]) -> Result<Vec<f64>> {
        self.check_window(window)?;
        if self.vocab_size == 0 {
            return Err(MusicError::InferenceFailure("empty vocabulary".into()));
        }

        for k in (1..=self.contexts.len().min(window.len())).rev() {
            let key = context_key(&window[window.len() - k..]);
            if let Some(dist) = self.contexts[k - 1]
                .get(&key)
                .and_then(|table| self.distribution(table))
            {
                return Ok(dist);
            }
        }

        Ok(self
            .distribution(&self.unigram)
            .unwrap_or_else(|| vec![1.0 / self.vocab_size as f64; self.vocab_size]))
    }
}

/// Encode a context (slice of indices) as a map key.
pub fn context_key(context: &[usize]) -> String {
    context
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trained() -> BackoffModel {
        // 0 1 2 0 1 2 0 1 2 ... with a window of 3.
        let seq: Vec<usize> = (0..30).map(|i| i % 3).collect();
        let mut model = BackoffModel::new(3, 4, 2);
        for i in 0..seq.len() - 3 {
            model.observe(&seq[i..i + 3], seq[i + 3]);
        }
        model
    }

    #[test]
    fn context_key_joins_indices() {
        assert_eq!(context_key(&[2, 10, 3]), "2,10,3");
        assert_eq!(context_key(&[]), "");
    }

    #[test]
    fn predicts_learned_continuation() {
        let model = trained();
        let dist = model.predict(&[2, 0, 1]).unwrap();
        assert_eq!(dist.len(), 4);
        assert_eq!(dist[2], 1.0);
    }

    #[test]
    fn backs_off_to_lower_order() {
        let model = trained();
        // Suffix (3, 1) was never seen; order-1 context (1) was.
        let dist = model.predict(&[0, 3, 1]).unwrap();
        assert_eq!(dist[2], 1.0);
    }

    #[test]
    fn falls_back_to_unigram_then_uniform() {
        let model = trained();
        // Index 3 never appears in training.
        let dist = model.predict(&[3, 3, 3]).unwrap();
        let sum: f64 = dist.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(dist[3], 0.0);

        let empty = BackoffModel::new(2, 4, 2);
        assert_eq!(empty.predict(&[0, 1]).unwrap(), vec![0.25; 4]);
    }

    #[test]
    fn wrong_window_length_is_inference_failure() {
        let model = trained();
        let err = model.predict(&[0, 1]).unwrap_err();
        assert!(matches!(err, MusicError::InferenceFailure(_)));
    }

    #[test]
    fn out_of_range_index_is_inference_failure() {
        let model = trained();
        let err = model.predict(&[0, 1, 9]).unwrap_err();
        assert!(matches!(err, MusicError::InferenceFailure(_)));
    }

    #[test]
    fn order_is_clamped_to_window() {
        assert_eq!(BackoffModel::new(2, 5, 8).order(), 2);
        assert_eq!(BackoffModel::new(4, 5, 0).order(), 1);
    }

    #[test]
    fn survives_json_roundtrip() {
        let model = trained();
        let json = serde_json::to_string(&model).unwrap();
        let restored: BackoffModel = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.predict(&[1, 2, 0]).unwrap(),
            model.predict(&[1, 2, 0]).unwrap()
        );
    }
}
