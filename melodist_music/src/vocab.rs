// Token vocabulary: the closed, ordered set of distinct tokens seen in
// training, with a bijective token <-> index mapping over [0, V).
//
// Built once by the training job (`melodist_corpus`) as the sorted,
// deduplicated corpus tokens and persisted as a plain JSON array in index
// order. Read-only after load; shared between concurrent requests.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build from a corpus: distinct tokens in sorted order.
    pub fn from_corpus<S: AsRef<str>>(corpus: &[S]) -> Self {
        let distinct: BTreeSet<&str> = corpus.iter().map(|t| t.as_ref()).collect();
        Self::from(distinct.into_iter().map(str::to_string).collect::<Vec<_>>())
    }

    /// Cardinality V.
    pub fn size(&self) -> usize {
        self.tokens.len()
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl From<Vec<String>> for Vocabulary {
    /// Later duplicates are dropped so the mapping stays bijective.
    fn from(list: Vec<String>) -> Self {
        let mut tokens = Vec::with_capacity(list.len());
        let mut index = HashMap::with_capacity(list.len());
        for token in list {
            if !index.contains_key(&token) {
                index.insert(token.clone(), tokens.len());
                tokens.push(token);
            }
        }
        Vocabulary { tokens, index }
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.tokens
    }
}
