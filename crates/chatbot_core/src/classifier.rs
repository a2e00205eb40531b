//! Bag-of-words multinomial naive Bayes over corpus intents.
//!
//! - tokens are lowercased runs of two or more word characters
//! - additive smoothing with alpha = 1, priors from class frequencies
//! - classes are ordered lexicographically; the earliest class wins ties
//! - tokens outside the fitted vocabulary are ignored at prediction time

use crate::error::{ChatError, Result};
use crate::model::Corpus;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

const ALPHA: f64 = 1.0;

pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub intent: String,
    pub log_likelihood: f64,
}

#[derive(Debug, Clone)]
pub struct ClassifierScorer {
    vocabulary: HashMap<String, usize>,
    classes: Vec<String>,
    class_log_prior: Vec<f64>,
    // log P(token | class), one row per class
    feature_log_prob: Vec<Vec<f64>>,
}

impl ClassifierScorer {
    pub fn fit(corpus: &Corpus) -> Result<Self> {
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        for utterance in corpus.utterances() {
            for token in tokenize(utterance) {
                let next = vocabulary.len();
                vocabulary.entry(token).or_insert(next);
            }
        }
        if vocabulary.is_empty() {
            return Err(ChatError::ScorerInit(
                "empty vocabulary: no utterance contains a word of two or more characters"
                    .to_string(),
            ));
        }

        let classes: Vec<String> = corpus
            .records()
            .iter()
            .map(|r| r.intent.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let class_index: HashMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let vocab_size = vocabulary.len();
        let mut doc_counts = vec![0usize; classes.len()];
        let mut token_counts = vec![vec![0usize; vocab_size]; classes.len()];

        for record in corpus.records() {
            let c = class_index[record.intent.as_str()];
            doc_counts[c] += 1;
            for token in tokenize(&record.utterance) {
                if let Some(&f) = vocabulary.get(&token) {
                    token_counts[c][f] += 1;
                }
            }
        }

        let total_docs = corpus.len() as f64;
        let class_log_prior = doc_counts
            .iter()
            .map(|&n| (n as f64 / total_docs).ln())
            .collect();
        let feature_log_prob = token_counts
            .iter()
            .map(|row| {
                let denom = (row.iter().sum::<usize>() as f64 + ALPHA * vocab_size as f64).ln();
                row.iter()
                    .map(|&n| (n as f64 + ALPHA).ln() - denom)
                    .collect()
            })
            .collect();

        Ok(Self {
            vocabulary,
            classes,
            class_log_prior,
            feature_log_prob,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn predict(&self, query: &str) -> Prediction {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokenize(query) {
            if let Some(&f) = self.vocabulary.get(&token) {
                *counts.entry(f).or_default() += 1.0;
            }
        }

        let mut best = 0usize;
        let mut best_ll = f64::NEG_INFINITY;
        for (c, prior) in self.class_log_prior.iter().enumerate() {
            let ll = prior
                + counts
                    .iter()
                    .map(|(&f, &n)| n * self.feature_log_prob[c][f])
                    .sum::<f64>();
            if ll > best_ll {
                best = c;
                best_ll = ll;
            }
        }

        Prediction {
            intent: self.classes[best].clone(),
            log_likelihood: best_ll,
        }
    }
}
