use crate::embed::EmbeddingProvider;
use crate::error::{ChatError, Result};
use crate::model::{Corpus, ScoreVector};
use rayon::prelude::*;
use tracing::info;

/// Scores a query against every corpus record, in corpus order.
pub trait Scorer: Send + Sync {
    fn score(&self, query: &str) -> Result<ScoreVector>;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, na, nb) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, aa, bb), (x, y)| {
            (d + (x * y), aa + (x * x), bb + (y * y))
        });

    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

/// Cosine similarity between the query embedding and each utterance embedding.
pub struct SemanticScorer {
    embedder: Box<dyn EmbeddingProvider>,
    embeddings: Vec<Vec<f32>>,
}

impl SemanticScorer {
    /// Embeds every utterance once. This is the expensive step.
    pub fn precompute(corpus: &Corpus, embedder: Box<dyn EmbeddingProvider>) -> Result<Self> {
        let embeddings = corpus
            .records()
            .par_iter()
            .map(|record| embedder.embed(&record.utterance))
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(|e| {
                ChatError::ScorerInit(format!("embed corpus with {}: {e:#}", embedder.name()))
            })?;

        info!(
            model = embedder.name(),
            utterances = embeddings.len(),
            "Precomputed utterance embeddings"
        );
        Ok(Self {
            embedder,
            embeddings,
        })
    }

    pub fn model_name(&self) -> &str {
        self.embedder.name()
    }
}

impl Scorer for SemanticScorer {
    fn score(&self, query: &str) -> Result<ScoreVector> {
        let query_embedding = self
            .embedder
            .embed(query)
            .map_err(|e| ChatError::Embedding(format!("{e:#}")))?;

        Ok(ScoreVector::new(
            self.embeddings
                .iter()
                .map(|e| cosine_similarity(&query_embedding, e))
                .collect(),
        ))
    }
}
