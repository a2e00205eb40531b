use serde::{Deserialize, Serialize};

pub const DEFAULT_SEMANTIC_THRESHOLD: f32 = 0.55;
pub const DEFAULT_FUZZY_THRESHOLD: f32 = 75.0;
pub const DEFAULT_REQUIRED_PASS_RATE: f32 = 0.85;
pub const DEFAULT_EMBEDDING_DIM: usize = 384;
pub const DEFAULT_CORPUS_PATH: &str = "data/college_faq.csv";
pub const DEFAULT_UNANSWERED_LOG_PATH: &str = "unanswered_queries.txt";
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "I'm sorry, I couldn't understand that. Could you please rephrase or contact us at 8887776660?";

/// Both thresholds are exclusive lower bounds on their own scales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Cosine similarity, conceptually [-1, 1].
    pub semantic_threshold: f32,
    /// Token-sort ratio, [0, 100].
    pub fuzzy_threshold: f32,
    pub fallback_message: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }
}
