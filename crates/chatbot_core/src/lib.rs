pub mod classifier;
pub mod config;
pub mod corpus;
pub mod embed;
pub mod error;
pub mod eval;
pub mod fuzzy;
pub mod matcher;
pub mod minilm_embed;
pub mod model;
pub mod scoring;
pub mod unanswered;

pub use classifier::{ClassifierScorer, Prediction};
pub use config::{
    MatcherConfig, DEFAULT_CORPUS_PATH, DEFAULT_EMBEDDING_DIM, DEFAULT_FALLBACK_MESSAGE,
    DEFAULT_FUZZY_THRESHOLD, DEFAULT_REQUIRED_PASS_RATE, DEFAULT_SEMANTIC_THRESHOLD,
    DEFAULT_UNANSWERED_LOG_PATH,
};
pub use corpus::{load_corpus_csv, load_corpus_reader};
pub use embed::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{ChatError, Result};
pub use eval::{evaluate_cases, read_eval_cases, EvalCase, EvalOutcome, EvalSummary};
pub use fuzzy::{token_sort_ratio, FuzzyScorer};
pub use matcher::{decide, Matcher, Policy};
pub use minilm_embed::MiniLmEmbeddingProvider;
pub use model::{BestScore, Corpus, CorpusRecord, Decision, MatchOutcome, ScoreVector};
pub use scoring::{cosine_similarity, Scorer, SemanticScorer};
pub use unanswered::{format_entry, DiscardQueryLog, FileQueryLog, QueryLog};
