use std::path::PathBuf;

use anyhow::{Context, Result};
use chatbot_core::{
    load_corpus_csv, EmbeddingProvider, FileQueryLog, HashEmbeddingProvider, Matcher,
    MatcherConfig, MiniLmEmbeddingProvider, QueryLog, DEFAULT_CORPUS_PATH,
    DEFAULT_EMBEDDING_DIM, DEFAULT_FALLBACK_MESSAGE, DEFAULT_FUZZY_THRESHOLD,
    DEFAULT_SEMANTIC_THRESHOLD, DEFAULT_UNANSWERED_LOG_PATH,
};
use clap::{Args, ValueEnum};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    /// Bag-of-words intent classifier; always answers.
    Classifier,
    /// Semantic then fuzzy matching with a logged fallback.
    Hybrid,
}

#[derive(Debug, Args)]
pub struct EngineArgs {
    /// CSV with user_utterances, intent and response columns.
    #[arg(long, global = true, env = "CHATBOT_CORPUS", default_value = DEFAULT_CORPUS_PATH)]
    pub corpus: PathBuf,

    /// all-MiniLM-L6-v2 weights (.safetensors). Requires --tokenizer-path.
    #[arg(long, global = true, env = "CHATBOT_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// tokenizer.json matching --model-path.
    #[arg(long, global = true, env = "CHATBOT_TOKENIZER_PATH")]
    pub tokenizer_path: Option<PathBuf>,

    /// Dimension of the hashed embeddings used when no model is given.
    #[arg(long, global = true, default_value_t = DEFAULT_EMBEDDING_DIM)]
    pub embedding_dim: usize,

    /// Skip the semantic stage and match on fuzzy score only.
    #[arg(long, global = true)]
    pub no_semantic: bool,

    #[arg(long, global = true, default_value_t = DEFAULT_SEMANTIC_THRESHOLD)]
    pub semantic_threshold: f32,

    #[arg(long, global = true, default_value_t = DEFAULT_FUZZY_THRESHOLD)]
    pub fuzzy_threshold: f32,

    /// Where unanswered queries are appended.
    #[arg(
        long,
        global = true,
        env = "CHATBOT_UNANSWERED_LOG",
        default_value = DEFAULT_UNANSWERED_LOG_PATH
    )]
    pub unanswered_log: PathBuf,
}

impl EngineArgs {
    pub fn validate(&self) -> Result<(), String> {
        if !(-1.0..=1.0).contains(&self.semantic_threshold) {
            return Err("semantic-threshold must be within [-1, 1]".to_string());
        }
        if !(0.0..=100.0).contains(&self.fuzzy_threshold) {
            return Err("fuzzy-threshold must be within [0, 100]".to_string());
        }
        if self.model_path.is_some() != self.tokenizer_path.is_some() {
            return Err("--model-path and --tokenizer-path must both be provided".to_string());
        }
        if self.no_semantic && self.model_path.is_some() {
            return Err("--no-semantic conflicts with --model-path".to_string());
        }
        Ok(())
    }

    pub fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            semantic_threshold: self.semantic_threshold,
            fuzzy_threshold: self.fuzzy_threshold,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }

    pub fn file_log(&self) -> Box<dyn QueryLog> {
        Box::new(FileQueryLog::new(&self.unanswered_log))
    }

    fn make_embedder(&self) -> Result<Option<Box<dyn EmbeddingProvider>>> {
        if self.no_semantic {
            return Ok(None);
        }
        match (&self.model_path, &self.tokenizer_path) {
            (Some(model), Some(tokenizer)) => {
                info!(model = %model.display(), "Loading embedding model");
                let provider = MiniLmEmbeddingProvider::load(model, tokenizer)?;
                Ok(Some(Box::new(provider)))
            }
            (None, None) => Ok(Some(Box::new(HashEmbeddingProvider::new(
                self.embedding_dim,
            )))),
            _ => anyhow::bail!("--model-path and --tokenizer-path must both be provided"),
        }
    }

    pub fn build_matcher(&self, kind: PolicyKind, log: Box<dyn QueryLog>) -> Result<Matcher> {
        let corpus = load_corpus_csv(&self.corpus)?;
        info!(
            records = corpus.len(),
            path = %self.corpus.display(),
            "Loaded corpus"
        );

        let matcher = match kind {
            PolicyKind::Classifier => Matcher::classifier(corpus, self.matcher_config(), log)?,
            PolicyKind::Hybrid => {
                let embedder = self.make_embedder().context("initialise embedding model")?;
                Matcher::hybrid(corpus, embedder, self.matcher_config(), log)?
            }
        };
        Ok(matcher)
    }
}
