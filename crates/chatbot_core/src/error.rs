use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("failed to load corpus: {0}")]
    Load(String),

    #[error("scorer initialisation failed: {0}")]
    ScorerInit(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("no corpus record carries predicted intent '{0}'")]
    UnknownIntent(String),

    #[error("failed to append to unanswered log {path}: {source}")]
    LogWrite {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
