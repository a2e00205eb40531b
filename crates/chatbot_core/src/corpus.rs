use crate::error::{ChatError, Result};
use crate::model::{Corpus, CorpusRecord};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const UTTERANCE_COLUMN: &str = "user_utterances";
pub const INTENT_COLUMN: &str = "intent";
pub const RESPONSE_COLUMN: &str = "response";

const REQUIRED_COLUMNS: [&str; 3] = [UTTERANCE_COLUMN, INTENT_COLUMN, RESPONSE_COLUMN];

#[derive(Debug, Deserialize)]
struct RawRecord {
    user_utterances: String,
    intent: String,
    response: String,
}

impl From<RawRecord> for CorpusRecord {
    fn from(raw: RawRecord) -> Self {
        CorpusRecord {
            utterance: raw.user_utterances,
            intent: raw.intent,
            response: raw.response,
        }
    }
}

pub fn load_corpus_csv(path: &Path) -> Result<Corpus> {
    let file = File::open(path)
        .map_err(|e| ChatError::Load(format!("open {}: {e}", path.display())))?;
    load_corpus_reader(file)
        .map_err(|e| ChatError::Load(format!("{}: {}", path.display(), load_message(e))))
}

/// Reads a headed CSV table. Columns may come in any order; extra columns are ignored.
pub fn load_corpus_reader<R: Read>(reader: R) -> Result<Corpus> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| ChatError::Load(format!("read header row: {e}")))?
        .clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(ChatError::Load(format!("missing column '{column}'")));
        }
    }

    let mut records = Vec::new();
    for (row, raw) in rdr.deserialize::<RawRecord>().enumerate() {
        let raw = raw.map_err(|e| ChatError::Load(format!("row {}: {e}", row + 1)))?;
        records.push(CorpusRecord::from(raw));
    }

    Corpus::new(records).ok_or_else(|| ChatError::Load("corpus has no records".to_string()))
}

fn load_message(err: ChatError) -> String {
    match err {
        ChatError::Load(msg) => msg,
        other => other.to_string(),
    }
}
