use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub utterance: String,
    pub intent: String,
    pub response: String,
}

impl CorpusRecord {
    pub fn new(
        utterance: impl Into<String>,
        intent: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            utterance: utterance.into(),
            intent: intent.into(),
            response: response.into(),
        }
    }
}

/// Ordered, read-only table of records. Position is the record's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    records: Vec<CorpusRecord>,
}

impl Corpus {
    /// Returns `None` for an empty record list.
    pub fn new(records: Vec<CorpusRecord>) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Self { records })
        }
    }

    pub fn records(&self) -> &[CorpusRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&CorpusRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn utterances(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.utterance.as_str())
    }

    /// First record, in corpus order, labelled with `intent`, with its index.
    pub fn first_with_intent(&self, intent: &str) -> Option<(usize, &CorpusRecord)> {
        self.records
            .iter()
            .enumerate()
            .find(|(_, r)| r.intent == intent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Semantic,
    Fuzzy,
    Classified,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestScore {
    pub index: usize,
    pub score: f32,
}

/// Per-query scores aligned to corpus positions.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector(Vec<f32>);

impl ScoreVector {
    pub fn new(scores: Vec<f32>) -> Self {
        Self(scores)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Highest score; the lowest index wins ties. NaN scores are never selected.
    pub fn best(&self) -> Option<BestScore> {
        let mut best: Option<BestScore> = None;
        for (index, &score) in self.0.iter().enumerate() {
            if score.is_nan() {
                continue;
            }
            match best {
                Some(b) if score <= b.score => {}
                _ => best = Some(BestScore { index, score }),
            }
        }
        best
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub response: String,
    pub decision: Decision,
    pub matched_index: Option<usize>,
    pub semantic: Option<BestScore>,
    pub fuzzy: Option<BestScore>,
    pub intent: Option<String>,
}
