use crate::classifier::ClassifierScorer;
use crate::config::MatcherConfig;
use crate::embed::EmbeddingProvider;
use crate::error::{ChatError, Result};
use crate::fuzzy::FuzzyScorer;
use crate::model::{BestScore, Corpus, Decision, MatchOutcome};
use crate::scoring::{Scorer, SemanticScorer};
use crate::unanswered::QueryLog;
use tracing::{debug, info, warn};

/// How a matcher picks a response. Built from the matcher's own corpus at construction.
pub enum Policy {
    /// Predict an intent and answer with the first record carrying it. Never falls back.
    Classifier(ClassifierScorer),
    /// Semantic match first, fuzzy match second, otherwise log and fall back.
    Hybrid {
        semantic: Option<SemanticScorer>,
        fuzzy: FuzzyScorer,
    },
}

impl Policy {
    fn classifier(corpus: &Corpus) -> Result<Self> {
        let clf = ClassifierScorer::fit(corpus)?;
        info!(
            classes = clf.classes().len(),
            vocabulary = clf.vocabulary_size(),
            "Fitted intent classifier"
        );
        Ok(Policy::Classifier(clf))
    }

    /// Without an embedder the semantic stage never matches.
    fn hybrid(corpus: &Corpus, embedder: Option<Box<dyn EmbeddingProvider>>) -> Result<Self> {
        let semantic = embedder
            .map(|e| SemanticScorer::precompute(corpus, e))
            .transpose()?;
        if semantic.is_none() {
            warn!("No embedding model configured; matching on fuzzy score only");
        }
        Ok(Policy::Hybrid {
            semantic,
            fuzzy: FuzzyScorer::precompute(corpus),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Policy::Classifier(_) => "classifier",
            Policy::Hybrid { .. } => "hybrid",
        }
    }
}

/// Ordered threshold check: semantic strictly above its threshold wins, then fuzzy.
/// Returns the decision and the index of the chosen record.
pub fn decide(
    semantic: Option<BestScore>,
    fuzzy: Option<BestScore>,
    config: &MatcherConfig,
) -> (Decision, Option<usize>) {
    if let Some(best) = semantic.filter(|b| b.score > config.semantic_threshold) {
        return (Decision::Semantic, Some(best.index));
    }
    if let Some(best) = fuzzy.filter(|b| b.score > config.fuzzy_threshold) {
        return (Decision::Fuzzy, Some(best.index));
    }
    (Decision::Fallback, None)
}

pub struct Matcher {
    corpus: Corpus,
    policy: Policy,
    config: MatcherConfig,
    log: Box<dyn QueryLog>,
}

impl Matcher {
    /// Fits the intent classifier on `corpus`.
    pub fn classifier(
        corpus: Corpus,
        config: MatcherConfig,
        log: Box<dyn QueryLog>,
    ) -> Result<Self> {
        let policy = Policy::classifier(&corpus)?;
        Ok(Self {
            corpus,
            policy,
            config,
            log,
        })
    }

    /// Precomputes semantic (when `embedder` is given) and fuzzy state for `corpus`.
    pub fn hybrid(
        corpus: Corpus,
        embedder: Option<Box<dyn EmbeddingProvider>>,
        config: MatcherConfig,
        log: Box<dyn QueryLog>,
    ) -> Result<Self> {
        let policy = Policy::hybrid(&corpus, embedder)?;
        Ok(Self {
            corpus,
            policy,
            config,
            log,
        })
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn respond(&self, query: &str) -> Result<String> {
        self.match_query(query).map(|outcome| outcome.response)
    }

    pub fn match_query(&self, query: &str) -> Result<MatchOutcome> {
        match &self.policy {
            Policy::Classifier(clf) => self.match_by_intent(clf, query),
            Policy::Hybrid { semantic, fuzzy } => {
                Ok(self.match_hybrid(semantic.as_ref(), fuzzy, query))
            }
        }
    }

    fn match_by_intent(&self, clf: &ClassifierScorer, query: &str) -> Result<MatchOutcome> {
        let prediction = clf.predict(query);
        let (index, record) = self
            .corpus
            .first_with_intent(&prediction.intent)
            .ok_or_else(|| ChatError::UnknownIntent(prediction.intent.clone()))?;
        debug!(intent = %prediction.intent, index, "Classified query");

        Ok(MatchOutcome {
            response: record.response.clone(),
            decision: Decision::Classified,
            matched_index: Some(index),
            semantic: None,
            fuzzy: None,
            intent: Some(prediction.intent),
        })
    }

    fn utterance_at(&self, index: usize) -> &str {
        self.corpus
            .get(index)
            .map_or("", |record| record.utterance.as_str())
    }

    fn match_hybrid(
        &self,
        semantic: Option<&SemanticScorer>,
        fuzzy: &FuzzyScorer,
        query: &str,
    ) -> MatchOutcome {
        let semantic_best = semantic.and_then(|s| match s.score(query) {
            Ok(scores) => scores.best(),
            Err(err) => {
                warn!(error = %err, "Semantic scorer failed; deciding on fuzzy score alone");
                None
            }
        });
        if let Some(best) = semantic_best {
            info!(
                score = format_args!("{:.2}", best.score),
                utterance = self.utterance_at(best.index),
                "Semantic match score"
            );
        }

        // Computed even when the semantic stage will match, for the log line.
        let fuzzy_best = match fuzzy.score(query) {
            Ok(scores) => scores.best(),
            Err(err) => {
                warn!(error = %err, "Fuzzy scorer failed");
                None
            }
        };
        if let Some(best) = fuzzy_best {
            info!(
                score = format_args!("{:.0}", best.score),
                utterance = self.utterance_at(best.index),
                "Fuzzy match score"
            );
        }

        let (decision, matched_index) = decide(semantic_best, fuzzy_best, &self.config);
        let response = match matched_index.and_then(|i| self.corpus.get(i)) {
            Some(record) => record.response.clone(),
            None => {
                if let Err(err) = self.log.record(query) {
                    warn!(error = %err, "Failed to record unanswered query");
                }
                self.config.fallback_message.clone()
            }
        };

        MatchOutcome {
            response,
            decision,
            matched_index,
            semantic: semantic_best,
            fuzzy: fuzzy_best,
            intent: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbeddingProvider;
    use crate::model::CorpusRecord;
    use crate::unanswered::{DiscardQueryLog, FileQueryLog, TIMESTAMP_FORMAT};
    use chrono::NaiveDateTime;
    use std::path::Path;

    const FEES: &str = "Fees are $500/semester.";

    /// Fails on text without lowercase letters, so corpus precompute still succeeds.
    struct FlakyEmbedder(HashEmbeddingProvider);

    impl EmbeddingProvider for FlakyEmbedder {
        fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            if !text.chars().any(char::is_lowercase) {
                anyhow::bail!("model unavailable");
            }
            self.0.embed(text)
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn fees_corpus() -> Corpus {
        Corpus::new(vec![CorpusRecord::new("What are the fees?", "fees", FEES)]).expect("corpus")
    }

    fn college_corpus() -> Corpus {
        Corpus::new(vec![
            CorpusRecord::new("What are the fees?", "fees", FEES),
            CorpusRecord::new("How much is the tuition fee", "fees", "Tuition is $500."),
            CorpusRecord::new("Where is the library?", "library", "Block B, ground floor."),
            CorpusRecord::new("library opening hours", "library", "9am to 5pm."),
            CorpusRecord::new("Do you offer hostel rooms?", "hostel", "Yes, for 200 students."),
            CorpusRecord::new("hello there", "greeting", "Hi! How can I help?"),
        ])
        .expect("corpus")
    }

    fn hybrid(corpus: Corpus, log: Box<dyn QueryLog>) -> Matcher {
        let embedder: Box<dyn EmbeddingProvider> = Box::new(HashEmbeddingProvider::default());
        Matcher::hybrid(corpus, Some(embedder), MatcherConfig::default(), log).expect("matcher")
    }

    fn fuzzy_only(corpus: Corpus, log: Box<dyn QueryLog>) -> Matcher {
        Matcher::hybrid(corpus, None, MatcherConfig::default(), log).expect("matcher")
    }

    fn log_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn best(index: usize, score: f32) -> Option<BestScore> {
        Some(BestScore { index, score })
    }

    #[test]
    fn verbatim_utterances_return_their_response() {
        let matcher = hybrid(college_corpus(), Box::new(DiscardQueryLog));
        for record in college_corpus().records() {
            assert_eq!(
                matcher.respond(&record.utterance).unwrap(),
                record.response,
                "{}",
                record.utterance
            );
        }
    }

    #[test]
    fn semantic_threshold_is_exclusive() {
        let config = MatcherConfig::default();

        assert_eq!(
            decide(best(0, 0.55), best(1, 80.0), &config),
            (Decision::Fuzzy, Some(1))
        );
        assert_eq!(
            decide(best(0, 0.55), best(1, 10.0), &config),
            (Decision::Fallback, None)
        );
        assert_eq!(
            decide(best(0, 0.5501), best(1, 99.0), &config),
            (Decision::Semantic, Some(0))
        );
    }

    #[test]
    fn fuzzy_threshold_is_exclusive() {
        let config = MatcherConfig::default();
        assert_eq!(
            decide(None, best(2, 75.0), &config),
            (Decision::Fallback, None)
        );
        assert_eq!(
            decide(None, best(2, 75.5), &config),
            (Decision::Fuzzy, Some(2))
        );
    }

    #[test]
    fn paraphrase_matches_semantically() {
        let matcher = hybrid(fees_corpus(), Box::new(DiscardQueryLog));
        let outcome = matcher.match_query("what r the fees").unwrap();

        assert_eq!(outcome.decision, Decision::Semantic);
        assert_eq!(outcome.response, FEES);
        // both stages always run
        assert!(outcome.semantic.is_some());
        assert!(outcome.fuzzy.is_some());
    }

    #[test]
    fn unrelated_query_falls_back_and_logs_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unanswered_queries.txt");
        let matcher = hybrid(fees_corpus(), Box::new(FileQueryLog::new(&path)));

        let query = "asdkjasd completely unrelated";
        let outcome = matcher.match_query(query).unwrap();
        assert_eq!(outcome.decision, Decision::Fallback);
        assert_eq!(outcome.response, MatcherConfig::default().fallback_message);

        let lines = log_lines(&path);
        assert_eq!(lines.len(), 1);
        let (stamp, rest) = lines[0]
            .strip_prefix('[')
            .and_then(|l| l.split_once("] "))
            .expect("bracketed timestamp");
        assert!(NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok(), "{stamp}");
        assert_eq!(rest, query);
    }

    #[test]
    fn fallback_preserves_raw_query_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let matcher = fuzzy_only(fees_corpus(), Box::new(FileQueryLog::new(&path)));

        for query in ["  ZZZ qqq  ", "", "   ", "ñandú ☃"] {
            assert_eq!(
                matcher.match_query(query).unwrap().decision,
                Decision::Fallback,
                "{query:?}"
            );
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let queries: Vec<&str> = content
            .lines()
            .map(|l| l.split_once("] ").map(|(_, q)| q).unwrap_or(""))
            .collect();
        assert_eq!(queries, vec!["  ZZZ qqq  ", "", "   ", "ñandú ☃"]);
    }

    #[test]
    fn case_and_punctuation_variant_matches_without_semantic_scorer() {
        let matcher = fuzzy_only(fees_corpus(), Box::new(DiscardQueryLog));
        let outcome = matcher.match_query("WHAT ARE THE FEES").unwrap();

        assert_eq!(outcome.decision, Decision::Fuzzy);
        assert_eq!(outcome.response, FEES);
        assert!(outcome.semantic.is_none());
    }

    #[test]
    fn semantic_failure_degrades_to_fuzzy() {
        let embedder: Box<dyn EmbeddingProvider> =
            Box::new(FlakyEmbedder(HashEmbeddingProvider::default()));
        let matcher = Matcher::hybrid(
            fees_corpus(),
            Some(embedder),
            MatcherConfig::default(),
            Box::new(DiscardQueryLog),
        )
        .unwrap();

        let outcome = matcher.match_query("WHAT ARE THE FEES").unwrap();
        assert_eq!(outcome.decision, Decision::Fuzzy);
        assert_eq!(outcome.response, FEES);
    }

    #[test]
    fn log_failure_never_blocks_the_response() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileQueryLog::new(dir.path().join("no-such-dir").join("log.txt"));
        let matcher = hybrid(fees_corpus(), Box::new(log));

        let response = matcher.respond("asdkjasd completely unrelated").unwrap();
        assert_eq!(response, MatcherConfig::default().fallback_message);
    }

    #[test]
    fn repeated_queries_are_deterministic_and_leave_state_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let matcher = hybrid(college_corpus(), Box::new(FileQueryLog::new(&path)));

        for query in ["where is the library", "qwpoeiru zmxnbv"] {
            let first = matcher.match_query(query).unwrap();
            let second = matcher.match_query(query).unwrap();
            assert_eq!(first, second);
        }
        assert_eq!(matcher.corpus(), &college_corpus());
        assert_eq!(log_lines(&path).len(), 2);
    }

    #[test]
    fn classifier_policy_always_answers() {
        let matcher = Matcher::classifier(
            college_corpus(),
            MatcherConfig::default(),
            Box::new(DiscardQueryLog),
        )
        .unwrap();

        let outcome = matcher.match_query("how much are the fees").unwrap();
        assert_eq!(outcome.decision, Decision::Classified);
        assert_eq!(outcome.intent.as_deref(), Some("fees"));
        // first record with the intent, by corpus order
        assert_eq!(outcome.matched_index, Some(0));
        assert_eq!(outcome.response, FEES);

        let gibberish = matcher.match_query("asdkjasd").unwrap();
        assert_eq!(gibberish.decision, Decision::Classified);
    }

    #[test]
    fn every_predicted_intent_resolves_in_own_corpus() {
        let matcher = Matcher::classifier(
            college_corpus(),
            MatcherConfig::default(),
            Box::new(DiscardQueryLog),
        )
        .unwrap();
        let Policy::Classifier(clf) = matcher.policy() else {
            panic!("expected classifier policy");
        };
        for intent in clf.classes() {
            assert!(matcher.corpus().first_with_intent(intent).is_some(), "{intent}");
        }
        for query in ["where is the library", "hostel", "zzz", ""] {
            assert!(matcher.match_query(query).is_ok(), "{query:?}");
        }
    }

    #[test]
    fn outcome_index_always_points_into_own_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        // A one-record corpus: "where is the library" has nothing to match here.
        let matcher = hybrid(fees_corpus(), Box::new(FileQueryLog::new(&path)));

        let outcome = matcher.match_query("where is the library").unwrap();
        assert_eq!(outcome.decision, Decision::Fallback);
        assert_eq!(outcome.matched_index, None);
        for best in [outcome.semantic, outcome.fuzzy].into_iter().flatten() {
            assert!(matcher.corpus().get(best.index).is_some());
        }
        assert_eq!(log_lines(&path).len(), 1);

        let big = hybrid(college_corpus(), Box::new(DiscardQueryLog));
        for query in ["where is the library", "fees", "hello", "qwpoeiru"] {
            let outcome = big.match_query(query).unwrap();
            assert_eq!(outcome.matched_index.is_some(), outcome.decision != Decision::Fallback);
            if let Some(index) = outcome.matched_index {
                assert_eq!(outcome.response, big.corpus().records()[index].response);
            }
        }
    }
}
