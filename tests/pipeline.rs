//! End-to-end pipeline tests with in-process fakes.
//!
//! No network access: retrieval, reranking and generation are replaced by
//! deterministic fakes, while tokenization uses the real model encoding.

use async_trait::async_trait;
use futures::stream;
use podquery::config::{Prompts, Settings};
use podquery::orchestrator::Orchestrator;
use podquery::present::{AnswerSlot, CardSlot};
use podquery::rag::{Answer, AnswerGenerator, CompletionRequest, ContextStatus, FixedGenerator};
use podquery::rerank::Reranker;
use podquery::retrieval::{GuestFilter, Retriever, SearchHit};
use podquery::tokenizer::TiktokenCounter;
use podquery::{PodqueryError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const ANSWER: &str = "Discipline is doing the work whether or not you feel like it.";

fn episode(n: usize, content: &str, length: u64) -> SearchHit {
    SearchHit {
        content: content.to_string(),
        title: format!("Episode {} Title | Guest {}", n, n),
        guest: format!("Guest {}", n),
        episode_url: format!("https://www.youtube.com/watch?v=ep{}", n),
        thumbnail_url: format!("https://i.ytimg.com/vi/ep{}/hqdefault.jpg", n),
        length,
        score: 0.5,
        ..SearchHit::default()
    }
}

fn five_hits() -> Vec<SearchHit> {
    vec![
        episode(1, "Talking about sleep and recovery routines.", 3723),
        episode(2, "Discipline equals freedom, every single morning.", 303),
        episode(3, "Motivation fades but discipline keeps you going.", 5400),
        episode(4, "Discipline is the bridge between goals and results.", 100_000),
        episode(5, "We discussed investing and compound interest.", 2400),
    ]
}

struct FakeRetriever {
    hits: Vec<SearchHit>,
    calls: AtomicUsize,
}

impl FakeRetriever {
    fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn hybrid_search(&self, _query: &str, _collection: &str, _filter: &GuestFilter) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.clone())
    }
}

struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn hybrid_search(&self, _query: &str, _collection: &str, _filter: &GuestFilter) -> Result<Vec<SearchHit>> {
        Err(PodqueryError::Retrieval("connection refused".to_string()))
    }
}

/// Scores documents from a fixed table keyed by content.
struct TableReranker {
    scores: HashMap<String, f32>,
}

impl TableReranker {
    fn for_hits(hits: &[SearchHit], scores: &[f32]) -> Self {
        Self {
            scores: hits
                .iter()
                .map(|h| h.content.clone())
                .zip(scores.iter().copied())
                .collect(),
        }
    }
}

#[async_trait]
impl Reranker for TableReranker {
    async fn score(&self, _query: &str, documents: &[String]) -> Result<Vec<f32>> {
        Ok(documents
            .iter()
            .map(|d| self.scores.get(d).copied().unwrap_or(0.0))
            .collect())
    }

    fn model_name(&self) -> &str {
        "table"
    }
}

struct FailingReranker;

#[async_trait]
impl Reranker for FailingReranker {
    async fn score(&self, _query: &str, _documents: &[String]) -> Result<Vec<f32>> {
        Err(PodqueryError::Rerank("model unavailable".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Records every request and answers with a fixed text.
struct RecordingGenerator {
    inner: FixedGenerator,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl RecordingGenerator {
    fn new() -> Self {
        Self {
            inner: FixedGenerator::new(ANSWER),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl AnswerGenerator for RecordingGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<Answer> {
        self.requests.lock().unwrap().push(request.clone());
        self.inner.complete(request).await
    }
}

struct FailingGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl AnswerGenerator for FailingGenerator {
    async fn complete(&self, _request: &CompletionRequest) -> Result<Answer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PodqueryError::Generation("rate limited".to_string()))
    }
}

/// Streams one chunk, then fails.
struct BrokenStreamGenerator;

#[async_trait]
impl AnswerGenerator for BrokenStreamGenerator {
    async fn complete(&self, _request: &CompletionRequest) -> Result<Answer> {
        let chunks: Vec<Result<String>> = vec![
            Ok("Discipline is ".to_string()),
            Err(PodqueryError::Generation("stream reset".to_string())),
        ];
        Ok(Answer::Stream(Box::pin(stream::iter(chunks))))
    }
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.reranker.top_k = 3;
    settings.context.token_threshold = 4000;
    settings
}

fn orchestrator(
    settings: Settings,
    retriever: Arc<dyn Retriever>,
    reranker: Arc<dyn Reranker>,
    generator: Arc<dyn AnswerGenerator>,
) -> Orchestrator {
    Orchestrator::with_components(
        settings,
        Prompts::load(None, None).unwrap(),
        retriever,
        reranker,
        Arc::new(TiktokenCounter::for_model("gpt-3.5-turbo-0613").unwrap()),
        generator,
    )
}

// Rerank order for five_hits(): episode 2, episode 4, episode 3.
const SCORES: [f32; 5] = [0.1, 0.9, 0.5, 0.7, 0.3];

#[tokio::test]
async fn test_discipline_question_end_to_end() {
    let hits = five_hits();
    let generator = Arc::new(RecordingGenerator::new());
    let orch = orchestrator(
        settings(),
        Arc::new(FakeRetriever::new(hits.clone())),
        Arc::new(TableReranker::for_hits(&hits, &SCORES)),
        generator.clone(),
    );

    let outcome = orch.search("What is discipline?", &GuestFilter::none()).await.unwrap();
    assert_eq!(outcome.status, ContextStatus::Selected);
    assert_eq!(outcome.context.len(), 3);
    let order: Vec<&str> = outcome.context.iter().map(|h| h.guest.as_str()).collect();
    assert_eq!(order, vec!["Guest 2", "Guest 4", "Guest 3"]);
    assert!((outcome.context[0].score - 0.9).abs() < 1e-6);

    let report = orch.ask("What is discipline?", &GuestFilter::none()).await;
    assert_eq!(report.answer, AnswerSlot::Answered(ANSWER.to_string()));
    assert!(report.guest_notice.is_none());

    let durations: Vec<String> = report
        .cards
        .iter()
        .map(|slot| match slot {
            CardSlot::Card(card) => card.duration.clone(),
            CardSlot::Failed { reason, .. } => panic!("card failed: {}", reason),
        })
        .collect();
    assert_eq!(durations, vec!["0:05:03", "1 day, 3:46:40", "1:30:00"]);

    // The prompt carries the three excerpts in reranked order.
    let requests = generator.requests.lock().unwrap();
    let prompt = &requests.last().unwrap().prompt;
    let pos = |text: &str| prompt.find(text).unwrap();
    assert!(pos("Discipline equals freedom") < pos("bridge between goals"));
    assert!(pos("bridge between goals") < pos("Motivation fades"));
    assert!(!prompt.contains("sleep and recovery"));
    assert!(prompt.contains("What is discipline?"));
    assert_eq!(requests.last().unwrap().max_tokens, 500);
}

#[tokio::test]
async fn test_retrieval_failure_shows_indicator_and_skips_generation() {
    let generator = Arc::new(RecordingGenerator::new());
    let orch = orchestrator(
        settings(),
        Arc::new(FailingRetriever),
        Arc::new(TableReranker::for_hits(&[], &[])),
        generator.clone(),
    );

    let report = orch.ask("What is discipline?", &GuestFilter::none()).await;

    assert!(matches!(report.answer, AnswerSlot::SearchUnavailable(_)));
    assert!(report.answer.message().contains("connection refused"));
    assert!(report.cards.is_empty());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_blank_question_is_rejected_not_reported_as_outage() {
    let retriever = Arc::new(FakeRetriever::new(five_hits()));
    let generator = Arc::new(RecordingGenerator::new());
    let orch = orchestrator(
        settings(),
        retriever.clone(),
        Arc::new(TableReranker::for_hits(&[], &[])),
        generator.clone(),
    );

    let report = orch.ask("   ", &GuestFilter::none()).await;

    assert!(matches!(report.answer, AnswerSlot::InvalidQuestion(_)));
    assert!(report.answer.message().contains("Question must not be empty"));
    assert!(!report.answer.message().contains("unavailable"));
    assert!(report.cards.is_empty());
    assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_rerank_failure_is_search_unavailable() {
    let generator = Arc::new(RecordingGenerator::new());
    let orch = orchestrator(
        settings(),
        Arc::new(FakeRetriever::new(five_hits())),
        Arc::new(FailingReranker),
        generator.clone(),
    );

    let err = orch.search("What is discipline?", &GuestFilter::none()).await.unwrap_err();
    assert_eq!(err.kind(), podquery::error::ErrorKind::SearchUnavailable);

    let report = orch.ask("What is discipline?", &GuestFilter::none()).await;
    assert!(matches!(report.answer, AnswerSlot::SearchUnavailable(_)));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_generation_failure_shows_fallback_and_all_cards() {
    let hits = five_hits();
    let generator = Arc::new(FailingGenerator {
        calls: AtomicUsize::new(0),
    });
    let orch = orchestrator(
        settings(),
        Arc::new(FakeRetriever::new(hits.clone())),
        Arc::new(TableReranker::for_hits(&hits, &SCORES)),
        generator.clone(),
    );

    let report = orch.ask("What is discipline?", &GuestFilter::none()).await;

    assert_eq!(
        report.answer,
        AnswerSlot::Fallback("Sorry, I couldn't generate an answer right now.".to_string())
    );
    assert_eq!(report.cards.len(), 3);
    assert!(report.cards.iter().all(CardSlot::is_card));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_broken_stream_falls_back_after_partial_output() {
    let hits = five_hits();
    let orch = orchestrator(
        settings(),
        Arc::new(FakeRetriever::new(hits.clone())),
        Arc::new(TableReranker::for_hits(&hits, &SCORES)),
        Arc::new(BrokenStreamGenerator),
    );

    let mut shown = String::new();
    let report = orch
        .ask_with("What is discipline?", &GuestFilter::none(), true, |c| shown.push_str(c))
        .await;

    assert_eq!(shown, "Discipline is ");
    assert!(matches!(report.answer, AnswerSlot::Fallback(_)));
    assert_eq!(report.cards.len(), 3);
}

#[tokio::test]
async fn test_streamed_and_complete_answers_match() {
    let hits = five_hits();
    let orch = orchestrator(
        settings(),
        Arc::new(FakeRetriever::new(hits.clone())),
        Arc::new(TableReranker::for_hits(&hits, &SCORES)),
        Arc::new(FixedGenerator::new(ANSWER)),
    );

    let mut chunks = Vec::new();
    let streamed = orch
        .ask_with("What is discipline?", &GuestFilter::none(), true, |c| chunks.push(c.to_string()))
        .await;
    let complete = orch
        .ask_with("What is discipline?", &GuestFilter::none(), false, |_| {})
        .await;

    assert!(chunks.len() > 1);
    assert_eq!(chunks.concat(), ANSWER);
    assert_eq!(streamed.answer, complete.answer);
}

#[tokio::test]
async fn test_context_overflow_skips_generation_but_keeps_cards() {
    let hits = five_hits();
    let generator = Arc::new(RecordingGenerator::new());
    let mut settings = settings();
    settings.context.token_threshold = 10;
    let orch = orchestrator(
        settings,
        Arc::new(FakeRetriever::new(hits.clone())),
        Arc::new(TableReranker::for_hits(&hits, &SCORES)),
        generator.clone(),
    );

    let report = orch.ask("What is discipline?", &GuestFilter::none()).await;

    assert_eq!(report.answer, AnswerSlot::NoContext);
    assert_eq!(report.cards.len(), 3);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_guest_filter_is_reported_but_not_applied() {
    let hits = five_hits();
    let retriever = Arc::new(FakeRetriever::new(hits.clone()));
    let orch = orchestrator(
        settings(),
        retriever.clone(),
        Arc::new(TableReranker::for_hits(&hits, &SCORES)),
        Arc::new(FixedGenerator::new(ANSWER)),
    );

    let filter = GuestFilter::new(Some("Guest 5".to_string()));
    let report = orch.ask("What is discipline?", &filter).await;

    assert!(report.guest_notice.unwrap().contains("Guest 5"));
    // Results still come from every guest.
    assert_eq!(report.cards.len(), 3);
    assert_eq!(retriever.calls.load(Ordering::SeqCst), 1);
}
