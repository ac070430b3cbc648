mod common;

use common::{texts, StubClassifier};
use sentiment_pipelines::core::{BatchConfig, ErrorKind};
use sentiment_pipelines::pipelines::BatchOrchestrator;
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(classifier: Arc<StubClassifier>, config: BatchConfig) -> BatchOrchestrator {
    BatchOrchestrator::new(classifier, config)
}

#[tokio::test]
async fn outcomes_align_with_inputs() {
    let stub = Arc::new(
        StubClassifier::new()
            .respond("positive!", "positive", 0.9)
            .respond("negative!", "negative", 0.85),
    );
    let batch = orchestrator(stub.clone(), BatchConfig::default());

    let outcomes = batch.run(&texts(&["positive!", "negative!", "meh"])).await;

    assert_eq!(outcomes.len(), 3);
    let first = outcomes[0].prediction().unwrap();
    assert_eq!((first.label.as_str(), first.confidence), ("positive", 0.9));
    let second = outcomes[1].prediction().unwrap();
    assert_eq!((second.label.as_str(), second.confidence), ("negative", 0.85));
    assert_eq!(outcomes[2].prediction().unwrap().label, "neutral");
    assert_eq!(stub.calls(), 3);
}

#[tokio::test]
async fn empty_batch_never_calls_classifier() {
    let stub = Arc::new(StubClassifier::new());
    let batch = orchestrator(stub.clone(), BatchConfig::default());

    let output = batch.run_with_stats(&[]).await;

    assert!(output.outcomes.is_empty());
    assert_eq!(output.stats.items_processed, 0);
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn failure_stays_in_its_own_position() {
    let stub = Arc::new(
        StubClassifier::new()
            .respond("a", "positive", 0.7)
            .fail("x", ErrorKind::Inference, "device lost")
            .respond("b", "negative", 0.6),
    );
    let batch = orchestrator(stub, BatchConfig::default());

    let outcomes = batch.run(&texts(&["a", "x", "b"])).await;

    assert!(outcomes[0].is_success());
    let err = outcomes[1].error().unwrap();
    assert_eq!(err.kind, ErrorKind::Inference);
    assert_eq!(err.message, "device lost");
    assert!(outcomes[2].is_success());
}

#[tokio::test]
async fn order_holds_when_later_items_finish_first() {
    let stub = Arc::new(
        StubClassifier::new()
            .respond("slow", "negative", 0.6)
            .respond("medium", "neutral", 0.7)
            .respond("fast", "positive", 0.8)
            .delay("slow", Duration::from_millis(150))
            .delay("medium", Duration::from_millis(75)),
    );
    let batch = orchestrator(stub, BatchConfig::default().with_max_concurrency(3));

    let outcomes = batch.run(&texts(&["slow", "medium", "fast"])).await;

    let labels: Vec<_> = outcomes
        .iter()
        .map(|o| o.prediction().unwrap().label.clone())
        .collect();
    assert_eq!(labels, ["negative", "neutral", "positive"]);
}

#[tokio::test]
async fn duplicate_texts_are_classified_independently() {
    let stub = Arc::new(StubClassifier::new().respond("same", "positive", 0.9));
    let batch = orchestrator(stub.clone(), BatchConfig::default());

    let outcomes = batch.run(&texts(&["same", "same", "same"])).await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.is_success()));
    assert_eq!(stub.calls(), 3);
}

#[tokio::test]
async fn concurrency_limit_is_respected() {
    let items: Vec<String> = (0..8).map(|i| format!("item {i}")).collect();
    let mut stub = StubClassifier::new();
    for item in &items {
        stub = stub.delay(item, Duration::from_millis(40));
    }
    let stub = Arc::new(stub);
    let batch = orchestrator(stub.clone(), BatchConfig::default().with_max_concurrency(2));

    let outcomes = batch.run(&items).await;

    assert_eq!(outcomes.len(), 8);
    assert!(outcomes.iter().all(|o| o.is_success()));
    assert!(stub.peak_in_flight() <= 2, "peak {}", stub.peak_in_flight());
    assert_eq!(stub.calls(), 8);
}

#[tokio::test]
async fn deadline_turns_unfinished_items_into_timeouts() {
    let stub = Arc::new(
        StubClassifier::new()
            .respond("quick", "positive", 0.9)
            .delay("stuck", Duration::from_millis(800)),
    );
    let batch = orchestrator(
        stub,
        BatchConfig::default()
            .with_max_concurrency(4)
            .with_timeout(Duration::from_millis(200)),
    );

    let output = batch.run_with_stats(&texts(&["quick", "stuck"])).await;

    assert!(output.outcomes[0].is_success());
    assert_eq!(output.outcomes[1].error().unwrap().kind, ErrorKind::Timeout);
    assert_eq!(output.stats.succeeded, 1);
    assert_eq!(output.stats.timed_out, 1);
}

#[tokio::test]
async fn items_still_queued_at_the_deadline_time_out() {
    let stub = Arc::new(StubClassifier::new().delay("hog", Duration::from_millis(500)));
    let batch = orchestrator(
        stub,
        BatchConfig::default()
            .with_max_concurrency(1)
            .with_timeout(Duration::from_millis(100)),
    );

    let outcomes = batch.run(&texts(&["hog", "waiting", "also waiting"])).await;

    assert_eq!(outcomes.len(), 3);
    for outcome in &outcomes {
        assert_eq!(outcome.error().unwrap().kind, ErrorKind::Timeout);
    }
}

#[tokio::test]
async fn stats_count_successes_and_failures() {
    let stub = Arc::new(
        StubClassifier::new()
            .fail("bad", ErrorKind::Preprocessing, "empty encoding")
            .fail("worse", ErrorKind::Unknown, "?"),
    );
    let batch = orchestrator(stub, BatchConfig::default());

    let output = batch
        .run_with_stats(&texts(&["fine", "bad", "worse", "ok"]))
        .await;

    assert_eq!(output.stats.items_processed, 4);
    assert_eq!(output.stats.succeeded, 2);
    assert_eq!(output.stats.failed, 2);
    assert_eq!(output.stats.timed_out, 0);
}
