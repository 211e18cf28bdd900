//! Batch scheduler against an instrumented in-memory backend

mod common;

use common::{InstrumentedTransport, bearer_client};
use pagerduty_cli::api::{ApiResult, EngineError, FailureKind, RequestSpec};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn specs(count: usize) -> Vec<RequestSpec> {
    (0..count)
        .map(|i| RequestSpec::get(format!("items/{}", i)).build().unwrap())
        .collect()
}

#[tokio::test]
async fn test_results_are_index_aligned_for_every_concurrency() {
    let transport = InstrumentedTransport::new(Duration::from_millis(2), &[]);
    let client = transport.client();
    let specs = specs(8);

    for concurrency in 1..=8 {
        let batch = client.run_batch(&specs, concurrency).await.unwrap();

        assert_eq!(batch.len(), 8);
        for (i, result) in batch.iter().enumerate() {
            assert_eq!(result.data().unwrap()["path"], format!("/items/{}", i));
        }
    }
}

#[tokio::test]
async fn test_concurrency_ceiling_is_respected() {
    let transport = InstrumentedTransport::new(Duration::from_millis(20), &[]);
    let client = transport.client();

    let batch = client.run_batch(&specs(12), 3).await.unwrap();

    assert_eq!(batch.success_count(), 12);
    assert_eq!(transport.total(), 12);
    assert!(transport.max_in_flight() <= 3);
    assert!(transport.max_in_flight() >= 2, "requests should overlap");
}

#[tokio::test]
async fn test_queued_specs_are_admitted_in_input_order() {
    // Large enough that join_all takes its FuturesOrdered path
    let transport = InstrumentedTransport::new(Duration::from_millis(1), &[]);
    let client = transport.client();

    let batch = client.run_batch(&specs(40), 1).await.unwrap();

    assert_eq!(batch.success_count(), 40);
    let expected: Vec<String> = (0..40).map(|i| i.to_string()).collect();
    assert_eq!(transport.dispatch_order(), expected);
}

#[tokio::test]
async fn test_one_failure_does_not_affect_the_others() {
    let transport = InstrumentedTransport::new(Duration::from_millis(1), &["3"]);
    let client = transport.client();

    let batch = client.run_batch(&specs(6), 2).await.unwrap();

    assert_eq!(batch.failed_indices(), vec![3]);
    assert_eq!(batch.success_count(), 5);
    assert_eq!(transport.total(), 6);
    assert_eq!(
        batch.result_at(3).unwrap().formatted_error().unwrap(),
        "500 Internal Server Error: boom (code 9999)"
    );
}

#[tokio::test]
async fn test_transport_failures_are_isolated_too() {
    let transport = InstrumentedTransport::new(Duration::from_millis(1), &[]);
    let client = transport.client();
    let specs = vec![
        RequestSpec::get("items/0").build().unwrap(),
        RequestSpec::get("items/unreachable").build().unwrap(),
        RequestSpec::get("items/2").build().unwrap(),
    ];

    let batch = client.run_batch(&specs, 3).await.unwrap();

    assert_eq!(batch.failed_indices(), vec![1]);
    match batch.result_at(1).unwrap() {
        ApiResult::Failure(failure) => {
            assert_eq!(failure.status, None);
            assert!(matches!(failure.kind, FailureKind::Transport(_)));
        }
        other => panic!("expected a transport failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_outcomes_are_deterministic_across_runs() {
    let transport = InstrumentedTransport::new(Duration::from_millis(1), &["1", "4", "7"]);
    let client = transport.client();
    let specs = specs(9);

    let first = client.run_batch(&specs, 4).await.unwrap();
    let second = client.run_batch(&specs, 2).await.unwrap();

    assert_eq!(first.failed_indices(), vec![1, 4, 7]);
    assert_eq!(first.failed_indices(), second.failed_indices());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_zero_concurrency_is_rejected() {
    let transport = InstrumentedTransport::new(Duration::from_millis(1), &[]);
    let client = transport.client();

    let result = client.run_batch(&specs(2), 0).await;

    assert!(matches!(result, Err(EngineError::InvalidConcurrency)));
    assert_eq!(transport.total(), 0);
}

#[tokio::test]
async fn test_empty_batch() {
    let transport = InstrumentedTransport::new(Duration::from_millis(1), &[]);
    let batch = transport.client().run_batch(&[], 5).await.unwrap();

    assert!(batch.is_empty());
    assert_eq!(transport.total(), 0);
}

#[tokio::test]
async fn test_batch_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/teams/PTEAM0[12]/escalation_policies/PEP0001$"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/teams/PTEAM03/escalation_policies/PEP0001$"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "Not Found", "code": 2100}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let specs: Vec<RequestSpec> = ["PTEAM01", "PTEAM02", "PTEAM03"]
        .iter()
        .map(|team| {
            RequestSpec::delete(format!("teams/{}/escalation_policies/PEP0001", team))
                .build()
                .unwrap()
        })
        .collect();

    let batch = bearer_client(&server.uri()).run_batch_default(&specs).await.unwrap();

    assert_eq!(batch.failed_indices(), vec![2]);
    let (index, failure) = batch.failures().next().unwrap();
    assert_eq!(index, 2);
    assert_eq!(failure.to_string(), "404 Not Found: Not Found (code 2100)");
}
