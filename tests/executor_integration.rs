//! Request executor against a mock PagerDuty API

mod common;

use common::{bearer_client, test_config};
use pagerduty_cli::api::{
    ApiResult, ClientConfig, Credential, EngineError, FailureKind, PagerDutyClient, RequestSpec,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[tokio::test]
async fn test_bearer_request_carries_auth_and_version_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "application/vnd.pagerduty+json;version=2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"user": {"id": "PUSER01", "email": "me@example.com"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = bearer_client(&server.uri());
    let me = client.me().await.unwrap().unwrap();

    assert_eq!(me["id"], "PUSER01");
}

#[tokio::test]
async fn test_legacy_key_uses_token_scheme() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services"))
        .and(header("authorization", "Token token=legacy-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"services": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = PagerDutyClient::new(
        Some(Credential::LegacyKey("legacy-key".to_string())),
        test_config(&server.uri()),
    )
    .unwrap();

    let result = client.execute(&RequestSpec::get("services").build().unwrap()).await;
    assert!(result.is_success());

    // Legacy keys have no user behind them
    assert_eq!(client.me().await.unwrap(), None);
}

#[tokio::test]
async fn test_body_params_and_spec_headers_are_sent() {
    let server = MockServer::start().await;
    let body = json!({"incident": {"type": "incident_reference", "status": "resolved"}});
    Mock::given(method("PUT"))
        .and(path("/incidents/Q1ABCDEF"))
        .and(query_param("include[]", "priorities"))
        .and(header("from", "ops@example.com"))
        .and(header("content-type", "application/json"))
        .and(body_json(body.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"incident": {"id": "Q1ABCDEF"}})))
        .expect(1)
        .mount(&server)
        .await;

    let spec = RequestSpec::put("incidents/Q1ABCDEF", body)
        .param("include", vec!["priorities"])
        .header("From", "ops@example.com")
        .build()
        .unwrap();
    let result = bearer_client(&server.uri()).execute(&spec).await;

    assert_eq!(result.status(), Some(200));
    assert_eq!(result.data().unwrap()["incident"]["id"], "Q1ABCDEF");
}

#[tokio::test]
async fn test_rate_limited_twice_then_success() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    Mock::given(method("GET"))
        .and(path("/teams/PTEAM01"))
        .respond_with(move |_req: &Request| -> ResponseTemplate {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(429).insert_header("ratelimit-reset", "0")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"team": {"id": "PTEAM01"}}))
            }
        })
        .expect(3)
        .mount(&server)
        .await;

    let result = bearer_client(&server.uri())
        .execute(&RequestSpec::get("teams/PTEAM01").build().unwrap())
        .await;

    assert!(result.is_success());
    assert_eq!(result.retries(), 2);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_persistent_rate_limit_gives_up_after_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/teams"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate Limit Exceeded", "code": 2020}
        })))
        .expect(4)
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .base_url(server.uri())
        .max_retries(3)
        .retry_delay(Duration::from_millis(1))
        .build();
    let client = PagerDutyClient::new(Some(Credential::Bearer("t".to_string())), config).unwrap();

    let result = client.execute(&RequestSpec::get("teams").build().unwrap()).await;

    assert!(result.is_failure());
    assert_eq!(result.status(), Some(429));
    assert_eq!(result.retries(), 3);
    assert_eq!(
        result.failure().unwrap().kind,
        FailureKind::RateLimited {
            message: Some("Rate Limit Exceeded".to_string())
        }
    );
    assert!(result.formatted_error().unwrap().ends_with("Rate Limit Exceeded"));
}

#[tokio::test]
async fn test_server_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/escalation_policies"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "Invalid Input Provided",
                "code": 2001,
                "errors": ["Name has already been taken"]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/incidents"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let client = bearer_client(&server.uri());

    let created = client
        .execute(&RequestSpec::post("escalation_policies", json!({})).build().unwrap())
        .await;
    assert_eq!(
        created.formatted_error().unwrap(),
        "400 Bad Request: Invalid Input Provided (code 2001): Name has already been taken"
    );

    let listed = client.execute(&RequestSpec::get("incidents").build().unwrap()).await;
    assert_eq!(listed.status(), Some(503));
    assert_eq!(listed.retries(), 0);
    assert_eq!(
        listed.formatted_error().unwrap(),
        "503 Service Unavailable: upstream unavailable"
    );
}

#[tokio::test]
async fn test_no_content_and_malformed_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/teams/PTEAM01/escalation_policies/PEP0001"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/priorities"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = bearer_client(&server.uri());

    let deleted = client
        .execute(
            &RequestSpec::delete("teams/PTEAM01/escalation_policies/PEP0001")
                .build()
                .unwrap(),
        )
        .await;
    assert_eq!(deleted.status(), Some(204));
    assert!(deleted.data().unwrap().is_null());

    let malformed = client.execute(&RequestSpec::get("priorities").build().unwrap()).await;
    assert!(matches!(
        malformed.failure().map(|f| &f.kind),
        Some(FailureKind::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_transport_failure_resolves_to_failure_result() {
    // Nothing listens on the discard port
    let client = bearer_client("http://127.0.0.1:9");

    let result = client.execute(&RequestSpec::get("teams").build().unwrap()).await;

    match result {
        ApiResult::Failure(failure) => {
            assert_eq!(failure.status, None);
            assert!(matches!(failure.kind, FailureKind::Transport(_)));
            assert!(failure.formatted().starts_with("no response received"));
        }
        other => panic!("expected a transport failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_credential_fails_before_network() {
    let result = PagerDutyClient::new(None, ClientConfig::default());
    assert!(matches!(result, Err(EngineError::NoCredential)));

    let blank = PagerDutyClient::new(
        Some(Credential::Bearer("   ".to_string())),
        ClientConfig::default(),
    );
    assert!(matches!(blank, Err(EngineError::InvalidCredential(_))));
}
