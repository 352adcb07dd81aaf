use pretty_assertions::assert_eq;
use serde_json::json;
use spacecopy_core::ContentClient;
use spacecopy_core::Migrator;
use spacecopy_test_support::FakeContentService;
use spacecopy_test_support::RecordingSleeper;
use spacecopy_test_support::migration_config;
use spacecopy_test_support::source_and_destination;
use std::time::Duration;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

const SOURCE_AUTH: &str = "Basic cmVhZGVyQGV4YW1wbGUuY29tOnNvdXJjZS10b2tlbg==";
const DESTINATION_AUTH: &str = "Basic d3JpdGVyQGV4YW1wbGUuY29tOmRlc3RpbmF0aW9uLXRva2Vu";

async fn header_values(service: &FakeContentService, name: &str) -> Vec<String> {
    service
        .received_requests()
        .await
        .iter()
        .map(|r| {
            r.headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

#[tokio::test]
async fn every_request_carries_its_own_instance_credentials() {
    let (source, destination) = source_and_destination().await;
    let page = source.add_page("A", "<p/>", None);
    source.add_label(&page, "global", "ops");
    source.add_attachment(&page, "a.txt", b"a");

    let config = migration_config(&source, &destination);
    Migrator::with_sleeper(&config, RecordingSleeper::new())
        .unwrap()
        .run()
        .await
        .unwrap();

    let source_auth = header_values(&source, "authorization").await;
    let destination_auth = header_values(&destination, "authorization").await;
    assert!(!source_auth.is_empty() && !destination_auth.is_empty());
    assert!(source_auth.iter().all(|v| v == SOURCE_AUTH));
    assert!(destination_auth.iter().all(|v| v == DESTINATION_AUTH));

    let accept = header_values(&destination, "accept").await;
    assert!(accept.iter().all(|v| v == "application/json"));
}

#[tokio::test]
async fn rate_limited_lookup_waits_for_retry_after() {
    let (source, destination) = source_and_destination().await;
    let limited = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/content"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0.5"))
        .up_to_n_times(2)
        .mount(&limited)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/content"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": "77", "title": "Notes", "ancestors": [], "version": { "number": 4 } }]
        })))
        .mount(&limited)
        .await;

    let mut config = migration_config(&source, &destination);
    config.destination.base_url = limited.uri();
    let sleeper = RecordingSleeper::new();
    let client =
        ContentClient::from_config(&config.destination, &config, Some(sleeper.clone())).unwrap();

    let found = client.find_pages_by_title("Notes").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].version, 4);
    assert_eq!(sleeper.waits(), vec![Duration::from_millis(500); 2]);
}

#[tokio::test]
async fn exhausted_rate_limit_is_a_status_error_not_a_fault() {
    let (source, destination) = source_and_destination().await;
    let limited = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&limited)
        .await;

    let mut config = migration_config(&source, &destination);
    config.destination.base_url = limited.uri();
    let sleeper = RecordingSleeper::new();
    let client =
        ContentClient::from_config(&config.destination, &config, Some(sleeper.clone())).unwrap();

    let err = client.find_pages_by_title("Notes").await.unwrap_err();
    assert_eq!(err.status(), Some(429));
    assert!(!err.is_fatal_transport());
    // No hint: exponential backoff from a 1s base.
    assert_eq!(sleeper.waits(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
}
