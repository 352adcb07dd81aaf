use futures::StreamExt;
use futures::TryStreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use spacecopy_core::ContentClient;
use spacecopy_core::ContentItem;
use spacecopy_core::InstanceConfig;
use spacecopy_core::RetryConfig;
use spacecopy_core::pagination::paginate;
use spacecopy_core::transport::Transport;
use spacecopy_test_support::RecordingSleeper;
use spacecopy_test_support::migration_config;
use spacecopy_test_support::source_and_destination;
use std::pin::pin;
use std::time::Duration;
use url::Url;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;

#[tokio::test]
async fn listing_follows_next_links_in_server_order() {
    let (source, destination) = source_and_destination().await;
    for n in 1..=5 {
        source.add_page(&format!("Page {n}"), &format!("<p>{n}</p>"), None);
    }

    let config = migration_config(&source, &destination);
    let client = ContentClient::from_config(&config.source, &config, None).unwrap();
    let items: Vec<ContentItem> = client.list_pages().unwrap().try_collect().await.unwrap();

    let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Page 1", "Page 2", "Page 3", "Page 4", "Page 5"]);
    assert_eq!(items[2].body, "<p>3</p>");

    let starts: Vec<Option<String>> = source
        .received_requests()
        .await
        .iter()
        .map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "start")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(starts, vec![None, Some("2".to_string()), Some("4".to_string())]);
}

#[tokio::test]
async fn failed_page_ends_the_stream_with_an_error() {
    let (source, destination) = source_and_destination().await;
    for n in 1..=5 {
        source.add_page(&format!("Page {n}"), "", None);
    }
    source.fail_page_listing_from(2);

    let config = migration_config(&source, &destination);
    let client =
        ContentClient::from_config(&config.source, &config, Some(RecordingSleeper::new())).unwrap();
    let mut stream = pin!(client.list_pages().unwrap());

    assert_eq!(stream.next().await.unwrap().unwrap().title, "Page 1");
    assert_eq!(stream.next().await.unwrap().unwrap().title, "Page 2");
    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn next_without_base_resolves_against_current_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/content"))
        .and(query_param("start", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": "2", "title": "Two" }],
            "_links": {}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/content"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": "1", "title": "One" }, { "id": "", "title": "broken" }],
            "_links": { "next": "/rest/api/content?start=1" }
        })))
        .mount(&server)
        .await;

    let instance = InstanceConfig {
        base_url: server.uri(),
        space_key: "SRC".to_string(),
        username: "reader".to_string(),
        api_token: "t".to_string(),
    };
    let transport = Transport::new(&instance, RetryConfig::default(), Duration::from_secs(5)).unwrap();
    let seed = Url::parse(&format!("{}/rest/api/content", server.uri())).unwrap();

    let items: Vec<ContentItem> = paginate(&transport, seed).try_collect().await.unwrap();
    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
}
