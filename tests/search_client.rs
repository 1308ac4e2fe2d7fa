use serde_json::json;
use synopsis::config::SearchConfig;
use synopsis::error::{Classify, ErrorKind};
use synopsis::search::{GoogleSearchClient, SearchError, WebSearch};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, max_results: usize) -> GoogleSearchClient {
    let config = SearchConfig {
        base_url: server.uri(),
        max_results,
        timeout_secs: 5,
    };
    GoogleSearchClient::new("google-key", "engine-id", &config).unwrap()
}

fn item(n: usize) -> serde_json::Value {
    json!({
        "title": format!("Result {}", n),
        "link": format!("https://site{}.example/article", n),
        "snippet": format!("Snippet {}", n),
        "displayLink": format!("site{}.example", n)
    })
}

#[tokio::test]
async fn results_keep_upstream_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("key", "google-key"))
        .and(query_param("cx", "engine-id"))
        .and(query_param("q", "rust async runtimes"))
        .and(query_param("num", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [item(2), item(1), item(3)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = client(&server, 3).search("rust async runtimes").await.unwrap();
    let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["Result 2", "Result 1", "Result 3"]);
    assert_eq!(results[0].url, "https://site2.example/article");
    assert_eq!(results[0].display_link, "site2.example");
}

#[tokio::test]
async fn results_are_capped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": (1..=5).map(item).collect::<Vec<_>>()
        })))
        .mount(&server)
        .await;

    let results = client(&server, 2).search("anything").await.unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn zero_items_is_search_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "customsearch#search",
            "searchInformation": {"totalResults": "0"}
        })))
        .mount(&server)
        .await;

    let err = client(&server, 5).search("zzqx").await.unwrap_err();
    assert!(matches!(err, SearchError::NoResults(ref q) if q == "zzqx"));
    assert_eq!(err.kind(), ErrorKind::Search);
}

#[tokio::test]
async fn api_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Custom Search API has not been used in project"}
        })))
        .mount(&server)
        .await;

    let err = client(&server, 5).search("rust").await.unwrap_err();
    assert!(matches!(err, SearchError::Api { status: 403, .. }));
    assert_eq!(err.kind(), ErrorKind::Search);
    assert!(err.to_string().contains("has not been used"));
}
