#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notion_rag::config::NotionConfig;
use notion_rag::notion::{BlockSource, NotionClient, PageWalker};

fn test_client(server: &MockServer) -> NotionClient {
    let config = NotionConfig {
        token: "test-token".to_string(),
        request_delay_ms: 0,
        retry_attempts: 2,
        timeout_seconds: 5,
        ..NotionConfig::default()
    };

    let base_url = Url::parse(&server.uri()).expect("mock server URI should parse");
    NotionClient::new(&config)
        .expect("client should build")
        .with_base_url(base_url)
}

fn paragraph_json(id: &str, text: &str) -> serde_json::Value {
    json!({
        "id": id,
        "has_children": false,
        "type": "paragraph",
        "paragraph": { "rich_text": [{ "plain_text": text }] }
    })
}

fn children_page(results: Vec<serde_json::Value>, next_cursor: Option<&str>) -> serde_json::Value {
    json!({
        "results": results,
        "has_more": next_cursor.is_some(),
        "next_cursor": next_cursor
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_children_single_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_page(
            vec![
                paragraph_json("b1", "First paragraph."),
                paragraph_json("b2", "Second paragraph."),
            ],
            None,
        )))
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    let outcome = client
        .list_children("root")
        .expect("fetch should succeed");

    assert!(outcome.complete);
    assert_eq!(outcome.blocks.len(), 2);
    assert_eq!(outcome.blocks[0].id, "b1");
    assert_eq!(outcome.blocks[1].id, "b2");
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_sends_auth_and_version_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("Notion-Version", "2022-06-28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_page(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    let outcome = client
        .list_children("root")
        .expect("fetch should succeed");

    assert!(outcome.complete);
    assert!(outcome.blocks.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn pagination_follows_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .and(query_param_is_missing("start_cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_page(
            vec![paragraph_json("b1", "Page one.")],
            Some("cursor-2"),
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .and(query_param("start_cursor", "cursor-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_page(
            vec![paragraph_json("b2", "Page two.")],
            None,
        )))
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    let outcome = client
        .list_children("root")
        .expect("fetch should succeed");

    assert!(outcome.complete);
    assert_eq!(outcome.blocks.len(), 2);
    // Pagination preserves server order across pages
    assert_eq!(outcome.blocks[0].id, "b1");
    assert_eq!(outcome.blocks[1].id, "b2");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_page(
            vec![paragraph_json("b1", "Recovered.")],
            None,
        )))
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    let outcome = client
        .list_children("root")
        .expect("fetch should succeed");

    assert!(outcome.complete);
    assert_eq!(outcome.blocks.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn rate_limit_response_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_page(
            vec![paragraph_json("b1", "After backoff.")],
            None,
        )))
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    let outcome = client
        .list_children("root")
        .expect("fetch should succeed");

    assert!(outcome.complete);
    assert_eq!(outcome.blocks.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn mid_pagination_failure_keeps_prefix() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .and(query_param_is_missing("start_cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_page(
            vec![paragraph_json("b1", "Survives.")],
            Some("cursor-2"),
        )))
        .mount(&server)
        .await;

    // Second page fails with a non-retryable client error
    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .and(query_param("start_cursor", "cursor-2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    let outcome = client
        .list_children("root")
        .expect("partial fetch should not be an error");

    assert!(!outcome.complete);
    assert_eq!(outcome.blocks.len(), 1);
    assert_eq!(outcome.blocks[0].id, "b1");
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_body_keeps_prefix() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let mut client = test_client(&server);
    let outcome = client
        .list_children("root")
        .expect("malformed body should not be an error");

    assert!(!outcome.complete);
    assert!(outcome.blocks.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn walker_flattens_heading_and_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_page(
            vec![
                json!({
                    "id": "h1",
                    "has_children": false,
                    "type": "heading_1",
                    "heading_1": { "rich_text": [{ "plain_text": "Intro" }] }
                }),
                json!({
                    "id": "li",
                    "has_children": false,
                    "type": "bulleted_list_item",
                    "bulleted_list_item": {
                        "rich_text": [{
                            "plain_text": "Step one",
                            "annotations": { "bold": true }
                        }]
                    }
                }),
            ],
            None,
        )))
        .mount(&server)
        .await;

    let mut walker = PageWalker::new(test_client(&server));
    let page = walker.flatten("root", 3).expect("walk should succeed");

    assert!(page.complete);
    assert_eq!(page.content, "# Intro\n\n- **Step one**");
}

#[tokio::test(flavor = "multi_thread")]
async fn walker_descends_into_child_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_page(
            vec![json!({
                "id": "child",
                "has_children": true,
                "type": "child_page",
                "child_page": { "title": "Details" }
            })],
            None,
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/child/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_page(
            vec![paragraph_json("p1", "More info.")],
            None,
        )))
        .mount(&server)
        .await;

    let mut walker = PageWalker::new(test_client(&server));
    let page = walker.flatten("root", 3).expect("walk should succeed");

    assert!(page.complete);
    assert_eq!(page.content, "## Details\n\nMore info.");
    assert_eq!(page.fetches, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn walker_surfaces_partial_fetches() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(children_page(
            vec![
                paragraph_json("p1", "Fetched fine."),
                json!({
                    "id": "child",
                    "has_children": true,
                    "type": "child_page",
                    "child_page": { "title": "Broken" }
                }),
            ],
            None,
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/child/children"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut walker = PageWalker::new(test_client(&server));
    let page = walker.flatten("root", 3).expect("walk should succeed");

    // The failed subtree is dropped but everything fetched so far survives
    assert!(!page.complete);
    assert_eq!(page.content, "Fetched fine.");
}
