//! Integration tests for `YandexSearchClient` using wiremock HTTP mocks.

use pricelab_scraper::{ScraperError, SearchProvider, YandexSearchClient};
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn results_page(docs: &[(&str, &str)]) -> String {
    let body: String = docs
        .iter()
        .map(|(url, passage)| {
            format!(
                "<group><doc><url>{url}</url><passages><passage>{passage}</passage></passages></doc></group>"
            )
        })
        .collect();
    format!(
        "<yandexsearch version=\"1.0\"><response><results><grouping>{body}</grouping></results></response></yandexsearch>"
    )
}

fn empty_page() -> String {
    results_page(&[])
}

fn test_client(base_url: &str, max_pages: u32) -> YandexSearchClient {
    YandexSearchClient::new(base_url, "test-key", "test-folder", 30, max_pages)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn search_collects_hits_across_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("apikey", "test-key"))
        .and(query_param("folderid", "test-folder"))
        .and(query_param("query", "SW-24 цена"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&[
            ("https://a.ru/1", "цена 10 000 руб."),
            ("https://b.ru/2", "цена 11 000 руб."),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&[
            // Duplicate of page 0 plus one new hit.
            ("https://a.ru/1", "цена 10 000 руб."),
            ("https://c.ru/3", "цена 12 000 руб."),
        ])))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let hits = client.search("SW-24 цена").await.expect("search");

    let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
    assert_eq!(urls, vec!["https://a.ru/1", "https://b.ru/2", "https://c.ru/3"]);
}

#[tokio::test]
async fn search_stops_at_empty_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(empty_page()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 5);
    let hits = client.search("nothing").await.expect("search");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn api_error_is_surfaced() {
    let server = MockServer::start().await;

    let body = "<yandexsearch><response><error code=\"32\">Превышен лимит</error></response></yandexsearch>";
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 1);
    let err = client.search("SW-24 цена").await.unwrap_err();
    assert!(matches!(err, ScraperError::SearchApi { .. }));
}

#[tokio::test]
async fn http_error_maps_to_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 1);
    let err = client.search("SW-24 цена").await.unwrap_err();
    assert!(matches!(
        err,
        ScraperError::UnexpectedStatus { status: 502, .. }
    ));
}
