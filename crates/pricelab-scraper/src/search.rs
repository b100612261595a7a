//! Search provider abstraction and the Yandex XML search client.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, Url};

use crate::domains;
use crate::error::ScraperError;

/// One ranked search result: the landing URL, whatever text the engine
/// showed for it, and the structured marketplace prices when the result
/// carried an `offer_info` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub snippet: String,
    pub source_name: Option<String>,
    pub offer_price: Option<f64>,
    pub offer_old_price: Option<f64>,
}

/// A ranked-search backend. Implemented by [`YandexSearchClient`] in
/// production and by canned fakes in tests.
pub trait SearchProvider {
    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<SearchHit>, ScraperError>> + Send;
}

/// Client for the Yandex XML search API.
pub struct YandexSearchClient {
    client: Client,
    base_url: Url,
    api_key: String,
    folder_id: String,
    max_pages: u32,
}

impl YandexSearchClient {
    /// Creates a client for the given API root.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ScraperError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn new(
        base_url: &str,
        api_key: &str,
        folder_id: &str,
        timeout_secs: u64,
        max_pages: u32,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let base_url = Url::parse(base_url).map_err(|e| ScraperError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_owned(),
            folder_id: folder_id.to_owned(),
            max_pages: max_pages.max(1),
        })
    }

    async fn fetch_page(&self, query: &str, page: u32) -> Result<Vec<SearchHit>, ScraperError> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("apikey", &self.api_key)
            .append_pair("folderid", &self.folder_id)
            .append_pair("query", query)
            .append_pair("page", &page.to_string());

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.path().to_string(),
            });
        }
        let body = response.text().await?;
        parse_search_results(&body)
    }
}

impl SearchProvider for YandexSearchClient {
    /// Walks result pages until a page comes back empty or `max_pages` is
    /// reached, deduplicating by URL across pages.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ScraperError> {
        let mut hits = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for page in 0..self.max_pages {
            let page_hits = self.fetch_page(query, page).await?;
            if page_hits.is_empty() {
                break;
            }
            for hit in page_hits {
                if seen.insert(hit.url.clone()) {
                    hits.push(hit);
                }
            }
        }
        tracing::debug!(query, hits = hits.len(), "search complete");
        Ok(hits)
    }
}

/// Parses a `yandexsearch` response document into hits.
///
/// Each `doc` contributes its `url`, `domain`, the concatenation of its
/// `title` and `passage` texts as the snippet, and the structured prices of
/// its `properties/offer_info` JSON payload when one is present. An `error`
/// element anywhere in the document aborts with [`ScraperError::SearchApi`].
fn parse_search_results(xml: &str) -> Result<Vec<SearchHit>, ScraperError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut hits = Vec::new();

    let mut in_doc = false;
    let mut url = String::new();
    let mut domain: Option<String> = None;
    let mut snippet_parts: Vec<String> = Vec::new();
    let mut offer_price: Option<f64> = None;
    let mut offer_old_price: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "doc" {
                    in_doc = true;
                    url.clear();
                    domain = None;
                    snippet_parts.clear();
                    offer_price = None;
                    offer_old_price = None;
                }
                stack.push(name);
            }
            Ok(Event::End(e)) => {
                stack.pop();
                if String::from_utf8_lossy(e.local_name().as_ref()) == "doc" {
                    in_doc = false;
                    if !url.is_empty() {
                        hits.push(SearchHit {
                            url: url.clone(),
                            snippet: snippet_parts.join(" "),
                            source_name: domain.take().or_else(|| domains::source_name(&url)),
                            offer_price: offer_price.take(),
                            offer_old_price: offer_old_price.take(),
                        });
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let Some(current) = stack.last() else {
                    continue;
                };
                let text = t.unescape().unwrap_or_default().into_owned();
                if current == "error" {
                    return Err(ScraperError::SearchApi { message: text });
                }
                if !in_doc {
                    continue;
                }
                match current.as_str() {
                    "url" => url = text,
                    "domain" => domain = Some(text),
                    "title" | "passage" | "headline" => snippet_parts.push(text),
                    "offer_info" => (offer_price, offer_old_price) = parse_offer_info(&text),
                    _ => {}
                }
            }
            // Marketplace offer_info payloads usually arrive as CDATA.
            Ok(Event::CData(t)) => {
                if in_doc && stack.last().is_some_and(|n| n == "offer_info") {
                    let text = String::from_utf8_lossy(&t).into_owned();
                    (offer_price, offer_old_price) = parse_offer_info(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ScraperError::Xml { source: e }),
            _ => {}
        }
    }
    Ok(hits)
}

/// Pulls `price.value` and `discount.oldprice` out of an `offer_info` JSON
/// payload. The element text may carry junk around the JSON object, so only
/// the outermost `{...}` span is parsed. Anything unparseable yields
/// `(None, None)`: a broken payload downgrades the hit to text extraction.
fn parse_offer_info(raw: &str) -> (Option<f64>, Option<f64>) {
    let Some(slice) = raw
        .find('{')
        .zip(raw.rfind('}'))
        .filter(|(start, end)| start < end)
        .map(|(start, end)| &raw[start..=end])
    else {
        return (None, None);
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(slice) else {
        tracing::debug!("discarding malformed offer_info payload");
        return (None, None);
    };
    (
        json_amount(&value["price"]["value"]),
        json_amount(&value["discount"]["oldprice"]),
    )
}

/// The feed is inconsistent about numbers vs. numeric strings.
fn json_amount(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_docs_with_title_and_passages() {
        let xml = r"<yandexsearch><response><results><grouping>
            <group><doc>
              <url>https://techshop.ru/item/1</url>
              <domain>techshop.ru</domain>
              <title>Коммутатор SW-24</title>
              <passages><passage>Цена 12 500 руб. в наличии</passage></passages>
            </doc></group>
            <group><doc>
              <url>https://other.ru/p/2</url>
              <title>SW-24 купить</title>
            </doc></group>
        </grouping></results></response></yandexsearch>";

        let hits = parse_search_results(xml).expect("should parse");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://techshop.ru/item/1");
        assert_eq!(hits[0].source_name.as_deref(), Some("techshop.ru"));
        assert!(hits[0].snippet.contains("Коммутатор SW-24"));
        assert!(hits[0].snippet.contains("12 500 руб."));
        assert_eq!(hits[1].source_name.as_deref(), Some("other.ru"));
    }

    #[test]
    fn error_element_aborts_parsing() {
        let xml = r#"<yandexsearch><response>
            <error code="32">Превышен лимит запросов</error>
        </response></yandexsearch>"#;

        let err = parse_search_results(xml).unwrap_err();
        match err {
            ScraperError::SearchApi { message } => {
                assert!(message.contains("лимит"));
            }
            other => panic!("expected SearchApi error, got {other:?}"),
        }
    }

    #[test]
    fn offer_info_payload_yields_structured_prices() {
        let xml = r#"<yandexsearch><response><results><grouping>
            <group><doc>
              <url>https://www.ozon.ru/product/9</url>
              <title>Коммутатор SW-24</title>
              <properties>
                <offer_info><![CDATA[{"price":{"value":"11990","currency":"RUR"},"discount":{"oldprice":"13990"}}]]></offer_info>
              </properties>
            </doc></group>
        </grouping></results></response></yandexsearch>"#;

        let hits = parse_search_results(xml).expect("should parse");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].offer_price, Some(11_990.0));
        assert_eq!(hits[0].offer_old_price, Some(13_990.0));
    }

    #[test]
    fn malformed_offer_info_falls_back_to_none() {
        let xml = r"<yandexsearch><response><results><grouping>
            <group><doc>
              <url>https://techshop.ru/item/1</url>
              <properties><offer_info>not json at all</offer_info></properties>
            </doc></group>
        </grouping></results></response></yandexsearch>";

        let hits = parse_search_results(xml).expect("should parse");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].offer_price, None);
        assert_eq!(hits[0].offer_old_price, None);
    }

    #[test]
    fn offer_info_accepts_numeric_json_values() {
        let (price, old) =
            parse_offer_info(r#"{"price":{"value":5990.5},"discount":{"oldprice":6990}}"#);
        assert_eq!(price, Some(5990.5));
        assert_eq!(old, Some(6990.0));
    }

    #[test]
    fn doc_without_url_is_dropped() {
        let xml = r"<yandexsearch><response><results><grouping>
            <group><doc><title>битый результат</title></doc></group>
        </grouping></results></response></yandexsearch>";
        let hits = parse_search_results(xml).expect("should parse");
        assert!(hits.is_empty());
    }
}
