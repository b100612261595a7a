//! Event-driven parsing of the NetLab XML envelope.
//!
//! Every response carries a `status` block (`code` 200 on success, plus a
//! `message`) and a `data` payload of repeated elements. Element names live
//! in the `http://ws.web.netlab.com/` namespace; parsing goes by local name
//! so prefixed and unprefixed documents are treated the same.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use pricelab_core::{CatalogRecord, CategoryRecord};

use crate::error::NetlabError;

/// A product as delivered by the feed: upstream id plus the raw property bag.
/// Typed mapping happens in `pricelab-core` once this leaves the client.
#[derive(Debug, Clone)]
pub(crate) struct RawProduct {
    pub id: i64,
    pub properties: HashMap<String, String>,
}

fn local(e: &quick_xml::events::BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn xml_err(context: &str, source: quick_xml::Error) -> NetlabError {
    NetlabError::Xml {
        context: context.to_string(),
        source,
    }
}

/// Checks the embedded `status/code` element.
///
/// # Errors
///
/// - [`NetlabError::MissingElement`] when no `status` block is present.
/// - [`NetlabError::InvalidValue`] when the code is not an integer.
/// - [`NetlabError::Api`] when the embedded code is not 200.
/// - [`NetlabError::Xml`] on a malformed document.
pub(crate) fn ensure_ok(xml: &str, context: &str) -> Result<(), NetlabError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut saw_status = false;
    let mut code: Option<i32> = None;
    let mut raw_code = String::new();
    let mut message: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local(&e);
                if name == "status" {
                    saw_status = true;
                }
                stack.push(name);
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(t)) => {
                let n = stack.len();
                if n >= 2 && stack[n - 2] == "status" {
                    let text = t.unescape().unwrap_or_default().into_owned();
                    match stack[n - 1].as_str() {
                        "code" => {
                            raw_code = text.trim().to_string();
                            code = raw_code.parse::<i32>().ok();
                        }
                        "message" => message = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(context, e)),
            _ => {}
        }
    }

    if !saw_status {
        return Err(NetlabError::MissingElement {
            element: "status",
            context: context.to_string(),
        });
    }
    match code {
        Some(200) => Ok(()),
        Some(c) => Err(NetlabError::Api {
            code: c,
            message: message.unwrap_or_else(|| "request failed".to_string()),
        }),
        None => Err(NetlabError::InvalidValue {
            context: format!("{context}: status/code"),
            value: raw_code,
        }),
    }
}

/// Extracts the catalog list: every `catalog/name` text node.
pub(crate) fn parse_catalogs(xml: &str, context: &str) -> Result<Vec<CatalogRecord>, NetlabError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut catalogs = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(local(&e)),
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(t)) => {
                let n = stack.len();
                if n >= 2 && stack[n - 2] == "catalog" && stack[n - 1] == "name" {
                    let name = t.unescape().unwrap_or_default().into_owned();
                    if !name.is_empty() {
                        catalogs.push(CatalogRecord { name });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(context, e)),
            _ => {}
        }
    }
    Ok(catalogs)
}

/// Extracts `category` elements: id, name, optional parentId, leaf flag.
///
/// An empty or absent `parentId` yields `None`; roots and categories whose
/// parents have not been delivered yet look the same here.
pub(crate) fn parse_categories(
    xml: &str,
    context: &str,
) -> Result<Vec<CategoryRecord>, NetlabError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut categories = Vec::new();
    let mut id: Option<i64> = None;
    let mut name = String::new();
    let mut parent_id: Option<i64> = None;
    let mut leaf = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let n = local(&e);
                if n == "category" {
                    id = None;
                    name.clear();
                    parent_id = None;
                    leaf = false;
                }
                stack.push(n);
            }
            Ok(Event::End(e)) => {
                stack.pop();
                if local_end(&e) == "category" {
                    let Some(cat_id) = id else {
                        return Err(NetlabError::MissingElement {
                            element: "id",
                            context: format!("{context}: category"),
                        });
                    };
                    categories.push(CategoryRecord {
                        id: cat_id,
                        name: name.clone(),
                        parent_id,
                        leaf,
                    });
                }
            }
            Ok(Event::Text(t)) => {
                let n = stack.len();
                if n >= 2 && stack[n - 2] == "category" {
                    let text = t.unescape().unwrap_or_default().into_owned();
                    match stack[n - 1].as_str() {
                        "id" => {
                            id = Some(text.trim().parse::<i64>().map_err(|_| {
                                NetlabError::InvalidValue {
                                    context: format!("{context}: category/id"),
                                    value: text.clone(),
                                }
                            })?);
                        }
                        "name" => name = text,
                        "parentId" => parent_id = text.trim().parse::<i64>().ok(),
                        "leaf" => leaf = text.trim().eq_ignore_ascii_case("true"),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(context, e)),
            _ => {}
        }
    }
    Ok(categories)
}

/// Extracts `goods` elements: the upstream id plus every `property`
/// name/value pair. Properties without a value are simply absent from the
/// map.
pub(crate) fn parse_goods(xml: &str, context: &str) -> Result<Vec<RawProduct>, NetlabError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut goods = Vec::new();
    let mut id: Option<i64> = None;
    let mut properties: HashMap<String, String> = HashMap::new();
    let mut prop_name: Option<String> = None;
    let mut prop_value: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let n = local(&e);
                match n.as_str() {
                    "goods" => {
                        id = None;
                        properties = HashMap::new();
                    }
                    "property" => {
                        prop_name = None;
                        prop_value = None;
                    }
                    _ => {}
                }
                stack.push(n);
            }
            Ok(Event::End(e)) => {
                stack.pop();
                match local_end(&e).as_str() {
                    "property" => {
                        if let (Some(n), Some(v)) = (prop_name.take(), prop_value.take()) {
                            properties.insert(n, v);
                        }
                    }
                    "goods" => {
                        let Some(good_id) = id else {
                            return Err(NetlabError::MissingElement {
                                element: "id",
                                context: format!("{context}: goods"),
                            });
                        };
                        goods.push(RawProduct {
                            id: good_id,
                            properties: std::mem::take(&mut properties),
                        });
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(t)) => {
                let n = stack.len();
                if n < 2 {
                    continue;
                }
                let text = t.unescape().unwrap_or_default().into_owned();
                if stack[n - 2] == "goods" && stack[n - 1] == "id" {
                    id = Some(text.trim().parse::<i64>().map_err(|_| {
                        NetlabError::InvalidValue {
                            context: format!("{context}: goods/id"),
                            value: text.clone(),
                        }
                    })?);
                } else if stack[n - 2] == "property" {
                    match stack[n - 1].as_str() {
                        "name" => prop_name = Some(text),
                        "value" => prop_value = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(context, e)),
            _ => {}
        }
    }
    Ok(goods)
}

/// Extracts the bearer token and its raw expiry string from an
/// authentication response.
pub(crate) fn parse_token(xml: &str, context: &str) -> Result<(String, String), NetlabError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut token: Option<String> = None;
    let mut expired_in: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(local(&e)),
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(t)) => {
                let n = stack.len();
                if n >= 2 && stack[n - 2] == "data" {
                    let text = t.unescape().unwrap_or_default().into_owned();
                    match stack[n - 1].as_str() {
                        "token" => token = Some(text),
                        "expired_in" => expired_in = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(context, e)),
            _ => {}
        }
    }

    let token = token.ok_or(NetlabError::MissingElement {
        element: "token",
        context: context.to_string(),
    })?;
    let expired_in = expired_in.ok_or(NetlabError::MissingElement {
        element: "expired_in",
        context: context.to_string(),
    })?;
    Ok((token, expired_in))
}

fn local_end(e: &quick_xml::events::BytesEnd<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OK_STATUS: &str =
        "<status><code>200</code><message>Успешная операция</message></status>";

    fn envelope(body: &str) -> String {
        format!(
            "<ns2:response xmlns:ns2=\"http://ws.web.netlab.com/\"><return>{OK_STATUS}<data>{body}</data></return></ns2:response>"
        )
    }

    #[test]
    fn ensure_ok_accepts_code_200() {
        let xml = envelope("");
        assert!(ensure_ok(&xml, "test").is_ok());
    }

    #[test]
    fn ensure_ok_surfaces_embedded_error() {
        let xml = "<response><status><code>403</code><message>нет доступа</message></status></response>";
        let err = ensure_ok(xml, "test").unwrap_err();
        match err {
            NetlabError::Api { code, message } => {
                assert_eq!(code, 403);
                assert_eq!(message, "нет доступа");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn ensure_ok_rejects_missing_status() {
        let xml = "<response><data/></response>";
        let err = ensure_ok(xml, "test").unwrap_err();
        assert!(matches!(
            err,
            NetlabError::MissingElement {
                element: "status",
                ..
            }
        ));
    }

    #[test]
    fn ensure_ok_rejects_non_numeric_code() {
        let xml = "<response><status><code>ok</code></status></response>";
        let err = ensure_ok(xml, "test").unwrap_err();
        assert!(matches!(err, NetlabError::InvalidValue { .. }));
    }

    #[test]
    fn parse_catalogs_collects_names() {
        let xml = envelope("<catalog><name>Электроника</name></catalog><catalog><name>Сетевое оборудование</name></catalog>");
        let catalogs = parse_catalogs(&xml, "test").expect("should parse");
        assert_eq!(catalogs.len(), 2);
        assert_eq!(catalogs[0].name, "Электроника");
    }

    #[test]
    fn parse_categories_handles_empty_parent() {
        let xml = envelope(
            "<category><id>10</id><name>Root</name><parentId></parentId><leaf>false</leaf></category>\
             <category><id>11</id><name>Leaf</name><parentId>10</parentId><leaf>true</leaf></category>",
        );
        let cats = parse_categories(&xml, "test").expect("should parse");
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0].parent_id, None);
        assert!(!cats[0].leaf);
        assert_eq!(cats[1].parent_id, Some(10));
        assert!(cats[1].leaf);
    }

    #[test]
    fn parse_categories_rejects_non_numeric_id() {
        let xml = envelope("<category><id>abc</id><name>X</name><leaf>true</leaf></category>");
        assert!(matches!(
            parse_categories(&xml, "test"),
            Err(NetlabError::InvalidValue { .. })
        ));
    }

    #[test]
    fn parse_goods_builds_property_map() {
        let xml = envelope(
            "<goods><id>42</id><properties>\
             <property><name>PN</name><value>ABC-1</value></property>\
             <property><name>название</name><value>Коммутатор</value></property>\
             <property><name>НДС</name></property>\
             </properties></goods>",
        );
        let goods = parse_goods(&xml, "test").expect("should parse");
        assert_eq!(goods.len(), 1);
        assert_eq!(goods[0].id, 42);
        assert_eq!(goods[0].properties.get("PN").map(String::as_str), Some("ABC-1"));
        assert_eq!(
            goods[0].properties.get("название").map(String::as_str),
            Some("Коммутатор")
        );
        // Property without a value is simply absent.
        assert!(!goods[0].properties.contains_key("НДС"));
    }

    #[test]
    fn parse_token_extracts_token_and_expiry() {
        let xml = envelope("<token>abc123</token><expired_in>31.12.2026 23:59</expired_in>");
        let (token, expiry) = parse_token(&xml, "test").expect("should parse");
        assert_eq!(token, "abc123");
        assert_eq!(expiry, "31.12.2026 23:59");
    }

    #[test]
    fn parse_token_missing_token_errors() {
        let xml = envelope("<expired_in>31.12.2026 23:59</expired_in>");
        assert!(matches!(
            parse_token(&xml, "test"),
            Err(NetlabError::MissingElement {
                element: "token",
                ..
            })
        ));
    }
}
