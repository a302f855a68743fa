//! Ordered element-location strategies.
//!
//! A field is described by a list of [`Strategy`] values ordered from the most
//! specific markup to the most generic fallback. [`resolve`] evaluates them in
//! that order and the first strategy that matches anything wins outright.

use crate::normalize::collapse_whitespace;
use itertools::Itertools;
use lazy_static::lazy_static;
use scraper::{ElementRef, Selector};
use serde_json::Value;
use tracing::trace;

const E: &str = "Invalid selector";
lazy_static! {
    static ref LD_JSON: Selector =
        Selector::parse(r#"script[type="application/ld+json"]"#).expect(E);
}

#[derive(Debug)]
pub enum Locator {
    /// Elements matching a CSS selector.
    Css(Selector),
    /// Non-empty attribute values of the elements matching a CSS selector.
    Attr(Selector, &'static str),
    /// Parents of the elements matching a CSS selector.
    Parent(Selector),
    /// String values at a key path inside `application/ld+json` blocks.
    JsonLd(&'static [&'static str]),
}

/// How a matched element or value is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
    Text,
    /// Text up to the first occurrence of the delimiter.
    Before(char),
    /// Rating stored as ten times its value in a class name or token.
    Tenths,
    /// Rating given by the number of matches.
    Cardinality,
}

#[derive(Debug)]
pub struct Strategy {
    pub name: &'static str,
    pub locator: Locator,
    pub decode: Decode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Hit<'a> {
    Element(ElementRef<'a>),
    Value(String),
}

impl<'a> Hit<'a> {
    pub fn text(&self) -> String {
        match self {
            Hit::Element(el) => collapse_whitespace(&el.text().collect::<String>()),
            Hit::Value(v) => collapse_whitespace(v),
        }
    }

    /// Raw token holding an encoded value: the class list of an element, or
    /// the value itself.
    pub fn token(&self) -> String {
        match self {
            Hit::Element(el) => el.value().attr("class").unwrap_or_default().to_string(),
            Hit::Value(v) => v.clone(),
        }
    }

    pub fn element(&self) -> Option<ElementRef<'a>> {
        match self {
            Hit::Element(el) => Some(*el),
            Hit::Value(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct Resolved<'a, 's> {
    pub strategy: &'s Strategy,
    pub hits: Vec<Hit<'a>>,
}

impl<'a, 's> Resolved<'a, 's> {
    /// Decoded text of the first hit, `None` when it is blank.
    pub fn first_text(&self) -> Option<String> {
        let hit = self.hits.first()?;
        let text = match self.strategy.decode {
            Decode::Before(delimiter) => hit
                .text()
                .split(delimiter)
                .next()
                .unwrap_or_default()
                .trim()
                .to_string(),
            _ => hit.text(),
        };
        (!text.is_empty()).then_some(text)
    }
}

impl Strategy {
    fn new(name: &'static str, locator: Locator) -> Self {
        Strategy {
            name,
            locator,
            decode: Decode::Text,
        }
    }

    pub fn css(name: &'static str, selector: &str) -> Self {
        Strategy::new(name, Locator::Css(Selector::parse(selector).expect(E)))
    }

    pub fn attr(name: &'static str, selector: &str, attr: &'static str) -> Self {
        Strategy::new(
            name,
            Locator::Attr(Selector::parse(selector).expect(E), attr),
        )
    }

    pub fn parent(name: &'static str, selector: &str) -> Self {
        Strategy::new(name, Locator::Parent(Selector::parse(selector).expect(E)))
    }

    pub fn json_ld(name: &'static str, path: &'static [&'static str]) -> Self {
        Strategy::new(name, Locator::JsonLd(path))
    }

    pub fn decode(mut self, decode: Decode) -> Self {
        self.decode = decode;
        self
    }

    /// All matches of this strategy below `scope`, in document order.
    pub fn evaluate<'a>(&self, scope: ElementRef<'a>) -> Vec<Hit<'a>> {
        match &self.locator {
            Locator::Css(selector) => scope.select(selector).map(Hit::Element).collect(),
            Locator::Attr(selector, attr) => scope
                .select(selector)
                .filter_map(|el| el.value().attr(attr))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| Hit::Value(v.to_string()))
                .collect(),
            Locator::Parent(selector) => scope
                .select(selector)
                .filter_map(|el| el.parent().and_then(ElementRef::wrap))
                .unique_by(|el| el.id())
                .map(Hit::Element)
                .collect(),
            Locator::JsonLd(path) => json_ld_values(scope, path)
                .into_iter()
                .map(Hit::Value)
                .collect(),
        }
    }
}

/// Returns the matches of the first strategy that yields any, or `None` when
/// every strategy comes back empty.
pub fn resolve<'a, 's>(scope: ElementRef<'a>, strategies: &'s [Strategy]) -> Option<Resolved<'a, 's>> {
    strategies.iter().find_map(|strategy| {
        let hits = strategy.evaluate(scope);
        if hits.is_empty() {
            None
        } else {
            trace!("Strategy {} matched {} time(s)", strategy.name, hits.len());
            Some(Resolved { strategy, hits })
        }
    })
}

fn json_ld_values(scope: ElementRef<'_>, path: &[&str]) -> Vec<String> {
    scope
        .select(&LD_JSON)
        .filter_map(|el| serde_json::from_str::<Value>(&el.text().collect::<String>()).ok())
        .flat_map(json_ld_nodes)
        .filter_map(|node| lookup(&node, path))
        .collect()
}

fn json_ld_nodes(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("@graph") {
            Some(Value::Array(mut items)) => {
                items.insert(0, Value::Object(map));
                items
            }
            Some(other) => {
                map.insert("@graph".to_string(), other);
                vec![Value::Object(map)]
            }
            None => vec![Value::Object(map)],
        },
        other => vec![other],
    }
}

fn lookup(node: &Value, path: &[&str]) -> Option<String> {
    let value = path.iter().try_fold(node, |cur, key| cur.get(key))?;
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
