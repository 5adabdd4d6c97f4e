// Reconmapper is an open source reconnaissance web crawler.
// Copyright (C) 2024 Stract ApS
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Lenient DOM walk over an HTML response: link-bearing attributes, forms
//! and their inputs, HTML comments, and JSON-bearing inline scripts.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::assets::Category;
use crate::urls;

use super::Discoveries;

const LINK_ATTRS: &[&str] = &["href", "src", "action", "data-src"];

const MIN_COMMENT_LEN: usize = 4;
const MAX_COMMENT_LEN: usize = 300;

static BASE: Lazy<Selector> = Lazy::new(|| Selector::parse("base[href]").unwrap());
static LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[href], [src], [action], [data-src]").unwrap());
static FORMS: Lazy<Selector> = Lazy::new(|| Selector::parse("form").unwrap());
static FORM_FIELDS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input[name], select[name], textarea[name]").unwrap());
static SCRIPTS: Lazy<Selector> = Lazy::new(|| Selector::parse("script").unwrap());

pub struct DomExtraction {
    pub discoveries: Discoveries,
    /// Parsed documents from JSON-bearing inline scripts, ready for the
    /// JSON walker.
    pub json_docs: Vec<serde_json::Value>,
}

pub fn extract(html: &str, page_url: &Url) -> DomExtraction {
    let document = Html::parse_document(html);
    let mut out = Discoveries::default();
    let mut json_docs = Vec::new();

    // <base href> shifts relative resolution for the whole document.
    let base = document
        .select(&BASE)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| urls::normalize(href, page_url))
        .unwrap_or_else(|| page_url.clone());

    for element in document.select(&LINKS) {
        let name = element.value().name();
        if name == "base" {
            continue;
        }

        for attr in LINK_ATTRS {
            let Some(raw) = element.value().attr(attr) else {
                continue;
            };
            let Some(url) = urls::normalize(raw, &base) else {
                continue;
            };

            if name == "script" && *attr == "src" {
                out.push_asset(Category::Files, url.as_str());
            }

            out.push_url(url, false);
        }
    }

    for form in document.select(&FORMS) {
        let method = form
            .value()
            .attr("method")
            .map(|m| m.trim().to_ascii_uppercase())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "GET".to_string());

        let action = form
            .value()
            .attr("action")
            .filter(|a| !a.trim().is_empty())
            .and_then(|a| urls::normalize(a, &base))
            .unwrap_or_else(|| page_url.clone());

        let mut names = Vec::new();
        for field in form.select(&FORM_FIELDS) {
            let Some(name) = field.value().attr("name") else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            out.push_asset(Category::Inputs, name);
            out.push_asset(Category::Params, name);
            names.push(name.to_string());
        }

        let quoted: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
        out.push_asset(
            Category::Forms,
            format!("{method} {action} Params: [{}]", quoted.join(", ")),
        );
    }

    for script in document.select(&SCRIPTS) {
        if script.value().attr("src").is_some() {
            continue;
        }

        let id = script.value().attr("id").unwrap_or_default();
        let kind = script.value().attr("type").unwrap_or_default();
        if id != "__NEXT_DATA__" && !kind.contains("json") {
            continue;
        }

        let text: String = script.text().collect();
        if let Ok(doc) = serde_json::from_str::<serde_json::Value>(text.trim()) {
            json_docs.push(doc);
        }
    }

    for node in document.tree.nodes() {
        let Some(comment) = node.value().as_comment() else {
            continue;
        };
        let text = comment.trim();
        if text.len() > MIN_COMMENT_LEN && text.len() < MAX_COMMENT_LEN {
            out.push_asset(Category::Comments, text);
        }
    }

    DomExtraction {
        discoveries: out,
        json_docs,
    }
}
