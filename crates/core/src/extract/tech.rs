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

//! Coarse technology fingerprinting from response headers and gross HTML
//! substrings. Deliberately cheap; the store dedups repeat sightings.

use reqwest::header::HeaderMap;

const FINGERPRINT_HEADERS: &[&str] = &["server", "x-powered-by"];

const BODY_FINGERPRINTS: &[(&str, &str)] = &[
    ("wp-content", "WordPress"),
    ("react", "React"),
    ("vue", "Vue.js"),
    ("bootstrap", "Bootstrap"),
];

pub fn from_headers(headers: &HeaderMap) -> Vec<String> {
    let mut out = Vec::new();

    for name in FINGERPRINT_HEADERS {
        let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        out.push(format!("{name}: {value}"));
    }

    out
}

pub fn from_html(body: &str) -> Vec<String> {
    let lower = body.to_ascii_lowercase();

    BODY_FINGERPRINTS
        .iter()
        .filter(|(needle, _)| lower.contains(needle))
        .map(|(_, tech)| tech.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn header_fingerprints() {
        let mut headers = HeaderMap::new();
        headers.insert("server", HeaderValue::from_static("nginx/1.25"));
        headers.insert("x-powered-by", HeaderValue::from_static("PHP/8.2"));

        let techs = from_headers(&headers);
        assert!(techs.contains(&"server: nginx/1.25".to_string()));
        assert!(techs.contains(&"x-powered-by: PHP/8.2".to_string()));
    }

    #[test]
    fn body_fingerprints() {
        let html = r#"<link href="/wp-content/themes/x.css"><script src="/React.production.js">"#;
        let techs = from_html(html);

        assert!(techs.contains(&"WordPress".to_string()));
        assert!(techs.contains(&"React".to_string()));
        assert!(!techs.contains(&"Bootstrap".to_string()));
    }
}
