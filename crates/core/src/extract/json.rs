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

//! Recursive walk over parsed JSON documents (API payloads, `__NEXT_DATA__`
//! blobs) hunting for path-shaped strings. Recursion is depth-bounded to
//! guard against pathological inputs.

use serde_json::Value;
use url::Url;

use crate::assets::Category;
use crate::urls;

use super::Discoveries;

const MAX_WALK_DEPTH: usize = 128;

/// Keys whose string values are treated as routes even without further
/// shape checks (Next.js and friends).
const ROUTE_KEYS: &[&str] = &["page", "route", "asPath", "pathname", "href", "url"];

pub fn walk(doc: &Value, base: &Url) -> Discoveries {
    let mut out = Discoveries::default();
    walk_value(doc, base, 0, &mut out);
    out
}

fn walk_value(value: &Value, base: &Url, depth: usize, out: &mut Discoveries) {
    if depth >= MAX_WALK_DEPTH {
        return;
    }

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if let Value::String(s) = child {
                    if ROUTE_KEYS.contains(&key.as_str()) && s.starts_with('/') {
                        record_path(s, base, out);
                        continue;
                    }
                }
                walk_value(child, base, depth + 1, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_value(item, base, depth + 1, out);
            }
        }
        Value::String(s) => {
            if s.starts_with('/') && s.len() > 1 {
                record_path(s, base, out);
            }
        }
        _ => {}
    }
}

fn record_path(path: &str, base: &Url, out: &mut Discoveries) {
    if let Some(url) = urls::normalize(path, base) {
        out.push_asset(Category::Endpoints, url.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://test.com/").unwrap()
    }

    fn endpoints(disc: &Discoveries) -> Vec<&str> {
        disc.assets
            .iter()
            .filter(|(c, _)| *c == Category::Endpoints)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn route_keys_and_path_strings() {
        let doc = json!({
            "props": {
                "page": "/dashboard",
                "items": ["/files/report.pdf", "not-a-path", 42],
            },
            "buildId": "abc123",
        });

        let disc = walk(&doc, &base());
        let found = endpoints(&disc);

        assert!(found.contains(&"https://test.com/dashboard"));
        assert!(found.contains(&"https://test.com/files/report.pdf"));
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn protocol_relative_strings_are_not_roots() {
        // "//cdn..." is scheme-relative, not a path; the bare-string rule
        // still records it since it starts with '/', but normalization
        // resolves it to its own host.
        let doc = json!({"asset": "//cdn.test.com/x.png"});
        let disc = walk(&doc, &base());

        assert_eq!(endpoints(&disc), vec!["https://cdn.test.com/x.png"]);
    }

    #[test]
    fn bare_slash_is_skipped() {
        let doc = json!({"path": "/"});
        let disc = walk(&doc, &base());
        assert!(disc.assets.is_empty());
    }

    #[test]
    fn depth_bound_terminates() {
        let mut doc = json!({"url": "/deepest"});
        for _ in 0..(MAX_WALK_DEPTH + 16) {
            doc = json!([doc]);
        }

        // must return, and the overly deep leaf is dropped
        let disc = walk(&doc, &base());
        assert!(disc.assets.is_empty());
    }
}
