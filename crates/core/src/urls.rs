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

//! URL canonicalization and the scope gate.
//!
//! Every raw URL string discovered anywhere in the crawl passes through
//! [`normalize`] before it is compared, stored or admitted to the frontier.
//! The serialized form of the returned [`Url`] is the identity key for
//! visitation: two raw strings that normalize to the same URL are the same
//! URL for all purposes.

use url::Url;

/// Extensions that are recorded as file sightings but never fetched.
pub const IGNORED_EXTENSIONS: &[&str] = &[
    "css", "png", "jpg", "jpeg", "gif", "svg", "ico", "woff", "woff2", "ttf", "eot", "mp4", "mp3",
    "pdf", "zip", "gz", "tar", "rar", "webp", "xml", "bmp", "tiff", "otf", "mov", "avi", "wmv",
    "flv",
];

const REJECTED_PREFIXES: &[&str] = &["javascript:", "mailto:", "data:", "tel:", "#"];

/// Canonicalize `raw` against `base`.
///
/// Rules, applied in order: trim, reject pseudo-schemes and fragments-only
/// references, promote protocol-relative references to https, resolve
/// relative references against `base`, require http(s) and a host, collapse
/// slash runs in the path, drop the fragment. The query survives since
/// parameter names are a first-class finding.
pub fn normalize(raw: &str, base: &Url) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let lower = raw.to_ascii_lowercase();
    if REJECTED_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return None;
    }

    let promoted;
    let raw = if raw.starts_with("//") {
        promoted = format!("https:{raw}");
        &promoted
    } else {
        raw
    };

    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(raw).ok()?,
        Err(_) => return None,
    };

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str()?;

    if url.path().is_empty() {
        url.set_path("/");
    } else if url.path().contains("//") {
        let collapsed = collapse_slashes(url.path());
        url.set_path(&collapsed);
    }

    url.set_fragment(None);

    Some(url)
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    out
}

/// The domain that bounds recursion, locked once by the seed controller.
///
/// A URL is in scope iff its host (with a single leading `www.` stripped
/// for comparison) equals the root domain or is a subdomain of it.
#[derive(Debug, Clone)]
pub struct ScopeGate {
    root_domain: String,
}

impl ScopeGate {
    pub fn new(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        let root = host.strip_prefix("www.").unwrap_or(&host);

        Self {
            root_domain: root.to_string(),
        }
    }

    pub fn root_domain(&self) -> &str {
        &self.root_domain
    }

    pub fn contains(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        host == self.root_domain || host.ends_with(&format!(".{}", self.root_domain))
    }
}

/// File extension of the URL path, lowercased.
pub fn extension(url: &Url) -> Option<String> {
    let file = url.path().rsplit('/').next()?;
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_ignored(url: &Url) -> bool {
    match extension(url) {
        Some(ext) => IGNORED_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// All parent path prefixes ending with `/`, up to and including `/`.
pub fn extract_directories(url: &Url) -> Vec<String> {
    let path = url.path();
    let mut dirs = vec!["/".to_string()];

    for (idx, _) in path.match_indices('/').skip(1) {
        dirs.push(path[..=idx].to_string());
    }

    dirs
}

/// Keys of the query string. Blank values still count.
pub fn extract_query_params(url: &Url) -> Vec<String> {
    let mut params: Vec<String> = Vec::new();

    for (key, _) in url.query_pairs() {
        if key.is_empty() {
            continue;
        }
        if !params.iter().any(|p| p == key.as_ref()) {
            params.push(key.to_string());
        }
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn base() -> Url {
        Url::parse("https://example.com/dir/page.html").unwrap()
    }

    #[test]
    fn rejects_pseudo_schemes() {
        for raw in [
            "javascript:void(0)",
            "mailto:someone@example.com",
            "data:text/plain;base64,Zm9v",
            "tel:+4512345678",
            "#top",
            "",
            "   ",
        ] {
            assert_eq!(normalize(raw, &base()), None, "{raw:?}");
        }
    }

    #[test]
    fn resolves_relative_references() {
        assert_eq!(
            normalize("/a/b", &base()).unwrap().as_str(),
            "https://example.com/a/b"
        );
        assert_eq!(
            normalize("other.html", &base()).unwrap().as_str(),
            "https://example.com/dir/other.html"
        );
        assert_eq!(
            normalize("../up.html", &base()).unwrap().as_str(),
            "https://example.com/up.html"
        );
    }

    #[test]
    fn promotes_protocol_relative() {
        assert_eq!(
            normalize("//cdn.example.com/lib.js", &base()).unwrap().as_str(),
            "https://cdn.example.com/lib.js"
        );
    }

    #[test]
    fn lowercases_host_and_collapses_path() {
        assert_eq!(
            normalize("https://EXAMPLE.com//a///b", &base()).unwrap().as_str(),
            "https://example.com/a/b"
        );
    }

    #[test]
    fn drops_fragment_keeps_query() {
        assert_eq!(
            normalize("/a?q=1#frag", &base()).unwrap().as_str(),
            "https://example.com/a?q=1"
        );
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert_eq!(normalize("ftp://example.com/x", &base()), None);
        assert_eq!(normalize("chrome-extension://abc/x", &base()), None);
    }

    #[test]
    fn fragment_variants_share_a_key() {
        let a = normalize("/a", &base()).unwrap();
        let b = normalize("/a#x", &base()).unwrap();
        let c = normalize("/a#y", &base()).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn scope_gate() {
        let scope = ScopeGate::new("www.test.com");
        assert_eq!(scope.root_domain(), "test.com");

        let in_scope = [
            "https://test.com/",
            "https://www.test.com/x",
            "https://sub.test.com/x",
            "https://a.b.test.com/",
        ];
        for raw in in_scope {
            assert!(scope.contains(&Url::parse(raw).unwrap()), "{raw}");
        }

        let out_of_scope = [
            "https://nottest.com/",
            "https://test.com.evil.com/",
            "https://other.org/",
        ];
        for raw in out_of_scope {
            assert!(!scope.contains(&Url::parse(raw).unwrap()), "{raw}");
        }
    }

    #[test]
    fn ignored_extensions() {
        assert!(is_ignored(&Url::parse("https://t.com/logo.PNG").unwrap()));
        assert!(is_ignored(&Url::parse("https://t.com/a/style.css?v=2").unwrap()));
        assert!(!is_ignored(&Url::parse("https://t.com/app.js").unwrap()));
        assert!(!is_ignored(&Url::parse("https://t.com/about").unwrap()));
    }

    #[test]
    fn directories_of_nested_path() {
        let url = Url::parse("https://t.com/a/b/c").unwrap();
        assert_eq!(extract_directories(&url), vec!["/", "/a/", "/a/b/"]);

        let url = Url::parse("https://t.com/").unwrap();
        assert_eq!(extract_directories(&url), vec!["/"]);
    }

    #[test]
    fn query_params_with_blank_values() {
        let url = Url::parse("https://t.com/s?q=1&empty=&q=2").unwrap();
        assert_eq!(extract_query_params(&url), vec!["q", "empty"]);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(path in "[a-z0-9_./-]{0,30}", query in "[a-z]{1,5}=[a-z0-9]{0,5}") {
            let raw = format!("/{path}?{query}");
            if let Some(once) = normalize(&raw, &base()) {
                let twice = normalize(once.as_str(), &base()).unwrap();
                prop_assert_eq!(once, twice);
            }
        }

        #[test]
        fn normalized_urls_are_http(raw in "[a-zA-Z0-9:/._-]{1,40}") {
            if let Some(url) = normalize(&raw, &base()) {
                prop_assert!(matches!(url.scheme(), "http" | "https"));
                prop_assert!(url.fragment().is_none());
                prop_assert!(!url.path().contains("//"));
            }
        }
    }
}
