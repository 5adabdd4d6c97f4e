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

use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::FutureExt;
use url::Url;

use crate::assets::Category;
use crate::extract::{dom, json, tech, text, Discoveries};
use crate::urls;

use super::frontier::{FrontierEntry, Pull};
use super::CrawlContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    Html,
    Script,
    Json,
    Other,
}

/// Missing or empty Content-Type counts as HTML: servers drop the header
/// often enough that skipping those bodies would lose real pages.
fn classify(headers: &reqwest::header::HeaderMap) -> ContentKind {
    let content_type = headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.is_empty() {
        return ContentKind::Html;
    }
    if content_type.contains("text/html") || content_type.contains("application/xhtml") {
        return ContentKind::Html;
    }
    if content_type.contains("javascript") || content_type.contains("ecmascript") {
        return ContentKind::Script;
    }
    if content_type.contains("json") {
        return ContentKind::Json;
    }

    ContentKind::Other
}

pub struct Worker {
    id: usize,
    ctx: Arc<CrawlContext>,
}

impl Worker {
    pub fn new(id: usize, ctx: Arc<CrawlContext>) -> Self {
        Self { id, ctx }
    }

    pub async fn run(self) {
        loop {
            match self.ctx.frontier.pull().await {
                Pull::Shutdown => break,
                Pull::Entry(entry) => {
                    // Extractor bugs must not take the pool down; the task
                    // is marked done on every path.
                    let res = std::panic::AssertUnwindSafe(self.process(&entry))
                        .catch_unwind()
                        .await;
                    if res.is_err() {
                        tracing::error!("worker {} panicked on {}", self.id, entry.url);
                    }
                    self.ctx.frontier.task_done();
                }
            }
        }
    }

    async fn process(&self, entry: &FrontierEntry) {
        let ctx = &self.ctx;
        ctx.state.set_current(self.id, entry.url.as_str());
        tracing::debug!(depth = entry.depth, "fetching {}", entry.url);

        let page = match ctx.fetcher.get(&entry.url).await {
            Ok(page) => page,
            Err(err) => {
                tracing::debug!("fetch failed for {}: {err}", entry.url);
                ctx.state.urls_failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        ctx.state.urls_processed.fetch_add(1, Ordering::Relaxed);

        let source = entry.url.as_str();
        for param in urls::extract_query_params(&page.url) {
            ctx.store.add(Category::Params, &param, source);
        }
        for dir in urls::extract_directories(&page.url) {
            ctx.store.add(Category::Directories, &dir, source);
        }

        // Redirects were already followed; whatever still reports 3xx (or
        // any error status) has nothing worth extracting.
        if page.status >= 300 {
            tracing::debug!("skipping {} (status {})", page.url, page.status);
            return;
        }

        if ctx.scope.contains(&page.url) {
            ctx.store
                .add(Category::Endpoints, page.url.as_str(), &entry.source);
            self.record_subdomain(&page.url, source);
            if urls::extension(&page.url).is_some() {
                ctx.store
                    .add(Category::Files, page.url.as_str(), &entry.source);
            }
        }

        let mut discoveries = Discoveries::default();
        let mut json_docs = Vec::new();

        match classify(&page.headers) {
            ContentKind::Html => {
                let dom = dom::extract(&page.body, &page.url);
                discoveries.merge(dom.discoveries);
                json_docs = dom.json_docs;
                discoveries.merge(text::extract(&page.body, &page.url));

                for fingerprint in tech::from_html(&page.body) {
                    ctx.store.add(Category::Tech, &fingerprint, source);
                }
            }
            ContentKind::Script => {
                discoveries.merge(text::extract(&page.body, &page.url));
            }
            ContentKind::Json => {
                discoveries.merge(text::extract(&page.body, &page.url));
                if let Ok(doc) = serde_json::from_str(&page.body) {
                    json_docs.push(doc);
                }
            }
            ContentKind::Other => {}
        }

        for doc in &json_docs {
            discoveries.merge(json::walk(doc, &page.url));
        }

        for fingerprint in tech::from_headers(&page.headers) {
            ctx.store.add(Category::Tech, &fingerprint, source);
        }

        self.route(discoveries, entry, &page.url);
    }

    /// Apply extractor output: assets into the store, URL candidates
    /// through the scope and extension gates into the frontier.
    fn route(&self, discoveries: Discoveries, entry: &FrontierEntry, page_url: &Url) {
        let ctx = &self.ctx;
        let source = page_url.as_str();

        for (category, value) in discoveries.assets {
            // The JSON walker emits endpoint URLs without seeing the scope;
            // keep the endpoints/external split closed here.
            if category == Category::Endpoints {
                match Url::parse(&value) {
                    Ok(url) if ctx.scope.contains(&url) => {
                        ctx.store.add(Category::Endpoints, &value, source);
                    }
                    Ok(_) => {
                        ctx.store.add(Category::ExternalEndpoints, &value, source);
                    }
                    Err(_) => {}
                }
                continue;
            }

            ctx.store.add(category, &value, source);
        }

        for candidate in discoveries.urls {
            if !ctx.scope.contains(&candidate.url) {
                ctx.store
                    .add(Category::ExternalEndpoints, candidate.url.as_str(), source);
                continue;
            }

            self.record_subdomain(&candidate.url, source);

            if urls::is_ignored(&candidate.url) {
                ctx.store.add(Category::Files, candidate.url.as_str(), source);
                continue;
            }

            let depth = if candidate.terminal {
                ctx.config.max_depth
            } else {
                entry.depth + 1
            };

            ctx.frontier.admit(FrontierEntry {
                url: candidate.url,
                depth,
                source: source.to_string(),
            });
        }
    }

    fn record_subdomain(&self, url: &Url, source: &str) {
        if let Some(host) = url.host_str() {
            self.ctx
                .store
                .add(Category::Subdomains, &host.to_ascii_lowercase(), source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

    fn headers_with(ct: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        headers
    }

    #[test]
    fn classification() {
        assert_eq!(
            classify(&headers_with("text/html; charset=utf-8")),
            ContentKind::Html
        );
        assert_eq!(
            classify(&headers_with("application/xhtml+xml")),
            ContentKind::Html
        );
        assert_eq!(
            classify(&headers_with("application/javascript")),
            ContentKind::Script
        );
        assert_eq!(
            classify(&headers_with("text/javascript")),
            ContentKind::Script
        );
        assert_eq!(classify(&headers_with("application/json")), ContentKind::Json);
        assert_eq!(classify(&headers_with("image/png")), ContentKind::Other);
    }

    #[test]
    fn missing_content_type_is_html() {
        assert_eq!(classify(&HeaderMap::new()), ContentKind::Html);
    }
}
