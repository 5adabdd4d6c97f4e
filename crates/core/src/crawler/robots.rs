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

//! robots.txt and sitemap ingestion.
//!
//! For reconnaissance the interesting part of robots.txt is the paths it
//! names: Allow and Disallow rules alike become depth-1 frontier seeds,
//! and declared sitemaps are fetched and mined for `<loc>` entries.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use quick_xml::events::Event;
use url::Url;

use crate::urls;

use super::{seed_into_frontier, CrawlContext};

const MAX_SITEMAP_NESTING: usize = 5;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RobotsRules {
    /// Wildcard-free Allow/Disallow paths, in file order.
    pub rule_paths: Vec<String>,
    pub sitemaps: Vec<String>,
}

pub fn parse_robots(body: &str) -> RobotsRules {
    let mut rules = RobotsRules::default();

    for line in body.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        let Some((directive, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match directive.trim().to_ascii_lowercase().as_str() {
            "allow" | "disallow" => {
                if value.starts_with('/') && !value.contains('*') {
                    rules.rule_paths.push(value.to_string());
                }
            }
            "sitemap" => rules.sitemaps.push(value.to_string()),
            _ => {}
        }
    }

    rules
}

pub async fn ingest(ctx: &Arc<CrawlContext>, origin: &Url) {
    let Ok(robots_url) = origin.join("/robots.txt") else {
        return;
    };

    let page = match ctx.fetcher.get(&robots_url).await {
        Ok(page) if page.status == 200 => page,
        Ok(page) => {
            tracing::debug!("no robots.txt at {} (status {})", robots_url, page.status);
            return;
        }
        Err(err) => {
            tracing::debug!("robots.txt fetch failed: {err}");
            return;
        }
    };

    let rules = parse_robots(&page.body);
    tracing::info!(
        "robots.txt: {} rule paths, {} sitemaps",
        rules.rule_paths.len(),
        rules.sitemaps.len()
    );

    for path in &rules.rule_paths {
        if let Some(url) = urls::normalize(path, origin) {
            seed_into_frontier(ctx, url, 1, "robots");
        }
    }

    for sitemap in &rules.sitemaps {
        if let Some(url) = urls::normalize(sitemap, origin) {
            ingest_sitemap(ctx, url, 0).await;
        }
    }
}

fn ingest_sitemap(ctx: &Arc<CrawlContext>, url: Url, nesting: usize) -> BoxFuture<'_, ()> {
    async move {
        if nesting >= MAX_SITEMAP_NESTING {
            return;
        }

        let page = match ctx.fetcher.get(&url).await {
            Ok(page) if page.status == 200 => page,
            Ok(_) | Err(_) => {
                tracing::debug!("sitemap fetch failed: {url}");
                return;
            }
        };

        for entry in parse_sitemap(&page.body) {
            match entry {
                SitemapEntry::Url(loc) => {
                    if let Some(normalized) = urls::normalize(loc.as_str(), &url) {
                        seed_into_frontier(ctx, normalized, 1, "sitemap");
                    }
                }
                SitemapEntry::Sitemap(loc) => {
                    ingest_sitemap(ctx, loc, nesting + 1).await;
                }
            }
        }
    }
    .boxed()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SitemapEntry {
    Url(Url),
    Sitemap(Url),
}

fn parse_sitemap(s: &str) -> Vec<SitemapEntry> {
    let mut reader = quick_xml::Reader::from_str(s);

    let mut res = vec![];

    let mut in_sitemap = false;
    let mut in_url = false;
    let mut in_loc = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.name().as_ref() == b"sitemap" {
                    in_sitemap = true;
                } else if e.name().as_ref() == b"url" {
                    in_url = true;
                } else if e.name().as_ref() == b"loc" {
                    in_loc = true;
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"sitemap" {
                    in_sitemap = false;
                } else if e.name().as_ref() == b"url" {
                    in_url = false;
                } else if e.name().as_ref() == b"loc" {
                    in_loc = false;
                }
            }
            Ok(Event::Text(e)) => {
                let Ok(text) = e.unescape() else {
                    continue;
                };
                if in_sitemap && in_loc {
                    if let Ok(url) = Url::parse(text.trim()) {
                        res.push(SitemapEntry::Sitemap(url));
                    }
                } else if in_url && in_loc {
                    if let Ok(url) = Url::parse(text.trim()) {
                        res.push(SitemapEntry::Url(url));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("failed to parse sitemap: {}", e);
                break;
            }
            _ => (),
        }
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_paths_and_sitemaps() {
        let body = r#"# robots for test.com
User-agent: *
Disallow: /admin/
Disallow: /private/*.html
Allow: /public/
allow: /mixed-case
Disallow:
Crawl-delay: 5

SiTeMaP: https://test.com/sitemap.xml
Sitemap: https://test.com/sitemap-news.xml"#;

        let rules = parse_robots(body);
        assert_eq!(rules.rule_paths, vec!["/admin/", "/public/", "/mixed-case"]);
        assert_eq!(
            rules.sitemaps,
            vec![
                "https://test.com/sitemap.xml",
                "https://test.com/sitemap-news.xml"
            ]
        );
    }

    #[test]
    fn comments_are_stripped() {
        let rules = parse_robots("Disallow: /secret/ # staging only");
        assert_eq!(rules.rule_paths, vec!["/secret/"]);
    }

    #[test]
    fn sitemap_index() {
        let body = r#"<sitemapindex>
        <sitemap>
        <loc>https://test.com/sitemap-a.xml</loc>
        </sitemap>
        <sitemap>
        <loc>
        https://test.com/sitemap-b.xml
        </loc>
        </sitemap>
        </sitemapindex>"#;

        let entries = parse_sitemap(body);
        assert_eq!(
            entries,
            vec![
                SitemapEntry::Sitemap("https://test.com/sitemap-a.xml".parse().unwrap()),
                SitemapEntry::Sitemap("https://test.com/sitemap-b.xml".parse().unwrap()),
            ]
        );
    }

    #[test]
    fn sitemap_urlset() {
        let body = r#"<urlset>
        <url>
        <lastmod>2024-02-10T05:40:04+00:00</lastmod>
        <loc>https://test.com/products</loc>
        </url>
        <url>
        <loc>
        https://test.com/products/42
        </loc>
        </url>
        </urlset>"#;

        let entries = parse_sitemap(body);
        assert_eq!(
            entries,
            vec![
                SitemapEntry::Url("https://test.com/products".parse().unwrap()),
                SitemapEntry::Url("https://test.com/products/42".parse().unwrap()),
            ]
        );
    }

    #[test]
    fn malformed_xml_yields_nothing() {
        assert_eq!(parse_sitemap("not xml at all"), vec![]);
    }
}
