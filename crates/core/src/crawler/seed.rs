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

//! Target resolution. Probes the target once (https first, http as the
//! fallback), follows redirects, and locks the scope domain from wherever
//! the probe lands. A dead target is not fatal: the crawl proceeds against
//! the user-supplied host and the workers count the failures.

use url::Url;

use crate::urls;

use super::fetcher::Fetcher;
use super::{Error, Result};

#[derive(Debug)]
pub struct Seed {
    /// Canonical URL admitted at depth 0.
    pub start: Url,
    /// Scope domain: final host with a single leading `www.` stripped.
    pub root_domain: String,
}

fn parse_target(target: &str) -> Result<Url> {
    let raw = if target.contains("://") {
        target.to_string()
    } else {
        format!("https://{target}")
    };

    let url = Url::parse(&raw).map_err(|_| Error::InvalidTarget(target.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::InvalidTarget(target.to_string()));
    }

    Ok(url)
}

fn strip_www(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

fn seed_from(url: &Url) -> Result<Seed> {
    let start = urls::normalize(url.as_str(), url)
        .ok_or_else(|| Error::InvalidTarget(url.to_string()))?;
    let root_domain = start
        .host_str()
        .map(strip_www)
        .ok_or_else(|| Error::InvalidTarget(url.to_string()))?;

    Ok(Seed { start, root_domain })
}

pub async fn resolve(target: &str, fetcher: &Fetcher) -> Result<Seed> {
    let url = parse_target(target)?;

    match fetcher.get(&url).await {
        Ok(page) => {
            tracing::info!("target resolved to {} (status {})", page.url, page.status);
            seed_from(&page.url)
        }
        Err(err) => {
            // https-by-default may simply be wrong for this host
            if url.scheme() == "https" && !target.contains("://") {
                let mut http_url = url.clone();
                let _ = http_url.set_scheme("http");

                if let Ok(page) = fetcher.get(&http_url).await {
                    tracing::info!("target resolved to {} (status {})", page.url, page.status);
                    return seed_from(&page.url);
                }
            }

            tracing::warn!("target probe failed ({err}); crawling {} blind", url);
            seed_from(&url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_domain_gets_https() {
        let url = parse_target("test.com").unwrap();
        assert_eq!(url.as_str(), "https://test.com/");
    }

    #[test]
    fn explicit_scheme_is_kept() {
        let url = parse_target("http://test.com/app").unwrap();
        assert_eq!(url.as_str(), "http://test.com/app");
    }

    #[test]
    fn garbage_targets_are_config_errors() {
        assert!(parse_target("").is_err());
        assert!(parse_target("ftp://test.com").is_err());
        assert!(parse_target("http://").is_err());
    }

    #[test]
    fn www_is_stripped_from_scope() {
        let seed = seed_from(&Url::parse("https://www.test.com/home").unwrap()).unwrap();
        assert_eq!(seed.root_domain, "test.com");
        assert_eq!(seed.start.as_str(), "https://www.test.com/home");
    }
}
