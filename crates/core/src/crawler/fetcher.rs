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

use std::time::Duration;

use futures::StreamExt;
use rand::seq::SliceRandom;
use rand::Rng;
use url::Url;

use crate::config::CrawlerConfig;

use super::{Error, Result};

/// Browser-like user agents; one is chosen uniformly at random per run.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Safari/605.1.15",
];

/// Content-Type prefixes whose bodies are worth decoding. Anything else
/// comes back as an empty body.
const DECODABLE_CONTENT_TYPES: &[&str] = &[
    "text/",
    "application/json",
    "application/xml",
    "application/xhtml",
    "application/javascript",
];

#[derive(Debug)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    pub body: String,
}

pub struct Fetcher {
    client: reqwest::Client,
    jitter_seconds: f64,
    max_content_length: usize,
}

fn reqwest_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::default();
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        reqwest::header::HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        reqwest::header::CONNECTION,
        reqwest::header::HeaderValue::from_static("keep-alive"),
    );

    let user_agent = USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0]);

    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .cookie_store(true)
        .danger_accept_invalid_certs(config.ignore_ssl)
        .default_headers(headers)
        .user_agent(user_agent);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
    }

    Ok(builder.build()?)
}

impl Fetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: reqwest_client(config)?,
            jitter_seconds: config.jitter_seconds,
            max_content_length: config.max_content_length,
        })
    }

    async fn jitter(&self) {
        if self.jitter_seconds > 0.0 {
            let sleep = rand::thread_rng().gen_range(0.0..=self.jitter_seconds);
            tokio::time::sleep(Duration::from_secs_f64(sleep)).await;
        }
    }

    /// GET with redirect following. The body is decoded as UTF-8 with
    /// replacement only when the Content-Type says it is text-shaped.
    pub async fn get(&self, url: &Url) -> Result<FetchedPage> {
        self.jitter().await;

        let res = self.client.get(url.clone()).send().await?;

        let status = res.status().as_u16();
        let final_url = res.url().clone();
        let headers = res.headers().clone();

        if let Some(len) = headers
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
        {
            if len > self.max_content_length {
                return Err(Error::ContentTooLarge);
            }
        }

        let body = if decodable(&headers) {
            let mut bytes = Vec::new();
            let mut stream = res.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                bytes.extend_from_slice(&chunk);
                if bytes.len() > self.max_content_length {
                    return Err(Error::ContentTooLarge);
                }
            }
            String::from_utf8_lossy(&bytes).into_owned()
        } else {
            String::new()
        };

        Ok(FetchedPage {
            url: final_url,
            status,
            headers,
            body,
        })
    }

    /// HEAD for content-type prefetch. Callers treat a failure as "assume
    /// HTML": servers skip or botch HEAD often enough that the conservative
    /// path is the useful one.
    pub async fn head(&self, url: &Url) -> Result<(reqwest::header::HeaderMap, u16)> {
        self.jitter().await;

        let res = self.client.head(url.clone()).send().await?;
        Ok((res.headers().clone(), res.status().as_u16()))
    }
}

fn decodable(headers: &reqwest::header::HeaderMap) -> bool {
    let Some(content_type) = headers.get(reqwest::header::CONTENT_TYPE) else {
        return true;
    };
    let Ok(content_type) = content_type.to_str() else {
        return false;
    };
    if content_type.is_empty() {
        return true;
    }

    let content_type = content_type.to_ascii_lowercase();
    DECODABLE_CONTENT_TYPES
        .iter()
        .any(|prefix| content_type.starts_with(prefix))
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
    fn text_shaped_content_types_decode() {
        for ct in [
            "text/html; charset=utf-8",
            "text/plain",
            "application/json",
            "application/xhtml+xml",
            "application/javascript",
            "application/xml",
        ] {
            assert!(decodable(&headers_with(ct)), "{ct}");
        }
    }

    #[test]
    fn binary_content_types_do_not() {
        for ct in ["image/png", "application/octet-stream", "video/mp4"] {
            assert!(!decodable(&headers_with(ct)), "{ct}");
        }
    }

    #[test]
    fn missing_content_type_is_decodable() {
        assert!(decodable(&HeaderMap::new()));
    }
}
