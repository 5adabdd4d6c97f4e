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

use std::collections::HashSet;
use std::path::PathBuf;

use crate::assets::Category;

pub mod defaults;

/// Immutable run configuration. Constructed once from the CLI surface and
/// shared by reference across the pool.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrawlerConfig {
    /// Seed domain or URL.
    pub target: String,

    #[serde(default = "defaults::Crawler::num_workers")]
    pub num_workers: usize,

    #[serde(default = "defaults::Crawler::timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "defaults::Crawler::connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    #[serde(default = "defaults::Crawler::max_depth")]
    pub max_depth: u32,

    #[serde(default = "defaults::Crawler::max_redirects")]
    pub max_redirects: usize,

    #[serde(default)]
    pub use_wayback: bool,

    #[serde(default = "defaults::Crawler::use_sitemap")]
    pub use_sitemap: bool,

    #[serde(default = "defaults::Crawler::ignore_ssl")]
    pub ignore_ssl: bool,

    #[serde(default)]
    pub proxy: Option<String>,

    #[serde(default = "defaults::Crawler::jitter_seconds")]
    pub jitter_seconds: f64,

    /// Categories to record; `None` records everything.
    #[serde(default)]
    pub category_filter: Option<HashSet<Category>>,

    #[serde(default)]
    pub output_path: Option<PathBuf>,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default = "defaults::Crawler::wayback_fetch_limit")]
    pub wayback_fetch_limit: usize,

    #[serde(default = "defaults::Crawler::wayback_admit_cap")]
    pub wayback_admit_cap: usize,

    #[serde(default = "defaults::Crawler::wayback_depth")]
    pub wayback_depth: u32,

    #[serde(default = "defaults::Crawler::max_content_length")]
    pub max_content_length: usize,
}

impl CrawlerConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            num_workers: defaults::Crawler::num_workers(),
            timeout_seconds: defaults::Crawler::timeout_seconds(),
            connect_timeout_seconds: defaults::Crawler::connect_timeout_seconds(),
            max_depth: defaults::Crawler::max_depth(),
            max_redirects: defaults::Crawler::max_redirects(),
            use_wayback: false,
            use_sitemap: defaults::Crawler::use_sitemap(),
            ignore_ssl: defaults::Crawler::ignore_ssl(),
            proxy: None,
            jitter_seconds: defaults::Crawler::jitter_seconds(),
            category_filter: None,
            output_path: None,
            verbose: false,
            wayback_fetch_limit: defaults::Crawler::wayback_fetch_limit(),
            wayback_admit_cap: defaults::Crawler::wayback_admit_cap(),
            wayback_depth: defaults::Crawler::wayback_depth(),
            max_content_length: defaults::Crawler::max_content_length(),
        }
    }

    /// Parse `-f/--filter` names into the category filter. Unknown names
    /// are a configuration error.
    pub fn parse_filter(names: &[String]) -> Result<Option<HashSet<Category>>, String> {
        if names.is_empty() {
            return Ok(None);
        }

        let mut filter = HashSet::new();
        for name in names {
            let category: Category = name
                .parse()
                .map_err(|_| format!("unknown category: {name}"))?;
            filter.insert(category);
        }

        Ok(Some(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parses_known_categories() {
        let filter =
            CrawlerConfig::parse_filter(&["secrets".to_string(), "emails".to_string()])
                .unwrap()
                .unwrap();
        assert!(filter.contains(&Category::Secrets));
        assert!(filter.contains(&Category::Emails));
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn filter_rejects_unknown_names() {
        assert!(CrawlerConfig::parse_filter(&["nonsense".to_string()]).is_err());
    }

    #[test]
    fn empty_filter_means_all() {
        assert!(CrawlerConfig::parse_filter(&[]).unwrap().is_none());
    }
}
