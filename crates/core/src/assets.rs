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

//! The deduplicating sink for every finding the crawl produces.
//!
//! Workers only ever call [`AssetStore::add`]; the report writer reads a
//! [`AssetStore::snapshot`] after the pool has drained. First sighting wins
//! both the dedup race and the position in the category's record list.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use strum::IntoEnumIterator;

use crate::state::RunState;

/// Values longer than this are dropped rather than stored.
pub const MAX_VALUE_LEN_BYTES: usize = 2000;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Endpoints,
    ExternalEndpoints,
    ApiEndpoints,
    Directories,
    Files,
    Inputs,
    Params,
    Forms,
    Emails,
    CloudBuckets,
    Secrets,
    Subdomains,
    Comments,
    Tech,
}

impl Category {
    /// Sightings in these categories get a high-priority log line.
    pub fn is_sensitive(self) -> bool {
        matches!(
            self,
            Category::Secrets | Category::CloudBuckets | Category::Subdomains
        )
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AssetRecord {
    pub value: String,
    pub source: String,
    pub timestamp: String,
}

#[derive(Default)]
struct Bucket {
    seen: HashSet<String>,
    records: Vec<AssetRecord>,
}

pub struct AssetStore {
    filter: Option<HashSet<Category>>,
    buckets: Mutex<HashMap<Category, Bucket>>,
    state: Arc<RunState>,
}

impl AssetStore {
    pub fn new(filter: Option<HashSet<Category>>, state: Arc<RunState>) -> Self {
        Self {
            filter,
            buckets: Mutex::new(HashMap::new()),
            state,
        }
    }

    /// Record a finding. Returns true on first sighting of `value` within
    /// `category`, false when filtered, out of bounds or already seen.
    pub fn add(&self, category: Category, value: &str, source: &str) -> bool {
        if let Some(filter) = &self.filter {
            if !filter.contains(&category) {
                return false;
            }
        }

        if value.is_empty() || value.len() > MAX_VALUE_LEN_BYTES {
            return false;
        }

        {
            let mut buckets = self.buckets.lock().unwrap();
            let bucket = buckets.entry(category).or_default();

            if !bucket.seen.insert(value.to_string()) {
                return false;
            }

            bucket.records.push(AssetRecord {
                value: value.to_string(),
                source: source.to_string(),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            });
        }

        if category.is_sensitive() {
            tracing::warn!("[{category}] {value} (via {source})");
            self.state.push_log(format!("[{category}] {value}"));
        } else {
            tracing::debug!("[{category}] {value}");
        }

        true
    }

    pub fn count(&self, category: Category) -> usize {
        self.buckets
            .lock()
            .unwrap()
            .get(&category)
            .map(|b| b.records.len())
            .unwrap_or(0)
    }

    /// Non-empty categories with their records, in declaration order.
    /// Only meaningful once the worker pool has drained.
    pub fn snapshot(&self) -> Vec<(Category, Vec<AssetRecord>)> {
        let buckets = self.buckets.lock().unwrap();

        Category::iter()
            .filter_map(|category| {
                let bucket = buckets.get(&category)?;
                if bucket.records.is_empty() {
                    return None;
                }
                Some((category, bucket.records.clone()))
            })
            .collect()
    }

    /// Distinct values of a single category, in sighting order.
    pub fn values(&self, category: Category) -> Vec<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(&category)
            .map(|b| b.records.iter().map(|r| r.value.clone()).collect())
            .unwrap_or_default()
    }
}
