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

//! The final JSON report, built from an asset-store snapshot after the
//! pool has drained.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};

use crate::assets::{AssetRecord, Category};
use crate::crawler::CrawlContext;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ReportStats {
    pub processed: u64,
    pub failed: u64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Report {
    pub target: String,
    pub base_domain: String,
    pub scan_date: String,
    pub duration: String,
    pub stats: ReportStats,
    pub technologies: Vec<String>,
    pub filters: Option<Vec<String>>,
    /// Only categories with at least one record appear.
    pub findings: BTreeMap<String, Vec<AssetRecord>>,
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

impl Report {
    pub fn build(ctx: &CrawlContext) -> Self {
        let snapshot = ctx.state.snapshot();

        let findings: BTreeMap<String, Vec<AssetRecord>> = ctx
            .store
            .snapshot()
            .into_iter()
            .map(|(category, records)| (category.to_string(), records))
            .collect();

        let filters = ctx.config.category_filter.as_ref().map(|filter| {
            let mut names: Vec<String> = filter.iter().map(|c| c.to_string()).collect();
            names.sort();
            names
        });

        Self {
            target: ctx.config.target.clone(),
            base_domain: ctx.scope.root_domain().to_string(),
            scan_date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            duration: format_duration(ctx.state.elapsed()),
            stats: ReportStats {
                processed: snapshot.urls_processed,
                failed: snapshot.urls_failed,
            },
            technologies: ctx.store.values(Category::Tech),
            filters,
            findings,
        }
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_wall_clock_shaped() {
        assert_eq!(format_duration(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_duration(Duration::from_secs(59)), "00:00:59");
        assert_eq!(format_duration(Duration::from_secs(3 * 3600 + 62)), "03:01:02");
    }

    #[test]
    fn report_serializes_to_schema() {
        let report = Report {
            target: "test.com".to_string(),
            base_domain: "test.com".to_string(),
            scan_date: "2024-05-01T10:00:00Z".to_string(),
            duration: "00:01:30".to_string(),
            stats: ReportStats {
                processed: 12,
                failed: 2,
            },
            technologies: vec!["WordPress".to_string()],
            filters: None,
            findings: BTreeMap::from([(
                "endpoints".to_string(),
                vec![AssetRecord {
                    value: "https://test.com/".to_string(),
                    source: "seed".to_string(),
                    timestamp: "2024-05-01T10:00:01Z".to_string(),
                }],
            )]),
        };

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&report).unwrap()).unwrap();

        assert_eq!(json["stats"]["processed"], 12);
        assert_eq!(json["filters"], serde_json::Value::Null);
        assert_eq!(json["findings"]["endpoints"][0]["value"], "https://test.com/");
        assert!(json["findings"].get("secrets").is_none());
    }
}
