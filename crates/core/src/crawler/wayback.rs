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

//! Wayback Machine CDX ingestion. Best effort: runs as a detached task,
//! every admit passes through the standard frontier gate, and any failure
//! just logs and returns.

use std::sync::Arc;

use url::Url;

use crate::urls;

use super::{seed_into_frontier, CrawlContext};

pub async fn ingest(ctx: Arc<CrawlContext>) {
    let root = ctx.scope.root_domain();
    let cdx = format!(
        "https://web.archive.org/cdx/search/cdx?url=*.{root}/*&output=json&fl=original&collapse=urlkey&limit={}",
        ctx.config.wayback_fetch_limit
    );

    let Ok(cdx_url) = Url::parse(&cdx) else {
        return;
    };

    let page = match ctx.fetcher.get(&cdx_url).await {
        Ok(page) if page.status == 200 => page,
        Ok(page) => {
            tracing::debug!("wayback cdx returned status {}", page.status);
            return;
        }
        Err(err) => {
            tracing::debug!("wayback cdx fetch failed: {err}");
            return;
        }
    };

    let Ok(rows) = serde_json::from_str::<Vec<Vec<String>>>(&page.body) else {
        tracing::debug!("wayback cdx body was not a json row set");
        return;
    };

    let mut admitted = 0;
    // first row is the field header
    for row in rows.iter().skip(1) {
        if admitted >= ctx.config.wayback_admit_cap {
            break;
        }

        let Some(original) = row.first() else {
            continue;
        };
        let Some(url) = urls::normalize(original, &cdx_url) else {
            continue;
        };

        if seed_into_frontier(&ctx, url, ctx.config.wayback_depth, "wayback") {
            admitted += 1;
        }
    }

    tracing::info!("wayback seeded {admitted} urls");
}
