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

//! Live terminal status line. Reads RunState snapshots at 4 Hz and never
//! touches the crawl itself.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::assets::Category;
use crate::crawler::CrawlContext;

pub fn spawn(ctx: Arc<CrawlContext>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        let mut interval = tokio::time::interval(Duration::from_millis(250));
        loop {
            interval.tick().await;

            let snapshot = ctx.state.snapshot();
            bar.set_message(format!(
                "{} | crawled {} | failed {} | queued {} | endpoints {} | secrets {}",
                ctx.scope.root_domain(),
                snapshot.urls_processed,
                snapshot.urls_failed,
                snapshot.queue_depth,
                ctx.store.count(Category::Endpoints),
                ctx.store.count(Category::Secrets),
            ));
            bar.tick();
        }
    })
}
