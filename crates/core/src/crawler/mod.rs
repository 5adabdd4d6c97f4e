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

//! The concurrent crawl engine: seed resolution, the frontier, the fetcher
//! and the worker pool, wired together around one shared [`CrawlContext`].

use std::sync::Arc;

use url::Url;

use crate::assets::{AssetStore, Category};
use crate::config::CrawlerConfig;
use crate::state::RunState;
use crate::urls::{self, ScopeGate};

use self::fetcher::Fetcher;
use self::frontier::{Frontier, FrontierEntry};
use self::worker::Worker;

pub mod fetcher;
pub mod frontier;
pub mod robots;
pub mod seed;
pub mod wayback;
mod worker;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("content too large")]
    ContentTooLarge,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Everything a worker needs, shared once behind an `Arc`.
pub struct CrawlContext {
    pub config: CrawlerConfig,
    pub scope: ScopeGate,
    pub fetcher: Fetcher,
    pub frontier: Frontier,
    pub store: AssetStore,
    pub state: Arc<RunState>,
}

/// Route an ingester seed through the same gates the workers use: scope
/// first, then the ignored-extension check, then frontier admission.
/// Returns true when the URL was actually admitted.
pub(crate) fn seed_into_frontier(
    ctx: &CrawlContext,
    url: Url,
    depth: u32,
    source: &str,
) -> bool {
    if !ctx.scope.contains(&url) {
        return false;
    }

    if urls::is_ignored(&url) {
        ctx.store.add(Category::Files, url.as_str(), source);
        return false;
    }

    ctx.frontier.admit(FrontierEntry {
        url,
        depth,
        source: source.to_string(),
    })
}

pub struct Crawler {
    ctx: Arc<CrawlContext>,
    handles: Vec<tokio::task::JoinHandle<()>>,
    wayback: Option<tokio::task::JoinHandle<()>>,
}

impl Crawler {
    /// Resolve the target, lock the scope, seed the frontier and start the
    /// pool. Errors out of here are configuration errors; a dead target is
    /// not one of them.
    pub async fn new(config: CrawlerConfig) -> Result<Self> {
        let state = Arc::new(RunState::new(config.num_workers));
        let fetcher = Fetcher::new(&config)?;

        let seed = seed::resolve(&config.target, &fetcher).await?;
        state.lock_root_domain(&seed.root_domain);

        let scope = ScopeGate::new(&seed.root_domain);
        let frontier = Frontier::new(config.max_depth, Arc::clone(&state));
        let store = AssetStore::new(config.category_filter.clone(), Arc::clone(&state));

        let ctx = Arc::new(CrawlContext {
            config,
            scope,
            fetcher,
            frontier,
            store,
            state,
        });

        // the scope host is itself the first subdomain sighting
        ctx.store
            .add(Category::Subdomains, ctx.scope.root_domain(), "seed");

        ctx.frontier.admit(FrontierEntry {
            url: seed.start.clone(),
            depth: 0,
            source: "seed".to_string(),
        });

        if ctx.config.use_sitemap {
            robots::ingest(&ctx, &seed.start).await;
        }

        let wayback = if ctx.config.use_wayback {
            let ctx = Arc::clone(&ctx);
            Some(tokio::spawn(async move { wayback::ingest(ctx).await }))
        } else {
            None
        };

        let mut handles = Vec::new();
        for id in 0..ctx.config.num_workers {
            let worker = Worker::new(id, Arc::clone(&ctx));
            handles.push(tokio::spawn(worker.run()));
        }

        Ok(Self {
            ctx,
            handles,
            wayback,
        })
    }

    pub fn context(&self) -> Arc<CrawlContext> {
        Arc::clone(&self.ctx)
    }

    /// Wait for the pool to drain. A worker task that dies (poisoned queue,
    /// runtime panic) is replaced; past one replacement per configured
    /// worker the pool is assumed sick and the run shuts down.
    pub async fn run(self) {
        let Self {
            ctx,
            mut handles,
            wayback,
        } = self;

        let mut replacements = 0;
        let mut next_id = ctx.config.num_workers;

        while !handles.is_empty() {
            let (res, _, rest) = futures::future::select_all(handles).await;
            handles = rest;

            if let Err(err) = res {
                tracing::error!("worker task died: {err}");

                if replacements < ctx.config.num_workers {
                    replacements += 1;
                    let worker = Worker::new(next_id, Arc::clone(&ctx));
                    next_id += 1;
                    handles.push(tokio::spawn(worker.run()));
                } else {
                    tracing::error!("worker death threshold reached, shutting down");
                    ctx.frontier.close();
                }
            }
        }

        if let Some(handle) = wayback {
            handle.abort();
        }

        let snapshot = ctx.state.snapshot();
        tracing::info!(
            "crawl finished: {} processed, {} failed, {} endpoints, {} files, {} subdomains",
            snapshot.urls_processed,
            snapshot.urls_failed,
            ctx.store.count(Category::Endpoints),
            ctx.store.count(Category::Files),
            ctx.store.count(Category::Subdomains),
        );
    }
}
