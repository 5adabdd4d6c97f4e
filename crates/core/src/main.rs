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
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::prelude::*;

use reconmapper::config::CrawlerConfig;
use reconmapper::crawler::Crawler;
use reconmapper::report::Report;
use reconmapper::status;

const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[clap(author, version, about = "Map a domain's web-accessible attack surface", long_about = None)]
struct Args {
    /// Target domain or URL.
    target: String,

    /// Number of concurrent workers.
    #[clap(short = 't', long, default_value_t = 15)]
    threads: usize,

    /// Maximum crawl depth.
    #[clap(short = 'd', long, default_value_t = 3)]
    depth: u32,

    /// Per-request total timeout in seconds.
    #[clap(long, default_value_t = 15)]
    timeout: u64,

    /// Write the JSON report here on completion.
    #[clap(short = 'o', long)]
    output: Option<PathBuf>,

    /// Verbose logging.
    #[clap(short = 'v', long)]
    verbose: bool,

    /// Mine the Wayback Machine for historical urls.
    #[clap(long)]
    wayback: bool,

    /// Skip robots.txt and sitemap ingestion.
    #[clap(long)]
    no_sitemap: bool,

    /// HTTP proxy url.
    #[clap(long)]
    proxy: Option<String>,

    /// Verify TLS certificates instead of accepting anything presented.
    #[clap(long)]
    verify_tls: bool,

    /// Upper bound in seconds of the uniform random pre-request sleep.
    #[clap(long, default_value_t = 0.0)]
    jitter: f64,

    /// Only record these finding categories (repeatable).
    #[clap(short = 'f', long = "filter")]
    filters: Vec<String>,
}

fn ensure_writable(path: &Path) -> Result<(), String> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    if !parent.is_dir() {
        return Err(format!(
            "output directory does not exist: {}",
            parent.display()
        ));
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_directive = if args.verbose {
        "reconmapper=debug"
    } else {
        "reconmapper=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_directive.parse().unwrap())
                .from_env_lossy(),
        )
        .without_time()
        .with_target(false)
        .finish()
        .init();

    let category_filter = match CrawlerConfig::parse_filter(&args.filters) {
        Ok(filter) => filter,
        Err(err) => {
            tracing::error!("{err}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    if let Some(path) = &args.output {
        if let Err(err) = ensure_writable(path) {
            tracing::error!("{err}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    }

    let mut config = CrawlerConfig::new(args.target);
    config.num_workers = args.threads.max(1);
    config.max_depth = args.depth;
    config.timeout_seconds = args.timeout;
    config.output_path = args.output;
    config.verbose = args.verbose;
    config.use_wayback = args.wayback;
    config.use_sitemap = !args.no_sitemap;
    config.proxy = args.proxy;
    config.ignore_ssl = !args.verify_tls;
    config.jitter_seconds = args.jitter.max(0.0);
    config.category_filter = category_filter;

    let crawler = match Crawler::new(config).await {
        Ok(crawler) => crawler,
        Err(err) => {
            tracing::error!("configuration error: {err}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let ctx = crawler.context();

    let status_task = status::spawn(Arc::clone(&ctx));
    let mut run = tokio::spawn(crawler.run());

    let mut interrupted = false;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            interrupted = true;
            tracing::info!("interrupt received, draining the pool");
            ctx.frontier.close();
        }
        res = &mut run => {
            res.ok();
        }
    }

    if interrupted {
        run.await.ok();
    }
    status_task.abort();

    let report = Report::build(&ctx);
    if let Some(path) = &ctx.config.output_path {
        match report.write(path) {
            Ok(()) => tracing::info!("report written to {}", path.display()),
            Err(err) => tracing::error!("failed to write report: {err}"),
        }
    }

    if interrupted {
        ExitCode::from(EXIT_INTERRUPTED)
    } else {
        ExitCode::SUCCESS
    }
}
