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

//! The URL frontier: a FIFO queue of pending crawl entries with
//! at-most-once admission and completion counting.
//!
//! Admission is a single locked test-and-set against the visited set, so
//! concurrent workers discovering the same URL race safely: exactly one
//! admit succeeds. The outstanding counter covers queued plus in-process
//! entries; when it reaches zero the crawl is complete and every pending
//! pull resolves to [`Pull::Shutdown`].

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use url::Url;

use crate::state::RunState;

#[derive(Debug, Clone)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: u32,
    /// Canonical URL (or synthetic tag: "seed", "robots", "sitemap",
    /// "wayback") that discovered this entry. Provenance only, never used
    /// for dedup.
    pub source: String,
}

#[derive(Debug)]
pub enum Pull {
    Entry(FrontierEntry),
    Shutdown,
}

struct Inner {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    outstanding: u64,
    closed: bool,
}

pub struct Frontier {
    inner: Mutex<Inner>,
    notify: Notify,
    max_depth: u32,
    state: Arc<RunState>,
}

impl Frontier {
    pub fn new(max_depth: u32, state: Arc<RunState>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                visited: HashSet::new(),
                outstanding: 0,
                closed: false,
            }),
            notify: Notify::new(),
            max_depth,
            state,
        }
    }

    /// Admit an entry if it is within the depth bound and its canonical URL
    /// has never been admitted before. Returns true when the entry was
    /// enqueued.
    pub fn admit(&self, entry: FrontierEntry) -> bool {
        if entry.depth > self.max_depth {
            return false;
        }

        {
            let mut inner = self.inner.lock().unwrap();
            if inner.closed {
                return false;
            }

            if !inner.visited.insert(entry.url.as_str().to_string()) {
                return false;
            }

            inner.queue.push_back(entry);
            inner.outstanding += 1;
            self.state
                .queue_depth
                .store(inner.queue.len() as u64, Ordering::Relaxed);
        }

        self.notify.notify_waiters();
        true
    }

    /// Block until an entry is available or the crawl is complete.
    pub async fn pull(&self) -> Pull {
        loop {
            let notified = self.notify.notified();

            {
                let mut inner = self.inner.lock().unwrap();
                if let Some(entry) = inner.queue.pop_front() {
                    self.state
                        .queue_depth
                        .store(inner.queue.len() as u64, Ordering::Relaxed);
                    return Pull::Entry(entry);
                }
                if inner.closed || inner.outstanding == 0 {
                    return Pull::Shutdown;
                }
            }

            notified.await;
        }
    }

    /// Must be called exactly once per pulled entry, whether processing
    /// succeeded, failed or was dropped.
    pub fn task_done(&self) {
        let all_done = {
            let mut inner = self.inner.lock().unwrap();
            inner.outstanding = inner.outstanding.saturating_sub(1);
            inner.outstanding == 0
        };

        if all_done {
            self.notify.notify_waiters();
        }
    }

    /// Stop admitting and drop queued entries. In-process entries finish on
    /// their own; pending pulls resolve to shutdown.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.closed = true;
            let dropped = inner.queue.len() as u64;
            inner.outstanding = inner.outstanding.saturating_sub(dropped);
            inner.queue.clear();
            self.state.queue_depth.store(0, Ordering::Relaxed);
        }

        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    pub fn visited_len(&self) -> usize {
        self.inner.lock().unwrap().visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontier(max_depth: u32) -> Frontier {
        Frontier::new(max_depth, Arc::new(RunState::new(1)))
    }

    fn entry(url: &str, depth: u32) -> FrontierEntry {
        FrontierEntry {
            url: Url::parse(url).unwrap(),
            depth,
            source: "seed".to_string(),
        }
    }

    #[test]
    fn admits_each_canonical_url_once() {
        let frontier = frontier(3);

        assert!(frontier.admit(entry("https://t.com/a", 0)));
        assert!(!frontier.admit(entry("https://t.com/a", 1)));
        assert_eq!(frontier.visited_len(), 1);
    }

    #[test]
    fn rejects_beyond_max_depth() {
        let frontier = frontier(2);

        assert!(frontier.admit(entry("https://t.com/a", 2)));
        assert!(!frontier.admit(entry("https://t.com/b", 3)));
    }

    #[tokio::test]
    async fn pull_returns_fifo_then_shutdown() {
        let frontier = frontier(3);
        frontier.admit(entry("https://t.com/a", 0));
        frontier.admit(entry("https://t.com/b", 1));

        let Pull::Entry(first) = frontier.pull().await else {
            panic!("expected entry");
        };
        assert_eq!(first.url.as_str(), "https://t.com/a");
        frontier.task_done();

        let Pull::Entry(second) = frontier.pull().await else {
            panic!("expected entry");
        };
        assert_eq!(second.url.as_str(), "https://t.com/b");
        frontier.task_done();

        assert!(matches!(frontier.pull().await, Pull::Shutdown));
    }

    #[tokio::test]
    async fn close_resolves_pending_pulls() {
        let frontier = Arc::new(frontier(3));
        frontier.admit(entry("https://t.com/a", 0));
        let Pull::Entry(_) = frontier.pull().await else {
            panic!("expected entry");
        };

        // a second worker is blocked on an empty queue
        let blocked = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.pull().await })
        };

        frontier.close();
        assert!(matches!(blocked.await.unwrap(), Pull::Shutdown));
        assert!(!frontier.admit(entry("https://t.com/late", 0)));
    }

    #[tokio::test]
    async fn thousand_anchors_admit_once_each() {
        let frontier = frontier(5);

        for i in 0..1000 {
            assert!(frontier.admit(entry(&format!("https://t.com/p/{i}"), 1)));
        }
        // a second sweep over the same page admits nothing new
        for i in 0..1000 {
            assert!(!frontier.admit(entry(&format!("https://t.com/p/{i}"), 2)));
        }

        assert_eq!(frontier.visited_len(), 1000);

        let mut pulled = 0;
        while let Pull::Entry(_) = frontier.pull().await {
            frontier.task_done();
            pulled += 1;
        }
        assert_eq!(pulled, 1000);
    }

    #[tokio::test]
    async fn concurrent_admits_of_same_url() {
        let frontier = Arc::new(frontier(3));
        let mut handles = Vec::new();

        for _ in 0..16 {
            let frontier = Arc::clone(&frontier);
            handles.push(tokio::spawn(async move {
                frontier.admit(entry("https://t.com/race", 1))
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 1);
    }
}
