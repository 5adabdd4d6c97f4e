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

//! Shared mutable run state: counters the workers bump and the dashboard
//! reads. Everything here is either atomic or behind a short-lived lock so
//! snapshots never stall the pool.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

const LOG_RING_CAPACITY: usize = 64;

pub struct RunState {
    pub urls_processed: AtomicU64,
    pub urls_failed: AtomicU64,
    pub queue_depth: AtomicU64,
    recent: Mutex<VecDeque<String>>,
    current: Mutex<Vec<String>>,
    root_domain: OnceLock<String>,
    started: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct StateSnapshot {
    pub urls_processed: u64,
    pub urls_failed: u64,
    pub queue_depth: u64,
}

impl RunState {
    pub fn new(num_workers: usize) -> Self {
        Self {
            urls_processed: AtomicU64::new(0),
            urls_failed: AtomicU64::new(0),
            queue_depth: AtomicU64::new(0),
            recent: Mutex::new(VecDeque::with_capacity(LOG_RING_CAPACITY)),
            current: Mutex::new(vec![String::new(); num_workers]),
            root_domain: OnceLock::new(),
            started: Instant::now(),
        }
    }

    /// Assigned exactly once by the seed controller before workers start.
    pub fn lock_root_domain(&self, domain: &str) {
        self.root_domain.set(domain.to_string()).ok();
    }

    pub fn root_domain(&self) -> Option<&str> {
        self.root_domain.get().map(String::as_str)
    }

    pub fn push_log(&self, line: String) {
        let mut recent = self.recent.lock().unwrap();
        if recent.len() == LOG_RING_CAPACITY {
            recent.pop_front();
        }
        recent.push_back(line);
    }

    pub fn recent_logs(&self) -> Vec<String> {
        self.recent.lock().unwrap().iter().cloned().collect()
    }

    pub fn set_current(&self, worker: usize, url: &str) {
        let mut current = self.current.lock().unwrap();
        if let Some(slot) = current.get_mut(worker) {
            slot.clear();
            slot.push_str(url);
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            urls_processed: self.urls_processed.load(Ordering::Relaxed),
            urls_failed: self.urls_failed.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }
}
