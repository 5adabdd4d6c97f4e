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

pub struct Crawler;

impl Crawler {
    pub fn num_workers() -> usize {
        15
    }

    pub fn timeout_seconds() -> u64 {
        15
    }

    pub fn connect_timeout_seconds() -> u64 {
        10
    }

    pub fn max_depth() -> u32 {
        3
    }

    pub fn max_redirects() -> usize {
        10
    }

    pub fn use_sitemap() -> bool {
        true
    }

    pub fn ignore_ssl() -> bool {
        true
    }

    pub fn jitter_seconds() -> f64 {
        0.0
    }

    pub fn wayback_fetch_limit() -> usize {
        500
    }

    pub fn wayback_admit_cap() -> usize {
        300
    }

    pub fn wayback_depth() -> u32 {
        2
    }

    pub fn max_content_length() -> usize {
        32 * 1024 * 1024 // 32 MB
    }
}
