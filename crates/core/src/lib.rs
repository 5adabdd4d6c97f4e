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

//! Reconnaissance web crawler: given a seed target, enumerates a domain's
//! web-accessible assets into a structured report. The crawl engine is a
//! scope-bounded URL frontier feeding a pool of concurrent workers whose
//! extractors route every discovery back through the frontier and into a
//! deduplicating asset store.

pub mod assets;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod report;
pub mod state;
pub mod status;
pub mod urls;
