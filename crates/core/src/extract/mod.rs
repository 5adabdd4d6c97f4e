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

//! The extraction pipeline.
//!
//! Extractors are pure functions over response bodies: they return a
//! [`Discoveries`] value and never touch the frontier or the asset store
//! themselves. The worker that fetched the response routes the output
//! through the scope and extension gates.

use url::Url;

use crate::assets::Category;

pub mod dom;
pub mod json;
pub mod tech;
pub mod text;

/// A URL candidate for the frontier. `terminal` candidates came out of the
/// regex sweep and are admitted at max depth: fetched once, never recursed.
#[derive(Debug, Clone)]
pub struct CandidateUrl {
    pub url: Url,
    pub terminal: bool,
}

#[derive(Debug, Default)]
pub struct Discoveries {
    pub urls: Vec<CandidateUrl>,
    pub assets: Vec<(Category, String)>,
}

impl Discoveries {
    pub fn push_url(&mut self, url: Url, terminal: bool) {
        self.urls.push(CandidateUrl { url, terminal });
    }

    pub fn push_asset(&mut self, category: Category, value: impl Into<String>) {
        self.assets.push((category, value.into()));
    }

    pub fn merge(&mut self, other: Discoveries) {
        self.urls.extend(other.urls);
        self.assets.extend(other.assets);
    }
}
