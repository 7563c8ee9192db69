// bale: dependency resolution and lockfile engine.
// Copyright (C) 2026 Bale Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! A mock spec provider for testing purposes; currently only available in tests

use std::path::PathBuf;
use std::rc::Rc;

use baleutil::dependency::DependencyInfo;
use baleutil::platform::Platform;
use semver::{Version, VersionReq};
use url::Url;

use super::{Source, SourceKind, SpecInfo, SpecProvider};

/// In-memory local and remote listings.
#[derive(Default)]
pub struct MockProvider {
    local: Vec<SpecInfo>,
    remote: Vec<SpecInfo>,
}

pub fn create_spec_info<'a>(
    name: &str,
    version: &str,
    platform: Platform,
    deps: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> SpecInfo {
    SpecInfo {
        name: name.to_string(),
        version: Version::parse(version).unwrap(),
        platform,
        deps: deps
            .into_iter()
            .map(|(name, req)| {
                (
                    name.to_string(),
                    DependencyInfo::from_simple(VersionReq::parse(req).unwrap()),
                )
            })
            .collect(),
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a generic-platform spec to the local (and therefore also the
    /// remote-merged) listing.
    pub fn add<'a>(
        &mut self,
        name: &str,
        version: &str,
        deps: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> &mut Self {
        self.local
            .push(create_spec_info(name, version, Platform::Generic, deps));
        self
    }

    pub fn add_platform<'a>(
        &mut self,
        name: &str,
        version: &str,
        platform: Platform,
        deps: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> &mut Self {
        self.local
            .push(create_spec_info(name, version, platform, deps));
        self
    }

    /// Add a spec only visible once the source is remote-activated.
    pub fn add_remote<'a>(
        &mut self,
        name: &str,
        version: &str,
        deps: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> &mut Self {
        self.remote
            .push(create_spec_info(name, version, Platform::Generic, deps));
        self
    }
}

impl SpecProvider for MockProvider {
    fn local_specs(&self) -> anyhow::Result<Vec<SpecInfo>> {
        Ok(self.local.clone())
    }

    fn remote_specs(&self) -> anyhow::Result<Vec<SpecInfo>> {
        Ok(self.remote.clone())
    }
}

/// A mock registry source.
pub fn mock_registry(url: &str, build: impl FnOnce(&mut MockProvider)) -> Rc<Source> {
    let mut provider = MockProvider::new();
    build(&mut provider);
    Source::with_provider(
        SourceKind::Registry(Url::parse(url).unwrap()),
        Box::new(provider),
    )
}

/// A mock path source with the given declared path.
pub fn mock_path(declared: &str, build: impl FnOnce(&mut MockProvider)) -> Rc<Source> {
    let mut provider = MockProvider::new();
    build(&mut provider);
    Source::with_provider(
        SourceKind::Path(PathBuf::from(declared)),
        Box::new(provider),
    )
}
