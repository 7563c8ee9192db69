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

//! Spec sources: where package listings come from.
//!
//! A [`Source`] pairs a logical identity (registry URL or local path) with a
//! [`SpecProvider`] backend and the mutable fetch state the convergence engine
//! manipulates: remote activation and the memoized listing cache.

#[cfg(test)]
pub mod mock;
pub mod path;
pub mod registry;

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use baleutil::dependency::{DependencyInfo, DependencyInfoJson};
use baleutil::platform::Platform;
use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};
use url::Url;

use self::path::PathProvider;
use self::registry::RegistryProvider;

/// One available package flavor as reported by a provider, not yet bound to
/// its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecInfo {
    pub name: String,
    pub version: Version,
    pub platform: Platform,
    pub deps: IndexMap<String, DependencyInfo>,
}

/// The JSON representation of a [`SpecInfo`], as stored in registry indexes.
#[derive(Debug, Serialize, Deserialize)]
pub struct SpecInfoJson {
    pub name: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub deps: IndexMap<String, DependencyInfoJson>,
}

impl From<SpecInfoJson> for SpecInfo {
    fn from(j: SpecInfoJson) -> Self {
        SpecInfo {
            name: j.name,
            version: j.version,
            platform: j.platform.unwrap_or(Platform::Generic),
            deps: j
                .deps
                .into_iter()
                .map(|(name, info)| (name, info.into()))
                .collect(),
        }
    }
}

impl From<SpecInfo> for SpecInfoJson {
    fn from(info: SpecInfo) -> Self {
        SpecInfoJson {
            name: info.name,
            version: info.version,
            platform: if info.platform.is_generic() {
                None
            } else {
                Some(info.platform)
            },
            deps: info
                .deps
                .into_iter()
                .map(|(name, info)| (name, info.into()))
                .collect(),
        }
    }
}

/// Backend that enumerates the specs a source can provide.
pub trait SpecProvider {
    /// Specs available without touching the network.
    fn local_specs(&self) -> anyhow::Result<Vec<SpecInfo>>;

    /// Specs from the remote listing; may perform network I/O.
    fn remote_specs(&self) -> anyhow::Result<Vec<SpecInfo>>;
}

/// The logical identity of a source. Two sources are the same source iff
/// their kinds are equal, regardless of backend or fetch state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A remote registry of packages.
    Registry(Url),
    /// A directory of packages. Stored exactly as declared so lockfile and
    /// manifest identities line up; resolution against the filesystem
    /// happens in the provider.
    Path(PathBuf),
}

impl SourceKind {
    /// Whether this is the default provider type. Default-type sources sort
    /// after all others in the lockfile.
    pub fn is_default(&self) -> bool {
        matches!(self, SourceKind::Registry(_))
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Registry(url) => write!(f, "{}", url),
            SourceKind::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

pub struct Source {
    kind: SourceKind,
    provider: Box<dyn SpecProvider>,
    remote: Cell<bool>,
    listing: RefCell<Option<Rc<Vec<SpecInfo>>>>,
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Source {}

impl std::hash::Hash for Source {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("kind", &self.kind)
            .field("remote", &self.remote.get())
            .finish()
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Source {
    /// A registry source backed by the default on-disk cache + HTTP provider.
    pub fn registry(url: Url) -> Rc<Source> {
        let provider = RegistryProvider::new(url.clone());
        Source::with_provider(SourceKind::Registry(url), Box::new(provider))
    }

    /// A path source. `declared` is the path as written in the manifest
    /// (the identity); `root` is where it points on disk.
    pub fn path(declared: PathBuf, root: PathBuf) -> Rc<Source> {
        Source::with_provider(SourceKind::Path(declared), Box::new(PathProvider::new(root)))
    }

    pub fn with_provider(kind: SourceKind, provider: Box<dyn SpecProvider>) -> Rc<Source> {
        Rc::new(Source {
            kind,
            provider,
            remote: Cell::new(false),
            listing: RefCell::new(None),
        })
    }

    /// A source carrying identity only, as reconstructed from a lockfile.
    /// After convergence every live binding points at a current source, so
    /// this never serves specs.
    pub(crate) fn inert(kind: SourceKind) -> Rc<Source> {
        struct InertProvider;
        impl SpecProvider for InertProvider {
            fn local_specs(&self) -> anyhow::Result<Vec<SpecInfo>> {
                Ok(Vec::new())
            }
            fn remote_specs(&self) -> anyhow::Result<Vec<SpecInfo>> {
                Ok(Vec::new())
            }
        }
        Source::with_provider(kind, Box::new(InertProvider))
    }

    pub fn kind(&self) -> &SourceKind {
        &self.kind
    }

    /// Short name used to match unlock directives: the registry host, or the
    /// declared path.
    pub fn name(&self) -> String {
        match &self.kind {
            SourceKind::Registry(url) => url.host_str().unwrap_or(url.as_str()).to_string(),
            SourceKind::Path(path) => path.display().to_string(),
        }
    }

    pub fn remote_activated(&self) -> bool {
        self.remote.get()
    }

    /// Switch into network-fetch mode. The next listing request also
    /// consults the remote provider.
    pub fn activate_remote(&self) {
        if !self.remote.replace(true) {
            log::debug!("source {} switched to remote mode", self.kind);
            *self.listing.borrow_mut() = None;
        }
    }

    /// Disregard any cached listing and behave as if freshly fetched.
    pub fn unlock(&self) {
        log::debug!("source {} unlocked", self.kind);
        *self.listing.borrow_mut() = None;
    }

    /// Carry over the cached listing from a previous incarnation of the same
    /// source. Used by source convergence when a locked source matches a
    /// current one.
    pub(crate) fn adopt_cache_from(&self, other: &Source) {
        debug_assert_eq!(self.kind, other.kind);
        let mut listing = self.listing.borrow_mut();
        if listing.is_none() {
            *listing = other.listing.borrow().clone();
        }
    }

    /// The specs this source can currently provide. Memoized until
    /// [`Source::unlock`] or [`Source::activate_remote`] invalidates it.
    pub fn spec_infos(&self) -> anyhow::Result<Rc<Vec<SpecInfo>>> {
        if let Some(listing) = self.listing.borrow().as_ref() {
            return Ok(listing.clone());
        }

        let mut infos = self.provider.local_specs()?;
        if self.remote.get() {
            for info in self.provider.remote_specs()? {
                let known = infos.iter().any(|i| {
                    i.name == info.name && i.version == info.version && i.platform == info.platform
                });
                if !known {
                    infos.push(info);
                }
            }
        }

        let infos = Rc::new(infos);
        *self.listing.borrow_mut() = Some(infos.clone());
        Ok(infos)
    }

    /// The lockfile header block for this source.
    pub fn to_lock(&self) -> String {
        match &self.kind {
            SourceKind::Registry(url) => {
                format!("REGISTRY\n  remote: {}\n  specs:\n", url)
            }
            SourceKind::Path(path) => {
                format!("PATH\n  path: {}\n  specs:\n", path.display())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::mock::MockProvider;
    use super::*;

    fn registry_kind(url: &str) -> SourceKind {
        SourceKind::Registry(Url::parse(url).unwrap())
    }

    #[test]
    fn identity_is_by_kind_not_instance() {
        let a = Source::inert(registry_kind("https://reg.example.com"));
        let b = Source::inert(registry_kind("https://reg.example.com"));
        let c = Source::inert(registry_kind("https://other.example.com"));
        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
        assert_ne!(*a, *Source::inert(SourceKind::Path("./vendor".into())));
    }

    #[test]
    fn listing_is_memoized_until_unlocked() {
        let mut provider = MockProvider::new();
        provider.add("rack", "1.0.0", []);
        let source = Source::with_provider(
            registry_kind("https://reg.example.com"),
            Box::new(provider),
        );

        let first = source.spec_infos().unwrap();
        let second = source.spec_infos().unwrap();
        assert!(Rc::ptr_eq(&first, &second));

        source.unlock();
        let third = source.spec_infos().unwrap();
        assert!(!Rc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }

    #[test]
    fn remote_mode_adds_remote_listing() {
        let mut provider = MockProvider::new();
        provider.add("rack", "1.0.0", []);
        provider.add_remote("rack", "1.1.0", []);
        let source = Source::with_provider(
            registry_kind("https://reg.example.com"),
            Box::new(provider),
        );

        let local_only = source.spec_infos().unwrap();
        assert_eq!(local_only.len(), 1);

        source.activate_remote();
        let with_remote = source.spec_infos().unwrap();
        assert_eq!(with_remote.len(), 2);
    }

    #[test]
    fn adopt_cache_preserves_a_matched_listing() {
        let mut provider = MockProvider::new();
        provider.add("rack", "1.0.0", []);
        let old = Source::with_provider(
            registry_kind("https://reg.example.com"),
            Box::new(provider),
        );
        old.spec_infos().unwrap();

        let new = Source::inert(registry_kind("https://reg.example.com"));
        new.adopt_cache_from(&old);
        let listing = new.spec_infos().unwrap();
        assert_eq!(listing.len(), 1);
    }

    #[test]
    fn lock_headers() {
        let reg = Source::inert(registry_kind("https://reg.example.com"));
        assert_eq!(
            reg.to_lock(),
            "REGISTRY\n  remote: https://reg.example.com/\n  specs:\n"
        );
        let path = Source::inert(SourceKind::Path("./vendor".into()));
        assert_eq!(path.to_lock(), "PATH\n  path: ./vendor\n  specs:\n");
    }
}
