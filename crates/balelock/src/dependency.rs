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

//! Resolution-level dependencies: a name and requirement, plus the group,
//! platform and source-binding context resolution needs.

use std::rc::Rc;

use baleutil::dependency::DependencyInfo;
use baleutil::platform::Platform;
use semver::VersionReq;

use crate::source::Source;

pub const DEFAULT_GROUP: &str = "default";

#[derive(Clone)]
pub struct Dependency {
    pub name: String,
    pub req: VersionReq,
    /// Inclusion groups; always non-empty (the default group is explicit).
    pub groups: Vec<String>,
    /// Source this dependency is pinned to. After convergence this always
    /// points into the current source list.
    pub source: Option<Rc<Source>>,
    /// Platforms the dependency applies to. Empty means every active platform.
    pub platforms: Vec<Platform>,
}

/// Identity is (name, requirement); groups, platforms and source binding are
/// context, compared separately where they matter.
impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.req == other.req
    }
}

impl Eq for Dependency {}

impl std::fmt::Debug for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.req)?;
        if let Some(source) = &self.source {
            write!(f, " from {}", source)?;
        }
        Ok(())
    }
}

impl Dependency {
    pub fn new(name: impl Into<String>, req: VersionReq) -> Self {
        Dependency {
            name: name.into(),
            req,
            groups: vec![DEFAULT_GROUP.to_string()],
            source: None,
            platforms: Vec::new(),
        }
    }

    /// Lift a manifest entry into a resolution dependency. Source pins are
    /// bound separately, against the live source list.
    pub fn from_info(name: &str, info: &DependencyInfo) -> Self {
        let groups = if info.groups.is_empty() {
            vec![DEFAULT_GROUP.to_string()]
        } else {
            info.groups.clone()
        };
        Dependency {
            name: name.to_string(),
            req: info.version.clone(),
            groups,
            source: None,
            platforms: info.platforms.clone(),
        }
    }

    /// Whether this dependency applies to the current execution environment.
    pub fn should_include(&self) -> bool {
        self.platforms.is_empty()
            || self
                .platforms
                .iter()
                .any(|p| p.compatible_with(&Platform::current()))
    }

    /// The subset of `active` platforms this dependency expands to, in
    /// `active` order.
    pub fn platforms_for(&self, active: &[Platform]) -> Vec<Platform> {
        if self.platforms.is_empty() {
            return active.to_vec();
        }
        active
            .iter()
            .filter(|p| self.platforms.iter().any(|dp| dp.compatible_with(p)))
            .cloned()
            .collect()
    }

    /// The `DEPENDENCIES` entry for this dependency. A trailing `!` marks a
    /// source-pinned dependency.
    pub fn to_lock(&self) -> String {
        let pin = if self.source.is_some() { "!" } else { "" };
        if self.req == VersionReq::STAR {
            format!("  {}{}\n", self.name, pin)
        } else {
            format!("  {} ({}){}\n", self.name, self.req, pin)
        }
    }
}
