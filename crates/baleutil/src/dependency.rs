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

//! Dependency info requires a detour to support both string and structured formats

use semver::VersionReq;
use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// Information about a specific dependency as declared in a manifest.
#[derive(Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DependencyInfo {
    #[serde(default, skip_serializing_if = "version_is_default")]
    pub version: VersionReq,

    /// Registry URL the dependency is pinned to. Mutually exclusive with `path`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// Local path source the dependency is pinned to, relative to the manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Inclusion groups, e.g. `dev` or `test`. Empty means the default group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Platforms the dependency applies to. Empty means every active platform.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<Platform>,
}

fn version_is_default(version: &VersionReq) -> bool {
    version.comparators.is_empty()
}

impl std::fmt::Debug for DependencyInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_simple() {
            write!(f, "{}", self.version)
        } else {
            f.debug_struct("DependencyInfo")
                .field("version", &format_args!("{}", self.version))
                .field("registry", &self.registry)
                .field("path", &self.path)
                .field("groups", &self.groups)
                .field("platforms", &self.platforms)
                .finish()
        }
    }
}

/// The JSON representation of a dependency entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyInfoJson {
    /// A bare version requirement string.
    Simple(VersionReq),
    /// The structured form.
    Detailed(DependencyInfo),
}

impl DependencyInfo {
    /// Check if the entry only carries a version requirement.
    fn is_simple(&self) -> bool {
        self.registry.is_none()
            && self.path.is_none()
            && self.groups.is_empty()
            && self.platforms.is_empty()
    }

    pub fn from_simple(version: VersionReq) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }
}

impl From<DependencyInfo> for DependencyInfoJson {
    fn from(dep: DependencyInfo) -> Self {
        if dep.is_simple() {
            DependencyInfoJson::Simple(dep.version)
        } else {
            DependencyInfoJson::Detailed(dep)
        }
    }
}

impl From<DependencyInfoJson> for DependencyInfo {
    fn from(dep: DependencyInfoJson) -> Self {
        match dep {
            DependencyInfoJson::Simple(v) => DependencyInfo::from_simple(v),
            DependencyInfoJson::Detailed(d) => d,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn simple_form_round_trips() {
        let info: DependencyInfoJson = serde_json_lenient::from_str("\"^1.2\"").unwrap();
        let info: DependencyInfo = info.into();
        assert_eq!(info.version, VersionReq::parse("^1.2").unwrap());
        assert!(info.is_simple());

        let back: DependencyInfoJson = info.into();
        assert_eq!(serde_json_lenient::to_string(&back).unwrap(), "\"^1.2\"");
    }

    #[test]
    fn detailed_form_keeps_pin_and_groups() {
        let text = r#"{ "version": "~0.3", "path": "./vendor/x", "groups": ["dev"] }"#;
        let info: DependencyInfoJson = serde_json_lenient::from_str(text).unwrap();
        let info: DependencyInfo = info.into();
        assert_eq!(info.path.as_deref(), Some("./vendor/x"));
        assert_eq!(info.groups, vec!["dev".to_string()]);
        assert!(!info.is_simple());
    }

    #[test]
    fn missing_version_means_any() {
        let info: DependencyInfoJson =
            serde_json_lenient::from_str(r#"{ "path": "./vendor/x" }"#).unwrap();
        let info: DependencyInfo = info.into();
        assert_eq!(info.version, VersionReq::STAR);
    }
}
