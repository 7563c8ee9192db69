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

//! Expansion of logical dependencies into the per-platform requests the
//! solver reasons about.

use baleutil::platform::Platform;

use crate::dependency::Dependency;

/// One concrete request: a dependency on a specific platform.
#[derive(Clone, PartialEq, Eq)]
pub struct DepProxy {
    pub dep: Dependency,
    pub platform: Platform,
}

impl std::fmt::Debug for DepProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} [{}]", self.dep, self.platform)
    }
}

/// Expand each dependency to one proxy per applicable active platform.
///
/// The output order is stable (dependency order, then platform order within a
/// dependency); solver behavior and the stability heuristics depend on it.
pub fn expand_dependencies(deps: &[Dependency], platforms: &[Platform]) -> Vec<DepProxy> {
    let mut out = Vec::new();
    for dep in deps {
        for platform in dep.platforms_for(platforms) {
            out.push(DepProxy {
                dep: dep.clone(),
                platform,
            });
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use semver::VersionReq;

    fn dep(name: &str) -> Dependency {
        Dependency::new(name, VersionReq::parse("^1.0").unwrap())
    }

    #[test]
    fn order_is_dependency_then_platform() {
        let linux = Platform::Target("linux-x86_64".into());
        let mac = Platform::Target("macos-aarch64".into());
        let platforms = vec![linux.clone(), mac.clone()];

        let mut restricted = dep("b");
        restricted.platforms = vec![mac.clone()];
        let deps = vec![dep("a"), restricted];

        let proxies = expand_dependencies(&deps, &platforms);
        let rendered: Vec<String> = proxies
            .iter()
            .map(|p| format!("{} on {}", p.dep.name, p.platform))
            .collect();
        assert_eq!(
            rendered,
            vec!["a on linux-x86_64", "a on macos-aarch64", "b on macos-aarch64"]
        );
    }

    #[test]
    fn expansion_is_pure_and_repeatable() {
        let platforms = vec![Platform::Target("linux-x86_64".into())];
        let deps = vec![dep("a"), dep("b")];
        assert_eq!(
            expand_dependencies(&deps, &platforms),
            expand_dependencies(&deps, &platforms)
        );
    }
}
