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

//! A queryable view over every candidate spec the active sources offer.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use baleutil::platform::Platform;
use semver::{Version, VersionReq};

use crate::spec::{Spec, SpecSet};
use crate::source::Source;

/// Candidate specs grouped by name, ordered by version within a name.
#[derive(Debug, Default)]
pub struct Index {
    packages: HashMap<String, BTreeMap<Version, Vec<Rc<Spec>>>>,
}

impl Index {
    pub fn new() -> Index {
        Index::default()
    }

    /// An index over every listing the given sources currently expose.
    /// Earlier sources win on (name, version, platform) collisions.
    pub fn build(sources: &[Rc<Source>]) -> anyhow::Result<Index> {
        let mut index = Index::new();
        for source in sources {
            index.use_specs(&SpecSet::from_source(source)?);
        }
        Ok(index)
    }

    /// Fold a spec set into the index, keeping first-seen flavors.
    pub fn use_specs(&mut self, specs: &SpecSet) {
        for spec in specs.iter() {
            let versions = self.packages.entry(spec.name.clone()).or_default();
            let flavors = versions.entry(spec.version.clone()).or_default();
            if !flavors.iter().any(|s| s.platform == spec.platform) {
                flavors.push(spec.clone());
            }
        }
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Candidates for `name` matching `req` and usable on `platform`, in
    /// ascending version order. A platform-exact flavor shadows the generic
    /// one at the same version.
    pub fn search(&self, name: &str, req: &VersionReq, platform: &Platform) -> Vec<Rc<Spec>> {
        let Some(versions) = self.packages.get(name) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (version, flavors) in versions {
            if !req.matches(version) {
                continue;
            }
            let usable: Vec<&Rc<Spec>> = flavors
                .iter()
                .filter(|s| s.platform.compatible_with(platform))
                .collect();
            if let Some(exact) = usable.iter().find(|s| s.platform == *platform) {
                out.push((*exact).clone());
            } else if let Some(generic) = usable.first() {
                out.push((*generic).clone());
            }
        }
        out
    }

    /// Names offered by more than one source; these need a source pin or a
    /// deliberate ordering to resolve unambiguously.
    pub fn duplicated_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for (name, versions) in &self.packages {
            let mut kinds = HashSet::new();
            for flavors in versions.values() {
                for spec in flavors {
                    kinds.insert(spec.source.kind().clone());
                }
            }
            if kinds.len() > 1 {
                out.push(name.as_str());
            }
        }
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::mock::{mock_path, mock_registry};

    #[test]
    fn search_returns_ascending_matches() {
        let source = mock_registry("https://reg.example.com", |reg| {
            reg.add("alpha", "1.0.0", [])
                .add("alpha", "1.2.0", [])
                .add("alpha", "2.0.0", [])
                .add("beta", "1.0.0", []);
        });
        let index = Index::build(&[source]).unwrap();
        let found = index.search(
            "alpha",
            &VersionReq::parse("^1.0").unwrap(),
            &Platform::current(),
        );
        let versions: Vec<String> = found.iter().map(|s| s.version.to_string()).collect();
        assert_eq!(versions, vec!["1.0.0", "1.2.0"]);
    }

    #[test]
    fn earlier_source_wins_on_collision() {
        let path = mock_path("./vendor", |p| {
            p.add("shared", "1.0.0", []);
        });
        let registry = mock_registry("https://reg.example.com", |reg| {
            reg.add("shared", "1.0.0", []);
        });
        let index = Index::build(&[path.clone(), registry]).unwrap();
        let found = index.search("shared", &VersionReq::STAR, &Platform::current());
        assert_eq!(found.len(), 1);
        assert!(Rc::ptr_eq(&found[0].source, &path));
        assert_eq!(index.duplicated_names(), Vec::<&str>::new());
    }

    #[test]
    fn duplicated_names_spot_cross_source_packages() {
        let path = mock_path("./vendor", |p| {
            p.add("shared", "1.0.0", []);
        });
        let registry = mock_registry("https://reg.example.com", |reg| {
            reg.add("shared", "2.0.0", []).add("only-here", "1.0.0", []);
        });
        let index = Index::build(&[path, registry]).unwrap();
        assert_eq!(index.duplicated_names(), vec!["shared"]);
    }

    #[test]
    fn platform_flavor_shadows_generic_at_same_version() {
        let linux = Platform::Target("linux-x86_64".to_string());
        let linux2 = linux.clone();
        let source = mock_registry("https://reg.example.com", move |reg| {
            reg.add("native", "1.0.0", [])
                .add_platform("native", "1.0.0", linux2, []);
        });
        let index = Index::build(&[source]).unwrap();
        let found = index.search("native", &VersionReq::STAR, &linux);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].platform, linux);

        let generic = index.search("native", &VersionReq::STAR, &Platform::Generic);
        assert_eq!(generic.len(), 1);
        assert!(generic[0].platform.is_generic());
    }
}
