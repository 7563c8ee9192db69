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

//! Resolved package specs and the [`SpecSet`] collection the convergence
//! engine and orchestrator lean on.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::rc::Rc;

use baleutil::dependency::DependencyInfo;
use baleutil::platform::Platform;
use indexmap::IndexMap;
use semver::{Version, VersionReq};

use crate::dependency::Dependency;
use crate::expand::DepProxy;
use crate::source::{Source, SpecInfo};

/// A concrete resolved package.
#[derive(Clone)]
pub struct Spec {
    pub name: String,
    pub version: Version,
    pub platform: Platform,
    pub source: Rc<Source>,
    /// What this package itself depends on; drives reachability.
    pub deps: IndexMap<String, DependencyInfo>,
}

/// Logical identity: (name, version, platform, source identity).
impl PartialEq for Spec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.platform == other.platform
            && self.source == other.source
    }
}

impl Eq for Spec {}

impl std::fmt::Debug for Spec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.platform.is_generic() {
            write!(f, "{} ({})", self.name, self.version)
        } else {
            write!(f, "{} ({}-{})", self.name, self.version, self.platform)
        }
    }
}

impl Spec {
    pub fn from_info(info: &SpecInfo, source: Rc<Source>) -> Spec {
        Spec {
            name: info.name.clone(),
            version: info.version.clone(),
            platform: info.platform.clone(),
            source,
            deps: info.deps.clone(),
        }
    }

    /// Whether this spec meets a dependency's constraint.
    pub fn satisfies(&self, dep: &Dependency) -> bool {
        self.name == dep.name && dep.req.matches(&self.version)
    }

    /// The same spec bound to a different (matching) source instance.
    pub fn rebound(&self, source: Rc<Source>) -> Spec {
        let mut spec = self.clone();
        spec.source = source;
        spec
    }

    /// The lockfile lines for this spec: the spec line plus one line per own
    /// dependency, sorted by name.
    pub fn to_lock(&self) -> String {
        let mut out = format!("    {:?}\n", self);
        let mut deps: Vec<(&String, &DependencyInfo)> = self.deps.iter().collect();
        deps.sort_by_key(|(name, _)| name.as_str());
        for (name, info) in deps {
            if info.version == VersionReq::STAR {
                out.push_str(&format!("      {}\n", name));
            } else {
                out.push_str(&format!("      {} ({})\n", name, info.version));
            }
        }
        out
    }
}

/// An ordered collection of resolved specs.
#[derive(Debug, Clone, Default)]
pub struct SpecSet {
    specs: Vec<Rc<Spec>>,
}

impl SpecSet {
    pub fn new(specs: Vec<Rc<Spec>>) -> SpecSet {
        SpecSet { specs }
    }

    /// Bind a source's current listing into a spec set.
    pub fn from_source(source: &Rc<Source>) -> anyhow::Result<SpecSet> {
        let infos = source.spec_infos()?;
        let specs = infos
            .iter()
            .map(|info| Rc::new(Spec::from_info(info, source.clone())))
            .collect();
        Ok(SpecSet::new(specs))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<Spec>> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    /// All platform flavors of `name`, in set order.
    pub fn lookup<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Rc<Spec>> {
        self.specs.iter().filter(move |s| s.name == name)
    }

    /// The spec serving `name` on `platform`: an exact platform match if one
    /// exists, otherwise the generic flavor.
    fn find_for(&self, name: &str, platform: &Platform) -> Option<&Rc<Spec>> {
        let mut generic = None;
        for spec in &self.specs {
            if spec.name != name {
                continue;
            }
            if spec.platform == *platform {
                return Some(spec);
            }
            if spec.platform.is_generic() {
                generic = Some(spec);
            }
        }
        generic
    }

    /// Candidates for `name` matching `req` and usable on `platform`, in
    /// ascending version order. An exact platform flavor shadows the generic
    /// one at the same version.
    pub fn search(&self, name: &str, req: &VersionReq, platform: &Platform) -> Vec<Rc<Spec>> {
        let mut grouped: BTreeMap<Version, Vec<&Rc<Spec>>> = BTreeMap::new();
        for spec in &self.specs {
            if spec.name == name
                && req.matches(&spec.version)
                && spec.platform.compatible_with(platform)
            {
                grouped.entry(spec.version.clone()).or_default().push(spec);
            }
        }
        grouped
            .into_values()
            .map(|flavors| {
                flavors
                    .iter()
                    .find(|s| s.platform == *platform)
                    .copied()
                    .unwrap_or(flavors[0])
                    .clone()
            })
            .collect()
    }

    /// Whether some spec satisfies the dependency on the proxy's platform.
    fn satisfies_proxy(&self, proxy: &DepProxy) -> bool {
        self.specs
            .iter()
            .any(|s| s.satisfies(&proxy.dep) && s.platform.compatible_with(&proxy.platform))
    }

    /// The subset of this set transitively required by `deps`.
    ///
    /// Reachability is by name: a name in `skip` is treated as unsatisfiable
    /// and excluded along with everything only reachable through it.
    pub fn for_dependencies(&self, deps: &[DepProxy], skip: &HashSet<String>) -> SpecSet {
        let mut handled: HashSet<(String, Platform)> = HashSet::new();
        let mut taken: Vec<Rc<Spec>> = Vec::new();
        let mut work: VecDeque<DepProxy> = deps.iter().cloned().collect();

        while let Some(proxy) = work.pop_front() {
            let name = proxy.dep.name.clone();
            if skip.contains(&name) {
                continue;
            }
            if !handled.insert((name.clone(), proxy.platform.clone())) {
                continue;
            }
            let Some(spec) = self.find_for(&name, &proxy.platform) else {
                continue;
            };
            if !taken.iter().any(|s| Rc::ptr_eq(s, spec)) {
                taken.push(spec.clone());
            }
            for (dep_name, info) in &spec.deps {
                let sub_applies = info.platforms.is_empty()
                    || info
                        .platforms
                        .iter()
                        .any(|p| p.compatible_with(&proxy.platform));
                if !sub_applies {
                    continue;
                }
                work.push_back(DepProxy {
                    dep: Dependency::new(dep_name.clone(), info.version.clone()),
                    platform: proxy.platform.clone(),
                });
            }
        }

        SpecSet::new(taken)
    }

    /// True iff every given dependency is satisfied by this set and the set
    /// has no members unreachable from the given dependencies.
    pub fn valid_for(&self, deps: &[DepProxy]) -> bool {
        for proxy in deps {
            if !self.satisfies_proxy(proxy) {
                log::debug!("unsatisfied dependency: {:?}", proxy);
                return false;
            }
        }
        let reachable = self.for_dependencies(deps, &HashSet::new());
        if reachable.names() != self.names() {
            log::debug!("set has members unreachable from the given dependencies");
            return false;
        }
        true
    }

    /// Keep only specs whose name is in `names`.
    pub fn retain_names(&mut self, names: &BTreeSet<String>) {
        self.specs.retain(|s| names.contains(&s.name));
    }

    /// Specs of self plus specs of `other` whose names self does not have.
    pub fn union(&self, other: &SpecSet) -> SpecSet {
        let names = self.names();
        let mut specs = self.specs.clone();
        specs.extend(
            other
                .specs
                .iter()
                .filter(|s| !names.contains(&s.name))
                .cloned(),
        );
        SpecSet::new(specs)
    }

    /// Specs of self whose names `other` does not have.
    pub fn difference(&self, other: &SpecSet) -> SpecSet {
        let names = other.names();
        SpecSet::new(
            self.specs
                .iter()
                .filter(|s| !names.contains(&s.name))
                .cloned()
                .collect(),
        )
    }

    /// Narrow the resolution to the specs the given requests actually need,
    /// and report requests nothing here satisfies. Missing requests are data,
    /// not an error; callers decide how to surface them.
    pub fn materialize(&self, deps: &[DepProxy]) -> (SpecSet, Vec<Dependency>) {
        let subset = self.for_dependencies(deps, &HashSet::new());
        let mut missing: Vec<Dependency> = Vec::new();
        for proxy in deps {
            if !self.satisfies_proxy(proxy) && !missing.iter().any(|d| d.name == proxy.dep.name) {
                missing.push(proxy.dep.clone());
            }
        }
        (subset, missing)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::expand::expand_dependencies;
    use crate::source::mock::{create_spec_info, mock_registry};

    fn make_set<'a>(entries: &[(&'a str, &'a str, &'a [(&'a str, &'a str)])]) -> SpecSet {
        let source = mock_registry("https://reg.example.com", |_| {});
        let specs = entries
            .iter()
            .map(|(name, version, deps)| {
                let info = create_spec_info(name, version, Platform::Generic, deps.iter().copied());
                Rc::new(Spec::from_info(&info, source.clone()))
            })
            .collect();
        SpecSet::new(specs)
    }

    fn proxies(deps: &[(&str, &str)]) -> Vec<DepProxy> {
        let deps: Vec<Dependency> = deps
            .iter()
            .map(|(name, req)| Dependency::new(*name, VersionReq::parse(req).unwrap()))
            .collect();
        expand_dependencies(&deps, &[Platform::Target("linux-x86_64".into())])
    }

    #[test]
    fn reachability_follows_spec_dependencies() {
        let set = make_set(&[
            ("a", "1.0.0", &[("b", "^1.0")]),
            ("b", "1.2.0", &[]),
            ("orphan", "3.0.0", &[]),
        ]);
        let reached = set.for_dependencies(&proxies(&[("a", "^1.0")]), &HashSet::new());
        assert_eq!(
            reached.names().into_iter().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn skip_names_are_forced_unsatisfied() {
        let set = make_set(&[
            ("a", "1.0.0", &[("b", "^1.0")]),
            ("b", "1.2.0", &[("c", "^1.0")]),
            ("c", "1.0.0", &[]),
        ]);
        let skip: HashSet<String> = ["b".to_string()].into_iter().collect();
        let reached = set.for_dependencies(&proxies(&[("a", "^1.0")]), &skip);
        assert_eq!(reached.names().into_iter().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn search_is_version_ordered_within_one_listing() {
        let set = make_set(&[
            ("a", "1.4.0", &[]),
            ("a", "1.0.0", &[]),
            ("a", "2.0.0", &[]),
        ]);
        let found = set.search("a", &VersionReq::parse("^1.0").unwrap(), &Platform::Generic);
        let versions: Vec<String> = found.iter().map(|s| s.version.to_string()).collect();
        assert_eq!(versions, vec!["1.0.0", "1.4.0"]);
    }

    #[test]
    fn valid_for_rejects_unmet_and_orphaned() {
        let set = make_set(&[("a", "1.0.0", &[]), ("orphan", "3.0.0", &[])]);
        // unmet constraint
        assert!(!set.valid_for(&proxies(&[("a", "^2.0")])));
        // orphan member
        assert!(!set.valid_for(&proxies(&[("a", "^1.0")])));

        let tight = make_set(&[("a", "1.0.0", &[])]);
        assert!(tight.valid_for(&proxies(&[("a", "^1.0")])));
    }

    #[test]
    fn platform_specific_spec_is_preferred_over_generic() {
        let source = mock_registry("https://reg.example.com", |_| {});
        let linux = Platform::Target("linux-x86_64".into());
        let generic = Rc::new(Spec::from_info(
            &create_spec_info("a", "1.0.0", Platform::Generic, []),
            source.clone(),
        ));
        let native = Rc::new(Spec::from_info(
            &create_spec_info("a", "1.0.0", linux.clone(), []),
            source,
        ));
        let set = SpecSet::new(vec![generic, native.clone()]);
        let found = set.find_for("a", &linux).unwrap();
        assert!(Rc::ptr_eq(found, &native));
    }

    #[test]
    fn union_and_difference_are_by_name() {
        let left = make_set(&[("a", "1.0.0", &[]), ("b", "1.0.0", &[])]);
        let right = make_set(&[("b", "9.0.0", &[]), ("c", "1.0.0", &[])]);

        let union = left.union(&right);
        assert_eq!(
            union.names().into_iter().collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        // left's b wins
        assert!(union.lookup("b").all(|s| s.version.to_string() == "1.0.0"));

        let diff = left.difference(&right);
        assert_eq!(diff.names().into_iter().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn materialize_reports_missing_as_data() {
        let set = make_set(&[("a", "1.0.0", &[])]);
        let (subset, missing) = set.materialize(&proxies(&[("a", "^1.0"), ("ghost", "^1.0")]));
        assert_eq!(subset.names().into_iter().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "ghost");
    }

    #[test]
    fn spec_lock_lines_sort_own_dependencies() {
        let set = make_set(&[("a", "1.0.0", &[("z", "^1.0"), ("b", "^2.0")])]);
        let spec = set.lookup("a").next().unwrap();
        assert_eq!(
            spec.to_lock(),
            "    a (1.0.0)\n      b (^2.0)\n      z (^1.0)\n"
        );
    }
}
