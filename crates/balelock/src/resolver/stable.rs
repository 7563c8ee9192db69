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

//! A deterministic greedy solver. For each package it takes the locked
//! version when that still satisfies, otherwise the highest satisfying
//! version, and never backtracks. Requirement sets a greedy pass cannot
//! order are reported as conflicts rather than searched.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use baleutil::platform::Platform;
use semver::Version;

use crate::dependency::Dependency;
use crate::expand::DepProxy;
use crate::index::Index;
use crate::resolver::{Resolver, ResolverError};
use crate::spec::{Spec, SpecSet};

#[derive(Debug, Default)]
pub struct StableSolver;

impl StableSolver {
    pub fn new() -> StableSolver {
        StableSolver
    }
}

impl Resolver for StableSolver {
    fn resolve(
        &mut self,
        deps: &[DepProxy],
        index: &Index,
        source_requirements: &HashMap<String, SpecSet>,
        base: &SpecSet,
    ) -> Result<SpecSet, ResolverError> {
        let mut selected: HashMap<String, Version> = HashMap::new();
        let mut chosen: Vec<Rc<Spec>> = Vec::new();
        let mut handled: HashSet<(String, Platform)> = HashSet::new();
        let mut work: VecDeque<DepProxy> = deps.iter().cloned().collect();

        while let Some(proxy) = work.pop_front() {
            let name = proxy.dep.name.clone();
            if let Some(version) = selected.get(&name) {
                if !proxy.dep.req.matches(version) {
                    return Err(ResolverError::Conflict {
                        name,
                        selected: version.clone(),
                        requirement: proxy.dep.req.clone(),
                    });
                }
            }
            if !handled.insert((name.clone(), proxy.platform.clone())) {
                continue;
            }

            // a pinned name is served from its source's own listing; the
            // merged index may shadow it behind another provider's package
            let candidates = match source_requirements.get(&name) {
                Some(pinned) => pinned.search(&name, &proxy.dep.req, &proxy.platform),
                None => index.search(&name, &proxy.dep.req, &proxy.platform),
            };
            if candidates.is_empty() {
                let known = match source_requirements.get(&name) {
                    Some(pinned) => pinned.lookup(&name).next().is_some(),
                    None => index.contains_name(&name),
                };
                if !known {
                    return Err(ResolverError::PackageMissing(name));
                }
                return Err(ResolverError::NoSatisfiedVersion(
                    name,
                    proxy.dep.req.clone(),
                ));
            }

            let pick = if let Some(version) = selected.get(&name) {
                // a second platform of an already selected package; it must
                // exist at the same version
                candidates
                    .iter()
                    .find(|s| s.version == *version)
                    .ok_or_else(|| {
                        ResolverError::NoSatisfiedVersion(name.clone(), proxy.dep.req.clone())
                    })?
                    .clone()
            } else if let Some(hinted) = base
                .lookup(&name)
                .find_map(|locked| candidates.iter().find(|s| s.version == locked.version))
            {
                hinted.clone()
            } else {
                // candidates are in ascending version order
                candidates.last().unwrap().clone()
            };

            log::debug!("selected {:?} for {:?}", pick, proxy);
            selected
                .entry(name)
                .or_insert_with(|| pick.version.clone());
            if !chosen.iter().any(|s| Rc::ptr_eq(s, &pick)) {
                chosen.push(pick.clone());
            }

            for (dep_name, info) in &pick.deps {
                let applies = info.platforms.is_empty()
                    || info
                        .platforms
                        .iter()
                        .any(|p| p.compatible_with(&proxy.platform));
                if !applies {
                    continue;
                }
                work.push_back(DepProxy {
                    dep: Dependency::new(dep_name.clone(), info.version.clone()),
                    platform: proxy.platform.clone(),
                });
            }
        }

        Ok(SpecSet::new(chosen))
    }
}
