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

//! Convergence and resolution of a manifest against its lockfile.
//!
//! A [`Definition`] is built once per resolution attempt. Construction runs
//! the convergence phases, which narrow the previously locked specs down to
//! the subset that is still trustworthy; [`Definition::resolve`] then either
//! returns that subset directly (when it satisfies every current dependency)
//! or hands the whole problem to the solver with the subset as a stability
//! hint.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

use baleutil::manifest::{read_manifest_in_dir, ManifestError, SourceDecl};
use baleutil::platform::Platform;
use once_cell::unsync::OnceCell;
use url::Url;

use crate::dependency::Dependency;
use crate::expand::{expand_dependencies, DepProxy};
use crate::index::Index;
use crate::lockfile::{read_lockfile, Lockfile, LockfileError, BALE_LOCKFILE};
use crate::resolver::stable::StableSolver;
use crate::resolver::{Resolver, ResolverError};
use crate::source::{Source, SourceKind};
use crate::spec::{Spec, SpecSet};

/// Names the caller explicitly wants re-resolved, overriding otherwise
/// valid locked state.
#[derive(Debug, Clone, Default)]
pub struct Unlock {
    pub packages: HashSet<String>,
    pub sources: HashSet<String>,
}

impl Unlock {
    pub fn packages<I, S>(names: I) -> Unlock
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Unlock {
            packages: names.into_iter().map(Into::into).collect(),
            sources: HashSet::new(),
        }
    }

    pub fn sources<I, S>(names: I) -> Unlock
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Unlock {
            packages: HashSet::new(),
            sources: names.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Lockfile(#[from] LockfileError),
    #[error("something went wrong, there is no source matching dependency `{0}`")]
    UnmatchedSource(String),
    #[error("a resolution was already materialized on this definition")]
    AlreadyMaterialized,
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub struct Definition {
    dependencies: Vec<Dependency>,
    sources: Vec<Rc<Source>>,
    platforms: Vec<Platform>,
    locked_deps: Vec<Dependency>,
    /// The trustworthy subset of the previous resolution, fixed at
    /// construction by the convergence phases.
    locked_specs: SpecSet,
    unlock: Unlock,
    without_groups: Vec<String>,
    resolver: RefCell<Box<dyn Resolver>>,
    expanded: OnceCell<Vec<DepProxy>>,
    resolution: OnceCell<SpecSet>,
    materialized: OnceCell<(SpecSet, Vec<Dependency>)>,
}

// not derivable past the boxed solver
impl std::fmt::Debug for Definition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Definition")
            .field("dependencies", &self.dependencies)
            .field("sources", &self.sources)
            .field("platforms", &self.platforms)
            .field("locked_specs", &self.locked_specs)
            .finish_non_exhaustive()
    }
}

impl Definition {
    /// Read `bale.json` (and `bale.lock` when present) from `dir` and build
    /// a definition from them.
    pub fn build(dir: &std::path::Path, unlock: Unlock) -> Result<Definition, DefinitionError> {
        let manifest = read_manifest_in_dir(dir)?;
        let lock_path = dir.join(BALE_LOCKFILE);
        let lockfile = if lock_path.is_file() {
            Some(read_lockfile(&lock_path)?)
        } else {
            None
        };

        let mut sources: Vec<Rc<Source>> = Vec::new();
        for decl in &manifest.sources {
            match decl {
                SourceDecl::Registry(url) => {
                    sources.push(Source::registry(parse_source_url(url)?));
                }
                SourceDecl::Path(declared) => {
                    sources.push(Source::path(PathBuf::from(declared), dir.join(declared)));
                }
            }
        }

        let mut dependencies = Vec::new();
        for (name, info) in &manifest.deps {
            let mut dep = Dependency::from_info(name, info);
            if let Some(declared) = &info.path {
                let kind = SourceKind::Path(PathBuf::from(declared));
                let source = match sources.iter().find(|s| *s.kind() == kind) {
                    Some(s) => s.clone(),
                    None => {
                        let s = Source::path(PathBuf::from(declared), dir.join(declared));
                        sources.push(s.clone());
                        s
                    }
                };
                dep.source = Some(source);
            } else if let Some(registry) = &info.registry {
                let url = parse_source_url(registry)?;
                let kind = SourceKind::Registry(url.clone());
                let source = match sources.iter().find(|s| *s.kind() == kind) {
                    Some(s) => s.clone(),
                    None => {
                        let s = Source::registry(url);
                        sources.push(s.clone());
                        s
                    }
                };
                dep.source = Some(source);
            }
            dependencies.push(dep);
        }

        Definition::new(
            dependencies,
            sources,
            manifest.platforms,
            lockfile,
            unlock,
        )
    }

    /// Build a definition from already-parsed manifest output and an
    /// optional parsed lockfile. Convergence runs here, synchronously.
    pub fn new(
        dependencies: Vec<Dependency>,
        sources: Vec<Rc<Source>>,
        platforms: Vec<Platform>,
        lockfile: Option<Lockfile>,
        unlock: Unlock,
    ) -> Result<Definition, DefinitionError> {
        let (locked_sources, mut locked_deps, locked_specs, locked_platforms) = match lockfile {
            Some(lock) => (lock.sources, lock.dependencies, lock.specs, lock.platforms),
            None => (Vec::new(), Vec::new(), SpecSet::default(), Vec::new()),
        };

        // locked platforms first, then declared extras, then the current
        // environment; never empty
        let mut merged_platforms: Vec<Platform> = Vec::new();
        for platform in locked_platforms.into_iter().chain(platforms) {
            if !merged_platforms.contains(&platform) {
                merged_platforms.push(platform);
            }
        }
        let current = Platform::current();
        if !merged_platforms.contains(&current) {
            merged_platforms.push(current);
        }

        // phase 1: source convergence; later phases depend on the identity
        // fixed here
        for locked in &locked_sources {
            match sources.iter().find(|s| s.as_ref() == locked.as_ref()) {
                Some(matched) => matched.adopt_cache_from(locked),
                None => log::debug!("locked source {} is gone from the manifest", locked),
            }
        }
        for source in &sources {
            if unlock.sources.contains(&source.name()) {
                source.unlock();
            }
        }

        // phase 2: every bound dependency must point into the current list
        let mut dependencies = dependencies;
        for dep in dependencies.iter_mut().chain(locked_deps.iter_mut()) {
            let Some(bound) = &dep.source else { continue };
            let matched = sources
                .iter()
                .find(|s| s.as_ref() == bound.as_ref())
                .ok_or_else(|| DefinitionError::UnmatchedSource(dep.name.clone()))?;
            dep.source = Some(matched.clone());
        }

        // phase 3a: a current dependency seeds reachability only if the lock
        // already knew it, either as the same declaration or through a spec
        // that satisfies it
        let kept: Vec<Dependency> = dependencies
            .iter()
            .filter(|dep| {
                let in_locked = locked_deps
                    .iter()
                    .any(|locked| locked == *dep && locked.source == dep.source);
                in_locked || locked_specs.iter().any(|spec| spec.satisfies(dep))
            })
            .cloned()
            .collect();

        // phase 3b: rebind locked specs to current sources, dropping the
        // ones whose source is gone or explicitly invalidated
        let mut survivors: Vec<Rc<Spec>> = Vec::new();
        for spec in locked_specs.iter() {
            if unlock.sources.contains(&spec.name) {
                log::debug!("dropping locked spec {:?}: named in the source unlock list", spec);
                continue;
            }
            match sources.iter().find(|s| s.as_ref() == spec.source.as_ref()) {
                Some(matched) => survivors.push(Rc::new(spec.rebound(matched.clone()))),
                None => {
                    log::debug!("dropping locked spec {:?}: source no longer present", spec)
                }
            }
        }
        let mut survivors = SpecSet::new(survivors);

        // phases 3c and 3d: only specs reachable from the kept dependencies
        // stay trusted; unlocked package names are forced stale
        let kept_expanded = expand_dependencies(&kept, &merged_platforms);
        let reachable = survivors.for_dependencies(&kept_expanded, &unlock.packages);
        survivors.retain_names(&reachable.names());
        log::debug!(
            "convergence kept {} of {} locked specs",
            survivors.len(),
            locked_specs.len()
        );

        Ok(Definition {
            dependencies,
            sources,
            platforms: merged_platforms,
            locked_deps,
            locked_specs: survivors,
            unlock,
            without_groups: Vec::new(),
            resolver: RefCell::new(Box::new(StableSolver::new())),
            expanded: OnceCell::new(),
            resolution: OnceCell::new(),
            materialized: OnceCell::new(),
        })
    }

    pub fn with_solver(self, solver: Box<dyn Resolver>) -> Definition {
        Definition {
            resolver: RefCell::new(solver),
            ..self
        }
    }

    /// Exclude the named groups from `requested_specs`.
    pub fn set_without_groups(&mut self, groups: Vec<String>) {
        self.without_groups = groups;
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn sources(&self) -> &[Rc<Source>] {
        &self.sources
    }

    pub fn locked_dependencies(&self) -> &[Dependency] {
        &self.locked_deps
    }

    pub fn unlock(&self) -> &Unlock {
        &self.unlock
    }

    /// Dependencies applicable to the current environment.
    pub fn current_dependencies(&self) -> Vec<Dependency> {
        self.dependencies
            .iter()
            .filter(|dep| dep.should_include())
            .cloned()
            .collect()
    }

    /// Every group named by some dependency, sorted.
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self
            .dependencies
            .iter()
            .flat_map(|dep| dep.groups.iter().cloned())
            .collect();
        groups.sort_unstable();
        groups.dedup();
        groups
    }

    fn expanded_dependencies(&self) -> &[DepProxy] {
        self.expanded.get_or_init(|| {
            let current = self.current_dependencies();
            expand_dependencies(&current, &self.platforms)
        })
    }

    /// The resolution, memoized. When the converged locked subset already
    /// satisfies every expanded dependency the solver is never consulted.
    pub fn resolve(&self) -> Result<&SpecSet, DefinitionError> {
        if let Some(resolution) = self.resolution.get() {
            return Ok(resolution);
        }
        let expanded = self.expanded_dependencies();
        let result = if self.locked_specs.valid_for(expanded) {
            log::debug!("locked resolution satisfies every dependency, skipping the solver");
            self.locked_specs.clone()
        } else {
            log::debug!("locked resolution is stale or incomplete, consulting the solver");
            let mut pins: HashMap<String, SpecSet> = HashMap::new();
            for dep in &self.dependencies {
                if let Some(source) = &dep.source {
                    pins.insert(dep.name.clone(), SpecSet::from_source(source)?);
                }
            }
            let index = Index::build(&self.sources)?;
            self.resolver
                .borrow_mut()
                .resolve(expanded, &index, &pins, &self.locked_specs)?
        };
        Ok(self.resolution.get_or_init(|| result))
    }

    /// Dependencies in the groups not excluded via `set_without_groups`.
    fn requested_dependencies(&self) -> Vec<Dependency> {
        self.current_dependencies()
            .into_iter()
            .filter(|dep| dep.groups.iter().any(|g| !self.without_groups.contains(g)))
            .collect()
    }

    /// Concrete specs for the requested dependencies. Write-once; also
    /// records the dependencies nothing in the resolution satisfies.
    pub fn specs(&self) -> Result<&SpecSet, DefinitionError> {
        if let Some((specs, _)) = self.materialized.get() {
            return Ok(specs);
        }
        let resolution = self.resolve()?;
        let requested = self.requested_dependencies();
        let expanded = expand_dependencies(&requested, &self.platforms);
        let (specs, _) = self
            .materialized
            .get_or_init(|| resolution.materialize(&expanded));
        Ok(specs)
    }

    /// Dependencies with no resolved spec. Non-fatal at this layer.
    pub fn missing_specs(&self) -> Result<Vec<Dependency>, DefinitionError> {
        self.specs()?;
        let missing = self
            .materialized
            .get()
            .map(|(_, missing)| missing.clone())
            .unwrap_or_default();
        Ok(missing)
    }

    /// Specs restricted to dependencies in the given groups.
    pub fn specs_for(&self, groups: &[&str]) -> Result<SpecSet, DefinitionError> {
        let deps: Vec<Dependency> = self
            .current_dependencies()
            .into_iter()
            .filter(|dep| dep.groups.iter().any(|g| groups.contains(&g.as_str())))
            .collect();
        let expanded = expand_dependencies(&deps, &self.platforms);
        let (specs, _) = self.resolve()?.materialize(&expanded);
        Ok(specs)
    }

    /// Specs for every group not excluded via `set_without_groups`.
    pub fn requested_specs(&self) -> Result<SpecSet, DefinitionError> {
        Ok(self.specs()?.clone())
    }

    /// Switch every source into remote-fetch mode and materialize. Erroring
    /// on an already-materialized definition is a contract violation by the
    /// caller, not a resolution failure.
    pub fn resolve_remotely(&self) -> Result<&SpecSet, DefinitionError> {
        if self.materialized.get().is_some() {
            return Err(DefinitionError::AlreadyMaterialized);
        }
        for source in &self.sources {
            source.activate_remote();
        }
        self.specs()
    }

    /// The canonical lockfile text for this definition's resolution.
    pub fn to_lock(&self) -> Result<String, DefinitionError> {
        let resolution = self.resolve()?;
        Ok(Lockfile::render(
            &self.sources,
            resolution,
            &self.platforms,
            &self.dependencies,
        ))
    }
}

fn parse_source_url(raw: &str) -> Result<Url, DefinitionError> {
    Url::parse(raw)
        .map_err(|e| anyhow::anyhow!("bad source url `{}`: {}", raw, e).into())
}
