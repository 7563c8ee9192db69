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

//! The solver seam. The orchestrator only ever talks to [`Resolver`], so
//! tests can swap in stubs and future solvers can replace [`stable`] without
//! touching convergence.

pub mod stable;

use std::collections::HashMap;

use semver::{Version, VersionReq};

use crate::expand::DepProxy;
use crate::index::Index;
use crate::spec::SpecSet;

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("package `{0}` was not found in any active source")]
    PackageMissing(String),
    #[error("no version of `{0}` satisfies `{1}`")]
    NoSatisfiedVersion(String, VersionReq),
    #[error("requirement `{requirement}` on `{name}` conflicts with already selected version {selected}")]
    Conflict {
        name: String,
        selected: Version,
        requirement: VersionReq,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub trait Resolver {
    /// Produce a spec set satisfying `deps` from the candidates in `index`.
    ///
    /// `source_requirements` maps each pinned name to its declared source's
    /// own listing; candidates for such a name come only from there, never
    /// from the merged index (which may shadow them behind a same-named
    /// package from another provider). `base` carries the previously locked
    /// specs; solvers should prefer a locked version whenever it still
    /// satisfies, so an unrelated manifest edit does not churn the whole
    /// resolution.
    fn resolve(
        &mut self,
        deps: &[DepProxy],
        index: &Index,
        source_requirements: &HashMap<String, SpecSet>,
        base: &SpecSet,
    ) -> Result<SpecSet, ResolverError>;
}
