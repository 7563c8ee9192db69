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

//! Lockfile convergence and dependency resolution: sources and their spec
//! listings, the converged [`definition::Definition`], the solver seam, and
//! the `bale.lock` text format.

pub mod definition;
pub mod dependency;
pub mod expand;
pub mod index;
pub mod lockfile;
pub mod resolver;
pub mod source;
pub mod spec;

pub use definition::{Definition, DefinitionError, Unlock};
pub use lockfile::{Lockfile, BALE_LOCKFILE};
pub use spec::{Spec, SpecSet};
