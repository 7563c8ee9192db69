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

//! The `bale.json` project manifest: desired dependencies, sources and platforms.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::dependency::{DependencyInfo, DependencyInfoJson};
use crate::platform::Platform;

pub const BALE_MANIFEST: &str = "bale.json";

/// A source declared in a manifest, before it is turned into a live source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDecl {
    /// A remote registry, identified by its URL.
    Registry(String),
    /// A directory of packages, relative to the manifest.
    Path(String),
}

/// The JSON representation of a source declaration: either a bare URL
/// string or `{ "path": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceDeclJson {
    Registry(String),
    Path { path: String },
}

impl From<SourceDeclJson> for SourceDecl {
    fn from(decl: SourceDeclJson) -> Self {
        match decl {
            SourceDeclJson::Registry(url) => SourceDecl::Registry(url),
            SourceDeclJson::Path { path } => SourceDecl::Path(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    pub version: Option<Version>,
    pub sources: Vec<SourceDecl>,
    pub deps: IndexMap<String, DependencyInfo>,
    /// Extra resolution platforms beyond the current environment.
    pub platforms: Vec<Platform>,
}

/// The raw JSON mirror of [`Manifest`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestJson {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceDeclJson>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub deps: IndexMap<String, DependencyInfoJson>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<Platform>,
}

#[derive(Debug, thiserror::Error)]
pub enum NameError {
    #[error("`name` should not be empty")]
    EmptyName,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to load `{}`", path.display())]
pub struct ManifestFormatError {
    path: Box<Path>,
    #[source]
    kind: ManifestFormatErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestFormatErrorKind {
    #[error("I/O error")]
    IO(#[from] std::io::Error),
    #[error("Parse error")]
    Parse(#[from] serde_json_lenient::Error),
    #[error("`name` bad format")]
    Name(#[from] NameError),
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest `{}` not found", .0.display())]
    NotFound(PathBuf),
    #[error(transparent)]
    Format(#[from] ManifestFormatError),
}

impl TryFrom<ManifestJson> for Manifest {
    type Error = NameError;

    fn try_from(j: ManifestJson) -> Result<Self, Self::Error> {
        if j.name.is_empty() {
            return Err(NameError::EmptyName);
        }
        Ok(Manifest {
            name: j.name,
            version: j.version,
            sources: j.sources.into_iter().map(SourceDecl::from).collect(),
            deps: j
                .deps
                .into_iter()
                .map(|(name, info)| (name, info.into()))
                .collect(),
            platforms: j.platforms,
        })
    }
}

/// Evaluate the manifest at `path` into its declared dependencies and sources.
pub fn read_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    if !path.is_file() {
        return Err(ManifestError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| ManifestFormatError {
        path: path.into(),
        kind: ManifestFormatErrorKind::IO(e),
    })?;
    let reader = BufReader::new(file);
    let j: ManifestJson =
        serde_json_lenient::from_reader(reader).map_err(|e| ManifestFormatError {
            path: path.into(),
            kind: ManifestFormatErrorKind::Parse(e),
        })?;
    let manifest = j.try_into().map_err(|e: NameError| ManifestFormatError {
        path: path.into(),
        kind: e.into(),
    })?;
    Ok(manifest)
}

/// Read the manifest from its conventional location inside `dir`.
pub fn read_manifest_in_dir(dir: &Path) -> Result<Manifest, ManifestError> {
    read_manifest(&dir.join(BALE_MANIFEST))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_manifest(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join(BALE_MANIFEST);
        let mut f = File::create(&path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_sources_deps_and_platforms() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            r#"{
                "name": "app",
                "sources": ["https://registry.example.com", { "path": "./vendor" }],
                "deps": {
                    "rack": "^1.0",
                    "local-thing": { "version": "^0.1", "path": "./vendor", "groups": ["dev"] }
                },
                "platforms": ["linux-x86_64"]
            }"#,
        );
        let manifest = read_manifest(&path).unwrap();
        assert_eq!(manifest.name, "app");
        assert_eq!(
            manifest.sources,
            vec![
                SourceDecl::Registry("https://registry.example.com".into()),
                SourceDecl::Path("./vendor".into()),
            ]
        );
        assert_eq!(manifest.deps["rack"].version.to_string(), "^1.0");
        assert_eq!(manifest.deps["local-thing"].groups, vec!["dev".to_string()]);
        assert_eq!(
            manifest.platforms,
            vec![Platform::Target("linux-x86_64".into())]
        );
    }

    #[test]
    fn missing_manifest_is_a_not_found_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_manifest_in_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
    }

    #[test]
    fn empty_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(dir.path(), r#"{ "name": "" }"#);
        assert!(matches!(
            read_manifest(&path),
            Err(ManifestError::Format(_))
        ));
    }
}
