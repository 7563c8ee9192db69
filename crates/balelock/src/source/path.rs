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

//! The path provider: a directory of packages, each described by its own
//! `bale.json`.

use std::path::PathBuf;

use baleutil::manifest::{read_manifest, BALE_MANIFEST};
use baleutil::platform::Platform;

use super::{SpecInfo, SpecProvider};

pub struct PathProvider {
    root: PathBuf,
}

impl PathProvider {
    pub fn new(root: PathBuf) -> Self {
        PathProvider { root }
    }
}

impl SpecProvider for PathProvider {
    fn local_specs(&self) -> anyhow::Result<Vec<SpecInfo>> {
        let mut res = Vec::new();
        if !self.root.is_dir() {
            anyhow::bail!("path source `{}` is not a directory", self.root.display());
        }
        for entry in walkdir::WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_dir() || entry.file_name() != BALE_MANIFEST {
                continue;
            }
            let manifest = read_manifest(entry.path())?;
            let Some(version) = manifest.version.clone() else {
                log::warn!(
                    "skipping `{}`: package has no version",
                    entry.path().display()
                );
                continue;
            };
            res.push(SpecInfo {
                name: manifest.name,
                version,
                platform: Platform::Generic,
                deps: manifest.deps,
            });
        }
        Ok(res)
    }

    // A directory has no remote side.
    fn remote_specs(&self) -> anyhow::Result<Vec<SpecInfo>> {
        self.local_specs()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn write_package(root: &std::path::Path, dir: &str, body: &str) {
        let pkg = root.join(dir);
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join(BALE_MANIFEST), body).unwrap();
    }

    #[test]
    fn scans_packages_one_level_down() {
        let dir = tempfile::tempdir().unwrap();
        write_package(
            dir.path(),
            "a",
            r#"{ "name": "a", "version": "0.1.0", "deps": { "b": "^0.2" } }"#,
        );
        write_package(dir.path(), "b", r#"{ "name": "b", "version": "0.2.3" }"#);
        write_package(dir.path(), "no-version", r#"{ "name": "nope" }"#);

        let provider = PathProvider::new(dir.path().to_path_buf());
        let specs = provider.local_specs().unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"], "versionless packages are skipped");
        assert_eq!(specs[0].deps["b"].version.to_string(), "^0.2");
        assert!(specs.iter().all(|s| s.platform.is_generic()));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let provider = PathProvider::new(PathBuf::from("/does/not/exist"));
        assert!(provider.local_specs().is_err());
    }
}
