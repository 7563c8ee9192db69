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

//! The registry provider: an on-disk index cache plus a blocking HTTP fetch
//! of the registry's `index.json` listing.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Context;
use url::Url;

use super::{SpecInfo, SpecInfoJson, SpecProvider};

pub struct RegistryProvider {
    url: Url,
    index_dir: PathBuf,
}

/// Root directory for bale's per-user state.
pub fn bale_home() -> PathBuf {
    home::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".bale")
}

fn index_file_name(url: &Url) -> String {
    let raw = format!(
        "{}{}",
        url.host_str().unwrap_or("registry"),
        url.path().trim_end_matches('/')
    );
    let sanitized: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '-' })
        .collect();
    format!("{}.index", sanitized)
}

impl RegistryProvider {
    pub fn new(url: Url) -> Self {
        RegistryProvider {
            url,
            index_dir: bale_home().join("index"),
        }
    }

    pub fn with_index_dir(url: Url, index_dir: PathBuf) -> Self {
        RegistryProvider { url, index_dir }
    }

    fn index_file(&self) -> PathBuf {
        self.index_dir.join(index_file_name(&self.url))
    }

    fn write_index(&self, infos: &[SpecInfoJson]) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.index_dir)?;
        let path = self.index_file();
        let mut file = std::fs::File::create(&path)
            .with_context(|| format!("failed to write index file {:?}", path))?;
        for info in infos {
            let line = serde_json_lenient::to_string(info)?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}

impl SpecProvider for RegistryProvider {
    fn local_specs(&self) -> anyhow::Result<Vec<SpecInfo>> {
        let index_file = self.index_file();
        if !index_file.exists() {
            return Ok(Vec::new());
        }
        log::debug!(
            "reading cached listing of {} from {}",
            self.url,
            index_file.display()
        );
        let file = std::fs::File::open(&index_file)?;
        let reader = BufReader::new(file);

        let mut res = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let info: SpecInfoJson = match serde_json_lenient::from_str(&line) {
                Ok(info) => info,
                Err(e) => {
                    log::warn!("skipping malformed index line for {}: {}", self.url, e);
                    continue;
                }
            };
            res.push(info.into());
        }
        Ok(res)
    }

    fn remote_specs(&self) -> anyhow::Result<Vec<SpecInfo>> {
        let listing_url = self.url.join("index.json")?;
        log::debug!("fetching listing from {}", listing_url);
        let infos: Vec<SpecInfoJson> = reqwest::blocking::get(listing_url.clone())
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("failed to fetch {}", listing_url))?
            .json()
            .with_context(|| format!("malformed listing from {}", listing_url))?;

        // Refresh the on-disk cache; a failure here only loses the cache.
        if let Err(e) = self.write_index(&infos) {
            log::warn!("failed to cache listing of {}: {}", self.url, e);
        }

        Ok(infos.into_iter().map(SpecInfo::from).collect())
    }
}
