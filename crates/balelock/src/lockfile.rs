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

//! The `bale.lock` format: a byte-stable text rendering of a resolution,
//! and the parser that brings one back.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use baleutil::dependency::DependencyInfo;
use baleutil::platform::Platform;
use indexmap::IndexMap;
use semver::{Version, VersionReq};
use url::Url;

use crate::dependency::Dependency;
use crate::source::{Source, SourceKind, SpecInfo};
use crate::spec::{Spec, SpecSet};

pub const BALE_LOCKFILE: &str = "bale.lock";

#[derive(Debug, thiserror::Error)]
pub enum LockfileError {
    #[error("failed to read lockfile at {path}")]
    Io {
        path: Box<Path>,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed lockfile at line {line}: {msg}")]
    Malformed { line: usize, msg: String },
}

/// The parsed contents of a `bale.lock`.
///
/// Sources come back identity-only: they carry no provider and list nothing
/// until the convergence step swaps in their live counterparts.
#[derive(Debug)]
pub struct Lockfile {
    pub sources: Vec<Rc<Source>>,
    pub specs: SpecSet,
    pub platforms: Vec<Platform>,
    pub dependencies: Vec<Dependency>,
}

pub fn read_lockfile(path: &Path) -> Result<Lockfile, LockfileError> {
    let content = std::fs::read_to_string(path).map_err(|e| LockfileError::Io {
        path: path.into(),
        source: e,
    })?;
    Lockfile::parse(&content)
}

enum Section {
    None,
    Source,
    Platforms,
    Dependencies,
}

struct SourceBlock {
    default: bool,
    kind: Option<SourceKind>,
    specs: Vec<SpecInfo>,
}

impl Lockfile {
    pub fn parse(content: &str) -> Result<Lockfile, LockfileError> {
        // platform tokens up front; spec-line splits below need them to tell
        // a platform suffix apart from a pre-release tag
        let mut known_platforms: HashSet<String> = HashSet::new();
        let mut in_platforms = false;
        for raw in content.lines() {
            if !raw.starts_with(' ') && !raw.trim().is_empty() {
                in_platforms = raw == "PLATFORMS";
            } else if in_platforms {
                if let Some(token) = raw.strip_prefix("  ") {
                    known_platforms.insert(token.to_string());
                }
            }
        }

        let mut section = Section::None;
        let mut blocks: Vec<SourceBlock> = Vec::new();
        let mut platforms: Vec<Platform> = Vec::new();
        // (name, req, pinned) until sources are known
        let mut deps: Vec<(String, VersionReq, bool)> = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let lineno = idx + 1;
            let malformed = |msg: &str| LockfileError::Malformed {
                line: lineno,
                msg: msg.to_string(),
            };
            if raw.trim().is_empty() {
                continue;
            }
            if !raw.starts_with(' ') {
                section = match raw {
                    "REGISTRY" | "PATH" => {
                        blocks.push(SourceBlock {
                            default: raw == "REGISTRY",
                            kind: None,
                            specs: Vec::new(),
                        });
                        Section::Source
                    }
                    "PLATFORMS" => Section::Platforms,
                    "DEPENDENCIES" => Section::Dependencies,
                    _ => return Err(malformed("unknown section header")),
                };
                continue;
            }

            if let Some(line) = raw.strip_prefix("      ") {
                if !matches!(section, Section::Source) {
                    return Err(malformed("bad indentation"));
                }
                let block = blocks.last_mut().ok_or_else(|| malformed("indented line outside a source block"))?;
                let spec = block
                    .specs
                    .last_mut()
                    .ok_or_else(|| malformed("sub-dependency with no spec line"))?;
                let (name, req, pinned) = parse_dep_line(line).map_err(|msg| malformed(&msg))?;
                if pinned {
                    return Err(malformed("source pin is not allowed on a spec dependency"));
                }
                spec.deps.insert(name, DependencyInfo::from_simple(req));
            } else if let Some(line) = raw.strip_prefix("    ") {
                if !matches!(section, Section::Source) {
                    return Err(malformed("bad indentation"));
                }
                let block = blocks.last_mut().ok_or_else(|| malformed("spec line outside a source block"))?;
                let (name, version, platform) =
                    parse_spec_line(line, &known_platforms).map_err(|msg| malformed(&msg))?;
                block.specs.push(SpecInfo {
                    name,
                    version,
                    platform,
                    deps: IndexMap::new(),
                });
            } else if let Some(line) = raw.strip_prefix("  ") {
                match section {
                    Section::Source => {
                        let block = blocks.last_mut().ok_or_else(|| malformed("field outside a source block"))?;
                        if let Some(remote) = line.strip_prefix("remote: ") {
                            let url = Url::parse(remote)
                                .map_err(|e| malformed(&format!("bad remote url: {}", e)))?;
                            block.kind = Some(SourceKind::Registry(url));
                        } else if let Some(path) = line.strip_prefix("path: ") {
                            block.kind = Some(SourceKind::Path(PathBuf::from(path)));
                        } else if line != "specs:" {
                            return Err(malformed("unknown source field"));
                        }
                    }
                    Section::Platforms => {
                        let platform = line
                            .parse::<Platform>()
                            .map_err(|e| malformed(&e.to_string()))?;
                        platforms.push(platform);
                    }
                    Section::Dependencies => {
                        let (name, req, pinned) =
                            parse_dep_line(line).map_err(|msg| malformed(&msg))?;
                        deps.push((name, req, pinned));
                    }
                    Section::None => return Err(malformed("indented line before any section")),
                }
            } else {
                return Err(malformed("bad indentation"));
            }
        }

        let mut sources: Vec<Rc<Source>> = Vec::new();
        let mut specs: Vec<Rc<Spec>> = Vec::new();
        // name sets per source, for rebinding pinned dependencies
        let mut origins: Vec<HashSet<String>> = Vec::new();
        for (pos, block) in blocks.into_iter().enumerate() {
            let kind = block.kind.ok_or_else(|| LockfileError::Malformed {
                line: 0,
                msg: format!(
                    "source block {} is missing its {} line",
                    pos + 1,
                    if block.default { "remote:" } else { "path:" }
                ),
            })?;
            let source = Source::inert(kind);
            origins.push(block.specs.iter().map(|s| s.name.clone()).collect());
            for info in &block.specs {
                specs.push(Rc::new(Spec::from_info(info, source.clone())));
            }
            sources.push(source);
        }

        let mut dependencies = Vec::new();
        for (name, req, pinned) in deps {
            let mut dep = Dependency::new(name, req);
            if pinned {
                let origin = origins
                    .iter()
                    .position(|names| names.contains(&dep.name))
                    .map(|i| sources[i].clone());
                // a pin whose source lists nothing stays unbound; convergence
                // will reject it against the live sources if it is still wrong
                dep.source = origin;
            }
            dependencies.push(dep);
        }

        Ok(Lockfile {
            sources,
            specs: SpecSet::new(specs),
            platforms,
            dependencies,
        })
    }

    /// Render a resolution to the stable on-disk form. Equal inputs produce
    /// byte-equal output regardless of the order anything was discovered in.
    pub fn render(
        sources: &[Rc<Source>],
        resolution: &SpecSet,
        platforms: &[Platform],
        dependencies: &[Dependency],
    ) -> String {
        let mut ordered: Vec<&Rc<Source>> = sources.iter().collect();
        ordered.sort_by_key(|s| (s.kind().is_default(), s.kind().to_string()));

        let mut blocks: Vec<String> = Vec::new();
        for source in ordered {
            let mut block = source.to_lock();
            let mut specs: Vec<&Rc<Spec>> = resolution
                .iter()
                .filter(|sp| sp.source.kind() == source.kind())
                .collect();
            specs.sort_by(|a, b| {
                a.name
                    .cmp(&b.name)
                    .then_with(|| a.version.cmp(&b.version))
                    .then_with(|| a.platform.cmp(&b.platform))
            });
            for spec in specs {
                block.push_str(&spec.to_lock());
            }
            blocks.push(block);
        }

        // plain lexicographic order over the rendered tokens
        let mut plats: Vec<String> = platforms.iter().map(|p| p.to_string()).collect();
        plats.sort_unstable();
        plats.dedup();
        let mut block = String::from("PLATFORMS\n");
        for platform in plats {
            block.push_str(&format!("  {}\n", platform));
        }
        blocks.push(block);

        let mut deps: Vec<&Dependency> = dependencies.iter().collect();
        deps.sort_by_key(|d| d.name.as_str());
        let mut block = String::from("DEPENDENCIES\n");
        for dep in deps {
            block.push_str(&dep.to_lock());
        }
        blocks.push(block);

        blocks.join("\n")
    }
}

/// `name` or `name (req)`, with an optional trailing `!` source pin.
fn parse_dep_line(line: &str) -> Result<(String, VersionReq, bool), String> {
    let (line, pinned) = match line.strip_suffix('!') {
        Some(rest) => (rest, true),
        None => (line, false),
    };
    match line.split_once(" (") {
        Some((name, rest)) => {
            let req = rest
                .strip_suffix(')')
                .ok_or_else(|| format!("unclosed requirement in `{}`", line))?;
            let req = VersionReq::parse(req).map_err(|e| format!("bad requirement: {}", e))?;
            Ok((name.to_string(), req, pinned))
        }
        None => {
            if line.contains(' ') {
                return Err(format!("unexpected space in package name `{}`", line));
            }
            Ok((line.to_string(), VersionReq::STAR, pinned))
        }
    }
}

/// `name (version)` or `name (version-platform)`.
///
/// Versions may themselves contain `-` (pre-releases), and a pre-release tag
/// can even be a valid platform-looking token, so the split is decided against
/// the platforms the lockfile declares: the longest `-` suffix that is a
/// declared platform wins, provided the prefix parses as a full version. A
/// token with no declared-platform suffix is a bare version; failing that, the
/// first `-` whose prefix parses as a version marks an undeclared platform.
fn parse_spec_line(
    line: &str,
    known_platforms: &HashSet<String>,
) -> Result<(String, Version, Platform), String> {
    let (name, rest) = line
        .split_once(" (")
        .ok_or_else(|| format!("spec line `{}` has no version", line))?;
    let inner = rest
        .strip_suffix(')')
        .ok_or_else(|| format!("unclosed version in `{}`", line))?;
    for (pos, ch) in inner.char_indices() {
        if ch != '-' || !known_platforms.contains(&inner[pos + 1..]) {
            continue;
        }
        if let Ok(version) = Version::parse(&inner[..pos]) {
            let platform = inner[pos + 1..]
                .parse::<Platform>()
                .map_err(|e| e.to_string())?;
            return Ok((name.to_string(), version, platform));
        }
    }
    if let Ok(version) = Version::parse(inner) {
        return Ok((name.to_string(), version, Platform::Generic));
    }
    for (pos, ch) in inner.char_indices() {
        if ch != '-' {
            continue;
        }
        if let Ok(version) = Version::parse(&inner[..pos]) {
            let platform = inner[pos + 1..]
                .parse::<Platform>()
                .map_err(|e| e.to_string())?;
            return Ok((name.to_string(), version, platform));
        }
    }
    Err(format!("cannot parse version in `{}`", line))
}
