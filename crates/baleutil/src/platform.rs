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

//! Platform identifiers for platform-conditional dependencies and specs.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Token used for the platform-independent flavor of a package.
pub const GENERIC_PLATFORM: &str = "any";

/// A platform a spec is built for or a dependency is restricted to.
///
/// `Generic` is the platform-independent flavor; it sorts before every
/// named target so generic spec lines come first in the lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Platform {
    Generic,
    Target(String),
}

impl Platform {
    /// The platform of the current execution environment, e.g. `linux-x86_64`.
    pub fn current() -> Platform {
        Platform::Target(format!(
            "{}-{}",
            std::env::consts::OS,
            std::env::consts::ARCH
        ))
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, Platform::Generic)
    }

    /// Whether a spec built for `self` can serve a request for `target`.
    pub fn compatible_with(&self, target: &Platform) -> bool {
        self.is_generic() || self == target
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Generic => f.write_str(GENERIC_PLATFORM),
            Platform::Target(name) => f.write_str(name),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("platform token must not be empty".into());
        }
        if s == GENERIC_PLATFORM {
            Ok(Platform::Generic)
        } else {
            Ok(Platform::Target(s.to_string()))
        }
    }
}

impl Ord for Platform {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Platform::Generic, Platform::Generic) => Ordering::Equal,
            (Platform::Generic, Platform::Target(_)) => Ordering::Less,
            (Platform::Target(_), Platform::Generic) => Ordering::Greater,
            (Platform::Target(a), Platform::Target(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Platform {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generic_sorts_before_targets() {
        let mut platforms = vec![
            Platform::Target("linux-x86_64".into()),
            Platform::Generic,
            Platform::Target("macos-aarch64".into()),
        ];
        platforms.sort();
        assert_eq!(platforms[0], Platform::Generic);
        assert_eq!(platforms[1], Platform::Target("linux-x86_64".into()));
    }

    #[test]
    fn parse_round_trip() {
        for token in ["any", "linux-x86_64", "windows-x86_64"] {
            let p: Platform = token.parse().unwrap();
            assert_eq!(p.to_string(), token);
        }
        assert!("".parse::<Platform>().is_err());
    }

    #[test]
    fn generic_serves_every_target() {
        let target = Platform::Target("linux-x86_64".into());
        assert!(Platform::Generic.compatible_with(&target));
        assert!(target.compatible_with(&target));
        assert!(!target.compatible_with(&Platform::Target("macos-aarch64".into())));
    }

    #[test]
    fn current_is_a_named_target() {
        assert!(!Platform::current().is_generic());
    }
}
