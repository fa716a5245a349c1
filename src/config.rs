use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::VersionError;

pub mod panel;
pub mod properties;
pub mod stream;

pub use panel::{PanelConfig, PanelConfigUpdate};
pub use stream::{LogEntry, LogKind, StreamLine, StreamSource};

/// Server distribution the panel knows how to download and run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MinecraftType {
    #[default]
    Vanilla,
    Paper,
    Fabric,
    Forge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub year: u32,
    pub week: u32,
    pub build: char,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinecraftVersion {
    Release(Version),
    Snapshot(Snapshot),
}

impl Display for MinecraftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MinecraftType::Vanilla => write!(f, "vanilla"),
            MinecraftType::Paper => write!(f, "paper"),
            MinecraftType::Fabric => write!(f, "fabric"),
            MinecraftType::Forge => write!(f, "forge"),
        }
    }
}

impl FromStr for MinecraftType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vanilla" => Ok(MinecraftType::Vanilla),
            "paper" => Ok(MinecraftType::Paper),
            "fabric" => Ok(MinecraftType::Fabric),
            "forge" => Ok(MinecraftType::Forge),
            other => Err(other.to_string()),
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.patch {
            Some(patch) => write!(f, "{}.{}.{}", self.major, self.minor, patch),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}w{:02}{}", self.year, self.week, self.build)
    }
}

impl Display for MinecraftVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MinecraftVersion::Release(ver) => ver.fmt(f),
            MinecraftVersion::Snapshot(snap) => snap.fmt(f),
        }
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut split = s.split('.');

        let major_str = split
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(VersionError::MissingMajor)?;
        let minor_str = split.next().ok_or(VersionError::MissingMinor)?;
        let patch_str = split.next();

        if split.next().is_some() {
            return Err(VersionError::ExtraComponents);
        }

        let major = major_str
            .parse::<u32>()
            .map_err(|_| VersionError::IncorrectMajor(major_str.to_string()))?;

        let minor = minor_str
            .parse::<u32>()
            .map_err(|_| VersionError::IncorrectMinor(minor_str.to_string()))?;

        let patch = match patch_str {
            Some(p) => Some(
                p.parse::<u32>()
                    .map_err(|_| VersionError::IncorrectPatch(p.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

impl FromStr for Snapshot {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year_str, rest) = s
            .split_once('w')
            .ok_or(VersionError::InvalidSnapshotFormat)?;

        if rest.len() != 3 || !rest.is_ascii() {
            return Err(VersionError::InvalidSnapshotFormat);
        }

        let week_str = &rest[..2];
        let build_str = &rest[2..];

        let year = year_str
            .parse::<u32>()
            .map_err(|_| VersionError::IncorrectYear(year_str.to_string()))?;

        let week = week_str
            .parse::<u32>()
            .map_err(|_| VersionError::IncorrectWeek(week_str.to_string()))?;

        let build = match build_str.chars().next() {
            Some(c) if c.is_ascii_lowercase() => c,
            _ => return Err(VersionError::IncorrectBuild(build_str.to_string())),
        };

        Ok(Self { year, week, build })
    }
}

impl FromStr for MinecraftVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(ver) = Version::from_str(s) {
            return Ok(MinecraftVersion::Release(ver));
        }

        if let Ok(snap) = Snapshot::from_str(s) {
            return Ok(MinecraftVersion::Snapshot(snap));
        }

        Err(VersionError::UnknownVersionFormat(s.to_string()))
    }
}
