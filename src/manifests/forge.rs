use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde::Deserialize;

use crate::{config::MinecraftVersion, error::ManifestError};

use super::{Artifact, ArtifactSource, get_json};

const FORGE_PROMOTIONS: &str =
    "https://files.minecraftforge.net/net/minecraftforge/forge/promotions_slim.json";
const FORGE_MAVEN: &str = "https://maven.minecraftforge.net/net/minecraftforge/forge";

#[derive(Debug, Deserialize)]
struct ForgePromotions {
    promos: HashMap<String, String>,
}

impl ForgePromotions {
    /// Recommended build for `mc`, falling back to the latest one.
    fn build_for(&self, mc: &str) -> Option<&String> {
        self.promos
            .get(&format!("{mc}-recommended"))
            .or_else(|| self.promos.get(&format!("{mc}-latest")))
    }

    fn game_versions(&self) -> Vec<String> {
        let unique: BTreeSet<&str> = self
            .promos
            .keys()
            .filter_map(|k| k.rsplit_once('-').map(|(mc, _)| mc))
            .collect();

        let mut versions: Vec<String> = unique.into_iter().map(str::to_string).collect();
        versions.sort_by_key(|v| std::cmp::Reverse(sort_key(v)));
        versions
    }
}

fn sort_key(version: &str) -> (u32, u32, u32) {
    match version.parse::<MinecraftVersion>() {
        Ok(MinecraftVersion::Release(v)) => (v.major, v.minor, v.patch.unwrap_or(0)),
        _ => (0, 0, 0),
    }
}

/// Forge ships an installer; running it with `--installServer` produces the
/// actual server jar.
pub struct ForgeSource;

#[async_trait]
impl ArtifactSource for ForgeSource {
    async fn versions(&self, client: &reqwest::Client) -> Result<Vec<String>, ManifestError> {
        let promotions: ForgePromotions = get_json(client, FORGE_PROMOTIONS).await?;
        Ok(promotions.game_versions())
    }

    async fn resolve(
        &self,
        client: &reqwest::Client,
        version: &str,
    ) -> Result<Artifact, ManifestError> {
        let promotions: ForgePromotions = get_json(client, FORGE_PROMOTIONS).await?;
        let build = promotions
            .build_for(version)
            .ok_or_else(|| ManifestError::VersionNotFound(version.to_string()))?;

        let full = format!("{version}-{build}");
        Ok(Artifact {
            file_name: format!("forge-{full}-installer.jar"),
            url: format!("{FORGE_MAVEN}/{full}/forge-{full}-installer.jar"),
            size: None,
            installer: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promotions() -> ForgePromotions {
        serde_json::from_str(
            r#"{"homepage":"h","promos":{
                "1.20.1-latest":"47.3.5","1.20.1-recommended":"47.3.0",
                "1.21.1-latest":"52.0.1","1.8.9-recommended":"11.15.1.2318"}}"#,
        )
        .unwrap()
    }

    #[test]
    fn recommended_build_wins_over_latest() {
        let p = promotions();
        assert_eq!(p.build_for("1.20.1").map(String::as_str), Some("47.3.0"));
        assert_eq!(p.build_for("1.21.1").map(String::as_str), Some("52.0.1"));
        assert_eq!(p.build_for("1.0"), None);
    }

    #[test]
    fn game_versions_are_newest_first() {
        assert_eq!(promotions().game_versions(), vec!["1.21.1", "1.20.1", "1.8.9"]);
    }
}
