use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ManifestError;

use super::{Artifact, ArtifactSource, get_json};

const FABRIC_META: &str = "https://meta.fabricmc.net/v2/versions";

#[derive(Debug, Deserialize)]
struct FabricVersion {
    version: String,
    stable: bool,
}

#[derive(Debug, Deserialize)]
struct FabricLoaderEntry {
    loader: FabricVersion,
}

pub struct FabricSource;

fn pick_stable(versions: Vec<FabricVersion>) -> Option<String> {
    let fallback = versions.first().map(|v| v.version.clone());
    versions
        .into_iter()
        .find(|v| v.stable)
        .map(|v| v.version)
        .or(fallback)
}

#[async_trait]
impl ArtifactSource for FabricSource {
    async fn versions(&self, client: &reqwest::Client) -> Result<Vec<String>, ManifestError> {
        let games: Vec<FabricVersion> = get_json(client, &format!("{FABRIC_META}/game")).await?;
        Ok(games
            .into_iter()
            .filter(|g| g.stable)
            .map(|g| g.version)
            .collect())
    }

    async fn resolve(
        &self,
        client: &reqwest::Client,
        version: &str,
    ) -> Result<Artifact, ManifestError> {
        let loaders: Vec<FabricLoaderEntry> =
            get_json(client, &format!("{FABRIC_META}/loader/{version}")).await?;
        let loader = pick_stable(loaders.into_iter().map(|l| l.loader).collect())
            .ok_or_else(|| ManifestError::VersionNotFound(version.to_string()))?;

        let installers: Vec<FabricVersion> =
            get_json(client, &format!("{FABRIC_META}/installer")).await?;
        let installer = pick_stable(installers)
            .ok_or_else(|| ManifestError::NoServerDownload(version.to_string()))?;

        Ok(Artifact {
            file_name: format!(
                "fabric-server-mc.{version}-loader.{loader}-launcher.{installer}.jar"
            ),
            url: format!("{FABRIC_META}/loader/{version}/{loader}/{installer}/server/jar"),
            size: None,
            installer: false,
        })
    }
}
