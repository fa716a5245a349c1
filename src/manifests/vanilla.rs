use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ManifestError;

use super::{Artifact, ArtifactSource, get_json};

pub const VANILLA_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

#[derive(Debug, Clone, Deserialize)]
pub struct VanillaManifestV2 {
    pub latest: VanillaLatest,
    pub versions: Vec<VanillaManifestV2Version>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VanillaLatest {
    pub release: String,
    pub snapshot: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VanillaManifestV2Version {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VanillaReleaseManifest {
    pub downloads: VanillaDownloads,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VanillaDownloads {
    pub server: Option<VanillaDownload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VanillaDownload {
    pub url: String,
    pub size: Option<u64>,
}

impl VanillaManifestV2 {
    pub async fn load(client: &reqwest::Client) -> Result<Self, ManifestError> {
        get_json(client, VANILLA_MANIFEST_URL).await
    }

    pub fn find(&self, id: &str) -> Option<&VanillaManifestV2Version> {
        self.versions.iter().find(|v| v.id == id)
    }
}

impl VanillaReleaseManifest {
    pub async fn load(
        client: &reqwest::Client,
        version: &VanillaManifestV2Version,
    ) -> Result<Self, ManifestError> {
        get_json(client, &version.url).await
    }
}

pub struct VanillaSource;

#[async_trait]
impl ArtifactSource for VanillaSource {
    async fn versions(&self, client: &reqwest::Client) -> Result<Vec<String>, ManifestError> {
        let manifest = VanillaManifestV2::load(client).await?;
        Ok(manifest
            .versions
            .into_iter()
            .filter(|v| v.kind == "release")
            .map(|v| v.id)
            .collect())
    }

    async fn resolve(
        &self,
        client: &reqwest::Client,
        version: &str,
    ) -> Result<Artifact, ManifestError> {
        let manifest = VanillaManifestV2::load(client).await?;
        let entry = manifest
            .find(version)
            .ok_or_else(|| ManifestError::VersionNotFound(version.to_string()))?;

        let release = VanillaReleaseManifest::load(client, entry).await?;
        let server = release
            .downloads
            .server
            .ok_or_else(|| ManifestError::NoServerDownload(version.to_string()))?;

        Ok(Artifact {
            file_name: format!("minecraft_server.{version}.jar"),
            url: server.url,
            size: server.size,
            installer: false,
        })
    }
}
