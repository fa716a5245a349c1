//! Where server jars come from, per distribution.

use async_trait::async_trait;

use crate::{config::MinecraftType, error::ManifestError};

pub mod fabric;
pub mod forge;
pub mod paper;
pub mod vanilla;

/// A downloadable server artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name the download is stored under in the server directory.
    pub file_name: String,
    pub url: String,
    pub size: Option<u64>,
    /// Set when the download is an installer that must be run afterwards.
    pub installer: bool,
}

#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Versions offered by the distribution, newest first.
    async fn versions(&self, client: &reqwest::Client) -> Result<Vec<String>, ManifestError>;

    async fn resolve(
        &self,
        client: &reqwest::Client,
        version: &str,
    ) -> Result<Artifact, ManifestError>;
}

pub fn source_for(kind: MinecraftType) -> Box<dyn ArtifactSource> {
    match kind {
        MinecraftType::Vanilla => Box::new(vanilla::VanillaSource),
        MinecraftType::Paper => Box::new(paper::PaperSource),
        MinecraftType::Fabric => Box::new(fabric::FabricSource),
        MinecraftType::Forge => Box::new(forge::ForgeSource),
    }
}

pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, ManifestError> {
    let value = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<T>()
        .await?;
    Ok(value)
}
