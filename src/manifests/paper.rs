use async_trait::async_trait;
use serde::Deserialize;

use crate::{error::ManifestError, utils::is_safe_file_name};

use super::{Artifact, ArtifactSource, get_json};

const PAPER_API: &str = "https://api.papermc.io/v2/projects/paper";

#[derive(Debug, Deserialize)]
struct PaperProject {
    versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PaperBuilds {
    builds: Vec<PaperBuild>,
}

#[derive(Debug, Deserialize)]
struct PaperBuild {
    build: u32,
    downloads: PaperDownloads,
}

#[derive(Debug, Deserialize)]
struct PaperDownloads {
    application: PaperApplication,
}

#[derive(Debug, Deserialize)]
struct PaperApplication {
    name: String,
}

pub struct PaperSource;

#[async_trait]
impl ArtifactSource for PaperSource {
    async fn versions(&self, client: &reqwest::Client) -> Result<Vec<String>, ManifestError> {
        let project: PaperProject = get_json(client, PAPER_API).await?;
        Ok(project.versions.into_iter().rev().collect())
    }

    async fn resolve(
        &self,
        client: &reqwest::Client,
        version: &str,
    ) -> Result<Artifact, ManifestError> {
        let url = format!("{PAPER_API}/versions/{version}/builds");
        let builds: PaperBuilds = get_json(client, &url)
            .await
            .map_err(|_| ManifestError::VersionNotFound(version.to_string()))?;

        let latest = builds
            .builds
            .into_iter()
            .max_by_key(|b| b.build)
            .ok_or_else(|| ManifestError::NoServerDownload(version.to_string()))?;

        artifact_for(version, latest.build, latest.downloads.application.name)
    }
}

/// The download name comes from the API and becomes a path in the server
/// directory, so it must be a plain file name.
fn artifact_for(version: &str, build: u32, name: String) -> Result<Artifact, ManifestError> {
    if !is_safe_file_name(&name) {
        return Err(ManifestError::NoServerDownload(version.to_string()));
    }
    Ok(Artifact {
        url: format!("{PAPER_API}/versions/{version}/builds/{build}/downloads/{name}"),
        file_name: name,
        size: None,
        installer: false,
    })
}
