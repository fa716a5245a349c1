use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum VersionError {
    #[error("Incorrect major version: {0}")]
    IncorrectMajor(String),

    #[error("Incorrect minor version: {0}")]
    IncorrectMinor(String),

    #[error("Incorrect patch version: {0}")]
    IncorrectPatch(String),

    #[error("Incorrect snapshot year: {0}")]
    IncorrectYear(String),

    #[error("Incorrect snapshot week: {0}")]
    IncorrectWeek(String),

    #[error("Incorrect snapshot build: {0}")]
    IncorrectBuild(String),

    #[error("Missing major version")]
    MissingMajor,

    #[error("Missing minor version")]
    MissingMinor,

    #[error("Invalid snapshot format")]
    InvalidSnapshotFormat,

    #[error("Too many components")]
    ExtraComponents,

    #[error("Unrecognized version format: {0}")]
    UnknownVersionFormat(String),
}

/// Failures of the process supervisor.
#[derive(Debug, Clone, Error)]
pub enum ServerError {
    #[error("Server is already running")]
    AlreadyRunning,

    #[error("Server is not running")]
    NotRunning,

    #[error("Server jar not found: {0}")]
    ArtifactMissing(String),

    #[error("Command is empty")]
    EmptyCommand,

    #[error("Failed to launch server process: {0}")]
    SpawnFailure(String),

    #[error("Failed to access child stdout pipe")]
    NoStdoutPipe,

    #[error("Failed to access child stdin pipe")]
    NoStdinPipe,

    #[error("Failed to access child stderr pipe")]
    NoStderrPipe,

    #[error("Failed to write to stdin")]
    StdinWriteFailed,

    #[error("Failed to write eula.txt: {0}")]
    WriteEULAFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ParserError {
    #[error("Invalid log pattern: {0}")]
    InvalidPattern(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Version {0} not found in manifest")]
    VersionNotFound(String),

    #[error("Manifest has no server download for {0}")]
    NoServerDownload(String),
}

/// Everything a control operation can report back to the requester.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("Unknown player action: {0}")]
    UnknownAction(String),

    #[error("Unknown server type: {0}")]
    UnknownServerType(String),

    #[error("A download is already in progress")]
    DownloadInProgress,

    #[error("Download failed: {0}")]
    DownloadFailure(String),

    #[error("Installer failed: {0}")]
    InstallerFailure(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] VersionError),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ManifestError> for PanelError {
    fn from(err: ManifestError) -> Self {
        PanelError::DownloadFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PanelError>;
