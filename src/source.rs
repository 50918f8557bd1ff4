use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

pub const METHODS_FILE: &str = "monetization-methods.json";
pub const CASES_FILE: &str = "cases.json";

/// Where one of the two catalog documents is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            DataSource::Url(raw.to_string())
        } else {
            DataSource::File(PathBuf::from(raw))
        }
    }

    pub async fn read(&self, client: &reqwest::Client) -> Result<String, LoadError> {
        debug!(source = %self, "reading catalog document");
        match self {
            DataSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|source| LoadError::Read { path: path.clone(), source }),
            DataSource::Url(url) => {
                let response = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|source| LoadError::Fetch { url: url.clone(), source })?;
                let status = response.status();
                if !status.is_success() {
                    return Err(LoadError::Status { url: url.clone(), status: status.as_u16() });
                }
                response
                    .text()
                    .await
                    .map_err(|source| LoadError::Fetch { url: url.clone(), source })
            }
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => write!(f, "{}", url),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        source: reqwest::Error,
    },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse {document}: {source}")]
    Parse {
        document: String,
        source: serde_json::Error,
    },
}

/// The pair of documents a catalog is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub methods: DataSource,
    pub cases: DataSource,
}

impl SourceConfig {
    /// Explicit sources win; anything unset falls back to the standard file
    /// names inside `data_dir`, or the platform data directory.
    pub fn resolve(data_dir: Option<&Path>, methods: Option<&str>, cases: Option<&str>) -> Self {
        let dir = data_dir.map(Path::to_path_buf).unwrap_or_else(Self::default_dir);
        let base = Self::in_dir(&dir);
        Self {
            methods: methods.map(DataSource::parse).unwrap_or(base.methods),
            cases: cases.map(DataSource::parse).unwrap_or(base.cases),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self {
            methods: DataSource::File(dir.join(METHODS_FILE)),
            cases: DataSource::File(dir.join(CASES_FILE)),
        }
    }

    fn default_dir() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "atlas") {
            proj_dirs.data_dir().to_path_buf()
        } else {
            PathBuf::from("data")
        }
    }
}
