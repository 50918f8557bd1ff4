use serde::de::DeserializeOwned;
use tracing::{error, info};

use crate::models::{Case, MonetizationMethod};
use crate::source::{LoadError, SourceConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Pending,
    Ready,
    /// Load attempted and failed; the catalog stays empty for good.
    Failed,
}

/// The two read-only collections. Built once, then only queried.
#[derive(Debug, Default)]
pub struct Catalog {
    methods: Vec<MonetizationMethod>,
    cases: Vec<Case>,
    state: LoadState,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(methods: Vec<MonetizationMethod>, cases: Vec<Case>) -> Self {
        Self {
            methods,
            cases,
            state: LoadState::Ready,
        }
    }

    pub fn from_json(methods: &str, cases: &str) -> Result<Self, LoadError> {
        let methods = parse_document(methods, "monetization methods")?;
        let cases = parse_document(cases, "cases")?;
        Ok(Self::from_records(methods, cases))
    }

    /// Loads both documents the first time it is called. Later calls return
    /// the recorded state without touching the sources again, including after
    /// a failure. A failure in either document leaves both collections empty.
    pub async fn init(&mut self, config: &SourceConfig) -> LoadState {
        if self.state != LoadState::Pending {
            return self.state;
        }

        let client = reqwest::Client::new();
        match Self::load(config, &client).await {
            Ok(loaded) => {
                info!(
                    methods = loaded.methods.len(),
                    cases = loaded.cases.len(),
                    "catalog loaded"
                );
                *self = loaded;
            }
            Err(e) => {
                error!(error = %e, "Failed to load catalog data");
                self.methods.clear();
                self.cases.clear();
                self.state = LoadState::Failed;
            }
        }
        self.state
    }

    async fn load(config: &SourceConfig, client: &reqwest::Client) -> Result<Self, LoadError> {
        let (methods, cases) = tokio::try_join!(
            config.methods.read(client),
            config.cases.read(client)
        )?;
        Self::from_json(&methods, &cases)
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn methods(&self) -> &[MonetizationMethod] {
        &self.methods
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }
}

fn parse_document<T: DeserializeOwned>(raw: &str, document: &str) -> Result<Vec<T>, LoadError> {
    serde_json::from_str(raw).map_err(|source| LoadError::Parse {
        document: document.to_string(),
        source,
    })
}

#[cfg(test)]
pub(crate) const SAMPLE_METHODS: &str = include_str!("../data/monetization-methods.json");
#[cfg(test)]
pub(crate) const SAMPLE_CASES: &str = include_str!("../data/cases.json");

/// Catalog built from the bundled sample documents.
#[cfg(test)]
pub(crate) fn sample_catalog() -> Catalog {
    Catalog::from_json(SAMPLE_METHODS, SAMPLE_CASES).expect("sample data parses")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{CASES_FILE, DataSource, METHODS_FILE};
    use std::fs;

    fn write_sample(dir: &std::path::Path) {
        fs::write(dir.join(METHODS_FILE), SAMPLE_METHODS).unwrap();
        fs::write(dir.join(CASES_FILE), SAMPLE_CASES).unwrap();
    }

    #[test]
    fn test_sample_catalog_parses() {
        let catalog = sample_catalog();
        assert_eq!(catalog.methods().len(), 9);
        assert_eq!(catalog.cases().len(), 7);
        assert_eq!(catalog.state(), LoadState::Ready);
    }

    #[test]
    fn test_new_catalog_is_pending_and_empty() {
        let catalog = Catalog::new();
        assert_eq!(catalog.state(), LoadState::Pending);
        assert!(catalog.methods().is_empty());
        assert!(catalog.cases().is_empty());
    }

    #[tokio::test]
    async fn test_init_loads_both_documents() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path());

        let mut catalog = Catalog::new();
        let state = catalog.init(&SourceConfig::in_dir(dir.path())).await;

        assert_eq!(state, LoadState::Ready);
        assert_eq!(catalog.methods().len(), 9);
        assert_eq!(catalog.cases().len(), 7);
    }

    #[tokio::test]
    async fn test_init_missing_cases_leaves_both_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(METHODS_FILE), SAMPLE_METHODS).unwrap();

        let mut catalog = Catalog::new();
        let state = catalog.init(&SourceConfig::in_dir(dir.path())).await;

        assert_eq!(state, LoadState::Failed);
        assert!(catalog.methods().is_empty());
        assert!(catalog.cases().is_empty());
    }

    #[tokio::test]
    async fn test_init_bad_methods_json_leaves_both_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(METHODS_FILE), "{ not json").unwrap();
        fs::write(dir.path().join(CASES_FILE), SAMPLE_CASES).unwrap();

        let mut catalog = Catalog::new();
        assert_eq!(catalog.init(&SourceConfig::in_dir(dir.path())).await, LoadState::Failed);
        assert!(catalog.cases().is_empty());
    }

    #[tokio::test]
    async fn test_init_does_not_retry_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = SourceConfig::in_dir(dir.path());

        let mut catalog = Catalog::new();
        assert_eq!(catalog.init(&config).await, LoadState::Failed);

        write_sample(dir.path());
        assert_eq!(catalog.init(&config).await, LoadState::Failed);
        assert!(catalog.methods().is_empty());
    }

    #[tokio::test]
    async fn test_init_is_noop_once_ready() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path());
        let mut catalog = Catalog::new();
        catalog.init(&SourceConfig::in_dir(dir.path())).await;

        let elsewhere = SourceConfig {
            methods: DataSource::File(dir.path().join("missing-a.json")),
            cases: DataSource::File(dir.path().join("missing-b.json")),
        };
        assert_eq!(catalog.init(&elsewhere).await, LoadState::Ready);
        assert_eq!(catalog.cases().len(), 7);
    }
}
