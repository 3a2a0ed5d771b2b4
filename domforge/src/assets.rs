use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::EngineError;

/// Source of UI panel markup.
///
/// Fetches run on a background thread, so implementations must be shareable across threads.
pub trait ContentFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, EngineError>;
}

/// Loads markup from files under an asset root.
#[derive(Clone, Debug)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ContentFetcher for FileFetcher {
    fn fetch(&self, url: &str) -> Result<String, EngineError> {
        let path = self.root.join(url.trim_start_matches('/'));
        std::fs::read_to_string(&path).map_err(|e| EngineError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// In-memory markup, keyed by URL. Useful for embedded templates.
#[derive(Clone, Debug, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, markup: impl Into<String>) -> Self {
        self.pages.insert(url.into(), markup.into());
        self
    }
}

impl ContentFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<String, EngineError> {
        self.pages.get(url).cloned().ok_or_else(|| EngineError::Fetch {
            url: url.to_string(),
            reason: "not found".to_string(),
        })
    }
}
