//! Per-invocation settings shared by the CLI commands.
//!
//! Holds the directory that inputs are resolved against, where remote
//! modules are cached, and how output is rendered.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::sources::{default_cache_dir, CacheDirProvider};
use crate::storage::OsBucket;

#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Bucket root; every input path is relative to it
    cwd: PathBuf,
    /// Overrides the platform cache directory
    cache_dir: Option<PathBuf>,
    verbose: bool,
    color: bool,
}

impl GlobalContext {
    /// Rooted at the process working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("could not read the working directory")?;
        Ok(Self::rooted_at(cwd))
    }

    /// Rooted at `cwd`, which may be relative to the process working
    /// directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        if !cwd.is_dir() {
            anyhow::bail!("{} is not a directory", cwd.display());
        }
        Ok(Self::rooted_at(cwd))
    }

    fn rooted_at(cwd: PathBuf) -> Self {
        GlobalContext {
            cwd,
            cache_dir: None,
            verbose: false,
            color: true,
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: Option<PathBuf>) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// The explicit cache directory, else the platform one.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_cache_dir().context("could not determine a cache directory; pass --cache-dir"),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn color(&self) -> bool {
        self.color
    }

    pub fn bucket(&self) -> Arc<OsBucket> {
        Arc::new(OsBucket::new(self.cwd.clone()))
    }

    /// Remote modules come from the cache directory.
    pub fn provider(&self) -> Result<CacheDirProvider> {
        let cache_dir = self.cache_dir()?;
        tracing::debug!("module cache at {}", cache_dir.display());
        Ok(CacheDirProvider::new(cache_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let ctx = GlobalContext::new().unwrap();
        assert!(ctx.cwd().is_absolute());
        assert!(ctx.color());
        assert!(!ctx.is_verbose());
    }

    #[test]
    fn test_explicit_cache_dir() {
        let root = TempDir::new().unwrap();
        let cache = root.path().join("cache");
        let ctx = GlobalContext::with_cwd(root.path().to_path_buf())
            .unwrap()
            .with_cache_dir(Some(cache.clone()));

        assert_eq!(ctx.cache_dir().unwrap(), cache);
        assert_eq!(ctx.provider().unwrap().root(), cache);
        assert_eq!(ctx.bucket().root(), root.path());
    }

    #[test]
    fn test_missing_root_rejected() {
        let root = TempDir::new().unwrap();
        let err = GlobalContext::with_cwd(root.path().join("missing")).unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }
}
