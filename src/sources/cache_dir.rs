//! Remote modules read from a local cache directory.
//!
//! Layout: `<cache>/<registry>/<owner>/<name>/<commit>/` holds the files of
//! one module commit, exactly as they appear at the module root.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use anyhow::{bail, Result};
use directories::ProjectDirs;

use crate::core::module_ref::ModuleKey;
use crate::sources::provider::{ModuleData, ModuleDataProvider};
use crate::storage::OsBucket;

/// Project directories for protomod
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("build", "protomod", "protomod"));

/// The default module cache directory, if the platform has one.
pub fn default_cache_dir() -> Option<PathBuf> {
    PROJECT_DIRS
        .as_ref()
        .map(|dirs| dirs.cache_dir().join("modules"))
}

/// Reads module commits from a cache directory.
#[derive(Debug, Clone)]
pub struct CacheDirProvider {
    root: PathBuf,
}

impl CacheDirProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CacheDirProvider { root: root.into() }
    }

    /// Get the cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the files of `key`.
    pub fn module_dir(&self, key: &ModuleKey) -> PathBuf {
        let name = key.full_name();
        self.root
            .join(name.registry())
            .join(name.owner())
            .join(name.name())
            .join(key.commit_id())
    }
}

impl ModuleDataProvider for CacheDirProvider {
    fn name(&self) -> &str {
        "cache"
    }

    fn get_module_datas(&self, keys: &[ModuleKey]) -> Result<Vec<ModuleData>> {
        let mut datas = Vec::with_capacity(keys.len());
        for key in keys {
            let dir = self.module_dir(key);
            if !dir.is_dir() {
                bail!(
                    "module {} is not in the cache at {}",
                    key,
                    dir.display()
                );
            }
            tracing::debug!("reading {} from {}", key, dir.display());
            datas.push(ModuleData::new(key.clone(), Arc::new(OsBucket::new(dir))));
        }
        Ok(datas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::module_ref::ModuleFullName;
    use crate::storage::all_paths;
    use tempfile::TempDir;

    #[test]
    fn test_reads_cached_module() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("buf.build/acme/money/abc123/acme/money/v1");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("money.proto"), "syntax = \"proto3\";").unwrap();

        let provider = CacheDirProvider::new(tmp.path());
        let key = ModuleKey::new(ModuleFullName::parse("buf.build/acme/money").unwrap(), "abc123", None);
        let datas = provider.get_module_datas(&[key]).unwrap();

        assert_eq!(datas.len(), 1);
        assert_eq!(
            all_paths(datas[0].bucket().as_ref(), ".").unwrap(),
            vec!["acme/money/v1/money.proto"]
        );
    }

    #[test]
    fn test_missing_module_is_error() {
        let tmp = TempDir::new().unwrap();
        let provider = CacheDirProvider::new(tmp.path());
        let key = ModuleKey::new(ModuleFullName::parse("buf.build/acme/money").unwrap(), "abc123", None);
        let err = provider.get_module_datas(&[key]).unwrap_err();
        assert!(err.to_string().contains("is not in the cache"));
    }
}
