//! In-memory module provider.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::core::module_ref::{ModuleFullName, ModuleKey};
use crate::sources::provider::{ModuleData, ModuleDataProvider};
use crate::storage::{MemBucket, ReadBucketRef};

/// Serves modules held in memory, keyed by full name and commit.
#[derive(Debug, Default)]
pub struct MemProvider {
    modules: HashMap<(ModuleFullName, String), ReadBucketRef>,
}

impl MemProvider {
    pub fn new() -> Self {
        MemProvider::default()
    }

    /// Register the files of a module commit.
    pub fn add_module<I, P, C>(&mut self, full_name: &str, commit: &str, files: I) -> Result<()>
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<Vec<u8>>,
    {
        let full_name = ModuleFullName::parse(full_name)?;
        self.modules.insert(
            (full_name, commit.to_string()),
            Arc::new(MemBucket::from_files(files)),
        );
        Ok(())
    }
}

impl ModuleDataProvider for MemProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_module_datas(&self, keys: &[ModuleKey]) -> Result<Vec<ModuleData>> {
        keys.iter()
            .map(|key| {
                self.modules
                    .get(&(key.full_name().clone(), key.commit_id().to_string()))
                    .map(|bucket| ModuleData::new(key.clone(), bucket.clone()))
                    .ok_or_else(|| anyhow!("module {} not found", key))
            })
            .collect()
    }
}
