//! Module data provider trait - how remote modules are fetched.

use anyhow::Result;

use crate::core::module_ref::ModuleKey;
use crate::storage::ReadBucketRef;

/// The contents of one remote module.
#[derive(Debug, Clone)]
pub struct ModuleData {
    key: ModuleKey,
    bucket: ReadBucketRef,
}

impl ModuleData {
    pub fn new(key: ModuleKey, bucket: ReadBucketRef) -> Self {
        ModuleData { key, bucket }
    }

    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    /// Files of the module, rooted at the module root.
    pub fn bucket(&self) -> &ReadBucketRef {
        &self.bucket
    }
}

/// A source of remote module contents.
///
/// Failures are returned as-is; retrying is up to the implementation.
pub trait ModuleDataProvider: Send + Sync {
    /// Get the provider name for display.
    fn name(&self) -> &str;

    /// Fetch the data for every key, in the order given.
    fn get_module_datas(&self, keys: &[ModuleKey]) -> Result<Vec<ModuleData>>;
}
