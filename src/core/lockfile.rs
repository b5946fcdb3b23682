//! `buf.lock` encoding and decoding.
//!
//! The lock file pins every remote dependency of a workspace (the full
//! transitive closure) to a commit and digest. Legacy layouts keep one lock
//! per module directory; a `v2` workspace keeps one at its root.

use serde::{Deserialize, Serialize};

use crate::core::config::{self, ConfigError, FileVersion, BUF_LOCK};
use crate::core::module_ref::{Digest, ModuleFullName, ModuleKey};
use crate::storage::{self, ReadBucket, WriteBucket};
use crate::util::normalpath;

const HEADER: &str = "# Generated by protomod. DO NOT EDIT.\n";

/// A parsed lock file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufLockFile {
    version: FileVersion,
    deps: Vec<ModuleKey>,
}

/// A legacy (`v1beta1`/`v1`) lock entry.
#[derive(Debug, Serialize, Deserialize)]
struct LockedDepV1 {
    remote: String,
    owner: String,
    repository: String,
    commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
}

/// A `v2` lock entry.
#[derive(Debug, Serialize, Deserialize)]
struct LockedDepV2 {
    name: String,
    commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawLockV1 {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    deps: Vec<LockedDepV1>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawLockV2 {
    version: String,
    #[serde(default)]
    deps: Vec<LockedDepV2>,
}

fn parse_digest(digest: Option<&str>) -> Result<Option<Digest>, ConfigError> {
    match digest.map(str::trim) {
        None | Some("") => Ok(None),
        Some(digest) => Digest::parse(digest).map(Some),
    }
}

impl BufLockFile {
    pub fn new(version: FileVersion, deps: Vec<ModuleKey>) -> Self {
        BufLockFile { version, deps }
    }

    /// Parse a lock file. `file` names the file in error messages.
    pub fn parse(file: &str, data: &[u8]) -> Result<Self, ConfigError> {
        let value = config::parse_yaml_value(file, data)?;
        let version = FileVersion::parse(file, config::version_of(&value))?;
        let deps = match version {
            FileVersion::V1Beta1 | FileVersion::V1 => {
                let raw: RawLockV1 = config::from_yaml_value(file, value)?;
                raw.deps
                    .into_iter()
                    .map(|dep| {
                        let full_name = ModuleFullName::new(dep.remote, dep.owner, dep.repository)?;
                        Ok(ModuleKey::new(full_name, dep.commit, parse_digest(dep.digest.as_deref())?))
                    })
                    .collect::<Result<Vec<_>, ConfigError>>()?
            }
            FileVersion::V2 => {
                let raw: RawLockV2 = config::from_yaml_value(file, value)?;
                raw.deps
                    .into_iter()
                    .map(|dep| {
                        let full_name = ModuleFullName::parse(&dep.name)?;
                        Ok(ModuleKey::new(full_name, dep.commit, parse_digest(dep.digest.as_deref())?))
                    })
                    .collect::<Result<Vec<_>, ConfigError>>()?
            }
        };
        for dep in &deps {
            if dep.commit_id().is_empty() {
                return Err(ConfigError::Invalid {
                    file: file.to_string(),
                    message: format!("dependency \"{}\" has no commit", dep.full_name()),
                });
            }
        }
        Ok(BufLockFile { version, deps })
    }

    pub fn version(&self) -> FileVersion {
        self.version
    }

    /// Locked dependencies in file order.
    pub fn deps(&self) -> &[ModuleKey] {
        &self.deps
    }

    /// Encode with a header comment, entries sorted by full name.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        let mut deps: Vec<&ModuleKey> = self.deps.iter().collect();
        deps.sort_by(|a, b| a.full_name().cmp(b.full_name()));

        let yaml = match self.version {
            FileVersion::V1Beta1 | FileVersion::V1 => serde_yaml::to_string(&RawLockV1 {
                version: Some(self.version.to_string()),
                deps: deps
                    .iter()
                    .map(|key| LockedDepV1 {
                        remote: key.full_name().registry().to_string(),
                        owner: key.full_name().owner().to_string(),
                        repository: key.full_name().name().to_string(),
                        commit: key.commit_id().to_string(),
                        digest: key.digest().map(|d| d.to_string()),
                    })
                    .collect(),
            }),
            FileVersion::V2 => serde_yaml::to_string(&RawLockV2 {
                version: self.version.to_string(),
                deps: deps
                    .iter()
                    .map(|key| LockedDepV2 {
                        name: key.full_name().to_string(),
                        commit: key.commit_id().to_string(),
                        digest: key.digest().map(|d| d.to_string()),
                    })
                    .collect(),
            }),
        }
        .map_err(|source| ConfigError::Yaml {
            file: BUF_LOCK.to_string(),
            source,
        })?;

        let mut content = String::from(HEADER);
        content.push_str(&yaml);
        Ok(content.into_bytes())
    }
}

/// Read `buf.lock` from `dir` if present.
pub fn read_buf_lock(bucket: &dyn ReadBucket, dir: &str) -> Result<Option<BufLockFile>, ConfigError> {
    let path = normalpath::join(&[dir, BUF_LOCK]);
    match storage::get_if_exists(bucket, &path)? {
        Some(data) => BufLockFile::parse(&path, &data).map(Some),
        None => Ok(None),
    }
}

/// Write `buf.lock` into `dir`.
pub fn write_buf_lock(
    bucket: &dyn WriteBucket,
    dir: &str,
    lock: &BufLockFile,
) -> Result<(), ConfigError> {
    let path = normalpath::join(&[dir, BUF_LOCK]);
    bucket.put(&path, &lock.to_bytes()?)?;
    Ok(())
}
