//! `buf.yaml` and `buf.work.yaml` schemas.
//!
//! Files are deserialized into raw serde structs and then validated into
//! the types the resolver works with. Three `buf.yaml` generations exist:
//!
//! - `v1beta1`: one module per file, with source `build.roots`
//! - `v1`: one module per file, rooted at the file's directory
//! - `v2`: any number of modules declared under `modules`
//!
//! A `buf.work.yaml` (always `v1`) lists the directories of a multi-module
//! workspace, each of which carries its own `v1beta1`/`v1` `buf.yaml`.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::module_ref::{ModuleFullName, ModuleRef};
use crate::storage::{self, ReadBucket, StorageError};
use crate::util::normalpath::{self, NormalPathError};

/// Module or workspace configuration file.
pub const BUF_YAML: &str = "buf.yaml";

/// Multi-module workspace file.
pub const BUF_WORK_YAML: &str = "buf.work.yaml";

/// Dependency lock file.
pub const BUF_LOCK: &str = "buf.lock";

/// Documentation file names, most preferred first.
pub const DOC_FILE_NAMES: [&str; 3] = ["buf.md", "README.md", "README.markdown"];

/// License file name.
pub const LICENSE_FILE_NAME: &str = "LICENSE";

/// Errors from reading configuration and lock files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse {file}: {source}")]
    Yaml {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{file}: unknown version `{version}`")]
    UnknownVersion { file: String, version: String },

    #[error("{file}: version `{version}` is not supported here, expected {expected}")]
    UnsupportedVersion {
        file: String,
        version: String,
        expected: String,
    },

    #[error("{file}: {message}")]
    Invalid { file: String, message: String },

    #[error("{file}: `{field}` paths \"{first}\" and \"{second}\" overlap")]
    OverlappingPaths {
        file: String,
        field: &'static str,
        first: String,
        second: String,
    },

    #[error("{file}: invalid path in `{field}`: {source}")]
    InvalidPath {
        file: String,
        field: &'static str,
        #[source]
        source: NormalPathError,
    },

    #[error("invalid module name \"{value}\": {reason}")]
    InvalidModuleName { value: String, reason: String },

    #[error("invalid module reference \"{value}\": {reason}")]
    InvalidModuleRef { value: String, reason: String },

    #[error("invalid digest \"{value}\": expected kind:hex")]
    InvalidDigest { value: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ConfigError {
    fn invalid(file: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            file: file.to_string(),
            message: message.into(),
        }
    }
}

/// Configuration file generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FileVersion {
    #[serde(rename = "v1beta1")]
    V1Beta1,
    #[serde(rename = "v1")]
    V1,
    #[serde(rename = "v2")]
    V2,
}

impl FileVersion {
    /// Parse a `version:` value. A missing version is `v1beta1`.
    pub fn parse(file: &str, version: Option<&str>) -> Result<Self, ConfigError> {
        match version.map(str::trim) {
            None | Some("") | Some("v1beta1") => Ok(FileVersion::V1Beta1),
            Some("v1") => Ok(FileVersion::V1),
            Some("v2") => Ok(FileVersion::V2),
            Some(other) => Err(ConfigError::UnknownVersion {
                file: file.to_string(),
                version: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileVersion::V1Beta1 => "v1beta1",
            FileVersion::V1 => "v1",
            FileVersion::V2 => "v2",
        }
    }

    /// Whether this is one of the single-module generations.
    pub fn is_legacy(&self) -> bool {
        !matches!(self, FileVersion::V2)
    }
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lint settings. Carried through to the lint collaborator as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    #[serde(rename = "use")]
    pub use_ids: Vec<String>,
    pub except: Vec<String>,
    pub ignore: Vec<String>,
    pub ignore_only: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_zero_value_suffix: Option<String>,
    pub rpc_allow_same_request_response: bool,
    pub rpc_allow_google_protobuf_empty_requests: bool,
    pub rpc_allow_google_protobuf_empty_responses: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_suffix: Option<String>,
    pub allow_comment_ignores: bool,
}

/// Breaking-change settings. Carried through as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakingConfig {
    #[serde(rename = "use")]
    pub use_ids: Vec<String>,
    pub except: Vec<String>,
    pub ignore: Vec<String>,
    pub ignore_only: BTreeMap<String, Vec<String>>,
    pub ignore_unstable_packages: bool,
}

/// Validated configuration of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    /// Module directory relative to the directory of the file that declared it
    dir_path: String,
    full_name: Option<ModuleFullName>,
    /// Source roots relative to the module directory, each with its excludes
    /// relative to that root
    root_to_excludes: BTreeMap<String, Vec<String>>,
    lint: LintConfig,
    breaking: BreakingConfig,
}

impl ModuleConfig {
    /// A module at `dir_path` with the single root `.` and no settings.
    pub fn default_at(dir_path: &str) -> Self {
        ModuleConfig {
            dir_path: normalpath::normalize(dir_path),
            full_name: None,
            root_to_excludes: BTreeMap::from([(".".to_string(), Vec::new())]),
            lint: LintConfig::default(),
            breaking: BreakingConfig::default(),
        }
    }

    pub fn dir_path(&self) -> &str {
        &self.dir_path
    }

    pub fn full_name(&self) -> Option<&ModuleFullName> {
        self.full_name.as_ref()
    }

    pub fn root_to_excludes(&self) -> &BTreeMap<String, Vec<String>> {
        &self.root_to_excludes
    }

    /// Source roots in sorted order.
    pub fn roots(&self) -> Vec<String> {
        self.root_to_excludes.keys().cloned().collect()
    }

    pub fn lint(&self) -> &LintConfig {
        &self.lint
    }

    pub fn breaking(&self) -> &BreakingConfig {
        &self.breaking
    }
}

/// A parsed `buf.yaml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufYamlFile {
    version: FileVersion,
    module_configs: Vec<ModuleConfig>,
    dep_refs: Vec<ModuleRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBuild {
    roots: Vec<String>,
    excludes: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBufYamlV1 {
    name: Option<String>,
    deps: Vec<String>,
    build: RawBuild,
    lint: LintConfig,
    breaking: BreakingConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawModuleV2 {
    path: String,
    name: Option<String>,
    excludes: Vec<String>,
    lint: Option<LintConfig>,
    breaking: Option<BreakingConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBufYamlV2 {
    modules: Vec<RawModuleV2>,
    deps: Vec<String>,
    lint: Option<LintConfig>,
    breaking: Option<BreakingConfig>,
}

/// Parse YAML into a value, treating an empty document as an empty map.
pub(crate) fn parse_yaml_value(file: &str, data: &[u8]) -> Result<serde_yaml::Value, ConfigError> {
    let value: serde_yaml::Value = serde_yaml::from_slice(data).map_err(|source| ConfigError::Yaml {
        file: file.to_string(),
        source,
    })?;
    Ok(match value {
        serde_yaml::Value::Null => serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
        other => other,
    })
}

pub(crate) fn from_yaml_value<T: serde::de::DeserializeOwned>(
    file: &str,
    value: serde_yaml::Value,
) -> Result<T, ConfigError> {
    serde_yaml::from_value(value).map_err(|source| ConfigError::Yaml {
        file: file.to_string(),
        source,
    })
}

pub(crate) fn version_of(value: &serde_yaml::Value) -> Option<&str> {
    value.get("version").and_then(|v| v.as_str())
}

fn validate_path(file: &str, field: &'static str, path: &str) -> Result<String, ConfigError> {
    normalpath::normalize_and_validate(path).map_err(|source| ConfigError::InvalidPath {
        file: file.to_string(),
        field,
        source,
    })
}

fn reject_overlaps(file: &str, field: &'static str, paths: &[String]) -> Result<(), ConfigError> {
    match normalpath::first_overlap(paths) {
        Some((first, second)) => Err(ConfigError::OverlappingPaths {
            file: file.to_string(),
            field,
            first,
            second,
        }),
        None => Ok(()),
    }
}

fn parse_full_name(name: Option<&str>) -> Result<Option<ModuleFullName>, ConfigError> {
    match name.map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => ModuleFullName::parse(name).map(Some),
    }
}

fn parse_dep_refs(deps: &[String]) -> Result<Vec<ModuleRef>, ConfigError> {
    deps.iter().map(|dep| ModuleRef::parse(dep.trim())).collect()
}

impl BufYamlFile {
    /// Parse a `buf.yaml`. `file` names the file in error messages.
    pub fn parse(file: &str, data: &[u8]) -> Result<Self, ConfigError> {
        let value = parse_yaml_value(file, data)?;
        let version = FileVersion::parse(file, version_of(&value))?;
        match version {
            FileVersion::V1Beta1 | FileVersion::V1 => {
                let raw: RawBufYamlV1 = from_yaml_value(file, value)?;
                Self::from_raw_v1(file, version, raw)
            }
            FileVersion::V2 => {
                let raw: RawBufYamlV2 = from_yaml_value(file, value)?;
                Self::from_raw_v2(file, raw)
            }
        }
    }

    /// The configuration assumed when a module directory has no `buf.yaml`.
    pub fn default_v1() -> Self {
        BufYamlFile {
            version: FileVersion::V1,
            module_configs: vec![ModuleConfig::default_at(".")],
            dep_refs: Vec::new(),
        }
    }

    fn from_raw_v1(file: &str, version: FileVersion, raw: RawBufYamlV1) -> Result<Self, ConfigError> {
        let roots: Vec<String> = match version {
            FileVersion::V1Beta1 if !raw.build.roots.is_empty() => raw
                .build
                .roots
                .iter()
                .map(|root| validate_path(file, "build.roots", root))
                .collect::<Result<_, _>>()?,
            FileVersion::V1 if !raw.build.roots.is_empty() => {
                return Err(ConfigError::invalid(
                    file,
                    "build.roots is only valid in v1beta1; move the roots into separate modules",
                ));
            }
            _ => vec![".".to_string()],
        };
        if let Some(dup) = first_duplicate(&roots) {
            return Err(ConfigError::invalid(file, format!("duplicate root \"{dup}\"")));
        }
        reject_overlaps(file, "build.roots", &roots)?;

        let mut root_to_excludes: BTreeMap<String, Vec<String>> =
            roots.iter().map(|root| (root.clone(), Vec::new())).collect();
        for exclude in &raw.build.excludes {
            let exclude = validate_path(file, "build.excludes", exclude)?;
            let root = roots
                .iter()
                .find(|root| normalpath::contains_path(root, &exclude))
                .ok_or_else(|| {
                    ConfigError::invalid(
                        file,
                        format!(
                            "exclude \"{exclude}\" is not contained in any of roots {}",
                            normalpath::quoted_list(&roots)
                        ),
                    )
                })?;
            let relative = normalpath::relativize(root, &exclude)
                .map_err(|source| ConfigError::InvalidPath {
                    file: file.to_string(),
                    field: "build.excludes",
                    source,
                })?;
            let excludes = root_to_excludes.entry(root.clone()).or_default();
            if excludes.contains(&relative) {
                return Err(ConfigError::invalid(file, format!("duplicate exclude \"{exclude}\"")));
            }
            excludes.push(relative);
        }

        Ok(BufYamlFile {
            version,
            module_configs: vec![ModuleConfig {
                dir_path: ".".to_string(),
                full_name: parse_full_name(raw.name.as_deref())?,
                root_to_excludes,
                lint: raw.lint,
                breaking: raw.breaking,
            }],
            dep_refs: parse_dep_refs(&raw.deps)?,
        })
    }

    fn from_raw_v2(file: &str, raw: RawBufYamlV2) -> Result<Self, ConfigError> {
        let top_lint = raw.lint.unwrap_or_default();
        let top_breaking = raw.breaking.unwrap_or_default();

        let raw_modules = if raw.modules.is_empty() {
            vec![RawModuleV2 {
                path: ".".to_string(),
                ..RawModuleV2::default()
            }]
        } else {
            raw.modules
        };

        let mut module_configs = Vec::with_capacity(raw_modules.len());
        for module in raw_modules {
            let dir_path = validate_path(file, "modules.path", &module.path)?;
            let mut excludes = Vec::with_capacity(module.excludes.len());
            for exclude in &module.excludes {
                let exclude = validate_path(file, "modules.excludes", exclude)?;
                if !normalpath::contains_path(&dir_path, &exclude) {
                    return Err(ConfigError::invalid(
                        file,
                        format!("exclude \"{exclude}\" is not contained in module path \"{dir_path}\""),
                    ));
                }
                let relative = normalpath::relativize(&dir_path, &exclude).map_err(|source| {
                    ConfigError::InvalidPath {
                        file: file.to_string(),
                        field: "modules.excludes",
                        source,
                    }
                })?;
                excludes.push(relative);
            }
            module_configs.push(ModuleConfig {
                dir_path,
                full_name: parse_full_name(module.name.as_deref())?,
                root_to_excludes: BTreeMap::from([(".".to_string(), excludes)]),
                lint: module.lint.unwrap_or_else(|| top_lint.clone()),
                breaking: module.breaking.unwrap_or_else(|| top_breaking.clone()),
            });
        }

        let dirs: Vec<String> = module_configs.iter().map(|m| m.dir_path.clone()).collect();
        if let Some(dup) = first_duplicate(&dirs) {
            return Err(ConfigError::invalid(file, format!("module path \"{dup}\" is declared more than once")));
        }

        Ok(BufYamlFile {
            version: FileVersion::V2,
            module_configs,
            dep_refs: parse_dep_refs(&raw.deps)?,
        })
    }

    pub fn version(&self) -> FileVersion {
        self.version
    }

    pub fn module_configs(&self) -> &[ModuleConfig] {
        &self.module_configs
    }

    /// Module directories relative to this file's directory.
    pub fn module_dir_paths(&self) -> Vec<String> {
        self.module_configs.iter().map(|m| m.dir_path.clone()).collect()
    }

    pub fn dep_refs(&self) -> &[ModuleRef] {
        &self.dep_refs
    }
}

/// A parsed `buf.work.yaml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufWorkYamlFile {
    directories: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBufWorkYaml {
    directories: Vec<String>,
}

impl BufWorkYamlFile {
    pub fn parse(file: &str, data: &[u8]) -> Result<Self, ConfigError> {
        let value = parse_yaml_value(file, data)?;
        match version_of(&value) {
            Some("v1") => {}
            None => return Err(ConfigError::invalid(file, "version is required")),
            Some(other) => {
                return Err(ConfigError::UnsupportedVersion {
                    file: file.to_string(),
                    version: other.to_string(),
                    expected: "v1".to_string(),
                })
            }
        }
        let raw: RawBufWorkYaml = from_yaml_value(file, value)?;
        if raw.directories.is_empty() {
            return Err(ConfigError::invalid(file, "directories is empty"));
        }
        let directories: Vec<String> = raw
            .directories
            .iter()
            .map(|dir| validate_path(file, "directories", dir))
            .collect::<Result<_, _>>()?;
        if directories.iter().any(|dir| dir == ".") {
            return Err(ConfigError::invalid(
                file,
                "directory \".\" is not allowed; list the module directories instead",
            ));
        }
        if let Some(dup) = first_duplicate(&directories) {
            return Err(ConfigError::invalid(file, format!("directory \"{dup}\" is listed more than once")));
        }
        Ok(BufWorkYamlFile { directories })
    }

    /// Module directories relative to this file's directory, in file order.
    pub fn directories(&self) -> &[String] {
        &self.directories
    }
}

fn first_duplicate(paths: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    paths.iter().find(|p| !seen.insert(p.as_str())).map(String::as_str)
}

/// Read `buf.yaml` from `dir` if present.
pub fn read_buf_yaml(bucket: &dyn ReadBucket, dir: &str) -> Result<Option<BufYamlFile>, ConfigError> {
    let path = normalpath::join(&[dir, BUF_YAML]);
    match storage::get_if_exists(bucket, &path)? {
        Some(data) => BufYamlFile::parse(&path, &data).map(Some),
        None => Ok(None),
    }
}

/// Read `buf.work.yaml` from `dir` if present.
pub fn read_buf_work_yaml(
    bucket: &dyn ReadBucket,
    dir: &str,
) -> Result<Option<BufWorkYamlFile>, ConfigError> {
    let path = normalpath::join(&[dir, BUF_WORK_YAML]);
    match storage::get_if_exists(bucket, &path)? {
        Some(data) => BufWorkYamlFile::parse(&path, &data).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemBucket;

    #[test]
    fn test_v1beta1_roots_and_excludes() {
        let yaml = br#"
version: v1beta1
name: buf.build/acme/petapis
build:
  roots:
    - proto
    - vendor/proto
  excludes:
    - proto/internal
"#;
        let file = BufYamlFile::parse("buf.yaml", yaml).unwrap();
        assert_eq!(file.version(), FileVersion::V1Beta1);
        let module = &file.module_configs()[0];
        assert_eq!(module.dir_path(), ".");
        assert_eq!(module.full_name().unwrap().to_string(), "buf.build/acme/petapis");
        assert_eq!(module.roots(), vec!["proto", "vendor/proto"]);
        assert_eq!(module.root_to_excludes()["proto"], vec!["internal"]);
        assert!(module.root_to_excludes()["vendor/proto"].is_empty());
    }

    #[test]
    fn test_missing_version_is_v1beta1() {
        let file = BufYamlFile::parse("buf.yaml", b"name: buf.build/acme/x\n").unwrap();
        assert_eq!(file.version(), FileVersion::V1Beta1);
        assert_eq!(file.module_configs()[0].roots(), vec!["."]);
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = BufYamlFile::parse("buf.yaml", b"# nothing here\n").unwrap();
        assert_eq!(file.module_configs().len(), 1);
        assert!(file.dep_refs().is_empty());
    }

    #[test]
    fn test_v1_rejects_roots() {
        let yaml = b"version: v1\nbuild:\n  roots: [proto]\n";
        let err = BufYamlFile::parse("buf.yaml", yaml).unwrap_err();
        assert!(err.to_string().contains("only valid in v1beta1"));
    }

    #[test]
    fn test_overlapping_roots() {
        let yaml = b"version: v1beta1\nbuild:\n  roots: [a, a/b]\n";
        assert!(matches!(
            BufYamlFile::parse("buf.yaml", yaml),
            Err(ConfigError::OverlappingPaths { .. })
        ));
    }

    #[test]
    fn test_exclude_outside_roots() {
        let yaml = b"version: v1beta1\nbuild:\n  roots: [a]\n  excludes: [b/c]\n";
        let err = BufYamlFile::parse("buf.yaml", yaml).unwrap_err();
        assert!(err.to_string().contains("not contained in any of roots"));
    }

    #[test]
    fn test_v1_deps_and_lint() {
        let yaml = br#"
version: v1
deps:
  - buf.build/googleapis/googleapis
  - buf.build/acme/money:v2
lint:
  use: [DEFAULT]
  except: [PACKAGE_VERSION_SUFFIX]
breaking:
  use: [FILE]
"#;
        let file = BufYamlFile::parse("buf.yaml", yaml).unwrap();
        assert_eq!(file.dep_refs().len(), 2);
        assert_eq!(file.dep_refs()[1].reference(), Some("v2"));
        let module = &file.module_configs()[0];
        assert_eq!(module.lint().use_ids, vec!["DEFAULT"]);
        assert_eq!(module.breaking().use_ids, vec!["FILE"]);
    }

    #[test]
    fn test_v2_modules() {
        let yaml = br#"
version: v2
modules:
  - path: proto/a
    name: buf.build/acme/a
    excludes: [proto/a/internal]
  - path: proto/b
    lint:
      use: [MINIMAL]
lint:
  use: [STANDARD]
deps:
  - buf.build/googleapis/googleapis
"#;
        let file = BufYamlFile::parse("buf.yaml", yaml).unwrap();
        assert_eq!(file.version(), FileVersion::V2);
        assert_eq!(file.module_dir_paths(), vec!["proto/a", "proto/b"]);

        let a = &file.module_configs()[0];
        assert_eq!(a.root_to_excludes()["."], vec!["internal"]);
        assert_eq!(a.lint().use_ids, vec!["STANDARD"]);

        let b = &file.module_configs()[1];
        assert!(b.full_name().is_none());
        assert_eq!(b.lint().use_ids, vec!["MINIMAL"]);
    }

    #[test]
    fn test_v2_without_modules() {
        let file = BufYamlFile::parse("buf.yaml", b"version: v2\n").unwrap();
        assert_eq!(file.module_dir_paths(), vec!["."]);
    }

    #[test]
    fn test_v2_exclude_outside_module() {
        let yaml = b"version: v2\nmodules:\n  - path: a\n    excludes: [b]\n";
        assert!(BufYamlFile::parse("buf.yaml", yaml).is_err());
    }

    #[test]
    fn test_unknown_version() {
        assert!(matches!(
            BufYamlFile::parse("buf.yaml", b"version: v3\n"),
            Err(ConfigError::UnknownVersion { .. })
        ));
    }

    #[test]
    fn test_buf_work_yaml() {
        let file =
            BufWorkYamlFile::parse("buf.work.yaml", b"version: v1\ndirectories: [proto, enterprise/proto]\n")
                .unwrap();
        assert_eq!(file.directories(), ["proto", "enterprise/proto"]);

        assert!(BufWorkYamlFile::parse("buf.work.yaml", b"version: v1\ndirectories: []\n").is_err());
        assert!(BufWorkYamlFile::parse("buf.work.yaml", b"version: v1\ndirectories: [.]\n").is_err());
        assert!(BufWorkYamlFile::parse("buf.work.yaml", b"version: v1\ndirectories: [../x]\n").is_err());
        assert!(BufWorkYamlFile::parse("buf.work.yaml", b"directories: [a]\n").is_err());
        assert!(matches!(
            BufWorkYamlFile::parse("buf.work.yaml", b"version: v2\ndirectories: [a]\n"),
            Err(ConfigError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_read_from_bucket() {
        let bucket = MemBucket::from_files([("proto/buf.yaml", "version: v1\n")]);
        assert!(read_buf_yaml(&bucket, "proto").unwrap().is_some());
        assert!(read_buf_yaml(&bucket, ".").unwrap().is_none());
        assert!(read_buf_work_yaml(&bucket, "proto").unwrap().is_none());
    }
}
