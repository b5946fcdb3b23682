//! Options for a single resolution call.

use crate::core::config::BufYamlFile;
use crate::core::module::ProtoFileTarget;
use crate::errors::WorkspaceError;
use crate::util::cancel::CancellationToken;
use crate::util::normalpath;

/// File name reported for errors in an override configuration.
const OVERRIDE_FILE: &str = "<config override>";

/// Validated resolution options.
///
/// Every path is normalized and relative to the bucket root.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// As given by the caller; `None` means the bucket root
    sub_dir_path: Option<String>,
    target_paths: Vec<String>,
    target_exclude_paths: Vec<String>,
    proto_file_target: Option<ProtoFileTarget>,
    config_override: Option<BufYamlFile>,
    cancel: CancellationToken,
}

impl ResolveOptions {
    pub fn builder() -> ResolveOptionsBuilder {
        ResolveOptionsBuilder::default()
    }

    /// The caller's sub-directory, `.` when none was given. A config
    /// override is rooted here.
    pub fn sub_dir_path(&self) -> &str {
        self.sub_dir_path.as_deref().unwrap_or(".")
    }

    /// Directory that configuration discovery walks up from: the
    /// sub-directory when one was given, else the directory of the proto
    /// file target, else the bucket root.
    pub fn discovery_path(&self) -> String {
        match (&self.sub_dir_path, &self.proto_file_target) {
            (Some(path), _) => path.clone(),
            (None, Some(target)) => normalpath::dir(target.path()),
            (None, None) => ".".to_string(),
        }
    }

    pub fn target_paths(&self) -> &[String] {
        &self.target_paths
    }

    pub fn target_exclude_paths(&self) -> &[String] {
        &self.target_exclude_paths
    }

    pub fn proto_file_target(&self) -> Option<&ProtoFileTarget> {
        self.proto_file_target.as_ref()
    }

    /// A configuration that replaces on-disk discovery.
    pub fn config_override(&self) -> Option<&BufYamlFile> {
        self.config_override.as_ref()
    }

    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), WorkspaceError> {
        if self.cancel.is_cancelled() {
            Err(WorkspaceError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Builder for [`ResolveOptions`].
#[derive(Debug, Clone, Default)]
pub struct ResolveOptionsBuilder {
    sub_dir_path: Option<String>,
    target_paths: Vec<String>,
    target_exclude_paths: Vec<String>,
    proto_file_target: Option<(String, bool)>,
    config_override: Option<Vec<u8>>,
    cancel: Option<CancellationToken>,
}

impl ResolveOptionsBuilder {
    pub fn sub_dir_path(mut self, path: impl Into<String>) -> Self {
        self.sub_dir_path = Some(path.into());
        self
    }

    pub fn target_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn target_exclude_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_exclude_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Target a single `.proto` file, optionally with every file of its
    /// package.
    pub fn proto_file_target(mut self, path: impl Into<String>, include_package_files: bool) -> Self {
        self.proto_file_target = Some((path.into(), include_package_files));
        self
    }

    /// A `buf.yaml` document used instead of the files on disk.
    pub fn config_override(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.config_override = Some(data.into());
        self
    }

    pub fn cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> Result<ResolveOptions, WorkspaceError> {
        let sub_dir_path = self
            .sub_dir_path
            .map(|path| validate("sub-directory", &path))
            .transpose()?;
        let target_paths = self
            .target_paths
            .iter()
            .map(|path| validate("target path", path))
            .collect::<Result<Vec<_>, _>>()?;
        let target_exclude_paths = self
            .target_exclude_paths
            .iter()
            .map(|path| validate("exclude path", path))
            .collect::<Result<Vec<_>, _>>()?;

        let proto_file_target = match self.proto_file_target {
            None => None,
            Some((path, include_package_files)) => {
                if !target_paths.is_empty() {
                    return Err(invalid("a proto file target cannot be combined with target paths"));
                }
                let path = validate("proto file target", &path)?;
                if normalpath::ext(&path) != ".proto" {
                    return Err(invalid(format!(
                        "proto file target \"{}\" does not have a .proto extension",
                        path
                    )));
                }
                Some(ProtoFileTarget::new(path, include_package_files))
            }
        };

        let config_override = self
            .config_override
            .map(|data| BufYamlFile::parse(OVERRIDE_FILE, &data))
            .transpose()?;

        Ok(ResolveOptions {
            sub_dir_path,
            target_paths,
            target_exclude_paths,
            proto_file_target,
            config_override,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

fn invalid(message: impl Into<String>) -> WorkspaceError {
    WorkspaceError::InvalidOptions {
        message: message.into(),
    }
}

fn validate(what: &str, path: &str) -> Result<String, WorkspaceError> {
    if path.trim().is_empty() {
        return Err(invalid(format!("empty {}", what)));
    }
    normalpath::normalize_and_validate(path).map_err(|e| invalid(format!("{} \"{}\": {}", what, path, e)))
}
