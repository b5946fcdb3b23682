//! Per-module targeting.
//!
//! Given the workspace-relative target and exclude paths, decide whether a
//! module is a target and which of its paths are selected, expressed
//! relative to the module root after source roots are applied.

use crate::core::module::ProtoFileTarget;
use crate::errors::WorkspaceError;
use crate::util::normalpath;

/// Targeting decision for one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleTargeting {
    is_target: bool,
    target_paths: Vec<String>,
    target_exclude_paths: Vec<String>,
    proto_file_target: Option<ProtoFileTarget>,
}

impl ModuleTargeting {
    /// Compute the targeting of the module at `module_dir_path`.
    ///
    /// `target_paths`, `target_exclude_paths`, and the proto file target are
    /// relative to the same root as `module_dir_path`. A proto file target
    /// and target paths are never both set.
    pub fn new(
        module_dir_path: &str,
        roots: &[String],
        target_paths: &[String],
        target_exclude_paths: &[String],
        proto_file_target: Option<&ProtoFileTarget>,
        is_tentatively_target_module: bool,
    ) -> Result<Self, WorkspaceError> {
        if !is_tentatively_target_module {
            return Ok(ModuleTargeting::default());
        }

        let mut targeting = ModuleTargeting {
            is_target: target_paths.is_empty() && proto_file_target.is_none(),
            ..ModuleTargeting::default()
        };

        if let Some(target) = proto_file_target {
            if normalpath::equals_or_contains_path(module_dir_path, target.path()) {
                let relative = relativize(module_dir_path, target.path())?;
                let path = normalpath::apply_roots(roots, &relative).map_err(WorkspaceError::from_roots)?;
                targeting.is_target = true;
                targeting.proto_file_target =
                    Some(ProtoFileTarget::new(path, target.include_package_files()));
            }
            return Ok(targeting);
        }

        for target_path in target_paths {
            if target_path == module_dir_path {
                return Err(WorkspaceError::PathIsModuleDirectory {
                    path: target_path.clone(),
                });
            }
            if normalpath::contains_path(module_dir_path, target_path) {
                targeting.is_target = true;
                targeting
                    .target_paths
                    .push(relativize(module_dir_path, target_path)?);
            }
        }

        let mut exclude_paths = Vec::new();
        for exclude_path in target_exclude_paths {
            if exclude_path == module_dir_path {
                return Err(WorkspaceError::ExcludePathIsModuleDirectory {
                    path: exclude_path.clone(),
                });
            }
            if normalpath::contains_path(module_dir_path, exclude_path) {
                exclude_paths.push(relativize(module_dir_path, exclude_path)?);
            }
        }

        if !targeting.is_target {
            return Ok(ModuleTargeting::default());
        }

        targeting.target_paths = targeting
            .target_paths
            .iter()
            .map(|path| normalpath::apply_roots(roots, path).map_err(WorkspaceError::from_roots))
            .collect::<Result<_, _>>()?;
        targeting.target_exclude_paths = exclude_paths
            .iter()
            .map(|path| normalpath::apply_roots(roots, path).map_err(WorkspaceError::from_roots))
            .collect::<Result<_, _>>()?;
        Ok(targeting)
    }

    pub fn is_target(&self) -> bool {
        self.is_target
    }

    /// Target paths relative to the module root, in input order.
    pub fn target_paths(&self) -> &[String] {
        &self.target_paths
    }

    pub fn target_exclude_paths(&self) -> &[String] {
        &self.target_exclude_paths
    }

    pub fn proto_file_target(&self) -> Option<&ProtoFileTarget> {
        self.proto_file_target.as_ref()
    }

    /// Split into the parts the module set builder takes.
    pub fn into_parts(self) -> (bool, Vec<String>, Vec<String>, Option<ProtoFileTarget>) {
        (
            self.is_target,
            self.target_paths,
            self.target_exclude_paths,
            self.proto_file_target,
        )
    }
}

fn relativize(base: &str, path: &str) -> Result<String, WorkspaceError> {
    normalpath::relativize(base, path).map_err(|e| WorkspaceError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_non_tentative_module_gets_nothing() {
        let targeting = ModuleTargeting::new(
            "proto",
            &strings(&["."]),
            &strings(&["proto/a.proto"]),
            &strings(&["proto/b"]),
            None,
            false,
        )
        .unwrap();
        assert_eq!(targeting, ModuleTargeting::default());
    }

    #[test]
    fn test_no_filters_follow_tentative_status() {
        let targeting = ModuleTargeting::new("proto", &strings(&["."]), &[], &[], None, true).unwrap();
        assert!(targeting.is_target());
        assert!(targeting.target_paths().is_empty());
    }

    #[test]
    fn test_target_path_inside_module() {
        let targeting = ModuleTargeting::new(
            "proto",
            &strings(&["."]),
            &strings(&["proto/foo.proto", "enterprise/proto/bar.proto", "proto/acme"]),
            &strings(&["proto/acme/internal"]),
            None,
            true,
        )
        .unwrap();
        assert!(targeting.is_target());
        assert_eq!(targeting.target_paths(), ["foo.proto", "acme"]);
        assert_eq!(targeting.target_exclude_paths(), ["acme/internal"]);
    }

    #[test]
    fn test_target_path_outside_module() {
        let targeting = ModuleTargeting::new(
            "enterprise/proto",
            &strings(&["."]),
            &strings(&["proto/foo.proto"]),
            &strings(&["enterprise/proto/x"]),
            None,
            true,
        )
        .unwrap();
        assert!(!targeting.is_target());
        assert!(targeting.target_exclude_paths().is_empty());
    }

    #[test]
    fn test_target_path_equal_to_module_dir() {
        let err = ModuleTargeting::new("proto", &strings(&["."]), &strings(&["proto"]), &[], None, true)
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::PathIsModuleDirectory { .. }));
    }

    #[test]
    fn test_exclude_equal_to_module_dir() {
        let err = ModuleTargeting::new("proto", &strings(&["."]), &[], &strings(&["proto"]), None, true)
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::ExcludePathIsModuleDirectory { .. }));
    }

    #[test]
    fn test_roots_applied() {
        let targeting = ModuleTargeting::new(
            "mod",
            &strings(&["root1", "root2"]),
            &strings(&["mod/root1/pkg/file.proto"]),
            &[],
            None,
            true,
        )
        .unwrap();
        assert_eq!(targeting.target_paths(), ["pkg/file.proto"]);

        let err = ModuleTargeting::new(
            "mod",
            &strings(&["root1", "root2"]),
            &strings(&["mod/root3/pkg/file.proto"]),
            &[],
            None,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, WorkspaceError::PathNotInRoots(_)));
        assert!(err.to_string().contains("not contained within any of roots"));
    }

    #[test]
    fn test_proto_file_target() {
        let target = ProtoFileTarget::new("proto/acme/a.proto", true);
        let targeting =
            ModuleTargeting::new("proto", &strings(&["."]), &[], &[], Some(&target), true).unwrap();
        assert!(targeting.is_target());
        let file = targeting.proto_file_target().unwrap();
        assert_eq!(file.path(), "acme/a.proto");
        assert!(file.include_package_files());

        let other =
            ModuleTargeting::new("other", &strings(&["."]), &[], &[], Some(&target), true).unwrap();
        assert!(!other.is_target());
        assert!(other.proto_file_target().is_none());
    }

    #[test]
    fn test_order_preserved_without_dedup() {
        let targeting = ModuleTargeting::new(
            ".",
            &strings(&["."]),
            &strings(&["b/x.proto", "a", "b/x.proto"]),
            &[],
            None,
            true,
        )
        .unwrap();
        assert_eq!(targeting.target_paths(), ["b/x.proto", "a", "b/x.proto"]);
    }

    #[test]
    fn test_excludes_never_promote() {
        let targeting = ModuleTargeting::new(
            "proto",
            &strings(&["."]),
            &strings(&["other/a.proto"]),
            &strings(&["proto/internal"]),
            None,
            true,
        )
        .unwrap();
        assert!(!targeting.is_target());
        assert!(targeting.target_paths().is_empty());
        assert!(targeting.target_exclude_paths().is_empty());
    }
}
