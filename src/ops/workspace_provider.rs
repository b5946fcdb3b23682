//! Workspace resolution.
//!
//! [`WorkspaceProvider`] turns a bucket and a set of [`ResolveOptions`] into
//! a [`Workspace`]:
//!
//! 1. An override configuration, if given, is used as-is. Otherwise the
//!    controlling workspace of the input directory is located.
//! 2. Every module directory of that workspace becomes a local module with
//!    its own targeting, bucket view, and lint/breaking settings.
//! 3. Locked dependencies become non-target remote modules.
//! 4. The module set is built and checked for at least one target.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::config::{
    self, BufYamlFile, ConfigError, FileVersion, ModuleConfig, BUF_LOCK, BUF_YAML, DOC_FILE_NAMES,
    LICENSE_FILE_NAME,
};
use crate::core::lockfile;
use crate::core::module::{LocalModuleSpec, ModuleSetBuilder, ProtoFileTarget};
use crate::core::module_ref::{ModuleFullName, ModuleKey, ModuleRef};
use crate::core::workspace::{LockTarget, UpdateableWorkspace, Workspace};
use crate::errors::WorkspaceError;
use crate::ops::options::ResolveOptions;
use crate::sources::ModuleDataProvider;
use crate::storage::{FallbackFileBucket, MappedBucket, Mapper, MultiBucket, ReadBucketRef, WriteBucket};
use crate::targeting::{terminate_at_controlling_workspace, BucketTargeting, ControllingConfig, ModuleTargeting};
use crate::util::normalpath;

/// Builds workspaces, fetching remote modules from a provider.
pub struct WorkspaceProvider<'a> {
    provider: &'a dyn ModuleDataProvider,
}

impl<'a> WorkspaceProvider<'a> {
    pub fn new(provider: &'a dyn ModuleDataProvider) -> Self {
        WorkspaceProvider { provider }
    }

    /// Resolve the workspace for `options` within `bucket`.
    pub fn get_workspace(
        &self,
        bucket: ReadBucketRef,
        options: &ResolveOptions,
    ) -> Result<Workspace, WorkspaceError> {
        Resolution::new(self.provider, bucket, options)
            .run()
            .map(|(workspace, _)| workspace)
    }

    /// Resolve a workspace whose lock file can be rewritten.
    pub fn get_updateable_workspace<B>(
        &self,
        bucket: Arc<B>,
        options: &ResolveOptions,
    ) -> Result<UpdateableWorkspace, WorkspaceError>
    where
        B: WriteBucket + 'static,
    {
        let read_bucket: ReadBucketRef = bucket.clone();
        let (workspace, lock_target) = Resolution::new(self.provider, read_bucket, options).run()?;
        let write_bucket: Arc<dyn WriteBucket> = bucket;
        Ok(UpdateableWorkspace::new(workspace, write_bucket, lock_target))
    }
}

/// Target, exclude, and proto-file paths relative to the controlling
/// workspace.
#[derive(Debug, Clone)]
struct Targets {
    sub_dir_path: String,
    target_paths: Vec<String>,
    target_exclude_paths: Vec<String>,
    proto_file_target: Option<ProtoFileTarget>,
}

impl Targets {
    fn from_options(options: &ResolveOptions) -> Self {
        Targets {
            sub_dir_path: options.sub_dir_path().to_string(),
            target_paths: options.target_paths().to_vec(),
            target_exclude_paths: options.target_exclude_paths().to_vec(),
            proto_file_target: options.proto_file_target().cloned(),
        }
    }

    fn from_bucket_targeting(targeting: &BucketTargeting, options: &ResolveOptions) -> Self {
        let include_package_files = options
            .proto_file_target()
            .is_some_and(|target| target.include_package_files());
        Targets {
            sub_dir_path: targeting.input_path().to_string(),
            target_paths: targeting.target_paths().to_vec(),
            target_exclude_paths: targeting.target_exclude_paths().to_vec(),
            proto_file_target: targeting
                .proto_file_target_path()
                .map(|path| ProtoFileTarget::new(path, include_package_files)),
        }
    }

    /// Re-express every path relative to `root`.
    fn relative_to(&self, root: &str) -> Result<Self, WorkspaceError> {
        let map = |path: &str| {
            normalpath::relativize(root, path).map_err(|_| WorkspaceError::PathOutsideWorkspace {
                path: path.to_string(),
                workspace: root.to_string(),
            })
        };
        Ok(Targets {
            sub_dir_path: map(&self.sub_dir_path)?,
            target_paths: self
                .target_paths
                .iter()
                .map(|p| map(p.as_str()))
                .collect::<Result<_, _>>()?,
            target_exclude_paths: self
                .target_exclude_paths
                .iter()
                .map(|p| map(p.as_str()))
                .collect::<Result<_, _>>()?,
            proto_file_target: self
                .proto_file_target
                .as_ref()
                .map(|t| Ok::<_, WorkspaceError>(ProtoFileTarget::new(map(t.path())?, t.include_package_files())))
                .transpose()?,
        })
    }

    /// An input strictly inside a module directory selects that module,
    /// narrowed to the input when nothing else narrows it.
    fn enter_module_dirs(&mut self, module_dirs: &[String]) {
        let Some(module_dir) = module_dirs
            .iter()
            .find(|dir| normalpath::contains_path(dir, &self.sub_dir_path))
        else {
            return;
        };
        debug!(
            "input \"{}\" is inside module \"{}\"",
            self.sub_dir_path, module_dir
        );
        if self.target_paths.is_empty() && self.proto_file_target.is_none() {
            self.target_paths.push(self.sub_dir_path.clone());
        }
        self.sub_dir_path = module_dir.clone();
    }
}

/// A local module found while enumerating a workspace.
#[derive(Debug)]
struct LocalCandidate {
    /// Module directory relative to the bucket root
    dir_path: String,
    config: ModuleConfig,
    targeting: ModuleTargeting,
    is_tentative_target: bool,
}

impl LocalCandidate {
    fn opaque_id(&self) -> String {
        match self.config.full_name() {
            Some(name) => name.to_string(),
            None => self.dir_path.clone(),
        }
    }
}

/// What a workspace layout contributes before the module set is built.
#[derive(Debug, Default)]
struct Enumerated {
    candidates: Vec<LocalCandidate>,
    lock_deps: Vec<ModuleKey>,
    dep_refs: Vec<ModuleRef>,
}

/// State of one resolution call.
struct Resolution<'a> {
    provider: &'a dyn ModuleDataProvider,
    bucket: ReadBucketRef,
    options: &'a ResolveOptions,
    /// `buf.yaml` lookups by directory
    buf_yamls: HashMap<String, Option<BufYamlFile>>,
}

impl<'a> Resolution<'a> {
    fn new(provider: &'a dyn ModuleDataProvider, bucket: ReadBucketRef, options: &'a ResolveOptions) -> Self {
        Resolution {
            provider,
            bucket,
            options,
            buf_yamls: HashMap::new(),
        }
    }

    fn run(mut self) -> Result<(Workspace, LockTarget), WorkspaceError> {
        self.options.check_cancelled()?;

        if let Some(override_config) = self.options.config_override() {
            let override_config = override_config.clone();
            let targets = Targets::from_options(self.options);
            debug!(
                "using override configuration ({}) at \"{}\"",
                override_config.version(),
                targets.sub_dir_path
            );
            return if override_config.version() == FileVersion::V2 {
                let workspace_path = targets.sub_dir_path.clone();
                let targets = targets.relative_to(&workspace_path)?;
                self.resolve_v2(&workspace_path, &override_config, targets)
            } else {
                let module_dirs = vec![targets.sub_dir_path.clone()];
                self.resolve_legacy(".", &module_dirs, targets, Some(&override_config))
            };
        }

        let discovery_path = self.options.discovery_path();
        let bucket_targeting = BucketTargeting::new(
            self.bucket.as_ref(),
            &discovery_path,
            self.options.target_paths(),
            self.options.target_exclude_paths(),
            self.options.proto_file_target().map(|t| t.path()),
            &terminate_at_controlling_workspace,
            self.options.cancel(),
        )?;
        let targets = Targets::from_bucket_targeting(&bucket_targeting, self.options);

        match bucket_targeting.controlling_workspace() {
            Some(controlling) => {
                let workspace_path = controlling.path().to_string();
                match controlling.config() {
                    ControllingConfig::LegacyWorkspace(work) => {
                        let module_dirs = work.directories().to_vec();
                        self.resolve_legacy(&workspace_path, &module_dirs, targets, None)
                    }
                    ControllingConfig::Unified(buf_yaml) => {
                        let buf_yaml = buf_yaml.clone();
                        self.resolve_v2(&workspace_path, &buf_yaml, targets)
                    }
                    ControllingConfig::LegacyModule(_) => Err(WorkspaceError::internal(format!(
                        "a single-module buf.yaml at \"{}\" was reported as a controlling workspace",
                        workspace_path
                    ))),
                }
            }
            None => {
                let module_dir = self.enclosing_legacy_module(&targets.sub_dir_path)?;
                self.resolve_legacy(".", &[module_dir], targets, None)
            }
        }
    }

    fn buf_yaml(&mut self, dir: &str) -> Result<Option<BufYamlFile>, WorkspaceError> {
        if let Some(cached) = self.buf_yamls.get(dir) {
            return Ok(cached.clone());
        }
        let buf_yaml = config::read_buf_yaml(self.bucket.as_ref(), dir)?;
        self.buf_yamls.insert(dir.to_string(), buf_yaml.clone());
        Ok(buf_yaml)
    }

    /// The nearest directory at or above `input_path` holding a legacy
    /// `buf.yaml`, or `input_path` itself when there is none.
    fn enclosing_legacy_module(&mut self, input_path: &str) -> Result<String, WorkspaceError> {
        let mut current = input_path.to_string();
        loop {
            self.options.check_cancelled()?;
            if let Some(buf_yaml) = self.buf_yaml(&current)? {
                if buf_yaml.version().is_legacy() {
                    return Ok(current);
                }
            }
            if current == "." {
                debug!("no buf.yaml above \"{}\", using defaults", input_path);
                return Ok(input_path.to_string());
            }
            current = normalpath::dir(&current);
        }
    }

    /// Resolve module directories listed by a `buf.work.yaml`, or a single
    /// legacy module.
    fn resolve_legacy(
        &mut self,
        workspace_path: &str,
        module_dirs: &[String],
        mut targets: Targets,
        override_config: Option<&BufYamlFile>,
    ) -> Result<(Workspace, LockTarget), WorkspaceError> {
        targets.enter_module_dirs(module_dirs);

        let mut enumerated = Enumerated::default();
        let mut declared: BTreeMap<ModuleFullName, BTreeSet<String>> = BTreeMap::new();
        let mut lock_version = None;
        for module_dir in module_dirs {
            self.options.check_cancelled()?;
            let dir_in_bucket = normalpath::join(&[workspace_path, module_dir.as_str()]);
            let buf_yaml = match override_config {
                Some(buf_yaml) => buf_yaml.clone(),
                None => match self.buf_yaml(&dir_in_bucket)? {
                    Some(buf_yaml) if buf_yaml.version() == FileVersion::V2 => {
                        return Err(ConfigError::UnsupportedVersion {
                            file: normalpath::join(&[dir_in_bucket.as_str(), BUF_YAML]),
                            version: buf_yaml.version().to_string(),
                            expected: "v1beta1 or v1 in a buf.work.yaml directory".to_string(),
                        }
                        .into());
                    }
                    Some(buf_yaml) => buf_yaml,
                    None => BufYamlFile::default_v1(),
                },
            };
            let module_config = match buf_yaml.module_configs() {
                [module_config] => module_config.clone(),
                other => {
                    return Err(WorkspaceError::internal(format!(
                        "legacy buf.yaml for \"{}\" has {} modules",
                        dir_in_bucket,
                        other.len()
                    )))
                }
            };

            if let Some(lock) = lockfile::read_buf_lock(self.bucket.as_ref(), &dir_in_bucket)? {
                if !lock.version().is_legacy() {
                    return Err(WorkspaceError::LockVersionMismatch {
                        file: normalpath::join(&[dir_in_bucket.as_str(), BUF_LOCK]),
                        lock_version: lock.version().to_string(),
                        config_version: buf_yaml.version().to_string(),
                    });
                }
                enumerated.lock_deps.extend(lock.deps().iter().cloned());
            }

            for dep in buf_yaml.dep_refs() {
                declared
                    .entry(dep.full_name().clone())
                    .or_default()
                    .insert(dep.reference().unwrap_or("").to_string());
                enumerated.dep_refs.push(dep.clone());
            }
            lock_version.get_or_insert(buf_yaml.version());

            enumerated
                .candidates
                .push(self.candidate(module_dir, dir_in_bucket, module_config, &targets)?);
        }

        if let Some((full_name, refs)) = declared.iter().find(|(_, refs)| refs.len() > 1) {
            return Err(WorkspaceError::ConflictingDepRefs {
                full_name: full_name.to_string(),
                refs: refs
                    .iter()
                    .map(|r| if r.is_empty() { full_name.to_string() } else { format!("{}:{}", full_name, r) })
                    .collect(),
            });
        }
        enumerated.dep_refs.sort();
        enumerated.dep_refs.dedup();

        let lock_target = LockTarget::Legacy {
            dirs: enumerated.candidates.iter().map(|c| c.dir_path.clone()).collect(),
            version: lock_version.unwrap_or(FileVersion::V1),
        };
        let workspace = self.finish(workspace_path, enumerated, false)?;
        Ok((workspace, lock_target))
    }

    /// Resolve the modules of a `v2` `buf.yaml` at `workspace_path`.
    fn resolve_v2(
        &mut self,
        workspace_path: &str,
        buf_yaml: &BufYamlFile,
        mut targets: Targets,
    ) -> Result<(Workspace, LockTarget), WorkspaceError> {
        targets.enter_module_dirs(&buf_yaml.module_dir_paths());

        let mut enumerated = Enumerated::default();
        for module_config in buf_yaml.module_configs() {
            self.options.check_cancelled()?;
            let dir_in_bucket = normalpath::join(&[workspace_path, module_config.dir_path()]);
            enumerated.candidates.push(self.candidate(
                module_config.dir_path(),
                dir_in_bucket,
                module_config.clone(),
                &targets,
            )?);
        }

        if let Some(lock) = lockfile::read_buf_lock(self.bucket.as_ref(), workspace_path)? {
            if lock.version() != FileVersion::V2 {
                return Err(WorkspaceError::LockVersionMismatch {
                    file: normalpath::join(&[workspace_path, BUF_LOCK]),
                    lock_version: lock.version().to_string(),
                    config_version: buf_yaml.version().to_string(),
                });
            }
            enumerated.lock_deps = lock.deps().to_vec();
        }
        enumerated.dep_refs = buf_yaml.dep_refs().to_vec();

        let workspace = self.finish(workspace_path, enumerated, true)?;
        Ok((
            workspace,
            LockTarget::Unified {
                dir: workspace_path.to_string(),
            },
        ))
    }

    fn candidate(
        &self,
        module_dir: &str,
        dir_in_bucket: String,
        config: ModuleConfig,
        targets: &Targets,
    ) -> Result<LocalCandidate, WorkspaceError> {
        let is_tentative_target = normalpath::equals_or_contains_path(&targets.sub_dir_path, module_dir);
        let targeting = ModuleTargeting::new(
            module_dir,
            &config.roots(),
            &targets.target_paths,
            &targets.target_exclude_paths,
            targets.proto_file_target.as_ref(),
            is_tentative_target,
        )?;
        debug!(
            "module \"{}\": tentative target {}, target {}",
            dir_in_bucket,
            is_tentative_target,
            targeting.is_target()
        );
        Ok(LocalCandidate {
            dir_path: dir_in_bucket,
            config,
            targeting,
            is_tentative_target,
        })
    }

    fn finish(
        &self,
        workspace_path: &str,
        enumerated: Enumerated,
        is_v2: bool,
    ) -> Result<Workspace, WorkspaceError> {
        let Enumerated {
            candidates,
            lock_deps,
            dep_refs,
        } = enumerated;

        let dirs: Vec<&str> = candidates.iter().map(|c| c.dir_path.as_str()).collect();
        if let Some((first, second)) = normalpath::first_overlap(dirs.as_slice()) {
            return Err(WorkspaceError::OverlappingModuleDirs { first, second });
        }

        let mut name_to_dirs: BTreeMap<&ModuleFullName, Vec<String>> = BTreeMap::new();
        for candidate in &candidates {
            if let Some(name) = candidate.config.full_name() {
                name_to_dirs
                    .entry(name)
                    .or_default()
                    .push(candidate.dir_path.clone());
            }
        }
        if let Some((name, dirs)) = name_to_dirs.into_iter().find(|(_, dirs)| dirs.len() > 1) {
            return Err(WorkspaceError::DuplicateFullName {
                full_name: name.to_string(),
                dirs,
            });
        }

        if !candidates.iter().any(|c| c.is_tentative_target) {
            return Err(WorkspaceError::internal(format!(
                "no module directory of the workspace at \"{}\" matched the input",
                workspace_path
            )));
        }
        if !candidates.iter().any(|c| c.targeting.is_target()) {
            return Err(WorkspaceError::NoTargetFiles);
        }

        let mut lint = HashMap::new();
        let mut breaking = HashMap::new();
        let mut builder = ModuleSetBuilder::new(self.provider);
        let target_count = candidates.iter().filter(|c| c.targeting.is_target()).count();
        let local_count = candidates.len();
        for candidate in candidates {
            let opaque_id = candidate.opaque_id();
            lint.insert(opaque_id.clone(), candidate.config.lint().clone());
            breaking.insert(opaque_id, candidate.config.breaking().clone());

            let bucket = module_bucket(&self.bucket, workspace_path, &candidate.dir_path, &candidate.config);
            let (is_target, target_paths, target_exclude_paths, proto_file_target) =
                candidate.targeting.into_parts();
            builder.add_local(
                LocalModuleSpec::new(candidate.dir_path, bucket, is_target)
                    .with_full_name(candidate.config.full_name().cloned())
                    .with_target_paths(target_paths, target_exclude_paths)
                    .with_proto_file_target(proto_file_target),
            )?;
        }
        for key in lock_deps {
            builder.add_remote(key, false);
        }

        self.options.check_cancelled()?;
        let module_set = builder.build()?;
        info!(
            "resolved workspace at \"{}\": {} local modules ({} targets), {} remote modules",
            workspace_path,
            local_count,
            target_count,
            module_set.remote_modules().count()
        );
        Ok(Workspace::new(module_set, lint, breaking, dep_refs, is_v2))
    }
}

/// The files of a module: each root filtered to `.proto` files minus its
/// excludes, plus doc and license files that fall back to the workspace
/// root.
pub(crate) fn module_bucket(
    bucket: &ReadBucketRef,
    workspace_path: &str,
    module_dir: &str,
    config: &ModuleConfig,
) -> ReadBucketRef {
    let mut members: Vec<ReadBucketRef> = config
        .root_to_excludes()
        .iter()
        .map(|(root, excludes)| {
            let mapper = Mapper::on_prefix(&normalpath::join(&[module_dir, root.as_str()]))
                .with_ext(".proto")
                .with_excludes(excludes.as_slice());
            Arc::new(MappedBucket::new(bucket.clone(), mapper)) as ReadBucketRef
        })
        .collect();

    let fallback_dirs = if module_dir == workspace_path {
        vec![module_dir]
    } else {
        vec![module_dir, workspace_path]
    };
    let mut docs = FallbackFileBucket::new();
    let mut license = FallbackFileBucket::new();
    for dir in fallback_dirs {
        for name in DOC_FILE_NAMES {
            docs = docs.with_candidate(bucket.clone(), &normalpath::join(&[dir, name]));
        }
        license = license.with_candidate(bucket.clone(), &normalpath::join(&[dir, LICENSE_FILE_NAME]));
    }
    members.push(Arc::new(docs));
    members.push(Arc::new(license));
    Arc::new(MultiBucket::new(members))
}
