//! Modules, module sets, and the module set builder.
//!
//! A module set is immutable once built. Its import graph is computed on
//! first use from the `import` statements of every module's `.proto`
//! files, so building a set does no file I/O beyond remote fetches.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::imports;
use crate::core::module_ref::{Digest, ModuleFullName, ModuleKey};
use crate::errors::WorkspaceError;
use crate::sources::ModuleDataProvider;
use crate::storage::{self, ObjectInfo, ReadBucketRef, StorageError};
use crate::util::hash::ContentDigester;
use crate::util::normalpath;

/// A single `.proto` file selected as the target of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoFileTarget {
    /// Path relative to the module root
    path: String,
    /// Also target every file in the same package
    include_package_files: bool,
}

impl ProtoFileTarget {
    pub fn new(path: impl Into<String>, include_package_files: bool) -> Self {
        ProtoFileTarget {
            path: path.into(),
            include_package_files,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn include_package_files(&self) -> bool {
        self.include_package_files
    }
}

/// A unit of `.proto` files plus documentation and license.
#[derive(Debug)]
pub struct Module {
    opaque_id: String,
    /// Directory of a local module relative to the workspace bucket
    bucket_id: Option<String>,
    full_name: Option<ModuleFullName>,
    commit_id: Option<String>,
    bucket: ReadBucketRef,
    is_local: bool,
    is_target: bool,
    target_paths: Vec<String>,
    target_exclude_paths: Vec<String>,
    proto_file_target: Option<ProtoFileTarget>,
}

impl Module {
    /// Identity that is unique within a module set: the full name when the
    /// module has one, otherwise the bucket id.
    pub fn opaque_id(&self) -> &str {
        &self.opaque_id
    }

    /// Directory of a local module. `None` for remote modules.
    pub fn bucket_id(&self) -> Option<&str> {
        self.bucket_id.as_deref()
    }

    pub fn full_name(&self) -> Option<&ModuleFullName> {
        self.full_name.as_ref()
    }

    /// Pinned commit of a remote module.
    pub fn commit_id(&self) -> Option<&str> {
        self.commit_id.as_deref()
    }

    /// Module files rooted at the module root: `.proto` files with roots
    /// flattened, plus the doc and license files.
    pub fn bucket(&self) -> &ReadBucketRef {
        &self.bucket
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }

    pub fn is_target(&self) -> bool {
        self.is_target
    }

    /// Target paths relative to the module root. Empty means the whole module.
    pub fn target_paths(&self) -> &[String] {
        &self.target_paths
    }

    pub fn target_exclude_paths(&self) -> &[String] {
        &self.target_exclude_paths
    }

    pub fn proto_file_target(&self) -> Option<&ProtoFileTarget> {
        self.proto_file_target.as_ref()
    }

    /// Every file in the module, sorted by path.
    pub fn files(&self) -> Result<Vec<ObjectInfo>, StorageError> {
        storage::all_object_infos(self.bucket.as_ref(), ".")
    }

    /// Every `.proto` file in the module, sorted by path.
    pub fn proto_files(&self) -> Result<Vec<ObjectInfo>, StorageError> {
        Ok(self
            .files()?
            .into_iter()
            .filter(|info| normalpath::ext(info.path()) == ".proto")
            .collect())
    }

    /// The `.proto` files selected for processing. Empty for non-target
    /// modules.
    pub fn target_files(&self) -> Result<Vec<ObjectInfo>, StorageError> {
        if !self.is_target {
            return Ok(Vec::new());
        }
        let proto_files = self.proto_files()?;

        if let Some(target) = &self.proto_file_target {
            let Some(file) = proto_files.iter().find(|info| info.path() == target.path()) else {
                return Err(StorageError::NotFound {
                    path: target.path().to_string(),
                });
            };
            if !target.include_package_files() {
                return Ok(vec![file.clone()]);
            }
            let package = imports::scan_bytes(&self.bucket.get(file.path())?).package;
            let mut files = Vec::new();
            for info in &proto_files {
                if info.path() == file.path()
                    || imports::scan_bytes(&self.bucket.get(info.path())?).package == package
                {
                    files.push(info.clone());
                }
            }
            return Ok(files);
        }

        Ok(proto_files
            .into_iter()
            .filter(|info| {
                self.target_paths.is_empty()
                    || self
                        .target_paths
                        .iter()
                        .any(|target| normalpath::equals_or_contains_path(target, info.path()))
            })
            .filter(|info| {
                !self
                    .target_exclude_paths
                    .iter()
                    .any(|exclude| normalpath::equals_or_contains_path(exclude, info.path()))
            })
            .collect())
    }

    /// Content digest over every file path and content.
    pub fn digest(&self) -> Result<Digest, StorageError> {
        let mut digester = ContentDigester::new();
        for info in self.files()? {
            digester.add_file(info.path(), &self.bucket.get(info.path())?);
        }
        Ok(Digest::new(Digest::SHA256, digester.finish()))
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.full_name, &self.bucket_id) {
            (Some(name), _) => write!(f, "{}", name),
            (None, Some(dir)) => write!(f, "{}", dir),
            (None, None) => write!(f, "{}", self.opaque_id),
        }
    }
}

/// Import graph between the modules of a set.
#[derive(Debug)]
struct ModuleGraph {
    /// Node weights are indexes into the module list
    graph: DiGraph<usize, ()>,
    index_to_node: HashMap<usize, NodeIndex>,
}

/// An immutable set of modules with a lazily computed import graph.
#[derive(Debug)]
pub struct ModuleSet {
    modules: Vec<Arc<Module>>,
    opaque_id_to_index: HashMap<String, usize>,
    graph: Mutex<Option<Arc<ModuleGraph>>>,
}

impl ModuleSet {
    fn new(modules: Vec<Arc<Module>>) -> Self {
        let opaque_id_to_index = modules
            .iter()
            .enumerate()
            .map(|(idx, module)| (module.opaque_id().to_string(), idx))
            .collect();
        ModuleSet {
            modules,
            opaque_id_to_index,
            graph: Mutex::new(None),
        }
    }

    /// All modules: local modules in the order they were added, then remote
    /// modules.
    pub fn modules(&self) -> &[Arc<Module>] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get_module_for_opaque_id(&self, opaque_id: &str) -> Option<&Arc<Module>> {
        self.opaque_id_to_index
            .get(opaque_id)
            .map(|&idx| &self.modules[idx])
    }

    pub fn get_module_for_full_name(&self, full_name: &ModuleFullName) -> Option<&Arc<Module>> {
        self.modules
            .iter()
            .find(|module| module.full_name() == Some(full_name))
    }

    pub fn get_module_for_bucket_id(&self, bucket_id: &str) -> Option<&Arc<Module>> {
        self.modules
            .iter()
            .find(|module| module.bucket_id() == Some(bucket_id))
    }

    pub fn local_modules(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.modules.iter().filter(|module| module.is_local())
    }

    pub fn remote_modules(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.modules.iter().filter(|module| !module.is_local())
    }

    pub fn target_modules(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.modules.iter().filter(|module| module.is_target())
    }

    fn graph(&self) -> Result<Arc<ModuleGraph>, WorkspaceError> {
        let mut guard = self.graph.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(graph) = guard.as_ref() {
            return Ok(graph.clone());
        }
        let graph = Arc::new(self.build_graph()?);
        *guard = Some(graph.clone());
        Ok(graph)
    }

    fn build_graph(&self) -> Result<ModuleGraph, WorkspaceError> {
        let mut file_owner: HashMap<String, usize> = HashMap::new();
        let mut module_files: Vec<Vec<ObjectInfo>> = Vec::with_capacity(self.modules.len());
        for (idx, module) in self.modules.iter().enumerate() {
            let files = module.proto_files()?;
            for info in &files {
                file_owner.entry(info.path().to_string()).or_insert(idx);
            }
            module_files.push(files);
        }

        let mut graph = DiGraph::new();
        let mut index_to_node = HashMap::new();
        for idx in 0..self.modules.len() {
            index_to_node.insert(idx, graph.add_node(idx));
        }

        for (idx, files) in module_files.iter().enumerate() {
            let module = &self.modules[idx];
            for info in files {
                let data = module.bucket().get(info.path())?;
                for import in imports::scan_bytes(&data).imports {
                    // Imports no module provides (well-known types) are skipped.
                    let Some(&owner) = file_owner.get(&import) else {
                        continue;
                    };
                    if owner == idx {
                        continue;
                    }
                    let (from, to) = (index_to_node[&idx], index_to_node[&owner]);
                    if !graph.contains_edge(from, to) {
                        graph.add_edge(from, to, ());
                    }
                }
            }
        }

        for component in tarjan_scc(&graph) {
            if component.len() > 1 {
                let mut names: Vec<String> = component
                    .iter()
                    .map(|&node| self.modules[graph[node]].to_string())
                    .collect();
                names.sort();
                names.push(names[0].clone());
                return Err(WorkspaceError::ModuleCycle { modules: names });
            }
        }

        tracing::debug!(
            "built module graph with {} modules and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(ModuleGraph {
            graph,
            index_to_node,
        })
    }

    fn index_of(&self, module: &Module) -> Result<usize, WorkspaceError> {
        self.opaque_id_to_index
            .get(module.opaque_id())
            .copied()
            .ok_or_else(|| {
                WorkspaceError::internal(format!("module {} is not part of this module set", module))
            })
    }

    /// Modules that `module` imports from directly, sorted by opaque id.
    pub fn direct_deps(&self, module: &Module) -> Result<Vec<Arc<Module>>, WorkspaceError> {
        let graph = self.graph()?;
        let node = graph.index_to_node[&self.index_of(module)?];
        let mut deps: Vec<Arc<Module>> = graph
            .graph
            .neighbors(node)
            .map(|n| self.modules[graph.graph[n]].clone())
            .collect();
        deps.sort_by(|a, b| a.opaque_id().cmp(b.opaque_id()));
        Ok(deps)
    }

    /// Every module reachable from `module`, sorted by opaque id.
    pub fn transitive_deps(&self, module: &Module) -> Result<Vec<Arc<Module>>, WorkspaceError> {
        let graph = self.graph()?;
        let start = self.index_of(module)?;
        let reachable = Self::reachable(&graph, [start]);
        let mut deps: Vec<Arc<Module>> = reachable
            .into_iter()
            .filter(|&idx| idx != start)
            .map(|idx| self.modules[idx].clone())
            .collect();
        deps.sort_by(|a, b| a.opaque_id().cmp(b.opaque_id()));
        Ok(deps)
    }

    /// Remote modules reachable from any target module, sorted by opaque id.
    pub fn remote_deps_of_targets(&self) -> Result<Vec<Arc<Module>>, WorkspaceError> {
        self.remote_deps_of(|module| module.is_target())
    }

    /// Remote modules reachable from any local module, target or not, sorted
    /// by opaque id. This is what a workspace lock file has to pin.
    pub fn remote_deps_of_locals(&self) -> Result<Vec<Arc<Module>>, WorkspaceError> {
        self.remote_deps_of(|module| module.is_local())
    }

    fn remote_deps_of(&self, is_start: impl Fn(&Module) -> bool) -> Result<Vec<Arc<Module>>, WorkspaceError> {
        let graph = self.graph()?;
        let starts: Vec<usize> = self
            .modules
            .iter()
            .enumerate()
            .filter(|(_, module)| is_start(module))
            .map(|(idx, _)| idx)
            .collect();
        let mut deps: Vec<Arc<Module>> = Self::reachable(&graph, starts)
            .into_iter()
            .map(|idx| self.modules[idx].clone())
            .filter(|module| !module.is_local())
            .collect();
        deps.sort_by(|a, b| a.opaque_id().cmp(b.opaque_id()));
        Ok(deps)
    }

    fn reachable(graph: &ModuleGraph, starts: impl IntoIterator<Item = usize>) -> HashSet<usize> {
        let mut visited = HashSet::new();
        let mut stack: Vec<usize> = starts.into_iter().collect();
        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            for next in graph.graph.neighbors(graph.index_to_node[&idx]) {
                stack.push(graph.graph[next]);
            }
        }
        visited
    }
}

/// A local module to add to a [`ModuleSetBuilder`].
#[derive(Debug, Clone)]
pub struct LocalModuleSpec {
    bucket_id: String,
    bucket: ReadBucketRef,
    is_target: bool,
    full_name: Option<ModuleFullName>,
    target_paths: Vec<String>,
    target_exclude_paths: Vec<String>,
    proto_file_target: Option<ProtoFileTarget>,
}

impl LocalModuleSpec {
    pub fn new(bucket_id: impl Into<String>, bucket: ReadBucketRef, is_target: bool) -> Self {
        LocalModuleSpec {
            bucket_id: normalpath::normalize(&bucket_id.into()),
            bucket,
            is_target,
            full_name: None,
            target_paths: Vec::new(),
            target_exclude_paths: Vec::new(),
            proto_file_target: None,
        }
    }

    pub fn with_full_name(mut self, full_name: Option<ModuleFullName>) -> Self {
        self.full_name = full_name;
        self
    }

    pub fn with_target_paths(mut self, target_paths: Vec<String>, target_exclude_paths: Vec<String>) -> Self {
        self.target_paths = target_paths;
        self.target_exclude_paths = target_exclude_paths;
        self
    }

    pub fn with_proto_file_target(mut self, target: Option<ProtoFileTarget>) -> Self {
        self.proto_file_target = target;
        self
    }

    fn has_path_filters(&self) -> bool {
        !self.target_paths.is_empty()
            || !self.target_exclude_paths.is_empty()
            || self.proto_file_target.is_some()
    }
}

#[derive(Debug)]
struct RemoteModuleSpec {
    key: ModuleKey,
    is_target: bool,
}

/// Accumulates local and remote modules for one resolution call.
pub struct ModuleSetBuilder<'a> {
    provider: &'a dyn ModuleDataProvider,
    locals: Vec<LocalModuleSpec>,
    /// Bucket id to index in `locals`
    local_index: HashMap<String, usize>,
    remotes: Vec<RemoteModuleSpec>,
}

impl<'a> ModuleSetBuilder<'a> {
    pub fn new(provider: &'a dyn ModuleDataProvider) -> Self {
        ModuleSetBuilder {
            provider,
            locals: Vec::new(),
            local_index: HashMap::new(),
            remotes: Vec::new(),
        }
    }

    /// Add a local module. A bucket id that was already added is merged:
    /// the module is a target if either addition was.
    pub fn add_local(&mut self, spec: LocalModuleSpec) -> Result<&mut Self, WorkspaceError> {
        if !spec.is_target && spec.has_path_filters() {
            return Err(WorkspaceError::internal(format!(
                "target paths were given for non-target module \"{}\"",
                spec.bucket_id
            )));
        }
        match self.local_index.get(&spec.bucket_id) {
            Some(&idx) => {
                tracing::debug!("module \"{}\" was already added, merging", spec.bucket_id);
                let existing = &mut self.locals[idx];
                existing.is_target |= spec.is_target;
                existing.target_paths.extend(spec.target_paths);
                existing.target_exclude_paths.extend(spec.target_exclude_paths);
                if existing.proto_file_target.is_none() {
                    existing.proto_file_target = spec.proto_file_target;
                }
                if existing.full_name.is_none() {
                    existing.full_name = spec.full_name;
                }
            }
            None => {
                self.local_index.insert(spec.bucket_id.clone(), self.locals.len());
                self.locals.push(spec);
            }
        }
        Ok(self)
    }

    /// Add a remote module to be fetched from the provider.
    pub fn add_remote(&mut self, key: ModuleKey, is_target: bool) -> &mut Self {
        self.remotes.push(RemoteModuleSpec { key, is_target });
        self
    }

    /// Resolve remote modules and build the set.
    pub fn build(self) -> Result<ModuleSet, WorkspaceError> {
        let mut name_to_dirs: BTreeMap<&ModuleFullName, Vec<String>> = BTreeMap::new();
        for local in &self.locals {
            if let Some(name) = &local.full_name {
                name_to_dirs.entry(name).or_default().push(local.bucket_id.clone());
            }
        }
        if let Some((name, dirs)) = name_to_dirs.iter().find(|(_, dirs)| dirs.len() > 1) {
            return Err(WorkspaceError::DuplicateFullName {
                full_name: name.to_string(),
                dirs: dirs.clone(),
            });
        }

        let mut remote_keys: Vec<ModuleKey> = Vec::new();
        let mut remote_targets: Vec<bool> = Vec::new();
        let mut remote_seen: HashMap<ModuleFullName, usize> = HashMap::new();
        for remote in self.remotes {
            let name = remote.key.full_name();
            if name_to_dirs.contains_key(name) {
                tracing::debug!("local module {} takes precedence over {}", name, remote.key);
                continue;
            }
            if let Some(&idx) = remote_seen.get(name) {
                if remote_keys[idx].commit_id() != remote.key.commit_id() {
                    tracing::warn!(
                        "{} is locked at both {} and {}, using {}",
                        name,
                        remote_keys[idx].commit_id(),
                        remote.key.commit_id(),
                        remote_keys[idx].commit_id()
                    );
                }
                remote_targets[idx] |= remote.is_target;
                continue;
            }
            remote_seen.insert(name.clone(), remote_keys.len());
            remote_keys.push(remote.key);
            remote_targets.push(remote.is_target);
        }

        // An unnamed local module is identified by its directory, which must
        // not read as the name of another module in the set.
        for local in self.locals.iter().filter(|local| local.full_name.is_none()) {
            let taken = name_to_dirs.keys().any(|name| name.to_string() == local.bucket_id)
                || remote_keys.iter().any(|key| key.full_name().to_string() == local.bucket_id);
            if taken {
                return Err(WorkspaceError::ModuleIdCollision {
                    dir: local.bucket_id.clone(),
                });
            }
        }

        let datas = if remote_keys.is_empty() {
            Vec::new()
        } else {
            tracing::debug!(
                "fetching {} remote modules from {}",
                remote_keys.len(),
                self.provider.name()
            );
            self.provider
                .get_module_datas(&remote_keys)
                .map_err(WorkspaceError::Provider)?
        };
        if datas.len() != remote_keys.len() {
            return Err(WorkspaceError::Provider(anyhow::anyhow!(
                "provider {} returned {} modules for {} keys",
                self.provider.name(),
                datas.len(),
                remote_keys.len()
            )));
        }

        let mut modules: Vec<Arc<Module>> = Vec::with_capacity(self.locals.len() + datas.len());
        for local in self.locals {
            let opaque_id = local
                .full_name
                .as_ref()
                .map(|name| name.to_string())
                .unwrap_or_else(|| local.bucket_id.clone());
            modules.push(Arc::new(Module {
                opaque_id,
                bucket_id: Some(local.bucket_id),
                full_name: local.full_name,
                commit_id: None,
                bucket: local.bucket,
                is_local: true,
                is_target: local.is_target,
                target_paths: local.target_paths,
                target_exclude_paths: local.target_exclude_paths,
                proto_file_target: local.proto_file_target,
            }));
        }
        for ((key, data), is_target) in remote_keys.iter().zip(datas).zip(remote_targets) {
            if data.key().full_name() != key.full_name() {
                return Err(WorkspaceError::Provider(anyhow::anyhow!(
                    "provider {} returned {} when {} was requested",
                    self.provider.name(),
                    data.key(),
                    key
                )));
            }
            modules.push(Arc::new(Module {
                opaque_id: key.full_name().to_string(),
                bucket_id: None,
                full_name: Some(key.full_name().clone()),
                commit_id: Some(key.commit_id().to_string()),
                bucket: data.bucket().clone(),
                is_local: false,
                is_target,
                target_paths: Vec::new(),
                target_exclude_paths: Vec::new(),
                proto_file_target: None,
            }));
        }

        Ok(ModuleSet::new(modules))
    }
}
