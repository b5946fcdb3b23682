//! Declared dependencies that do not match the import graph.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::core::module_ref::{ModuleFullName, ModuleRef};
use crate::core::workspace::Workspace;
use crate::errors::WorkspaceError;

/// Why a dependency is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedDepType {
    /// Declared, but no target module reaches it
    Unused,
    /// Imported directly by a local target module, but not declared
    Undeclared,
}

impl fmt::Display for MalformedDepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedDepType::Unused => f.write_str("unused"),
            MalformedDepType::Undeclared => f.write_str("undeclared"),
        }
    }
}

/// A dependency reported by [`malformed_deps_for_workspace`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedDep {
    full_name: ModuleFullName,
    /// The declaration, absent for undeclared dependencies
    dep_ref: Option<ModuleRef>,
    kind: MalformedDepType,
}

impl MalformedDep {
    pub fn full_name(&self) -> &ModuleFullName {
        &self.full_name
    }

    pub fn dep_ref(&self) -> Option<&ModuleRef> {
        self.dep_ref.as_ref()
    }

    pub fn kind(&self) -> MalformedDepType {
        self.kind
    }
}

impl fmt::Display for MalformedDep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dep_ref {
            Some(dep_ref) => write!(f, "{} ({})", dep_ref, self.kind),
            None => write!(f, "{} ({})", self.full_name, self.kind),
        }
    }
}

/// Which classifications to report.
#[derive(Debug, Clone, Copy, Default)]
pub struct MalformedDepsOptions {
    pub include_undeclared: bool,
}

/// Report declared dependencies that no target module uses and, when
/// asked, remote modules that local targets import without declaring.
///
/// Local modules are never reported. Results are sorted by full name.
pub fn malformed_deps_for_workspace(
    workspace: &Workspace,
    options: &MalformedDepsOptions,
) -> Result<Vec<MalformedDep>, WorkspaceError> {
    let module_set = workspace.module_set();
    let local_names: BTreeSet<&ModuleFullName> = module_set
        .local_modules()
        .filter_map(|module| module.full_name())
        .collect();
    let remote_deps = module_set.remote_deps_of_targets()?;
    let used: BTreeSet<&ModuleFullName> = remote_deps
        .iter()
        .filter_map(|module| module.full_name())
        .collect();

    let mut malformed = Vec::new();
    let mut declared: BTreeSet<&ModuleFullName> = BTreeSet::new();
    for dep_ref in workspace.configured_dep_module_refs() {
        let full_name = dep_ref.full_name();
        if !declared.insert(full_name) || local_names.contains(full_name) {
            continue;
        }
        if !used.contains(full_name) {
            malformed.push(MalformedDep {
                full_name: full_name.clone(),
                dep_ref: Some(dep_ref.clone()),
                kind: MalformedDepType::Unused,
            });
        }
    }

    if options.include_undeclared {
        let mut undeclared = BTreeSet::new();
        for module in module_set.local_modules().filter(|m| m.is_target()) {
            for dep in module_set.direct_deps(module)? {
                if let Some(full_name) = dep.full_name() {
                    if !dep.is_local() && !declared.contains(full_name) {
                        undeclared.insert(full_name.clone());
                    }
                }
            }
        }
        malformed.extend(undeclared.into_iter().map(|full_name| MalformedDep {
            full_name,
            dep_ref: None,
            kind: MalformedDepType::Undeclared,
        }));
    }

    malformed.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.kind.cmp(&b.kind)));
    tracing::debug!("found {} malformed dependencies", malformed.len());
    Ok(malformed)
}
