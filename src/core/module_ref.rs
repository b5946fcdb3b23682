//! Module names, references, and keys.
//!
//! A full name is `registry/owner/name`. A reference adds an optional
//! `:ref` selector (label, commit, or draft). A key pins a full name to a
//! commit and, when known, a content digest.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::core::config::ConfigError;

/// Fully-qualified module name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleFullName {
    registry: String,
    owner: String,
    name: String,
}

impl ModuleFullName {
    pub fn new(
        registry: impl Into<String>,
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let full_name = ModuleFullName {
            registry: registry.into(),
            owner: owner.into(),
            name: name.into(),
        };
        for (what, part) in [
            ("registry", &full_name.registry),
            ("owner", &full_name.owner),
            ("name", &full_name.name),
        ] {
            if part.is_empty() {
                return Err(ConfigError::InvalidModuleName {
                    value: full_name.to_string(),
                    reason: format!("{what} is empty"),
                });
            }
            if part.contains(|c: char| c == '/' || c == ':' || c.is_whitespace()) {
                return Err(ConfigError::InvalidModuleName {
                    value: full_name.to_string(),
                    reason: format!("{what} contains an invalid character"),
                });
            }
        }
        Ok(full_name)
    }

    /// Parse `registry/owner/name`.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [registry, owner, name] => ModuleFullName::new(*registry, *owner, *name),
            _ => Err(ConfigError::InvalidModuleName {
                value: s.to_string(),
                reason: "must be in the form registry/owner/name".to_string(),
            }),
        }
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ModuleFullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.registry, self.owner, self.name)
    }
}

impl FromStr for ModuleFullName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleFullName::parse(s)
    }
}

impl Serialize for ModuleFullName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A declared dependency: a full name plus an optional selector.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleRef {
    full_name: ModuleFullName,
    reference: Option<String>,
}

impl ModuleRef {
    pub fn new(full_name: ModuleFullName, reference: Option<String>) -> Self {
        ModuleRef {
            full_name,
            reference: reference.filter(|r| !r.is_empty()),
        }
    }

    /// Parse `registry/owner/name[:ref]`.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let (name, reference) = match s.split_once(':') {
            Some((name, reference)) => {
                if reference.is_empty() {
                    return Err(ConfigError::InvalidModuleRef {
                        value: s.to_string(),
                        reason: "reference after `:` is empty".to_string(),
                    });
                }
                (name, Some(reference.to_string()))
            }
            None => (s, None),
        };
        let full_name = ModuleFullName::parse(name).map_err(|e| ConfigError::InvalidModuleRef {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(ModuleRef::new(full_name, reference))
    }

    pub fn full_name(&self) -> &ModuleFullName {
        &self.full_name
    }

    /// The selector after `:`, if any.
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            Some(reference) => write!(f, "{}:{}", self.full_name, reference),
            None => write!(f, "{}", self.full_name),
        }
    }
}

impl Serialize for ModuleRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A content digest in `kind:hex` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    kind: String,
    value: String,
}

impl Digest {
    /// Digest kind produced by this crate.
    pub const SHA256: &'static str = "sha256";

    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Digest {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.split_once(':') {
            Some((kind, value))
                if !kind.is_empty()
                    && !value.is_empty()
                    && value.chars().all(|c| c.is_ascii_hexdigit()) =>
            {
                Ok(Digest::new(kind, value))
            }
            _ => Err(ConfigError::InvalidDigest { value: s.to_string() }),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// A module pinned to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleKey {
    full_name: ModuleFullName,
    commit_id: String,
    digest: Option<Digest>,
}

impl ModuleKey {
    pub fn new(full_name: ModuleFullName, commit_id: impl Into<String>, digest: Option<Digest>) -> Self {
        ModuleKey {
            full_name,
            commit_id: commit_id.into(),
            digest,
        }
    }

    pub fn full_name(&self) -> &ModuleFullName {
        &self.full_name
    }

    pub fn commit_id(&self) -> &str {
        &self.commit_id
    }

    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.full_name, self.commit_id)
    }
}
