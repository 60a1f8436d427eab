//! Namespace Naming Module
//!
//! Builds and recognises the versioned namespace names of a generation.

use std::fmt;

// == Namespace Kind ==
/// The three partitions every generation owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    /// Immutable assets, prefilled from the precache manifest
    Static,
    /// API, document and other network-first responses
    Dynamic,
    /// Images
    Image,
}

impl NamespaceKind {
    pub const ALL: [NamespaceKind; 3] = [
        NamespaceKind::Static,
        NamespaceKind::Dynamic,
        NamespaceKind::Image,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NamespaceKind::Static => "static",
            NamespaceKind::Dynamic => "dynamic",
            NamespaceKind::Image => "image",
        }
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Cache Names ==
/// Prefix and generation tag that together name a generation's namespaces.
///
/// Names have the form `{prefix}{kind}-{generation}`, e.g. `app-static-v2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    prefix: String,
    generation: String,
}

impl CacheNames {
    pub fn new(prefix: impl Into<String>, generation: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            generation: generation.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn generation(&self) -> &str {
        &self.generation
    }

    /// Name of one namespace of this generation.
    pub fn name(&self, kind: NamespaceKind) -> String {
        format!("{}{}-{}", self.prefix, kind, self.generation)
    }

    /// The three names protected during rollover.
    pub fn current(&self) -> [String; 3] {
        NamespaceKind::ALL.map(|kind| self.name(kind))
    }

    /// Whether a namespace name was created by this system at all.
    pub fn is_owned(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
    }

    pub fn is_current(&self, name: &str) -> bool {
        NamespaceKind::ALL
            .iter()
            .any(|kind| self.name(*kind) == name)
    }

    /// Owned by the system but left behind by another generation.
    pub fn is_stale(&self, name: &str) -> bool {
        self.is_owned(name) && !self.is_current(name)
    }
}
