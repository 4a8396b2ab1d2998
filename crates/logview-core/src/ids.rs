//! Stable identity types for grains and clusters.
//!
//! A grain is addressed by `(GrainType, GrainId)`; a cluster is addressed by
//! `ClusterId`. These are thin newtypes over `String` rather than raw strings
//! so call sites cannot transpose a grain id and a cluster id by accident.

use std::fmt;
use std::sync::Arc;

/// Logical type name of a grain, e.g. `"orders.OrderGrain"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrainType(Arc<str>);

impl GrainType {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GrainType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque identity of a single grain instance within its type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrainId(Arc<str>);

impl GrainId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GrainId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identity of a cluster participating in a multi-writer deployment.
///
/// Used as the key of the snapshot's write-toggle bitmap (§3, §4.1); two
/// clusters with the same id are assumed to be the same writer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(Arc<str>);

impl ClusterId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Fully qualified grain identity, `(grainTypeName, grainId)` from §4.3/§4.4.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GrainKey {
    pub grain_type: GrainType,
    pub grain_id: GrainId,
}

impl GrainKey {
    pub fn new(grain_type: impl Into<GrainType>, grain_id: impl Into<GrainId>) -> Self {
        Self {
            grain_type: grain_type.into(),
            grain_id: grain_id.into(),
        }
    }
}

impl fmt::Display for GrainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.grain_type, self.grain_id)
    }
}
