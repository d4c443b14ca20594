//! Core type definitions for synclog.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a commit within one stream.
///
/// Commit ids are strictly increasing within their stream and never reused.
/// They are **not** comparable across streams. Zero means "no commit yet".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CommitId(pub i64);

impl CommitId {
    /// The id of a stream that has never been committed to.
    pub const ZERO: CommitId = CommitId(0);

    /// Creates a commit id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Returns true for the "no commit yet" id.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "commit:{}", self.0)
    }
}

impl From<i64> for CommitId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// The kind of data a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    /// Entities of one object type.
    Entity,
    /// Groupings of one field of one object type.
    Grouping,
    /// An arbitrary named collection.
    Named,
}

/// A logical namespace owning one monotonic commit counter.
///
/// Stream keys are typed so that unrelated streams can never share a counter
/// by accident. [`StreamKey::storage_key`] is an injective encoding used to
/// address the sequence store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StreamKey {
    /// All entities of an object type.
    Entity {
        /// Object type name, e.g. `customer`.
        obj_type: String,
    },
    /// The groupings stored in one field of an object type.
    Grouping {
        /// Object type name.
        obj_type: String,
        /// Grouping field name, e.g. `groups`.
        field: String,
    },
    /// A named collection.
    Named {
        /// Collection name.
        name: String,
    },
}

impl StreamKey {
    /// Creates an entity stream key.
    pub fn entity(obj_type: impl Into<String>) -> Self {
        Self::Entity {
            obj_type: obj_type.into(),
        }
    }

    /// Creates a grouping stream key.
    pub fn grouping(obj_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Grouping {
            obj_type: obj_type.into(),
            field: field.into(),
        }
    }

    /// Creates a named stream key.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named { name: name.into() }
    }

    /// Returns the kind of this stream.
    #[must_use]
    pub fn kind(&self) -> StreamKind {
        match self {
            StreamKey::Entity { .. } => StreamKind::Entity,
            StreamKey::Grouping { .. } => StreamKind::Grouping,
            StreamKey::Named { .. } => StreamKind::Named,
        }
    }

    /// Checks that every component is non-empty.
    pub fn validate(&self) -> CoreResult<()> {
        let components: Vec<(&str, &str)> = match self {
            StreamKey::Entity { obj_type } => vec![("object type", obj_type.as_str())],
            StreamKey::Grouping { obj_type, field } => {
                vec![("object type", obj_type.as_str()), ("field", field.as_str())]
            }
            StreamKey::Named { name } => vec![("name", name.as_str())],
        };

        for (label, value) in components {
            if value.trim().is_empty() {
                return Err(CoreError::invalid_stream_key(format!(
                    "{label} must not be empty"
                )));
            }
        }
        Ok(())
    }

    /// Fails unless this stream is of the `expected` kind.
    pub fn expect_kind(&self, expected: StreamKind) -> CoreResult<()> {
        if self.kind() == expected {
            Ok(())
        } else {
            Err(CoreError::WrongStreamKind {
                stream: self.storage_key(),
                expected,
            })
        }
    }

    /// Returns the key used to address the sequence store.
    ///
    /// The encoding is a kind tag followed by percent-escaped components, so
    /// two different stream keys never map to the same storage key.
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self {
            StreamKey::Entity { obj_type } => format!("entity:{}", escape(obj_type)),
            StreamKey::Grouping { obj_type, field } => {
                format!("grouping:{}/{}", escape(obj_type), escape(field))
            }
            StreamKey::Named { name } => format!("named:{}", escape(name)),
        }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

fn escape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for ch in component.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            ':' => out.push_str("%3A"),
            _ => out.push(ch),
        }
    }
    out
}
