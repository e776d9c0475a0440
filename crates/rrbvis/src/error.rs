#![forbid(unsafe_code)]

//! Error types.

use std::fmt;

/// A snapshot that cannot be turned into a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// More than one of `leaf`, `branch`, `relaxedBranch` was populated.
    AmbiguousVariant { address: u64 },
    /// The number of sizes differs from the number of non-null children.
    SizeTableMismatch {
        address: u64,
        children: usize,
        sizes: usize,
    },
    /// A node or the tail holds more entries than the branching factor.
    BranchingFactorExceeded {
        address: Option<u64>,
        count: usize,
        branching_factor: usize,
    },
    /// The payload is not valid snapshot JSON.
    Decode(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbiguousVariant { address } => {
                write!(f, "node {address} populates more than one variant")
            }
            Self::SizeTableMismatch {
                address,
                children,
                sizes,
            } => write!(
                f,
                "node {address} has {children} children but {sizes} size entries"
            ),
            Self::BranchingFactorExceeded {
                address: Some(address),
                count,
                branching_factor,
            } => write!(
                f,
                "node {address} holds {count} entries (branching factor {branching_factor})"
            ),
            Self::BranchingFactorExceeded {
                address: None,
                count,
                branching_factor,
            } => write!(
                f,
                "tail holds {count} entries (branching factor {branching_factor})"
            ),
            Self::Decode(msg) => write!(f, "snapshot decode error: {msg}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// A request the vector store rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Unknown vector id, index out of range, or an otherwise unusable argument.
    InvalidOperand(String),
    /// The store could not serialize a vector.
    Snapshot(SnapshotError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOperand(msg) => write!(f, "invalid operand: {msg}"),
            Self::Snapshot(err) => write!(f, "store snapshot error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Snapshot(err) => Some(err),
            Self::InvalidOperand(_) => None,
        }
    }
}

/// Top-level error for session and instance operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisError {
    Snapshot(SnapshotError),
    Store(StoreError),
    /// No mounted instance has this id.
    UnknownInstance(u64),
}

impl fmt::Display for VisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::UnknownInstance(id) => write!(f, "unknown instance {id}"),
        }
    }
}

impl std::error::Error for VisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Snapshot(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::UnknownInstance(_) => None,
        }
    }
}

impl From<SnapshotError> for VisError {
    fn from(err: SnapshotError) -> Self {
        Self::Snapshot(err)
    }
}

impl From<StoreError> for VisError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

pub type Result<T> = std::result::Result<T, VisError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_messages() {
        let err = SnapshotError::SizeTableMismatch {
            address: 7,
            children: 3,
            sizes: 2,
        };
        assert_eq!(err.to_string(), "node 7 has 3 children but 2 size entries");
        let tail = SnapshotError::BranchingFactorExceeded {
            address: None,
            count: 5,
            branching_factor: 4,
        };
        assert!(tail.to_string().starts_with("tail holds 5"));
    }

    #[test]
    fn vis_error_wraps_sources() {
        let err: VisError = StoreError::InvalidOperand("index 9".into()).into();
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "invalid operand: index 9");
        assert!(VisError::UnknownInstance(3).source().is_none());
    }

    #[test]
    fn serde_errors_become_decode() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(matches!(SnapshotError::from(err), SnapshotError::Decode(_)));
    }
}
