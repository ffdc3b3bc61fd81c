//! Error types for the versioned file store.
//!
//! One typed enum covers the whole engine: the path engine and tree
//! kernel raise these, the transaction boundary rolls back and re-raises
//! them unchanged, and the HTTP rim maps them to status codes.

use crate::types::{FileId, FileType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    /// A path segment, node id, branch or user is absent.
    #[error("file not found")]
    NotFound,

    /// Name collision on create. Creation never overwrites; callers must
    /// update or delete-and-create instead.
    #[error("file already exists: {0}")]
    AlreadyExists(String),

    /// A regular file was addressed as a directory or vice versa.
    #[error("file {id} is not a {expected:?}")]
    TypeMismatch { id: FileId, expected: FileType },

    /// The supplied root does not descend from the branch's recorded
    /// lineage; the caller is talking about an unrelated tree.
    #[error("root {supplied} does not share lineage with branch head {head}")]
    LineageMismatch { supplied: FileId, head: FileId },

    /// Lineages match but the supplied root is stale: another writer has
    /// already advanced the branch.
    #[error("stale root: the branch head has advanced")]
    ConcurrencyConflict,

    /// Malformed request metadata at the boundary.
    #[error("invalid request: {0}")]
    Validation(String),

    /// An insert collided with an existing node id. The allocator is a
    /// transactional sequence, so this indicates store corruption.
    #[error("duplicate file id {0}")]
    DuplicateId(FileId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("encoding error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal marker raised by the transactional store when sled detects
    /// a conflicting transaction; the transaction boundary converts it
    /// back into a retry and it never surfaces to callers.
    #[doc(hidden)]
    #[error("transaction conflict")]
    TxConflict,
}
