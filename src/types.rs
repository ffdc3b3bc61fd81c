//! Core types for the versioned file store.

use serde::{Deserialize, Serialize};

/// FileId: identifies one immutable version of a node (not a logical file).
/// Monotonically assigned, never reused, never mutated after assignment.
pub type FileId = u64;

/// BranchId: identifies a named branch pointer.
pub type BranchId = u32;

/// UserId: identifies a registered user.
pub type UserId = u32;

/// Timestamp: milliseconds since the Unix epoch, supplied by callers.
pub type Timestamp = i64;

/// Node type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Regular,
    Directory,
}

/// Metadata row for one immutable node version.
///
/// `created_at` is stamped on every new version; `modified_at` tracks the
/// last edit to the node's own shape or content, so ancestors rewritten
/// only because a descendant changed keep their previous `modified_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: FileId,
    pub file_type: FileType,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
    /// The version this one was derived from by a single edit; `None` for
    /// a brand-new, non-derived node.
    pub previous_version_id: Option<FileId>,
    /// The earliest version in this node's edit lineage. Equal to `id` for
    /// a brand-new node, inherited from the derived-from node otherwise.
    pub first_version_id: FileId,
}

/// One named child reference inside a directory version.
///
/// `name` is the uniqueness key within a single directory version;
/// `created_at` is the entry's own timestamp and migrates verbatim when
/// the entry is carried unchanged into a new parent version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryItem {
    pub id: FileId,
    pub name: String,
    pub created_at: Timestamp,
}

/// Content for a brand-new leaf node.
#[derive(Debug, Clone)]
pub enum NewFileContent {
    Regular(Vec<u8>),
    Directory(Vec<DirectoryItem>),
}

/// A named pointer to the current (latest) root snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub latest_version_id: FileId,
}

/// One row of a directory listing as served to readers.
///
/// `created_at` comes from the directory entry itself, `modified_at` from
/// the child's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

/// What a read at a path yields, chosen from the stored node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileView {
    Regular(Vec<u8>),
    Directory(Vec<DirectoryEntry>),
}
