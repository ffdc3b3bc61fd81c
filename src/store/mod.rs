//! Node store
//!
//! Append-only persistence for file node versions. Metadata, regular-file
//! bytes and per-version directory item sets live in separate sled trees,
//! keyed by big-endian file id; rows are bincode-encoded. Nodes are
//! inserted exactly once and never modified or deleted.

pub mod tx;

use crate::error::FsError;
use crate::types::{DirectoryItem, FileId, FileMetadata, FileType};
use sled::Tree;

pub(crate) const META_TREE: &str = "meta";
pub(crate) const DIRS_TREE: &str = "dirs";
pub(crate) const BLOBS_TREE: &str = "blobs";
pub(crate) const SEQ_TREE: &str = "seq";
pub(crate) const SEQ_KEY: &[u8] = b"next_file_id";

pub(crate) fn id_key(id: FileId) -> [u8; 8] {
    id.to_be_bytes()
}

pub(crate) fn decode_id(bytes: &[u8]) -> FileId {
    let mut buf = [0u8; 8];
    let len = bytes.len().min(8);
    buf[8 - len..].copy_from_slice(&bytes[bytes.len() - len..]);
    u64::from_be_bytes(buf)
}

/// Storage contract for file node versions.
///
/// Writes are insert-only; ids come from [`NodeStore::allocate_id`], which
/// must be atomic with the insert it identifies (the transactional
/// implementation runs both inside one sled transaction).
pub trait NodeStore {
    /// Produce a fresh, store-wide unique file id.
    fn allocate_id(&self) -> Result<FileId, FsError>;

    /// Persist a regular-file version. Fails with `DuplicateId` if the id
    /// already exists.
    fn put_regular_file(&self, meta: &FileMetadata, content: &[u8]) -> Result<(), FsError>;

    /// Persist a directory version with its full item set.
    fn put_directory(&self, meta: &FileMetadata, items: &[DirectoryItem]) -> Result<(), FsError>;

    fn metadata(&self, id: FileId) -> Result<FileMetadata, FsError>;

    /// Item set of a directory version. `TypeMismatch` for regular files.
    fn directory_items(&self, id: FileId) -> Result<Vec<DirectoryItem>, FsError>;

    /// Byte content of a regular-file version. `TypeMismatch` for
    /// directories.
    fn regular_content(&self, id: FileId) -> Result<Vec<u8>, FsError>;

    /// Look up a child entry by name. Directories are small; a linear scan
    /// over the decoded item set is the intended access path.
    fn find_child(&self, parent: FileId, name: &str) -> Result<DirectoryItem, FsError> {
        self.directory_items(parent)?
            .into_iter()
            .find(|item| item.name == name)
            .ok_or(FsError::NotFound)
    }
}

/// Direct (non-transactional) sled-backed store.
///
/// Serves reads and test seeding; mutating engine calls go through
/// [`tx::TxStore`] inside a transaction instead.
pub struct SledStore {
    pub(crate) meta: Tree,
    pub(crate) dirs: Tree,
    pub(crate) blobs: Tree,
    pub(crate) seq: Tree,
}

impl SledStore {
    pub fn open(db: &sled::Db) -> Result<Self, FsError> {
        Ok(Self {
            meta: db.open_tree(META_TREE)?,
            dirs: db.open_tree(DIRS_TREE)?,
            blobs: db.open_tree(BLOBS_TREE)?,
            seq: db.open_tree(SEQ_TREE)?,
        })
    }

    /// Number of node versions ever written.
    pub fn node_count(&self) -> usize {
        self.meta.len()
    }

    fn check_free(&self, id: FileId) -> Result<(), FsError> {
        if self.meta.get(id_key(id))?.is_some() {
            return Err(FsError::DuplicateId(id));
        }
        Ok(())
    }
}

impl NodeStore for SledStore {
    fn allocate_id(&self) -> Result<FileId, FsError> {
        let next = self.seq.update_and_fetch(SEQ_KEY, |old| {
            let next = old.map(decode_id).unwrap_or(0) + 1;
            Some(next.to_be_bytes().to_vec())
        })?;
        Ok(next.as_deref().map(decode_id).unwrap_or(0))
    }

    fn put_regular_file(&self, meta: &FileMetadata, content: &[u8]) -> Result<(), FsError> {
        self.check_free(meta.id)?;
        self.meta.insert(id_key(meta.id), bincode::serialize(meta)?)?;
        self.blobs.insert(id_key(meta.id), content)?;
        Ok(())
    }

    fn put_directory(&self, meta: &FileMetadata, items: &[DirectoryItem]) -> Result<(), FsError> {
        self.check_free(meta.id)?;
        self.meta.insert(id_key(meta.id), bincode::serialize(meta)?)?;
        self.dirs.insert(id_key(meta.id), bincode::serialize(items)?)?;
        Ok(())
    }

    fn metadata(&self, id: FileId) -> Result<FileMetadata, FsError> {
        let raw = self.meta.get(id_key(id))?.ok_or(FsError::NotFound)?;
        Ok(bincode::deserialize(&raw)?)
    }

    fn directory_items(&self, id: FileId) -> Result<Vec<DirectoryItem>, FsError> {
        let meta = self.metadata(id)?;
        if meta.file_type != FileType::Directory {
            return Err(FsError::TypeMismatch {
                id,
                expected: FileType::Directory,
            });
        }
        let raw = self.dirs.get(id_key(id))?.ok_or(FsError::NotFound)?;
        Ok(bincode::deserialize(&raw)?)
    }

    fn regular_content(&self, id: FileId) -> Result<Vec<u8>, FsError> {
        let meta = self.metadata(id)?;
        if meta.file_type != FileType::Regular {
            return Err(FsError::TypeMismatch {
                id,
                expected: FileType::Regular,
            });
        }
        let raw = self.blobs.get(id_key(id))?.ok_or(FsError::NotFound)?;
        Ok(raw.to_vec())
    }
}
