//! Versioned filesystem facade
//!
//! Public engine surface and the transaction boundary. Every mutating
//! call runs the path engine inside one sled transaction spanning the
//! metadata, directory, blob and sequence trees, so a multi-node ancestor
//! rebuild commits all-or-nothing. Reads never require a transaction:
//! node ids only become visible after their insert transaction commits.

use crate::engine::PathEngine;
use crate::error::FsError;
use crate::store::tx::TxStore;
use crate::store::{NodeStore, SledStore};
use crate::types::{
    DirectoryEntry, FileId, FileMetadata, FileType, FileView, NewFileContent, Timestamp,
};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use tracing::debug;

pub struct Notefs {
    store: SledStore,
}

impl Notefs {
    pub fn open(db: &sled::Db) -> Result<Self, FsError> {
        Ok(Self {
            store: SledStore::open(db)?,
        })
    }

    /// Walk `path` down from `root_id`; the empty path denotes the root.
    pub fn resolve_id(&self, root_id: FileId, path: &[&str]) -> Result<FileId, FsError> {
        PathEngine::new(&self.store).resolve_id(root_id, path)
    }

    pub fn metadata(&self, id: FileId) -> Result<FileMetadata, FsError> {
        self.store.metadata(id)
    }

    /// Number of node versions ever written. The store is append-only, so
    /// a failed mutation leaves this unchanged.
    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    /// Read the node at `path`: raw bytes for a regular file, a listing
    /// for a directory. The shape is chosen from the stored node type.
    pub fn file_view(&self, root_id: FileId, path: &[&str]) -> Result<FileView, FsError> {
        let id = self.resolve_id(root_id, path)?;
        match self.store.metadata(id)?.file_type {
            FileType::Regular => Ok(FileView::Regular(self.store.regular_content(id)?)),
            FileType::Directory => {
                let items = self.store.directory_items(id)?;
                let mut entries = Vec::with_capacity(items.len());
                for item in items {
                    let child = self.store.metadata(item.id)?;
                    entries.push(DirectoryEntry {
                        name: item.name,
                        file_type: child.file_type,
                        created_at: item.created_at,
                        modified_at: child.modified_at,
                    });
                }
                // item order is not semantically meaningful; serve a stable one
                entries.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(FileView::Directory(entries))
            }
        }
    }

    /// Materialize a brand-new empty directory usable as a snapshot root.
    pub fn create_root(&self, t: Timestamp) -> Result<FileId, FsError> {
        self.with_transaction(|store| PathEngine::new(store).make_empty_root(t))
    }

    /// Link an already-materialized node under `dir_path`/`name`; returns
    /// the new root id.
    pub fn create_from_id(
        &self,
        root_id: FileId,
        dir_path: &[&str],
        name: &str,
        new_id: FileId,
        t: Timestamp,
    ) -> Result<FileId, FsError> {
        debug!(root_id, name, "create from id");
        self.with_transaction(|store| {
            PathEngine::new(store).create_from_id(root_id, dir_path, name, new_id, t)
        })
    }

    /// Create a regular file at `dir_path`/`name`; returns the new root id.
    pub fn create_regular_file(
        &self,
        root_id: FileId,
        dir_path: &[&str],
        name: &str,
        content: &[u8],
        t: Timestamp,
    ) -> Result<FileId, FsError> {
        debug!(root_id, name, bytes = content.len(), "create regular file");
        let content = NewFileContent::Regular(content.to_vec());
        self.with_transaction(|store| {
            PathEngine::new(store).create_file(root_id, dir_path, name, &content, t)
        })
    }

    /// Create an empty directory at `dir_path`/`name`; returns the new
    /// root id.
    pub fn create_directory(
        &self,
        root_id: FileId,
        dir_path: &[&str],
        name: &str,
        t: Timestamp,
    ) -> Result<FileId, FsError> {
        debug!(root_id, name, "create directory");
        let content = NewFileContent::Directory(Vec::new());
        self.with_transaction(|store| {
            PathEngine::new(store).create_file(root_id, dir_path, name, &content, t)
        })
    }

    /// Remove the node at `path`; returns the new root id, or `None` for
    /// the empty path (nothing above the root to remove).
    pub fn delete_file(
        &self,
        root_id: FileId,
        path: &[&str],
        t: Timestamp,
    ) -> Result<Option<FileId>, FsError> {
        debug!(root_id, ?path, "delete file");
        self.with_transaction(|store| PathEngine::new(store).delete_file(root_id, path, t))
    }

    /// Replace the regular-file content at `path` with a new derived
    /// version; returns the new root id.
    pub fn update_file(
        &self,
        root_id: FileId,
        path: &[&str],
        content: &[u8],
        t: Timestamp,
    ) -> Result<FileId, FsError> {
        debug!(root_id, ?path, bytes = content.len(), "update file");
        self.with_transaction(|store| PathEngine::new(store).update_file(root_id, path, content, t))
    }

    /// Run `op` inside one sled transaction over the node trees. The
    /// closure may run more than once if sled detects a conflict; typed
    /// engine errors abort the transaction and surface unchanged.
    fn with_transaction<T, F>(&self, op: F) -> Result<T, FsError>
    where
        F: Fn(&TxStore<'_>) -> Result<T, FsError>,
    {
        let result = (
            &self.store.meta,
            &self.store.dirs,
            &self.store.blobs,
            &self.store.seq,
        )
            .transaction(|(meta, dirs, blobs, seq)| {
                let store = TxStore::new(meta, dirs, blobs, seq);
                op(&store).map_err(|err| match err {
                    FsError::TxConflict => ConflictableTransactionError::Conflict,
                    other => ConflictableTransactionError::Abort(other),
                })
            });
        match result {
            Ok(value) => Ok(value),
            Err(TransactionError::Abort(err)) => Err(err),
            Err(TransactionError::Storage(err)) => Err(FsError::Storage(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_fs() -> (tempfile::TempDir, Notefs) {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        (dir, Notefs::open(&db).unwrap())
    }

    #[test]
    fn failed_create_writes_nothing() {
        let (_dir, fs) = open_fs();
        let root = fs.create_root(1).unwrap();
        let r1 = fs.create_regular_file(root, &[], "a.md", b"x", 2).unwrap();
        let before = fs.node_count();
        assert!(matches!(
            fs.create_regular_file(r1, &[], "a.md", b"y", 3),
            Err(FsError::AlreadyExists(_))
        ));
        assert_eq!(fs.node_count(), before);
    }

    #[test]
    fn failed_update_writes_nothing() {
        let (_dir, fs) = open_fs();
        let root = fs.create_root(1).unwrap();
        let before = fs.node_count();
        assert!(matches!(
            fs.update_file(root, &["missing.md"], b"x", 2),
            Err(FsError::NotFound)
        ));
        assert_eq!(fs.node_count(), before);
    }

    #[test]
    fn directory_view_merges_entry_and_child_metadata() {
        let (_dir, fs) = open_fs();
        let root = fs.create_root(1).unwrap();
        let r1 = fs.create_regular_file(root, &[], "b.md", b"b", 2).unwrap();
        let r2 = fs.create_directory(r1, &[], "att", 3).unwrap();
        match fs.file_view(r2, &[]).unwrap() {
            FileView::Directory(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].name, "att");
                assert_eq!(entries[0].file_type, FileType::Directory);
                assert_eq!(entries[0].created_at, 3);
                assert_eq!(entries[1].name, "b.md");
                assert_eq!(entries[1].file_type, FileType::Regular);
                assert_eq!(entries[1].created_at, 2);
            }
            other => panic!("expected a directory view, got {other:?}"),
        }
    }

    #[test]
    fn regular_view_returns_bytes() {
        let (_dir, fs) = open_fs();
        let root = fs.create_root(1).unwrap();
        let r1 = fs
            .create_regular_file(root, &[], "a.md", b"hello", 2)
            .unwrap();
        assert_eq!(
            fs.file_view(r1, &["a.md"]).unwrap(),
            FileView::Regular(b"hello".to_vec())
        );
    }
}
