//! Tree kernel
//!
//! The two "make" primitives every mutation goes through. Each call
//! allocates a fresh id, computes the version lineage and persists one
//! new immutable node. A node derived from an existing version inherits
//! that version's `first_version_id`; a brand-new node starts a lineage
//! of its own.

use crate::error::FsError;
use crate::store::NodeStore;
use crate::types::{DirectoryItem, FileId, FileMetadata, FileType, Timestamp};

pub struct TreeKernel<'a, S: NodeStore> {
    store: &'a S,
}

impl<'a, S: NodeStore> TreeKernel<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn make_regular_file(
        &self,
        created_at: Timestamp,
        modified_at: Timestamp,
        content: &[u8],
        derived_from: Option<FileId>,
    ) -> Result<FileId, FsError> {
        let id = self.store.allocate_id()?;
        let meta = FileMetadata {
            id,
            file_type: FileType::Regular,
            created_at,
            modified_at,
            previous_version_id: derived_from,
            first_version_id: self.lineage_root(id, derived_from)?,
        };
        self.store.put_regular_file(&meta, content)?;
        Ok(id)
    }

    /// Item `created_at` values are persisted verbatim, so an entry that
    /// migrates unchanged into a new parent version keeps its timestamp.
    pub fn make_directory(
        &self,
        created_at: Timestamp,
        modified_at: Timestamp,
        items: &[DirectoryItem],
        derived_from: Option<FileId>,
    ) -> Result<FileId, FsError> {
        let id = self.store.allocate_id()?;
        let meta = FileMetadata {
            id,
            file_type: FileType::Directory,
            created_at,
            modified_at,
            previous_version_id: derived_from,
            first_version_id: self.lineage_root(id, derived_from)?,
        };
        self.store.put_directory(&meta, items)?;
        Ok(id)
    }

    fn lineage_root(&self, own_id: FileId, derived_from: Option<FileId>) -> Result<FileId, FsError> {
        match derived_from {
            Some(prev) => Ok(self.store.metadata(prev)?.first_version_id),
            None => Ok(own_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SledStore;

    fn open_store() -> (tempfile::TempDir, SledStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        (dir, SledStore::open(&db).unwrap())
    }

    #[test]
    fn new_node_starts_its_own_lineage() {
        let (_dir, store) = open_store();
        let kernel = TreeKernel::new(&store);
        let id = kernel.make_regular_file(1, 1, b"v1", None).unwrap();
        let meta = store.metadata(id).unwrap();
        assert_eq!(meta.first_version_id, id);
        assert_eq!(meta.previous_version_id, None);
    }

    #[test]
    fn derived_node_inherits_lineage() {
        let (_dir, store) = open_store();
        let kernel = TreeKernel::new(&store);
        let v1 = kernel.make_regular_file(1, 1, b"v1", None).unwrap();
        let v2 = kernel.make_regular_file(2, 2, b"v2", Some(v1)).unwrap();
        let v3 = kernel.make_regular_file(3, 3, b"v3", Some(v2)).unwrap();
        let meta = store.metadata(v3).unwrap();
        assert_eq!(meta.first_version_id, v1);
        assert_eq!(meta.previous_version_id, Some(v2));
    }

    #[test]
    fn derived_directory_inherits_lineage() {
        let (_dir, store) = open_store();
        let kernel = TreeKernel::new(&store);
        let d1 = kernel.make_directory(1, 1, &[], None).unwrap();
        let d2 = kernel.make_directory(2, 2, &[], Some(d1)).unwrap();
        assert_eq!(store.metadata(d2).unwrap().first_version_id, d1);
    }

    #[test]
    fn deriving_from_a_missing_node_fails() {
        let (_dir, store) = open_store();
        let kernel = TreeKernel::new(&store);
        assert!(matches!(
            kernel.make_regular_file(1, 1, b"x", Some(99)),
            Err(FsError::NotFound)
        ));
    }
}
