//! Transactional store
//!
//! [`NodeStore`] implementation over sled's transactional tree handles.
//! Every read and insert issued through this store is part of one atomic
//! unit: either every node written along a rebuilt path commits, or none
//! does. A sled-level transaction conflict is lifted into the internal
//! `TxConflict` marker, which the transaction boundary converts back into
//! a retry.

use crate::error::FsError;
use crate::store::{decode_id, id_key, SEQ_KEY};
use crate::types::{DirectoryItem, FileId, FileMetadata, FileType};
use sled::transaction::{TransactionalTree, UnabortableTransactionError};

use super::NodeStore;

pub struct TxStore<'a> {
    meta: &'a TransactionalTree,
    dirs: &'a TransactionalTree,
    blobs: &'a TransactionalTree,
    seq: &'a TransactionalTree,
}

impl<'a> TxStore<'a> {
    pub fn new(
        meta: &'a TransactionalTree,
        dirs: &'a TransactionalTree,
        blobs: &'a TransactionalTree,
        seq: &'a TransactionalTree,
    ) -> Self {
        Self {
            meta,
            dirs,
            blobs,
            seq,
        }
    }

    fn check_free(&self, id: FileId) -> Result<(), FsError> {
        if self.meta.get(id_key(id)).map_err(lift)?.is_some() {
            return Err(FsError::DuplicateId(id));
        }
        Ok(())
    }
}

fn lift(err: UnabortableTransactionError) -> FsError {
    match err {
        UnabortableTransactionError::Conflict => FsError::TxConflict,
        UnabortableTransactionError::Storage(e) => FsError::Storage(e),
    }
}

impl NodeStore for TxStore<'_> {
    fn allocate_id(&self) -> Result<FileId, FsError> {
        let current = self
            .seq
            .get(SEQ_KEY)
            .map_err(lift)?
            .as_deref()
            .map(decode_id)
            .unwrap_or(0);
        let next = current + 1;
        self.seq
            .insert(SEQ_KEY, next.to_be_bytes().to_vec())
            .map_err(lift)?;
        Ok(next)
    }

    fn put_regular_file(&self, meta: &FileMetadata, content: &[u8]) -> Result<(), FsError> {
        self.check_free(meta.id)?;
        self.meta
            .insert(&id_key(meta.id), bincode::serialize(meta)?)
            .map_err(lift)?;
        self.blobs
            .insert(&id_key(meta.id), content)
            .map_err(lift)?;
        Ok(())
    }

    fn put_directory(&self, meta: &FileMetadata, items: &[DirectoryItem]) -> Result<(), FsError> {
        self.check_free(meta.id)?;
        self.meta
            .insert(&id_key(meta.id), bincode::serialize(meta)?)
            .map_err(lift)?;
        self.dirs
            .insert(&id_key(meta.id), bincode::serialize(items)?)
            .map_err(lift)?;
        Ok(())
    }

    fn metadata(&self, id: FileId) -> Result<FileMetadata, FsError> {
        let raw = self
            .meta
            .get(id_key(id))
            .map_err(lift)?
            .ok_or(FsError::NotFound)?;
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
        let raw = self
            .dirs
            .get(id_key(id))
            .map_err(lift)?
            .ok_or(FsError::NotFound)?;
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
        let raw = self
            .blobs
            .get(id_key(id))
            .map_err(lift)?
            .ok_or(FsError::NotFound)?;
        Ok(raw.to_vec())
    }
}
