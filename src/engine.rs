//! Path engine
//!
//! Recursive path resolution and copy-on-write rebuild of ancestor
//! chains. Every mutation materializes a new version of each directory
//! from the edited node up to the root while sibling entries migrate into
//! the new versions by id (structural sharing). Path segments are
//! consumed front-to-back and never re-walked.
//!
//! Timestamp rule: every rewritten node gets `created_at = t`; the
//! directory whose own shape changed (entry added or removed) also gets
//! `modified_at = t`; ancestors rewritten only because a descendant
//! changed keep their previous `modified_at`.

use crate::error::FsError;
use crate::kernel::TreeKernel;
use crate::store::NodeStore;
use crate::types::{DirectoryItem, FileId, NewFileContent, Timestamp};

pub struct PathEngine<'a, S: NodeStore> {
    store: &'a S,
    kernel: TreeKernel<'a, S>,
}

impl<'a, S: NodeStore> PathEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            kernel: TreeKernel::new(store),
        }
    }

    /// Walk `path` down from `root_id`. The empty path denotes the root
    /// itself.
    pub fn resolve_id(&self, root_id: FileId, path: &[&str]) -> Result<FileId, FsError> {
        match path {
            [] => Ok(root_id),
            [name, rest @ ..] => {
                let child = self.store.find_child(root_id, name)?;
                self.resolve_id(child.id, rest)
            }
        }
    }

    /// Link an already-materialized node under `dir_path`/`name`, rebuilding
    /// the ancestor chain. Returns the new root id.
    pub fn create_from_id(
        &self,
        root_id: FileId,
        dir_path: &[&str],
        name: &str,
        new_id: FileId,
        t: Timestamp,
    ) -> Result<FileId, FsError> {
        let items = self.store.directory_items(root_id)?;
        match dir_path {
            [] => {
                if items.iter().any(|item| item.name == name) {
                    return Err(FsError::AlreadyExists(name.to_string()));
                }
                let mut new_items = items;
                new_items.push(DirectoryItem {
                    id: new_id,
                    name: name.to_string(),
                    created_at: t,
                });
                // this directory's own shape changed
                self.kernel.make_directory(t, t, &new_items, Some(root_id))
            }
            [next, rest @ ..] => {
                let modified_at = self.store.metadata(root_id)?.modified_at;
                let pos = position(&items, next)?;
                let new_child_id =
                    self.create_from_id(items[pos].id, rest, name, new_id, t)?;
                let mut new_items = items;
                new_items[pos].id = new_child_id;
                // descendant-only change: keep this directory's modified_at
                self.kernel
                    .make_directory(t, modified_at, &new_items, Some(root_id))
            }
        }
    }

    /// Materialize a new leaf (regular file or directory) and link it
    /// under `dir_path`/`name`. Returns the new root id.
    pub fn create_file(
        &self,
        root_id: FileId,
        dir_path: &[&str],
        name: &str,
        content: &NewFileContent,
        t: Timestamp,
    ) -> Result<FileId, FsError> {
        let leaf_id = match content {
            NewFileContent::Regular(bytes) => self.kernel.make_regular_file(t, t, bytes, None)?,
            NewFileContent::Directory(items) => self.kernel.make_directory(t, t, items, None)?,
        };
        self.create_from_id(root_id, dir_path, name, leaf_id, t)
    }

    /// Remove the node at `path`, rebuilding the ancestor chain. Returns
    /// the new root id, or `None` for the empty path: there is nothing
    /// above the root to remove, a defined terminal case, not an error.
    pub fn delete_file(
        &self,
        root_id: FileId,
        path: &[&str],
        t: Timestamp,
    ) -> Result<Option<FileId>, FsError> {
        match path {
            [] => Ok(None),
            [name, rest @ ..] => {
                let modified_at = self.store.metadata(root_id)?.modified_at;
                let items = self.store.directory_items(root_id)?;
                let pos = position(&items, name)?;
                match self.delete_file(items[pos].id, rest, t)? {
                    Some(new_child_id) => {
                        let mut new_items = items;
                        new_items[pos].id = new_child_id;
                        let new_parent = self.kernel.make_directory(
                            t,
                            modified_at,
                            &new_items,
                            Some(root_id),
                        )?;
                        Ok(Some(new_parent))
                    }
                    None => {
                        // the child itself is excised at this level
                        let mut new_items = items;
                        new_items.remove(pos);
                        let new_parent =
                            self.kernel.make_directory(t, t, &new_items, Some(root_id))?;
                        Ok(Some(new_parent))
                    }
                }
            }
        }
    }

    /// Replace the regular-file content at `path` with a new version
    /// derived from the current leaf, rebuilding the ancestor chain.
    /// Returns the new root id.
    pub fn update_file(
        &self,
        root_id: FileId,
        path: &[&str],
        content: &[u8],
        t: Timestamp,
    ) -> Result<FileId, FsError> {
        match path {
            [] => self.kernel.make_regular_file(t, t, content, Some(root_id)),
            [name, rest @ ..] => {
                let modified_at = self.store.metadata(root_id)?.modified_at;
                let items = self.store.directory_items(root_id)?;
                let pos = position(&items, name)?;
                let new_child_id = self.update_file(items[pos].id, rest, content, t)?;
                let mut new_items = items;
                new_items[pos].id = new_child_id;
                self.kernel
                    .make_directory(t, modified_at, &new_items, Some(root_id))
            }
        }
    }

    /// Materialize a brand-new empty directory usable as a snapshot root.
    pub fn make_empty_root(&self, t: Timestamp) -> Result<FileId, FsError> {
        self.kernel.make_directory(t, t, &[], None)
    }
}

fn position(items: &[DirectoryItem], name: &str) -> Result<usize, FsError> {
    items
        .iter()
        .position(|item| item.name == name)
        .ok_or(FsError::NotFound)
}
