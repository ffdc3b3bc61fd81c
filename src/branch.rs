//! Branch registry
//!
//! Named pointers to the latest root snapshot. A branch only moves
//! through [`BranchRegistry::advance`] after a successful write, and a
//! writer may only commit against the head it started from:
//! [`BranchRegistry::validate_and_cas`] checks lineage and staleness up
//! front, and [`BranchRegistry::advance`] swaps the head atomically
//! against that same root, so a writer racing past the check still
//! cannot overwrite another writer's commit.

use crate::error::FsError;
use crate::store::{NodeStore, SledStore};
use crate::types::{Branch, BranchId, FileId};
use sled::Tree;
use tracing::info;

pub(crate) const BRANCHES_TREE: &str = "branches";

fn branch_key(id: BranchId) -> [u8; 4] {
    id.to_be_bytes()
}

pub struct BranchRegistry {
    branches: Tree,
    nodes: SledStore,
}

impl BranchRegistry {
    pub fn open(db: &sled::Db) -> Result<Self, FsError> {
        Ok(Self {
            branches: db.open_tree(BRANCHES_TREE)?,
            nodes: SledStore::open(db)?,
        })
    }

    /// Register a new branch pointing at `root_id`.
    pub fn create(&self, id: BranchId, name: &str, root_id: FileId) -> Result<(), FsError> {
        if self.branches.get(branch_key(id))?.is_some() {
            return Err(FsError::AlreadyExists(format!("branch {id}")));
        }
        let branch = Branch {
            id,
            name: name.to_string(),
            latest_version_id: root_id,
        };
        self.branches
            .insert(branch_key(id), bincode::serialize(&branch)?)?;
        info!(branch = id, name, root_id, "branch created");
        Ok(())
    }

    pub fn get(&self, id: BranchId) -> Result<Branch, FsError> {
        let raw = self.branches.get(branch_key(id))?.ok_or(FsError::NotFound)?;
        Ok(bincode::deserialize(&raw)?)
    }

    pub fn get_latest(&self, id: BranchId) -> Result<FileId, FsError> {
        Ok(self.get(id)?.latest_version_id)
    }

    /// Move the branch head from `from_root_id` to `new_root_id` after a
    /// successful write. The swap is atomic on the branch row: if another
    /// writer advanced the head since the caller validated against
    /// `from_root_id`, the move fails with `ConcurrencyConflict` and the
    /// head is left untouched.
    pub fn advance(
        &self,
        id: BranchId,
        from_root_id: FileId,
        new_root_id: FileId,
    ) -> Result<(), FsError> {
        let mut branch = self.get(id)?;
        branch.latest_version_id = from_root_id;
        let expected = bincode::serialize(&branch)?;
        branch.latest_version_id = new_root_id;
        let next = bincode::serialize(&branch)?;
        self.branches
            .compare_and_swap(branch_key(id), Some(expected), Some(next))?
            .map_err(|_| FsError::ConcurrencyConflict)?;
        info!(branch = id, old = from_root_id, new = new_root_id, "branch advanced");
        Ok(())
    }

    /// Optimistic concurrency check. The supplied root must share lineage
    /// with the branch head (same `first_version_id`); a mismatch is a
    /// hard `LineageMismatch`. With matching lineage, returns whether the
    /// supplied root still equals the head; `false` means the caller's
    /// view is stale and the write must be rejected unperformed.
    pub fn validate_and_cas(&self, id: BranchId, supplied_root: FileId) -> Result<bool, FsError> {
        let head = self.get_latest(id)?;
        let supplied_lineage = self.nodes.metadata(supplied_root)?.first_version_id;
        let head_lineage = self.nodes.metadata(head)?.first_version_id;
        if supplied_lineage != head_lineage {
            return Err(FsError::LineageMismatch {
                supplied: supplied_root,
                head,
            });
        }
        Ok(supplied_root == head)
    }

    /// [`Self::validate_and_cas`] with staleness mapped to
    /// `ConcurrencyConflict`, for callers that reject rather than retry.
    pub fn require_current(&self, id: BranchId, supplied_root: FileId) -> Result<(), FsError> {
        if self.validate_and_cas(id, supplied_root)? {
            Ok(())
        } else {
            Err(FsError::ConcurrencyConflict)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::Notefs;

    fn open_all() -> (tempfile::TempDir, Notefs, BranchRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let fs = Notefs::open(&db).unwrap();
        let registry = BranchRegistry::open(&db).unwrap();
        (dir, fs, registry)
    }

    #[test]
    fn create_and_advance() {
        let (_dir, fs, registry) = open_all();
        let root = fs.create_root(1).unwrap();
        registry.create(1, "main", root).unwrap();
        assert_eq!(registry.get_latest(1).unwrap(), root);

        let r1 = fs.create_regular_file(root, &[], "a.md", b"x", 2).unwrap();
        registry.advance(1, root, r1).unwrap();
        assert_eq!(registry.get_latest(1).unwrap(), r1);
        assert_eq!(registry.get(1).unwrap().name, "main");
    }

    #[test]
    fn duplicate_branch_id_rejected() {
        let (_dir, fs, registry) = open_all();
        let root = fs.create_root(1).unwrap();
        registry.create(1, "main", root).unwrap();
        // the collision is on the id, and the message names it
        assert!(matches!(
            registry.create(1, "other", root),
            Err(FsError::AlreadyExists(taken)) if taken == "branch 1"
        ));
    }

    #[test]
    fn cas_accepts_the_current_head_and_rejects_a_stale_one() {
        let (_dir, fs, registry) = open_all();
        let root = fs.create_root(1).unwrap();
        registry.create(1, "main", root).unwrap();

        let r1 = fs.create_regular_file(root, &[], "a.md", b"x", 2).unwrap();
        registry.advance(1, root, r1).unwrap();

        assert!(registry.validate_and_cas(1, r1).unwrap());
        // the pre-advance root shares lineage but is stale
        assert!(!registry.validate_and_cas(1, root).unwrap());
        assert!(matches!(
            registry.require_current(1, root),
            Err(FsError::ConcurrencyConflict)
        ));
    }

    #[test]
    fn unrelated_root_is_a_lineage_mismatch() {
        let (_dir, fs, registry) = open_all();
        let root = fs.create_root(1).unwrap();
        registry.create(1, "main", root).unwrap();
        let stranger = fs.create_root(2).unwrap();
        assert!(matches!(
            registry.validate_and_cas(1, stranger),
            Err(FsError::LineageMismatch { .. })
        ));
    }

    #[test]
    fn missing_branch_is_not_found() {
        let (_dir, _fs, registry) = open_all();
        assert!(matches!(registry.get_latest(9), Err(FsError::NotFound)));
    }
}
