//! Integration tests for the copy-on-write engine: snapshot round trips,
//! immutability of historical roots and structural sharing.

use notefs::error::FsError;
use notefs::fs::Notefs;
use notefs::types::{FileId, FileView};
use proptest::prelude::*;

fn open_fs() -> (tempfile::TempDir, Notefs) {
    let dir = tempfile::tempdir().unwrap();
    let db = sled::open(dir.path()).unwrap();
    (dir, Notefs::open(&db).unwrap())
}

fn read_bytes(fs: &Notefs, root: FileId, path: &[&str]) -> Vec<u8> {
    match fs.file_view(root, path).unwrap() {
        FileView::Regular(bytes) => bytes,
        other => panic!("expected a regular file at {path:?}, got {other:?}"),
    }
}

#[test]
fn create_update_delete_across_roots() {
    let (_dir, fs) = open_fs();
    let r0 = fs.create_root(0).unwrap();

    let r1 = fs.create_regular_file(r0, &[], "a.md", b"hello", 1).unwrap();
    assert_eq!(read_bytes(&fs, r1, &["a.md"]), b"hello");

    let r2 = fs.update_file(r1, &["a.md"], b"world", 2).unwrap();
    assert_eq!(read_bytes(&fs, r2, &["a.md"]), b"world");
    // the historical root still serves the pre-update content
    assert_eq!(read_bytes(&fs, r1, &["a.md"]), b"hello");

    let r3 = fs.delete_file(r2, &["a.md"], 3).unwrap().unwrap();
    assert!(matches!(
        fs.resolve_id(r3, &["a.md"]),
        Err(FsError::NotFound)
    ));
    assert_eq!(read_bytes(&fs, r2, &["a.md"]), b"world");
    assert_eq!(read_bytes(&fs, r1, &["a.md"]), b"hello");
}

#[test]
fn nested_update_preserves_old_snapshot() {
    let (_dir, fs) = open_fs();
    let r0 = fs.create_root(0).unwrap();
    let r1 = fs.create_directory(r0, &[], "notes", 1).unwrap();
    let r2 = fs
        .create_regular_file(r1, &["notes"], "draft.md", b"v1", 2)
        .unwrap();
    let r3 = fs.update_file(r2, &["notes", "draft.md"], b"v2", 3).unwrap();

    assert_eq!(read_bytes(&fs, r3, &["notes", "draft.md"]), b"v2");
    assert_eq!(read_bytes(&fs, r2, &["notes", "draft.md"]), b"v1");
}

#[test]
fn untouched_siblings_share_ids_across_roots() {
    let (_dir, fs) = open_fs();
    let r0 = fs.create_root(0).unwrap();
    let r1 = fs.create_directory(r0, &[], "a", 1).unwrap();
    let r2 = fs.create_directory(r1, &[], "b", 2).unwrap();
    let r3 = fs
        .create_regular_file(r2, &["a"], "x.md", b"x", 3)
        .unwrap();
    let r4 = fs
        .create_regular_file(r3, &["b"], "y.md", b"y", 4)
        .unwrap();

    let old_a = fs.resolve_id(r4, &["a"]).unwrap();
    let old_b = fs.resolve_id(r4, &["b"]).unwrap();
    let old_y = fs.resolve_id(r4, &["b", "y.md"]).unwrap();

    let r5 = fs.update_file(r4, &["a", "x.md"], b"x2", 5).unwrap();

    // the edited path got new ids...
    assert_ne!(fs.resolve_id(r5, &["a"]).unwrap(), old_a);
    assert_ne!(r5, r4);
    // ...while the untouched sibling subtree is shared by id
    assert_eq!(fs.resolve_id(r5, &["b"]).unwrap(), old_b);
    assert_eq!(fs.resolve_id(r5, &["b", "y.md"]).unwrap(), old_y);
}

#[test]
fn delete_keeps_remaining_entries() {
    let (_dir, fs) = open_fs();
    let r0 = fs.create_root(0).unwrap();
    let r1 = fs.create_regular_file(r0, &[], "keep.md", b"k", 1).unwrap();
    let r2 = fs.create_regular_file(r1, &[], "drop.md", b"d", 2).unwrap();

    let keep_id = fs.resolve_id(r2, &["keep.md"]).unwrap();
    let r3 = fs.delete_file(r2, &["drop.md"], 3).unwrap().unwrap();

    assert_eq!(fs.resolve_id(r3, &["keep.md"]).unwrap(), keep_id);
    assert!(matches!(
        fs.resolve_id(r3, &["drop.md"]),
        Err(FsError::NotFound)
    ));
}

#[test]
fn resolving_through_a_regular_file_is_a_type_mismatch() {
    let (_dir, fs) = open_fs();
    let r0 = fs.create_root(0).unwrap();
    let r1 = fs.create_regular_file(r0, &[], "a.md", b"a", 1).unwrap();
    assert!(matches!(
        fs.resolve_id(r1, &["a.md", "deeper"]),
        Err(FsError::TypeMismatch { .. })
    ));
}

#[test]
fn failed_operations_leave_the_store_untouched() {
    let (_dir, fs) = open_fs();
    let r0 = fs.create_root(0).unwrap();
    let r1 = fs.create_regular_file(r0, &[], "a.md", b"a", 1).unwrap();
    let count = fs.node_count();

    assert!(matches!(
        fs.create_regular_file(r1, &[], "a.md", b"dup", 2),
        Err(FsError::AlreadyExists(_))
    ));
    assert!(matches!(
        fs.delete_file(r1, &["missing.md"], 2),
        Err(FsError::NotFound)
    ));
    assert!(matches!(
        fs.update_file(r1, &["nested", "missing.md"], b"x", 2),
        Err(FsError::NotFound)
    ));
    assert_eq!(fs.node_count(), count);
}

#[test]
fn linking_an_existing_node_shares_it_between_entries() {
    let (_dir, fs) = open_fs();
    let r0 = fs.create_root(0).unwrap();
    let r1 = fs.create_regular_file(r0, &[], "a.md", b"shared", 1).unwrap();
    let node = fs.resolve_id(r1, &["a.md"]).unwrap();

    // link the same materialized node under a second name
    let r2 = fs.create_from_id(r1, &[], "alias.md", node, 2).unwrap();
    assert_eq!(fs.resolve_id(r2, &["alias.md"]).unwrap(), node);
    assert_eq!(fs.resolve_id(r2, &["a.md"]).unwrap(), node);
    assert_eq!(read_bytes(&fs, r2, &["alias.md"]), b"shared");

    assert!(matches!(
        fs.create_from_id(r2, &[], "a.md", node, 3),
        Err(FsError::AlreadyExists(_))
    ));
}

#[test]
fn update_of_the_root_itself_is_valid() {
    let (_dir, fs) = open_fs();
    let r0 = fs.create_root(0).unwrap();
    // the empty path denotes the root; updating it yields a regular file
    // derived from it
    let r1 = fs.update_file(r0, &[], b"root note", 1).unwrap();
    assert_eq!(read_bytes(&fs, r1, &[]), b"root note");
    assert_eq!(fs.metadata(r1).unwrap().first_version_id, r0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Files created under one root all resolve to their own content,
    /// under every later root.
    #[test]
    fn created_files_resolve(names in prop::collection::btree_set("[a-z]{1,8}", 1..8usize)) {
        let (_dir, fs) = open_fs();
        let mut root = fs.create_root(0).unwrap();
        for (i, name) in names.iter().enumerate() {
            root = fs
                .create_regular_file(root, &[], name, name.as_bytes(), i as i64 + 1)
                .unwrap();
        }
        for name in &names {
            prop_assert_eq!(read_bytes(&fs, root, &[name.as_str()]), name.as_bytes());
        }
    }
}
