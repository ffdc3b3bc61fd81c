//! Notefs: Persistent Copy-on-Write File Store
//!
//! A versioned, tree-structured file store: every mutation materializes a
//! new immutable snapshot of the path from the edited node to the root,
//! while untouched subtrees are shared by id. Branches track the latest
//! snapshot and advance through an optimistic compare-and-swap.

pub mod branch;
pub mod config;
pub mod engine;
pub mod error;
pub mod fs;
pub mod kernel;
pub mod logging;
pub mod server;
pub mod store;
pub mod types;
pub mod users;
