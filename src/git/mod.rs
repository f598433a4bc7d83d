//! Git operations using git2-rs.

pub mod engine;
pub mod status;

pub use engine::{Git2Engine, VcsEngine};
pub use status::{ChangeKind, FileChange, open_work_tree, scan};
