//! Diffing and committing an explicit set of paths.

pub mod conventional;
pub mod diff;
pub mod executor;
pub mod truncate;

pub use conventional::{CommitHeader, CommitType, parse_header};
pub use diff::{BINARY_PLACEHOLDER, build_diff};
pub use executor::commit;
pub use truncate::{DEFAULT_DIFF_BUDGET, truncation_marker};
