//! Addressing nodes inside `serde_json::Value` configuration trees.

pub mod path;

pub use path::{ResolveError, Segment, TreePath};
