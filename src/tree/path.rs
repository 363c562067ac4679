//! Addressing a location inside a configuration tree.
//!
//! A `TreePath` is the ordered list of map keys and sequence indices that
//! leads from the document root to one node.  Paths are recorded while
//! stripping and resolved again while patching, so they must stay valid
//! as long as the remote step preserves the shape of every ancestor.

use std::fmt;

use serde_json::Value;

/// One step of a `TreePath`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// Where resolution of a path stopped.
///
/// `depth` is the index of the first segment that could not be followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveError {
    pub depth: usize,
}

/// An ordered sequence of keys/indices from the root to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TreePath(Vec<Segment>);

impl TreePath {
    /// The empty path, addressing the root itself.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// A copy of this path extended by a map key.
    pub fn key(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.0.push(Segment::Key(key.to_string()));
        next
    }

    /// A copy of this path extended by a sequence index.
    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.push(Segment::Index(index));
        next
    }

    /// This path followed by every segment of `tail`.
    pub fn join(&self, tail: &TreePath) -> Self {
        let mut next = self.clone();
        next.0.extend_from_slice(&tail.0);
        next
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The path with its last segment removed, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    /// Whether `prefix` is an ancestor of (or equal to) this path.
    pub fn starts_with(&self, prefix: &TreePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Follow the path through `root`.
    pub fn resolve<'a>(&self, root: &'a Value) -> Result<&'a Value, ResolveError> {
        let mut node = root;
        for (depth, segment) in self.0.iter().enumerate() {
            node = match (segment, node) {
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                (Segment::Index(index), Value::Array(items)) => items.get(*index),
                _ => None,
            }
            .ok_or(ResolveError { depth })?;
        }
        Ok(node)
    }

    /// Follow the path through `root`, yielding a mutable reference.
    pub fn resolve_mut<'a>(
        &self,
        root: &'a mut Value,
    ) -> Result<&'a mut Value, ResolveError> {
        let mut node = root;
        for (depth, segment) in self.0.iter().enumerate() {
            node = match (segment, node) {
                (Segment::Key(key), Value::Object(map)) => map.get_mut(key),
                (Segment::Index(index), Value::Array(items)) => items.get_mut(*index),
                _ => None,
            }
            .ok_or(ResolveError { depth })?;
        }
        Ok(node)
    }

    /// Re-root this path: if it starts with `from`, swap that prefix for
    /// `onto`.  Returns `None` when `from` is not a prefix.
    pub fn rebind(&self, from: &TreePath, onto: &TreePath) -> Option<Self> {
        if !self.starts_with(from) {
            return None;
        }
        let mut segments = onto.0.clone();
        segments.extend_from_slice(&self.0[from.len()..]);
        Some(Self(segments))
    }
}

impl<S: Into<Segment>> FromIterator<S> for TreePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("$");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "app_profile_list": [
                { "name": "Default", "variable_list": [ { "name": "a" }, { "name": "b" } ] }
            ]
        })
    }

    #[test]
    fn resolves_nested_keys_and_indices() {
        let path = TreePath::root()
            .key("app_profile_list")
            .index(0)
            .key("variable_list")
            .index(1);
        let tree = doc();
        assert_eq!(path.resolve(&tree).unwrap()["name"], "b");
    }

    #[test]
    fn reports_depth_of_missing_segment() {
        let path = TreePath::root()
            .key("app_profile_list")
            .index(3)
            .key("variable_list");
        assert_eq!(path.resolve(&doc()), Err(ResolveError { depth: 1 }));
    }

    #[test]
    fn key_against_array_does_not_resolve() {
        let path = TreePath::root().key("app_profile_list").key("name");
        assert_eq!(path.resolve(&doc()), Err(ResolveError { depth: 1 }));
    }

    #[test]
    fn resolve_mut_allows_writes() {
        let mut tree = doc();
        let path = ["app_profile_list"]
            .into_iter()
            .collect::<TreePath>()
            .index(0)
            .key("name");
        *path.resolve_mut(&mut tree).unwrap() = json!("Renamed");
        assert_eq!(tree["app_profile_list"][0]["name"], "Renamed");
    }

    #[test]
    fn rebind_swaps_prefix() {
        let inner = TreePath::root()
            .key("task_definition_list")
            .index(2)
            .key("attrs");
        let from = TreePath::root();
        let onto = TreePath::root().key("runbook");
        assert_eq!(
            inner.rebind(&from, &onto).unwrap().to_string(),
            "runbook.task_definition_list[2].attrs"
        );

        let other = TreePath::root().key("elsewhere");
        assert!(inner.rebind(&other, &onto).is_none());
    }

    #[test]
    fn starts_with_matches_whole_segments() {
        let path = TreePath::root().key("app_profile_list").index(0).key("name");
        assert!(path.starts_with(&TreePath::root()));
        assert!(path.starts_with(&TreePath::root().key("app_profile_list").index(0)));
        assert!(path.starts_with(&path));
        assert!(!path.starts_with(&TreePath::root().key("app_profile_list").index(1)));
        assert!(!path.starts_with(&TreePath::root().key("app_profile")));
        assert!(!TreePath::root().starts_with(&path));
    }

    #[test]
    fn display_and_parent() {
        let path = TreePath::root()
            .key("credential_definition_list")
            .index(0)
            .key("secret");
        assert_eq!(path.to_string(), "credential_definition_list[0].secret");
        assert_eq!(path.parent().unwrap().to_string(), "credential_definition_list[0]");
        assert_eq!(TreePath::root().to_string(), "$");
        assert!(TreePath::root().parent().is_none());
    }
}
