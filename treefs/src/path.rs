//! Distributed file system paths.
//!
//! Objects of type [`DfsPath`] are used by every file system interface to
//! name files and directories. A path is an immutable, ordered sequence of
//! non-empty components; the string form is a forward-slash-delimited
//! rendering and the root directory renders as a single forward slash. The
//! forward slash is the separator and the colon is reserved as a delimiter
//! for application use, so neither may appear inside a component.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Component separator in the rendered form.
pub const SEPARATOR: char = '/';

/// Reserved delimiter, not permitted inside components.
pub const RESERVED: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path must begin with the separator")]
    NotAbsolute,
    #[error("path component is empty")]
    EmptyComponent,
    #[error("path component contains a separator or reserved character")]
    ReservedCharacter,
}

/// A path in the distributed file system.
///
/// Two paths are equal iff their component sequences are equal. All derived
/// views (parent, last component, iteration) are computed from the stored
/// sequence; a path is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct DfsPath {
    components: Vec<String>,
}

impl DfsPath {
    /// The root directory: the empty component sequence.
    pub fn root() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Parses a rendered path. The string must begin with the separator and
    /// must not contain the reserved delimiter; empty components are
    /// dropped, so `"/a//b/"` parses the same as `"/a/b"`.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if !s.starts_with(SEPARATOR) {
            return Err(PathError::NotAbsolute);
        }
        if s.contains(RESERVED) {
            return Err(PathError::ReservedCharacter);
        }
        let components = s
            .split(SEPARATOR)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self { components })
    }

    /// Returns this path extended by one component.
    pub fn child(&self, component: &str) -> Result<Self, PathError> {
        validate_component(component)?;
        let mut components = self.components.clone();
        components.push(component.to_string());
        Ok(Self { components })
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of components; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// The parent path, or `None` for the root, which has no parent.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    /// The last component, or `None` for the root, which has none.
    pub fn last(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }

    pub fn component(&self, index: usize) -> Option<&str> {
        self.components.get(index).map(String::as_str)
    }

    /// The path formed by the first `depth` components.
    pub fn prefix(&self, depth: usize) -> Self {
        Self {
            components: self.components[..depth.min(self.components.len())].to_vec(),
        }
    }

    /// Whether `prefix` is a subpath of this path: its components are a
    /// leading run of this path's components. Every path starts with itself
    /// and every path starts with the root.
    pub fn starts_with(&self, prefix: &DfsPath) -> bool {
        self.components.len() >= prefix.components.len()
            && self.components[..prefix.components.len()] == prefix.components[..]
    }

    /// Resolves the path beneath a directory of the local file system.
    pub fn to_local(&self, root: &std::path::Path) -> PathBuf {
        let mut local = root.to_path_buf();
        for component in &self.components {
            local.push(component);
        }
        local
    }
}

fn validate_component(component: &str) -> Result<(), PathError> {
    if component.is_empty() {
        return Err(PathError::EmptyComponent);
    }
    if component.contains(SEPARATOR) || component.contains(RESERVED) {
        return Err(PathError::ReservedCharacter);
    }
    Ok(())
}

impl fmt::Display for DfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "{SEPARATOR}");
        }
        for component in &self.components {
            write!(f, "{SEPARATOR}{component}")?;
        }
        Ok(())
    }
}

impl FromStr for DfsPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Vec<String>> for DfsPath {
    type Error = PathError;

    fn try_from(components: Vec<String>) -> Result<Self, Self::Error> {
        for component in &components {
            validate_component(component)?;
        }
        Ok(Self { components })
    }
}

impl From<DfsPath> for Vec<String> {
    fn from(path: DfsPath) -> Self {
        path.components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> DfsPath {
        DfsPath::parse(s).unwrap()
    }

    #[test]
    fn test_render_parse_round_trip() {
        for raw in ["/", "/a", "/a/b/c", "/with-dash/и/日本語"] {
            let path = p(raw);
            assert_eq!(DfsPath::parse(&path.to_string()).unwrap(), path);
        }
    }

    #[test]
    fn test_root_renders_as_single_separator() {
        assert_eq!(DfsPath::root().to_string(), "/");
        assert!(DfsPath::root().is_root());
        assert_eq!(p("/"), DfsPath::root());
    }

    #[test]
    fn test_empty_components_are_dropped() {
        assert_eq!(p("/a//b/"), p("/a/b"));
    }

    #[test]
    fn test_parse_rejects_relative_and_reserved() {
        assert_eq!(DfsPath::parse("a/b").unwrap_err(), PathError::NotAbsolute);
        assert_eq!(
            DfsPath::parse("/a:b").unwrap_err(),
            PathError::ReservedCharacter
        );
    }

    #[test]
    fn test_child_validates_components() {
        let base = p("/a");
        assert_eq!(base.child("b").unwrap(), p("/a/b"));
        assert_eq!(base.child("").unwrap_err(), PathError::EmptyComponent);
        assert_eq!(
            base.child("x/y").unwrap_err(),
            PathError::ReservedCharacter
        );
        assert_eq!(
            base.child("x:y").unwrap_err(),
            PathError::ReservedCharacter
        );
    }

    #[test]
    fn test_root_has_no_parent_and_no_last_component() {
        assert!(DfsPath::root().parent().is_none());
        assert!(DfsPath::root().last().is_none());
    }

    #[test]
    fn test_parent_and_last() {
        let path = p("/a/b/c");
        assert_eq!(path.parent().unwrap(), p("/a/b"));
        assert_eq!(path.last().unwrap(), "c");
        assert_eq!(p("/a").parent().unwrap(), DfsPath::root());
    }

    #[test]
    fn test_starts_with_is_reflexive_and_covers_parents() {
        let path = p("/a/b");
        assert!(path.starts_with(&path));
        assert!(path.starts_with(&path.parent().unwrap()));
        assert!(path.starts_with(&DfsPath::root()));
        assert!(!p("/ab").starts_with(&p("/a")));
        assert!(!p("/a").starts_with(&p("/a/b")));
    }

    #[test]
    fn test_prefix() {
        let path = p("/a/b/c");
        assert_eq!(path.prefix(0), DfsPath::root());
        assert_eq!(path.prefix(2), p("/a/b"));
        assert_eq!(path.prefix(9), path);
    }

    #[test]
    fn test_to_local_appends_components() {
        let local = p("/docs/report.txt").to_local(std::path::Path::new("/tmp/root"));
        assert_eq!(local, PathBuf::from("/tmp/root/docs/report.txt"));
    }

    #[test]
    fn test_component_sequence_validation_on_deserialize() {
        assert!(DfsPath::try_from(vec!["a".to_string(), "b".to_string()]).is_ok());
        assert!(DfsPath::try_from(vec!["a/b".to_string()]).is_err());
        assert!(DfsPath::try_from(vec![String::new()]).is_err());
    }
}
