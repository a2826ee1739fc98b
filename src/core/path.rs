//! Traversal path — the breadcrumb string attached to every error (§4.2, §6).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::escaper::is_identifier;

/// One step of a traversal path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathSegment {
    /// An object field, identifier-safe keys render as `.key`, others as
    /// `["key"]`.
    Field(String),
    /// An array or set member, rendered as `[i]`.
    Index(usize),
    /// A map value, rendered as `.get(K)` where `K` is the pre-rendered
    /// devalued form of the key.
    MapKey(String),
}

/// The breadcrumb identifying a leaf's position in the input graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Path(segments)
    }

    pub fn child_field(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Field(key.to_string()));
        Path(segments)
    }

    pub fn child_index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Path(segments)
    }

    pub fn child_map_key(&self, rendered_key: String) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::MapKey(rendered_key));
        Path(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            match segment {
                PathSegment::Field(key) if is_identifier(key) => write!(f, ".{key}")?,
                PathSegment::Field(key) => write!(f, "[\"{}\"]", key.replace('"', "\\\""))?,
                PathSegment::Index(i) => write!(f, "[{i}]")?,
                PathSegment::MapKey(rendered) => write!(f, ".get({rendered})")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_documented_error_path_example() {
        let path = Path::root()
            .child_field("object")
            .child_field("array")
            .child_index(0)
            .child_map_key("\"key\"".to_string());
        assert_eq!(path.to_string(), r#".object.array[0].get("key")"#);
    }

    #[test]
    fn quotes_non_identifier_keys() {
        let path = Path::root().child_field("not-an-ident");
        assert_eq!(path.to_string(), r#"["not-an-ident"]"#);
    }

    #[test]
    fn root_path_renders_empty() {
        assert_eq!(Path::root().to_string(), "");
    }
}
