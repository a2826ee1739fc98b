//! Devalue Error Types - Rich Error Handling with Traversal Paths
//!
//! Four distinct kinds, each carrying the traversal path that found the
//! offending leaf.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::core::path::Path;

/// The error kinds from §7.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum DevalueError {
    /// No native classification and no reducer match.
    #[error("cannot serialize value of kind `{kind}` at {path}")]
    UnsupportedValue { kind: String, path: Path },

    /// A tag encountered during revive has no reviver registered.
    #[error("no reviver registered for type `{tag}` at {path}")]
    UnknownType { tag: String, path: Path },

    /// The flat table is malformed: out-of-range index, wrong shape, or an
    /// unrecognized tag form.
    #[error("invalid input at {path}: {message}")]
    InvalidInput { message: String, path: Path },

    /// Internal guard: a pure primitive payload was reached by cyclic
    /// reference. Should be impossible if the table invariants hold; see
    /// `DESIGN.md`.
    #[error("cyclic reference resolved to a primitive payload at {path}")]
    CycleInPrimitiveForm { path: Path },
}

impl DevalueError {
    pub fn unsupported_value(kind: impl Into<String>, path: Path) -> Self {
        DevalueError::UnsupportedValue {
            kind: kind.into(),
            path,
        }
    }

    pub fn unknown_type(tag: impl Into<String>, path: Path) -> Self {
        DevalueError::UnknownType {
            tag: tag.into(),
            path,
        }
    }

    pub fn invalid_input(message: impl Into<String>, path: Path) -> Self {
        DevalueError::InvalidInput {
            message: message.into(),
            path,
        }
    }

    pub fn cycle_in_primitive_form(path: Path) -> Self {
        DevalueError::CycleInPrimitiveForm { path }
    }

    pub fn path(&self) -> &Path {
        match self {
            DevalueError::UnsupportedValue { path, .. } => path,
            DevalueError::UnknownType { path, .. } => path,
            DevalueError::InvalidInput { path, .. } => path,
            DevalueError::CycleInPrimitiveForm { path } => path,
        }
    }

    /// Machine-readable rendering, for the CLI's structured output mode.
    pub fn to_json(&self) -> Json {
        let (name, extra) = match self {
            DevalueError::UnsupportedValue { kind, .. } => {
                ("UnsupportedValue", serde_json::json!({ "kind": kind }))
            }
            DevalueError::UnknownType { tag, .. } => {
                ("UnknownType", serde_json::json!({ "tag": tag }))
            }
            DevalueError::InvalidInput { message, .. } => {
                ("InvalidInput", serde_json::json!({ "message": message }))
            }
            DevalueError::CycleInPrimitiveForm { .. } => {
                ("CycleInPrimitiveForm", serde_json::json!({}))
            }
        };

        serde_json::json!({
            "name": name,
            "path": self.path().to_string(),
            "message": self.to_string(),
            "details": extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::path::PathSegment;

    #[test]
    fn unsupported_value_reports_path_and_kind() {
        let path = Path::from_segments(vec![
            PathSegment::Field("object".into()),
            PathSegment::Index(0),
            PathSegment::MapKey("key".into()),
        ]);
        let err = DevalueError::unsupported_value("Function", path);
        assert_eq!(err.path().to_string(), r#".object[0].get("key")"#);
        assert!(err.to_string().contains("Function"));
    }

    #[test]
    fn to_json_includes_kind_details() {
        let err = DevalueError::unknown_type("Vector", Path::root());
        let json = err.to_json();
        assert_eq!(json["name"], "UnknownType");
        assert_eq!(json["details"]["tag"], "Vector");
    }
}
