//! devalue — serialize value graphs that ordinary JSON can't: cycles,
//! sharing, sentinel numbers, `BigInt`, `Date`, `RegExp`, `Map`, `Set`, and
//! user-defined types via pluggable reducers/revivers.
//!
//! Two output modes:
//!
//! - [`stringify`] / [`parse`] — a flat JSON document (data mode).
//! - [`uneval`] — a self-evaluating JS expression (code mode).
//!
//! [`unflatten`] is [`parse`] applied to an already-parsed
//! [`serde_json::Value`], for callers embedding a devalue document inside a
//! larger JSON structure they've already deserialized.
//!
//! # Modules
//!
//! - `core`: the value model (`Value`), the kind classifier, the
//!   traversal-path error type, the pluggable reducer/reviver registries,
//!   and the Flattener that turns a graph into a flat [`core::flatten::Table`].
//! - `emitters`: render a flattened table as JSON text (`data`) or as a
//!   self-evaluating expression (`code`).
//! - `revive`: the inverse of `emitters::data` — reconstructs a graph from a
//!   parsed flat table.
//! - `escaper`: HTML/script-safe string and identifier-key escaping, shared
//!   by both emitters.

pub mod core;
pub mod emitters;
pub mod escaper;
pub mod revive;

pub use crate::core::errors::DevalueError;
pub use crate::core::flatten::{Flattened, Flattener};
pub use crate::core::path::Path;
pub use crate::core::reducers::{ReducerSet, ReviverSet};
pub use crate::core::value::Value;

/// Code mode (§4.5, §6): renders `value` as a single self-evaluating JS
/// expression. `replacer`, if given, is tried before any built-in kind.
#[tracing::instrument(skip_all)]
pub fn uneval(value: &Value, replacer: Option<&ReducerSet>) -> Result<String, DevalueError> {
    let empty = ReducerSet::new();
    let reducers = replacer.unwrap_or(&empty);
    let flattened = Flattener::new().flatten(value, reducers)?;
    let rendered = emitters::code::uneval(&flattened);
    tracing::debug!(bytes = rendered.len(), "uneval complete");
    Ok(rendered)
}

/// Data mode (§4.4, §6): renders `value` as a flat JSON document.
#[tracing::instrument(skip_all)]
pub fn stringify(value: &Value, reducers: Option<&ReducerSet>) -> Result<String, DevalueError> {
    let empty = ReducerSet::new();
    let reducers = reducers.unwrap_or(&empty);
    let flattened = Flattener::new().flatten(value, reducers)?;
    let rendered = emitters::data::stringify(&flattened);
    tracing::debug!(slots = flattened.table.len(), "stringify complete");
    Ok(rendered)
}

/// Inverse of [`stringify`]: parses `text` as a data-mode document and
/// revives it into a [`Value`] graph.
#[tracing::instrument(skip_all)]
pub fn parse(text: &str, revivers: Option<&ReviverSet>) -> Result<Value, DevalueError> {
    let empty = ReviverSet::new();
    let revivers = revivers.unwrap_or(&empty);
    revive::parse(text, revivers)
}

/// Inverse of [`stringify`] applied to an already-parsed JSON value, for
/// documents embedded inside a larger JSON structure.
#[tracing::instrument(skip_all)]
pub fn unflatten(json: serde_json::Value, revivers: Option<&ReviverSet>) -> Result<Value, DevalueError> {
    let empty = ReviverSet::new();
    let revivers = revivers.unwrap_or(&empty);
    revive::unflatten(json, revivers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn stringify_matches_the_documented_example() {
        let value = Value::object(indexmap! { "message".to_string() => Value::string("hello") });
        assert_eq!(stringify(&value, None).unwrap(), r#"[{"message":1},"hello"]"#);
    }

    #[test]
    fn stringify_then_parse_round_trips_a_cyclic_object() {
        let obj = Value::empty_object();
        obj.set_field("self", obj.clone());
        let text = stringify(&obj, None).unwrap();
        let revived = parse(&text, None).unwrap();
        match &revived {
            Value::Object(fields) => {
                assert_eq!(fields.borrow()["self"].handle(), revived.handle());
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn uneval_matches_the_documented_cyclic_example_shape() {
        let obj = Value::empty_object();
        obj.set_field("message", Value::string("hello"));
        obj.set_field("self", obj.clone());
        let rendered = uneval(&obj, None).unwrap();
        assert!(rendered.starts_with("(function("));
        assert!(rendered.contains("self"));
    }

    #[test]
    fn uneval_with_a_custom_reducer_round_trips_through_a_matching_reviver() {
        struct Vector {
            x: f64,
            y: f64,
        }

        let vector = Vector { x: 30.0, y: 40.0 };
        let payload = Value::array(vec![Value::Number(vector.x), Value::Number(vector.y)]);

        // Match on `Null` specifically rather than unconditionally: the
        // Flattener classifies the payload through the same reducer set when
        // it visits it, and a payload with no distinguishing shape from the
        // root would re-match itself forever.
        let mut reducers = ReducerSet::new();
        reducers.register("Vector", move |v: &Value| match v {
            Value::Null => Some(payload.clone()),
            _ => None,
        });

        let root = Value::Null;
        let rendered = uneval(&root, Some(&reducers)).unwrap();
        assert_eq!(rendered, "Vector([30,40])");
    }

    #[test]
    fn a_custom_tag_colliding_with_a_builtin_is_rejected_with_its_path() {
        let leaf = Value::custom("Date", Value::string("2024"));
        let array = Value::array(vec![Value::Null, leaf]);
        let err = stringify(&array, None).unwrap_err();
        assert!(matches!(err, DevalueError::UnsupportedValue { .. }));
        assert_eq!(err.path().to_string(), "[1]");
    }

    #[test]
    fn unknown_type_is_reported_when_revive_has_no_matching_reviver() {
        let payload = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let value = Value::custom("Vector", payload);
        let text = uneval(&value, None);
        assert!(text.is_ok());

        let mut reducers = ReducerSet::new();
        reducers.register("Vector", |v: &Value| match v {
            Value::Custom(inner) => Some(inner.borrow().payload.clone()),
            _ => None,
        });
        let data_text = stringify(&value, Some(&reducers)).unwrap();
        let err = parse(&data_text, None).unwrap_err();
        assert!(matches!(err, DevalueError::UnknownType { .. }));
    }
}
