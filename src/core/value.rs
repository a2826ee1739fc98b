//! The value graph's kind set K.
//!
//! `Value` is a single tagged enum standing in for the dynamically-typed
//! values a scripting-language host would hand this library. Compound
//! variants carry an `Rc`-backed [`Handle`] so the Flattener and Emitter-Code
//! can detect sharing and cycles by reference identity, the same way a host
//! language's `Map`/`WeakMap` keyed by object identity would.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use num_bigint::BigInt;

/// A container shared by reference. Cloning a `Value::Array`/`Object`/… clones
/// the `Rc`, not the contents — exactly the aliasing a host language gives a
/// caller who writes `let b = a;` on a compound value.
pub type Shared<T> = Rc<RefCell<T>>;

fn shared<T>(v: T) -> Shared<T> {
    Rc::new(RefCell::new(v))
}

/// Reference-identity token for a compound value, derived from the address
/// of its backing allocation. Two `Value`s with the same `Handle` are the
/// same node in the graph; this is the crate's stand-in for a host
/// language's object identity (see `DESIGN.md`, "Reference identity in
/// Rust").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub usize);

fn handle_of<T>(rc: &Rc<RefCell<T>>) -> Handle {
    Handle(Rc::as_ptr(rc) as *const () as usize)
}

/// Source pattern and flags of a regular expression. Stored as text only —
/// this crate never compiles or executes patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexLiteral {
    pub source: String,
    pub flags: String,
}

/// Tag + payload of a user-extension value, produced by a reducer and
/// consumed by the matching reviver.
#[derive(Debug, Clone)]
pub struct CustomValue {
    pub tag: String,
    pub payload: Value,
}

/// A value in the graph being serialized.
///
/// Every variant maps onto one entry of the handled kind set. Compound
/// variants wrap a [`Shared`] container so that distinct `Value`s can alias
/// the same allocation (sharing) or point back into themselves (cycles).
#[derive(Debug, Clone)]
pub enum Value {
    /// A missing array element (`i in arr === false` in host terms). Never
    /// meaningful outside an `Array`'s items.
    Hole,
    /// An explicit absent value: an object field, map/set member, or array
    /// element that is present but holds no value.
    Undefined,
    Null,
    Bool(bool),
    /// IEEE-754 double, including the sentinel bit patterns (NaN, ±Inf, -0).
    Number(f64),
    BigInt(BigInt),
    String(String),
    Date(Rc<DateTime<Utc>>),
    Regex(Rc<RegexLiteral>),
    /// Ordered, length-preserving; entries may be `Value::Hole`.
    Array(Shared<Vec<Value>>),
    /// Insertion-ordered string-keyed record.
    Object(Shared<IndexMap<String, Value>>),
    /// Ordered sequence of (key, value) pairs; keys may be any `Value`.
    Map(Shared<Vec<(Value, Value)>>),
    /// Ordered sequence of distinct values.
    Set(Shared<Vec<Value>>),
    Custom(Shared<CustomValue>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(shared(items))
    }

    pub fn object(fields: IndexMap<String, Value>) -> Value {
        Value::Object(shared(fields))
    }

    pub fn empty_object() -> Value {
        Value::object(IndexMap::new())
    }

    pub fn map_value(pairs: Vec<(Value, Value)>) -> Value {
        Value::Map(shared(pairs))
    }

    /// Builds a `Set`, dropping later duplicates so the stored sequence
    /// satisfies the "distinct values" invariant. Primitive members dedup
    /// structurally (same rule the Flattener uses for primitive slots);
    /// compound members dedup by [`Handle`] identity. See `DESIGN.md`.
    pub fn set_value(items: impl IntoIterator<Item = Value>) -> Value {
        let mut out: Vec<Value> = Vec::new();
        'items: for item in items {
            for existing in &out {
                if values_trivially_equal(existing, &item) {
                    continue 'items;
                }
            }
            out.push(item);
        }
        Value::Set(shared(out))
    }

    pub fn date(dt: DateTime<Utc>) -> Value {
        Value::Date(Rc::new(dt))
    }

    pub fn regex(source: impl Into<String>, flags: impl Into<String>) -> Value {
        Value::Regex(Rc::new(RegexLiteral {
            source: source.into(),
            flags: flags.into(),
        }))
    }

    pub fn custom(tag: impl Into<String>, payload: Value) -> Value {
        Value::Custom(shared(CustomValue {
            tag: tag.into(),
            payload,
        }))
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    /// Reference-identity token for compound kinds; `None` for anything that
    /// dedups structurally or carries no children (see Invariant 4).
    pub fn handle(&self) -> Option<Handle> {
        match self {
            Value::Array(r) => Some(handle_of(r)),
            Value::Object(r) => Some(handle_of(r)),
            Value::Map(r) => Some(handle_of(r)),
            Value::Set(r) => Some(handle_of(r)),
            Value::Custom(r) => Some(handle_of(r)),
            Value::Date(r) => Some(Handle(Rc::as_ptr(r) as *const () as usize)),
            Value::Regex(r) => Some(Handle(Rc::as_ptr(r) as *const () as usize)),
            _ => None,
        }
    }

    /// Mutates an `Object` in place, for building cyclic graphs
    /// (`obj.self = obj`). Panics if called on a non-`Object` value.
    pub fn set_field(&self, key: impl Into<String>, value: Value) {
        match self {
            Value::Object(r) => {
                r.borrow_mut().insert(key.into(), value);
            }
            other => panic!("set_field called on non-object value: {other:?}"),
        }
    }

    /// Mutates an `Array` element in place, for building cyclic graphs.
    /// Panics if called on a non-`Array` value or an out-of-range index.
    pub fn set_index(&self, index: usize, value: Value) {
        match self {
            Value::Array(r) => {
                let mut items = r.borrow_mut();
                assert!(index < items.len(), "set_index out of range");
                items[index] = value;
            }
            other => panic!("set_index called on non-array value: {other:?}"),
        }
    }

    pub fn is_hole(&self) -> bool {
        matches!(self, Value::Hole)
    }

    /// Appends a pair to a `Map` in place, for reviving a `Map` whose key or
    /// value cyclically references the map itself. Panics on a non-`Map`
    /// value.
    pub fn push_map_pair(&self, key: Value, value: Value) {
        match self {
            Value::Map(r) => r.borrow_mut().push((key, value)),
            other => panic!("push_map_pair called on non-map value: {other:?}"),
        }
    }

    /// Appends an item to a `Set` in place, for reviving a `Set` whose
    /// member cyclically references the set itself. Panics on a non-`Set`
    /// value. Unlike [`Value::set_value`] this never dedups — the input
    /// table is trusted to already hold distinct members.
    pub fn push_set_item(&self, item: Value) {
        match self {
            Value::Set(r) => r.borrow_mut().push(item),
            other => panic!("push_set_item called on non-set value: {other:?}"),
        }
    }

    /// Builds a `Value` from a plain `serde_json::Value`, for callers (the
    /// CLI binary, tests) that only need the kinds ordinary JSON can already
    /// express: `Null`/`Bool`/`Number`/`String`/`Array`/`Object`. A JSON
    /// document has no way to spell a cycle, a sentinel number, `BigInt`,
    /// `Date`, `RegExp`, `Map`, `Set`, or `Custom`, so those kinds are only
    /// reachable through the constructors above.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => {
                let mut out = IndexMap::with_capacity(fields.len());
                for (k, v) in fields {
                    out.insert(k, Value::from_json(v));
                }
                Value::object(out)
            }
        }
    }
}

impl fmt::Debug for RegexLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

/// A cheap, cycle-unsafe equality used only to dedup `Set` members supplied
/// in one call to `Value::set_value`. It is intentionally shallow for
/// compound values (identity, not deep structural comparison) so it can
/// never walk into a cycle. See `DESIGN.md`, "structural vs. identity dedup".
fn values_trivially_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Hole, Value::Hole) | (Value::Undefined, Value::Undefined) => true,
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x.to_bits() == y.to_bits(),
        (Value::BigInt(x), Value::BigInt(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        _ => match (a.handle(), b.handle()) {
            (Some(ha), Some(hb)) => ha == hb,
            _ => false,
        },
    }
}

/// Renders a map key compactly for a `.get(K)` path breadcrumb (§4.2, §6).
/// This is a diagnostic-only preview, not a devalue encoding — compound
/// keys collapse to their kind name rather than a full recursive render,
/// since the point is naming the offending leaf, not reproducing the key.
pub(crate) fn key_preview(key: &Value) -> String {
    match key {
        Value::Hole | Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_nan() {
                "NaN".to_string()
            } else if *n == f64::INFINITY {
                "Infinity".to_string()
            } else if *n == f64::NEG_INFINITY {
                "-Infinity".to_string()
            } else if *n == 0.0 && n.is_sign_negative() {
                "-0".to_string()
            } else {
                n.to_string()
            }
        }
        Value::BigInt(b) => format!("{b}n"),
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Value::Date(_) => "Date".to_string(),
        Value::Regex(_) => "RegExp".to_string(),
        Value::Array(_) => "Array".to_string(),
        Value::Object(_) => "Object".to_string(),
        Value::Map(_) => "Map".to_string(),
        Value::Set(_) => "Set".to_string(),
        Value::Custom(_) => "Custom".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_drops_structural_duplicates() {
        let set = Value::set_value(vec![Value::Number(1.0), Value::Number(1.0), Value::Number(2.0)]);
        match set {
            Value::Set(items) => assert_eq!(items.borrow().len(), 2),
            other => panic!("expected set, got {other:?}"),
        }
    }

    #[test]
    fn cloning_a_compound_value_shares_the_handle() {
        let a = Value::array(vec![Value::Null]);
        let b = a.clone();
        assert_eq!(a.handle(), b.handle());
    }

    #[test]
    fn from_json_builds_an_object_graph() {
        let json = serde_json::json!({"a": [1, "two", null, true]});
        match Value::from_json(json) {
            Value::Object(fields) => {
                let fields = fields.borrow();
                match &fields["a"] {
                    Value::Array(items) => assert_eq!(items.borrow().len(), 4),
                    other => panic!("expected array, got {other:?}"),
                }
            }
            other => panic!("expected object, got {other:?}"),
        }
    }
}
