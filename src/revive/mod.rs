//! Revive — the inverse of [`crate::emitters::data`]: turns a parsed
//! data-mode JSON document back into a [`Value`] graph (§4.6).
//!
//! Reconstruction mirrors the Flattener's own two-pass shape: a compound
//! slot gets an empty shell *before* its children are resolved, so a child
//! reference that loops back to an ancestor finds the ancestor's shell
//! already in [`SlotReader::resolved`] instead of recursing forever.

use std::collections::HashSet;

use chrono::Utc;
use num_bigint::BigInt;

use crate::core::errors::DevalueError;
use crate::core::flatten::{
    Ref, REF_HOLE, REF_NAN, REF_NEGATIVE_INFINITY, REF_NEGATIVE_ZERO, REF_POSITIVE_INFINITY,
    REF_UNDEFINED,
};
use crate::core::path::Path;
use crate::core::reducers::ReviverSet;
use crate::core::value::{key_preview, Value};

/// Parses data-mode JSON text and revives it into a [`Value`] graph.
pub fn parse(json_text: &str, revivers: &ReviverSet) -> Result<Value, DevalueError> {
    let parsed: serde_json::Value = serde_json::from_str(json_text)
        .map_err(|e| DevalueError::invalid_input(e.to_string(), Path::root()))?;
    unflatten(parsed, revivers)
}

/// Revives an already-parsed data-mode document. Exposed separately from
/// [`parse`] for callers embedding a devalue document inside a larger JSON
/// structure they've already deserialized.
pub fn unflatten(parsed: serde_json::Value, revivers: &ReviverSet) -> Result<Value, DevalueError> {
    match parsed {
        // Invariant 1: `F[0]` is the root, so the parsed array already *is*
        // the table — there's no separate leading root pointer to peel off.
        serde_json::Value::Array(slots) if !slots.is_empty() => {
            let mut reader = SlotReader::new(slots, revivers);
            reader.resolve_index(0, &Path::root())
        }
        other => bare_scalar_to_value(other),
    }
}

fn bare_scalar_to_value(json: serde_json::Value) -> Result<Value, DevalueError> {
    if let serde_json::Value::Number(n) = &json {
        if let Some(code) = n.as_i64() {
            if (REF_NEGATIVE_ZERO..=REF_UNDEFINED).contains(&code) {
                return Ok(sentinel_value(code));
            }
        }
    }
    json_scalar_to_value(json, &Path::root())
}

fn sentinel_value(code: Ref) -> Value {
    match code {
        REF_UNDEFINED => Value::Undefined,
        REF_NAN => Value::Number(f64::NAN),
        REF_POSITIVE_INFINITY => Value::Number(f64::INFINITY),
        REF_NEGATIVE_INFINITY => Value::Number(f64::NEG_INFINITY),
        REF_NEGATIVE_ZERO => Value::Number(-0.0),
        _ => unreachable!("caller already checked the sentinel range"),
    }
}

fn json_scalar_to_value(json: serde_json::Value, path: &Path) -> Result<Value, DevalueError> {
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_json::Value::Number(n) => {
            let f = n
                .as_f64()
                .ok_or_else(|| DevalueError::invalid_input("number out of range", path.clone()))?;
            Ok(Value::Number(f))
        }
        serde_json::Value::String(s) => Ok(Value::String(s)),
        other => Err(DevalueError::invalid_input(
            format!("expected a scalar slot, found {other}"),
            path.clone(),
        )),
    }
}

/// The shape a table slot's raw JSON takes, used to dispatch reconstruction.
enum SlotShape {
    Scalar,
    /// Every element is itself a reference (never a literal) — a `Value`
    /// in index position always goes through a slot of its own.
    Array(Vec<serde_json::Value>),
    Object(Vec<(String, serde_json::Value)>),
    /// `[tag, ...]` — a built-in (`Date`/`RegExp`/`BigInt`/`Map`/`Set`) or a
    /// user reducer's tag.
    Tagged(String, Vec<serde_json::Value>),
}

fn classify_slot_json(json: &serde_json::Value) -> SlotShape {
    match json {
        serde_json::Value::Array(items) => match items.first() {
            Some(serde_json::Value::String(tag)) => SlotShape::Tagged(tag.clone(), items[1..].to_vec()),
            _ => SlotShape::Array(items.clone()),
        },
        serde_json::Value::Object(fields) => {
            SlotShape::Object(fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        }
        _ => SlotShape::Scalar,
    }
}

fn as_ref(json: &serde_json::Value, path: &Path) -> Result<Ref, DevalueError> {
    json.as_i64()
        .ok_or_else(|| DevalueError::invalid_input("expected an integer reference", path.clone()))
}

/// Resolves table slot indices into `Value`s, caching each index's result so
/// sharing is reconstructed (two refs to the same index yield the same
/// `Value`, aliasing the same `Rc`) and tracking in-flight indices so a
/// cyclic reference resolves to the ancestor's shell rather than recursing.
struct SlotReader<'a> {
    slots: Vec<serde_json::Value>,
    revivers: &'a ReviverSet,
    resolved: Vec<Option<Value>>,
    in_progress: HashSet<usize>,
}

impl<'a> SlotReader<'a> {
    fn new(slots: Vec<serde_json::Value>, revivers: &'a ReviverSet) -> Self {
        let len = slots.len();
        SlotReader {
            slots,
            revivers,
            resolved: vec![None; len],
            in_progress: HashSet::new(),
        }
    }

    fn resolve(&mut self, r: Ref, path: &Path) -> Result<Value, DevalueError> {
        match r {
            REF_HOLE => Ok(Value::Hole),
            REF_UNDEFINED => Ok(Value::Undefined),
            REF_NAN => Ok(Value::Number(f64::NAN)),
            REF_POSITIVE_INFINITY => Ok(Value::Number(f64::INFINITY)),
            REF_NEGATIVE_INFINITY => Ok(Value::Number(f64::NEG_INFINITY)),
            REF_NEGATIVE_ZERO => Ok(Value::Number(-0.0)),
            idx if idx >= 0 => self.resolve_index(idx as usize, path),
            other => Err(DevalueError::invalid_input(
                format!("unknown reference code {other}"),
                path.clone(),
            )),
        }
    }

    fn resolve_index(&mut self, idx: usize, path: &Path) -> Result<Value, DevalueError> {
        if let Some(value) = &self.resolved[idx] {
            return Ok(value.clone());
        }
        if self.in_progress.contains(&idx) {
            // Only reachable for a malformed table: a well-formed one only
            // cycles back through a compound shell, which short-circuits
            // above via `self.resolved[idx]` before this check runs.
            return Err(DevalueError::cycle_in_primitive_form(path.clone()));
        }

        let json = self.slots.get(idx).cloned().ok_or_else(|| {
            DevalueError::invalid_input(format!("reference to out-of-range slot {idx}"), path.clone())
        })?;

        match classify_slot_json(&json) {
            SlotShape::Scalar => {
                let value = json_scalar_to_value(json, path)?;
                self.resolved[idx] = Some(value.clone());
                Ok(value)
            }
            SlotShape::Array(items) => {
                self.in_progress.insert(idx);
                let shell = Value::array(vec![Value::Undefined; items.len()]);
                self.resolved[idx] = Some(shell.clone());
                for (i, item_json) in items.iter().enumerate() {
                    let child_path = path.child_index(i);
                    let r = as_ref(item_json, &child_path)?;
                    let child = self.resolve(r, &child_path)?;
                    shell.set_index(i, child);
                }
                self.in_progress.remove(&idx);
                Ok(shell)
            }
            SlotShape::Object(fields) => {
                self.in_progress.insert(idx);
                let shell = Value::empty_object();
                self.resolved[idx] = Some(shell.clone());
                for (key, value_json) in fields {
                    let child_path = path.child_field(&key);
                    let r = as_ref(&value_json, &child_path)?;
                    let child = self.resolve(r, &child_path)?;
                    shell.set_field(key, child);
                }
                self.in_progress.remove(&idx);
                Ok(shell)
            }
            SlotShape::Tagged(tag, rest) => self.resolve_tagged(idx, tag, rest, path),
        }
    }

    fn resolve_tagged(
        &mut self,
        idx: usize,
        tag: String,
        rest: Vec<serde_json::Value>,
        path: &Path,
    ) -> Result<Value, DevalueError> {
        match tag.as_str() {
            "Date" => {
                let text = rest.first().and_then(|v| v.as_str()).ok_or_else(|| {
                    DevalueError::invalid_input("Date slot missing its ISO 8601 string", path.clone())
                })?;
                let dt = chrono::DateTime::parse_from_rfc3339(text)
                    .map_err(|e| DevalueError::invalid_input(format!("invalid Date: {e}"), path.clone()))?
                    .with_timezone(&Utc);
                let value = Value::date(dt);
                self.resolved[idx] = Some(value.clone());
                Ok(value)
            }
            "RegExp" => {
                let source = rest.first().and_then(|v| v.as_str()).ok_or_else(|| {
                    DevalueError::invalid_input("RegExp slot missing its source string", path.clone())
                })?;
                let flags = rest.get(1).and_then(|v| v.as_str()).unwrap_or("");
                let value = Value::regex(source, flags);
                self.resolved[idx] = Some(value.clone());
                Ok(value)
            }
            "BigInt" => {
                let digits = rest.first().and_then(|v| v.as_str()).ok_or_else(|| {
                    DevalueError::invalid_input("BigInt slot missing its digit string", path.clone())
                })?;
                let parsed: BigInt = digits
                    .parse()
                    .map_err(|e| DevalueError::invalid_input(format!("invalid BigInt: {e}"), path.clone()))?;
                let value = Value::BigInt(parsed);
                self.resolved[idx] = Some(value.clone());
                Ok(value)
            }
            "Map" => {
                self.in_progress.insert(idx);
                let shell = Value::map_value(Vec::new());
                self.resolved[idx] = Some(shell.clone());
                for pair in rest.chunks(2) {
                    let key_ref = as_ref(&pair[0], path)?;
                    let key = self.resolve(key_ref, path)?;
                    let val_path = path.child_map_key(key_preview(&key));
                    let val_ref = as_ref(&pair[1], &val_path)?;
                    let value = self.resolve(val_ref, &val_path)?;
                    shell.push_map_pair(key, value);
                }
                self.in_progress.remove(&idx);
                Ok(shell)
            }
            "Set" => {
                self.in_progress.insert(idx);
                let shell = Value::set_value(Vec::new());
                self.resolved[idx] = Some(shell.clone());
                for (i, item_json) in rest.iter().enumerate() {
                    let child_path = path.child_index(i);
                    let r = as_ref(item_json, &child_path)?;
                    let item = self.resolve(r, &child_path)?;
                    shell.push_set_item(item);
                }
                self.in_progress.remove(&idx);
                Ok(shell)
            }
            custom_tag => {
                if rest.len() != 1 {
                    return Err(DevalueError::invalid_input(
                        format!("custom tag `{custom_tag}` expects exactly one payload reference"),
                        path.clone(),
                    ));
                }
                let revive = self
                    .revivers
                    .get(custom_tag)
                    .ok_or_else(|| DevalueError::unknown_type(custom_tag, path.clone()))?
                    .clone();
                self.in_progress.insert(idx);
                let payload_ref = as_ref(&rest[0], path)?;
                let payload = self.resolve(payload_ref, path)?;
                let value = revive(payload)?;
                self.resolved[idx] = Some(value.clone());
                self.in_progress.remove(&idx);
                Ok(value)
            }
        }
    }
}
