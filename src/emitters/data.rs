//! Data-mode emitter — a flat JSON array `[root, slot0, slot1, ...]`, or a
//! bare JSON scalar when the root qualifies for the single-primitive
//! shortcut (§4.4).
//!
//! `serde_json`'s own `Value::to_string` isn't used for the final text: it
//! doesn't escape `<`, `>`, U+2028/U+2029, so a string slot is rendered
//! through [`crate::escaper`] instead of serde's default string escaping.

use crate::core::flatten::{Flattened, Ref, Slot, Table};
use crate::escaper;

/// Renders a flattened graph as a `serde_json::Value`, for callers that
/// want the parsed tree rather than text (e.g. to embed in a larger JSON
/// document under their own control).
pub fn to_json(flattened: &Flattened) -> serde_json::Value {
    if flattened.is_bare_root() {
        return bare_value_json(flattened.root, &flattened.table);
    }
    // Invariant 1 (`F[0]` is the root) holds unconditionally for every
    // non-bare root the Flattener produces, so the table itself — with no
    // extra leading root pointer — is the wire form.
    serde_json::Value::Array(flattened.table.slots.iter().map(slot_json).collect())
}

/// Renders a flattened graph as compact JSON text, with every string
/// escaped to be safe inside an HTML `<script>` element.
pub fn stringify(flattened: &Flattened) -> String {
    let mut out = String::new();
    render(&to_json(flattened), &mut out);
    out
}

fn bare_value_json(root: Ref, table: &Table) -> serde_json::Value {
    if root >= 0 {
        let slot = table.get(root as usize).expect("root ref in range");
        // A bare number root keeps the forced-decimal form (`30.0`, not
        // `30`): without it, a root equal to one of the six reserved
        // sentinel codes (-6..=-2) would be textually indistinguishable
        // from that sentinel when `parse` reads the document back. Every
        // other bare-root kind, and every number that isn't at the bare
        // root, has no such collision to guard against.
        if let Slot::Num(n) = slot {
            serde_json::json!(n)
        } else {
            slot_json(slot)
        }
    } else {
        serde_json::json!(root)
    }
}

fn slot_json(slot: &Slot) -> serde_json::Value {
    match slot {
        Slot::Null => serde_json::Value::Null,
        Slot::Bool(b) => serde_json::Value::Bool(*b),
        Slot::Num(n) => number_literal(*n),
        Slot::Str(s) => serde_json::Value::String(s.clone()),
        Slot::BigInt(digits) => serde_json::json!(["BigInt", digits]),
        Slot::Date(iso) => serde_json::json!(["Date", iso]),
        Slot::Regex(source, Some(flags)) => serde_json::json!(["RegExp", source, flags]),
        Slot::Regex(source, None) => serde_json::json!(["RegExp", source]),
        Slot::Object(fields) => {
            let mut obj = serde_json::Map::with_capacity(fields.len());
            for (key, value_ref) in fields {
                obj.insert(key.clone(), serde_json::json!(value_ref));
            }
            serde_json::Value::Object(obj)
        }
        Slot::Array(refs) => {
            serde_json::Value::Array(refs.iter().map(|r| serde_json::json!(r)).collect())
        }
        Slot::Map(flat) => {
            let mut arr = vec![serde_json::json!("Map")];
            arr.extend(flat.iter().map(|r| serde_json::json!(r)));
            serde_json::Value::Array(arr)
        }
        Slot::Set(refs) => {
            let mut arr = vec![serde_json::json!("Set")];
            arr.extend(refs.iter().map(|r| serde_json::json!(r)));
            serde_json::Value::Array(arr)
        }
        Slot::Custom(tag, payload_ref) => serde_json::json!([tag, payload_ref]),
    }
}

/// Renders a finite number the way `emitters::code::format_number` does
/// (`30`, not `30.0`) — safe here because a slot's own content is never
/// read back as a reference code, only a bare root is (see
/// `bare_value_json`).
fn number_literal(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        serde_json::Value::Number((n as i64).into())
    } else {
        serde_json::json!(n)
    }
}

/// Hand-rolled tree walk instead of `serde_json::to_string`, so every
/// string (leaf value or object key) goes through the script-safe escaper.
fn render(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Null => out.push_str("null"),
        serde_json::Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        serde_json::Value::Number(n) => out.push_str(&n.to_string()),
        serde_json::Value::String(s) => out.push_str(&escaper::quote_json(s)),
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render(item, out);
            }
            out.push(']');
        }
        serde_json::Value::Object(fields) => {
            out.push('{');
            for (i, (key, value)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&escaper::quote_json(key));
                out.push(':');
                render(value, out);
            }
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::flatten::Flattener;
    use crate::core::reducers::ReducerSet;
    use crate::core::value::Value;
    use indexmap::indexmap;

    fn stringify_value(value: &Value) -> String {
        let flattened = Flattener::new().flatten(value, &ReducerSet::new()).unwrap();
        stringify(&flattened)
    }

    #[test]
    fn simple_object_matches_the_documented_shape() {
        let value = Value::object(indexmap! { "message".to_string() => Value::string("hello") });
        assert_eq!(stringify_value(&value), r#"[{"message":1},"hello"]"#);
    }

    #[test]
    fn bare_root_scalar_has_no_wrapping_array() {
        assert_eq!(stringify_value(&Value::string("hello")), r#""hello""#);
        assert_eq!(stringify_value(&Value::Bool(true)), "true");
        assert_eq!(stringify_value(&Value::Null), "null");
    }

    #[test]
    fn undefined_root_renders_as_its_sentinel_code() {
        assert_eq!(stringify_value(&Value::Undefined), "-2");
    }

    #[test]
    fn a_bare_number_root_keeps_its_decimal_even_when_whole() {
        // Dropped inside a table, `30` is unambiguous; as a bare root it
        // would collide with the reserved sentinel codes (-6..=-2) if
        // rendered the same way, so the bare-root path keeps the decimal.
        assert_eq!(stringify_value(&Value::Number(30.0)), "30.0");
    }

    #[test]
    fn a_bare_number_root_in_the_sentinel_range_is_not_confused_with_undefined() {
        assert_eq!(stringify_value(&Value::Number(-2.0)), "-2.0");
    }

    #[test]
    fn whole_numbers_inside_a_table_render_without_a_decimal() {
        let value = Value::array(vec![Value::Number(30.0), Value::Number(2.5)]);
        assert_eq!(stringify_value(&value), "[30,2.5]");
    }

    #[test]
    fn cyclic_object_references_its_own_slot_index() {
        let obj = Value::empty_object();
        obj.set_field("self", obj.clone());
        let rendered = stringify_value(&obj);
        assert_eq!(rendered, r#"[{"self":0}]"#);
    }

    #[test]
    fn script_breaking_strings_are_escaped_in_the_output() {
        let value = Value::string("</script><!--a-->");
        let rendered = stringify_value(&value);
        assert!(!rendered.contains("</script"));
        assert!(!rendered.contains("<!--"));
    }

    #[test]
    fn embedded_nul_and_apostrophe_render_as_valid_json_escapes() {
        // `\0` and `\'` are legal JS string escapes but not legal JSON
        // ones — the data emitter must never emit either.
        let rendered = stringify_value(&Value::string("it's\0here"));
        assert_eq!(rendered, r#""it's\u0000here""#);
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, serde_json::json!("it's\0here"));
    }

    #[test]
    fn map_renders_with_a_map_tag_and_flattened_pairs() {
        let value = Value::map_value(vec![(Value::string("a"), Value::Number(1.0))]);
        let rendered = stringify_value(&value);
        assert_eq!(rendered, r#"[["Map",1,2],"a",1]"#);
    }
}
