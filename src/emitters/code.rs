//! Code-mode emitter — `uneval`: a self-evaluating JS expression instead of
//! a JSON document (§4.5).
//!
//! A ref-count prepass decides which slots get hoisted to a `var`: the five
//! structurally-deduped kinds (`Null`/`Bool`/`Number`/`String`/`BigInt`) are
//! always inlined at every use site, since re-emitting the same literal
//! twice is value-identical in JS and cheaper than a variable. Everything
//! else — `Array`/`Object`/`Map`/`Set`/`Custom`/`Date`/`RegExp` — hoists once
//! its reference count reaches 2. That single rule also resolves cycles
//! without a separate detection pass: any cycle reachable from the root
//! must cross some node twice (once from the root's own path, once from
//! its cycle predecessor), so that node's count already reaches 2.
//!
//! Hoisted containers are emitted as parameters of an IIFE: each hoisted
//! slot's shell (`{}`, `Array(n)`, `new Map()`, `new Set()`, ...) is passed
//! in as a call argument, and the function body is just the populate
//! assignments followed by `return <root>` — `(function(a,b,…){
//! <assignments>; return <root>; }(<shells>))`, matching the exact shape
//! `(function(a){a.message="hello";a.self=a;return a}({}))` documents for a
//! single self-referencing object. By the time the body runs every
//! parameter is already bound (to its shell), including the one a
//! statement assigns to itself, which is what lets a cycle close.

use std::collections::{HashMap, HashSet};

use crate::core::flatten::{Flattened, Ref, Slot, Table, REF_HOLE, REF_NAN, REF_NEGATIVE_INFINITY,
    REF_NEGATIVE_ZERO, REF_POSITIVE_INFINITY, REF_UNDEFINED};
use crate::escaper;

pub fn uneval(flattened: &Flattened) -> String {
    let table = &flattened.table;
    let hoisted = hoisted_indices(table, flattened.root);

    if hoisted.is_empty() {
        return expr_for_ref(flattened.root, table, &hoisted, &HashMap::new());
    }

    let mut declare_order: Vec<usize> = hoisted.iter().copied().collect();
    declare_order.sort_unstable();
    let var_names: HashMap<usize, String> = declare_order
        .iter()
        .enumerate()
        .map(|(i, &idx)| (idx, param_name(i)))
        .collect();

    let params: Vec<&str> = declare_order.iter().map(|idx| var_names[idx].as_str()).collect();
    let shells: Vec<String> = declare_order
        .iter()
        .map(|&idx| shell_literal(&table.slots[idx], table, &hoisted, &var_names))
        .collect();

    let mut body = String::new();
    for idx in populate_order(table, &hoisted, &declare_order) {
        let name = &var_names[&idx];
        body.push_str(&populate_statements(name, &table.slots[idx], table, &hoisted, &var_names));
    }

    let root_expr = expr_for_ref(flattened.root, table, &hoisted, &var_names);
    format!("(function({}){{{}return {};}}({}))", params.join(","), body, root_expr, shells.join(","))
}

/// `a, b, ..., z, aa, ab, ...` — the parameter name for the `i`-th (0-based)
/// hoisted slot in ascending table-index order.
fn param_name(mut i: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'a' + (i % 26) as u8) as char);
        if i < 26 {
            break;
        }
        i = i / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// The order populate statements run in. Ascending table index works for
/// `Object`/`Array`/`Map`/`Set`, whose statements only ever store a
/// reference into an already-existing shell — but a hoisted `Custom`'s
/// populate statement *replaces* its parameter with the reviver's return
/// value (see `shell_literal`), so anything that reads that parameter must
/// run after the replacement, and the replacement itself must run after its
/// own payload (if hoisted) is fully populated. This topologically sorts on
/// those two edges instead of assuming index order; without it, a `Custom`
/// is always reserved before its payload (`Flattener::visit_custom`), so a
/// naive ascending pass would call the reviver with an unpopulated payload
/// or hand out the placeholder before it's replaced.
fn populate_order(table: &Table, hoisted: &HashSet<usize>, declare_order: &[usize]) -> Vec<usize> {
    let mut must_precede: HashMap<usize, Vec<usize>> = HashMap::new();
    for &idx in declare_order {
        let is_custom = matches!(table.slots[idx], Slot::Custom(_, _));
        let mut deps = Vec::new();
        for child in slot_child_refs(&table.slots[idx]) {
            if child < 0 {
                continue;
            }
            let child_idx = child as usize;
            if !hoisted.contains(&child_idx) {
                continue;
            }
            let child_is_custom = matches!(table.slots[child_idx], Slot::Custom(_, _));
            if is_custom || child_is_custom {
                deps.push(child_idx);
            }
        }
        must_precede.insert(idx, deps);
    }

    let mut visited = HashSet::new();
    let mut order = Vec::with_capacity(declare_order.len());
    for &idx in declare_order {
        visit_populate_order(idx, &must_precede, &mut visited, &mut order);
    }
    order
}

fn visit_populate_order(
    idx: usize,
    must_precede: &HashMap<usize, Vec<usize>>,
    visited: &mut HashSet<usize>,
    order: &mut Vec<usize>,
) {
    if !visited.insert(idx) {
        return;
    }
    if let Some(deps) = must_precede.get(&idx) {
        for &dep in deps {
            visit_populate_order(dep, must_precede, visited, order);
        }
    }
    order.push(idx);
}

fn is_identity_kind(slot: &Slot) -> bool {
    !matches!(
        slot,
        Slot::Null | Slot::Bool(_) | Slot::Num(_) | Slot::Str(_) | Slot::BigInt(_)
    )
}

fn slot_child_refs(slot: &Slot) -> Vec<Ref> {
    match slot {
        Slot::Object(fields) => fields.values().copied().collect(),
        Slot::Array(refs) => refs.clone(),
        Slot::Map(flat) => flat.clone(),
        Slot::Set(refs) => refs.clone(),
        Slot::Custom(_, payload) => vec![*payload],
        _ => Vec::new(),
    }
}

fn hoisted_indices(table: &Table, root: Ref) -> HashSet<usize> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    if root >= 0 {
        *counts.entry(root as usize).or_insert(0) += 1;
    }
    for slot in &table.slots {
        for r in slot_child_refs(slot) {
            if r >= 0 {
                *counts.entry(r as usize).or_insert(0) += 1;
            }
        }
    }

    table
        .slots
        .iter()
        .enumerate()
        .filter(|(idx, slot)| is_identity_kind(slot) && counts.get(idx).copied().unwrap_or(0) >= 2)
        .map(|(idx, _)| idx)
        .collect()
}

fn format_number(n: f64) -> String {
    n.to_string()
}

fn expr_for_ref(r: Ref, table: &Table, hoisted: &HashSet<usize>, var_names: &HashMap<usize, String>) -> String {
    match r {
        REF_UNDEFINED => "void 0".to_string(),
        REF_NAN => "NaN".to_string(),
        REF_POSITIVE_INFINITY => "Infinity".to_string(),
        REF_NEGATIVE_INFINITY => "-Infinity".to_string(),
        REF_NEGATIVE_ZERO => "-0".to_string(),
        REF_HOLE => unreachable!("a hole ref should only ever appear as an Array element"),
        idx if idx >= 0 => {
            let idx = idx as usize;
            if hoisted.contains(&idx) {
                var_names[&idx].clone()
            } else {
                slot_expr(&table.slots[idx], table, hoisted, var_names)
            }
        }
        other => unreachable!("unknown sentinel ref code {other}"),
    }
}

fn slot_expr(slot: &Slot, table: &Table, hoisted: &HashSet<usize>, var_names: &HashMap<usize, String>) -> String {
    match slot {
        Slot::Null => "null".to_string(),
        Slot::Bool(b) => b.to_string(),
        Slot::Num(n) => format_number(*n),
        Slot::Str(s) => escaper::quote(s),
        Slot::BigInt(digits) => format!("{digits}n"),
        Slot::Date(iso) => format!("new Date({})", escaper::quote(iso)),
        Slot::Regex(source, flags) => {
            format!("/{}/{}", escaper::escape_regex_source(source), flags.as_deref().unwrap_or(""))
        }
        Slot::Object(fields) => {
            let parts: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{}:{}", escaper::key_literal(k), expr_for_ref(*v, table, hoisted, var_names)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        Slot::Array(refs) => {
            let parts: Vec<String> = refs
                .iter()
                .map(|r| if *r == REF_HOLE { String::new() } else { expr_for_ref(*r, table, hoisted, var_names) })
                .collect();
            format!("[{}]", parts.join(","))
        }
        Slot::Map(flat) => {
            let parts: Vec<String> = flat
                .chunks(2)
                .map(|pair| {
                    format!(
                        "[{},{}]",
                        expr_for_ref(pair[0], table, hoisted, var_names),
                        expr_for_ref(pair[1], table, hoisted, var_names)
                    )
                })
                .collect();
            format!("new Map([{}])", parts.join(","))
        }
        Slot::Set(refs) => {
            let parts: Vec<String> = refs.iter().map(|r| expr_for_ref(*r, table, hoisted, var_names)).collect();
            format!("new Set([{}])", parts.join(","))
        }
        Slot::Custom(tag, payload) => format!("{}({})", reviver_callee(tag), expr_for_ref(*payload, table, hoisted, var_names)),
    }
}

/// A custom tag is assumed to name a reviver function in scope at `eval`
/// time. Non-identifier tags fall back to a `globalThis` property lookup —
/// the caller is expected to register the reviver there under that name.
fn reviver_callee(tag: &str) -> String {
    if escaper::is_identifier(tag) {
        tag.to_string()
    } else {
        format!("globalThis[{}]", escaper::quote(tag))
    }
}

/// The empty-container form a hoisted slot starts life as, passed as the
/// IIFE's argument for that parameter. `Date`/`RegExp` have no two-phase
/// construction (nothing to assign after the fact would make sense for an
/// immutable date or a regex literal) so their "shell" already is the
/// finished value. `Custom` can't build its finished value up front either
/// way — calling the reviver needs its payload already fully populated,
/// which a shared/hoisted payload isn't yet at argument-evaluation time —
/// so it starts as a placeholder and gets replaced in the populate pass.
fn shell_literal(slot: &Slot, table: &Table, hoisted: &HashSet<usize>, var_names: &HashMap<usize, String>) -> String {
    match slot {
        Slot::Object(_) => "{}".to_string(),
        Slot::Array(refs) => format!("Array({})", refs.len()),
        Slot::Map(_) => "new Map()".to_string(),
        Slot::Set(_) => "new Set()".to_string(),
        Slot::Date(_) | Slot::Regex(_, _) => slot_expr(slot, table, hoisted, var_names),
        Slot::Custom(_, _) => "null".to_string(),
        _ => unreachable!("non-identity kind should never be hoisted"),
    }
}

/// Renders `name.key` for an identifier-safe key, `name["key"]` otherwise —
/// matches `escaper::key_literal`'s choice for object-literal keys.
fn field_access(name: &str, key: &str) -> String {
    if escaper::is_identifier(key) {
        format!("{name}.{key}")
    } else {
        format!("{name}[{}]", escaper::quote(key))
    }
}

fn populate_statements(
    name: &str,
    slot: &Slot,
    table: &Table,
    hoisted: &HashSet<usize>,
    var_names: &HashMap<usize, String>,
) -> String {
    match slot {
        Slot::Object(fields) => fields
            .iter()
            .map(|(k, v)| format!("{}={};", field_access(name, k), expr_for_ref(*v, table, hoisted, var_names)))
            .collect(),
        Slot::Array(refs) => refs
            .iter()
            .enumerate()
            .filter(|(_, r)| **r != REF_HOLE)
            .map(|(i, r)| format!("{name}[{i}]={};", expr_for_ref(*r, table, hoisted, var_names)))
            .collect(),
        Slot::Map(flat) => flat
            .chunks(2)
            .map(|pair| {
                format!(
                    "{name}.set({},{});",
                    expr_for_ref(pair[0], table, hoisted, var_names),
                    expr_for_ref(pair[1], table, hoisted, var_names)
                )
            })
            .collect(),
        Slot::Set(refs) => refs
            .iter()
            .map(|r| format!("{name}.add({});", expr_for_ref(*r, table, hoisted, var_names)))
            .collect(),
        Slot::Date(_) | Slot::Regex(_, _) => String::new(),
        Slot::Custom(_, _) => format!("{name}={};", slot_expr(slot, table, hoisted, var_names)),
        _ => unreachable!("non-identity kind should never be hoisted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::flatten::Flattener;
    use crate::core::reducers::ReducerSet;
    use crate::core::value::Value;
    use indexmap::indexmap;

    fn uneval_value(value: &Value) -> String {
        let flattened = Flattener::new().flatten(value, &ReducerSet::new()).unwrap();
        uneval(&flattened)
    }

    #[test]
    fn acyclic_unshared_values_inline_with_no_iife() {
        let value = Value::object(indexmap! { "a".to_string() => Value::Number(1.0) });
        assert_eq!(uneval_value(&value), "{a:1}");
    }

    #[test]
    fn shared_array_hoists_to_a_single_parameter() {
        let shared = Value::array(vec![Value::Number(1.0)]);
        let root = Value::array(vec![shared.clone(), shared]);
        let rendered = uneval_value(&root);
        assert_eq!(rendered, "(function(a){a[0]=1;return [a,a];}(Array(1)))");
    }

    #[test]
    fn self_referencing_object_closes_the_cycle_via_populate() {
        let obj = Value::empty_object();
        obj.set_field("self", obj.clone());
        let rendered = uneval_value(&obj);
        assert_eq!(rendered, "(function(a){a.self=a;return a;}({}))");
    }

    #[test]
    fn matches_the_documented_cyclic_scenario_exactly() {
        let obj = Value::empty_object();
        obj.set_field("message", Value::string("hello"));
        obj.set_field("self", obj.clone());
        let rendered = uneval_value(&obj);
        assert_eq!(rendered, r#"(function(a){a.message="hello";a.self=a;return a;}({}))"#);
    }

    #[test]
    fn a_hoisted_custom_value_is_reassigned_after_its_shared_payload_populates() {
        let shared = Value::array(vec![Value::Number(1.0)]);
        let custom = Value::custom("Vector", shared.clone());
        let root = Value::array(vec![custom.clone(), custom, shared]);
        let rendered = uneval_value(&root);
        // The custom's table index (`a`) is always lower than its
        // payload's (`b`), since `Flattener::visit_custom` reserves its own
        // slot before visiting the payload — but `b` must still populate
        // first, or `Vector(b)` would run against an empty array.
        assert_eq!(
            rendered,
            "(function(a,b){b[0]=1;a=Vector(b);return [a,a,b];}(null,Array(1)))"
        );
    }

    #[test]
    fn array_holes_render_as_elided_elements() {
        let value = Value::array(vec![Value::Number(1.0), Value::Hole, Value::Number(3.0)]);
        assert_eq!(uneval_value(&value), "[1,,3]");
    }

    #[test]
    fn sentinels_render_as_bare_js_literals() {
        assert_eq!(
            uneval_value(&Value::array(vec![
                Value::Number(f64::NAN),
                Value::Undefined,
                Value::Number(-0.0),
            ])),
            "[NaN,void 0,-0]"
        );
    }

    #[test]
    fn bigint_renders_with_the_n_suffix() {
        let value = Value::BigInt(num_bigint::BigInt::from(42));
        assert_eq!(uneval_value(&value), "42n");
    }

    #[test]
    fn regex_source_containing_a_slash_stays_a_valid_literal() {
        let value = Value::regex("a/b", "g");
        assert_eq!(uneval_value(&value), "/a\\/b/g");
    }

    #[test]
    fn regex_source_never_leaks_script_breaking_substrings() {
        let value = Value::regex("</script><!--\u{2028}", "");
        let rendered = uneval_value(&value);
        assert!(!rendered.contains("</script"));
        assert!(!rendered.contains('<'));
        assert!(!rendered.contains('>'));
        assert!(!rendered.contains('\u{2028}'));
    }
}
