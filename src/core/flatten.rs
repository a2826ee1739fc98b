//! Flattener — walks a [`Value`] graph once and produces a [`Table`]: a flat,
//! index-addressed list of slots with every compound child replaced by a
//! [`Ref`] (§5). Cycles and sharing survive because a compound slot's index
//! is reserved *before* its children are visited, so a child that points
//! back at an ancestor sees an already-assigned index rather than recursing
//! forever.

use std::collections::HashMap;

use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::core::classifier::{classify, number_sentinel, Classified, Kind, NumberSentinel, RESERVED_TAGS};
use crate::core::errors::DevalueError;
use crate::core::path::Path;
use crate::core::reducers::ReducerSet;
use crate::core::value::{key_preview, Handle, Value};

/// An entry in a [`Table`]: either a literal payload or a reference to
/// another slot. Index fields point into the owning `Table::slots`.
pub type Ref = i64;

pub const REF_HOLE: Ref = -1;
pub const REF_UNDEFINED: Ref = -2;
pub const REF_POSITIVE_INFINITY: Ref = -3;
pub const REF_NEGATIVE_INFINITY: Ref = -4;
pub const REF_NAN: Ref = -5;
pub const REF_NEGATIVE_ZERO: Ref = -6;

fn sentinel_ref(sentinel: NumberSentinel) -> Ref {
    match sentinel {
        NumberSentinel::PositiveInfinity => REF_POSITIVE_INFINITY,
        NumberSentinel::NegativeInfinity => REF_NEGATIVE_INFINITY,
        NumberSentinel::NaN => REF_NAN,
        NumberSentinel::NegativeZero => REF_NEGATIVE_ZERO,
    }
}

/// One row of a flattened table. Never holds a nested `Value` — every child
/// is already a [`Ref`].
#[derive(Debug, Clone)]
pub enum Slot {
    Null,
    Bool(bool),
    /// Always finite (sentinels never occupy a slot, see [`sentinel_ref`]).
    Num(f64),
    Str(String),
    /// Decimal digits, sign included, no suffix.
    BigInt(String),
    /// RFC 3339 / ISO 8601.
    Date(String),
    Regex(String, Option<String>),
    Object(IndexMap<String, Ref>),
    /// May contain `REF_HOLE` entries.
    Array(Vec<Ref>),
    /// Flattened `(key, value)` pairs: `[k0, v0, k1, v1, ...]`.
    Map(Vec<Ref>),
    Set(Vec<Ref>),
    Custom(String, Ref),
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub slots: Vec<Slot>,
}

impl Table {
    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// The result of flattening a graph: where the root lives, what built-in
/// kind it classified as (`None` for a custom-tagged root — those never
/// qualify for the bare-root shortcut), and the table itself.
#[derive(Debug, Clone)]
pub struct Flattened {
    pub root: Ref,
    pub root_kind: Option<Kind>,
    pub table: Table,
}

impl Flattened {
    /// Whether the root can be emitted as a standalone JSON scalar rather
    /// than the `[root, ...slots]` wrapped form (§4.4).
    pub fn is_bare_root(&self) -> bool {
        matches!(self.root_kind, Some(kind) if kind.is_bare_root_kind())
    }
}

/// Structural dedup key for the primitive kinds Invariant 4 names: `Null`,
/// `Bool`, `Number`, `String`, `BigInt`. Everything else dedups by
/// [`Handle`] identity instead (see `DESIGN.md`).
#[derive(Clone, PartialEq, Eq, Hash)]
enum PrimitiveKey {
    Null,
    Bool(bool),
    /// IEEE-754 bit pattern of a *finite* number; sentinels never reach
    /// here (see [`sentinel_ref`]), so `+0.0` and `-0.0` bit patterns never
    /// collide with a real negative-zero sentinel.
    Number(u64),
    String(String),
    BigInt(BigInt),
}

/// Walks a [`Value`] graph and produces a [`Table`]. Stateless across calls;
/// construct one per `flatten` invocation (or reuse — it carries no
/// between-call state besides the configured depth limit).
#[derive(Debug, Clone, Copy)]
pub struct Flattener {
    max_depth: usize,
}

impl Default for Flattener {
    fn default() -> Self {
        Flattener { max_depth: 1000 }
    }
}

impl Flattener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Flattener { max_depth }
    }

    #[tracing::instrument(skip_all, fields(max_depth = self.max_depth))]
    pub fn flatten(&self, root: &Value, reducers: &ReducerSet) -> Result<Flattened, DevalueError> {
        let root_kind = match classify(root, reducers) {
            Classified::Kind(kind) => Some(kind),
            Classified::Custom { .. } => None,
        };
        let mut ctx = FlattenCtx {
            table: Vec::new(),
            identity_map: HashMap::new(),
            primitive_map: HashMap::new(),
            max_depth: self.max_depth,
        };
        let root_ref = ctx.visit(root, reducers, &Path::root(), 0)?;
        tracing::debug!(slots = ctx.table.len(), "flatten traversal complete");
        Ok(Flattened {
            root: root_ref,
            root_kind,
            table: Table { slots: ctx.table },
        })
    }
}

struct FlattenCtx {
    table: Vec<Slot>,
    identity_map: HashMap<Handle, usize>,
    primitive_map: HashMap<PrimitiveKey, usize>,
    max_depth: usize,
}

impl FlattenCtx {
    fn reserve(&mut self, handle: Handle) -> usize {
        let idx = self.table.len();
        self.table.push(Slot::Null);
        self.identity_map.insert(handle, idx);
        idx
    }

    fn intern_primitive(&mut self, key: PrimitiveKey, slot: Slot) -> Ref {
        if let Some(&idx) = self.primitive_map.get(&key) {
            return idx as Ref;
        }
        let idx = self.table.len();
        self.table.push(slot);
        self.primitive_map.insert(key, idx);
        idx as Ref
    }

    fn visit(
        &mut self,
        value: &Value,
        reducers: &ReducerSet,
        path: &Path,
        depth: usize,
    ) -> Result<Ref, DevalueError> {
        if depth > self.max_depth {
            return Err(DevalueError::invalid_input(
                format!("exceeded max depth of {}", self.max_depth),
                path.clone(),
            ));
        }

        match classify(value, reducers) {
            Classified::Custom { tag, payload } => {
                self.visit_custom(value, tag, payload, reducers, path, depth)
            }
            Classified::Kind(kind) => self.visit_kind(value, kind, reducers, path, depth),
        }
    }

    fn visit_custom(
        &mut self,
        original: &Value,
        tag: String,
        payload: Value,
        reducers: &ReducerSet,
        path: &Path,
        depth: usize,
    ) -> Result<Ref, DevalueError> {
        if RESERVED_TAGS.contains(&tag.as_str()) {
            return Err(DevalueError::unsupported_value(
                format!("Custom(\"{tag}\")"),
                path.clone(),
            ));
        }

        if let Some(handle) = original.handle() {
            if let Some(&idx) = self.identity_map.get(&handle) {
                return Ok(idx as Ref);
            }
            let idx = self.reserve(handle);
            let payload_ref = self.visit(&payload, reducers, path, depth + 1)?;
            self.table[idx] = Slot::Custom(tag, payload_ref);
            return Ok(idx as Ref);
        }

        // A reducer fired on a value with no identity of its own (e.g. a
        // primitive). There's no handle to key the identity map on, but the
        // slot still has to be reserved before its payload is visited:
        // Invariant 1 requires the root's own slot to land at index 0, and
        // the root is always the first value this Flattener visits.
        let idx = self.table.len();
        self.table.push(Slot::Null);
        let payload_ref = self.visit(&payload, reducers, path, depth + 1)?;
        self.table[idx] = Slot::Custom(tag, payload_ref);
        Ok(idx as Ref)
    }

    fn visit_kind(
        &mut self,
        value: &Value,
        kind: Kind,
        reducers: &ReducerSet,
        path: &Path,
        depth: usize,
    ) -> Result<Ref, DevalueError> {
        match kind {
            Kind::Hole => Ok(REF_HOLE),
            Kind::Undefined => Ok(REF_UNDEFINED),

            Kind::Null => Ok(self.intern_primitive(PrimitiveKey::Null, Slot::Null)),

            Kind::Bool => {
                let b = match value {
                    Value::Bool(b) => *b,
                    _ => unreachable!("classify() disagrees with Value variant"),
                };
                Ok(self.intern_primitive(PrimitiveKey::Bool(b), Slot::Bool(b)))
            }

            Kind::Number => {
                let n = match value {
                    Value::Number(n) => *n,
                    _ => unreachable!("classify() disagrees with Value variant"),
                };
                if let Some(sentinel) = number_sentinel(n) {
                    return Ok(sentinel_ref(sentinel));
                }
                Ok(self.intern_primitive(PrimitiveKey::Number(n.to_bits()), Slot::Num(n)))
            }

            Kind::BigInt => {
                let b = match value {
                    Value::BigInt(b) => b.clone(),
                    _ => unreachable!("classify() disagrees with Value variant"),
                };
                let rendered = b.to_string();
                Ok(self.intern_primitive(PrimitiveKey::BigInt(b), Slot::BigInt(rendered)))
            }

            Kind::String => {
                let s = match value {
                    Value::String(s) => s.clone(),
                    _ => unreachable!("classify() disagrees with Value variant"),
                };
                Ok(self.intern_primitive(PrimitiveKey::String(s.clone()), Slot::Str(s)))
            }

            Kind::Date => {
                let handle = value.handle().expect("Date has a handle");
                if let Some(&idx) = self.identity_map.get(&handle) {
                    return Ok(idx as Ref);
                }
                let idx = self.reserve(handle);
                let rendered = match value {
                    Value::Date(d) => d.to_rfc3339(),
                    _ => unreachable!("classify() disagrees with Value variant"),
                };
                self.table[idx] = Slot::Date(rendered);
                Ok(idx as Ref)
            }

            Kind::Regex => {
                let handle = value.handle().expect("RegExp has a handle");
                if let Some(&idx) = self.identity_map.get(&handle) {
                    return Ok(idx as Ref);
                }
                let idx = self.reserve(handle);
                let (source, flags) = match value {
                    Value::Regex(r) => (r.source.clone(), r.flags.clone()),
                    _ => unreachable!("classify() disagrees with Value variant"),
                };
                let flags = if flags.is_empty() { None } else { Some(flags) };
                self.table[idx] = Slot::Regex(source, flags);
                Ok(idx as Ref)
            }

            Kind::Array => {
                let handle = value.handle().expect("Array has a handle");
                if let Some(&idx) = self.identity_map.get(&handle) {
                    return Ok(idx as Ref);
                }
                let idx = self.reserve(handle);
                // Clone the items out before recursing: a cycle that loops
                // back through this same array would otherwise try to
                // re-borrow a `RefCell` we're still holding.
                let items = match value {
                    Value::Array(r) => r.borrow().clone(),
                    _ => unreachable!("classify() disagrees with Value variant"),
                };
                let mut refs = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    refs.push(self.visit(item, reducers, &path.child_index(i), depth + 1)?);
                }
                self.table[idx] = Slot::Array(refs);
                Ok(idx as Ref)
            }

            Kind::Object => {
                let handle = value.handle().expect("Object has a handle");
                if let Some(&idx) = self.identity_map.get(&handle) {
                    return Ok(idx as Ref);
                }
                let idx = self.reserve(handle);
                let fields = match value {
                    Value::Object(r) => r.borrow().clone(),
                    _ => unreachable!("classify() disagrees with Value variant"),
                };
                let mut out = IndexMap::with_capacity(fields.len());
                for (key, child) in fields.iter() {
                    let child_ref = self.visit(child, reducers, &path.child_field(key), depth + 1)?;
                    out.insert(key.clone(), child_ref);
                }
                self.table[idx] = Slot::Object(out);
                Ok(idx as Ref)
            }

            Kind::Map => {
                let handle = value.handle().expect("Map has a handle");
                if let Some(&idx) = self.identity_map.get(&handle) {
                    return Ok(idx as Ref);
                }
                let idx = self.reserve(handle);
                let pairs = match value {
                    Value::Map(r) => r.borrow().clone(),
                    _ => unreachable!("classify() disagrees with Value variant"),
                };
                let mut flat = Vec::with_capacity(pairs.len() * 2);
                for (k, v) in pairs.iter() {
                    // The key itself has no natural breadcrumb of its own
                    // (it isn't reached "through" anything), so it's visited
                    // at the map's own path; the value is reached via
                    // `.get(K)`, `K` being the key's rendered preview (§6).
                    let key_ref = self.visit(k, reducers, path, depth + 1)?;
                    let value_path = path.child_map_key(key_preview(k));
                    let value_ref = self.visit(v, reducers, &value_path, depth + 1)?;
                    flat.push(key_ref);
                    flat.push(value_ref);
                }
                self.table[idx] = Slot::Map(flat);
                Ok(idx as Ref)
            }

            Kind::Set => {
                let handle = value.handle().expect("Set has a handle");
                if let Some(&idx) = self.identity_map.get(&handle) {
                    return Ok(idx as Ref);
                }
                let idx = self.reserve(handle);
                let items = match value {
                    Value::Set(r) => r.borrow().clone(),
                    _ => unreachable!("classify() disagrees with Value variant"),
                };
                let mut refs = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    refs.push(self.visit(item, reducers, &path.child_index(i), depth + 1)?);
                }
                self.table[idx] = Slot::Set(refs);
                Ok(idx as Ref)
            }
        }
    }
}
