//! Pluggable reducers/revivers — a simple mapping from tag string to a pure
//! function, registered per call rather than held as process state (§9).

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::core::errors::DevalueError;
use crate::core::value::Value;

/// Turns an opaque value into a serializable payload, or returns `None` to
/// signal "not mine, try the next reducer".
pub type ReducerFn = dyn Fn(&Value) -> Option<Value>;

/// Inverse of a [`ReducerFn`]: turns a revived payload back into the
/// original value shape.
pub type ReviverFn = dyn Fn(Value) -> Result<Value, DevalueError>;

/// Ordered tag -> reducer registry. Tried in registration order, per §4.2's
/// "first reducer to return a payload wins" priority rule.
#[derive(Clone, Default)]
pub struct ReducerSet {
    entries: IndexMap<String, Rc<ReducerFn>>,
}

impl ReducerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        tag: impl Into<String>,
        reduce: impl Fn(&Value) -> Option<Value> + 'static,
    ) -> &mut Self {
        self.entries.insert(tag.into(), Rc::new(reduce));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Rc<ReducerFn>)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ReducerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducerSet")
            .field("tags", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Tag -> reviver registry, the inverse of [`ReducerSet`].
#[derive(Clone, Default)]
pub struct ReviverSet {
    entries: IndexMap<String, Rc<ReviverFn>>,
}

impl ReviverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        tag: impl Into<String>,
        revive: impl Fn(Value) -> Result<Value, DevalueError> + 'static,
    ) -> &mut Self {
        self.entries.insert(tag.into(), Rc::new(revive));
        self
    }

    pub fn get(&self, tag: &str) -> Option<&Rc<ReviverFn>> {
        self.entries.get(tag)
    }
}

impl fmt::Debug for ReviverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviverSet")
            .field("tags", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reducer_runs_in_registration_order() {
        let mut reducers = ReducerSet::new();
        reducers.register("First", |_v| None);
        reducers.register("Second", |_v| Some(Value::Null));
        let mut seen = Vec::new();
        for (tag, reduce) in reducers.iter() {
            seen.push((tag.clone(), reduce(&Value::Null).is_some()));
        }
        assert_eq!(seen, vec![("First".to_string(), false), ("Second".to_string(), true)]);
    }

    #[test]
    fn reviver_round_trips_registered_tag() {
        let mut revivers = ReviverSet::new();
        revivers.register("Vector", |payload| Ok(payload));
        let revive = revivers.get("Vector").expect("registered");
        let out = revive(Value::Number(3.0)).unwrap();
        match out {
            Value::Number(n) => assert_eq!(n, 3.0),
            _ => panic!("expected number"),
        }
        assert!(revivers.get("Missing").is_none());
    }
}
