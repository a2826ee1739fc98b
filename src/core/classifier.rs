//! Classifier - maps a runtime value to a kind in K, reducers first (§4.2).

use crate::core::reducers::ReducerSet;
use crate::core::value::Value;

/// The kind set K, minus `Custom` (a classified custom value carries its
/// own tag + payload, see [`Classified::Custom`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Hole,
    Undefined,
    Null,
    Bool,
    Number,
    BigInt,
    String,
    Date,
    Regex,
    Array,
    Object,
    Map,
    Set,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Hole => "Hole",
            Kind::Undefined => "Undefined",
            Kind::Null => "Null",
            Kind::Bool => "Bool",
            Kind::Number => "Number",
            Kind::BigInt => "BigInt",
            Kind::String => "String",
            Kind::Date => "Date",
            Kind::Regex => "RegExp",
            Kind::Array => "Array",
            Kind::Object => "Object",
            Kind::Map => "Map",
            Kind::Set => "Set",
        }
    }

    /// Whether a value of this kind can stand alone as a bare top-level
    /// JSON value (§4.4's "single primitive" shortcut). See `DESIGN.md`,
    /// "Bare-root shortcut scope".
    pub fn is_bare_root_kind(&self) -> bool {
        matches!(
            self,
            Kind::Null | Kind::Bool | Kind::Number | Kind::String | Kind::Undefined
        )
    }
}

/// Tag names reserved for built-in compound encodings (§6): a user tag that
/// collides with one of these is rejected rather than silently shadowing
/// the built-in shape.
pub const RESERVED_TAGS: &[&str] = &["Date", "RegExp", "BigInt", "Map", "Set", "null"];

/// The result of classifying a value: either a built-in kind, or a tagged
/// custom value (from a registered reducer, or a `Value::Custom` the caller
/// built directly).
pub enum Classified {
    Kind(Kind),
    Custom { tag: String, payload: Value },
}

/// Classifies `value`, trying every registered reducer before falling back
/// to the value's own built-in kind (§4.2 priority order).
pub fn classify(value: &Value, reducers: &ReducerSet) -> Classified {
    for (tag, reduce) in reducers.iter() {
        if let Some(payload) = reduce(value) {
            return Classified::Custom {
                tag: tag.clone(),
                payload,
            };
        }
    }

    match value {
        Value::Custom(inner) => {
            let inner = inner.borrow();
            Classified::Custom {
                tag: inner.tag.clone(),
                payload: inner.payload.clone(),
            }
        }
        Value::Hole => Classified::Kind(Kind::Hole),
        Value::Undefined => Classified::Kind(Kind::Undefined),
        Value::Null => Classified::Kind(Kind::Null),
        Value::Bool(_) => Classified::Kind(Kind::Bool),
        Value::Number(_) => Classified::Kind(Kind::Number),
        Value::BigInt(_) => Classified::Kind(Kind::BigInt),
        Value::String(_) => Classified::Kind(Kind::String),
        Value::Date(_) => Classified::Kind(Kind::Date),
        Value::Regex(_) => Classified::Kind(Kind::Regex),
        Value::Array(_) => Classified::Kind(Kind::Array),
        Value::Object(_) => Classified::Kind(Kind::Object),
        Value::Map(_) => Classified::Kind(Kind::Map),
        Value::Set(_) => Classified::Kind(Kind::Set),
    }
}

/// A number's sentinel kind, if any. `None` for ordinary finite numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberSentinel {
    PositiveInfinity,
    NegativeInfinity,
    NaN,
    NegativeZero,
}

pub fn number_sentinel(n: f64) -> Option<NumberSentinel> {
    if n.is_nan() {
        Some(NumberSentinel::NaN)
    } else if n == f64::INFINITY {
        Some(NumberSentinel::PositiveInfinity)
    } else if n == f64::NEG_INFINITY {
        Some(NumberSentinel::NegativeInfinity)
    } else if n == 0.0 && n.is_sign_negative() {
        Some(NumberSentinel::NegativeZero)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reducers::ReducerSet;

    #[test]
    fn classify_is_idempotent_for_built_in_kinds() {
        let reducers = ReducerSet::new();
        let value = Value::string("hi");
        let a = classify(&value, &reducers);
        let b = classify(&value, &reducers);
        match (a, b) {
            (Classified::Kind(ka), Classified::Kind(kb)) => assert_eq!(ka, kb),
            _ => panic!("expected Kind classification"),
        }
    }

    #[test]
    fn reducer_takes_priority_over_built_in_kind() {
        let mut reducers = ReducerSet::new();
        reducers.register("AlwaysVector", |_v: &Value| {
            Some(Value::array(vec![Value::Number(1.0), Value::Number(2.0)]))
        });
        let value = Value::date(chrono::Utc::now());
        match classify(&value, &reducers) {
            Classified::Custom { tag, .. } => assert_eq!(tag, "AlwaysVector"),
            Classified::Kind(_) => panic!("expected reducer to take priority"),
        }
    }

    #[test]
    fn number_sentinels_detected() {
        assert_eq!(number_sentinel(f64::NAN), Some(NumberSentinel::NaN));
        assert_eq!(
            number_sentinel(f64::INFINITY),
            Some(NumberSentinel::PositiveInfinity)
        );
        assert_eq!(
            number_sentinel(f64::NEG_INFINITY),
            Some(NumberSentinel::NegativeInfinity)
        );
        assert_eq!(number_sentinel(-0.0), Some(NumberSentinel::NegativeZero));
        assert_eq!(number_sentinel(0.0), None);
        assert_eq!(number_sentinel(42.0), None);
    }
}
