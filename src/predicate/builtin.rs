//! Built-in type predicates over [`Value`].
//!
//! The tests are shared process-wide allocations, so installing the pack into
//! the same registry twice is a no-op rather than a `DuplicateName` error.

use std::sync::LazyLock;

use super::{PredicateFn, PredicateRegistry, test_fn};
use crate::error::GenericResult;
use crate::value::Value;

pub fn is_any(_: &Value) -> bool {
    true
}

pub fn is_null(v: &Value) -> bool {
    v.is_null()
}

pub fn is_boolean(v: &Value) -> bool {
    v.is_bool()
}

pub fn is_number(v: &Value) -> bool {
    v.is_number()
}

pub fn is_int(v: &Value) -> bool {
    v.is_integer()
}

pub fn is_float(v: &Value) -> bool {
    v.is_float()
}

pub fn is_string(v: &Value) -> bool {
    v.is_text()
}

pub fn is_array(v: &Value) -> bool {
    v.is_sequence()
}

/// Records and sequences.
pub fn is_object(v: &Value) -> bool {
    v.is_record() || v.is_sequence()
}

pub fn is_atom(v: &Value) -> bool {
    v.is_atom()
}

/// Name, note and shared test of every built-in predicate.
static BUILTINS: LazyLock<Vec<(&'static str, &'static str, PredicateFn)>> = LazyLock::new(|| {
    vec![
        ("is_any", "(always true)", test_fn(is_any)),
        ("is_null", "", test_fn(is_null)),
        ("is_boolean", "", test_fn(is_boolean)),
        ("is_number", "", test_fn(is_number)),
        ("is_int", "(number without fraction)", test_fn(is_int)),
        ("is_float", "(number with fraction)", test_fn(is_float)),
        ("is_string", "", test_fn(is_string)),
        ("is_array", "", test_fn(is_array)),
        ("is_object", "(record or sequence)", test_fn(is_object)),
        ("is_atom", "(text, number, bool or record)", test_fn(is_atom)),
    ]
});

/// The shared test registered under a built-in `name`.
pub fn builtin_test(name: &str) -> Option<PredicateFn> {
    BUILTINS
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, _, test)| test.clone())
}

/// Register every built-in predicate. Idempotent.
pub fn register_builtins(registry: &PredicateRegistry) -> GenericResult<()> {
    for (name, note, test) in BUILTINS.iter() {
        registry.register_with_note(name, note, test.clone())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn type_predicates() {
        assert!(is_string(&Value::from("hello")));
        assert!(!is_string(&Value::from(123)));
        assert!(is_object(&Value::Record(BTreeMap::new())));
        assert!(is_object(&Value::Sequence(vec![])));
        assert!(!is_object(&Value::Null));
        assert!(is_array(&Value::Sequence(vec![Value::from(1)])));
        assert!(!is_array(&Value::Record(BTreeMap::new())));
        assert!(is_any(&Value::Null));
        assert!(is_null(&Value::Null));
        assert!(!is_null(&Value::from(0)));
        assert!(is_boolean(&Value::from(false)));
        assert!(!is_boolean(&Value::from("true")));
        assert!(is_number(&Value::from(f64::NAN)));
        assert!(is_int(&Value::from(-456)));
        assert!(!is_int(&Value::from(3.25)));
        assert!(is_float(&Value::from(-0.5)));
        assert!(!is_float(&Value::from(123)));
        assert!(is_atom(&Value::from(true)));
        assert!(!is_atom(&Value::Sequence(vec![])));
    }

    #[test]
    fn registering_twice_is_idempotent() {
        let reg = PredicateRegistry::new();
        register_builtins(&reg).unwrap();
        register_builtins(&reg).unwrap();
        assert_eq!(reg.len(), 10);

        let test = builtin_test("is_number").unwrap();
        assert_eq!(reg.lookup_by_test(&test).unwrap().name(), "is_number");
    }
}
