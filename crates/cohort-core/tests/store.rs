use cohort_core::error::CoreError;
use cohort_core::store::PathStore;
use proptest::prelude::*;
use serde_json::{Value, json};

#[test]
fn set_creates_intermediate_levels() {
    let mut store = PathStore::new();
    store.set("file.info.forms.json.momdem", 1).unwrap();

    assert_eq!(store.get("file.info.forms.json.momdem"), Some(&json!(1)));
    assert!(store.get("file.info.forms").unwrap().is_object());
}

#[test]
fn setting_through_a_leaf_is_a_collision() {
    let mut store = PathStore::new();
    store.set("file.info.visitdate", "2020-01-01").unwrap();

    let err = store.set("file.info.visitdate.year", 2020).unwrap_err();
    match err {
        CoreError::KeyCollision { path, leaf } => {
            assert_eq!(path, "file.info.visitdate.year");
            assert_eq!(leaf, "file.info.visitdate");
        }
        other => panic!("expected KeyCollision, got {other:?}"),
    }
    assert_eq!(store.get("file.info.visitdate"), Some(&json!("2020-01-01")));
}

#[test]
fn falsy_values_are_present() {
    let mut store = PathStore::new();
    store.set("a.zero", 0).unwrap();
    store.set("a.empty", "").unwrap();
    store.set("a.list", json!([])).unwrap();
    store.set("a.null", Value::Null).unwrap();

    for path in ["a.zero", "a.empty", "a.list", "a.null"] {
        assert!(store.contains(path), "{path} should be present");
    }
    assert!(!store.contains("a.never"));
    assert!(!store.contains("b.never"));
}

#[test]
fn get_through_a_leaf_is_absent() {
    let mut store = PathStore::new();
    store.set("a.b", 1).unwrap();
    assert_eq!(store.get("a.b.c"), None);
}

#[test]
fn malformed_paths_are_rejected() {
    let mut store = PathStore::new();
    assert!(matches!(store.set("a..b", 1), Err(CoreError::InvalidField(_))));
    assert!(matches!(store.set("", 1), Err(CoreError::InvalidField(_))));
    assert!(!store.contains("a..b"));
}

#[test]
fn delete_removes_leaf_and_subtree() {
    let mut store = PathStore::new();
    store.set("a.b.c", 1).unwrap();
    store.set("a.b.d", 2).unwrap();
    store.set("a.e", 3).unwrap();

    assert_eq!(store.delete("a.b.c"), Some(json!(1)));
    assert!(!store.contains("a.b.c"));
    assert!(store.contains("a.b.d"));

    assert_eq!(store.delete("a.b"), Some(json!({"d": 2})));
    assert!(!store.contains("a.b.d"));
    assert_eq!(store.delete("a.missing"), None);
    assert_eq!(store.delete("a.e.deeper"), None);
}

#[test]
fn flatten_produces_dotted_leaves() {
    let mut store = PathStore::new();
    store.set("file.info.derived.naccfam", 1).unwrap();
    store.set("file.info.derived.codes", json!([1, 2])).unwrap();
    store.set("subject.info.derived.naccfam", 0).unwrap();

    let flat = store.flatten();
    assert_eq!(flat.len(), 3);
    assert_eq!(flat["file.info.derived.naccfam"], json!(1));
    assert_eq!(flat["file.info.derived.codes"], json!([1, 2]));
    assert_eq!(flat["subject.info.derived.naccfam"], json!(0));
}

#[test]
fn flatten_prefix_keeps_full_paths() {
    let mut store = PathStore::new();
    store.set("file.info.derived.a", 1).unwrap();
    store.set("subject.info.derived.b", 2).unwrap();

    let flat = store.flatten_prefix("subject");
    assert_eq!(flat.len(), 1);
    assert_eq!(flat["subject.info.derived.b"], json!(2));
    assert!(store.flatten_prefix("nothing").is_empty());
}

#[test]
fn from_value_requires_an_object() {
    assert!(PathStore::from_value(json!({"a": {"b": 1}})).is_ok());
    assert!(PathStore::from_value(json!([1])).is_err());
}

#[test]
fn empty_objects_survive_flatten() {
    let mut store = PathStore::new();
    store.set("a.b", 1).unwrap();
    store.set("a.c", json!({})).unwrap();

    let flat = store.flatten();
    assert_eq!(flat["a.c"], json!({}));
    assert_eq!(PathStore::expand(flat).unwrap(), store);
}

#[test]
fn object_keys_must_be_addressable() {
    let mut store = PathStore::new();
    for bad in [json!({"b.c": 1}), json!({"": 1}), json!({"b": {"c.d": 1}})] {
        let err = store.set("a", bad).unwrap_err();
        assert!(matches!(err, CoreError::InvalidField(_)), "{err}");
    }
    assert!(store.is_empty());

    store.set("a", json!({"b": {"c": 1}})).unwrap();
    assert_eq!(store.get("a.b.c"), Some(&json!(1)));
    assert_eq!(PathStore::expand(store.flatten()).unwrap(), store);
}

fn segment() -> impl Strategy<Value = String> {
    "[a-d]{1,2}"
}

fn path() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..5).prop_map(|segments| segments.join("."))
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::from),
        "[a-z0-9]{0,4}".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        Just(json!([])),
        Just(json!(0)),
        Just(json!("")),
    ]
}

/// Scalars, or objects nested up to two levels (possibly empty).
fn leaf() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(2, 12, 3, |inner| {
        prop::collection::btree_map(segment(), inner, 0..3)
            .prop_map(|map| Value::Object(map.into_iter().collect()))
    })
}

proptest! {
    #[test]
    fn set_then_get_round_trips(p in path(), v in leaf()) {
        let mut store = PathStore::new();
        store.set(&p, v.clone()).unwrap();
        prop_assert_eq!(store.get(&p), Some(&v));
        prop_assert!(store.contains(&p));
    }

    #[test]
    fn never_set_is_absent(p in path(), q in path(), v in leaf()) {
        prop_assume!(!q.starts_with(&p) && !p.starts_with(&q));
        let mut store = PathStore::new();
        store.set(&p, v).unwrap();
        prop_assert!(!store.contains(&q));
    }

    #[test]
    fn expand_inverts_flatten(writes in prop::collection::vec((path(), leaf()), 0..24)) {
        let mut store = PathStore::new();
        for (p, v) in writes {
            // Colliding writes are rejected and leave the store untouched.
            let _ = store.set(&p, v);
        }
        let rebuilt = PathStore::expand(store.flatten()).unwrap();
        prop_assert_eq!(rebuilt, store);
    }
}
