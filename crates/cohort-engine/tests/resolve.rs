use cohort_core::namespace::WorkingNamespace;
use cohort_core::store::PathStore;
use cohort_engine::resolve::{Resolver, Source, record_working};
use jiff::civil::date;
use serde_json::{Value, json};

const LAYER: &str = "json";
static NULL: Value = Value::Null;

fn store(entries: &[(&str, Value)]) -> PathStore {
    PathStore::expand(entries.iter().cloned()).unwrap()
}

fn codes() -> Vec<Value> {
    vec![json!(777)]
}

#[test]
fn present_value_is_returned_without_history_lookup() {
    let store = store(&[
        ("file.info.forms.json.tobac30", json!(2)),
        ("_prev_record.info.resolved.tobac30", json!(4)),
        ("subject.info.working.cross-sectional.tobac30", json!(5)),
    ]);
    let resolver = Resolver::new(&store, LAYER, &NULL);

    let resolution = resolver.resolve_traced("tobac30", &codes(), None).unwrap();
    assert_eq!(resolution.value, json!(2));
    assert_eq!(resolution.source, Source::Current);
}

#[test]
fn falsy_current_value_is_still_current() {
    let store = store(&[
        ("file.info.forms.json.tobac30", json!(0)),
        ("_prev_record.info.resolved.tobac30", json!(4)),
    ]);
    let resolver = Resolver::new(&store, LAYER, &NULL);
    assert_eq!(resolver.resolve("tobac30", &codes(), None).unwrap(), json!(0));
}

#[test]
fn sentinel_without_history_is_missing() {
    let marker = json!(-4);
    let store = store(&[("file.info.forms.json.tobac30", json!(777))]);
    let resolver = Resolver::new(&store, LAYER, &marker);

    let resolution = resolver.resolve_traced("tobac30", &codes(), None).unwrap();
    assert_eq!(resolution.value, json!(-4));
    assert_eq!(resolution.source, Source::Missing);

    let with_default = resolver.resolve("tobac30", &codes(), Some(&json!(88))).unwrap();
    assert_eq!(with_default, json!(88));
}

#[test]
fn sentinel_match_is_numeric_but_type_strict() {
    let store = store(&[
        ("file.info.forms.json.a", json!(777.0)),
        ("file.info.forms.json.b", json!("66")),
        ("file.info.forms.json.c", json!(66)),
    ]);
    let resolver = Resolver::new(&store, LAYER, &NULL);

    assert_eq!(resolver.resolve("a", &codes(), None).unwrap(), Value::Null);
    assert_eq!(resolver.resolve("b", &[json!("66")], None).unwrap(), Value::Null);
    assert_eq!(resolver.resolve("c", &[json!("66")], None).unwrap(), json!(66));
}

fn history_store() -> PathStore {
    store(&[
        ("file.info.forms.json.tobac30", json!(777)),
        ("_prev_record.info.forms.json.tobac30", json!(3)),
        ("_prev_record.info.resolved.tobac30", json!(4)),
        (
            "subject.info.working.longitudinal.tobac30",
            json!([{"date": "2018-02-01", "value": 1}, {"date": "2019-05-01", "value": 5}]),
        ),
    ])
}

#[test]
fn working_state_outranks_previous_visit() {
    let store = history_store();
    let resolver = Resolver::new(&store, LAYER, &NULL);
    let resolution = resolver.resolve_traced("tobac30", &codes(), None).unwrap();
    assert_eq!(resolution.value, json!(5));
    assert_eq!(resolution.source, Source::Working);
}

#[test]
fn priority_falls_through_each_tier() {
    let mut store = history_store();
    store.delete("subject.info.working");
    {
        let resolver = Resolver::new(&store, LAYER, &NULL);
        let resolution = resolver.resolve_traced("tobac30", &codes(), None).unwrap();
        assert_eq!((resolution.value, resolution.source), (json!(4), Source::PrevResolved));
    }

    store.delete("_prev_record.info.resolved.tobac30");
    {
        let resolver = Resolver::new(&store, LAYER, &NULL);
        let resolution = resolver.resolve_traced("tobac30", &codes(), None).unwrap();
        assert_eq!((resolution.value, resolution.source), (json!(3), Source::PrevRaw));
    }

    store.set("_prev_record.info.forms.json.tobac30", 777).unwrap();
    let resolver = Resolver::new(&store, LAYER, &NULL);
    let resolution = resolver.resolve_traced("tobac30", &codes(), Some(&json!(0))).unwrap();
    assert_eq!((resolution.value, resolution.source), (json!(0), Source::Default));
}

#[test]
fn absent_current_value_uses_history() {
    let mut store = history_store();
    store.delete("file.info.forms.json.tobac30");
    let resolver = Resolver::new(&store, LAYER, &NULL);
    assert_eq!(resolver.resolve("tobac30", &codes(), None).unwrap(), json!(5));
}

#[test]
fn resolution_is_repeatable_and_does_not_write() {
    let store = history_store();
    let before = store.clone();
    let resolver = Resolver::new(&store, LAYER, &NULL);

    let first = resolver.resolve("tobac30", &codes(), None).unwrap();
    let second = resolver.resolve("tobac30", &codes(), None).unwrap();
    assert_eq!(first, second);
    assert_eq!(store, before);
}

#[test]
fn record_working_keeps_date_order() {
    let mut store = PathStore::new();
    record_working(&mut store, "tobac30", date(2020, 1, 1), json!(1)).unwrap();
    record_working(&mut store, "tobac30", date(2022, 1, 1), json!(2)).unwrap();
    // Same date replaces.
    record_working(&mut store, "tobac30", date(2022, 1, 1), json!(3)).unwrap();
    // Out of order is inserted in place; the latest value stays last.
    record_working(&mut store, "tobac30", date(2021, 1, 1), json!(4)).unwrap();

    let working = WorkingNamespace::new(&store);
    let values: Vec<_> = working.series("tobac30").unwrap().into_iter().map(|e| e.value).collect();
    assert_eq!(values, [json!(1), json!(4), json!(3)]);
    assert_eq!(working.last_value("tobac30").unwrap(), Some(json!(3)));
    assert_eq!(
        store.get("subject.info.working.cross-sectional.tobac30"),
        Some(&json!(3))
    );
}
