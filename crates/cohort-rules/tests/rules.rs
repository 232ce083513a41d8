use std::sync::Arc;

use cohort_core::store::PathStore;
use cohort_engine::codes::CodeTable;
use cohort_engine::error::EngineError;
use cohort_engine::pipeline::Pipeline;
use cohort_engine::registry::RuleRegistry;
use cohort_rules::rules::family::ParentHistory;
use cohort_rules::{RULE_NAMES, engine_config, registry};
use serde_json::{Value, json};

fn pipeline() -> Pipeline {
    let codes = CodeTable::from_entries([("1", "Alzheimer's disease"), ("4", "Lewy body disease")]);
    Pipeline::new(engine_config(), registry().unwrap())
        .unwrap()
        .with_codes(Arc::new(codes))
}

fn visit(version: i64, date: &str, entries: &[(&str, Value)]) -> PathStore {
    let mut store = PathStore::new();
    store.set("file.info.forms.json.formver", version).unwrap();
    store.set("file.info.forms.json.visitdate", date).unwrap();
    for (field, value) in entries {
        store.set(&format!("file.info.forms.json.{field}"), value.clone()).unwrap();
    }
    store
}

fn derived(store: &PathStore, path: &str) -> Value {
    store.get(path).cloned().unwrap_or_else(|| panic!("{path} not written"))
}

#[test]
fn registry_holds_every_rule_in_order() {
    let registry = registry().unwrap();
    assert_eq!(registry.names(), RULE_NAMES);
}

#[test]
fn family_status_does_not_regress_to_unknown() {
    let visits = pipeline()
        .run_subject([
            visit(
                3,
                "2017-05-01",
                &[("momdem", json!(1)), ("daddem", json!(0)), ("sibs", json!(0)), ("kids", json!(0))],
            ),
            visit(
                3,
                "2018-05-01",
                &[("momdem", json!(9)), ("daddem", json!(9)), ("sibs", json!(0)), ("kids", json!(0))],
            ),
        ])
        .unwrap();

    let second = &visits[1];
    assert_eq!(derived(second, "subject.info.derived.naccmom"), json!(1));
    assert_eq!(derived(second, "subject.info.derived.naccdad"), json!(0));
    assert_eq!(derived(second, "subject.info.derived.naccfam"), json!(1));
    assert_eq!(derived(second, "file.info.derived.naccfamv"), json!(9));
    assert_eq!(derived(second, "file.info.derived.naccpar"), json!(1));
}

#[test]
fn known_status_can_change_across_schema_versions() {
    let visits = pipeline()
        .run_subject([
            visit(
                3,
                "2019-01-15",
                &[("momdem", json!(1)), ("daddem", json!(0)), ("sibs", json!(0)), ("kids", json!(0))],
            ),
            visit(4, "2021-01-15", &[("momneur", json!(8)), ("dadneur", json!(2))]),
        ])
        .unwrap();

    let second = &visits[1];
    assert_eq!(derived(second, "subject.info.derived.naccmom"), json!(0));
    assert_eq!(derived(second, "subject.info.derived.naccdad"), json!(1));
    assert_eq!(derived(second, "subject.info.derived.naccfam"), json!(1));
    assert_eq!(derived(second, "file.info.derived.naccfamv"), json!(1));
}

#[test]
fn no_family_answers_is_not_applicable() {
    let mut store = visit(3, "2020-02-02", &[]);
    pipeline().run_visit(&mut store).unwrap();
    assert_eq!(derived(&store, "subject.info.derived.naccmom"), Value::Null);
    assert_eq!(derived(&store, "subject.info.derived.naccfam"), Value::Null);
    assert_eq!(derived(&store, "file.info.derived.naccpar"), Value::Null);
}

#[test]
fn not_applicable_replaces_a_known_prior() {
    let visits = pipeline()
        .run_subject([
            visit(3, "2017-05-01", &[("momdem", json!(1))]),
            visit(3, "2018-05-01", &[("momdem", json!(-4))]),
        ])
        .unwrap();

    assert_eq!(derived(&visits[0], "subject.info.derived.naccmom"), json!(1));
    assert_eq!(derived(&visits[1], "subject.info.derived.naccmom"), Value::Null);
}

#[test]
fn smoking_history_is_carried_forward() {
    let visits = pipeline()
        .run_subject([
            visit(3, "2016-03-01", &[("tobac100", json!(1)), ("tobac30", json!(0))]),
            visit(3, "2017-03-01", &[("tobac100", json!(777)), ("tobac30", json!(1))]),
            visit(3, "2018-03-01", &[("tobac100", json!(777)), ("tobac30", json!(0))]),
        ])
        .unwrap();

    let statuses: Vec<Value> = visits
        .iter()
        .map(|v| derived(v, "file.info.derived.nacctob"))
        .collect();
    assert_eq!(statuses, [json!(2), json!(1), json!(2)]);
    assert_eq!(derived(&visits[2], "file.info.resolved.tobac100"), json!(1));
}

#[test]
fn never_smoked_gates_recent_use() {
    let mut store = visit(3, "2020-02-02", &[("tobac100", json!(0))]);
    pipeline().run_visit(&mut store).unwrap();
    assert_eq!(derived(&store, "file.info.resolved.tobac30"), json!(0));
    assert_eq!(derived(&store, "file.info.derived.nacctob"), json!(0));
}

#[test]
fn carry_forward_without_history_is_missing() {
    let mut store = visit(3, "2020-02-02", &[("tobac100", json!(777))]);
    pipeline().run_visit(&mut store).unwrap();
    assert_eq!(derived(&store, "file.info.derived.nacctob"), Value::Null);
    assert!(!store.contains("subject.info.working.longitudinal.tobac100"));
}

#[test]
fn etiology_label_comes_from_code_table() {
    let mut known = visit(3, "2020-02-02", &[("primdx", json!(4))]);
    pipeline().run_visit(&mut known).unwrap();
    assert_eq!(derived(&known, "file.info.derived.naccetpr"), json!("Lewy body disease"));

    let mut unknown = visit(3, "2020-02-02", &[("primdx", json!(42))]);
    pipeline().run_visit(&mut unknown).unwrap();
    assert_eq!(derived(&unknown, "file.info.derived.naccetpr"), Value::Null);
}

#[test]
fn parent_history_needs_parent_rules_first() {
    let registry = RuleRegistry::builder().register(ParentHistory).build().unwrap();
    let pipeline = Pipeline::new(engine_config(), registry).unwrap();
    let mut store = visit(3, "2020-02-02", &[("momdem", json!(1))]);
    match pipeline.run_visit(&mut store) {
        Err(EngineError::MissingDependency { dependency, caller }) => {
            assert_eq!(dependency, "subject.info.derived.naccmom");
            assert_eq!(caller, "naccpar");
        }
        other => panic!("expected MissingDependency, got {other:?}"),
    }
}
