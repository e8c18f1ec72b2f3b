mod fixtures;
use fixtures::*;

use erbridge_core::stmt::{AttrValue, Insert, SetItem, UpdateOrInsert, Value};
use erbridge_sql::{Compiler, StepKind};
use pretty_assertions::assert_eq;

#[test]
fn chain_insert_threads_generated_key() {
    let plan = compile_mutation(Insert::new("CHILD").value("F", 1i32).value("G", 2i32));

    assert_eq!(plan.entity, "CHILD");
    assert_eq!(plan.steps.len(), 1);

    let block = &plan.steps[0];
    assert_eq!(
        block.sql,
        "EXECUTE BLOCK (P$1 INTEGER = :P$1, P$2 INTEGER = :P$2) RETURNS (KEY$ INTEGER) AS BEGIN \
         INSERT INTO BASE (F) VALUES (:P$1) RETURNING ID INTO :KEY$; \
         INSERT INTO CHILD (INHERITED_KEY, G) VALUES (:KEY$, :P$2); \
         SUSPEND; END"
    );
    assert_eq!(block.kind, StepKind::ReturnsKey);
    assert_eq!(block.sql.matches("INSERT INTO").count(), 2);

    let params: Vec<_> = block.params.iter().collect();
    assert_eq!(params, [("P$1", &Value::I32(1)), ("P$2", &Value::I32(2))]);
}

#[test]
fn root_without_values_uses_defaults() {
    let plan = compile_mutation(Insert::new("CHILD").value("G", 2i32));

    assert_eq!(
        plan.steps[0].sql,
        "EXECUTE BLOCK (P$1 INTEGER = :P$1) RETURNS (KEY$ INTEGER) AS BEGIN \
         INSERT INTO BASE DEFAULT VALUES RETURNING ID INTO :KEY$; \
         INSERT INTO CHILD (INHERITED_KEY, G) VALUES (:KEY$, :P$1); \
         SUSPEND; END"
    );
}

#[test]
fn selector_is_written_and_empty_weak_relation_skipped() {
    let plan = compile_mutation(Insert::new("DOC").value("BODY", "hi"));

    assert_eq!(
        plan.steps[0].sql,
        "EXECUTE BLOCK (P$1 VARCHAR(3) = :P$1, P$2 BLOB SUB_TYPE TEXT = :P$2) RETURNS (KEY$ INTEGER) AS BEGIN \
         INSERT INTO BASE DEFAULT VALUES RETURNING ID INTO :KEY$; \
         INSERT INTO DOC (INHERITED_KEY, KIND, BODY) VALUES (:KEY$, :P$1, :P$2); \
         SUSPEND; END"
    );
}

#[test]
fn weak_relation_with_values_is_inserted() {
    let plan = compile_mutation(Insert::new("DOC").value("BODY", "hi").value("NOTE", "n"));

    assert_eq!(
        plan.steps[0].sql,
        "EXECUTE BLOCK (P$1 VARCHAR(3) = :P$1, P$2 BLOB SUB_TYPE TEXT = :P$2, P$3 VARCHAR(80) = :P$3) \
         RETURNS (KEY$ INTEGER) AS BEGIN \
         INSERT INTO BASE DEFAULT VALUES RETURNING ID INTO :KEY$; \
         INSERT INTO DOC (INHERITED_KEY, KIND, BODY) VALUES (:KEY$, :P$1, :P$2); \
         INSERT INTO DOC_EXTRA (INHERITED_KEY, NOTE) VALUES (:KEY$, :P$3); \
         SUSPEND; END"
    );
    assert_eq!(plan.steps[0].params.get("P$3"), Some(&Value::from("n")));
}

#[test]
fn set_members_and_details_follow_the_block() {
    let plan = compile_mutation(
        Insert::new("E")
            .value("X", 1i32)
            .set(
                "X_SET",
                [SetItem::new(10i64).cross("WEIGHT", 3i32), SetItem::new(11i64)],
            )
            .detail("LINES", [20i64, 21i64]),
    );

    assert_eq!(
        statements(&plan),
        [
            "EXECUTE BLOCK (P$1 INTEGER = :P$1) RETURNS (KEY$ INTEGER) AS BEGIN \
             INSERT INTO E (X) VALUES (:P$1) RETURNING ID INTO :KEY$; SUSPEND; END",
            "INSERT INTO X_SET (KEY1, KEY2, WEIGHT) VALUES (:P$1, :P$2, :P$3)",
            "INSERT INTO X_SET (KEY1, KEY2) VALUES (:P$1, :P$2)",
            "UPDATE ITEM SET MASTERKEY = :P$1 WHERE ID IN (:P$2, :P$3)",
        ]
    );

    for step in &plan.steps[1..] {
        assert_eq!(step.needs_key(), Some("P$1"));
        assert_eq!(step.params.get("P$1"), Some(&Value::Null));
    }
    assert_eq!(plan.steps[1].params.get("P$3"), Some(&Value::I32(3)));
}

#[test]
fn insert_needs_a_column_value() {
    let schema = schema();
    let insert = Insert::new("E").set("X_SET", [SetItem::new(1i64)]);

    let err = Compiler::new(&schema).insert(&insert).unwrap_err();
    assert!(err.is_invalid_statement());
    assert!(err.to_string().starts_with("compiling insert on E: "));
}

#[test]
fn unknown_attribute() {
    let schema = schema();
    let err = Compiler::new(&schema)
        .insert(&Insert::new("E").value("NOPE", 1i32))
        .unwrap_err();
    assert!(err.is_invalid_statement());
}

#[test]
fn unknown_cross_attribute() {
    let schema = schema();
    let insert = Insert::new("E")
        .value("X", 1i32)
        .set("X_SET", [SetItem::new(1i64).cross("COLOR", "red")]);

    let err = Compiler::new(&schema).insert(&insert).unwrap_err();
    assert!(err.is_invalid_statement());
}

#[test]
fn update_or_insert_without_key_inserts() {
    let plan = compile_mutation(UpdateOrInsert::new("E", Vec::<i64>::new()).value("X", 1i32));

    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].kind, StepKind::ReturnsKey);
}

#[test]
fn update_or_insert_matches_on_keys() {
    let plan = compile_mutation(UpdateOrInsert::new("DOC", [3i64]).value("BODY", "x"));

    assert_eq!(
        statements(&plan),
        [
            "UPDATE OR INSERT INTO BASE (ID) VALUES (:P$1) MATCHING (ID)",
            "UPDATE OR INSERT INTO DOC (INHERITED_KEY, KIND, BODY) VALUES (:P$1, :P$2, :P$3) MATCHING (INHERITED_KEY)",
        ]
    );
}

#[test]
fn update_or_insert_set_members() {
    let plan = compile_mutation(
        UpdateOrInsert::new("E", [4i64])
            .value("X", 1i32)
            .with(
                "X_SET",
                AttrValue::Set {
                    items: vec![SetItem::new(9i64)],
                    current: None,
                },
            ),
    );

    assert_eq!(
        statements(&plan),
        [
            "UPDATE OR INSERT INTO E (ID, X) VALUES (:P$1, :P$2) MATCHING (ID)",
            "UPDATE OR INSERT INTO X_SET (KEY1, KEY2) VALUES (:P$1, :P$2) MATCHING (KEY1, KEY2)",
        ]
    );
    assert_eq!(plan.steps[1].params.get("P$1"), Some(&Value::I64(4)));
}

#[test]
fn update_or_insert_links_details() {
    let plan = compile_mutation(
        UpdateOrInsert::new("E", [4i64])
            .value("X", 1i32)
            .with("LINES", AttrValue::Detail(vec![Value::from(20i64), Value::from(21i64)])),
    );

    assert_eq!(
        statements(&plan),
        [
            "UPDATE OR INSERT INTO E (ID, X) VALUES (:P$1, :P$2) MATCHING (ID)",
            "UPDATE ITEM SET MASTERKEY = :P$1 WHERE ID IN (:P$2, :P$3)",
        ]
    );

    let link = &plan.steps[1];
    assert_eq!(link.needs_key(), None);
    let params: Vec<_> = link.params.values().cloned().collect();
    assert_eq!(params, [Value::I64(4), Value::I64(20), Value::I64(21)]);
}
