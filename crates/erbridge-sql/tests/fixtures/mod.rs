#![allow(dead_code)]

use erbridge_core::{
    schema::{FieldAdapter, Relation, ScalarType, Schema},
    stmt::{EntityQuery, Mutation},
};
use erbridge_sql::{Compiled, Compiler, MutationPlan};

/// Shared test model.
///
/// * `BASE`, `CHILD`: two table inheritance chain (`CHILD` keyed by
///   `INHERITED_KEY`)
/// * `DOC`: derives `BASE`, its own relation carries a selector and a weak
///   extension table holds `NOTE`
/// * `E`: owns the set `X_SET` of `TAG`s and the detail `LINES` of `ITEM`s
/// * `NODE`: a tree walked recursively, `FOLDER`: a nested-set tree
/// * `CAT`: derives `BASE` and keeps its tree column in its own relation
pub fn schema() -> Schema {
    let mut builder = Schema::builder();

    builder
        .entity("BASE")
        .scalar("F", ScalarType::Integer)
        .scalar("NAME", ScalarType::String { max_len: 40 });

    builder
        .entity("CHILD")
        .parent("BASE")
        .relations([
            Relation::new("BASE", ["ID"]),
            Relation::new("CHILD", ["INHERITED_KEY"]),
        ])
        .scalar("G", ScalarType::Integer)
        .entity_ref("OWNER", "BASE");

    builder
        .entity("DOC")
        .parent("BASE")
        .relations([
            Relation::new("BASE", ["ID"]),
            Relation::new("DOC", ["INHERITED_KEY"]).selector("KIND", "doc"),
            Relation::new("DOC_EXTRA", ["INHERITED_KEY"]).weak(),
        ])
        .scalar("BODY", ScalarType::Text)
        .scalar("NOTE", ScalarType::String { max_len: 80 })
        .adapter(FieldAdapter::new("DOC_EXTRA", "NOTE"));

    builder
        .entity("TAG")
        .scalar("LABEL", ScalarType::String { max_len: 20 });

    builder.entity("ITEM").scalar("QTY", ScalarType::Integer);

    builder
        .entity("E")
        .scalar("X", ScalarType::Integer)
        .scalar("Y", ScalarType::Integer)
        .set("X_SET", "TAG")
        .cross("WEIGHT", ScalarType::Integer)
        .detail("LINES", "ITEM");

    builder
        .entity("NODE")
        .scalar("TITLE", ScalarType::String { max_len: 40 })
        .tree("PARENT");

    builder
        .entity("FOLDER")
        .scalar("TITLE", ScalarType::String { max_len: 40 })
        .tree("PARENT")
        .nested_set("LB", "RB");

    builder
        .entity("CAT")
        .parent("BASE")
        .relations([
            Relation::new("BASE", ["ID"]),
            Relation::new("CAT", ["INHERITED_KEY"]),
        ])
        .tree("PARENT");

    builder.build().unwrap()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn compile(query: &EntityQuery) -> Compiled {
    init_logging();
    let schema = schema();
    Compiler::new(&schema).compile_query(query).unwrap()
}

pub fn compile_mutation(mutation: impl Into<Mutation>) -> MutationPlan {
    init_logging();
    let schema = schema();
    Compiler::new(&schema)
        .compile_mutation(&mutation.into())
        .unwrap()
}

/// SQL text of every step of a plan.
pub fn statements(plan: &MutationPlan) -> Vec<&str> {
    plan.steps.iter().map(|step| step.sql.as_str()).collect()
}
