mod fixtures;
use fixtures::*;

use erbridge_core::stmt::{EntityQuery, OrderBy, TreeExpansion, Value};
use erbridge_sql::Compiler;
use pretty_assertions::assert_eq;

// Projected columns carry an `AS F$n` label so result rows map back through
// the field alias map, rather than the bare `T$1.F, T$2.G` select list.
#[test]
fn inherited_and_own_fields() {
    let mut query = EntityQuery::new("CHILD", "c");
    let root = query.root();
    query.select(root, "F").select(root, "G");

    let compiled = compile(&query);
    assert_eq!(
        compiled.sql,
        "SELECT T$1.F AS F$1, T$2.G AS F$2 FROM BASE T$1 JOIN CHILD T$2 ON T$2.INHERITED_KEY = T$1.ID"
    );
    assert!(compiled.params.is_empty());
}

#[test]
fn unused_chain_relation_is_not_joined() {
    let mut query = EntityQuery::new("CHILD", "c");
    let root = query.root();
    query.select(root, "F");

    assert_eq!(compile(&query).sql, "SELECT T$1.F AS F$1 FROM BASE T$1");
}

#[test]
fn weak_relation_is_left_joined() {
    let mut query = EntityQuery::new("DOC", "d");
    let root = query.root();
    query.select(root, "NOTE");

    assert_eq!(
        compile(&query).sql,
        "SELECT T$2.NOTE AS F$1 FROM BASE T$1 LEFT JOIN DOC_EXTRA T$2 ON T$2.INHERITED_KEY = T$1.ID"
    );
}

#[test]
fn root_selector_restricts_rows() {
    let mut query = EntityQuery::new("DOC", "d");
    let root = query.root();
    query.select(root, "BODY");

    let compiled = compile(&query);
    assert_eq!(
        compiled.sql,
        "SELECT T$2.BODY AS F$1 FROM BASE T$1 JOIN DOC T$2 ON T$2.INHERITED_KEY = T$1.ID WHERE T$2.KIND = :P$1"
    );
    assert_eq!(compiled.params.get("P$1"), Some(&Value::from("doc")));
}

#[test]
fn entity_reference_link() {
    let mut query = EntityQuery::new("CHILD", "c");
    let root = query.root();
    query.select(root, "G");
    let owner = query.join(root, "OWNER", "BASE", "o");
    query.select(owner, "NAME");

    assert_eq!(
        compile(&query).sql,
        "SELECT T$2.G AS F$1, T$3.NAME AS F$2 FROM BASE T$1 \
         JOIN CHILD T$2 ON T$2.INHERITED_KEY = T$1.ID \
         LEFT JOIN BASE T$3 ON T$3.ID = T$2.OWNER"
    );
}

#[test]
fn detail_link() {
    let mut query = EntityQuery::new("E", "e");
    let root = query.root();
    query.select(root, "X");
    let lines = query.join(root, "LINES", "ITEM", "l");
    query.select(lines, "QTY");

    assert_eq!(
        compile(&query).sql,
        "SELECT T$1.X AS F$1, T$2.QTY AS F$2 FROM E T$1 LEFT JOIN ITEM T$2 ON T$2.MASTERKEY = T$1.ID"
    );
}

#[test]
fn set_link_with_cross_attributes() {
    let mut query = EntityQuery::new("E", "e");
    let root = query.root();
    query.select(root, "X");
    let tags = query.join(root, "X_SET", "TAG", "t");
    query.set_attributes(root, "X_SET", ["WEIGHT"]);
    query.select(tags, "LABEL");

    let compiled = compile(&query);
    assert_eq!(
        compiled.sql,
        "SELECT T$1.X AS F$1, T$2.WEIGHT AS F$2, T$3.LABEL AS F$3 FROM E T$1 \
         LEFT JOIN X_SET T$2 ON T$2.KEY1 = T$1.ID \
         LEFT JOIN TAG T$3 ON T$3.ID = T$2.KEY2"
    );

    let aliases = &compiled.field_aliases;
    assert_eq!(aliases.position("e", "X_SET", Some("WEIGHT")), Some(1));
    assert_eq!(aliases.column("t", "LABEL"), Some("F$3"));
}

#[test]
fn leaf_set_field_projects_reference_key() {
    let mut query = EntityQuery::new("E", "e");
    let root = query.root();
    query.select(root, "X_SET");

    assert_eq!(
        compile(&query).sql,
        "SELECT T$2.KEY2 AS F$1 FROM E T$1 LEFT JOIN X_SET T$2 ON T$2.KEY1 = T$1.ID"
    );
}

#[test]
fn descendants_through_nested_set() {
    let mut query = EntityQuery::new("FOLDER", "f");
    let root = query.root();
    query.select(root, "TITLE");
    let below = query.join(root, "PARENT", "FOLDER", "d");
    query.tree(root, "PARENT", TreeExpansion::Descendants);
    query.select(below, "TITLE");

    assert_eq!(
        compile(&query).sql,
        "SELECT T$1.TITLE AS F$1, T$2.TITLE AS F$2 FROM FOLDER T$1 \
         LEFT JOIN FOLDER T$2 ON T$2.LB > T$1.LB AND T$2.RB < T$1.RB"
    );
}

#[test]
fn ancestors_through_recursive_cte() {
    let mut query = EntityQuery::new("NODE", "n");
    let root = query.root();
    query.select(root, "TITLE");
    let above = query.join(root, "PARENT", "NODE", "a");
    query.tree(root, "PARENT", TreeExpansion::Ancestors);
    query.select(above, "TITLE");

    assert_eq!(
        compile(&query).sql,
        "SELECT T$1.TITLE AS F$1, T$3.TITLE AS F$2 FROM NODE T$1 \
         JOIN (WITH RECURSIVE TREE$2 (ROOT_KEY, NODE_KEY) AS (\
         SELECT ID, PARENT FROM NODE WHERE PARENT IS NOT NULL \
         UNION ALL SELECT TREE$2.ROOT_KEY, NODE.PARENT FROM NODE \
         JOIN TREE$2 ON NODE.ID = TREE$2.NODE_KEY WHERE NODE.PARENT IS NOT NULL\
         ) SELECT ROOT_KEY, NODE_KEY FROM TREE$2) T$2 ON T$2.ROOT_KEY = T$1.ID \
         JOIN NODE T$3 ON T$3.ID = T$2.NODE_KEY"
    );
}

#[test]
fn descendants_through_recursive_cte() {
    let mut query = EntityQuery::new("NODE", "n");
    let root = query.root();
    query.select(root, "TITLE");
    let below = query.join(root, "PARENT", "NODE", "d");
    query.tree(root, "PARENT", TreeExpansion::Descendants);
    query.select(below, "TITLE");

    assert_eq!(
        compile(&query).sql,
        "SELECT T$1.TITLE AS F$1, T$3.TITLE AS F$2 FROM NODE T$1 \
         LEFT JOIN (WITH RECURSIVE TREE$2 (ROOT_KEY, NODE_KEY) AS (\
         SELECT PARENT, ID FROM NODE WHERE PARENT IS NOT NULL \
         UNION ALL SELECT TREE$2.ROOT_KEY, NODE.ID FROM NODE \
         JOIN TREE$2 ON NODE.PARENT = TREE$2.NODE_KEY\
         ) SELECT ROOT_KEY, NODE_KEY FROM TREE$2) T$2 ON T$2.ROOT_KEY = T$1.ID \
         LEFT JOIN NODE T$3 ON T$3.ID = T$2.NODE_KEY"
    );
}

#[test]
fn ancestors_through_nested_set() {
    let mut query = EntityQuery::new("FOLDER", "f");
    let root = query.root();
    query.select(root, "TITLE");
    let above = query.join(root, "PARENT", "FOLDER", "a");
    query.tree(root, "PARENT", TreeExpansion::Ancestors);
    query.select(above, "TITLE");

    assert_eq!(
        compile(&query).sql,
        "SELECT T$1.TITLE AS F$1, T$2.TITLE AS F$2 FROM FOLDER T$1 \
         JOIN FOLDER T$2 ON T$2.LB < T$1.LB AND T$2.RB > T$1.RB"
    );
}

#[test]
fn tree_column_in_secondary_relation() {
    let mut query = EntityQuery::new("CAT", "c");
    let root = query.root();
    query.select(root, "F");
    let above = query.join(root, "PARENT", "CAT", "a");
    query.tree(root, "PARENT", TreeExpansion::Ancestors);
    query.select(above, "F");

    assert_eq!(
        compile(&query).sql,
        "SELECT T$1.F AS F$1, T$4.F AS F$2 FROM BASE T$1 \
         JOIN (WITH RECURSIVE TREE$2 (ROOT_KEY, NODE_KEY) AS (\
         SELECT INHERITED_KEY, PARENT FROM CAT WHERE PARENT IS NOT NULL \
         UNION ALL SELECT TREE$2.ROOT_KEY, CAT.PARENT FROM CAT \
         JOIN TREE$2 ON CAT.INHERITED_KEY = TREE$2.NODE_KEY WHERE CAT.PARENT IS NOT NULL\
         ) SELECT ROOT_KEY, NODE_KEY FROM TREE$2) T$2 ON T$2.ROOT_KEY = T$1.ID \
         JOIN CAT T$3 ON T$3.INHERITED_KEY = T$2.NODE_KEY \
         JOIN BASE T$4 ON T$4.ID = T$3.INHERITED_KEY"
    );
}

#[test]
fn expanded_tree_leaf_projects_its_column() {
    let mut query = EntityQuery::new("CAT", "c");
    let root = query.root();
    query.select(root, "PARENT");
    query.tree(root, "PARENT", TreeExpansion::Ancestors);

    let compiled = compile(&query);
    assert_eq!(
        compiled.sql,
        "SELECT T$2.PARENT AS F$1 FROM BASE T$1 JOIN CAT T$2 ON T$2.INHERITED_KEY = T$1.ID"
    );
    assert_eq!(compiled.field_aliases.get("F$1").unwrap().attribute, "PARENT");
}

#[test]
fn plain_parent_link_is_a_self_join() {
    let mut query = EntityQuery::new("NODE", "n");
    let root = query.root();
    let parent = query.join(root, "PARENT", "NODE", "p");
    query.select(parent, "TITLE");

    assert_eq!(
        compile(&query).sql,
        "SELECT T$2.TITLE AS F$1 FROM NODE T$1 LEFT JOIN NODE T$2 ON T$2.ID = T$1.PARENT"
    );
}

#[test]
fn pagination_and_ordering() {
    let mut query = EntityQuery::new("BASE", "b");
    let root = query.root();
    query
        .select(root, "NAME")
        .first(10i64)
        .skip(20i64)
        .order_by(OrderBy::desc("b", "NAME"))
        .order_by(OrderBy::asc("b", "F"));

    let compiled = compile(&query);
    assert_eq!(
        compiled.sql,
        "SELECT FIRST :P$1 SKIP :P$2 T$1.NAME AS F$1 FROM BASE T$1 ORDER BY T$1.NAME DESC, T$1.F ASC"
    );
    assert_eq!(compiled.params.get("P$1"), Some(&Value::I64(10)));
    assert_eq!(compiled.params.get("P$2"), Some(&Value::I64(20)));
}

#[test]
fn compiling_twice_is_deterministic() {
    let mut query = EntityQuery::new("E", "e");
    let root = query.root();
    query.select(root, "X");
    let tags = query.join(root, "X_SET", "TAG", "t");
    query.select(tags, "LABEL");

    assert_eq!(compile(&query), compile(&query));
}

#[test]
fn query_from_json() {
    let query = EntityQuery::from_json(
        r#"{
            "link": {
                "entity": "CHILD", "alias": "c",
                "fields": [
                    { "attribute": "G" },
                    { "attribute": "OWNER",
                      "links": [{ "entity": "BASE", "alias": "o", "fields": [{ "attribute": "NAME" }] }] }
                ]
            },
            "options": { "first": 5, "order": [{ "alias": "o", "attribute": "NAME" }] }
        }"#,
    )
    .unwrap();

    assert_eq!(
        compile(&query).sql,
        "SELECT FIRST :P$1 T$2.G AS F$1, T$3.NAME AS F$2 FROM BASE T$1 \
         JOIN CHILD T$2 ON T$2.INHERITED_KEY = T$1.ID \
         LEFT JOIN BASE T$3 ON T$3.ID = T$2.OWNER \
         ORDER BY T$3.NAME ASC"
    );
}

#[test]
fn unknown_order_alias() {
    let schema = schema();
    let mut query = EntityQuery::new("BASE", "b");
    let root = query.root();
    query.select(root, "F").order_by(OrderBy::asc("x", "F"));

    let err = Compiler::new(&schema).compile_query(&query).unwrap_err();
    assert!(err.is_alias_not_found());
    assert!(err.to_string().starts_with("compiling query on BASE: "));
}

#[test]
fn query_without_columns() {
    let schema = schema();
    let query = EntityQuery::new("BASE", "b");

    let err = Compiler::new(&schema).compile_query(&query).unwrap_err();
    assert!(err.is_invalid_statement());
}

#[test]
fn scalar_field_cannot_nest_links() {
    let schema = schema();
    let mut query = EntityQuery::new("BASE", "b");
    let root = query.root();
    query.join(root, "NAME", "BASE", "n");

    let err = Compiler::new(&schema).compile_query(&query).unwrap_err();
    assert!(err.is_unsupported_attribute());
}
