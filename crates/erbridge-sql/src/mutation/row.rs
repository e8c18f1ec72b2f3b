use super::{step, ColumnValue, Step};
use crate::serializer::{Bind, Comma, Delimited, Formatter, Ident, Params, ToSql};

use erbridge_core::{
    schema::{Entity, Relation, Schema},
    stmt::{NamedParams, Value},
    Result,
};

/// Key columns of one relation of the chain paired with the supplied key.
pub(super) fn keys<'a>(
    schema: &Schema,
    entity: &'a Entity,
    relation: &'a Relation,
    pk: &'a [Value],
) -> Result<Vec<(&'a str, &'a Value)>> {
    pk.iter()
        .enumerate()
        .map(|(index, value)| Ok((schema.key_column(entity, relation, index)?, value)))
        .collect()
}

/// `UPDATE R SET .. WHERE <keys>`
pub(super) fn update(relation: &Relation, keys: &[(&str, &Value)], columns: &[ColumnValue<'_>]) -> Step {
    let mut sql = String::new();
    let mut params = NamedParams::new();
    let f = &mut Formatter::new(&mut sql, &mut params);

    let assignments = columns.iter().map(|column| Assign(column.field, Bind(column.value, column.ty.as_ref())));
    fmt!(f, "UPDATE " Ident(&relation.name) " SET " Comma(assignments) " WHERE " KeyMatch(keys));

    step(sql, params, None)
}

/// `UPDATE OR INSERT INTO R (..) VALUES (..) MATCHING (<keys>)`. Values for
/// key columns are taken from `keys` only.
pub(super) fn upsert(relation: &Relation, keys: &[(&str, &Value)], columns: &[ColumnValue<'_>]) -> Step {
    let mut names = vec![];
    let mut values = vec![];

    for &(key, value) in keys {
        names.push(key);
        values.push(Bind(value, None));
    }
    if let Some(selector) = &relation.selector {
        names.push(selector.field.as_str());
        values.push(Bind(&selector.value, None));
    }
    for column in columns {
        if !keys.iter().any(|&(key, _)| key == column.field) {
            names.push(column.field);
            values.push(Bind(column.value, column.ty.as_ref()));
        }
    }

    let mut sql = String::new();
    let mut params = NamedParams::new();
    let f = &mut Formatter::new(&mut sql, &mut params);

    let matching = keys.iter().map(|&(key, _)| Ident(key));
    fmt!(f, "UPDATE OR INSERT INTO " Ident(&relation.name) " (" Comma(names.into_iter().map(Ident)) ") VALUES (" Comma(values) ") MATCHING (" Comma(matching) ")");

    step(sql, params, None)
}

/// `DELETE FROM R WHERE <keys>`
pub(super) fn delete(relation: &Relation, keys: &[(&str, &Value)]) -> Step {
    let mut sql = String::new();
    let mut params = NamedParams::new();
    let f = &mut Formatter::new(&mut sql, &mut params);

    fmt!(f, "DELETE FROM " Ident(&relation.name) " WHERE " KeyMatch(keys));

    step(sql, params, None)
}

/// `NAME = :P$n`
struct Assign<'a>(&'a str, Bind<'a>);

impl ToSql for Assign<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, Ident(self.0) " = " self.1);
    }
}

/// Conjunction of key column equalities
struct KeyMatch<'a, 'b>(&'b [(&'a str, &'a Value)]);

impl ToSql for KeyMatch<'_, '_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let keys = self.0.iter().map(|&(key, value)| Assign(key, Bind(value, None)));
        fmt!(f, Delimited(keys, " AND "));
    }
}
