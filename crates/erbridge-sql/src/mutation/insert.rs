use super::{cross::CrossTable, detail::DetailTable, ColumnValue, Key, MutationPlan, Step, StepKind, Values};
use crate::serializer::{BlockParams, Bind, Comma, Formatter, Ident, Params, ToSql};

use erbridge_core::{
    schema::{Attribute, Entity, Relation, Schema},
    stmt::{AttrValue, Insert, Value},
    Error, Result,
};

/// Name of the block output carrying the generated key
const KEY: &str = "KEY$";

pub(super) fn compile(schema: &Schema, stmt: &Insert) -> Result<MutationPlan> {
    let entity = schema.expect_entity(&stmt.entity)?;
    let values = Values::group(schema, entity, &stmt.values)?;

    if !values.has_columns() {
        return Err(Error::invalid_statement(format!(
            "insert into {} supplies no column values",
            entity.name
        )));
    }

    if entity.pk.len() != 1 {
        return Err(Error::invalid_statement(format!(
            "{} has a composite key; inserted rows must return a single key",
            entity.name
        )));
    }

    let mut steps = vec![chain_block(schema, entity, &values)?];

    for &(attr, value) in &values.sets {
        let cross = CrossTable::new(schema, attr)?;

        let items = match value {
            AttrValue::Set { items, .. } => items,
            AttrValue::SetPatch { add, remove } => {
                if !remove.is_empty() {
                    return Err(Error::invalid_statement(format!(
                        "{}.{}: a new row has no members to remove",
                        entity.name, attr.name
                    )));
                }
                add
            }
            _ => continue,
        };

        for item in items {
            steps.push(cross.insert(Key::Generated, item)?);
        }
    }

    for &(attr, keys) in &values.details {
        if !keys.is_empty() {
            steps.push(DetailTable::new(schema, attr)?.link(Key::Generated, keys)?);
        }
    }

    Ok(MutationPlan {
        entity: entity.name.clone(),
        steps,
    })
}

/// Renders the `EXECUTE BLOCK` inserting one row per relation of the chain,
/// root first, each child keyed by the root's generated key.
fn chain_block(schema: &Schema, entity: &Entity, values: &Values<'_>) -> Result<Step> {
    let mut body = String::new();
    let mut block = BlockParams::default();
    let f = &mut Formatter::new(&mut body, &mut block);

    for (index, relation) in entity.adapter.relations.iter().enumerate() {
        let columns = &values.columns[index];

        if index > 0 && relation.weak && columns.is_empty() {
            continue;
        }

        let key = schema.key_column(entity, relation, 0)?;
        let mut row = vec![];

        if index > 0 {
            row.push((key, Insertable::Key));
        }
        if let Some(selector) = &relation.selector {
            row.push((selector.field.as_str(), Insertable::Selector(&selector.value)));
        }
        row.extend(columns.iter().map(|column| (column.field, Insertable::Column(column))));

        write_row(f, relation, row);

        if index == 0 {
            fmt!(f, " RETURNING " Ident(key) " INTO :" KEY);
        }
        fmt!(f, "; ");
    }

    let key_type = key_type(schema, entity);
    let inputs = block
        .types
        .iter()
        .enumerate()
        .map(|(i, ty)| format!("P${n} {ty} = :P${n}", n = i + 1))
        .collect::<Vec<_>>();

    let mut sql = String::from("EXECUTE BLOCK ");
    if !inputs.is_empty() {
        sql.push('(');
        sql.push_str(&inputs.join(", "));
        sql.push_str(") ");
    }
    sql.push_str(&format!("RETURNS ({KEY} {key_type}) AS BEGIN {body}SUSPEND; END"));

    Ok(Step {
        sql,
        params: block.params,
        kind: StepKind::ReturnsKey,
    })
}

fn write_row<P: Params>(
    f: &mut Formatter<'_, P>,
    relation: &Relation,
    row: Vec<(&str, Insertable<'_>)>,
) {
    fmt!(f, "INSERT INTO " Ident(&relation.name));

    if row.is_empty() {
        fmt!(f, " DEFAULT VALUES");
        return;
    }

    let names = row.iter().map(|&(name, _)| Ident(name)).collect::<Vec<_>>();
    let values = row.into_iter().map(|(_, value)| value);
    fmt!(f, " (" Comma(names) ") VALUES (" Comma(values) ")");
}

/// Declared type of the generated key, `INTEGER` unless the key attribute
/// says otherwise.
fn key_type(schema: &Schema, entity: &Entity) -> String {
    entity
        .pk
        .first()
        .and_then(|name| schema.attribute(entity.id, name))
        .and_then(Attribute::column_type)
        .map(|ty| ty.sql_type())
        .unwrap_or_else(|| "INTEGER".to_string())
}

enum Insertable<'a> {
    /// Key generated by the root insert
    Key,
    /// Discriminator of the relation
    Selector(&'a Value),
    Column(&'a ColumnValue<'a>),
}

impl ToSql for Insertable<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            Insertable::Key => fmt!(f, ":" KEY),
            Insertable::Selector(value) => fmt!(f, value),
            Insertable::Column(column) => fmt!(f, Bind(column.value, column.ty.as_ref())),
        }
    }
}
