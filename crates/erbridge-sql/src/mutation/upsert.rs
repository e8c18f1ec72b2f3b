use super::{check_key, cross::CrossTable, detail::DetailTable, insert, owner_key, row, Key, MutationPlan, Values};

use erbridge_core::{
    schema::Schema,
    stmt::{AttrValue, UpdateOrInsert},
    Result,
};
use log::trace;

pub(super) fn compile(schema: &Schema, stmt: &UpdateOrInsert) -> Result<MutationPlan> {
    if stmt.pk.iter().all(|value| value.is_null()) {
        trace!("update or insert on {} has no key; compiling as insert", stmt.entity);
        return insert::compile(schema, &stmt.to_insert());
    }

    let entity = schema.expect_entity(&stmt.entity)?;
    check_key(entity, &stmt.pk)?;
    let values = Values::group(schema, entity, &stmt.values)?;

    let mut steps = vec![];

    for (index, relation) in entity.adapter.relations.iter().enumerate() {
        let columns = &values.columns[index];
        if relation.weak && columns.is_empty() {
            continue;
        }

        let keys = row::keys(schema, entity, relation, &stmt.pk)?;
        steps.push(row::upsert(relation, &keys, columns));
    }

    for &(attr, value) in &values.sets {
        let owner = owner_key(entity, &stmt.pk)?;
        let cross = CrossTable::new(schema, attr)?;

        match value {
            AttrValue::Set { items, .. } => {
                for item in items {
                    steps.push(cross.upsert(Key::Known(owner), item)?);
                }
            }
            AttrValue::SetPatch { add, remove } => {
                for reference in remove {
                    steps.push(cross.delete(owner, Some(reference)));
                }
                for item in add {
                    steps.push(cross.upsert(Key::Known(owner), item)?);
                }
            }
            AttrValue::Scalar(_) | AttrValue::Detail(_) => {}
        }
    }

    for &(attr, keys) in &values.details {
        if !keys.is_empty() {
            let owner = owner_key(entity, &stmt.pk)?;
            steps.push(DetailTable::new(schema, attr)?.link(Key::Known(owner), keys)?);
        }
    }

    Ok(MutationPlan {
        entity: entity.name.clone(),
        steps,
    })
}
