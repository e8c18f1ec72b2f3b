use super::{check_key, cross::CrossTable, owner_key, row, Key, MutationPlan, Step, Values};

use erbridge_core::{
    schema::Schema,
    stmt::{AttrValue, SetItem, Update, Value},
    Error, Result,
};

pub(super) fn compile(schema: &Schema, stmt: &Update) -> Result<MutationPlan> {
    let entity = schema.expect_entity(&stmt.entity)?;
    check_key(entity, &stmt.pk)?;

    if stmt.values.is_empty() {
        return Err(Error::invalid_statement(format!(
            "update of {} supplies no values",
            entity.name
        )));
    }

    let values = Values::group(schema, entity, &stmt.values)?;

    if let Some(&(attr, _)) = values.details.first() {
        return Err(Error::unsupported_attribute(
            &attr.name,
            "detail rows are relinked by updating the detail entity",
        ));
    }

    let mut steps = vec![];

    for (index, relation) in entity.adapter.relations.iter().enumerate() {
        let columns = &values.columns[index];
        if columns.is_empty() {
            continue;
        }

        let keys = row::keys(schema, entity, relation, &stmt.pk)?;

        // A weak relation may have no row for this entity yet
        steps.push(if relation.weak {
            row::upsert(relation, &keys, columns)
        } else {
            row::update(relation, &keys, columns)
        });
    }

    for &(attr, value) in &values.sets {
        let owner = owner_key(entity, &stmt.pk)?;
        let cross = CrossTable::new(schema, attr)?;

        match value {
            AttrValue::Set { current: None, .. } => {
                return Err(Error::ambiguous_set_update(&entity.name, &attr.name));
            }
            AttrValue::Set {
                items,
                current: Some(current),
            } => reconcile(&cross, owner, items, current, &mut steps)?,
            AttrValue::SetPatch { add, remove } => {
                for reference in remove {
                    steps.push(cross.delete(owner, Some(reference)));
                }
                for item in add {
                    steps.push(cross.insert(Key::Known(owner), item)?);
                }
            }
            AttrValue::Scalar(_) | AttrValue::Detail(_) => {}
        }
    }

    Ok(MutationPlan {
        entity: entity.name.clone(),
        steps,
    })
}

/// Brings the stored membership in line with `items`.
///
/// Items whose reference is already stored keep their row, which is only
/// rewritten when the item carries cross values. The remaining current
/// references are paired by position with the remaining items and rewritten
/// in place; a paired new reference is never stored yet, so no rewrite can
/// collide with another row. Unpaired current references are removed and
/// unpaired items inserted.
fn reconcile(
    cross: &CrossTable<'_>,
    owner: &Value,
    items: &[SetItem],
    current: &[Value],
    steps: &mut Vec<Step>,
) -> Result<()> {
    let mut kept = vec![false; current.len()];
    let mut added = vec![];

    for item in items {
        let stored = current
            .iter()
            .enumerate()
            .position(|(index, old)| !kept[index] && *old == item.reference);

        match stored {
            Some(index) => {
                kept[index] = true;
                if !item.cross_values.is_empty() {
                    steps.push(cross.update(owner, &current[index], item)?);
                }
            }
            None => added.push(item),
        }
    }

    let mut removed = current
        .iter()
        .zip(&kept)
        .filter(|&(_, kept)| !kept)
        .map(|(old, _)| old);
    let mut added = added.into_iter();

    loop {
        match (removed.next(), added.next()) {
            (Some(old), Some(item)) => steps.push(cross.update(owner, old, item)?),
            (Some(old), None) => steps.push(cross.delete(owner, Some(old))),
            (None, Some(item)) => steps.push(cross.insert(Key::Known(owner), item)?),
            (None, None) => break,
        }
    }

    Ok(())
}
