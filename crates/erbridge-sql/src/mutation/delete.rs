use super::{check_key, cross::CrossTable, detail::DetailTable, owner_key, row, MutationPlan};

use erbridge_core::{
    schema::{AttributeTy, Schema},
    stmt::Delete,
    Result,
};

/// Removes set memberships, detaches detail rows and then deletes the chain
/// rows, leaf first.
pub(super) fn compile(schema: &Schema, stmt: &Delete) -> Result<MutationPlan> {
    let entity = schema.expect_entity(&stmt.entity)?;
    check_key(entity, &stmt.pk)?;

    let mut steps = vec![];

    let attributes = schema.attributes(entity.id);

    for &attr in &attributes {
        if let AttributeTy::Set(_) = attr.ty {
            let owner = owner_key(entity, &stmt.pk)?;
            steps.push(CrossTable::new(schema, attr)?.delete(owner, None));
        }
    }

    for &attr in &attributes {
        if let AttributeTy::Detail(_) = attr.ty {
            let owner = owner_key(entity, &stmt.pk)?;
            steps.push(DetailTable::new(schema, attr)?.unlink(owner));
        }
    }

    for relation in entity.adapter.relations.iter().rev() {
        let keys = row::keys(schema, entity, relation, &stmt.pk)?;
        steps.push(row::delete(relation, &keys));
    }

    Ok(MutationPlan {
        entity: entity.name.clone(),
        steps,
    })
}
