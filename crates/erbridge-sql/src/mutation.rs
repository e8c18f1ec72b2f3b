//! Mutation compilation.
//!
//! Every operation compiles to an ordered list of [`Step`]s. An insert's
//! chain rows are written by one `EXECUTE BLOCK` that returns the generated
//! key; set memberships and detail links of the new row follow as steps
//! that need that key bound before they run.

mod cross;
mod delete;
mod detail;
mod insert;
mod row;
mod update;
mod upsert;

use crate::serializer::{Formatter, Params, ToSql};

use erbridge_core::{
    err,
    schema::{Attribute, AttributeTy, Entity, ScalarType, Schema},
    stmt::{AttrValue, Mutation, NamedParams, Value},
    Error, Result,
};
use indexmap::IndexMap;
use log::debug;

/// Compiled statements of one mutation, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationPlan {
    pub entity: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub sql: String,
    pub params: NamedParams,
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// Runs as is
    Execute,

    /// Produces the key of the row being inserted
    ReturnsKey,

    /// `param` must be bound to the key produced by an earlier
    /// [`StepKind::ReturnsKey`] step of the same plan
    NeedsKey { param: String },
}

impl Step {
    pub fn needs_key(&self) -> Option<&str> {
        match &self.kind {
            StepKind::NeedsKey { param } => Some(param),
            _ => None,
        }
    }
}

pub(crate) fn compile(schema: &Schema, mutation: &Mutation) -> Result<MutationPlan> {
    let (op, plan) = match mutation {
        Mutation::Insert(stmt) => ("insert", insert::compile(schema, stmt)),
        Mutation::Update(stmt) => ("update", update::compile(schema, stmt)),
        Mutation::UpdateOrInsert(stmt) => ("update or insert", upsert::compile(schema, stmt)),
        Mutation::Delete(stmt) => ("delete", delete::compile(schema, stmt)),
    };

    let plan = plan.map_err(|cause| cause.context(err!("compiling {op} on {}", mutation.entity())))?;

    for step in &plan.steps {
        debug!(
            "compiled {op} on {}: {} ({} params)",
            plan.entity,
            step.sql,
            step.params.len()
        );
    }

    Ok(plan)
}

/// The row key of a mutation: known up front, or produced by the insert
/// block of the same plan.
#[derive(Debug, Clone, Copy)]
enum Key<'a> {
    Known(&'a Value),
    Generated,
}

/// Binds a row key. A generated key is bound as a NULL placeholder whose
/// name is returned so the executor can fill it in.
fn write_key(f: &mut Formatter<'_, NamedParams>, key: Key<'_>) -> Option<String> {
    match key {
        Key::Known(value) => {
            fmt!(f, value);
            None
        }
        Key::Generated => {
            let placeholder = f.params.push(&Value::Null, None);
            let param = format!("P${}", placeholder.0);
            fmt!(f, placeholder);
            Some(param)
        }
    }
}

fn step(sql: String, params: NamedParams, needs_key: Option<String>) -> Step {
    let kind = match needs_key {
        Some(param) => StepKind::NeedsKey { param },
        None => StepKind::Execute,
    };
    Step { sql, params, kind }
}

/// A column assignment of a mutation.
struct ColumnValue<'a> {
    field: &'a str,
    value: &'a Value,
    ty: Option<ScalarType>,
}

/// Attribute values of a mutation sorted by where they are written.
struct Values<'a> {
    /// Column assignments per relation of the chain, in caller order
    columns: Vec<Vec<ColumnValue<'a>>>,

    sets: Vec<(&'a Attribute, &'a AttrValue)>,

    details: Vec<(&'a Attribute, &'a [Value])>,
}

impl<'a> Values<'a> {
    fn group(
        schema: &'a Schema,
        entity: &'a Entity,
        values: &'a IndexMap<String, AttrValue>,
    ) -> Result<Values<'a>> {
        let mut ret = Values {
            columns: entity.adapter.relations.iter().map(|_| vec![]).collect(),
            sets: vec![],
            details: vec![],
        };

        for (name, value) in values {
            let attr = schema.attribute(entity.id, name).ok_or_else(|| {
                Error::invalid_statement(format!("{} has no attribute `{name}`", entity.name))
            })?;

            match (&attr.ty, value) {
                (
                    AttributeTy::Scalar(_) | AttributeTy::EntityRef(_) | AttributeTy::Parent(_),
                    AttrValue::Scalar(value),
                ) => {
                    let column = schema.resolve_column(entity.id, attr)?;
                    ret.columns[column.relation].push(ColumnValue {
                        field: column.field,
                        value,
                        ty: attr.column_type(),
                    });
                }
                (AttributeTy::Set(_), AttrValue::Set { .. } | AttrValue::SetPatch { .. }) => {
                    ret.sets.push((attr, value));
                }
                (AttributeTy::Detail(_), AttrValue::Detail(keys)) => {
                    ret.details.push((attr, keys));
                }
                _ => {
                    return Err(Error::invalid_statement(format!(
                        "{}.{} is a {} attribute and cannot take a {} value",
                        entity.name,
                        attr.name,
                        attr.kind_name(),
                        value_kind(value)
                    )));
                }
            }
        }

        Ok(ret)
    }

    fn has_columns(&self) -> bool {
        self.columns.iter().any(|columns| !columns.is_empty())
    }
}

fn value_kind(value: &AttrValue) -> &'static str {
    match value {
        AttrValue::Scalar(_) => "scalar",
        AttrValue::Set { .. } | AttrValue::SetPatch { .. } => "set",
        AttrValue::Detail(_) => "detail",
    }
}

/// Checks a supplied primary key against the entity's key attributes.
fn check_key(entity: &Entity, pk: &[Value]) -> Result<()> {
    if pk.len() == entity.pk.len() && !pk.iter().any(Value::is_null) {
        Ok(())
    } else {
        Err(Error::invalid_statement(format!(
            "{} is keyed by {} value(s), got {}",
            entity.name,
            entity.pk.len(),
            pk.iter().filter(|value| !value.is_null()).count()
        )))
    }
}

/// Key value stored in cross tables and detail link columns. Only single
/// column keys can be referenced.
fn owner_key<'a>(entity: &Entity, pk: &'a [Value]) -> Result<&'a Value> {
    match pk {
        [key] => Ok(key),
        _ => Err(Error::invalid_statement(format!(
            "{} has a composite key and cannot own sets or details",
            entity.name
        ))),
    }
}
