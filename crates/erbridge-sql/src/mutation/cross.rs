use super::{step, write_key, Key, Step};
use crate::serializer::{Bind, Comma, Formatter, Ident, ToSql};

use erbridge_core::{
    schema::{Attribute, AttributeTy, ResolvedSet, ScalarType, Schema, Set},
    stmt::{NamedParams, SetItem, Value},
    Error, Result,
};

/// Writes membership rows of a set attribute's cross table.
pub(super) struct CrossTable<'a> {
    attr: &'a Attribute,
    set: &'a Set,
    table: ResolvedSet<'a>,
}

/// Extra cross attribute column of a membership row
type Extra<'a> = (&'a str, &'a Value, &'a ScalarType);

impl<'a> CrossTable<'a> {
    pub(super) fn new(schema: &'a Schema, attr: &'a Attribute) -> Result<CrossTable<'a>> {
        let AttributeTy::Set(set) = &attr.ty else {
            return Err(Error::unsupported_attribute(
                &attr.name,
                format!("{} attribute has no cross table", attr.kind_name()),
            ));
        };

        Ok(CrossTable {
            attr,
            set,
            table: schema.resolve_set(attr)?,
        })
    }

    pub(super) fn insert(&self, owner: Key<'_>, item: &SetItem) -> Result<Step> {
        self.write_row("INSERT INTO ", owner, item, false)
    }

    /// Writes a membership row whether or not it exists, matching on the
    /// owner and reference keys.
    pub(super) fn upsert(&self, owner: Key<'_>, item: &SetItem) -> Result<Step> {
        self.write_row("UPDATE OR INSERT INTO ", owner, item, true)
    }

    /// Rewrites the membership row referencing `old` in place.
    pub(super) fn update(&self, owner: &Value, old: &Value, item: &SetItem) -> Result<Step> {
        let extra = self.extra(item)?;
        let reference = &item.reference;

        let mut sql = String::new();
        let mut params = NamedParams::new();
        let f = &mut Formatter::new(&mut sql, &mut params);

        fmt!(f, "UPDATE " Ident(self.table.cross_relation) " SET " Ident(self.table.reference_key) " = " reference);
        for (field, value, ty) in extra {
            fmt!(f, ", " Ident(field) " = " Bind(value, Some(ty)));
        }
        fmt!(f, " WHERE " Ident(self.table.owner_key) " = " owner " AND " Ident(self.table.reference_key) " = " old);

        Ok(step(sql, params, None))
    }

    /// Removes the membership rows of an owner, or a single one when
    /// `reference` is given.
    pub(super) fn delete(&self, owner: &Value, reference: Option<&Value>) -> Step {
        let mut sql = String::new();
        let mut params = NamedParams::new();
        let f = &mut Formatter::new(&mut sql, &mut params);

        fmt!(f, "DELETE FROM " Ident(self.table.cross_relation) " WHERE " Ident(self.table.owner_key) " = " owner);
        if let Some(reference) = reference {
            fmt!(f, " AND " Ident(self.table.reference_key) " = " reference);
        }

        step(sql, params, None)
    }

    fn write_row(&self, verb: &str, owner: Key<'_>, item: &SetItem, matching: bool) -> Result<Step> {
        let extra = self.extra(item)?;
        let reference = &item.reference;
        let columns = [self.table.owner_key, self.table.reference_key]
            .into_iter()
            .chain(extra.iter().map(|&(field, ..)| field));

        let mut sql = String::new();
        let mut params = NamedParams::new();
        let f = &mut Formatter::new(&mut sql, &mut params);

        fmt!(f, verb Ident(self.table.cross_relation) " (" Comma(columns.map(Ident)) ") VALUES (");
        let needs_key = write_key(f, owner);
        fmt!(f, ", " reference);
        for (_, value, ty) in extra {
            fmt!(f, ", " Bind(value, Some(ty)));
        }
        fmt!(f, ")");

        if matching {
            fmt!(f, " MATCHING (" Ident(self.table.owner_key) ", " Ident(self.table.reference_key) ")");
        }

        Ok(step(sql, params, needs_key))
    }

    /// Extra columns of a membership row, checked against the set's cross
    /// attributes.
    fn extra<'i>(&self, item: &'i SetItem) -> Result<Vec<Extra<'i>>>
    where
        'a: 'i,
    {
        item.cross_values
            .iter()
            .map(|(name, value)| {
                let cross = self.set.attribute(name).ok_or_else(|| {
                    Error::invalid_statement(format!(
                        "set `{}` has no cross attribute `{name}`",
                        self.attr.name
                    ))
                })?;
                Ok((cross.field(), value, &cross.ty))
            })
            .collect()
    }
}
