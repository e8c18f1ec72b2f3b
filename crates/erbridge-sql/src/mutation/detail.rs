use super::{step, write_key, Key, Step};
use crate::serializer::{Comma, Formatter, Ident, ToSql};

use erbridge_core::{
    schema::{Attribute, ResolvedDetail, Schema},
    stmt::{NamedParams, Value},
    Error, Result,
};

/// Writes the link column of a detail attribute's rows.
pub(super) struct DetailTable<'a> {
    attr: &'a Attribute,
    detail: ResolvedDetail<'a>,
}

impl<'a> DetailTable<'a> {
    pub(super) fn new(schema: &'a Schema, attr: &'a Attribute) -> Result<DetailTable<'a>> {
        Ok(DetailTable {
            attr,
            detail: schema.resolve_detail(attr)?,
        })
    }

    /// Points the existing detail rows `keys` at `owner`.
    pub(super) fn link(&self, owner: Key<'_>, keys: &[Value]) -> Result<Step> {
        let key = self.key()?;

        let mut sql = String::new();
        let mut params = NamedParams::new();
        let f = &mut Formatter::new(&mut sql, &mut params);

        fmt!(f, "UPDATE " Ident(self.detail.relation_name) " SET " Ident(self.detail.link_field) " = ");
        let needs_key = write_key(f, owner);
        fmt!(f, " WHERE " Ident(key) " IN (" Comma(keys) ")");

        Ok(step(sql, params, needs_key))
    }

    /// Detaches every detail row of `owner`.
    pub(super) fn unlink(&self, owner: &Value) -> Step {
        let mut sql = String::new();
        let mut params = NamedParams::new();
        let f = &mut Formatter::new(&mut sql, &mut params);

        let link = Ident(self.detail.link_field);
        fmt!(f, "UPDATE " Ident(self.detail.relation_name) " SET " link " = NULL WHERE " link " = " owner);

        step(sql, params, None)
    }

    fn key(&self) -> Result<&'a str> {
        self.detail.pk.first().map(String::as_str).ok_or_else(|| {
            Error::adapter_resolution(
                self.detail.relation_name,
                &self.attr.name,
                "detail relation has no key",
            )
        })
    }
}
