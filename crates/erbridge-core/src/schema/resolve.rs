//! Adapter resolution: mapping attributes to physical relations and columns.
//!
//! Attributes without an explicit adapter fall back to name-derived
//! defaults. A column attribute defaults to the own relation of the entity
//! that declares it, and to a column named after the attribute.

use super::{
    Attribute, AttributeTy, Entity, EntityId, NestedSet, Relation, Schema, DEFAULT_DETAIL_LINK,
    DEFAULT_OWNER_KEY, DEFAULT_REFERENCE_KEY,
};
use crate::{Error, Result};

/// A column attribute resolved against a (possibly derived) entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedColumn<'a> {
    /// Index of the relation in the resolving entity's chain
    pub relation: usize,
    pub relation_name: &'a str,
    pub field: &'a str,
}

/// A detail attribute resolved against its target entity.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedDetail<'a> {
    /// Index of the detail relation in the target entity's chain
    pub relation: usize,
    pub relation_name: &'a str,
    pub link_field: &'a str,

    /// Key columns of the detail relation
    pub pk: &'a [String],
}

/// A set attribute's cross table.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSet<'a> {
    pub cross_relation: &'a str,
    pub owner_key: &'a str,
    pub reference_key: &'a str,
}

impl Schema {
    /// Resolves a scalar, entity-ref or parent attribute to a relation of
    /// `entity`'s chain and a column name.
    pub fn resolve_column<'a>(
        &'a self,
        entity: EntityId,
        attr: &'a Attribute,
    ) -> Result<ResolvedColumn<'a>> {
        if !attr.is_column() {
            return Err(Error::unsupported_attribute(
                &attr.name,
                format!("{} attribute is not stored in a column", attr.kind_name()),
            ));
        }

        let entity = self.entity(entity);
        let (relation_name, field) = match attr.field_adapter() {
            Some(adapter) => (adapter.relation.as_str(), adapter.field.as_str()),
            None => {
                let declaring = self.entity(attr.id.entity);
                (declaring.own_relation().name.as_str(), attr.name.as_str())
            }
        };

        let relation = entity.relation_index(relation_name).ok_or_else(|| {
            Error::adapter_resolution(
                &entity.name,
                &attr.name,
                format!("relation `{relation_name}` is not part of the entity's chain"),
            )
        })?;

        Ok(ResolvedColumn {
            relation,
            relation_name: &entity.adapter.relations[relation].name,
            field,
        })
    }

    /// Resolves a set attribute to its cross table and key columns.
    pub fn resolve_set<'a>(&'a self, attr: &'a Attribute) -> Result<ResolvedSet<'a>> {
        let AttributeTy::Set(set) = &attr.ty else {
            return Err(Error::unsupported_attribute(
                &attr.name,
                format!("{} attribute has no cross table", attr.kind_name()),
            ));
        };

        Ok(match &set.adapter {
            Some(adapter) => ResolvedSet {
                cross_relation: &adapter.cross_relation,
                owner_key: &adapter.owner_key,
                reference_key: &adapter.reference_key,
            },
            None => ResolvedSet {
                cross_relation: &attr.name,
                owner_key: DEFAULT_OWNER_KEY,
                reference_key: DEFAULT_REFERENCE_KEY,
            },
        })
    }

    /// Resolves a detail attribute to the relation of the target entity
    /// holding the link column.
    pub fn resolve_detail<'a>(&'a self, attr: &'a Attribute) -> Result<ResolvedDetail<'a>> {
        let AttributeTy::Detail(detail) = &attr.ty else {
            return Err(Error::unsupported_attribute(
                &attr.name,
                format!("{} attribute has no detail relation", attr.kind_name()),
            ));
        };

        let target = self.entity(detail.target);
        let (relation_name, link_field) = match &detail.adapter {
            Some(adapter) => (adapter.relation.as_str(), adapter.link_field.as_str()),
            None => (target.own_relation().name.as_str(), DEFAULT_DETAIL_LINK),
        };

        let relation = target.relation_index(relation_name).ok_or_else(|| {
            Error::adapter_resolution(
                &target.name,
                &attr.name,
                format!("detail relation `{relation_name}` is not part of the target's chain"),
            )
        })?;

        let relation_ref = &target.adapter.relations[relation];
        Ok(ResolvedDetail {
            relation,
            relation_name: &relation_ref.name,
            link_field,
            pk: &relation_ref.pk,
        })
    }

    /// Returns the nested-set bounds of a parent attribute, if it has them.
    pub fn nested_set<'a>(&'a self, attr: &'a Attribute) -> Option<&'a NestedSet> {
        match &attr.ty {
            AttributeTy::Parent(parent) => parent.nested_set.as_ref(),
            _ => None,
        }
    }

    /// Key column of `relation` matching the `index`-th primary key
    /// attribute. Errors when the relation declares fewer key columns.
    pub fn key_column<'a>(
        &self,
        entity: &'a Entity,
        relation: &'a Relation,
        index: usize,
    ) -> Result<&'a str> {
        relation.pk.get(index).map(String::as_str).ok_or_else(|| {
            Error::adapter_resolution(
                &entity.name,
                entity.pk.get(index).map(String::as_str).unwrap_or("<pk>"),
                format!("relation `{}` has no key column #{index}", relation.name),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldAdapter, ScalarType};

    fn schema() -> Schema {
        let mut builder = Schema::builder();
        builder
            .entity("BASE")
            .scalar("F", ScalarType::Integer)
            .scalar("MOVED", ScalarType::Integer)
            .adapter(FieldAdapter::new("BASE", "MOVED_COLUMN"));
        builder
            .entity("CHILD")
            .parent("BASE")
            .relations([
                Relation::new("BASE", ["ID"]),
                Relation::new("CHILD", ["INHERITED_KEY"]),
            ])
            .scalar("G", ScalarType::Integer)
            .scalar("BROKEN", ScalarType::Integer)
            .adapter(FieldAdapter::new("ELSEWHERE", "X"));
        builder.build().unwrap()
    }

    #[test]
    fn inherited_attribute_resolves_to_declaring_relation() {
        let schema = schema();
        let child = schema.entity_by_name("CHILD").unwrap().id;

        let f = schema.expect_attribute(child, "F").unwrap();
        let col = schema.resolve_column(child, f).unwrap();
        assert_eq!(col.relation, 0);
        assert_eq!(col.relation_name, "BASE");
        assert_eq!(col.field, "F");

        let g = schema.expect_attribute(child, "G").unwrap();
        let col = schema.resolve_column(child, g).unwrap();
        assert_eq!(col.relation, 1);
        assert_eq!(col.relation_name, "CHILD");
    }

    #[test]
    fn explicit_field_adapter() {
        let schema = schema();
        let child = schema.entity_by_name("CHILD").unwrap().id;
        let moved = schema.expect_attribute(child, "MOVED").unwrap();
        assert_eq!(schema.resolve_column(child, moved).unwrap().field, "MOVED_COLUMN");
    }

    #[test]
    fn relation_outside_chain_is_an_adapter_error() {
        let schema = schema();
        let child = schema.entity_by_name("CHILD").unwrap().id;
        let broken = schema.expect_attribute(child, "BROKEN").unwrap();
        let err = schema.resolve_column(child, broken).unwrap_err();
        assert!(err.is_adapter_resolution());
    }

    #[test]
    fn missing_attribute_is_an_adapter_error() {
        let schema = schema();
        let base = schema.entity_by_name("BASE").unwrap().id;
        assert!(schema
            .expect_attribute(base, "G")
            .unwrap_err()
            .is_adapter_resolution());
    }
}
