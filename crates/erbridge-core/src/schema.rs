mod adapter;
pub use adapter::{
    DetailAdapter, EntityAdapter, FieldAdapter, NestedSet, Relation, Selector, SetAdapter,
    DEFAULT_DETAIL_LINK, DEFAULT_INHERITED_KEY, DEFAULT_OWNER_KEY, DEFAULT_PK,
    DEFAULT_REFERENCE_KEY,
};

mod attribute;
pub use attribute::{
    Attribute, AttributeId, AttributeTy, CrossAttribute, Detail, EntityRef, Parent, Scalar,
    ScalarType, Set,
};

mod builder;
pub use builder::{Builder, EntityBuilder};

mod entity;
pub use entity::{Entity, EntityId};

mod resolve;
pub use resolve::{ResolvedColumn, ResolvedDetail, ResolvedSet};

use crate::{Error, Result};

/// The static ER model the compilers target.
///
/// Entities are stored in an arena indexed by [`EntityId`]; attributes refer
/// to other entities by id so the model has no reference cycles.
#[derive(Debug, Default)]
pub struct Schema {
    pub entities: Vec<Entity>,
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::default()
    }

    #[track_caller]
    pub fn entity(&self, id: impl Into<EntityId>) -> &Entity {
        &self.entities[id.into().0]
    }

    pub fn entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    /// Like [`Schema::entity_by_name`] but reports a missing entity as an
    /// invalid statement.
    pub fn expect_entity(&self, name: &str) -> Result<&Entity> {
        self.entity_by_name(name)
            .ok_or_else(|| Error::invalid_statement(format!("unknown entity `{name}`")))
    }

    #[track_caller]
    pub fn attribute_by_id(&self, id: AttributeId) -> &Attribute {
        &self.entity(id.entity).attributes[id.index]
    }

    /// Iterates the entity followed by its ancestors, most-derived first.
    pub fn lineage(&self, id: EntityId) -> impl Iterator<Item = &Entity> + '_ {
        let mut next = Some(id);
        core::iter::from_fn(move || {
            let entity = self.entity(next?);
            next = entity.parent;
            Some(entity)
        })
    }

    /// Finds an attribute by name on the entity or any of its ancestors. The
    /// most-derived declaration wins.
    pub fn attribute(&self, entity: EntityId, name: &str) -> Option<&Attribute> {
        self.lineage(entity)
            .find_map(|entity| entity.attributes.iter().find(|attr| attr.name == name))
    }

    /// Like [`Schema::attribute`] but reports a missing attribute as an
    /// adapter resolution failure.
    pub fn expect_attribute(&self, entity: EntityId, name: &str) -> Result<&Attribute> {
        self.attribute(entity, name).ok_or_else(|| {
            Error::adapter_resolution(
                &self.entity(entity).name,
                name,
                "no such attribute on the entity or its ancestors",
            )
        })
    }

    /// All attributes visible on the entity, inherited ones first, each in
    /// declaration order. Overridden ancestor attributes are skipped.
    pub fn attributes(&self, entity: EntityId) -> Vec<&Attribute> {
        let mut chain: Vec<&Entity> = self.lineage(entity).collect();
        chain.reverse();

        let mut ret: Vec<&Attribute> = vec![];
        for entity in chain {
            for attr in &entity.attributes {
                if let Some(slot) = ret.iter_mut().find(|prev| prev.name == attr.name) {
                    *slot = attr;
                } else {
                    ret.push(attr);
                }
            }
        }
        ret
    }
}
