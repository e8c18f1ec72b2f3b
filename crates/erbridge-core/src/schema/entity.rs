use super::{Attribute, EntityAdapter, Relation};

index_id! {
    /// Uniquely identifies an entity within a [`Schema`](super::Schema).
    EntityId
}

#[derive(Debug)]
pub struct Entity {
    /// Uniquely identifies the entity
    pub id: EntityId,

    /// Logical entity name
    pub name: String,

    /// Single-inheritance parent
    pub parent: Option<EntityId>,

    /// Physical tables backing the entity, root of the inheritance chain
    /// first
    pub adapter: EntityAdapter,

    /// Names of the attributes forming the primary key
    pub pk: Vec<String>,

    /// Attributes declared by this entity (inherited ones live on the
    /// ancestors)
    pub attributes: Vec<Attribute>,
}

impl Entity {
    /// The root table of the chain, used in FROM.
    pub fn main_relation(&self) -> &Relation {
        &self.adapter.relations[0]
    }

    /// Index of the last non-weak relation in the chain.
    pub fn own_relation_index(&self) -> usize {
        self.adapter
            .relations
            .iter()
            .rposition(|relation| !relation.weak)
            .unwrap_or(0)
    }

    /// The last non-weak relation, holding the most-derived columns.
    pub fn own_relation(&self) -> &Relation {
        &self.adapter.relations[self.own_relation_index()]
    }

    pub fn relation_index(&self, name: &str) -> Option<usize> {
        self.adapter
            .relations
            .iter()
            .position(|relation| relation.name == name)
    }

    pub fn own_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }
}

impl From<&Entity> for EntityId {
    fn from(value: &Entity) -> Self {
        value.id
    }
}
