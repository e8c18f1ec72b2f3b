use super::{
    Attribute, AttributeId, AttributeTy, CrossAttribute, Detail, DetailAdapter, Entity,
    EntityAdapter, EntityId, EntityRef, FieldAdapter, NestedSet, Parent, Relation, Scalar,
    ScalarType, Schema, Set, SetAdapter, DEFAULT_INHERITED_KEY, DEFAULT_PK,
};
use crate::{Error, Result};
use indexmap::IndexMap;

/// Assembles a [`Schema`], filling in name-derived default adapters.
///
/// Entities may reference each other by name in any declaration order;
/// names are resolved by [`Builder::build`].
#[derive(Debug, Default)]
pub struct Builder {
    entities: Vec<EntityBuilder>,
}

/// Declares one entity. Attribute modifiers (`required`, `adapter`, ...)
/// apply to the most recently declared attribute.
#[derive(Debug)]
pub struct EntityBuilder {
    name: String,
    parent: Option<String>,
    relations: Option<Vec<Relation>>,
    pk: Option<Vec<String>>,
    attributes: Vec<AttributeBuilder>,
    errors: Vec<String>,
}

#[derive(Debug)]
struct AttributeBuilder {
    name: String,
    required: bool,
    ty: PendingTy,
}

#[derive(Debug)]
enum PendingTy {
    Scalar(Scalar),
    EntityRef {
        target: String,
        adapter: Option<FieldAdapter>,
    },
    Parent {
        adapter: Option<FieldAdapter>,
        nested_set: Option<NestedSet>,
    },
    Detail {
        target: String,
        adapter: Option<DetailAdapter>,
    },
    Set {
        target: String,
        attributes: Vec<CrossAttribute>,
        adapter: Option<SetAdapter>,
    },
}

/// Used to track state during the build process
struct BuildSchema<'a> {
    builder: &'a Builder,

    /// Maps entity names to identifiers, reserved before any entity is built
    lookup: IndexMap<&'a str, EntityId>,

    /// Resolved relation chains, filled parent-first
    chains: Vec<Option<Vec<Relation>>>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts declaring a new entity.
    pub fn entity(&mut self, name: impl Into<String>) -> &mut EntityBuilder {
        self.entities.push(EntityBuilder {
            name: name.into(),
            parent: None,
            relations: None,
            pk: None,
            attributes: vec![],
            errors: vec![],
        });
        let Some(last) = self.entities.last_mut() else {
            unreachable!()
        };
        last
    }

    pub fn build(&self) -> Result<Schema> {
        let mut lookup = IndexMap::new();
        for (index, entity) in self.entities.iter().enumerate() {
            if let Some(error) = entity.errors.first() {
                return Err(Error::invalid_schema(format!("{}: {error}", entity.name)));
            }
            if lookup.insert(entity.name.as_str(), EntityId(index)).is_some() {
                return Err(Error::invalid_schema(format!(
                    "duplicate entity `{}`",
                    entity.name
                )));
            }
        }

        let mut cx = BuildSchema {
            builder: self,
            lookup,
            chains: vec![None; self.entities.len()],
        };

        let mut entities = Vec::with_capacity(self.entities.len());
        for index in 0..self.entities.len() {
            entities.push(cx.build_entity(EntityId(index))?);
        }

        Ok(Schema { entities })
    }
}

impl BuildSchema<'_> {
    fn entity_id(&self, name: &str) -> Result<EntityId> {
        self.lookup
            .get(name)
            .copied()
            .ok_or_else(|| Error::invalid_schema(format!("unknown entity `{name}`")))
    }

    fn parent_of(&self, id: EntityId) -> Result<Option<EntityId>> {
        self.builder.entities[id.0]
            .parent
            .as_deref()
            .map(|name| self.entity_id(name))
            .transpose()
    }

    /// Relation chain of an entity, computing the parent's chain first.
    fn chain(&mut self, id: EntityId, depth: usize) -> Result<Vec<Relation>> {
        if depth > self.builder.entities.len() {
            return Err(Error::invalid_schema(format!(
                "inheritance cycle through `{}`",
                self.builder.entities[id.0].name
            )));
        }

        if let Some(chain) = &self.chains[id.0] {
            return Ok(chain.clone());
        }

        let builder = self.builder;
        let decl = &builder.entities[id.0];
        let chain = match (&decl.relations, self.parent_of(id)?) {
            (Some(relations), _) => relations.clone(),
            (None, None) => vec![Relation::new(&decl.name, [DEFAULT_PK])],
            (None, Some(parent)) => {
                let mut chain = self.chain(parent, depth + 1)?;
                chain.push(Relation::new(&decl.name, [DEFAULT_INHERITED_KEY]));
                chain
            }
        };

        if chain.is_empty() {
            return Err(Error::invalid_schema(format!(
                "entity `{}` has no relations",
                decl.name
            )));
        }

        self.chains[id.0] = Some(chain.clone());
        Ok(chain)
    }

    fn build_entity(&mut self, id: EntityId) -> Result<Entity> {
        let builder = self.builder;
        let decl = &builder.entities[id.0];
        let parent = self.parent_of(id)?;
        let relations = self.chain(id, 0)?;

        let mut attributes = vec![];
        for (index, attr) in decl.attributes.iter().enumerate() {
            attributes.push(self.build_attribute(
                AttributeId { entity: id, index },
                attr,
            )?);
        }

        // Root entities own their key attribute; derived ones inherit it.
        let pk = match (&decl.pk, parent) {
            (Some(pk), _) => pk.clone(),
            (None, None) => {
                if !attributes.iter().any(|attr| attr.name == DEFAULT_PK) {
                    attributes.push(Attribute {
                        id: AttributeId {
                            entity: id,
                            index: attributes.len(),
                        },
                        name: DEFAULT_PK.to_string(),
                        required: false,
                        ty: AttributeTy::Scalar(Scalar {
                            ty: ScalarType::Sequence,
                            adapter: None,
                        }),
                    });
                }
                vec![DEFAULT_PK.to_string()]
            }
            (None, Some(_)) => {
                let mut ancestor = parent;
                let mut pk = None;
                while let Some(current) = ancestor {
                    if let Some(declared) = &builder.entities[current.0].pk {
                        pk = Some(declared.clone());
                        break;
                    }
                    ancestor = self.parent_of(current)?;
                }
                pk.unwrap_or_else(|| vec![DEFAULT_PK.to_string()])
            }
        };

        Ok(Entity {
            id,
            name: decl.name.clone(),
            parent,
            adapter: EntityAdapter { relations },
            pk,
            attributes,
        })
    }

    fn build_attribute(&self, id: AttributeId, attr: &AttributeBuilder) -> Result<Attribute> {
        let ty = match &attr.ty {
            PendingTy::Scalar(scalar) => AttributeTy::Scalar(scalar.clone()),
            PendingTy::EntityRef { target, adapter } => AttributeTy::EntityRef(EntityRef {
                target: self.entity_id(target)?,
                adapter: adapter.clone(),
            }),
            PendingTy::Parent {
                adapter,
                nested_set,
            } => AttributeTy::Parent(Parent {
                target: id.entity,
                adapter: adapter.clone(),
                nested_set: nested_set.clone(),
            }),
            PendingTy::Detail { target, adapter } => AttributeTy::Detail(Detail {
                target: self.entity_id(target)?,
                adapter: adapter.clone(),
            }),
            PendingTy::Set {
                target,
                attributes,
                adapter,
            } => AttributeTy::Set(Set {
                target: self.entity_id(target)?,
                attributes: attributes.clone(),
                adapter: adapter.clone(),
            }),
        };

        Ok(Attribute {
            id,
            name: attr.name.clone(),
            required: attr.required,
            ty,
        })
    }
}

impl EntityBuilder {
    /// Single-inheritance parent.
    pub fn parent(&mut self, name: impl Into<String>) -> &mut Self {
        self.parent = Some(name.into());
        self
    }

    /// Explicit relation chain, root first. Replaces the derived default.
    pub fn relations(&mut self, relations: impl IntoIterator<Item = Relation>) -> &mut Self {
        self.relations = Some(relations.into_iter().collect());
        self
    }

    /// Primary key attribute names.
    pub fn pk(&mut self, names: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.pk = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn scalar(&mut self, name: impl Into<String>, ty: ScalarType) -> &mut Self {
        self.push(name, PendingTy::Scalar(Scalar { ty, adapter: None }))
    }

    pub fn entity_ref(&mut self, name: impl Into<String>, target: impl Into<String>) -> &mut Self {
        self.push(
            name,
            PendingTy::EntityRef {
                target: target.into(),
                adapter: None,
            },
        )
    }

    /// A self-referencing tree attribute.
    pub fn tree(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(
            name,
            PendingTy::Parent {
                adapter: None,
                nested_set: None,
            },
        )
    }

    pub fn detail(&mut self, name: impl Into<String>, target: impl Into<String>) -> &mut Self {
        self.push(
            name,
            PendingTy::Detail {
                target: target.into(),
                adapter: None,
            },
        )
    }

    pub fn set(&mut self, name: impl Into<String>, target: impl Into<String>) -> &mut Self {
        self.push(
            name,
            PendingTy::Set {
                target: target.into(),
                attributes: vec![],
                adapter: None,
            },
        )
    }

    pub fn required(&mut self) -> &mut Self {
        if let Some(attr) = self.attributes.last_mut() {
            attr.required = true;
        }
        self
    }

    /// Column placement for the last scalar, entity-ref or tree attribute.
    pub fn adapter(&mut self, adapter: FieldAdapter) -> &mut Self {
        match self.attributes.last_mut().map(|attr| &mut attr.ty) {
            Some(PendingTy::Scalar(scalar)) => scalar.adapter = Some(adapter),
            Some(PendingTy::EntityRef { adapter: slot, .. })
            | Some(PendingTy::Parent { adapter: slot, .. }) => *slot = Some(adapter),
            _ => self.misuse("field adapter"),
        }
        self
    }

    /// Nested-set bounds for the last tree attribute.
    pub fn nested_set(&mut self, lb: impl Into<String>, rb: impl Into<String>) -> &mut Self {
        match self.attributes.last_mut().map(|attr| &mut attr.ty) {
            Some(PendingTy::Parent { nested_set, .. }) => {
                *nested_set = Some(NestedSet {
                    lb: lb.into(),
                    rb: rb.into(),
                })
            }
            _ => self.misuse("nested set"),
        }
        self
    }

    pub fn detail_adapter(
        &mut self,
        relation: impl Into<String>,
        link_field: impl Into<String>,
    ) -> &mut Self {
        match self.attributes.last_mut().map(|attr| &mut attr.ty) {
            Some(PendingTy::Detail { adapter, .. }) => {
                *adapter = Some(DetailAdapter {
                    relation: relation.into(),
                    link_field: link_field.into(),
                })
            }
            _ => self.misuse("detail adapter"),
        }
        self
    }

    pub fn set_adapter(
        &mut self,
        cross_relation: impl Into<String>,
        owner_key: impl Into<String>,
        reference_key: impl Into<String>,
    ) -> &mut Self {
        match self.attributes.last_mut().map(|attr| &mut attr.ty) {
            Some(PendingTy::Set { adapter, .. }) => {
                *adapter = Some(SetAdapter {
                    cross_relation: cross_relation.into(),
                    owner_key: owner_key.into(),
                    reference_key: reference_key.into(),
                })
            }
            _ => self.misuse("set adapter"),
        }
        self
    }

    /// Adds an extra cross-table column to the last set attribute.
    pub fn cross(&mut self, name: impl Into<String>, ty: ScalarType) -> &mut Self {
        match self.attributes.last_mut().map(|attr| &mut attr.ty) {
            Some(PendingTy::Set { attributes, .. }) => attributes.push(CrossAttribute {
                name: name.into(),
                ty,
                field: None,
            }),
            _ => self.misuse("cross attribute"),
        }
        self
    }

    fn push(&mut self, name: impl Into<String>, ty: PendingTy) -> &mut Self {
        let name = name.into();
        if self.attributes.iter().any(|attr| attr.name == name) {
            self.errors.push(format!("duplicate attribute `{name}`"));
        }
        self.attributes.push(AttributeBuilder {
            name,
            required: false,
            ty,
        });
        self
    }

    fn misuse(&mut self, what: &str) {
        let attr = self
            .attributes
            .last()
            .map(|attr| attr.name.as_str())
            .unwrap_or("<none>");
        self.errors
            .push(format!("{what} does not apply to attribute `{attr}`"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_adapters() {
        let mut builder = Builder::new();
        builder.entity("BASE").scalar("F", ScalarType::Integer);
        builder.entity("CHILD").parent("BASE").scalar("G", ScalarType::Integer);
        let schema = builder.build().unwrap();

        let base = schema.entity_by_name("BASE").unwrap();
        assert_eq!(base.adapter.relations, vec![Relation::new("BASE", ["ID"])]);
        assert_eq!(base.pk, vec!["ID".to_string()]);
        assert!(base.own_attribute("ID").is_some());

        let child = schema.entity_by_name("CHILD").unwrap();
        assert_eq!(
            child.adapter.relations,
            vec![
                Relation::new("BASE", ["ID"]),
                Relation::new("CHILD", ["INHERITEDKEY"]),
            ]
        );
        assert_eq!(child.pk, vec!["ID".to_string()]);
        assert_eq!(child.main_relation().name, "BASE");
        assert_eq!(child.own_relation().name, "CHILD");
        assert!(schema.attribute(child.id, "ID").is_some());
    }

    #[test]
    fn own_relation_skips_weak_tail() {
        let mut builder = Builder::new();
        builder.entity("DOC").relations([
            Relation::new("DOC", ["ID"]),
            Relation::new("DOC_LINE", ["ID"]),
            Relation::new("DOC_EXTRA", ["ID"]).weak(),
        ]);
        let schema = builder.build().unwrap();
        let doc = schema.entity_by_name("DOC").unwrap();
        assert_eq!(doc.own_relation().name, "DOC_LINE");
    }

    #[test]
    fn forward_references_resolve() {
        let mut builder = Builder::new();
        builder.entity("ORDER").entity_ref("CUSTOMER", "CUSTOMER");
        builder.entity("CUSTOMER");
        let schema = builder.build().unwrap();
        let order = schema.entity_by_name("ORDER").unwrap();
        assert_eq!(order.attributes[0].target(), Some(EntityId(1)));
    }

    #[test]
    fn unknown_target_is_rejected() {
        let mut builder = Builder::new();
        builder.entity("ORDER").entity_ref("CUSTOMER", "NOPE");
        assert!(builder.build().unwrap_err().is_invalid_schema());
    }

    #[test]
    fn duplicate_entities_are_rejected() {
        let mut builder = Builder::new();
        builder.entity("A");
        builder.entity("A");
        assert!(builder.build().unwrap_err().is_invalid_schema());
    }

    #[test]
    fn inheritance_cycle_is_rejected() {
        let mut builder = Builder::new();
        builder.entity("A").parent("B");
        builder.entity("B").parent("A");
        assert!(builder.build().unwrap_err().is_invalid_schema());
    }

    #[test]
    fn modifier_on_wrong_kind_is_rejected() {
        let mut builder = Builder::new();
        builder
            .entity("A")
            .scalar("NAME", ScalarType::Text)
            .nested_set("LB", "RB");
        assert!(builder.build().unwrap_err().is_invalid_schema());
    }
}
