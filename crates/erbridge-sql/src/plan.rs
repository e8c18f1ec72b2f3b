//! Alias and join planning.
//!
//! Planning runs in two passes over the link tree. The first pass resolves
//! every link's entity, decides how each nested link is joined to its
//! parent and marks the inheritance chain relations that a field, a
//! condition or an ordering key reads from. The second pass walks the tree
//! depth-first (parent before children, fields left to right) and hands out
//! table aliases (`T$n`) to joined relations and column aliases (`F$n`) to
//! projected leaf fields. Both counters belong to the plan, so identical
//! queries always get identical aliases.

use crate::compiled::{FieldAlias, FieldAliases};

use erbridge_core::{
    schema::{Attribute, AttributeTy, Entity, NestedSet, Relation, ResolvedSet, Schema},
    stmt::{EntityQuery, LinkField, LinkId, TreeExpansion},
    Error, Result,
};
use indexmap::IndexMap;
use log::trace;

pub(crate) struct QueryPlan<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) query: &'a EntityQuery,

    /// Indexed by `LinkId`
    pub(crate) links: Vec<LinkPlan<'a>>,

    /// Select list, in column alias order
    pub(crate) columns: Vec<Projection<'a>>,

    pub(crate) field_aliases: FieldAliases,

    /// Link ids keyed by caller alias
    aliases: IndexMap<&'a str, LinkId>,

    /// Last table alias handed out
    tables: usize,
}

pub(crate) struct LinkPlan<'a> {
    pub(crate) entity: &'a Entity,

    pub(crate) join: Join<'a>,

    /// Relation of the chain the link is entered through
    pub(crate) entry: usize,

    /// Relations of the chain that must be joined
    pub(crate) used: Vec<bool>,

    /// Table alias of each joined relation
    pub(crate) tables: Vec<Option<usize>>,

    pub(crate) fields: Vec<FieldPlan<'a>>,

    /// The link's rows may be absent because it is reached through a LEFT
    /// join.
    pub(crate) optional: bool,

    /// Table alias of the recursive derived table of a tree link
    pub(crate) derived: Option<usize>,
}

pub(crate) struct FieldPlan<'a> {
    pub(crate) attribute: &'a Attribute,

    /// Cross table of a set field
    pub(crate) set: Option<ResolvedSet<'a>>,

    /// Table alias of the cross table
    pub(crate) cross: Option<usize>,
}

/// One column of the select list.
pub(crate) struct Projection<'a> {
    pub(crate) table: usize,
    pub(crate) field: &'a str,
    pub(crate) alias: usize,
}

/// How a link is attached to its parent.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Join<'a> {
    Root,

    /// The child's key equals a foreign key column of the parent.
    Reference {
        parent: LinkId,
        relation: usize,
        field: &'a str,
    },

    /// A link column of the child points at the parent's key.
    Detail { parent: LinkId, link_field: &'a str },

    /// The child's key equals the reference key of the parent field's cross
    /// table.
    Set { parent: LinkId, field: usize },

    /// Interval containment on the nested-set bounds of a tree relation.
    NestedSet {
        parent: LinkId,
        relation: usize,
        bounds: &'a NestedSet,
        mode: TreeExpansion,
    },

    /// Transitive closure of the tree computed by a recursive CTE.
    Recursive {
        parent: LinkId,
        relation: &'a str,
        key: &'a str,
        fk: &'a str,
        mode: TreeExpansion,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

impl<'a> QueryPlan<'a> {
    pub(crate) fn build(schema: &'a Schema, query: &'a EntityQuery) -> Result<QueryPlan<'a>> {
        let mut links = Vec::with_capacity(query.links().len());
        let mut aliases = IndexMap::new();

        for (id, link) in query.links() {
            let entity = schema.expect_entity(&link.entity)?;

            if aliases.insert(link.alias.as_str(), id).is_some() {
                return Err(Error::invalid_statement(format!(
                    "duplicate link alias `{}`",
                    link.alias
                )));
            }

            let relations = entity.adapter.relations.len();
            let mut used = vec![false; relations];
            // The main relation of every link is always joined
            if let Some(main) = used.first_mut() {
                *main = true;
            }

            links.push(LinkPlan {
                entity,
                join: Join::Root,
                entry: 0,
                used,
                tables: vec![None; relations],
                fields: vec![],
                optional: false,
                derived: None,
            });
        }

        let mut plan = QueryPlan {
            schema,
            query,
            links,
            columns: vec![],
            field_aliases: FieldAliases::default(),
            aliases,
            tables: 0,
        };

        for id in query.walk() {
            plan.plan_fields(id)?;
        }

        let mut keys = vec![];
        if let Some(filter) = &query.options.filter {
            filter.for_each_cmp(&mut |cmp| keys.push((&cmp.alias, &cmp.attribute)));
        }
        keys.extend(
            query
                .options
                .order
                .iter()
                .map(|order| (&order.alias, &order.attribute)),
        );
        for (alias, attribute) in keys {
            let (link, _, column) = plan.resolve(alias, attribute)?;
            plan.links[link.0].used[column] = true;
        }

        plan.allocate(query.root())?;
        Ok(plan)
    }

    pub(crate) fn link(&self, id: LinkId) -> &LinkPlan<'a> {
        &self.links[id.0]
    }

    /// Resolves a condition or ordering key to its link, attribute and the
    /// index of the relation holding the column.
    pub(crate) fn resolve(
        &self,
        alias: &str,
        attribute: &str,
    ) -> Result<(LinkId, &'a Attribute, usize)> {
        let link = *self
            .aliases
            .get(alias)
            .ok_or_else(|| Error::alias_not_found(alias))?;

        let entity = self.links[link.0].entity;
        let attr = self.schema.expect_attribute(entity.id, attribute)?;
        let column = self.schema.resolve_column(entity.id, attr)?;
        Ok((link, attr, column.relation))
    }

    /// Table alias and column name of a condition or ordering key.
    pub(crate) fn column(&self, alias: &str, attribute: &str) -> Result<(usize, &'a str)> {
        let (link, attr, _) = self.resolve(alias, attribute)?;
        let link = &self.links[link.0];
        let column = self.schema.resolve_column(link.entity.id, attr)?;
        Ok((link.table(column.relation)?, column.field))
    }

    fn plan_fields(&mut self, id: LinkId) -> Result<()> {
        let schema = self.schema;
        let query = self.query;
        let entity = self.links[id.0].entity;

        for (index, field) in query.link(id).fields.iter().enumerate() {
            let attr = schema.expect_attribute(entity.id, &field.attribute)?;
            check_field(entity, attr, field)?;

            let mut plan = FieldPlan {
                attribute: attr,
                set: None,
                cross: None,
            };

            match &attr.ty {
                AttributeTy::Scalar(_) if !field.is_leaf() => {
                    return Err(Error::unsupported_attribute(
                        &attr.name,
                        "scalar attributes cannot nest links",
                    ));
                }
                AttributeTy::Detail(_) if field.is_leaf() => {
                    return Err(Error::unsupported_attribute(
                        &attr.name,
                        "detail attributes are only projected through nested links",
                    ));
                }
                AttributeTy::Scalar(_) => {
                    let column = schema.resolve_column(entity.id, attr)?;
                    self.links[id.0].used[column.relation] = true;
                }
                AttributeTy::EntityRef(_) | AttributeTy::Parent(_)
                    if field.tree == TreeExpansion::Parent =>
                {
                    let column = schema.resolve_column(entity.id, attr)?;
                    self.links[id.0].used[column.relation] = true;

                    for &child in &field.links {
                        self.check_target(attr, child)?;
                        let join = Join::Reference {
                            parent: id,
                            relation: column.relation,
                            field: column.field,
                        };
                        self.attach(id, child, join, 0, false);
                    }
                }
                AttributeTy::EntityRef(_) | AttributeTy::Parent(_) => {
                    let column = schema.resolve_column(entity.id, attr)?;
                    // A leaf projects the foreign key itself
                    if field.is_leaf() {
                        self.links[id.0].used[column.relation] = true;
                    }

                    for &child in &field.links {
                        self.check_target(attr, child)?;
                        let entry = self.child_relation(child, attr, column.relation_name)?;

                        let join = match schema.nested_set(attr) {
                            Some(bounds) => {
                                self.links[id.0].used[column.relation] = true;
                                Join::NestedSet {
                                    parent: id,
                                    relation: column.relation,
                                    bounds,
                                    mode: field.tree,
                                }
                            }
                            None => {
                                let relation = &entity.adapter.relations[column.relation];
                                Join::Recursive {
                                    parent: id,
                                    relation: &relation.name,
                                    key: schema.key_column(entity, relation, 0)?,
                                    fk: column.field,
                                    mode: field.tree,
                                }
                            }
                        };

                        let inner = field.tree == TreeExpansion::Ancestors;
                        self.attach(id, child, join, entry, inner);
                    }
                }
                AttributeTy::Detail(_) => {
                    let detail = schema.resolve_detail(attr)?;

                    for &child in &field.links {
                        self.check_target(attr, child)?;
                        let entry = self.child_relation(child, attr, detail.relation_name)?;
                        let join = Join::Detail {
                            parent: id,
                            link_field: detail.link_field,
                        };
                        self.attach(id, child, join, entry, false);
                    }
                }
                AttributeTy::Set(_) => {
                    plan.set = Some(schema.resolve_set(attr)?);

                    for &child in &field.links {
                        self.check_target(attr, child)?;
                        let join = Join::Set { parent: id, field: index };
                        self.attach(id, child, join, 0, false);
                    }
                }
            }

            self.links[id.0].fields.push(plan);
        }

        Ok(())
    }

    fn attach(&mut self, parent: LinkId, child: LinkId, join: Join<'a>, entry: usize, inner: bool) {
        let optional = self.links[parent.0].optional || !inner;

        let link = &mut self.links[child.0];
        link.join = join;
        link.entry = entry;
        link.used[entry] = true;
        link.optional = optional;
    }

    /// A nested link must query the attribute's target or one of its
    /// descendants.
    fn check_target(&self, attr: &Attribute, child: LinkId) -> Result<()> {
        let entity = self.links[child.0].entity;
        let target = attr.target();

        if self.schema.lineage(entity.id).any(|e| Some(e.id) == target) {
            Ok(())
        } else {
            Err(Error::invalid_statement(format!(
                "link `{}` queries {}, which is not a target of `{}`",
                self.query.link(child).alias,
                entity.name,
                attr.name
            )))
        }
    }

    /// Index of the relation named `name` in a nested link's chain.
    fn child_relation(&self, child: LinkId, attr: &Attribute, name: &str) -> Result<usize> {
        let entity = self.links[child.0].entity;
        entity.relation_index(name).ok_or_else(|| {
            Error::adapter_resolution(
                &entity.name,
                &attr.name,
                format!("relation `{name}` is not part of the entity's chain"),
            )
        })
    }

    fn next_table(&mut self) -> usize {
        self.tables += 1;
        self.tables
    }

    fn allocate(&mut self, id: LinkId) -> Result<()> {
        if matches!(self.links[id.0].join, Join::Recursive { .. }) {
            let alias = self.next_table();
            self.links[id.0].derived = Some(alias);
        }

        for relation in self.links[id.0].join_order() {
            let alias = self.next_table();
            let link = &mut self.links[id.0];
            link.tables[relation] = Some(alias);
            trace!(
                "link `{}`: {} -> T${alias}",
                self.query.link(id).alias,
                link.entity.adapter.relations[relation].name
            );
        }

        let query = self.query;
        for (index, field) in query.link(id).fields.iter().enumerate() {
            let attr = self.links[id.0].fields[index].attribute;

            match &attr.ty {
                AttributeTy::Scalar(_) | AttributeTy::EntityRef(_) | AttributeTy::Parent(_)
                    if field.is_leaf() =>
                {
                    let link = &self.links[id.0];
                    let column = self.schema.resolve_column(link.entity.id, attr)?;
                    let table = link.table(column.relation)?;
                    self.project(id, table, column.field, attr, None);
                }
                AttributeTy::Set(set) => {
                    let cross = self.next_table();
                    let resolved = self.links[id.0].fields[index].set;
                    self.links[id.0].fields[index].cross = Some(cross);

                    if field.is_leaf() {
                        if let Some(resolved) = resolved {
                            self.project(id, cross, resolved.reference_key, attr, None);
                        }
                    }

                    for name in &field.set_attributes {
                        if let Some(cross_attr) = set.attribute(name) {
                            self.project(id, cross, cross_attr.field(), attr, Some(name.as_str()));
                        }
                    }
                }
                _ => {}
            }

            for &child in &field.links {
                self.allocate(child)?;
            }
        }

        Ok(())
    }

    fn project(
        &mut self,
        link: LinkId,
        table: usize,
        field: &'a str,
        attr: &'a Attribute,
        set_attribute: Option<&str>,
    ) {
        let alias = self.columns.len() + 1;
        self.columns.push(Projection {
            table,
            field,
            alias,
        });
        self.field_aliases.insert(
            format!("F${alias}"),
            FieldAlias {
                link,
                link_alias: self.query.link(link).alias.clone(),
                attribute: attr.name.clone(),
                set_attribute: set_attribute.map(str::to_string),
            },
        );
    }
}

impl<'a> LinkPlan<'a> {
    pub(crate) fn is_root(&self) -> bool {
        matches!(self.join, Join::Root)
    }

    pub(crate) fn relation(&self, index: usize) -> &'a Relation {
        &self.entity.adapter.relations[index]
    }

    /// Table alias of a joined relation.
    pub(crate) fn table(&self, relation: usize) -> Result<usize> {
        self.tables.get(relation).copied().flatten().ok_or_else(|| {
            Error::invalid_statement(format!(
                "relation `{}` of {} is not joined",
                self.relation(relation).name,
                self.entity.name
            ))
        })
    }

    /// Joined relations in the order they are aliased and joined: the entry
    /// relation, then the rest of the chain root first.
    pub(crate) fn join_order(&self) -> Vec<usize> {
        let mut order = vec![self.entry];
        order.extend(
            self.used
                .iter()
                .enumerate()
                .filter(|&(index, &used)| used && index != self.entry)
                .map(|(index, _)| index),
        );
        order
    }

    /// Chain relations are required unless the link itself may be absent or
    /// the relation is weak.
    pub(crate) fn chain_join_kind(&self, relation: usize) -> JoinKind {
        if self.optional || self.relation(relation).weak {
            JoinKind::Left
        } else {
            JoinKind::Inner
        }
    }
}

fn check_field(entity: &Entity, attr: &Attribute, field: &LinkField) -> Result<()> {
    if field.tree != TreeExpansion::Parent && !matches!(attr.ty, AttributeTy::Parent(_)) {
        return Err(Error::unsupported_attribute(
            &attr.name,
            "only parent attributes expand as trees",
        ));
    }

    if field.set_attributes.is_empty() {
        return Ok(());
    }

    let AttributeTy::Set(set) = &attr.ty else {
        return Err(Error::unsupported_attribute(
            &attr.name,
            "only set attributes have cross attributes",
        ));
    };

    match field
        .set_attributes
        .iter()
        .find(|name| set.attribute(name).is_none())
    {
        Some(name) => Err(Error::adapter_resolution(
            &entity.name,
            format!("{}.{name}", attr.name),
            "no such cross attribute",
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erbridge_core::schema::{Relation, ScalarType};

    fn schema() -> Schema {
        let mut builder = Schema::builder();
        builder
            .entity("BASE")
            .scalar("F", ScalarType::Integer);
        builder
            .entity("CHILD")
            .parent("BASE")
            .relations([
                Relation::new("BASE", ["ID"]),
                Relation::new("CHILD", ["INHERITED_KEY"]),
                Relation::new("CHILD_EXT", ["INHERITED_KEY"]).weak(),
            ])
            .scalar("G", ScalarType::Integer)
            .entity_ref("OWNER", "BASE");
        builder.build().unwrap()
    }

    #[test]
    fn unused_chain_relations_get_no_alias() {
        let schema = schema();
        let mut query = EntityQuery::new("CHILD", "c");
        let root = query.root();
        query.select(root, "F");

        let plan = QueryPlan::build(&schema, &query).unwrap();
        assert_eq!(plan.link(root).tables, [Some(1), None, None]);
        assert_eq!(plan.columns.len(), 1);
    }

    #[test]
    fn aliases_follow_traversal_order() {
        let schema = schema();
        let mut query = EntityQuery::new("CHILD", "c");
        let root = query.root();
        query.select(root, "G");
        let owner = query.join(root, "OWNER", "BASE", "o");
        query.select(owner, "F");
        query.select(root, "F");

        let plan = QueryPlan::build(&schema, &query).unwrap();
        assert_eq!(plan.link(root).tables, [Some(1), Some(2), None]);
        assert_eq!(plan.link(owner).tables, [Some(3)]);

        let names: Vec<_> = plan
            .field_aliases
            .iter()
            .map(|(name, alias)| format!("{name}={}.{}", alias.link_alias, alias.attribute))
            .collect();
        assert_eq!(names, ["F$1=c.G", "F$2=o.F", "F$3=c.F"]);
    }

    #[test]
    fn nested_links_are_optional() {
        let schema = schema();
        let mut query = EntityQuery::new("CHILD", "c");
        let root = query.root();
        let owner = query.join(root, "OWNER", "BASE", "o");
        query.select(owner, "F");

        let plan = QueryPlan::build(&schema, &query).unwrap();
        assert!(!plan.link(root).optional);
        assert!(plan.link(owner).optional);
        assert_eq!(plan.link(root).chain_join_kind(2), JoinKind::Left);
    }

    #[test]
    fn duplicate_alias() {
        let schema = schema();
        let mut query = EntityQuery::new("CHILD", "c");
        let root = query.root();
        query.join(root, "OWNER", "BASE", "c");

        let err = QueryPlan::build(&schema, &query).err().unwrap();
        assert!(err.is_invalid_statement());
    }
}
