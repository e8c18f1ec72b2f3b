use super::{OrderBy, Value, Where};
use serde::Deserialize;

index_id! {
    /// Index of a link in an [`EntityQuery`]'s arena.
    LinkId
}

/// A query over an entity and the entities reachable through its relational
/// attributes.
///
/// The link tree is stored as an arena: a link field refers to its nested
/// links by [`LinkId`], never by ownership. Self-referencing tree
/// attributes therefore nest fresh links of the same entity without forming
/// a cycle. The root link is always `LinkId(0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityQuery {
    links: Vec<EntityLink>,
    pub options: QueryOptions,
}

/// A node of the link tree.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityLink {
    /// Name of the queried entity
    pub entity: String,

    /// Caller-chosen alias, unique within the query. WHERE and ORDER BY
    /// keys address the link through it.
    pub alias: String,

    pub fields: Vec<LinkField>,

    /// Link holding the field this link is nested under
    pub parent: Option<LinkId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkField {
    pub attribute: String,

    /// Nested links of a relational attribute. A field without links is a
    /// leaf and projects one column.
    pub links: Vec<LinkId>,

    /// Cross table attributes projected by a set field
    pub set_attributes: Vec<String>,

    /// Expansion mode of a parent attribute
    pub tree: TreeExpansion,
}

/// How links nested under a parent attribute are joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TreeExpansion {
    /// The direct parent only
    #[default]
    Parent,

    /// Every ancestor of the row
    Ancestors,

    /// The whole subtree below the row
    Descendants,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Maximum number of rows
    pub first: Option<Value>,

    /// Rows to skip
    pub skip: Option<Value>,

    pub filter: Option<Where>,

    pub order: Vec<OrderBy>,
}

impl EntityQuery {
    pub fn new(entity: impl Into<String>, alias: impl Into<String>) -> EntityQuery {
        EntityQuery {
            links: vec![EntityLink {
                entity: entity.into(),
                alias: alias.into(),
                fields: vec![],
                parent: None,
            }],
            options: QueryOptions::default(),
        }
    }

    pub fn root(&self) -> LinkId {
        LinkId(0)
    }

    #[track_caller]
    pub fn link(&self, id: LinkId) -> &EntityLink {
        &self.links[id.0]
    }

    pub fn links(&self) -> impl ExactSizeIterator<Item = (LinkId, &EntityLink)> + '_ {
        self.links
            .iter()
            .enumerate()
            .map(|(index, link)| (LinkId(index), link))
    }

    pub fn link_by_alias(&self, alias: &str) -> Option<LinkId> {
        self.links
            .iter()
            .position(|link| link.alias == alias)
            .map(LinkId)
    }

    /// Adds a leaf field to `link`.
    pub fn select(&mut self, link: LinkId, attribute: impl Into<String>) -> &mut Self {
        self.field_mut(link, attribute.into());
        self
    }

    /// Nests a new link of `entity` under the relational `attribute` of
    /// `link` and returns its id. Joining the same attribute twice appends to
    /// the existing field.
    pub fn join(
        &mut self,
        link: LinkId,
        attribute: impl Into<String>,
        entity: impl Into<String>,
        alias: impl Into<String>,
    ) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(EntityLink {
            entity: entity.into(),
            alias: alias.into(),
            fields: vec![],
            parent: Some(link),
        });
        self.field_mut(link, attribute.into()).links.push(id);
        id
    }

    /// Sets the expansion mode of a parent attribute field.
    pub fn tree(
        &mut self,
        link: LinkId,
        attribute: impl Into<String>,
        mode: TreeExpansion,
    ) -> &mut Self {
        self.field_mut(link, attribute.into()).tree = mode;
        self
    }

    /// Projects cross table attributes of a set field.
    pub fn set_attributes(
        &mut self,
        link: LinkId,
        attribute: impl Into<String>,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> &mut Self {
        let field = self.field_mut(link, attribute.into());
        field.set_attributes.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn filter(&mut self, filter: Where) -> &mut Self {
        self.options.filter = Some(filter);
        self
    }

    pub fn order_by(&mut self, order: OrderBy) -> &mut Self {
        self.options.order.push(order);
        self
    }

    pub fn first(&mut self, first: impl Into<Value>) -> &mut Self {
        self.options.first = Some(first.into());
        self
    }

    pub fn skip(&mut self, skip: impl Into<Value>) -> &mut Self {
        self.options.skip = Some(skip.into());
        self
    }

    /// Visits links depth-first, parent before children, fields left to
    /// right.
    pub fn walk(&self) -> Vec<LinkId> {
        let mut ret = Vec::with_capacity(self.links.len());
        let mut stack = vec![self.root()];

        while let Some(id) = stack.pop() {
            ret.push(id);
            let children: Vec<_> = self
                .link(id)
                .fields
                .iter()
                .flat_map(|field| field.links.iter().copied())
                .collect();
            stack.extend(children.into_iter().rev());
        }

        ret
    }

    pub(crate) fn push_link(&mut self, link: EntityLink) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(link);
        id
    }

    pub(crate) fn link_mut(&mut self, id: LinkId) -> &mut EntityLink {
        &mut self.links[id.0]
    }

    fn field_mut(&mut self, link: LinkId, attribute: String) -> &mut LinkField {
        let fields = &mut self.links[link.0].fields;
        let index = match fields.iter().position(|field| field.attribute == attribute) {
            Some(index) => index,
            None => {
                fields.push(LinkField::new(attribute));
                fields.len() - 1
            }
        };
        &mut fields[index]
    }
}

impl LinkField {
    pub fn new(attribute: impl Into<String>) -> LinkField {
        LinkField {
            attribute: attribute.into(),
            links: vec![],
            set_attributes: vec![],
            tree: TreeExpansion::Parent,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.links.is_empty()
    }
}
