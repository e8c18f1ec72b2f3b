use crate::stmt::Value;

/// Maps an entity to its physical relations.
#[derive(Debug, Clone, Default)]
pub struct EntityAdapter {
    /// One entry per table in the inheritance chain, root first.
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Physical table name
    pub name: String,

    /// Primary key columns of this table. For non-root relations these hold
    /// the inherited key.
    pub pk: Vec<String>,

    /// Restricts a shared table to rows of one logical entity
    pub selector: Option<Selector>,

    /// The table may have no row for a given entity instance and is always
    /// LEFT-joined.
    pub weak: bool,
}

impl Relation {
    pub fn new(name: impl Into<String>, pk: impl IntoIterator<Item = impl Into<String>>) -> Relation {
        Relation {
            name: name.into(),
            pk: pk.into_iter().map(Into::into).collect(),
            selector: None,
            weak: false,
        }
    }

    pub fn selector(mut self, field: impl Into<String>, value: impl Into<Value>) -> Relation {
        self.selector = Some(Selector {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn weak(mut self) -> Relation {
        self.weak = true;
        self
    }
}

/// Discriminator column and value
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub field: String,
    pub value: Value,
}

/// Column placement of a scalar, entity-ref or parent attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAdapter {
    pub relation: String,
    pub field: String,
}

impl FieldAdapter {
    pub fn new(relation: impl Into<String>, field: impl Into<String>) -> FieldAdapter {
        FieldAdapter {
            relation: relation.into(),
            field: field.into(),
        }
    }
}

/// Nested-set interval columns of a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedSet {
    pub lb: String,
    pub rb: String,
}

/// Placement of a reverse one-to-many attribute: the detail table holds a
/// link column pointing back at the owner.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailAdapter {
    pub relation: String,
    pub link_field: String,
}

/// Placement of a many-to-many attribute in a cross table.
#[derive(Debug, Clone, PartialEq)]
pub struct SetAdapter {
    pub cross_relation: String,

    /// Column holding the owner's key
    pub owner_key: String,

    /// Column holding the referenced entity's key
    pub reference_key: String,
}

/// Key column of a root relation created without an explicit adapter.
pub const DEFAULT_PK: &str = "ID";

/// Key column of a non-root relation created without an explicit adapter.
pub const DEFAULT_INHERITED_KEY: &str = "INHERITEDKEY";

/// Cross table column holding the owner's key by default.
pub const DEFAULT_OWNER_KEY: &str = "KEY1";

/// Cross table column holding the referenced key by default.
pub const DEFAULT_REFERENCE_KEY: &str = "KEY2";

/// Detail table column linking back to the master by default.
pub const DEFAULT_DETAIL_LINK: &str = "MASTERKEY";
