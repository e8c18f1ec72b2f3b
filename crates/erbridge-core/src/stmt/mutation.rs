use super::Value;
use indexmap::IndexMap;

/// A write against one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Insert(Insert),
    Update(Update),
    UpdateOrInsert(UpdateOrInsert),
    Delete(Delete),
}

/// Creates a new entity row across its inheritance chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub entity: String,

    /// Attribute values keyed by attribute name, in caller order
    pub values: IndexMap<String, AttrValue>,
}

/// Changes attributes of an existing entity row.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub entity: String,

    /// Primary key of the row, one value per key attribute
    pub pk: Vec<Value>,

    pub values: IndexMap<String, AttrValue>,
}

/// Writes an entity row whether or not it exists yet. Without a primary key
/// the operation is compiled as an insert.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOrInsert {
    pub entity: String,
    pub pk: Vec<Value>,
    pub values: IndexMap<String, AttrValue>,
}

/// Removes an entity row, detaching its details and set memberships.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub entity: String,
    pub pk: Vec<Value>,
}

/// Value supplied for one attribute of a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Scalar, entity-ref or parent column value
    Scalar(Value),

    /// Full membership of a set attribute.
    ///
    /// On update, `current` must list the reference ids stored today. Items
    /// already stored keep their rows; the other old and new references are
    /// paired by position.
    Set {
        items: Vec<SetItem>,
        current: Option<Vec<Value>>,
    },

    /// Explicit membership changes of a set attribute
    SetPatch {
        add: Vec<SetItem>,
        remove: Vec<Value>,
    },

    /// Keys of existing detail rows to link to the owner
    Detail(Vec<Value>),
}

/// One membership row of a set attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct SetItem {
    /// Key of the referenced entity
    pub reference: Value,

    /// Extra cross table attributes, keyed by cross attribute name
    pub cross_values: IndexMap<String, Value>,
}

impl Mutation {
    pub fn entity(&self) -> &str {
        match self {
            Mutation::Insert(stmt) => &stmt.entity,
            Mutation::Update(stmt) => &stmt.entity,
            Mutation::UpdateOrInsert(stmt) => &stmt.entity,
            Mutation::Delete(stmt) => &stmt.entity,
        }
    }
}

impl Insert {
    pub fn new(entity: impl Into<String>) -> Insert {
        Insert {
            entity: entity.into(),
            values: IndexMap::new(),
        }
    }

    pub fn value(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Insert {
        self.values
            .insert(attribute.into(), AttrValue::Scalar(value.into()));
        self
    }

    pub fn set(
        mut self,
        attribute: impl Into<String>,
        items: impl IntoIterator<Item = SetItem>,
    ) -> Insert {
        self.values.insert(
            attribute.into(),
            AttrValue::Set {
                items: items.into_iter().collect(),
                current: None,
            },
        );
        self
    }

    pub fn detail(
        mut self,
        attribute: impl Into<String>,
        keys: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Insert {
        self.values.insert(
            attribute.into(),
            AttrValue::Detail(keys.into_iter().map(Into::into).collect()),
        );
        self
    }
}

impl Update {
    pub fn new(entity: impl Into<String>, pk: impl IntoIterator<Item = impl Into<Value>>) -> Update {
        Update {
            entity: entity.into(),
            pk: pk.into_iter().map(Into::into).collect(),
            values: IndexMap::new(),
        }
    }

    pub fn value(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Update {
        self.values
            .insert(attribute.into(), AttrValue::Scalar(value.into()));
        self
    }

    /// Replaces the membership of a set. `current` lists the reference ids
    /// stored today.
    pub fn set(
        mut self,
        attribute: impl Into<String>,
        items: impl IntoIterator<Item = SetItem>,
        current: Option<Vec<Value>>,
    ) -> Update {
        self.values.insert(
            attribute.into(),
            AttrValue::Set {
                items: items.into_iter().collect(),
                current,
            },
        );
        self
    }

    pub fn set_patch(
        mut self,
        attribute: impl Into<String>,
        add: impl IntoIterator<Item = SetItem>,
        remove: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Update {
        self.values.insert(
            attribute.into(),
            AttrValue::SetPatch {
                add: add.into_iter().collect(),
                remove: remove.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    pub fn with(mut self, attribute: impl Into<String>, value: AttrValue) -> Update {
        self.values.insert(attribute.into(), value);
        self
    }
}

impl UpdateOrInsert {
    pub fn new(entity: impl Into<String>, pk: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        UpdateOrInsert {
            entity: entity.into(),
            pk: pk.into_iter().map(Into::into).collect(),
            values: IndexMap::new(),
        }
    }

    pub fn value(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values
            .insert(attribute.into(), AttrValue::Scalar(value.into()));
        self
    }

    pub fn with(mut self, attribute: impl Into<String>, value: AttrValue) -> Self {
        self.values.insert(attribute.into(), value);
        self
    }

    /// The insert this operation falls back to when no key is given.
    pub fn to_insert(&self) -> Insert {
        Insert {
            entity: self.entity.clone(),
            values: self.values.clone(),
        }
    }
}

impl Delete {
    pub fn new(entity: impl Into<String>, pk: impl IntoIterator<Item = impl Into<Value>>) -> Delete {
        Delete {
            entity: entity.into(),
            pk: pk.into_iter().map(Into::into).collect(),
        }
    }
}

impl SetItem {
    pub fn new(reference: impl Into<Value>) -> SetItem {
        SetItem {
            reference: reference.into(),
            cross_values: IndexMap::new(),
        }
    }

    pub fn cross(mut self, name: impl Into<String>, value: impl Into<Value>) -> SetItem {
        self.cross_values.insert(name.into(), value.into());
        self
    }
}

impl From<Insert> for Mutation {
    fn from(value: Insert) -> Self {
        Mutation::Insert(value)
    }
}

impl From<Update> for Mutation {
    fn from(value: Update) -> Self {
        Mutation::Update(value)
    }
}

impl From<UpdateOrInsert> for Mutation {
    fn from(value: UpdateOrInsert) -> Self {
        Mutation::UpdateOrInsert(value)
    }
}

impl From<Delete> for Mutation {
    fn from(value: Delete) -> Self {
        Mutation::Delete(value)
    }
}
