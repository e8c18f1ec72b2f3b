use super::{DetailAdapter, EntityId, FieldAdapter, NestedSet, SetAdapter};
use std::fmt;

#[derive(Debug, Clone)]
pub struct Attribute {
    /// Uniquely identifies the attribute within the declaring entity.
    pub id: AttributeId,

    /// The attribute name
    pub name: String,

    /// True if a value must be supplied on insert
    pub required: bool,

    /// Scalar, entity reference, parent, detail or set
    pub ty: AttributeTy,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct AttributeId {
    /// The declaring entity
    pub entity: EntityId,
    pub index: usize,
}

/// The closed set of attribute kinds.
#[derive(Debug, Clone)]
pub enum AttributeTy {
    Scalar(Scalar),
    EntityRef(EntityRef),
    Parent(Parent),
    Detail(Detail),
    Set(Set),
}

#[derive(Debug, Clone)]
pub struct Scalar {
    pub ty: ScalarType,
    pub adapter: Option<FieldAdapter>,
}

/// A foreign key to another entity's primary key.
#[derive(Debug, Clone)]
pub struct EntityRef {
    pub target: EntityId,
    pub adapter: Option<FieldAdapter>,
}

/// A self-referencing entity reference forming a tree.
#[derive(Debug, Clone)]
pub struct Parent {
    pub target: EntityId,
    pub adapter: Option<FieldAdapter>,

    /// Optional interval encoding enabling containment joins
    pub nested_set: Option<NestedSet>,
}

/// Reverse one-to-many: rows of `target` link back to the owner.
#[derive(Debug, Clone)]
pub struct Detail {
    pub target: EntityId,
    pub adapter: Option<DetailAdapter>,
}

/// Many-to-many membership stored in a cross table.
#[derive(Debug, Clone)]
pub struct Set {
    pub target: EntityId,

    /// Extra scalar columns stored per membership row
    pub attributes: Vec<CrossAttribute>,

    pub adapter: Option<SetAdapter>,
}

/// A scalar column of a set's cross table.
#[derive(Debug, Clone)]
pub struct CrossAttribute {
    pub name: String,
    pub ty: ScalarType,

    /// Column name; defaults to the attribute name
    pub field: Option<String>,
}

impl CrossAttribute {
    pub fn field(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Boolean,
    Integer,
    BigInt,
    Double,
    Numeric { precision: u8, scale: u8 },
    String { max_len: u32 },
    Text,
    Blob,
    Date,
    Time,
    Timestamp,
    /// Generated integer key
    Sequence,
}

impl ScalarType {
    /// The column type used when declaring a procedural block parameter of
    /// this type.
    pub fn sql_type(&self) -> String {
        match self {
            ScalarType::Boolean => "BOOLEAN".to_string(),
            ScalarType::Integer | ScalarType::Sequence => "INTEGER".to_string(),
            ScalarType::BigInt => "BIGINT".to_string(),
            ScalarType::Double => "DOUBLE PRECISION".to_string(),
            ScalarType::Numeric { precision, scale } => format!("NUMERIC({precision}, {scale})"),
            ScalarType::String { max_len } => format!("VARCHAR({max_len})"),
            ScalarType::Text => "BLOB SUB_TYPE TEXT".to_string(),
            ScalarType::Blob => "BLOB".to_string(),
            ScalarType::Date => "DATE".to_string(),
            ScalarType::Time => "TIME".to_string(),
            ScalarType::Timestamp => "TIMESTAMP".to_string(),
        }
    }
}

impl Attribute {
    pub fn is_scalar(&self) -> bool {
        matches!(self.ty, AttributeTy::Scalar(_))
    }

    /// True for attributes stored as a single column of the owner
    /// (scalar, entity reference, parent).
    pub fn is_column(&self) -> bool {
        matches!(
            self.ty,
            AttributeTy::Scalar(_) | AttributeTy::EntityRef(_) | AttributeTy::Parent(_)
        )
    }

    pub fn is_set(&self) -> bool {
        matches!(self.ty, AttributeTy::Set(_))
    }

    pub fn is_detail(&self) -> bool {
        matches!(self.ty, AttributeTy::Detail(_))
    }

    /// The entity a relational attribute points at.
    pub fn target(&self) -> Option<EntityId> {
        match &self.ty {
            AttributeTy::Scalar(_) => None,
            AttributeTy::EntityRef(attr) => Some(attr.target),
            AttributeTy::Parent(attr) => Some(attr.target),
            AttributeTy::Detail(attr) => Some(attr.target),
            AttributeTy::Set(attr) => Some(attr.target),
        }
    }

    /// Explicit column placement, if any.
    pub fn field_adapter(&self) -> Option<&FieldAdapter> {
        match &self.ty {
            AttributeTy::Scalar(attr) => attr.adapter.as_ref(),
            AttributeTy::EntityRef(attr) => attr.adapter.as_ref(),
            AttributeTy::Parent(attr) => attr.adapter.as_ref(),
            AttributeTy::Detail(_) | AttributeTy::Set(_) => None,
        }
    }

    /// The type of the column holding this attribute. References are stored
    /// as integer keys.
    pub fn column_type(&self) -> Option<ScalarType> {
        match &self.ty {
            AttributeTy::Scalar(attr) => Some(attr.ty),
            AttributeTy::EntityRef(_) | AttributeTy::Parent(_) => Some(ScalarType::Integer),
            AttributeTy::Detail(_) | AttributeTy::Set(_) => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.ty {
            AttributeTy::Scalar(_) => "scalar",
            AttributeTy::EntityRef(_) => "entity reference",
            AttributeTy::Parent(_) => "parent",
            AttributeTy::Detail(_) => "detail",
            AttributeTy::Set(_) => "set",
        }
    }
}

impl Set {
    pub fn attribute(&self, name: &str) -> Option<&CrossAttribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }
}

impl fmt::Debug for AttributeId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "AttributeId({}/{})", self.entity.0, self.index)
    }
}
