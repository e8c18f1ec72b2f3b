use crate::stmt::Value;

/// Outcome of a statement run through [`Transaction::execute`].
///
/// [`Transaction::execute`]: super::Transaction::execute
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Response {
    /// Number of rows touched
    pub affected: u64,

    /// Key produced by a statement with a `RETURNS`/`RETURNING` clause
    pub returning: Option<Value>,
}

impl Response {
    pub fn count(affected: u64) -> Response {
        Response {
            affected,
            returning: None,
        }
    }

    pub fn returning(key: impl Into<Value>) -> Response {
        Response {
            affected: 1,
            returning: Some(key.into()),
        }
    }
}

/// Label and declared type of a result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub label: String,
    pub ty: String,
}

impl ColumnMeta {
    pub fn new(label: impl Into<String>, ty: impl Into<String>) -> ColumnMeta {
        ColumnMeta {
            label: label.into(),
            ty: ty.into(),
        }
    }
}
