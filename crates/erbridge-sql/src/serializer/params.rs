use super::{Formatter, ToSql};

use erbridge_core::{
    schema::ScalarType,
    stmt::{NamedParams, Value},
};

pub trait Params {
    /// Binds a value and returns its placeholder. `ty` is the declared type
    /// of the column the value is written to, when known.
    fn push(&mut self, value: &Value, ty: Option<&ScalarType>) -> Placeholder;
}

pub struct Placeholder(pub usize);

impl Params for NamedParams {
    fn push(&mut self, value: &Value, _ty: Option<&ScalarType>) -> Placeholder {
        self.bind(value.clone());
        Placeholder(self.len())
    }
}

/// Parameters of an `EXECUTE BLOCK`. Block inputs must be declared with a
/// type, so the declared type of every bound value is kept alongside it.
#[derive(Debug, Default)]
pub struct BlockParams {
    pub(crate) params: NamedParams,
    pub(crate) types: Vec<String>,
}

impl Params for BlockParams {
    fn push(&mut self, value: &Value, ty: Option<&ScalarType>) -> Placeholder {
        let ty = match ty {
            Some(ty) => ty.sql_type(),
            None => value_type(value),
        };
        self.types.push(ty);
        self.params.push(value, None)
    }
}

impl ToSql for Placeholder {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, ":P$" self.0);
    }
}

/// Type of a block input whose target column type is unknown.
fn value_type(value: &Value) -> String {
    match value {
        Value::Bool(_) => "BOOLEAN".to_string(),
        Value::I32(_) => "INTEGER".to_string(),
        Value::I64(_) => "BIGINT".to_string(),
        Value::F64(_) => "DOUBLE PRECISION".to_string(),
        Value::String(s) => format!("VARCHAR({})", s.chars().count().max(1)),
        Value::Bytes(_) => "BLOB".to_string(),
        Value::Null | Value::List(_) => "VARCHAR(8191)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_params_record_declared_types() {
        let mut params = BlockParams::default();
        params.push(&Value::from("abc"), None);
        params.push(&Value::Null, Some(&ScalarType::Integer));
        params.push(&Value::from(7i64), None);

        assert_eq!(params.types, ["VARCHAR(3)", "INTEGER", "BIGINT"]);
        assert_eq!(params.params.len(), 3);
    }
}
