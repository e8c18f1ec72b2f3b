use super::{Formatter, Params, ToSql};

use erbridge_core::{schema::ScalarType, stmt::Value};

/// A value bound as a parameter, with the declared type of its target
/// column when known.
pub(crate) struct Bind<'a>(pub(crate) &'a Value, pub(crate) Option<&'a ScalarType>);

impl ToSql for Bind<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let placeholder = f.params.push(self.0, self.1);
        fmt!(f, placeholder);
    }
}

impl ToSql for &Value {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, Bind(self, None));
    }
}
