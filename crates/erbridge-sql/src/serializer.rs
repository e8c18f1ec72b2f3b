//! SQL fragment serialization.
//!
//! Compilers write statements through a [`Formatter`] with the `fmt!` macro.
//! Every fragment implements [`ToSql`]; values are bound on the fly so
//! parameters are numbered in the order they appear in the SQL text.

#[macro_use]
mod fmt;
pub(crate) use fmt::ToSql;

mod delim;
pub(crate) use delim::{Comma, Delimited};

mod ident;
pub(crate) use ident::{ColumnAlias, Ident, Qualified, TableAlias};

mod params;
pub use params::{BlockParams, Params};

mod value;
pub(crate) use value::Bind;

pub(crate) struct Formatter<'a, P> {
    /// Where to write the serialized SQL
    pub(crate) dst: &'a mut String,

    /// Where to store parameters
    pub(crate) params: &'a mut P,
}

impl<'a, P: Params> Formatter<'a, P> {
    pub(crate) fn new(dst: &'a mut String, params: &'a mut P) -> Formatter<'a, P> {
        Formatter { dst, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erbridge_core::stmt::{NamedParams, Value};

    #[test]
    fn fragments_bind_in_text_order() {
        let mut sql = String::new();
        let mut params = NamedParams::new();
        let f = &mut Formatter::new(&mut sql, &mut params);

        let values = [Value::from(1), Value::from("a")];
        fmt!(f, "SELECT " Qualified(1, "X") " AS " ColumnAlias(1) " FROM " Ident("BASE") " " TableAlias(1));
        fmt!(f, " WHERE " Qualified(1, "X") " IN (" Comma(values.iter()) ")");

        assert_eq!(
            sql,
            "SELECT T$1.X AS F$1 FROM BASE T$1 WHERE T$1.X IN (:P$1, :P$2)"
        );
        assert_eq!(params.get("P$2"), Some(&Value::from("a")));
    }

    #[test]
    fn irregular_identifiers_are_quoted() {
        let mut sql = String::new();
        let mut params = NamedParams::new();
        let f = &mut Formatter::new(&mut sql, &mut params);

        fmt!(f, Ident("order lines") " " Ident("MIXED_Case") " " Ident("PLAIN$1"));
        assert_eq!(sql, "\"order lines\" \"MIXED_Case\" PLAIN$1");
    }
}
