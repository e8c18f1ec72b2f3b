use super::{Formatter, Params, ToSql};

/// A relation or column name. Names that are not plain upper-case
/// identifiers are double-quoted.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ident<S>(pub(crate) S);

/// Generated table alias, `T$n`
#[derive(Debug, Clone, Copy)]
pub(crate) struct TableAlias(pub(crate) usize);

/// Generated result column alias, `F$n`
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnAlias(pub(crate) usize);

/// Column qualified by a table alias, `T$n.NAME`
pub(crate) struct Qualified<'a>(pub(crate) usize, pub(crate) &'a str);

impl<S: AsRef<str>> ToSql for Ident<S> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let name = self.0.as_ref();

        if is_plain(name) {
            f.dst.push_str(name);
        } else {
            f.dst.push('"');
            f.dst.push_str(&name.replace('"', "\"\""));
            f.dst.push('"');
        }
    }
}

impl ToSql for TableAlias {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, "T$" self.0);
    }
}

impl ToSql for ColumnAlias {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, "F$" self.0);
    }
}

impl ToSql for Qualified<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, TableAlias(self.0) "." Ident(self.1));
    }
}

fn is_plain(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some('A'..='Z'))
        && chars.all(|c| matches!(c, 'A'..='Z' | '0'..='9' | '_' | '$'))
}
