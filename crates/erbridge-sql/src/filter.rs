//! Where-tree compilation.

use crate::{
    plan::QueryPlan,
    serializer::{Comma, Formatter, Params, Qualified, ToSql},
};

use erbridge_core::{
    stmt::{Comparison, Operator, Where},
    Error, Result,
};

/// Writes a condition tree. A connective is parenthesized only when it is
/// `nested` and keeps more than one non-empty part; empty subtrees are
/// dropped.
pub(crate) fn write_where<P: Params>(
    f: &mut Formatter<'_, P>,
    plan: &QueryPlan<'_>,
    expr: &Where,
    nested: bool,
) -> Result<()> {
    match expr {
        Where::And(parts) => write_connective(f, plan, parts, " AND ", nested),
        Where::Or(parts) => write_connective(f, plan, parts, " OR ", nested),
        Where::Not(part) => {
            if !part.is_empty() {
                fmt!(f, "NOT ");
                write_where(f, plan, part, true)?;
            }
            Ok(())
        }
        Where::Cmp(cmp) => write_cmp(f, plan, cmp),
    }
}

fn write_connective<P: Params>(
    f: &mut Formatter<'_, P>,
    plan: &QueryPlan<'_>,
    parts: &[Where],
    connective: &'static str,
    nested: bool,
) -> Result<()> {
    let parts: Vec<_> = parts.iter().filter(|part| !part.is_empty()).collect();
    let parens = nested && parts.len() > 1;

    if parens {
        fmt!(f, "(");
    }

    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            fmt!(f, connective);
        }
        write_where(f, plan, part, true)?;
    }

    if parens {
        fmt!(f, ")");
    }

    Ok(())
}

fn write_cmp<P: Params>(
    f: &mut Formatter<'_, P>,
    plan: &QueryPlan<'_>,
    cmp: &Comparison,
) -> Result<()> {
    let (table, field) = plan.column(&cmp.alias, &cmp.attribute)?;
    let column = Qualified(table, field);

    match &cmp.op {
        Operator::Equals(value) if value.is_null() => fmt!(f, column " IS NULL"),
        Operator::Equals(value) => fmt!(f, column " = " value),
        Operator::EqualsIgnoreCase(value) => {
            fmt!(f, "UPPER(" column ") = UPPER(" value ")")
        }
        Operator::Greater(value) => fmt!(f, column " > " value),
        Operator::Less(value) => fmt!(f, column " < " value),
        Operator::Between(lo, hi) => fmt!(f, column " BETWEEN " lo " AND " hi),
        Operator::Like(value) => fmt!(f, column " LIKE " value),
        Operator::SimilarTo(value) => fmt!(f, column " SIMILAR TO " value),
        Operator::Containing(value) => fmt!(f, column " CONTAINING " value),
        Operator::StartingWith(value) => fmt!(f, column " STARTING WITH " value),
        Operator::IsNull => fmt!(f, column " IS NULL"),
        Operator::In(items) if items.is_empty() => {
            return Err(Error::invalid_statement(format!(
                "IN on {}.{} needs at least one value",
                cmp.alias, cmp.attribute
            )));
        }
        Operator::In(items) => fmt!(f, column " IN (" Comma(items) ")"),
    }

    Ok(())
}
