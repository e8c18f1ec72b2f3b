use crate::{
    filter::write_where,
    plan::{Join, JoinKind, LinkPlan, Projection, QueryPlan},
    serializer::{ColumnAlias, Comma, Delimited, Formatter, Ident, Params, Qualified, TableAlias, ToSql},
    Compiled,
};

use erbridge_core::{
    schema::{Schema, Selector},
    stmt::{Direction, EntityQuery, LinkId, NamedParams, OrderBy, TreeExpansion, Where},
    Error, Result,
};
use log::debug;

pub(crate) fn compile(schema: &Schema, query: &EntityQuery) -> Result<Compiled> {
    let plan = QueryPlan::build(schema, query)?;

    if plan.columns.is_empty() {
        return Err(Error::invalid_statement("query projects no columns"));
    }

    let mut sql = String::new();
    let mut params = NamedParams::new();
    Select { plan: &plan }.write(&mut Formatter::new(&mut sql, &mut params))?;

    debug!(
        "compiled query on {}: {} columns, {} params",
        plan.link(query.root()).entity.name,
        plan.columns.len(),
        params.len()
    );

    Ok(Compiled {
        sql,
        params,
        field_aliases: plan.field_aliases,
    })
}

struct Select<'a, 'b> {
    plan: &'b QueryPlan<'a>,
}

/// `lhs = rhs`
struct Eq<L, R>(L, R);

impl<L: ToSql, R: ToSql> ToSql for Eq<L, R> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, self.0 " = " self.1);
    }
}

impl ToSql for &Projection<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, Qualified(self.table, self.field) " AS " ColumnAlias(self.alias));
    }
}

impl Select<'_, '_> {
    fn write<P: Params>(&self, f: &mut Formatter<'_, P>) -> Result<()> {
        let plan = self.plan;
        let options = &plan.query.options;
        let root_id = plan.query.root();
        let root = plan.link(root_id);

        fmt!(f, "SELECT ");
        if let Some(first) = &options.first {
            fmt!(f, "FIRST " first " ");
        }
        if let Some(skip) = &options.skip {
            fmt!(f, "SKIP " skip " ");
        }
        fmt!(f, Comma(&plan.columns));

        let main = root.relation(0);
        fmt!(f, " FROM " Ident(&main.name) " " TableAlias(root.table(0)?));
        self.write_link(f, root_id)?;

        // Selectors of the root link restrict the result rows themselves
        let mut selectors = vec![];
        for relation in root.join_order() {
            if let Some(selector) = &root.relation(relation).selector {
                selectors.push((root.table(relation)?, selector));
            }
        }

        let filter = options.filter.as_ref().filter(|filter| !filter.is_empty());
        if !selectors.is_empty() || filter.is_some() {
            fmt!(f, " WHERE ");
            fmt!(f, Delimited(
                selectors.iter().map(|&(table, selector)| SelectorEq(table, selector)),
                " AND "
            ));

            if let Some(filter) = filter {
                if !selectors.is_empty() {
                    fmt!(f, " AND ");
                }
                let nested = !selectors.is_empty() && !matches!(filter, Where::And(_));
                write_where(f, plan, filter, nested)?;
            }
        }

        if !options.order.is_empty() {
            let mut keys = Vec::with_capacity(options.order.len());
            for order in &options.order {
                keys.push(self.order_key(order)?);
            }
            fmt!(f, " ORDER BY " Comma(keys));
        }

        Ok(())
    }

    fn order_key(&self, order: &OrderBy) -> Result<OrderKey<'_>> {
        let (table, field) = self.plan.column(&order.alias, &order.attribute)?;
        Ok(OrderKey {
            column: Qualified(table, field),
            direction: order.direction,
        })
    }

    /// Writes the joins of a link: its entry join, the rest of its chain and
    /// then, field by field, the cross tables and nested links.
    fn write_link<P: Params>(&self, f: &mut Formatter<'_, P>, id: LinkId) -> Result<()> {
        let link = self.plan.link(id);

        if !link.is_root() {
            self.write_entry(f, link)?;
        }

        let entry = link.relation(link.entry);
        let entry_table = link.table(link.entry)?;

        for index in link.join_order().into_iter().skip(1) {
            let relation = link.relation(index);
            let table = link.table(index)?;

            fmt!(f, " " link.chain_join_kind(index).as_sql() " " Ident(&relation.name) " " TableAlias(table) " ON ");
            fmt!(f, Delimited(
                relation
                    .pk
                    .iter()
                    .zip(&entry.pk)
                    .map(|(key, entry_key)| Eq(Qualified(table, key), Qualified(entry_table, entry_key))),
                " AND "
            ));

            if !link.is_root() {
                if let Some(selector) = &relation.selector {
                    fmt!(f, " AND " SelectorEq(table, selector));
                }
            }
        }

        let query_link = self.plan.query.link(id);
        for (field, field_plan) in query_link.fields.iter().zip(&link.fields) {
            if let (Some(cross), Some(set)) = (field_plan.cross, field_plan.set) {
                let (owner, owner_key) = self.key(link)?;
                fmt!(f, " LEFT JOIN " Ident(set.cross_relation) " " TableAlias(cross) " ON " Eq(Qualified(cross, set.owner_key), Qualified(owner, owner_key)));
            }

            for &child in &field.links {
                self.write_link(f, child)?;
            }
        }

        Ok(())
    }

    /// Joins the entry relation of a nested link to its parent.
    fn write_entry<P: Params>(&self, f: &mut Formatter<'_, P>, link: &LinkPlan<'_>) -> Result<()> {
        let entry = link.relation(link.entry);
        let table = link.table(link.entry)?;
        let key = self.plan.schema.key_column(link.entity, entry, 0)?;

        match link.join {
            Join::Root => {}
            Join::Reference {
                parent,
                relation,
                field,
            } => {
                let parent_table = self.plan.link(parent).table(relation)?;
                fmt!(f, " LEFT JOIN " Ident(&entry.name) " " TableAlias(table) " ON " Eq(Qualified(table, key), Qualified(parent_table, field)));
            }
            Join::Detail { parent, link_field } => {
                let (owner, owner_key) = self.key(self.plan.link(parent))?;
                fmt!(f, " LEFT JOIN " Ident(&entry.name) " " TableAlias(table) " ON " Eq(Qualified(table, link_field), Qualified(owner, owner_key)));
            }
            Join::Set { parent, field } => {
                let field = &self.plan.link(parent).fields[field];
                let (Some(cross), Some(set)) = (field.cross, field.set) else {
                    return Err(Error::invalid_statement(format!(
                        "set `{}` has no cross table alias",
                        field.attribute.name
                    )));
                };
                fmt!(f, " LEFT JOIN " Ident(&entry.name) " " TableAlias(table) " ON " Eq(Qualified(table, key), Qualified(cross, set.reference_key)));
            }
            Join::NestedSet {
                parent,
                relation,
                bounds,
                mode,
            } => {
                let parent_link = self.plan.link(parent);
                let parent_table = parent_link.table(relation)?;
                let (lb, rb) = match mode {
                    TreeExpansion::Descendants => (" > ", " < "),
                    _ => (" < ", " > "),
                };

                fmt!(f, " " tree_join_kind(parent_link, mode).as_sql() " " Ident(&entry.name) " " TableAlias(table));
                fmt!(f, " ON " Qualified(table, &bounds.lb) lb Qualified(parent_table, &bounds.lb));
                fmt!(f, " AND " Qualified(table, &bounds.rb) rb Qualified(parent_table, &bounds.rb));
            }
            Join::Recursive {
                parent,
                relation,
                key: tree_key,
                fk,
                mode,
            } => {
                let parent_link = self.plan.link(parent);
                let derived = link.derived.ok_or_else(|| {
                    Error::invalid_statement("recursive tree link has no derived table alias")
                })?;
                let (owner, owner_key) = self.key(parent_link)?;
                let kind = tree_join_kind(parent_link, mode).as_sql();

                fmt!(f, " " kind " (");
                write_closure(f, derived, relation, tree_key, fk, mode);
                fmt!(f, ") " TableAlias(derived) " ON " Eq(Qualified(derived, "ROOT_KEY"), Qualified(owner, owner_key)));
                fmt!(f, " " kind " " Ident(&entry.name) " " TableAlias(table) " ON " Eq(Qualified(table, key), Qualified(derived, "NODE_KEY")));
            }
        }

        if let Some(selector) = &entry.selector {
            fmt!(f, " AND " SelectorEq(table, selector));
        }

        Ok(())
    }

    /// Table alias and key column of a link's main relation.
    fn key<'l>(&self, link: &'l LinkPlan<'_>) -> Result<(usize, &'l str)> {
        let main = link.relation(0);
        let key = main.pk.first().ok_or_else(|| {
            Error::adapter_resolution(&link.entity.name, "<pk>", "main relation has no key")
        })?;
        Ok((link.table(0)?, key))
    }
}

/// Ancestor joins are required, unless the parent itself may be absent.
fn tree_join_kind(parent: &LinkPlan<'_>, mode: TreeExpansion) -> JoinKind {
    if mode == TreeExpansion::Ancestors && !parent.optional {
        JoinKind::Inner
    } else {
        JoinKind::Left
    }
}

/// Writes a recursive CTE pairing every node (`ROOT_KEY`) with each of its
/// ancestors or descendants (`NODE_KEY`).
fn write_closure<P: Params>(
    f: &mut Formatter<'_, P>,
    derived: usize,
    relation: &str,
    key: &str,
    fk: &str,
    mode: TreeExpansion,
) {
    let name = TreeName(derived);
    let (key, fk) = (Ident(key), Ident(fk));

    fmt!(f, "WITH RECURSIVE " name " (ROOT_KEY, NODE_KEY) AS (");

    if mode == TreeExpansion::Ancestors {
        fmt!(f, "SELECT " key ", " fk " FROM " Ident(relation) " WHERE " fk " IS NOT NULL");
        fmt!(f, " UNION ALL SELECT " name ".ROOT_KEY, " Ident(relation) "." fk " FROM " Ident(relation));
        fmt!(f, " JOIN " name " ON " Ident(relation) "." key " = " name ".NODE_KEY");
        fmt!(f, " WHERE " Ident(relation) "." fk " IS NOT NULL");
    } else {
        fmt!(f, "SELECT " fk ", " key " FROM " Ident(relation) " WHERE " fk " IS NOT NULL");
        fmt!(f, " UNION ALL SELECT " name ".ROOT_KEY, " Ident(relation) "." key " FROM " Ident(relation));
        fmt!(f, " JOIN " name " ON " Ident(relation) "." fk " = " name ".NODE_KEY");
    }

    fmt!(f, ") SELECT ROOT_KEY, NODE_KEY FROM " name);
}

/// Name of the recursive CTE backing derived table `T$n`
#[derive(Clone, Copy)]
struct TreeName(usize);

impl ToSql for TreeName {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, "TREE$" self.0);
    }
}

/// Discriminator condition of a relation.
struct SelectorEq<'a>(usize, &'a Selector);

impl ToSql for SelectorEq<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let value = &self.1.value;
        fmt!(f, Qualified(self.0, &self.1.field) " = " value);
    }
}

struct OrderKey<'a> {
    column: Qualified<'a>,
    direction: Direction,
}

impl ToSql for OrderKey<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let direction = match self.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        };
        fmt!(f, self.column direction);
    }
}
