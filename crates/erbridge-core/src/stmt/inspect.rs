//! Nested, deserializable forms of queries and condition trees.
//!
//! API layers hand queries over as JSON documents shaped like
//!
//! ```json
//! {
//!   "link": {
//!     "entity": "ORDER", "alias": "o",
//!     "fields": [
//!       { "attribute": "NUMBER" },
//!       { "attribute": "CUSTOMER",
//!         "links": [{ "entity": "CUSTOMER", "alias": "c", "fields": [{ "attribute": "NAME" }] }] }
//!     ]
//!   },
//!   "options": {
//!     "first": 10,
//!     "where": { "equals": [{ "alias": "c", "attribute": "NAME", "value": "ACME" }] },
//!     "order": [{ "alias": "o", "attribute": "NUMBER", "type": "desc" }]
//!   }
//! }
//! ```
//!
//! The inspectors here deserialize that form and convert it into the arena
//! based [`EntityQuery`] and the [`Where`] tree.

use super::{EntityLink, EntityQuery, LinkField, LinkId, OrderBy, Operator, TreeExpansion, Value, Where};
use crate::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInspector {
    pub link: LinkInspector,

    #[serde(default)]
    pub options: OptionsInspector,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkInspector {
    pub entity: String,
    pub alias: String,

    #[serde(default)]
    pub fields: Vec<FieldInspector>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInspector {
    pub attribute: String,

    #[serde(default)]
    pub links: Vec<LinkInspector>,

    #[serde(default)]
    pub set_attributes: Vec<String>,

    #[serde(default)]
    pub tree: TreeExpansion,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsInspector {
    pub first: Option<i64>,
    pub skip: Option<i64>,

    #[serde(rename = "where")]
    pub filter: Option<WhereInspector>,

    #[serde(default)]
    pub order: Vec<OrderBy>,
}

/// Keyed condition node. Conditions under the comparison keys and the
/// subtrees under `and`, `or` and `not` are conjoined.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WhereInspector {
    #[serde(default)]
    pub equals: Vec<ConditionInspector>,
    #[serde(default)]
    pub equals_ignore_case: Vec<ConditionInspector>,
    #[serde(default)]
    pub greater: Vec<ConditionInspector>,
    #[serde(default)]
    pub less: Vec<ConditionInspector>,
    #[serde(default)]
    pub between: Vec<ConditionInspector>,
    #[serde(default)]
    pub like: Vec<ConditionInspector>,
    #[serde(default)]
    pub similar_to: Vec<ConditionInspector>,
    #[serde(default)]
    pub contains: Vec<ConditionInspector>,
    #[serde(default)]
    pub starting_with: Vec<ConditionInspector>,
    #[serde(default)]
    pub is_null: Vec<ConditionInspector>,
    #[serde(default, rename = "in")]
    pub in_list: Vec<ConditionInspector>,

    #[serde(default)]
    pub and: Vec<WhereInspector>,
    #[serde(default)]
    pub or: Vec<WhereInspector>,
    #[serde(default)]
    pub not: Vec<WhereInspector>,
}

#[derive(Debug, Deserialize)]
pub struct ConditionInspector {
    pub alias: String,

    #[serde(alias = "attr")]
    pub attribute: String,

    #[serde(default)]
    pub value: serde_json::Value,
}

impl EntityQuery {
    /// Parses the nested JSON form of a query.
    pub fn from_json(json: &str) -> Result<EntityQuery> {
        let inspector: QueryInspector = serde_json::from_str(json)?;
        inspector.into_query()
    }
}

impl Where {
    /// Parses the keyed JSON form of a condition tree.
    pub fn from_json(json: &str) -> Result<Where> {
        let inspector: WhereInspector = serde_json::from_str(json)?;
        inspector.into_where()
    }
}

impl QueryInspector {
    pub fn into_query(self) -> Result<EntityQuery> {
        let mut query = EntityQuery::new(self.link.entity, self.link.alias);
        let root = query.root();
        push_fields(&mut query, root, self.link.fields);

        let options = self.options;
        if let Some(first) = options.first {
            query.first(first);
        }
        if let Some(skip) = options.skip {
            query.skip(skip);
        }
        if let Some(filter) = options.filter {
            query.filter(filter.into_where()?);
        }
        for order in options.order {
            query.order_by(order);
        }

        Ok(query)
    }
}

fn push_fields(query: &mut EntityQuery, link: LinkId, fields: Vec<FieldInspector>) {
    for field in fields {
        let index = query.link(link).fields.len();
        query.link_mut(link).fields.push(LinkField {
            attribute: field.attribute,
            links: vec![],
            set_attributes: field.set_attributes,
            tree: field.tree,
        });

        for nested in field.links {
            let id = query.push_link(EntityLink {
                entity: nested.entity,
                alias: nested.alias,
                fields: vec![],
                parent: Some(link),
            });
            query.link_mut(link).fields[index].links.push(id);
            push_fields(query, id, nested.fields);
        }
    }
}

impl WhereInspector {
    /// Converts the node into a conjunction of its conditions and subtrees.
    pub fn into_where(self) -> Result<Where> {
        let mut parts = vec![];

        let keyed = [
            (self.equals, Kind::Equals),
            (self.equals_ignore_case, Kind::EqualsIgnoreCase),
            (self.greater, Kind::Greater),
            (self.less, Kind::Less),
            (self.between, Kind::Between),
            (self.like, Kind::Like),
            (self.similar_to, Kind::SimilarTo),
            (self.contains, Kind::Containing),
            (self.starting_with, Kind::StartingWith),
            (self.is_null, Kind::IsNull),
            (self.in_list, Kind::In),
        ];

        for (conditions, kind) in keyed {
            for condition in conditions {
                parts.push(condition.into_where(kind)?);
            }
        }

        for node in self.and {
            parts.push(node.into_where()?);
        }

        if !self.or.is_empty() {
            let branches = self
                .or
                .into_iter()
                .map(WhereInspector::into_where)
                .collect::<Result<Vec<_>>>()?;
            parts.push(Where::Or(branches));
        }

        if !self.not.is_empty() {
            let negated = self
                .not
                .into_iter()
                .map(WhereInspector::into_where)
                .collect::<Result<Vec<_>>>()?;
            parts.push(Where::not(Where::And(negated)));
        }

        Ok(Where::And(parts))
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Equals,
    EqualsIgnoreCase,
    Greater,
    Less,
    Between,
    Like,
    SimilarTo,
    Containing,
    StartingWith,
    IsNull,
    In,
}

impl ConditionInspector {
    fn into_where(self, kind: Kind) -> Result<Where> {
        let value = self.value;
        let op = match kind {
            Kind::Equals => Operator::Equals(value.into()),
            Kind::EqualsIgnoreCase => Operator::EqualsIgnoreCase(value.into()),
            Kind::Greater => Operator::Greater(value.into()),
            Kind::Less => Operator::Less(value.into()),
            Kind::Like => Operator::Like(value.into()),
            Kind::SimilarTo => Operator::SimilarTo(value.into()),
            Kind::Containing => Operator::Containing(value.into()),
            Kind::StartingWith => Operator::StartingWith(value.into()),
            Kind::IsNull => Operator::IsNull,
            Kind::Between => match Value::from(value) {
                Value::List(bounds) if bounds.len() == 2 => {
                    let mut bounds = bounds.into_iter();
                    let lo = bounds.next().unwrap_or_default();
                    let hi = bounds.next().unwrap_or_default();
                    Operator::Between(lo, hi)
                }
                _ => {
                    return Err(Error::invalid_statement(format!(
                        "BETWEEN on {}.{} takes a [low, high] pair",
                        self.alias, self.attribute
                    )))
                }
            },
            Kind::In => match Value::from(value) {
                Value::List(items) => Operator::In(items),
                _ => {
                    return Err(Error::invalid_statement(format!(
                        "IN on {}.{} takes a list",
                        self.alias, self.attribute
                    )))
                }
            },
        };

        Ok(Where::cmp(self.alias, self.attribute, op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_where_form() {
        let filter = Where::from_json(
            r#"{"equals":[{"alias":"a","attr":"X","value":5}],
                "or":[{"not":[{"isNull":[{"alias":"a","attr":"Y"}]}]}]}"#,
        )
        .unwrap();

        assert_eq!(
            filter,
            Where::and([
                Where::equals("a", "X", 5i64),
                Where::or([Where::and([Where::not(Where::and([Where::and([
                    Where::is_null("a", "Y")
                ])]))])]),
            ])
        );
    }

    #[test]
    fn between_needs_a_pair() {
        let err = Where::from_json(r#"{"between":[{"alias":"a","attribute":"X","value":[1]}]}"#)
            .unwrap_err();
        assert!(err.is_invalid_statement());

        let filter =
            Where::from_json(r#"{"between":[{"alias":"a","attribute":"X","value":[1,2]}]}"#)
                .unwrap();
        assert_eq!(
            filter,
            Where::and([Where::cmp(
                "a",
                "X",
                Operator::Between(Value::I64(1), Value::I64(2))
            )])
        );
    }

    #[test]
    fn unknown_where_key_is_rejected() {
        assert!(Where::from_json(r#"{"bogus":[]}"#).is_err());
    }

    #[test]
    fn nested_query_form() {
        let query = EntityQuery::from_json(
            r#"{
                "link": {
                    "entity": "ORDER", "alias": "o",
                    "fields": [
                        {"attribute": "NUMBER"},
                        {"attribute": "CUSTOMER", "links": [
                            {"entity": "CUSTOMER", "alias": "c", "fields": [{"attribute": "NAME"}]}
                        ]},
                        {"attribute": "TAGS", "setAttributes": ["WEIGHT"]}
                    ]
                },
                "options": {
                    "first": 10,
                    "skip": 20,
                    "order": [{"alias": "o", "attribute": "NUMBER", "type": "desc"}]
                }
            }"#,
        )
        .unwrap();

        let root = query.link(query.root());
        assert_eq!(root.entity, "ORDER");
        assert_eq!(root.fields.len(), 3);
        assert_eq!(root.fields[2].set_attributes, ["WEIGHT"]);

        let customer = query.link_by_alias("c").unwrap();
        assert_eq!(root.fields[1].links, [customer]);
        assert_eq!(query.link(customer).parent, Some(query.root()));

        assert_eq!(query.options.first, Some(Value::I64(10)));
        assert_eq!(query.options.skip, Some(Value::I64(20)));
        assert_eq!(query.options.order, [OrderBy::desc("o", "NUMBER")]);
    }
}
