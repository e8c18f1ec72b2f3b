use super::Value;

/// Boolean condition tree of a query.
///
/// Conditions address columns through a link alias and an attribute name;
/// the select compiler resolves both against the link tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// All parts must hold
    And(Vec<Where>),

    /// At least one part must hold
    Or(Vec<Where>),

    Not(Box<Where>),

    Cmp(Comparison),
}

/// A single condition on one attribute of one link.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub alias: String,
    pub attribute: String,
    pub op: Operator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Equals(Value),

    /// `UPPER(column) = UPPER(value)`
    EqualsIgnoreCase(Value),

    Greater(Value),
    Less(Value),
    Between(Value, Value),
    Like(Value),
    SimilarTo(Value),
    Containing(Value),
    StartingWith(Value),
    IsNull,
    In(Vec<Value>),
}

impl Where {
    pub fn and(parts: impl IntoIterator<Item = Where>) -> Where {
        Where::And(parts.into_iter().collect())
    }

    pub fn or(parts: impl IntoIterator<Item = Where>) -> Where {
        Where::Or(parts.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(part: Where) -> Where {
        Where::Not(Box::new(part))
    }

    pub fn cmp(alias: impl Into<String>, attribute: impl Into<String>, op: Operator) -> Where {
        Where::Cmp(Comparison {
            alias: alias.into(),
            attribute: attribute.into(),
            op,
        })
    }

    pub fn equals(
        alias: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<Value>,
    ) -> Where {
        Where::cmp(alias, attribute, Operator::Equals(value.into()))
    }

    pub fn greater(
        alias: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<Value>,
    ) -> Where {
        Where::cmp(alias, attribute, Operator::Greater(value.into()))
    }

    pub fn less(
        alias: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<Value>,
    ) -> Where {
        Where::cmp(alias, attribute, Operator::Less(value.into()))
    }

    pub fn is_null(alias: impl Into<String>, attribute: impl Into<String>) -> Where {
        Where::cmp(alias, attribute, Operator::IsNull)
    }

    /// True when the tree holds no comparison at all and renders to nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Where::And(parts) | Where::Or(parts) => parts.iter().all(Where::is_empty),
            Where::Not(part) => part.is_empty(),
            Where::Cmp(_) => false,
        }
    }

    /// Visits every comparison, left to right.
    pub fn for_each_cmp<'a>(&'a self, f: &mut impl FnMut(&'a Comparison)) {
        match self {
            Where::And(parts) | Where::Or(parts) => {
                for part in parts {
                    part.for_each_cmp(f);
                }
            }
            Where::Not(part) => part.for_each_cmp(f),
            Where::Cmp(cmp) => f(cmp),
        }
    }
}

impl Operator {
    /// Values bound by this operator, in the order they appear in the SQL.
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Operator::Equals(v)
            | Operator::EqualsIgnoreCase(v)
            | Operator::Greater(v)
            | Operator::Less(v)
            | Operator::Like(v)
            | Operator::SimilarTo(v)
            | Operator::Containing(v)
            | Operator::StartingWith(v) => vec![v],
            Operator::Between(lo, hi) => vec![lo, hi],
            Operator::IsNull => vec![],
            Operator::In(items) => items.iter().collect(),
        }
    }
}
