use serde::Deserialize;

/// One ORDER BY key addressed by link alias and attribute name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderBy {
    pub alias: String,
    pub attribute: String,

    #[serde(rename = "type", default)]
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl OrderBy {
    pub fn asc(alias: impl Into<String>, attribute: impl Into<String>) -> OrderBy {
        OrderBy {
            alias: alias.into(),
            attribute: attribute.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(alias: impl Into<String>, attribute: impl Into<String>) -> OrderBy {
        OrderBy {
            alias: alias.into(),
            attribute: attribute.into(),
            direction: Direction::Desc,
        }
    }
}
