use erbridge_core::stmt::{LinkId, NamedParams};
use indexmap::IndexMap;

/// A compiled SELECT: SQL text, its parameters and the map from result
/// column names back to the link fields they project.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    pub params: NamedParams,
    pub field_aliases: FieldAliases,
}

/// Result column names (`F$n`) in select list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAliases {
    map: IndexMap<String, FieldAlias>,
}

/// The link field a result column was projected from.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAlias {
    pub link: LinkId,
    pub link_alias: String,
    pub attribute: String,

    /// Cross table attribute of a set field
    pub set_attribute: Option<String>,
}

impl FieldAliases {
    pub(crate) fn insert(&mut self, name: String, alias: FieldAlias) {
        self.map.insert(name, alias);
    }

    pub fn get(&self, name: &str) -> Option<&FieldAlias> {
        self.map.get(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &FieldAlias)> + '_ {
        self.map.iter().map(|(name, alias)| (name.as_str(), alias))
    }

    /// Position in the select list of the column projecting `attribute` of
    /// the link aliased `link_alias`.
    pub fn position(
        &self,
        link_alias: &str,
        attribute: &str,
        set_attribute: Option<&str>,
    ) -> Option<usize> {
        self.map.values().position(|alias| {
            alias.link_alias == link_alias
                && alias.attribute == attribute
                && alias.set_attribute.as_deref() == set_attribute
        })
    }

    /// Name of the column projecting `attribute` of `link_alias`.
    pub fn column(&self, link_alias: &str, attribute: &str) -> Option<&str> {
        let index = self.position(link_alias, attribute, None)?;
        self.map.get_index(index).map(|(name, _)| name.as_str())
    }
}
