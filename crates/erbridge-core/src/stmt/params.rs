use super::Value;
use indexmap::IndexMap;

/// Prefix of generated parameter names.
const PREFIX: &str = "P$";

/// Named statement parameters, `P$1`, `P$2`, ... in the order they were
/// first bound. Names are never reused or reordered.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NamedParams {
    values: IndexMap<String, Value>,
}

impl NamedParams {
    pub fn new() -> NamedParams {
        NamedParams::default()
    }

    /// Binds a value under the next free name and returns that name.
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        let name = format!("{PREFIX}{}", self.values.len() + 1);
        self.values.insert(name.clone(), value.into());
        name
    }

    /// Replaces the value bound to an existing name. Used to fill in
    /// generated keys on deferred mutation steps.
    pub fn rebind(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> + '_ {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Values in binding order, for drivers using positional parameters.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &Value> + '_ {
        self.values.values()
    }
}

impl<'a> IntoIterator for &'a NamedParams {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
