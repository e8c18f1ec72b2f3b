mod filter;
pub use filter::{Comparison, Operator, Where};

pub mod inspect;

mod mutation;
pub use mutation::{AttrValue, Delete, Insert, Mutation, SetItem, Update, UpdateOrInsert};

mod order_by;
pub use order_by::{Direction, OrderBy};

mod params;
pub use params::NamedParams;

mod query;
pub use query::{EntityLink, EntityQuery, LinkField, LinkId, QueryOptions, TreeExpansion};

mod value;
pub use value::Value;
