mod config;
pub use config::Config;

mod cursor;
pub use cursor::{Cursor, Page, Record};

mod db;
pub use db::Db;

pub use erbridge_core::{async_trait, driver, schema, stmt, Error, Result, Schema};
pub use erbridge_sql::{Compiled, Compiler, FieldAlias, FieldAliases, MutationPlan, Step, StepKind};
