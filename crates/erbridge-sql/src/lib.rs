#[macro_use]
mod serializer;

mod compiled;
pub use compiled::{Compiled, FieldAlias, FieldAliases};

mod filter;

mod mutation;
pub use mutation::{MutationPlan, Step, StepKind};

mod plan;

mod select;

use erbridge_core::{
    err,
    stmt::{Delete, EntityQuery, Insert, Mutation, Update, UpdateOrInsert},
    Result, Schema,
};

/// Compiles entity queries and mutations against one schema.
///
/// Compilation is synchronous and keeps no state between calls: every call
/// numbers its aliases and parameters from one.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'a> {
    schema: &'a Schema,
}

impl<'a> Compiler<'a> {
    pub fn new(schema: &'a Schema) -> Compiler<'a> {
        Compiler { schema }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Compiles a query into one SELECT statement.
    pub fn compile_query(&self, query: &EntityQuery) -> Result<Compiled> {
        select::compile(self.schema, query).map_err(|cause| {
            let entity = &query.link(query.root()).entity;
            cause.context(err!("compiling query on {entity}"))
        })
    }

    /// Compiles a mutation into its ordered statements.
    pub fn compile_mutation(&self, mutation: &Mutation) -> Result<MutationPlan> {
        mutation::compile(self.schema, mutation)
    }

    pub fn insert(&self, stmt: &Insert) -> Result<MutationPlan> {
        self.compile_mutation(&Mutation::Insert(stmt.clone()))
    }

    pub fn update(&self, stmt: &Update) -> Result<MutationPlan> {
        self.compile_mutation(&Mutation::Update(stmt.clone()))
    }

    pub fn update_or_insert(&self, stmt: &UpdateOrInsert) -> Result<MutationPlan> {
        self.compile_mutation(&Mutation::UpdateOrInsert(stmt.clone()))
    }

    pub fn delete(&self, stmt: &Delete) -> Result<MutationPlan> {
        self.compile_mutation(&Mutation::Delete(stmt.clone()))
    }
}
