use crate::{Config, Cursor, Error, Result};

use erbridge_core::{
    driver::{Connection, Transaction},
    stmt::{Delete, EntityQuery, Insert, Mutation, Update, UpdateOrInsert, Value},
    Schema,
};
use erbridge_sql::{Compiler, MutationPlan, StepKind};
use log::{debug, warn};
use std::sync::Arc;

/// Compiles queries and mutations against a schema and runs them over a
/// connection.
#[derive(Debug, Clone)]
pub struct Db {
    schema: Arc<Schema>,
    connection: Arc<dyn Connection>,
    config: Config,
}

impl Db {
    pub fn new(schema: impl Into<Arc<Schema>>, connection: impl Connection) -> Db {
        Db {
            schema: schema.into(),
            connection: Arc::new(connection),
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Result<Db> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn compiler(&self) -> Compiler<'_> {
        Compiler::new(&self.schema)
    }

    /// Runs a query and returns a cursor over its rows. The query's
    /// transaction ends when the cursor is closed.
    pub async fn query(&self, query: &EntityQuery) -> Result<Cursor> {
        let compiled = self.compiler().compile_query(query)?;
        self.log_statement(&compiled.sql, compiled.params.len());

        let mut tx = self.connection.begin().await?;
        let rows = match tx.open(&compiled.sql, &compiled.params).await {
            Ok(rows) => rows,
            Err(err) => {
                rollback(tx, &err).await;
                return Err(err);
            }
        };

        Cursor::new(rows, tx, &compiled.field_aliases, self.config.fetch_size).await
    }

    /// Inserts a row and returns its generated key.
    pub async fn insert(&self, stmt: Insert) -> Result<Value> {
        let mut keys = self.execute_batch([Mutation::Insert(stmt)]).await?;
        Ok(keys.pop().flatten().unwrap_or_default())
    }

    pub async fn update(&self, stmt: Update) -> Result<()> {
        self.execute_batch([Mutation::Update(stmt)]).await?;
        Ok(())
    }

    pub async fn update_or_insert(&self, stmt: UpdateOrInsert) -> Result<Option<Value>> {
        let mut keys = self.execute_batch([Mutation::UpdateOrInsert(stmt)]).await?;
        Ok(keys.pop().flatten())
    }

    pub async fn delete(&self, stmt: Delete) -> Result<()> {
        self.execute_batch([Mutation::Delete(stmt)]).await?;
        Ok(())
    }

    /// Runs mutations in one transaction.
    ///
    /// Every mutation is compiled before anything is executed. Steps run in
    /// order; a generated key is bound into the steps of the same mutation
    /// that need it. On failure the whole batch is rolled back. Returns the
    /// generated key of each mutation, if it produced one.
    pub async fn execute_batch(
        &self,
        mutations: impl IntoIterator<Item = Mutation>,
    ) -> Result<Vec<Option<Value>>> {
        let compiler = self.compiler();
        let plans = mutations
            .into_iter()
            .map(|mutation| compiler.compile_mutation(&mutation))
            .collect::<Result<Vec<_>>>()?;

        let mut tx = self.connection.begin().await?;

        match self.run(tx.as_mut(), &plans).await {
            Ok(keys) => {
                tx.commit().await?;
                Ok(keys)
            }
            Err(err) => {
                warn!("rolling back batch of {} mutations: {err}", plans.len());
                rollback(tx, &err).await;
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        tx: &mut dyn Transaction,
        plans: &[MutationPlan],
    ) -> Result<Vec<Option<Value>>> {
        let mut keys = Vec::with_capacity(plans.len());

        for plan in plans {
            let mut key = None;

            for step in &plan.steps {
                let mut params = step.params.clone();

                if let StepKind::NeedsKey { param } = &step.kind {
                    let Some(key) = &key else {
                        return Err(Error::invalid_statement(format!(
                            "{}: statement needs a generated key that no earlier statement returned",
                            plan.entity
                        )));
                    };
                    params.rebind(param, Value::clone(key));
                }

                self.log_statement(&step.sql, params.len());
                let response = tx.execute(&step.sql, &params).await?;

                if step.kind == StepKind::ReturnsKey {
                    key = Some(response.returning.ok_or_else(|| {
                        Error::invalid_statement(format!(
                            "insert into {} returned no key",
                            plan.entity
                        ))
                    })?);
                }
            }

            keys.push(key);
        }

        Ok(keys)
    }

    fn log_statement(&self, sql: &str, params: usize) {
        if self.config.log_statements {
            debug!("executing {sql} ({params} params)");
        } else {
            debug!("executing statement ({params} params)");
        }
    }
}

async fn rollback(tx: Box<dyn Transaction>, cause: &Error) {
    if let Err(err) = tx.rollback().await {
        warn!("rollback after `{cause}` failed: {err}");
    }
}
