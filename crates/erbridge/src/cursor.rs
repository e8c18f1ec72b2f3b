use crate::{Error, FieldAlias, FieldAliases, Result};

use erbridge_core::{
    driver::{ResultSet, Transaction},
    err,
    stmt::Value,
};
use log::{debug, trace, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::{Mutex, Semaphore};

/// A paged reader over the rows of an executed query.
///
/// Clones share the same result set. At most one [`fetch`] or [`close`] runs
/// at a time; the others wait their turn. Once closed, every further `fetch`
/// or `close` fails with [`Error::is_cursor_already_closed`].
///
/// [`fetch`]: Cursor::fetch
/// [`close`]: Cursor::close
#[derive(Debug, Clone)]
pub struct Cursor {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Held for the duration of a fetch or close
    state: Mutex<State>,

    closed: AtomicBool,

    /// Starts without permits; `close` adds the one permit waiters pass
    /// along.
    closing: Semaphore,

    layout: Arc<[FieldAlias]>,

    fetch_size: usize,
}

#[derive(Debug)]
struct State {
    rows: Box<dyn ResultSet>,

    /// Committed when the cursor is closed
    tx: Option<Box<dyn Transaction>>,

    exhausted: bool,
}

/// Rows returned by one [`Cursor::fetch`].
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,

    /// The result set has no more rows
    pub finished: bool,
}

/// One result row, addressable by the link alias and attribute each column
/// projects.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
    layout: Arc<[FieldAlias]>,
}

impl Cursor {
    /// Wraps an open result set. If its columns do not match the query's
    /// projection, the result set is closed and the transaction rolled back.
    pub(crate) async fn new(
        mut rows: Box<dyn ResultSet>,
        tx: Box<dyn Transaction>,
        field_aliases: &FieldAliases,
        fetch_size: usize,
    ) -> Result<Cursor> {
        let layout = match layout(rows.as_ref(), field_aliases) {
            Ok(layout) => layout,
            Err(err) => {
                if let Err(close) = rows.close().await {
                    warn!("closing mismatched result set failed: {close}");
                }
                if let Err(rollback) = tx.rollback().await {
                    warn!("rollback after `{err}` failed: {rollback}");
                }
                return Err(err);
            }
        };

        Ok(Cursor {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    rows,
                    tx: Some(tx),
                    exhausted: false,
                }),
                closed: AtomicBool::new(false),
                closing: Semaphore::new(0),
                layout,
                fetch_size,
            }),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Reads up to `count` rows.
    pub async fn fetch(&self, count: usize) -> Result<Page> {
        if count == 0 {
            return Err(Error::cursor_misuse("fetch count must be at least 1"));
        }

        if self.is_closed() {
            return Err(Error::cursor_already_closed());
        }

        let mut state = self.inner.state.lock().await;

        // A close may have completed while this fetch was waiting
        if self.is_closed() {
            return Err(Error::cursor_already_closed());
        }

        let mut records = Vec::with_capacity(count);
        while records.len() < count && !state.exhausted {
            match state.rows.next().await? {
                Some(values) => records.push(self.record(values)?),
                None => state.exhausted = true,
            }
        }

        trace!("cursor fetched {} rows; exhausted={}", records.len(), state.exhausted);

        Ok(Page {
            records,
            finished: state.exhausted,
        })
    }

    /// Releases the result set and ends its transaction, then wakes every
    /// [`wait_for_closing`](Cursor::wait_for_closing) caller.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;

        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Err(Error::cursor_already_closed());
        }

        let result = state.release().await;
        self.inner.closing.add_permits(1);
        debug!("cursor closed");
        result
    }

    /// Waits until the cursor has been closed by some caller. Does not close
    /// it.
    pub async fn wait_for_closing(&self) {
        // Dropping the permit hands it to the next waiter
        let _permit = self.inner.closing.acquire().await;
    }

    /// Reads every remaining row, [`Config::fetch_size`] rows at a time, and
    /// closes the cursor.
    ///
    /// [`Config::fetch_size`]: crate::Config::fetch_size
    pub async fn collect(self) -> Result<Vec<Record>> {
        let mut records = vec![];

        loop {
            let page = self.fetch(self.inner.fetch_size).await?;
            records.extend(page.records);
            if page.finished {
                break;
            }
        }

        self.close().await?;
        Ok(records)
    }

    fn record(&self, values: Vec<Value>) -> Result<Record> {
        if values.len() != self.inner.layout.len() {
            return Err(err!(
                "result row has {} columns; the query projects {}",
                values.len(),
                self.inner.layout.len()
            ));
        }

        Ok(Record {
            values,
            layout: self.inner.layout.clone(),
        })
    }
}

impl State {
    async fn release(&mut self) -> Result<()> {
        let closed = self.rows.close().await;

        match self.tx.take() {
            Some(tx) if closed.is_ok() => tx.commit().await,
            Some(tx) => {
                if let Err(err) = tx.rollback().await {
                    warn!("rollback after failed cursor close failed: {err}");
                }
                closed
            }
            None => closed,
        }
    }
}

/// Maps result set columns to the link fields they project, by column label
/// when the driver reports labels and by position otherwise.
fn layout(rows: &dyn ResultSet, field_aliases: &FieldAliases) -> Result<Arc<[FieldAlias]>> {
    let columns = rows.columns();

    if columns.is_empty() {
        return Ok(field_aliases.iter().map(|(_, alias)| alias.clone()).collect());
    }

    columns
        .iter()
        .map(|column| {
            field_aliases.get(&column.label).cloned().ok_or_else(|| {
                Error::cursor_misuse(format!(
                    "result column `{}` is not projected by the query",
                    column.label
                ))
            })
        })
        .collect()
}

impl Record {
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Value of `attribute` of the link aliased `link_alias`.
    pub fn get(&self, link_alias: &str, attribute: &str) -> Option<&Value> {
        self.find(link_alias, attribute, None)
    }

    /// Value of a cross table attribute projected by a set field.
    pub fn get_set_attribute(
        &self,
        link_alias: &str,
        attribute: &str,
        set_attribute: &str,
    ) -> Option<&Value> {
        self.find(link_alias, attribute, Some(set_attribute))
    }

    fn find(&self, link_alias: &str, attribute: &str, set_attribute: Option<&str>) -> Option<&Value> {
        let index = self.layout.iter().position(|alias| {
            alias.link_alias == link_alias
                && alias.attribute == attribute
                && alias.set_attribute.as_deref() == set_attribute
        })?;
        self.values.get(index)
    }
}
