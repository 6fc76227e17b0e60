//! SQLite export of filings and their related resources.
//!
//! Tables are named after the resource types and declared `WITHOUT
//! ROWID` with `api_id` as the primary key. Columns ending in `_count`
//! are INTEGER, sums and duplicate values REAL and everything else TEXT.

use crate::error::{OutputError, Result};
use crate::views::{SqliteView, default_views};
use futures::{Stream, TryStreamExt};
use fxo_data::{
    ApiResource, DataValue, Entity, Filing, FilingSet, FilingsPage, ScopeFlags, TimeAccuracy,
    ValidationMessage, order_columns,
};
use indexmap::IndexMap;
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Columns of each exported table, keyed by table name.
pub type TableSchema = IndexMap<&'static str, Vec<String>>;

/// Settings of an SQLite export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteExportOptions {
    /// Views created after the tables, `None` for no views
    pub views: Option<Vec<SqliteView>>,
    /// Precision of datetimes written as text
    pub time_accuracy: TimeAccuracy,
}

impl Default for SqliteExportOptions {
    fn default() -> Self {
        Self {
            views: Some(default_views()),
            time_accuracy: TimeAccuracy::default(),
        }
    }
}

impl SqliteExportOptions {
    /// Default views with datetimes written at `time_accuracy`.
    pub fn with_time_accuracy(time_accuracy: TimeAccuracy) -> Self {
        Self {
            time_accuracy,
            ..Self::default()
        }
    }
}

/// SQLite database receiving filing records.
#[derive(Debug)]
pub struct SqliteExporter {
    conn: Connection,
    schema: TableSchema,
    time_accuracy: TimeAccuracy,
}

impl SqliteExporter {
    /// Open a database file and prepare its tables.
    ///
    /// Missing parent directories are created. With `update`, an
    /// existing database is extended with the missing tables and
    /// columns; otherwise the file must not exist.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    /// * `flags` - Related resources to create tables for
    /// * `filing_columns` - Columns of the `Filing` table
    /// * `update` - Allow writing into an existing database
    /// * `options` - Views and datetime precision
    ///
    /// # Errors
    /// Returns [`OutputError::DatabaseFileExists`],
    /// [`OutputError::DatabasePathIsReserved`] or
    /// [`OutputError::DatabaseSchemaUnmatch`] when the path cannot be used.
    pub fn open<P: AsRef<Path>>(
        path: P,
        flags: ScopeFlags,
        filing_columns: Vec<String>,
        update: bool,
        options: &SqliteExportOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let existed = validate_path(path, update)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let mut exporter = Self {
            conn,
            schema: TableSchema::new(),
            time_accuracy: options.time_accuracy,
        };
        exporter.initialize_schema(path, flags, filing_columns, existed, options.views.as_deref())?;
        Ok(exporter)
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory(
        flags: ScopeFlags,
        filing_columns: Vec<String>,
        options: &SqliteExportOptions,
    ) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut exporter = Self {
            conn,
            schema: TableSchema::new(),
            time_accuracy: options.time_accuracy,
        };
        exporter.initialize_schema(
            Path::new(":memory:"),
            flags,
            filing_columns,
            false,
            options.views.as_deref(),
        )?;
        Ok(exporter)
    }

    /// Tables and columns records are written to.
    pub const fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Underlying connection.
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Write filings with the entities and validation messages of the set.
    ///
    /// # Errors
    /// Returns [`OutputError::Sqlite`] if a write fails.
    pub fn write_filing_set(&self, filings: &FilingSet) -> Result<()> {
        self.insert_rows(filings.iter())?;
        self.insert_rows(filings.entities().iter())?;
        self.insert_rows(filings.validation_messages().iter())?;
        Ok(())
    }

    /// Write one page of a running query.
    ///
    /// Entities and messages are taken from the filings of the page.
    ///
    /// # Errors
    /// Returns [`OutputError::Sqlite`] if a write fails.
    pub fn write_page(&self, page: &FilingsPage) -> Result<()> {
        let mut seen = HashSet::new();
        let entities: Vec<&Arc<Entity>> = page
            .filing_list
            .iter()
            .filter_map(|f| f.entity.as_ref())
            .filter(|e| seen.insert(e.api_id.clone()))
            .collect();
        let messages: Vec<&Arc<ValidationMessage>> = page
            .filing_list
            .iter()
            .filter_map(|f| f.validation_messages.as_ref())
            .flatten()
            .collect();

        self.insert_rows(page.filing_list.iter())?;
        self.insert_rows(entities.into_iter().map(|e| &**e))?;
        self.insert_rows(messages.into_iter().map(|m| &**m))?;
        Ok(())
    }

    fn initialize_schema(
        &mut self,
        path: &Path,
        flags: ScopeFlags,
        filing_columns: Vec<String>,
        update: bool,
        views: Option<&[SqliteView]>,
    ) -> Result<()> {
        let mut expected: TableSchema = IndexMap::new();
        expected.insert(Filing::TABLE, filing_columns);
        if flags.wants_entity() {
            expected.insert(Entity::TABLE, Entity::columns());
        }
        if flags.wants_validation_messages() {
            expected.insert(ValidationMessage::TABLE, ValidationMessage::columns());
        }

        let (existing_tables, existing_views) = if update {
            let (tables, views) = self.existing_objects()?;
            if !expected.keys().any(|t| tables.contains(*t)) {
                return Err(OutputError::DatabaseSchemaUnmatch {
                    path: path.to_path_buf(),
                });
            }
            (tables, views)
        } else {
            (HashSet::new(), HashSet::new())
        };

        for (table, columns) in expected {
            let columns = order_columns(columns);
            if existing_tables.contains(table) {
                self.extend_table(path, table, &columns)?;
            } else {
                let defs: Vec<String> = columns.iter().map(|c| column_def(c)).collect();
                self.execute(&format!(
                    "CREATE TABLE {table} (\n  {}\n) WITHOUT ROWID",
                    defs.join(",\n  ")
                ))?;
            }
            self.schema.insert(table, columns);
        }

        let tables: Vec<&str> = self.schema.keys().copied().collect();
        for view in views.unwrap_or_default() {
            if existing_views.contains(&view.name) || !view.is_supported_by(&tables) {
                continue;
            }
            self.execute(&view.create_sql())?;
        }
        Ok(())
    }

    fn existing_objects(&self) -> Result<(HashSet<String>, HashSet<String>)> {
        let sql = "SELECT type, name FROM sqlite_schema WHERE name NOT LIKE 'sqlite_%'";
        debug!("{sql};");
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut tables = HashSet::new();
        let mut views = HashSet::new();
        for row in rows {
            match row? {
                (kind, name) if kind == "table" => {
                    tables.insert(name);
                }
                (kind, name) if kind == "view" => {
                    views.insert(name);
                }
                _ => {}
            }
        }
        Ok((tables, views))
    }

    fn extend_table(&self, path: &Path, table: &str, columns: &[String]) -> Result<()> {
        let sql = "SELECT name FROM pragma_table_info(?1)";
        debug!("{sql}; <{table}>");
        let existing: HashSet<String> = self
            .conn
            .prepare(sql)?
            .query_map([table], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;

        let shares_column = columns.iter().any(|c| existing.contains(c));
        if !shares_column || !columns.iter().any(|c| c == "api_id") {
            return Err(OutputError::DatabaseSchemaUnmatch {
                path: path.to_path_buf(),
            });
        }
        for column in columns.iter().filter(|c| !existing.contains(*c)) {
            self.execute(&format!("ALTER TABLE {table} ADD COLUMN {}", column_def(column)))?;
        }
        Ok(())
    }

    fn insert_rows<'a, T, I>(&self, items: I) -> Result<()>
    where
        T: ApiResource + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let Some(columns) = self.schema.get(T::TABLE) else {
            return Ok(());
        };
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "REPLACE INTO {} (\n  {}\n  )\nVALUES ({placeholders})",
            T::TABLE,
            columns.join(",\n  ")
        );

        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for item in items {
                let values = columns.iter().map(|c| self.sql_value(item.value(c)));
                stmt.execute(params_from_iter(values))?;
                count += 1;
            }
        }
        tx.commit()?;
        debug!("{sql}; <count: {count}>");
        Ok(())
    }

    fn sql_value(&self, value: Option<DataValue>) -> Value {
        match value {
            None => Value::Null,
            Some(DataValue::Integer(i)) => Value::Integer(i),
            Some(DataValue::Real(r)) => Value::Real(r),
            Some(DataValue::Text(s)) => Value::Text(s),
            Some(other) => Value::Text(other.to_text(self.time_accuracy)),
        }
    }

    fn execute(&self, sql: &str) -> Result<()> {
        debug!("{sql};");
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

/// Check the database path, returning whether an existing file is updated.
fn validate_path(path: &Path, update: bool) -> Result<bool> {
    if path.is_file() {
        if !update {
            return Err(OutputError::DatabaseFileExists {
                path: path.to_path_buf(),
            });
        }
        Ok(true)
    } else if path.exists() {
        Err(OutputError::DatabasePathIsReserved {
            path: path.to_path_buf(),
        })
    } else {
        Ok(false)
    }
}

/// Column definition with the SQLite type of the column.
fn column_def(column: &str) -> String {
    let mut type_name = if column.ends_with("_count") {
        "INTEGER"
    } else if column.ends_with("_sum") || column.starts_with("duplicate_") {
        "REAL"
    } else {
        "TEXT"
    }
    .to_string();
    if column == "api_id" {
        type_name.push_str(" PRIMARY KEY NOT NULL");
    }
    format!("{column} {type_name}")
}

/// Save a filing set to a database.
///
/// A related resource table is left out when the set has no such
/// resources even if `flags` asks for it.
///
/// # Errors
/// See [`SqliteExporter::open`].
pub fn filing_set_to_sqlite<P: AsRef<Path>>(
    filings: &FilingSet,
    flags: ScopeFlags,
    path: P,
    update: bool,
    options: &SqliteExportOptions,
) -> Result<()> {
    let mut flags = flags;
    if !filings.entities().exist() {
        flags.remove(ScopeFlags::GET_ENTITY);
    }
    if !filings.validation_messages().exist() {
        flags.remove(ScopeFlags::GET_VALIDATION_MESSAGES);
    }
    if !flags.wants_entity() && !flags.wants_validation_messages() {
        flags = ScopeFlags::GET_ONLY_FILINGS;
    }

    let columns = Filing::columns_for(flags, filings.iter());
    let exporter = SqliteExporter::open(path, flags, columns, update, options)?;
    exporter.write_filing_set(filings)?;
    info!("Saved {} filings", filings.len());
    Ok(())
}

/// Save pages to a database as they arrive.
///
/// The database is prepared before the first page is requested. Returns
/// the number of filings saved.
///
/// # Errors
/// See [`SqliteExporter::open`]. Query errors are returned as
/// [`OutputError::Filings`]; pages saved before the error stay in the
/// database.
pub async fn pages_to_sqlite<S, P>(
    pages: S,
    flags: ScopeFlags,
    path: P,
    update: bool,
    options: &SqliteExportOptions,
) -> Result<usize>
where
    S: Stream<Item = fxo_data::Result<FilingsPage>>,
    P: AsRef<Path>,
{
    let exporter = SqliteExporter::open(path, flags, Filing::streamed_columns(flags), update, options)?;
    let mut pages = std::pin::pin!(pages);
    let mut count = 0;
    while let Some(page) = pages.try_next().await? {
        exporter.write_page(&page)?;
        count += page.len();
    }
    info!("Saved {count} filings");
    Ok(count)
}
